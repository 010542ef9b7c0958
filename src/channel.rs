// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Channel Model
//
// Log-distance path loss between a vehicle and the road-side unit at the
// road midpoint, plus the Shannon uplink rate derived from it.

use crate::params::Params;

/// Path-loss intercept in dB at 1 km.
pub const PATH_LOSS_INTERCEPT_DB: f64 = 128.1;
/// Path-loss slope in dB per decade of distance (km).
pub const PATH_LOSS_SLOPE_DB: f64 = 37.6;
/// Distances below this floor are clamped to avoid the log singularity.
const MIN_DISTANCE_M: f64 = 1.0;

/// Distance from `position_m` to the road midpoint, floored at 1 m.
pub fn distance_to_rsu_m(position_m: f64, road_length_m: f64) -> f64 {
    (position_m - road_length_m / 2.0).abs().max(MIN_DISTANCE_M)
}

/// Path loss in dB at `distance_m`.
pub fn path_loss_db(distance_m: f64) -> f64 {
    PATH_LOSS_INTERCEPT_DB + PATH_LOSS_SLOPE_DB * (distance_m / 1000.0).log10()
}

/// Linear channel gain for a vehicle at `position_m`. Deterministic and
/// always strictly positive.
pub fn channel_gain(position_m: f64, params: &Params) -> f64 {
    let distance_m = distance_to_rsu_m(position_m, params.road_length_m());
    10f64.powf(-path_loss_db(distance_m) / 10.0)
}

/// Shannon capacity of the uplink in bits per second.
pub fn uplink_rate_bps(gain: f64, params: &Params) -> f64 {
    let snr = params.tx_power_watts() * gain / params.noise_watts();
    params.bandwidth_hz() * (1.0 + snr).log2()
}
