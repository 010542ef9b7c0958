// Copyright 2026 Hypermesh Foundation. All rights reserved.
// VEC Simulation Suite - Decision Actions

//! Per-slot decision vectors and their boundary validation.
//!
//! An [`Action`] carries one offloading ratio `w[i]` and one server
//! allocation ratio `a[i]` per vehicle. The environment rejects malformed
//! actions before touching any state; the only correction it applies is the
//! proportional rescale of an over-committed allocation vector.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("`{field}` has {actual} entries, expected one per vehicle ({expected})")]
    LengthMismatch { field: &'static str, expected: usize, actual: usize },

    #[error("`{field}[{index}]` is not a finite number")]
    NonFinite { field: &'static str, index: usize },

    #[error("offloading ratio w[{index}] = {value} is outside [0, 1]")]
    OffloadOutOfRange { index: usize, value: f64 },

    #[error("allocation ratio a[{index}] = {value} is negative")]
    NegativeAllocation { index: usize, value: f64 },

    #[error("malformed decision response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Offloading ratio per vehicle.
    pub w: Vec<f64>,
    /// Server allocation ratio per vehicle.
    pub a: Vec<f64>,
}

impl Action {
    pub fn new(w: Vec<f64>, a: Vec<f64>) -> Self {
        Self { w, a }
    }

    /// Deterministic default: offload half of all work, split the server
    /// evenly. Used whenever a policy cannot produce a decision.
    pub fn fallback(num_vehicles: usize) -> Self {
        let share = if num_vehicles > 0 { 1.0 / num_vehicles as f64 } else { 0.0 };
        Self {
            w: vec![0.5; num_vehicles],
            a: vec![share; num_vehicles],
        }
    }

    pub fn len(&self) -> usize {
        self.w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    /// Check cardinality and ratio domains against a fleet of `num_vehicles`.
    pub fn validate(&self, num_vehicles: usize) -> Result<(), ActionError> {
        for (field, values) in [("w", &self.w), ("a", &self.a)] {
            if values.len() != num_vehicles {
                return Err(ActionError::LengthMismatch {
                    field,
                    expected: num_vehicles,
                    actual: values.len(),
                });
            }
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(ActionError::NonFinite { field, index });
            }
        }
        if let Some((index, &value)) = self.w.iter().enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(ActionError::OffloadOutOfRange { index, value });
        }
        if let Some((index, &value)) = self.a.iter().enumerate().find(|(_, v)| **v < 0.0) {
            return Err(ActionError::NegativeAllocation { index, value });
        }
        Ok(())
    }

    /// Parse and sanitise a decision-service body of the form
    /// `{"w": [...], "a": [...]}`.
    ///
    /// Lengths must match the fleet; `a` is rescaled to sum to exactly 1
    /// (equal shares if its sum is not positive). Ratios are then checked
    /// with [`validate`](Self::validate).
    pub fn from_response(body: &str, num_vehicles: usize) -> Result<Self, ActionError> {
        let mut action: Action = serde_json::from_str(body)
            .map_err(|e| ActionError::MalformedResponse(e.to_string()))?;
        if action.w.len() != num_vehicles || action.a.len() != num_vehicles {
            return Err(ActionError::MalformedResponse(format!(
                "expected {} ratios, got w={} a={}",
                num_vehicles,
                action.w.len(),
                action.a.len()
            )));
        }
        let total: f64 = action.a.iter().sum();
        action.a = if total > 0.0 {
            action.a.iter().map(|r| r / total).collect()
        } else {
            vec![1.0 / num_vehicles.max(1) as f64; num_vehicles]
        };
        action.validate(num_vehicles)?;
        Ok(action)
    }
}

/// Rescale an allocation vector whose sum exceeds 1.0 so that it sums to
/// exactly 1.0. Vectors summing to at most 1.0 are returned unchanged.
pub fn normalize_allocation(a: &[f64]) -> Vec<f64> {
    let total: f64 = a.iter().sum();
    if total > 1.0 {
        a.iter().map(|r| r / total).collect()
    } else {
        a.to_vec()
    }
}
