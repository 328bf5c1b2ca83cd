//! Shared calibration abstractions.
//!
//! References:
//! - Nocedal and Wright, *Numerical Optimization* (2nd ed.), Ch. 10.
//! - More (1978), Levenberg-Marquardt implementation and convergence behavior.

use serde::{Deserialize, Serialize};

use crate::core::PricingError;

/// Box constraints `lower <= x <= upper` applied by the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxConstraints {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl BoxConstraints {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, PricingError> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(PricingError::InvalidInput(
                "constraints require same non-zero lower/upper dimensions".to_string(),
            ));
        }
        for i in 0..lower.len() {
            if !lower[i].is_finite() || !upper[i].is_finite() || lower[i] > upper[i] {
                return Err(PricingError::InvalidInput(format!(
                    "invalid bound at index {i}: [{}, {}]",
                    lower[i], upper[i]
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Projects `x` onto the feasible box.
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, v)| v.clamp(self.lower[i], self.upper[i]))
            .collect()
    }

    /// Whether any coordinate of `x` sits on (or within `eps` of) a bound.
    pub fn hits_boundary(&self, x: &[f64], eps: f64) -> bool {
        x.iter().enumerate().any(|(i, &v)| {
            (v - self.lower[i]).abs() <= eps.max(1e-12)
                || (self.upper[i] - v).abs() <= eps.max(1e-12)
        })
    }
}

/// Optimizer termination reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    GradientTolerance,
    StepTolerance,
    ObjectiveTolerance,
    Stagnation,
    MaxIterations,
    NumericalFailure,
}

/// Convergence metadata from an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceInfo {
    pub iterations: usize,
    pub objective_evaluations: usize,
    pub gradient_norm: f64,
    pub step_norm: f64,
    pub converged: bool,
    pub reason: TerminationReason,
}
