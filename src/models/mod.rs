//! Stochastic process models used by the simulation and transform engines.

use crate::core::PricingError;

/// Variance-positivity policy for the Euler discretization of the Heston
/// variance process.
///
/// The continuous process keeps variance non-negative, its Euler
/// discretization does not. Both policies below are documented, swappable
/// choices rather than hidden constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum VarianceScheme {
    /// Negative variance is floored at zero before use (full truncation).
    #[default]
    FullTruncation,
    /// Negative variance is reflected to its absolute value.
    Reflection,
}

impl VarianceScheme {
    /// Sanitizes a possibly-negative Euler variance.
    #[inline]
    pub fn sanitize(self, v: f64) -> f64 {
        match self {
            Self::FullTruncation => v.max(0.0),
            Self::Reflection => v.abs(),
        }
    }
}

/// Heston stochastic-volatility parameters.
///
/// Dynamics under the pricing measure:
/// `dS = mu S dt + sqrt(v) S dW_s`,
/// `dv = kappa (theta - v) dt + xi sqrt(v) dW_v`,
/// with `corr(dW_s, dW_v) = rho`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HestonParams {
    /// Initial instantaneous variance.
    pub v0: f64,
    /// Mean-reversion speed of variance.
    pub kappa: f64,
    /// Long-run variance.
    pub theta: f64,
    /// Volatility of variance.
    pub xi: f64,
    /// Correlation between spot and variance Brownian motions.
    pub rho: f64,
}

impl HestonParams {
    /// Creates a parameter set; bounds are checked by [`Self::validate`]
    /// at the point of use.
    pub fn new(v0: f64, kappa: f64, theta: f64, xi: f64, rho: f64) -> Self {
        Self {
            v0,
            kappa,
            theta,
            xi,
            rho,
        }
    }

    /// Validates hard parameter bounds.
    ///
    /// `xi == 0` is accepted: the model then degenerates to deterministic
    /// variance, which is useful for Black-Scholes reduction checks. The
    /// transform engine additionally requires `xi > 0`.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !self.v0.is_finite() || self.v0 < 0.0 {
            return Err(PricingError::InvalidInput(
                "heston v0 must be >= 0".to_string(),
            ));
        }
        if !self.kappa.is_finite() || self.kappa <= 0.0 {
            return Err(PricingError::InvalidInput(
                "heston kappa must be > 0".to_string(),
            ));
        }
        if !self.theta.is_finite() || self.theta <= 0.0 {
            return Err(PricingError::InvalidInput(
                "heston theta must be > 0".to_string(),
            ));
        }
        if !self.xi.is_finite() || self.xi < 0.0 {
            return Err(PricingError::InvalidInput(
                "heston xi must be >= 0".to_string(),
            ));
        }
        if !self.rho.is_finite() || !(-1.0..=1.0).contains(&self.rho) {
            return Err(PricingError::InvalidInput(
                "heston rho must be in [-1, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Feller condition `2 kappa theta >= xi^2`.
    ///
    /// Violations are legal (the discretization schemes handle the variance
    /// touching zero) but are surfaced as a diagnostic.
    #[inline]
    pub fn feller_satisfied(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.xi * self.xi
    }

    /// One Euler step of the joint (spot, variance) process.
    ///
    /// `z1` drives the variance, `z2` is independent; the spot shock is
    /// `rho * z1 + sqrt(1 - rho^2) * z2`. The variance entering the drift,
    /// diffusion, and the log-Euler spot update is sanitized by `scheme`.
    #[inline]
    pub fn step_euler(
        &self,
        s: f64,
        v: f64,
        drift: f64,
        dt: f64,
        z1: f64,
        z2: f64,
        scheme: VarianceScheme,
    ) -> (f64, f64) {
        let v_pos = scheme.sanitize(v);
        let sqrt_dt = dt.sqrt();

        let zv = z1;
        let zs = self.rho * z1 + (1.0 - self.rho * self.rho).sqrt() * z2;

        let v_next = scheme
            .sanitize(v + self.kappa * (self.theta - v_pos) * dt + self.xi * v_pos.sqrt() * sqrt_dt * zv);
        let s_next = s * ((drift - 0.5 * v_pos) * dt + v_pos.sqrt() * sqrt_dt * zs).exp();

        (s_next, v_next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_bounds() {
        assert!(HestonParams::new(0.04, 2.0, 0.04, 0.5, -0.7).validate().is_ok());
        assert!(HestonParams::new(-0.01, 2.0, 0.04, 0.5, -0.7).validate().is_err());
        assert!(HestonParams::new(0.04, 0.0, 0.04, 0.5, -0.7).validate().is_err());
        assert!(HestonParams::new(0.04, 2.0, 0.0, 0.5, -0.7).validate().is_err());
        assert!(HestonParams::new(0.04, 2.0, 0.04, -0.5, -0.7).validate().is_err());
        assert!(HestonParams::new(0.04, 2.0, 0.04, 0.5, -1.5).validate().is_err());
        // xi == 0 degenerates to deterministic variance and stays valid.
        assert!(HestonParams::new(0.04, 2.0, 0.04, 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn feller_condition_diagnostic() {
        let ok = HestonParams::new(0.04, 2.0, 0.04, 0.3, -0.5);
        assert!(ok.feller_satisfied());
        let violated = HestonParams::new(0.04, 0.5, 0.04, 0.9, -0.5);
        assert!(!violated.feller_satisfied());
    }

    #[test]
    fn truncation_and_reflection_keep_variance_non_negative() {
        let params = HestonParams::new(0.0001, 3.0, 0.02, 1.5, -0.9);
        let mut v_t = params.v0;
        let mut v_r = params.v0;
        // Large negative shocks drive the raw Euler variance below zero.
        for _ in 0..50 {
            let (_, vt) = params.step_euler(100.0, v_t, 0.0, 0.05, -3.0, 0.0, VarianceScheme::FullTruncation);
            let (_, vr) = params.step_euler(100.0, v_r, 0.0, 0.05, -3.0, 0.0, VarianceScheme::Reflection);
            assert!(vt >= 0.0);
            assert!(vr >= 0.0);
            v_t = vt;
            v_r = vr;
        }
    }

    #[test]
    fn zero_vol_of_vol_reduces_to_deterministic_variance() {
        let params = HestonParams::new(0.04, 2.0, 0.04, 0.0, 0.0);
        // v0 == theta and xi == 0 pins the variance at theta.
        let (_, v_next) = params.step_euler(100.0, 0.04, 0.02, 0.01, 1.7, -0.4, VarianceScheme::FullTruncation);
        assert!((v_next - 0.04).abs() < 1e-15);
    }
}
