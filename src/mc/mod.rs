//! Monte Carlo simulation and estimation.
//!
//! Path generation is deterministic given a base seed: path `i` draws from
//! its own `StdRng` seeded with `seed + i * 7919`, so results do not depend
//! on scheduling and the same path set is reproducible with or without the
//! `parallel` feature.

pub mod payoff;

pub use payoff::{AsianPayoff, BarrierPayoff, DigitalPayoff, PayoffEvaluator};

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{PricingError, PricingResult};
use crate::market::Market;
use crate::math::normal_inv_cdf;
use crate::models::{HestonParams, VarianceScheme};

/// Standard normal draw by inverse-CDF transform of a uniform, clamped to
/// the open unit interval.
#[inline]
fn draw_normal(rng: &mut StdRng) -> f64 {
    let u: f64 = rng.random();
    normal_inv_cdf(u.clamp(1e-16, 1.0 - 1e-16))
}

/// A single simulated path of the spot and its instantaneous variance.
///
/// Both series have `steps + 1` entries; index 0 holds the initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPath {
    /// Spot levels, including the initial spot at index 0.
    pub spot: Vec<f64>,
    /// Variance levels, including the initial variance at index 0.
    pub variance: Vec<f64>,
}

impl SimulationPath {
    /// Number of simulated steps (one less than the number of stored points).
    pub fn num_steps(&self) -> usize {
        self.spot.len().saturating_sub(1)
    }

    /// Terminal spot level.
    pub fn terminal_spot(&self) -> f64 {
        self.spot.last().copied().unwrap_or(f64::NAN)
    }
}

/// Simulates Heston paths under the risk-neutral measure with a log-Euler
/// scheme for the spot and the selected variance positivity scheme.
pub fn simulate_heston(
    params: &HestonParams,
    market: &Market,
    expiry: f64,
    steps: usize,
    num_paths: usize,
    seed: u64,
    scheme: VarianceScheme,
) -> Result<Vec<SimulationPath>, PricingError> {
    params.validate()?;
    if !(expiry > 0.0) || !expiry.is_finite() {
        return Err(PricingError::InvalidInput(
            "simulation expiry must be > 0 and finite".to_string(),
        ));
    }
    if steps < 1 {
        return Err(PricingError::InvalidInput(
            "simulation requires at least one time step".to_string(),
        ));
    }
    if num_paths < 1 {
        return Err(PricingError::InvalidInput(
            "simulation requires at least one path".to_string(),
        ));
    }
    if !params.feller_satisfied() {
        warn!(
            "feller condition violated (2*kappa*theta = {:.6} < xi^2 = {:.6}); variance will hit zero frequently",
            2.0 * params.kappa * params.theta,
            params.xi * params.xi
        );
    }

    let dt = expiry / steps as f64;
    let drift = market.rate - market.dividend_yield;

    let simulate_one = |i: usize| -> Result<SimulationPath, PricingError> {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64 * 7_919));
        let mut spot = Vec::with_capacity(steps + 1);
        let mut variance = Vec::with_capacity(steps + 1);
        let mut s = market.spot;
        let mut v = params.v0;
        spot.push(s);
        variance.push(v);

        for _ in 0..steps {
            let z1 = draw_normal(&mut rng);
            let z2 = draw_normal(&mut rng);
            let (s_next, v_next) = params.step_euler(s, v, drift, dt, z1, z2, scheme);
            if !s_next.is_finite() || !v_next.is_finite() {
                return Err(PricingError::NumericalError(
                    "heston euler step produced non-finite state".to_string(),
                ));
            }
            s = s_next;
            v = v_next;
            spot.push(s);
            variance.push(v);
        }

        Ok(SimulationPath { spot, variance })
    };

    #[cfg(feature = "parallel")]
    let paths = (0..num_paths)
        .into_par_iter()
        .map(simulate_one)
        .collect::<Result<Vec<_>, _>>()?;

    #[cfg(not(feature = "parallel"))]
    let paths = (0..num_paths)
        .map(simulate_one)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(paths)
}

/// Discounted Monte Carlo estimator over pre-simulated paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonteCarloEngine;

impl MonteCarloEngine {
    /// Estimates the discounted expectation of `payoff` over `paths`.
    ///
    /// Returns the sample mean as the price and the standard error of the
    /// mean (`sd / sqrt(n)`); the standard error is `None` for a single
    /// path, where the sample deviation is undefined.
    pub fn estimate(
        paths: &[SimulationPath],
        rate: f64,
        maturity: f64,
        payoff: &dyn PayoffEvaluator,
    ) -> Result<PricingResult, PricingError> {
        if paths.is_empty() {
            return Err(PricingError::InvalidInput(
                "monte carlo estimation requires at least one path".to_string(),
            ));
        }

        let discount = (-rate * maturity).exp();
        let n = paths.len() as f64;

        let mut sum = 0.0;
        let mut values = Vec::with_capacity(paths.len());
        for path in paths {
            let value = discount * payoff.evaluate(path);
            if !value.is_finite() {
                return Err(PricingError::NumericalError(
                    "payoff evaluation produced non-finite value".to_string(),
                ));
            }
            sum += value;
            values.push(value);
        }
        let mean = sum / n;

        let stderr = if paths.len() > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            Some((ss / (n - 1.0)).sqrt() / n.sqrt())
        } else {
            None
        };

        let mut result = PricingResult::from_price(mean);
        result.stderr = stderr;
        result.diagnostics.insert("num_paths".to_string(), n);
        Ok(result)
    }
}
