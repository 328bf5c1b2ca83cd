//! Heston calibration to European vanilla price quotes.
//!
//! Fits `(v0, kappa, theta, xi, rho)` by bounded Levenberg-Marquardt on
//! price-space residuals `model - market`, with the transform pricer as
//! the model leg. Price residuals keep the objective smooth across deep
//! in- and out-of-the-money quotes without an implied-vol inversion.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::calibration::core::{BoxConstraints, ConvergenceInfo};
use crate::calibration::optimizers::{levenberg_marquardt, LmOptions};
use crate::core::{OptionType, PricingError};
use crate::engines::transform::heston_price;
use crate::models::HestonParams;

/// Residual magnitude standing in for a failed model evaluation; large
/// enough that the optimizer backs away from the offending region.
const PENALTY_RESIDUAL: f64 = 1e6;

/// A single observed European vanilla quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub strike: f64,
    pub maturity: f64,
    pub price: f64,
    pub option_type: OptionType,
}

impl PriceQuote {
    fn validate(&self) -> Result<(), PricingError> {
        if !(self.strike > 0.0) || !self.strike.is_finite() {
            return Err(PricingError::InvalidInput(
                "quote strike must be > 0 and finite".to_string(),
            ));
        }
        if !(self.maturity > 0.0) || !self.maturity.is_finite() {
            return Err(PricingError::InvalidInput(
                "quote maturity must be > 0 and finite".to_string(),
            ));
        }
        if !(self.price >= 0.0) || !self.price.is_finite() {
            return Err(PricingError::InvalidInput(
                "quote price must be >= 0 and finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Calibrated parameter set with fit and convergence diagnostics.
#[derive(Debug, Clone)]
pub struct HestonCalibration {
    pub params: HestonParams,
    pub objective: f64,
    pub rmse: f64,
    pub residuals: Vec<f64>,
    pub convergence: ConvergenceInfo,
    pub feller_satisfied: bool,
}

/// Heston calibrator over a fixed market environment.
#[derive(Debug, Clone)]
pub struct HestonCalibrator {
    pub spot: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub bounds: BoxConstraints,
    pub options: LmOptions,
}

impl HestonCalibrator {
    /// Creates a calibrator with default parameter bounds.
    ///
    /// The default box keeps `rho` strictly inside `(-1, 1)` and `xi`
    /// strictly positive, the domain the transform pricer requires.
    pub fn new(spot: f64, rate: f64, dividend_yield: f64) -> Result<Self, PricingError> {
        if !(spot > 0.0) || !spot.is_finite() {
            return Err(PricingError::InvalidInput(
                "calibrator spot must be > 0 and finite".to_string(),
            ));
        }
        let bounds = BoxConstraints::new(
            //        v0     kappa  theta  xi     rho
            vec![1e-4, 0.05, 1e-4, 0.01, -0.95],
            vec![1.0, 10.0, 1.0, 2.0, 0.95],
        )?;
        Ok(Self {
            spot,
            rate,
            dividend_yield,
            bounds,
            options: LmOptions::default(),
        })
    }

    /// Replaces the default parameter box.
    pub fn with_bounds(mut self, bounds: BoxConstraints) -> Result<Self, PricingError> {
        if bounds.dimension() != 5 {
            return Err(PricingError::InvalidInput(
                "heston calibration bounds must have dimension 5".to_string(),
            ));
        }
        self.bounds = bounds;
        Ok(self)
    }

    /// Replaces the default solver options.
    pub fn with_options(mut self, options: LmOptions) -> Self {
        self.options = options;
        self
    }

    /// Fits Heston parameters to `quotes`, starting from `initial`.
    pub fn calibrate(
        &self,
        initial: &HestonParams,
        quotes: &[PriceQuote],
    ) -> Result<HestonCalibration, PricingError> {
        if quotes.is_empty() {
            return Err(PricingError::ConvergenceFailure(
                "cannot calibrate against an empty quote set".to_string(),
            ));
        }
        for quote in quotes {
            quote.validate()?;
        }
        initial.validate()?;

        let spot = self.spot;
        let rate = self.rate;
        let dividend_yield = self.dividend_yield;

        let residual_fn = |x: &[f64]| -> Vec<f64> {
            let params = HestonParams {
                v0: x[0],
                kappa: x[1],
                theta: x[2],
                xi: x[3],
                rho: x[4],
            };
            quotes
                .iter()
                .map(|q| {
                    match heston_price(
                        &params,
                        q.option_type,
                        spot,
                        q.strike,
                        q.maturity,
                        rate,
                        dividend_yield,
                    ) {
                        Ok(model) => model - q.price,
                        Err(_) => PENALTY_RESIDUAL,
                    }
                })
                .collect()
        };

        let x0 = [initial.v0, initial.kappa, initial.theta, initial.xi, initial.rho];
        let out = levenberg_marquardt(&x0, &self.bounds, self.options, residual_fn)?;

        if !out.convergence.converged {
            return Err(PricingError::ConvergenceFailure(format!(
                "heston calibration did not converge after {} iterations ({:?})",
                out.convergence.iterations, out.convergence.reason
            )));
        }

        let params = HestonParams {
            v0: out.x[0],
            kappa: out.x[1],
            theta: out.x[2],
            xi: out.x[3],
            rho: out.x[4],
        };
        let n = out.residuals.len() as f64;
        let rmse = (2.0 * out.objective / n).sqrt();
        let feller_satisfied = params.feller_satisfied();
        if !feller_satisfied {
            warn!(
                "calibrated parameters violate the feller condition (2*kappa*theta = {:.6}, xi^2 = {:.6})",
                2.0 * params.kappa * params.theta,
                params.xi * params.xi
            );
        }
        if self.bounds.hits_boundary(&out.x, 1e-9) {
            debug!("calibrated parameters sit on the constraint boundary: {:?}", out.x);
        }

        Ok(HestonCalibration {
            params,
            objective: out.objective,
            rmse,
            residuals: out.residuals,
            convergence: out.convergence,
            feller_satisfied,
        })
    }
}
