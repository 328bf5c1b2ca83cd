//! IronVol is a Rust-native option pricing and calibration library built
//! around a small set of interchangeable engines: closed-form Black-Scholes,
//! a binomial lattice with discrete cash dividends and American exercise,
//! semi-analytic and Monte Carlo Heston, and a least-squares Heston
//! calibrator.
//!
//! References used across modules include:
//! - Hull, *Options, Futures, and Other Derivatives* (11th ed.), Ch. 13, 15, 21.
//! - Haug, *The Complete Guide to Option Pricing Formulas* (2nd ed.).
//! - Gatheral, *The Volatility Surface* (2006) for the Heston transform.
//! - Glasserman (2004) for Monte Carlo estimators.
//!
//! Numerical considerations:
//! - Lattice modules expose the step count; accuracy/cost trades off there,
//!   and convergence in steps is oscillatory for American puts.
//! - MC modules expose path count, step count and the RNG seed; standard
//!   errors are sampling-driven and paths are reproducible per seed.
//! - Calibration enforces parameter bounds to avoid non-physical fits and
//!   reports convergence metadata alongside the fitted parameters.
//!
//! # Feature Flags
//! - `parallel`: enables Rayon-powered parallel Monte Carlo path generation
//!   (on by default).
//!
//! # Quick Start
//! Price a Black-Scholes call:
//! ```rust
//! use ironvol::core::OptionType;
//! use ironvol::engines::analytic::bs_price;
//!
//! let px = bs_price(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 0.20, 1.0);
//! assert!(px > 10.0 && px < 11.0);
//! ```
//!
//! Compute Greeks:
//! ```rust
//! use ironvol::core::OptionType;
//! use ironvol::engines::analytic::bs_greeks;
//!
//! let g = bs_greeks(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 0.20, 1.0);
//! assert!(g.delta > 0.0 && g.gamma > 0.0 && g.vega > 0.0);
//! ```
//!
//! Price an American put on a lattice:
//! ```rust
//! use ironvol::core::PricingEngine;
//! use ironvol::engines::BinomialTreeEngine;
//! use ironvol::instruments::VanillaOption;
//! use ironvol::market::Market;
//!
//! let market = Market::builder()
//!     .spot(100.0)
//!     .rate(0.05)
//!     .flat_vol(0.2)
//!     .build()
//!     .unwrap();
//! let put = VanillaOption::american_put(100.0, 1.0);
//! let result = BinomialTreeEngine::new(500).price(&put, &market).unwrap();
//! assert!(result.price > 6.0 && result.price < 6.2);
//! ```
//!
//! Price under Heston via the transform engine:
//! ```rust
//! use ironvol::core::PricingEngine;
//! use ironvol::engines::HestonEngine;
//! use ironvol::instruments::VanillaOption;
//! use ironvol::market::Market;
//! use ironvol::models::HestonParams;
//!
//! let market = Market::builder()
//!     .spot(100.0)
//!     .rate(0.03)
//!     .flat_vol(0.2)
//!     .build()
//!     .unwrap();
//! let params = HestonParams::new(0.04, 2.0, 0.04, 0.5, -0.7);
//! let call = VanillaOption::european_call(100.0, 1.0);
//! let result = HestonEngine::new(params).price(&call, &market).unwrap();
//! assert!(result.price > 8.5 && result.price < 9.5);
//! ```

pub mod calibration;
pub mod core;
pub mod engines;
pub mod instruments;
pub mod market;
pub mod math;
pub mod mc;
pub mod models;

/// Common imports for ergonomic usage.
#[allow(ambiguous_glob_reexports)]
pub mod prelude {
    pub use crate::calibration::{HestonCalibrator, PriceQuote};
    pub use crate::core::*;
    pub use crate::engines::*;
    pub use crate::instruments::*;
    pub use crate::market::*;
    pub use crate::mc::{
        simulate_heston, AsianPayoff, BarrierPayoff, DigitalPayoff, MonteCarloEngine,
        PayoffEvaluator, SimulationPath,
    };
    pub use crate::models::*;
}
