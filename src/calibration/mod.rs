//! Model calibration to market quotes.
//!
//! The module is split into a model-agnostic layer (`core` for constraint
//! and convergence types, `optimizers` for the bounded least-squares
//! solver) and model bindings (`heston`).

pub mod core;
pub mod heston;
pub mod optimizers;

pub use self::core::{BoxConstraints, ConvergenceInfo, TerminationReason};
pub use heston::{HestonCalibration, HestonCalibrator, PriceQuote};
pub use optimizers::{levenberg_marquardt, LmOptions, OptimisationResult};
