//! Pricing engines grouped by numerical method.

pub mod american;
pub mod analytic;
pub mod transform;
pub mod tree;

pub use american::BjerksundStenslandEngine;
pub use analytic::BlackScholesEngine;
pub use transform::HestonEngine;
pub use tree::BinomialTreeEngine;
