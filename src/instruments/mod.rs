//! Instrument contract definitions consumed by the pricing engines.

pub mod vanilla;

pub use vanilla::VanillaOption;
