//! Canonical plain-vanilla option contract definition used throughout the library.

use crate::core::{ExerciseStyle, Instrument, OptionType, PricingError};

/// Vanilla option contract.
///
/// This is the canonical input for the analytic, lattice, transform, and
/// American-approximation engines: strike `K`, expiry `T`, option side, and
/// exercise rights.
///
/// # Examples
/// ```
/// use ironvol::core::{ExerciseStyle, OptionType};
/// use ironvol::instruments::VanillaOption;
///
/// let option = VanillaOption::european_call(100.0, 1.0);
/// assert_eq!(option.option_type, OptionType::Call);
/// assert!(matches!(option.exercise, ExerciseStyle::European));
/// assert!(option.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VanillaOption {
    /// Call or put.
    pub option_type: OptionType,
    /// Strike level.
    pub strike: f64,
    /// Expiry in years.
    pub expiry: f64,
    /// Exercise style.
    pub exercise: ExerciseStyle,
}

impl VanillaOption {
    /// Builds a European call option.
    pub fn european_call(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Call,
            strike,
            expiry,
            exercise: ExerciseStyle::European,
        }
    }

    /// Builds a European put option.
    pub fn european_put(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Put,
            strike,
            expiry,
            exercise: ExerciseStyle::European,
        }
    }

    /// Builds an American call option.
    pub fn american_call(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Call,
            strike,
            expiry,
            exercise: ExerciseStyle::American,
        }
    }

    /// Builds an American put option.
    pub fn american_put(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Put,
            strike,
            expiry,
            exercise: ExerciseStyle::American,
        }
    }

    /// Validates instrument fields.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidInput`] when `strike <= 0` or
    /// `expiry <= 0`.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(PricingError::InvalidInput(
                "vanilla strike must be > 0".to_string(),
            ));
        }
        if !self.expiry.is_finite() || self.expiry <= 0.0 {
            return Err(PricingError::InvalidInput(
                "vanilla expiry must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Instrument for VanillaOption {
    fn instrument_type(&self) -> &str {
        "VanillaOption"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_bad_strike_and_expiry() {
        assert!(VanillaOption::european_call(0.0, 1.0).validate().is_err());
        assert!(VanillaOption::european_call(100.0, 0.0).validate().is_err());
        assert!(VanillaOption::european_call(100.0, -1.0).validate().is_err());
        assert!(VanillaOption::american_put(100.0, 1.0).validate().is_ok());
    }
}
