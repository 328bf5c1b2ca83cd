//! Path payoff evaluators for the Monte Carlo engine.
//!
//! Evaluators are validated at construction so that `evaluate` itself is
//! infallible; a malformed contract never reaches the hot loop. Barrier
//! monitoring is discrete: the barrier is checked at every stored path
//! point, including the initial spot.

use crate::core::{BarrierDirection, BarrierStyle, OptionType, PricingError};
use crate::mc::SimulationPath;

/// A payoff evaluated on a complete simulated path.
pub trait PayoffEvaluator: Send + Sync {
    /// Undiscounted payoff of one path.
    fn evaluate(&self, path: &SimulationPath) -> f64;
}

/// Knock-in / knock-out barrier option payoff with a vanilla terminal leg.
#[derive(Debug, Clone, Copy)]
pub struct BarrierPayoff {
    direction: BarrierDirection,
    style: BarrierStyle,
    level: f64,
    option_type: OptionType,
    strike: f64,
}

impl BarrierPayoff {
    /// Creates a barrier payoff, validating the contract terms.
    pub fn new(
        direction: BarrierDirection,
        style: BarrierStyle,
        level: f64,
        option_type: OptionType,
        strike: f64,
    ) -> Result<Self, PricingError> {
        if !(level > 0.0) || !level.is_finite() {
            return Err(PricingError::InvalidInput(
                "barrier level must be > 0 and finite".to_string(),
            ));
        }
        if !(strike > 0.0) || !strike.is_finite() {
            return Err(PricingError::InvalidInput(
                "barrier strike must be > 0 and finite".to_string(),
            ));
        }
        Ok(Self {
            direction,
            style,
            level,
            option_type,
            strike,
        })
    }

    fn breached(&self, path: &SimulationPath) -> bool {
        match self.direction {
            BarrierDirection::Up => path.spot.iter().any(|&s| s >= self.level),
            BarrierDirection::Down => path.spot.iter().any(|&s| s <= self.level),
        }
    }
}

impl PayoffEvaluator for BarrierPayoff {
    fn evaluate(&self, path: &SimulationPath) -> f64 {
        let breached = self.breached(path);
        let alive = match self.style {
            BarrierStyle::In => breached,
            BarrierStyle::Out => !breached,
        };
        if alive {
            self.option_type.payoff(path.terminal_spot(), self.strike)
        } else {
            0.0
        }
    }
}

/// Arithmetic-average Asian payoff.
///
/// By default the average runs over every simulated step (path indices
/// `1..=steps`, excluding the initial spot). An optional inclusive index
/// window restricts the averaging to a sub-range of stored path points.
#[derive(Debug, Clone, Copy)]
pub struct AsianPayoff {
    option_type: OptionType,
    strike: f64,
    window: Option<(usize, usize)>,
}

impl AsianPayoff {
    /// Creates an Asian payoff averaging over all simulated steps.
    pub fn new(option_type: OptionType, strike: f64) -> Result<Self, PricingError> {
        Self::with_window_opt(option_type, strike, None)
    }

    /// Creates an Asian payoff averaging over the inclusive index window
    /// `[first, last]` of stored path points.
    pub fn with_window(
        option_type: OptionType,
        strike: f64,
        first: usize,
        last: usize,
    ) -> Result<Self, PricingError> {
        Self::with_window_opt(option_type, strike, Some((first, last)))
    }

    fn with_window_opt(
        option_type: OptionType,
        strike: f64,
        window: Option<(usize, usize)>,
    ) -> Result<Self, PricingError> {
        if !(strike > 0.0) || !strike.is_finite() {
            return Err(PricingError::InvalidInput(
                "asian strike must be > 0 and finite".to_string(),
            ));
        }
        if let Some((first, last)) = window {
            if first > last {
                return Err(PricingError::InvalidInput(
                    "asian averaging window must have first <= last".to_string(),
                ));
            }
        }
        Ok(Self {
            option_type,
            strike,
            window,
        })
    }
}

impl PayoffEvaluator for AsianPayoff {
    fn evaluate(&self, path: &SimulationPath) -> f64 {
        if path.spot.len() < 2 {
            return 0.0;
        }
        let (first, last) = match self.window {
            Some((first, last)) => (first, last.min(path.spot.len() - 1)),
            None => (1, path.spot.len() - 1),
        };
        if first > last {
            return 0.0;
        }
        let slice = &path.spot[first..=last];
        let mean = slice.iter().sum::<f64>() / slice.len() as f64;
        self.option_type.payoff(mean, self.strike)
    }
}

/// Cash-or-nothing digital payoff on terminal moneyness.
#[derive(Debug, Clone, Copy)]
pub struct DigitalPayoff {
    option_type: OptionType,
    strike: f64,
    cash: f64,
}

impl DigitalPayoff {
    /// Creates a digital payoff paying `cash` when the terminal spot
    /// finishes in the money.
    pub fn new(option_type: OptionType, strike: f64, cash: f64) -> Result<Self, PricingError> {
        if !(strike > 0.0) || !strike.is_finite() {
            return Err(PricingError::InvalidInput(
                "digital strike must be > 0 and finite".to_string(),
            ));
        }
        if !(cash > 0.0) || !cash.is_finite() {
            return Err(PricingError::InvalidInput(
                "digital cash amount must be > 0 and finite".to_string(),
            ));
        }
        Ok(Self {
            option_type,
            strike,
            cash,
        })
    }
}

impl PayoffEvaluator for DigitalPayoff {
    fn evaluate(&self, path: &SimulationPath) -> f64 {
        let terminal = path.terminal_spot();
        let in_the_money = match self.option_type {
            OptionType::Call => terminal > self.strike,
            OptionType::Put => terminal < self.strike,
        };
        if in_the_money {
            self.cash
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn path(spot: &[f64]) -> SimulationPath {
        SimulationPath {
            spot: spot.to_vec(),
            variance: vec![0.04; spot.len()],
        }
    }

    #[test]
    fn up_and_out_call_dies_on_touch() {
        let payoff = BarrierPayoff::new(
            BarrierDirection::Up,
            BarrierStyle::Out,
            120.0,
            OptionType::Call,
            100.0,
        )
        .unwrap();

        // Touching the level exactly counts as a breach.
        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 110.0, 120.0, 115.0])), 0.0);
        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 110.0, 115.0])), 15.0);
    }

    #[test]
    fn down_and_in_put_needs_a_breach() {
        let payoff = BarrierPayoff::new(
            BarrierDirection::Down,
            BarrierStyle::In,
            80.0,
            OptionType::Put,
            100.0,
        )
        .unwrap();

        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 90.0, 85.0])), 0.0);
        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 79.0, 85.0])), 15.0);
    }

    #[test]
    fn in_plus_out_equals_vanilla_on_every_path() {
        let knock_in = BarrierPayoff::new(
            BarrierDirection::Up,
            BarrierStyle::In,
            115.0,
            OptionType::Call,
            100.0,
        )
        .unwrap();
        let knock_out = BarrierPayoff::new(
            BarrierDirection::Up,
            BarrierStyle::Out,
            115.0,
            OptionType::Call,
            100.0,
        )
        .unwrap();

        for spots in [
            vec![100.0, 108.0, 112.0],
            vec![100.0, 118.0, 112.0],
            vec![100.0, 95.0, 130.0],
            vec![100.0, 90.0, 80.0],
        ] {
            let p = path(&spots);
            let vanilla = (p.terminal_spot() - 100.0).max(0.0);
            assert_relative_eq!(
                knock_in.evaluate(&p) + knock_out.evaluate(&p),
                vanilla,
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn asian_averages_simulated_steps() {
        let payoff = AsianPayoff::new(OptionType::Call, 100.0).unwrap();
        // Average of [104, 106, 102] = 104, initial spot excluded.
        assert_relative_eq!(
            payoff.evaluate(&path(&[100.0, 104.0, 106.0, 102.0])),
            4.0
        );

        let windowed = AsianPayoff::with_window(OptionType::Call, 100.0, 2, 3).unwrap();
        // Average of [106, 102] = 104.
        assert_relative_eq!(
            windowed.evaluate(&path(&[100.0, 104.0, 106.0, 102.0])),
            4.0
        );
    }

    #[test]
    fn digital_pays_fixed_cash_on_terminal_moneyness() {
        let payoff = DigitalPayoff::new(OptionType::Call, 100.0, 10.0).unwrap();
        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 101.0])), 10.0);
        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 99.0])), 0.0);
        // At the money pays nothing.
        assert_relative_eq!(payoff.evaluate(&path(&[100.0, 100.0])), 0.0);

        let put = DigitalPayoff::new(OptionType::Put, 100.0, 10.0).unwrap();
        assert_relative_eq!(put.evaluate(&path(&[100.0, 99.0])), 10.0);
    }

    #[test]
    fn construction_rejects_bad_terms() {
        assert!(BarrierPayoff::new(
            BarrierDirection::Up,
            BarrierStyle::Out,
            0.0,
            OptionType::Call,
            100.0
        )
        .is_err());
        assert!(BarrierPayoff::new(
            BarrierDirection::Up,
            BarrierStyle::Out,
            120.0,
            OptionType::Call,
            -1.0
        )
        .is_err());
        assert!(AsianPayoff::new(OptionType::Call, f64::NAN).is_err());
        assert!(AsianPayoff::with_window(OptionType::Call, 100.0, 5, 2).is_err());
        assert!(DigitalPayoff::new(OptionType::Put, 100.0, 0.0).is_err());
    }
}
