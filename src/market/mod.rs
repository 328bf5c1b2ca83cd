//! Market snapshot and deterministic discrete-dividend schedules.

use crate::core::PricingError;

/// Market snapshot used by all pricing engines.
///
/// Carries a flat continuously compounded rate, a continuous dividend
/// yield, and a flat Black volatility. Discrete cash dividends are not part
/// of the snapshot; they are supplied per-engine through a
/// [`DividendSchedule`] so an option is always priced under exactly one
/// dividend representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    /// Spot price.
    pub spot: f64,
    /// Continuously compounded risk-free rate.
    pub rate: f64,
    /// Continuously compounded dividend yield.
    pub dividend_yield: f64,
    /// Flat Black volatility.
    pub vol: f64,
}

impl Market {
    /// Starts a market builder.
    #[inline]
    pub fn builder() -> MarketBuilder {
        MarketBuilder::default()
    }

    /// Returns spot price.
    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Returns risk-free rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Returns continuous dividend yield.
    #[inline]
    pub fn dividend(&self) -> f64 {
        self.dividend_yield
    }

    /// Discount factor to `expiry`.
    #[inline]
    pub fn discount_factor(&self, expiry: f64) -> f64 {
        (-self.rate * expiry).exp()
    }
}

/// Builder for [`Market`].
#[derive(Debug, Clone, Default)]
pub struct MarketBuilder {
    spot: Option<f64>,
    rate: Option<f64>,
    dividend_yield: Option<f64>,
    flat_vol: Option<f64>,
}

impl MarketBuilder {
    /// Sets the spot price.
    #[inline]
    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    /// Sets the flat risk-free rate.
    #[inline]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Sets the continuous dividend yield.
    #[inline]
    pub fn dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    /// Sets the flat volatility.
    #[inline]
    pub fn flat_vol(mut self, vol: f64) -> Self {
        self.flat_vol = Some(vol);
        self
    }

    /// Validates and builds a [`Market`].
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidInput`] when required fields are
    /// missing or when spot/flat-vol are non-positive.
    pub fn build(self) -> Result<Market, PricingError> {
        let spot = self
            .spot
            .ok_or_else(|| PricingError::InvalidInput("market spot is required".to_string()))?;
        if !spot.is_finite() || spot <= 0.0 {
            return Err(PricingError::InvalidInput(
                "market spot must be > 0".to_string(),
            ));
        }

        let rate = self.rate.unwrap_or(0.0);
        let dividend_yield = self.dividend_yield.unwrap_or(0.0);
        if dividend_yield < 0.0 {
            return Err(PricingError::InvalidInput(
                "market dividend yield must be >= 0".to_string(),
            ));
        }

        let vol = self
            .flat_vol
            .ok_or_else(|| PricingError::InvalidInput("market flat_vol is required".to_string()))?;
        if !vol.is_finite() || vol <= 0.0 {
            return Err(PricingError::InvalidInput(
                "market flat_vol must be > 0".to_string(),
            ));
        }

        Ok(Market {
            spot,
            rate,
            dividend_yield,
            vol,
        })
    }
}

/// Single deterministic cash dividend.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DividendEvent {
    /// Ex-dividend time in years from valuation date.
    pub time: f64,
    /// Cash amount subtracted from the underlying at the ex-date.
    pub amount: f64,
}

impl DividendEvent {
    /// Builds a cash dividend event.
    pub fn cash(time: f64, amount: f64) -> Result<Self, PricingError> {
        let event = Self { time, amount };
        event.validate()?;
        Ok(event)
    }

    /// Applies the ex-date drop to a pre-dividend spot.
    #[inline]
    pub fn apply_jump(self, pre_div_spot: f64) -> f64 {
        (pre_div_spot - self.amount).max(0.0)
    }

    fn validate(self) -> Result<(), PricingError> {
        if !self.time.is_finite() || self.time <= 0.0 {
            return Err(PricingError::InvalidInput(
                "dividend event time must be finite and > 0".to_string(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(PricingError::InvalidInput(
                "cash dividend amount must be finite and > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Deterministic discrete cash-dividend schedule, sorted by ex-date.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct DividendSchedule {
    events: Vec<DividendEvent>,
}

impl DividendSchedule {
    /// Builds a schedule from events and validates ordering and values.
    pub fn new(mut events: Vec<DividendEvent>) -> Result<Self, PricingError> {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let schedule = Self { events };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Returns an empty schedule.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` when no events are present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the underlying sorted event slice.
    #[inline]
    pub fn events(&self) -> &[DividendEvent] {
        &self.events
    }

    /// Validates event values and strictly-increasing event times.
    pub fn validate(&self) -> Result<(), PricingError> {
        let mut prev_time = 0.0_f64;
        for event in &self.events {
            event.validate()?;
            if event.time <= prev_time {
                return Err(PricingError::InvalidInput(
                    "dividend event times must be strictly increasing".to_string(),
                ));
            }
            prev_time = event.time;
        }
        Ok(())
    }

    /// Checks every ex-date lies in `(0, maturity]`.
    pub fn validate_against_expiry(&self, maturity: f64) -> Result<(), PricingError> {
        if self.events.iter().any(|ev| ev.time > maturity) {
            return Err(PricingError::InvalidInput(
                "dividend ex-dates must lie in (0, expiry]".to_string(),
            ));
        }
        Ok(())
    }

    /// Present value of all dividends paid up to `maturity`.
    pub fn present_value(&self, rate: f64, maturity: f64) -> f64 {
        self.events
            .iter()
            .filter(|ev| ev.time <= maturity)
            .map(|ev| ev.amount * (-rate * ev.time).exp())
            .sum()
    }

    /// Escrowed-dividend spot: spot reduced by the PV of dividends to `maturity`.
    ///
    /// Closed-form cross-check for European options on dividend-paying stock.
    #[inline]
    pub fn escrowed_spot(&self, spot: f64, rate: f64, maturity: f64) -> f64 {
        (spot - self.present_value(rate, maturity)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn builder_rejects_missing_and_invalid_fields() {
        assert!(Market::builder().build().is_err());
        assert!(Market::builder().spot(-1.0).flat_vol(0.2).build().is_err());
        assert!(Market::builder().spot(100.0).flat_vol(0.0).build().is_err());
        assert!(Market::builder().spot(100.0).flat_vol(0.2).build().is_ok());
    }

    #[test]
    fn schedule_sorts_and_validates_events() {
        let schedule = DividendSchedule::new(vec![
            DividendEvent { time: 0.75, amount: 0.5 },
            DividendEvent { time: 0.25, amount: 1.0 },
        ])
        .expect("valid schedule");
        assert_eq!(schedule.events()[0].time, 0.25);

        assert!(DividendSchedule::new(vec![DividendEvent { time: -0.1, amount: 1.0 }]).is_err());
        assert!(
            DividendSchedule::new(vec![
                DividendEvent { time: 0.5, amount: 1.0 },
                DividendEvent { time: 0.5, amount: 2.0 },
            ])
            .is_err()
        );
    }

    #[test]
    fn escrowed_spot_discounts_each_event() {
        let schedule = DividendSchedule::new(vec![
            DividendEvent { time: 0.25, amount: 1.0 },
            DividendEvent { time: 0.75, amount: 0.5 },
        ])
        .expect("valid schedule");

        let expected = 100.0 - (-0.03_f64 * 0.25).exp() - 0.5 * (-0.03_f64 * 0.75).exp();
        assert_relative_eq!(
            schedule.escrowed_spot(100.0, 0.03, 1.0),
            expected,
            epsilon = 1e-12
        );
        // Events past maturity are excluded.
        assert_relative_eq!(
            schedule.escrowed_spot(100.0, 0.03, 0.5),
            100.0 - (-0.03_f64 * 0.25).exp(),
            epsilon = 1e-12
        );
    }
}
