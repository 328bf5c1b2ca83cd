//! Cox-Ross-Rubinstein binomial lattice with discrete cash dividends.
//!
//! Without dividends the tree recombines and node levels follow from index
//! arithmetic. A cash dividend displaces every node level downward by the
//! cash amount from its ex-date layer onward, while the lattice itself keeps
//! evolving multiplicatively in the pre-dividend underlying, so it stays
//! recombining and the price converges as the step count grows. Layers with
//! a nonzero displacement carry explicitly stored node levels; the shift is
//! constant across a layer, so the descending level order is preserved.
//!
//! Convergence in step count is oscillatory for near-the-money American
//! puts; this is a characteristic of the CRR parameterization, not a bug.

use crate::core::{ExerciseStyle, PricingEngine, PricingError, PricingResult};
use crate::instruments::vanilla::VanillaOption;
use crate::market::{DividendSchedule, Market};

/// Binomial tree engine.
#[derive(Debug, Clone)]
pub struct BinomialTreeEngine {
    /// Number of tree steps.
    pub steps: usize,
    /// Discrete cash dividends applied on the lattice.
    pub dividends: DividendSchedule,
}

impl BinomialTreeEngine {
    /// Creates a tree engine with the given number of steps and no dividends.
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            dividends: DividendSchedule::empty(),
        }
    }

    /// Attaches a discrete cash-dividend schedule.
    pub fn with_dividends(mut self, dividends: DividendSchedule) -> Self {
        self.dividends = dividends;
        self
    }

    fn validate(&self, instrument: &VanillaOption, market: &Market) -> Result<(), PricingError> {
        instrument.validate()?;
        if self.steps < 1 {
            return Err(PricingError::InvalidInput(
                "binomial steps must be >= 1".to_string(),
            ));
        }
        if market.vol <= 0.0 {
            return Err(PricingError::InvalidInput(
                "market volatility must be > 0".to_string(),
            ));
        }
        self.dividends.validate()?;
        self.dividends.validate_against_expiry(instrument.expiry)?;
        if !self.dividends.is_empty() && market.dividend_yield != 0.0 {
            return Err(PricingError::InvalidInput(
                "use either discrete dividends or a continuous yield, not both".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregates dividend amounts by the first tree layer whose time reaches
/// the ex-date. Returns `amount_at_layer[i]` for layers `1..=steps`.
fn dividend_layers(dividends: &DividendSchedule, dt: f64, steps: usize) -> Vec<f64> {
    let mut amounts = vec![0.0_f64; steps + 1];
    for event in dividends.events() {
        let layer = ((event.time / dt) - 1.0e-12).ceil() as usize;
        let layer = layer.clamp(1, steps);
        amounts[layer] += event.amount;
    }
    amounts
}

/// Backward induction over explicitly stored, dividend-displaced node levels.
///
/// The recombining lattice evolves in the pre-dividend underlying; each cash
/// amount is subtracted from every node level at its ex-date layer and at
/// every later layer, so the displacement persists until expiry.
fn price_with_displaced_levels(
    instrument: &VanillaOption,
    market: &Market,
    steps: usize,
    u: f64,
    d: f64,
    p: f64,
    disc: f64,
    dividend_at: &[f64],
) -> (f64, bool) {
    // Forward pass: node levels per layer, highest level first, displaced by
    // the cumulative dividend amount paid up to and including that layer.
    let mut cumulative = 0.0_f64;
    let mut layers: Vec<Vec<f64>> = Vec::with_capacity(steps + 1);
    let mut undisplaced = vec![market.spot];
    layers.push(undisplaced.clone());
    for i in 1..=steps {
        let mut next = Vec::with_capacity(i + 1);
        next.push(undisplaced[0] * u);
        for &level in &undisplaced {
            next.push(level * d);
        }
        undisplaced = next;
        cumulative += dividend_at[i];
        layers.push(undisplaced.iter().map(|&level| level - cumulative).collect());
    }

    let is_american = matches!(instrument.exercise, ExerciseStyle::American);
    let option_type = instrument.option_type;
    let strike = instrument.strike;
    let mut exercised_early = false;

    let mut values: Vec<f64> = layers[steps]
        .iter()
        .map(|&level| option_type.payoff(level, strike))
        .collect();

    for i in (0..steps).rev() {
        let layer = &layers[i];
        for j in 0..=i {
            let continuation = disc * (p * values[j] + (1.0 - p) * values[j + 1]);
            values[j] = if is_american {
                let exercise = option_type.payoff(layer[j], strike);
                if exercise > continuation {
                    exercised_early = true;
                    exercise
                } else {
                    continuation
                }
            } else {
                continuation
            };
        }
        values.truncate(i + 1);
    }

    (values[0], exercised_early)
}

/// Backward induction on the recombining (no-dividend) lattice.
fn price_recombining(
    instrument: &VanillaOption,
    market: &Market,
    steps: usize,
    u: f64,
    d: f64,
    p: f64,
    disc: f64,
) -> (f64, bool) {
    let is_american = matches!(instrument.exercise, ExerciseStyle::American);
    let option_type = instrument.option_type;
    let strike = instrument.strike;
    let ratio = u / d;
    let mut exercised_early = false;

    let mut values = vec![0.0_f64; steps + 1];
    {
        // Terminal levels from the lowest node upward.
        let mut level = market.spot * d.powi(steps as i32);
        for value in values.iter_mut() {
            *value = option_type.payoff(level, strike);
            level *= ratio;
        }
    }

    let mut base = market.spot * d.powi(steps as i32 - 1);
    for i in (0..steps).rev() {
        if is_american {
            let mut level = base;
            for j in 0..=i {
                let continuation = disc * (p * values[j + 1] + (1.0 - p) * values[j]);
                let exercise = option_type.payoff(level, strike);
                if exercise > continuation {
                    exercised_early = true;
                    values[j] = exercise;
                } else {
                    values[j] = continuation;
                }
                level *= ratio;
            }
        } else {
            for j in 0..=i {
                values[j] = disc * (p * values[j + 1] + (1.0 - p) * values[j]);
            }
        }
        base *= u;
    }

    (values[0], exercised_early)
}

impl PricingEngine<VanillaOption> for BinomialTreeEngine {
    fn price(
        &self,
        instrument: &VanillaOption,
        market: &Market,
    ) -> Result<PricingResult, PricingError> {
        self.validate(instrument, market)?;

        let steps = self.steps;
        let dt = instrument.expiry / steps as f64;
        let u = (market.vol * dt.sqrt()).exp();
        let d = 1.0 / u;
        let growth = ((market.rate - market.dividend_yield) * dt).exp();
        let p = (growth - d) / (u - d);
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PricingError::NumericalError(
                "risk-neutral probability is outside [0, 1]".to_string(),
            ));
        }
        let disc = (-market.rate * dt).exp();

        let (price, exercised_early) = if self.dividends.is_empty() {
            price_recombining(instrument, market, steps, u, d, p, disc)
        } else {
            let dividend_at = dividend_layers(&self.dividends, dt, steps);
            price_with_displaced_levels(instrument, market, steps, u, d, p, disc, &dividend_at)
        };

        if !price.is_finite() {
            return Err(PricingError::NumericalError(
                "binomial backward induction produced non-finite value".to_string(),
            ));
        }

        let mut result = PricingResult::from_price(price);
        result
            .diagnostics
            .insert("num_steps".to_string(), steps as f64);
        result.diagnostics.insert(
            "early_exercise".to_string(),
            if exercised_early { 1.0 } else { 0.0 },
        );
        Ok(result)
    }
}
