//! Closed-form Black-Scholes-Merton pricing with continuous dividend yield.

use crate::core::{
    ExerciseStyle, Greeks, OptionType, PricingEngine, PricingError, PricingResult,
};
use crate::instruments::vanilla::VanillaOption;
use crate::market::Market;
use crate::math::{normal_cdf, normal_pdf};

/// Days used to convert the annual theta derivative to per-day.
const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

/// Analytic Black-Scholes engine for European vanilla options.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholesEngine;

impl BlackScholesEngine {
    /// Creates a Black-Scholes engine instance.
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn d1_d2(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> (f64, f64) {
    let sig_sqrt_t = vol * expiry.sqrt();
    let d1 =
        ((spot / strike).ln() + (rate - dividend_yield + 0.5 * vol * vol) * expiry) / sig_sqrt_t;
    (d1, d1 - sig_sqrt_t)
}

fn validate_inputs(spot: f64, strike: f64, vol: f64, expiry: f64) -> Result<(), PricingError> {
    if !spot.is_finite() || spot <= 0.0 {
        return Err(PricingError::InvalidInput("spot must be > 0".to_string()));
    }
    if !strike.is_finite() || strike <= 0.0 {
        return Err(PricingError::InvalidInput("strike must be > 0".to_string()));
    }
    if !vol.is_finite() || vol <= 0.0 {
        return Err(PricingError::InvalidInput(
            "volatility must be > 0".to_string(),
        ));
    }
    if !expiry.is_finite() || expiry <= 0.0 {
        return Err(PricingError::InvalidInput("expiry must be > 0".to_string()));
    }
    Ok(())
}

/// Black-Scholes-Merton price under a continuous dividend yield.
///
/// Inputs are assumed validated; see [`BlackScholesEngine`] for the
/// validating entry point.
#[inline]
pub fn bs_price(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    let df_r = (-rate * expiry).exp();
    let df_q = (-dividend_yield * expiry).exp();
    let (d1, d2) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    match option_type {
        OptionType::Call => spot * df_q * normal_cdf(d1) - strike * df_r * normal_cdf(d2),
        OptionType::Put => strike * df_r * normal_cdf(-d2) - spot * df_q * normal_cdf(-d1),
    }
}

#[inline]
pub fn bs_delta(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    let (d1, _) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    let df_q = (-dividend_yield * expiry).exp();
    match option_type {
        OptionType::Call => df_q * normal_cdf(d1),
        OptionType::Put => df_q * (normal_cdf(d1) - 1.0),
    }
}

#[inline]
pub fn bs_gamma(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    let (d1, _) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    let df_q = (-dividend_yield * expiry).exp();
    df_q * normal_pdf(d1) / (spot * vol * expiry.sqrt())
}

#[inline]
pub fn bs_vega(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    let (d1, _) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    let df_q = (-dividend_yield * expiry).exp();
    spot * df_q * normal_pdf(d1) * expiry.sqrt()
}

/// Annual theta derivative. Divide by 365 for the per-calendar-day figure
/// reported in [`Greeks`].
#[inline]
pub fn bs_theta(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    let (d1, d2) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    let sqrt_t = expiry.sqrt();
    let df_q = (-dividend_yield * expiry).exp();
    let df_r = (-rate * expiry).exp();
    match option_type {
        OptionType::Call => {
            -spot * df_q * normal_pdf(d1) * vol / (2.0 * sqrt_t)
                + dividend_yield * spot * df_q * normal_cdf(d1)
                - rate * strike * df_r * normal_cdf(d2)
        }
        OptionType::Put => {
            -spot * df_q * normal_pdf(d1) * vol / (2.0 * sqrt_t)
                - dividend_yield * spot * df_q * normal_cdf(-d1)
                + rate * strike * df_r * normal_cdf(-d2)
        }
    }
}

#[inline]
pub fn bs_rho(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    let (_, d2) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    let df_r = (-rate * expiry).exp();
    match option_type {
        OptionType::Call => strike * expiry * df_r * normal_cdf(d2),
        OptionType::Put => -strike * expiry * df_r * normal_cdf(-d2),
    }
}

/// Full closed-form Greeks bundle, theta converted to per calendar day.
pub fn bs_greeks(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> Greeks {
    Greeks {
        delta: bs_delta(option_type, spot, strike, rate, dividend_yield, vol, expiry),
        gamma: bs_gamma(spot, strike, rate, dividend_yield, vol, expiry),
        vega: bs_vega(spot, strike, rate, dividend_yield, vol, expiry),
        theta: bs_theta(option_type, spot, strike, rate, dividend_yield, vol, expiry)
            / CALENDAR_DAYS_PER_YEAR,
        rho: bs_rho(option_type, spot, strike, rate, dividend_yield, vol, expiry),
    }
}

impl PricingEngine<VanillaOption> for BlackScholesEngine {
    fn price(
        &self,
        instrument: &VanillaOption,
        market: &Market,
    ) -> Result<PricingResult, PricingError> {
        instrument.validate()?;

        if !matches!(instrument.exercise, ExerciseStyle::European) {
            return Err(PricingError::InvalidInput(
                "BlackScholesEngine supports European exercise only".to_string(),
            ));
        }
        validate_inputs(market.spot, instrument.strike, market.vol, instrument.expiry)?;

        let (d1, d2) = d1_d2(
            market.spot,
            instrument.strike,
            market.rate,
            market.dividend_yield,
            market.vol,
            instrument.expiry,
        );
        let price = bs_price(
            instrument.option_type,
            market.spot,
            instrument.strike,
            market.rate,
            market.dividend_yield,
            market.vol,
            instrument.expiry,
        );
        let greeks = bs_greeks(
            instrument.option_type,
            market.spot,
            instrument.strike,
            market.rate,
            market.dividend_yield,
            market.vol,
            instrument.expiry,
        );

        let mut result = PricingResult::from_price(price);
        result.greeks = Some(greeks);
        result.diagnostics.insert("d1".to_string(), d1);
        result.diagnostics.insert("d2".to_string(), d2);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    // S=100, K=100, r=0.05, q=0, vol=0.2, T=1.
    const S: f64 = 100.0;
    const K: f64 = 100.0;
    const R: f64 = 0.05;
    const Q: f64 = 0.0;
    const VOL: f64 = 0.2;
    const T: f64 = 1.0;

    #[test]
    fn atm_call_and_put_reference_values() {
        let call = bs_price(OptionType::Call, S, K, R, Q, VOL, T);
        let put = bs_price(OptionType::Put, S, K, R, Q, VOL, T);
        assert_relative_eq!(call, 10.450_583_572_185_565, epsilon = 1e-9);
        assert_relative_eq!(put, 5.573_526_022_256_971, epsilon = 1e-9);
    }

    #[test]
    fn atm_greeks_reference_values() {
        let g_call = bs_greeks(OptionType::Call, S, K, R, Q, VOL, T);
        let g_put = bs_greeks(OptionType::Put, S, K, R, Q, VOL, T);

        assert_relative_eq!(g_call.delta, 0.636_830_651_175_619, epsilon = 1e-9);
        assert_relative_eq!(g_put.delta, -0.363_169_348_824_381, epsilon = 1e-9);
        assert_relative_eq!(g_call.gamma, 0.018_762_017_345_847, epsilon = 1e-9);
        assert_relative_eq!(g_call.vega, 37.524_034_691_694, epsilon = 1e-9);
        // Theta is per calendar day.
        assert_relative_eq!(g_call.theta, -0.017_572_678_209_420, epsilon = 1e-9);
        assert_relative_eq!(g_put.theta, -0.004_542_138_147_766, epsilon = 1e-9);
        assert_relative_eq!(g_call.rho, 53.232_481_545_376, epsilon = 1e-9);
    }

    #[test]
    fn put_call_parity_with_dividend_yield() {
        let (s, k, r, q, vol, t) = (100.0, 105.0, 0.045, 0.01, 0.2, 1.0);
        let call = bs_price(OptionType::Call, s, k, r, q, vol, t);
        let put = bs_price(OptionType::Put, s, k, r, q, vol, t);
        let parity = s * (-q * t).exp() - k * (-r * t).exp();
        assert_relative_eq!(call - put, parity, epsilon = 1e-10);
        assert_relative_eq!(call, 7.272_492_133_476_469, epsilon = 1e-9);
    }

    #[test]
    fn engine_rejects_invalid_inputs() {
        let engine = BlackScholesEngine::new();
        let market = Market::builder().spot(S).rate(R).flat_vol(VOL).build().unwrap();

        let expired = VanillaOption::european_call(K, 0.0);
        assert!(matches!(
            engine.price(&expired, &market),
            Err(PricingError::InvalidInput(_))
        ));

        let american = VanillaOption::american_put(K, T);
        assert!(matches!(
            engine.price(&american, &market),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn engine_result_carries_greeks_and_diagnostics() {
        let engine = BlackScholesEngine::new();
        let market = Market::builder().spot(S).rate(R).flat_vol(VOL).build().unwrap();
        let option = VanillaOption::european_call(K, T);

        let result = engine.price(&option, &market).unwrap();
        assert_relative_eq!(result.price, 10.450_583_572_185_565, epsilon = 1e-9);
        assert!(result.greeks.is_some());
        assert!(result.diagnostics.contains_key("d1"));
        assert!(result.stderr.is_none());
    }
}
