//! Consistency checks between the Heston transform pricer, the Monte Carlo
//! simulator and the path payoff evaluators.
//!
//! Reference prices come from direct evaluation of the Heston probability
//! integrals (Gatheral, *The Volatility Surface*, 2006).

use approx::assert_relative_eq;

use ironvol::core::{BarrierDirection, BarrierStyle, OptionType, PricingEngine};
use ironvol::engines::analytic::bs_price;
use ironvol::engines::HestonEngine;
use ironvol::instruments::VanillaOption;
use ironvol::market::Market;
use ironvol::math::normal_cdf;
use ironvol::mc::{
    simulate_heston, AsianPayoff, BarrierPayoff, DigitalPayoff, MonteCarloEngine, PayoffEvaluator,
    SimulationPath,
};
use ironvol::models::{HestonParams, VarianceScheme};

fn make_market() -> Market {
    Market::builder()
        .spot(100.0)
        .rate(0.03)
        .flat_vol(0.2)
        .build()
        .unwrap()
}

fn make_params() -> HestonParams {
    HestonParams::new(0.04, 2.0, 0.04, 0.5, -0.7)
}

struct TerminalCall {
    strike: f64,
}

impl PayoffEvaluator for TerminalCall {
    fn evaluate(&self, path: &SimulationPath) -> f64 {
        (path.terminal_spot() - self.strike).max(0.0)
    }
}

#[test]
fn transform_engine_matches_probability_integral_references() {
    let engine = HestonEngine::new(make_params());
    let market = make_market();

    // Tolerance reflects the truncation error of the fixed 32-point
    // Gauss-Laguerre rule against the exact probability integrals.
    for (strike, reference) in [
        (90.0, 15.771_731_444_998),
        (100.0, 8.929_410_453_602),
        (110.0, 3.978_464_300_423),
    ] {
        let result = engine
            .price(&VanillaOption::european_call(strike, 1.0), &market)
            .unwrap();
        assert_relative_eq!(result.price, reference, epsilon = 1e-2);
    }
}

#[test]
fn monte_carlo_agrees_with_transform_pricer() {
    let params = make_params();
    let market = make_market();
    let paths = simulate_heston(
        &params,
        &market,
        1.0,
        128,
        20_000,
        2024,
        VarianceScheme::FullTruncation,
    )
    .unwrap();

    let mc = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &TerminalCall { strike: 100.0 })
        .unwrap();
    let transform = HestonEngine::new(params)
        .price(&VanillaOption::european_call(100.0, 1.0), &make_market())
        .unwrap();

    let stderr = mc.stderr.unwrap();
    assert!(
        (mc.price - transform.price).abs() < 4.0 * stderr,
        "mc {} vs transform {} (stderr {})",
        mc.price,
        transform.price,
        stderr
    );
}

#[test]
fn reflection_scheme_stays_close_to_full_truncation() {
    let params = make_params();
    let market = make_market();
    let payoff = TerminalCall { strike: 100.0 };

    let ft = simulate_heston(&params, &market, 1.0, 128, 20_000, 11, VarianceScheme::FullTruncation)
        .unwrap();
    let refl = simulate_heston(&params, &market, 1.0, 128, 20_000, 11, VarianceScheme::Reflection)
        .unwrap();

    let ft_px = MonteCarloEngine::estimate(&ft, market.rate, 1.0, &payoff).unwrap();
    let refl_px = MonteCarloEngine::estimate(&refl, market.rate, 1.0, &payoff).unwrap();

    // The two positivity schemes share the discretization up to the variance
    // fix-up, so their estimates must sit within a few standard errors.
    let tol = 5.0 * ft_px.stderr.unwrap().max(refl_px.stderr.unwrap());
    assert!((ft_px.price - refl_px.price).abs() < tol);
}

#[test]
fn barrier_in_out_parity_holds_pathwise() {
    let params = make_params();
    let market = make_market();
    let paths = simulate_heston(
        &params,
        &market,
        1.0,
        64,
        5_000,
        7,
        VarianceScheme::FullTruncation,
    )
    .unwrap();

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

    let vanilla = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &TerminalCall { strike: 100.0 })
        .unwrap();
    let in_px = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &knock_in).unwrap();
    let out_px = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &knock_out).unwrap();

    assert_relative_eq!(in_px.price + out_px.price, vanilla.price, epsilon = 1e-10);
    assert!(out_px.price <= vanilla.price + 1e-12);
}

#[test]
fn asian_call_is_cheaper_than_terminal_call() {
    let params = make_params();
    let market = make_market();
    let paths = simulate_heston(
        &params,
        &market,
        1.0,
        64,
        10_000,
        3,
        VarianceScheme::FullTruncation,
    )
    .unwrap();

    let asian = AsianPayoff::new(OptionType::Call, 100.0).unwrap();
    let asian_px = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &asian).unwrap();
    let vanilla_px =
        MonteCarloEngine::estimate(&paths, market.rate, 1.0, &TerminalCall { strike: 100.0 })
            .unwrap();

    assert!(asian_px.price > 0.0);
    assert!(asian_px.price < vanilla_px.price);
}

#[test]
fn digital_recovers_closed_form_in_the_degenerate_model() {
    // With xi = 0 and v0 = theta the log-Euler scheme is exact, so the
    // digital price must match e^{-rT} * cash * N(d2) for sigma = sqrt(v0).
    let market = make_market();
    let params = HestonParams::new(0.04, 2.0, 0.04, 0.0, 0.0);
    let paths = simulate_heston(
        &params,
        &market,
        1.0,
        32,
        20_000,
        99,
        VarianceScheme::FullTruncation,
    )
    .unwrap();

    let cash = 10.0;
    let digital = DigitalPayoff::new(OptionType::Call, 100.0, cash).unwrap();
    let mc = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &digital).unwrap();

    let sigma = 0.2_f64;
    let d2 = ((100.0_f64 / 100.0).ln() + (market.rate - 0.5 * sigma * sigma)) / sigma;
    let closed_form = (-market.rate).exp() * cash * normal_cdf(d2);

    let stderr = mc.stderr.unwrap();
    assert!(
        (mc.price - closed_form).abs() < 4.0 * stderr,
        "mc {} vs closed form {} (stderr {})",
        mc.price,
        closed_form,
        stderr
    );
}

#[test]
fn small_vol_of_vol_monte_carlo_is_unbiased_against_black_scholes() {
    let market = make_market();
    let params = HestonParams::new(0.04, 2.0, 0.04, 0.0, 0.0);
    let paths = simulate_heston(
        &params,
        &market,
        1.0,
        64,
        20_000,
        17,
        VarianceScheme::FullTruncation,
    )
    .unwrap();
    let mc = MonteCarloEngine::estimate(&paths, market.rate, 1.0, &TerminalCall { strike: 100.0 })
        .unwrap();
    let analytic = bs_price(OptionType::Call, 100.0, 100.0, 0.03, 0.0, 0.2, 1.0);

    let stderr = mc.stderr.unwrap();
    assert!((mc.price - analytic).abs() < 4.0 * stderr);
}
