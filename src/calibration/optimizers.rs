//! Bounded least-squares optimization.
//!
//! References:
//! - Levenberg (1944), Marquardt (1963).
//! - Nocedal and Wright, *Numerical Optimization* (2nd ed.), Ch. 10.

use nalgebra::{DMatrix, DVector};

use crate::calibration::core::{BoxConstraints, ConvergenceInfo, TerminationReason};
use crate::core::PricingError;

/// Output payload of a solver run.
#[derive(Debug, Clone)]
pub struct OptimisationResult {
    pub x: Vec<f64>,
    pub objective: f64,
    pub residuals: Vec<f64>,
    pub jacobian: DMatrix<f64>,
    pub convergence: ConvergenceInfo,
}

/// Levenberg-Marquardt tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    pub gradient_tolerance: f64,
    pub step_tolerance: f64,
    pub objective_tolerance: f64,
    pub finite_diff_epsilon: f64,
    pub max_stagnation: usize,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 80,
            initial_lambda: 1e-2,
            lambda_up: 3.0,
            lambda_down: 0.35,
            gradient_tolerance: 1e-6,
            step_tolerance: 1e-7,
            objective_tolerance: 1e-10,
            finite_diff_epsilon: 1e-4,
            max_stagnation: 20,
        }
    }
}

#[inline]
fn least_squares_objective(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

/// One-sided finite-difference Jacobian that never steps outside the box.
fn finite_difference_jacobian<F>(
    x: &[f64],
    base_residuals: &[f64],
    bounds: &BoxConstraints,
    eps_scale: f64,
    residual_fn: &mut F,
    objective_evaluations: &mut usize,
) -> DMatrix<f64>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let m = base_residuals.len();
    let n = x.len();
    let mut j = DMatrix::zeros(m, n);

    for c in 0..n {
        let mut xp = x.to_vec();
        let h = (x[c].abs() * eps_scale).max(1e-7);

        xp[c] = (x[c] + h).min(bounds.upper[c]);
        if (xp[c] - x[c]).abs() < 1e-14 {
            xp[c] = (x[c] - h).max(bounds.lower[c]);
        }

        let denom = xp[c] - x[c];
        if denom.abs() < 1e-14 {
            continue;
        }

        let rp = residual_fn(&xp);
        *objective_evaluations += 1;
        for r in 0..m {
            j[(r, c)] = (rp[r] - base_residuals[r]) / denom;
        }
    }

    j
}

/// Damped least-squares minimization of `residual_fn` inside `bounds`.
///
/// Iterates are projected back onto the box after each step. The damping
/// parameter scales up on rejected steps and down on accepted ones.
pub fn levenberg_marquardt<F>(
    initial: &[f64],
    bounds: &BoxConstraints,
    options: LmOptions,
    mut residual_fn: F,
) -> Result<OptimisationResult, PricingError>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    if initial.len() != bounds.dimension() {
        return Err(PricingError::InvalidInput(
            "initial vector dimension does not match bounds".to_string(),
        ));
    }

    let mut x = bounds.clamp(initial);
    let mut evals = 0usize;
    let mut residuals = residual_fn(&x);
    evals += 1;
    if residuals.is_empty() {
        return Err(PricingError::InvalidInput(
            "residual function returned empty residual vector".to_string(),
        ));
    }

    let mut objective = least_squares_objective(&residuals);
    if !objective.is_finite() {
        return Err(PricingError::NumericalError(
            "objective is not finite at initial point".to_string(),
        ));
    }

    let mut lambda = options.initial_lambda.max(1e-12);
    let mut iterations = 0usize;
    let mut last_gradient_norm = f64::INFINITY;
    let mut last_step_norm = f64::INFINITY;
    let mut reason = TerminationReason::MaxIterations;
    let mut converged = false;
    let mut stagnation = 0usize;

    for iter in 0..options.max_iterations {
        iterations = iter + 1;

        let jacobian = finite_difference_jacobian(
            &x,
            &residuals,
            bounds,
            options.finite_diff_epsilon.max(1e-8),
            &mut residual_fn,
            &mut evals,
        );

        let r_vec = DVector::from_column_slice(&residuals);
        let jt = jacobian.transpose();
        let mut a = &jt * &jacobian;
        let g = &jt * r_vec;

        last_gradient_norm = g.norm();
        if !last_gradient_norm.is_finite() {
            reason = TerminationReason::NumericalFailure;
            break;
        }
        if last_gradient_norm <= options.gradient_tolerance {
            converged = true;
            reason = TerminationReason::GradientTolerance;
            break;
        }

        for i in 0..a.nrows() {
            a[(i, i)] += lambda * (a[(i, i)].abs() + 1.0);
        }

        let Some(delta) = a.lu().solve(&(-g)) else {
            lambda = (lambda * options.lambda_up).min(1e12);
            stagnation += 1;
            if stagnation >= options.max_stagnation {
                reason = TerminationReason::Stagnation;
                break;
            }
            continue;
        };

        last_step_norm = delta.norm();
        if last_step_norm <= options.step_tolerance {
            converged = true;
            reason = TerminationReason::StepTolerance;
            break;
        }

        let mut candidate = x.clone();
        for i in 0..candidate.len() {
            candidate[i] += delta[i];
        }
        candidate = bounds.clamp(&candidate);

        let candidate_residuals = residual_fn(&candidate);
        evals += 1;
        let candidate_obj = least_squares_objective(&candidate_residuals);

        if candidate_obj.is_finite() && candidate_obj + 1e-16 < objective {
            let improvement = (objective - candidate_obj).abs();
            x = candidate;
            residuals = candidate_residuals;
            objective = candidate_obj;
            lambda = (lambda * options.lambda_down).max(1e-12);
            stagnation = 0;

            if improvement <= options.objective_tolerance {
                converged = true;
                reason = TerminationReason::ObjectiveTolerance;
                break;
            }
        } else {
            lambda = (lambda * options.lambda_up).min(1e12);
            stagnation += 1;
            if stagnation >= options.max_stagnation {
                reason = TerminationReason::Stagnation;
                break;
            }
        }
    }

    let jacobian = finite_difference_jacobian(
        &x,
        &residuals,
        bounds,
        options.finite_diff_epsilon.max(1e-8),
        &mut residual_fn,
        &mut evals,
    );

    Ok(OptimisationResult {
        x,
        objective,
        residuals,
        jacobian,
        convergence: ConvergenceInfo {
            iterations,
            objective_evaluations: evals,
            gradient_norm: last_gradient_norm,
            step_norm: last_step_norm,
            converged,
            reason,
        },
    })
}
