//! GARCH(1,1) volatility model fitted by Gaussian maximum likelihood
//!
//! Zero-mean model on (scaled) returns x_t = scale · r_t:
//!
//! ```text
//! x_t   = σ_t · z_t,   z_t ~ N(0, 1)
//! σ²_t  = ω + α · x²_{t-1} + β · σ²_{t-1}
//! ```
//!
//! Returns are rescaled (100 by default, i.e. percent returns) before
//! fitting so the optimizer works on numbers of order one. Parameters are
//! reported in scaled units; every variance handed back to callers is in
//! the original return units.
//!
//! The recursion is seeded with an exponentially weighted backcast of the
//! leading squared returns. The likelihood is minimized with Nelder–Mead
//! over (ω, α, β); points outside ω > 0, α ≥ 0, β ≥ 0, α + β < 1 are
//! assigned a large cost so the fitted model is always covariance
//! stationary.

use crate::{finite_only, MathError, Result, VarianceForecaster};
use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::neldermead::NelderMead;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Minimum number of finite returns accepted for a fit
pub const MIN_OBSERVATIONS: usize = 20;

/// Cost assigned to infeasible parameter vectors
const INFEASIBLE_COST: f64 = 1e12;

/// Backcast look-back and decay
const BACKCAST_WINDOW: usize = 75;
const BACKCAST_DECAY: f64 = 0.94;

/// Fitting options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GarchConfig {
    /// Multiplier applied to returns before fitting
    pub scale: f64,
    /// Nelder–Mead iteration cap
    pub max_iters: u64,
    /// Simplex standard-deviation tolerance
    pub tolerance: f64,
}

impl Default for GarchConfig {
    fn default() -> Self {
        Self {
            scale: 100.0,
            max_iters: 5000,
            tolerance: 1e-8,
        }
    }
}

impl GarchConfig {
    fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(MathError::InvalidInput(format!(
                "GARCH scale must be positive, got {}",
                self.scale
            )));
        }
        if self.max_iters == 0 {
            return Err(MathError::InvalidInput(
                "GARCH max_iters must be positive".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(MathError::InvalidInput(format!(
                "GARCH tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// GARCH(1,1) coefficients (in scaled units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GarchParams {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl GarchParams {
    /// Check ω > 0, α ≥ 0, β ≥ 0 and α + β < 1
    pub fn is_stationary(&self) -> bool {
        self.omega > 0.0 && self.alpha >= 0.0 && self.beta >= 0.0 && self.persistence() < 1.0
    }

    /// α + β
    pub fn persistence(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Unconditional variance ω / (1 − α − β), in scaled units
    pub fn long_run_variance(&self) -> Option<f64> {
        if self.is_stationary() {
            Some(self.omega / (1.0 - self.persistence()))
        } else {
            None
        }
    }

    /// Periods for a variance shock to decay halfway to the long-run level
    pub fn half_life(&self) -> Option<f64> {
        let p = self.persistence();
        if p <= 0.0 || p >= 1.0 {
            None
        } else {
            Some(-(2.0_f64.ln()) / p.ln())
        }
    }

    fn from_theta(theta: &[f64]) -> Self {
        Self {
            omega: theta[0],
            alpha: theta[1],
            beta: theta[2],
        }
    }
}

/// Exponentially weighted average of the leading squared observations
fn backcast(x: &[f64]) -> f64 {
    let tau = x.len().min(BACKCAST_WINDOW);
    let mut weight = 1.0;
    let mut weight_sum = 0.0;
    let mut acc = 0.0;
    for v in &x[..tau] {
        acc += weight * v * v;
        weight_sum += weight;
        weight *= BACKCAST_DECAY;
    }
    acc / weight_sum
}

/// Run the variance recursion over scaled observations
fn filter_variance(x: &[f64], params: &GarchParams, sigma2_0: f64) -> Vec<f64> {
    let mut sigma2 = Vec::with_capacity(x.len());
    sigma2.push(sigma2_0);
    for t in 1..x.len() {
        let prev = sigma2[t - 1];
        sigma2.push(params.omega + params.alpha * x[t - 1] * x[t - 1] + params.beta * prev);
    }
    sigma2
}

/// Gaussian log-likelihood of scaled observations given their variances
fn log_likelihood(x: &[f64], sigma2: &[f64]) -> f64 {
    let c = (2.0 * PI).ln();
    -0.5 * x
        .iter()
        .zip(sigma2.iter())
        .map(|(xt, s2)| c + s2.ln() + xt * xt / s2)
        .sum::<f64>()
}

/// Negative log-likelihood over (ω, α, β)
struct GarchCost<'a> {
    x: &'a [f64],
    sigma2_0: f64,
}

impl<'a> GarchCost<'a> {
    fn negative_log_likelihood(&self, theta: &[f64]) -> f64 {
        let params = GarchParams::from_theta(theta);
        if !params.is_stationary() {
            return INFEASIBLE_COST;
        }

        let sigma2 = filter_variance(self.x, &params, self.sigma2_0);
        if sigma2.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return INFEASIBLE_COST;
        }

        let nll = -log_likelihood(self.x, &sigma2);
        if nll.is_finite() {
            nll
        } else {
            INFEASIBLE_COST
        }
    }
}

impl<'a> CostFunction for GarchCost<'a> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.negative_log_likelihood(theta))
    }
}

/// A fitted (or filtered) GARCH(1,1) model
#[derive(Debug, Clone)]
pub struct GarchFit {
    params: GarchParams,
    scale: f64,
    scaled_returns: Vec<f64>,
    scaled_variance: Vec<f64>,
    log_likelihood: f64,
    iterations: u64,
    converged: bool,
}

impl GarchFit {
    /// Filter `returns` through known parameters without estimation.
    ///
    /// `params` are in units of `returns * scale`.
    pub fn from_params(returns: &[f64], params: GarchParams, scale: f64) -> Result<Self> {
        if !params.is_stationary() {
            return Err(MathError::InvalidInput(format!(
                "GARCH parameters are not stationary: {:?}",
                params
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(MathError::InvalidInput(format!(
                "GARCH scale must be positive, got {}",
                scale
            )));
        }

        let x: Vec<f64> = finite_only(returns).iter().map(|r| r * scale).collect();
        if x.is_empty() {
            return Err(MathError::InsufficientData(
                "GARCH filtering needs at least one finite return".to_string(),
            ));
        }

        let sigma2 = filter_variance(&x, &params, backcast(&x));
        let ll = log_likelihood(&x, &sigma2);
        Ok(Self::assemble(params, scale, x, sigma2, ll, 0, true))
    }

    fn assemble(
        params: GarchParams,
        scale: f64,
        scaled_returns: Vec<f64>,
        scaled_variance: Vec<f64>,
        scaled_log_likelihood: f64,
        iterations: u64,
        converged: bool,
    ) -> Self {
        // Change of variables x = scale * r adds n * ln(scale) to the density.
        let n = scaled_returns.len() as f64;
        let log_likelihood = scaled_log_likelihood + n * scale.ln();
        Self {
            params,
            scale,
            scaled_returns,
            scaled_variance,
            log_likelihood,
            iterations,
            converged,
        }
    }

    /// Fitted coefficients, in scaled units
    pub fn params(&self) -> GarchParams {
        self.params
    }

    /// Return multiplier used during fitting
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Number of observations used
    pub fn n_obs(&self) -> usize {
        self.scaled_returns.len()
    }

    /// Log-likelihood of the original (unscaled) returns
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        2.0 * 3.0 - 2.0 * self.log_likelihood
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        3.0 * (self.n_obs() as f64).ln() - 2.0 * self.log_likelihood
    }

    /// Optimizer iterations performed
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Whether the optimizer stopped before its iteration cap
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// In-sample conditional variance, in original return units
    pub fn conditional_variance(&self) -> Vec<f64> {
        let s2 = self.scale * self.scale;
        self.scaled_variance.iter().map(|v| v / s2).collect()
    }

    /// In-sample conditional volatility, optionally annualized
    pub fn conditional_volatility(&self, annualize: bool, periods_per_year: usize) -> Vec<f64> {
        let factor = if annualize {
            (periods_per_year as f64).sqrt()
        } else {
            1.0
        };
        self.scaled_variance
            .iter()
            .map(|v| v.sqrt() / self.scale * factor)
            .collect()
    }

    /// Variance forecasts for steps 1..=horizon past the sample, in original units
    pub fn forecast_variance(&self, horizon: usize) -> Vec<f64> {
        let n = self.scaled_returns.len();
        let last_x = self.scaled_returns[n - 1];
        let last_s2 = self.scaled_variance[n - 1];
        let p = self.params;
        let s2 = self.scale * self.scale;

        let mut out = Vec::with_capacity(horizon);
        let mut next = p.omega + p.alpha * last_x * last_x + p.beta * last_s2;
        for _ in 0..horizon {
            out.push(next / s2);
            next = p.omega + p.persistence() * next;
        }
        out
    }

    /// One-step-ahead variance forecast, in original units
    pub fn forecast_next_variance(&self) -> f64 {
        let p = self.params;
        let n = self.scaled_returns.len();
        let last_x = self.scaled_returns[n - 1];
        (p.omega + p.alpha * last_x * last_x + p.beta * self.scaled_variance[n - 1])
            / (self.scale * self.scale)
    }

    /// Human-readable parameter summary
    pub fn summary(&self) -> String {
        let p = self.params;
        let mut s = String::from("GARCH(1,1) Model Summary\n");
        s.push_str(&format!("  omega:       {:.6}\n", p.omega));
        s.push_str(&format!("  alpha:       {:.6}\n", p.alpha));
        s.push_str(&format!("  beta:        {:.6}\n", p.beta));
        s.push_str(&format!("  persistence: {:.4}\n", p.persistence()));
        if let Some(hl) = p.half_life() {
            s.push_str(&format!("  half-life:   {:.2} periods\n", hl));
        }
        s.push_str(&format!("  log-lik:     {:.2}\n", self.log_likelihood));
        s.push_str(&format!("  AIC:         {:.2}\n", self.aic()));
        s.push_str(&format!("  BIC:         {:.2}\n", self.bic()));
        s.push_str(&format!("  converged:   {}\n", self.converged));
        s
    }
}

fn sample_second_moment(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64
}

/// Fit a zero-mean GARCH(1,1) to `returns` by maximum likelihood.
///
/// Non-finite returns are dropped. Hitting the iteration cap does not fail
/// the fit: the best simplex vertex is kept and `converged()` reports false.
pub fn fit_garch11(returns: &[f64], config: &GarchConfig) -> Result<GarchFit> {
    config.validate()?;

    let x: Vec<f64> = finite_only(returns)
        .iter()
        .map(|r| r * config.scale)
        .collect();
    if x.len() < MIN_OBSERVATIONS {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} returns for GARCH(1,1), have {}.",
            MIN_OBSERVATIONS,
            x.len()
        )));
    }

    let v0 = sample_second_moment(&x);
    if !(v0 > 0.0) {
        return Err(MathError::CalculationError(
            "Returns have zero variance; GARCH is undefined".to_string(),
        ));
    }

    let sigma2_0 = backcast(&x);
    let cost = GarchCost { x: &x, sigma2_0 };

    let theta0 = vec![0.05 * v0, 0.05, 0.90];
    let simplex = vec![
        theta0.clone(),
        vec![0.10 * v0, 0.05, 0.90],
        vec![0.05 * v0, 0.10, 0.85],
        vec![0.05 * v0, 0.05, 0.80],
    ];

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(config.tolerance)
        .map_err(|e| MathError::OptimizationError(e.to_string()))?;

    let result = Executor::new(cost, solver)
        .configure(|state| state.max_iters(config.max_iters))
        .run()
        .map_err(|e| MathError::OptimizationError(format!("GARCH optimization failed: {}", e)))?;

    let state = result.state();
    let iterations = state.get_iter();
    let theta = state.get_best_param().ok_or_else(|| {
        MathError::OptimizationError("GARCH optimization did not produce parameters".to_string())
    })?;

    let params = GarchParams::from_theta(theta);
    if !params.is_stationary() {
        return Err(MathError::OptimizationError(format!(
            "GARCH optimization produced invalid parameters: omega={:.6}, alpha={:.6}, beta={:.6}",
            params.omega, params.alpha, params.beta
        )));
    }

    let converged = iterations < config.max_iters;
    if !converged {
        warn!(
            iterations,
            "GARCH optimizer reached its iteration cap; keeping best point"
        );
    }

    let sigma2 = filter_variance(&x, &params, sigma2_0);
    let ll = log_likelihood(&x, &sigma2);
    debug!(
        omega = params.omega,
        alpha = params.alpha,
        beta = params.beta,
        iterations,
        "fitted GARCH(1,1)"
    );

    Ok(GarchFit::assemble(
        params, config.scale, x, sigma2, ll, iterations, converged,
    ))
}

/// GARCH(1,1) forecaster; refits on every training slice
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Garch11Model {
    config: GarchConfig,
}

impl Garch11Model {
    pub fn new(config: GarchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GarchConfig {
        &self.config
    }
}

impl VarianceForecaster for Garch11Model {
    fn name(&self) -> String {
        "garch11".to_string()
    }

    fn forecast_next_variance(&self, train: &[f64]) -> Result<f64> {
        Ok(fit_garch11(train, &self.config)?.forecast_next_variance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    /// Simulate a GARCH(1,1) in percent units and return decimal returns
    fn simulate(n: usize, params: GarchParams, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sigma2 = params.long_run_variance().unwrap();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let z: f64 = rng.sample(StandardNormal);
            let x = sigma2.sqrt() * z;
            out.push(x / 100.0);
            sigma2 = params.omega + params.alpha * x * x + params.beta * sigma2;
        }
        out
    }

    const TRUE_PARAMS: GarchParams = GarchParams {
        omega: 0.05,
        alpha: 0.10,
        beta: 0.85,
    };

    #[test]
    fn test_params_validation() {
        assert!(TRUE_PARAMS.is_stationary());
        assert_relative_eq!(TRUE_PARAMS.persistence(), 0.95);
        assert_relative_eq!(TRUE_PARAMS.long_run_variance().unwrap(), 1.0, epsilon = 1e-12);
        assert!(TRUE_PARAMS.half_life().unwrap() > 13.0);

        let explosive = GarchParams {
            omega: 0.05,
            alpha: 0.5,
            beta: 0.6,
        };
        assert!(!explosive.is_stationary());
        assert!(explosive.long_run_variance().is_none());

        let negative_omega = GarchParams {
            omega: -0.01,
            ..TRUE_PARAMS
        };
        assert!(!negative_omega.is_stationary());
    }

    #[test]
    fn test_infeasible_points_are_penalized() {
        let x = vec![1.0, -0.5, 0.7, -1.2];
        let cost = GarchCost {
            x: &x,
            sigma2_0: backcast(&x),
        };
        assert_eq!(cost.negative_log_likelihood(&[0.1, 0.6, 0.5]), INFEASIBLE_COST);
        assert_eq!(cost.negative_log_likelihood(&[-0.1, 0.1, 0.5]), INFEASIBLE_COST);
        assert!(cost.negative_log_likelihood(&[0.1, 0.1, 0.8]) < INFEASIBLE_COST);
    }

    #[test]
    fn test_backcast_weights_recent_less() {
        let x = vec![2.0; 100];
        assert_relative_eq!(backcast(&x), 4.0, epsilon = 1e-12);
        let short = vec![1.0, 3.0];
        let expected = (1.0 + 0.94 * 9.0) / 1.94;
        assert_relative_eq!(backcast(&short), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_filter_recursion_and_forecast() {
        let returns = vec![0.001, -0.002, 0.003, -0.001, 0.002];
        let params = GarchParams {
            omega: 0.01,
            alpha: 0.05,
            beta: 0.90,
        };
        let fit = GarchFit::from_params(&returns, params, 100.0).unwrap();
        let var = fit.conditional_variance();
        assert_eq!(var.len(), returns.len());
        for t in 1..var.len() {
            let x_prev = returns[t - 1] * 100.0;
            let expected = (0.01 + 0.05 * x_prev * x_prev + 0.90 * var[t - 1] * 1e4) / 1e4;
            assert_relative_eq!(var[t], expected, epsilon = 1e-15);
        }

        let next = fit.forecast_next_variance();
        let x_last = 0.2;
        let expected = (0.01 + 0.05 * x_last * x_last + 0.90 * var[4] * 1e4) / 1e4;
        assert_relative_eq!(next, expected, epsilon = 1e-15);
        assert_relative_eq!(fit.forecast_variance(3)[0], next, epsilon = 1e-15);
    }

    #[test]
    fn test_multi_step_forecast_reverts_to_long_run() {
        let returns = simulate(300, TRUE_PARAMS, 7);
        let fit = GarchFit::from_params(&returns, TRUE_PARAMS, 100.0).unwrap();
        let path = fit.forecast_variance(500);
        let long_run = TRUE_PARAMS.long_run_variance().unwrap() / 1e4;
        assert_relative_eq!(path[499], long_run, max_relative = 1e-6);
    }

    #[test]
    fn test_fit_on_simulated_data() {
        let returns = simulate(1500, TRUE_PARAMS, 42);
        let fit = fit_garch11(&returns, &GarchConfig::default()).unwrap();
        let p = fit.params();

        assert!(p.is_stationary());
        assert!(p.alpha > 0.02 && p.alpha < 0.3, "alpha = {}", p.alpha);
        assert!(p.persistence() > 0.8, "persistence = {}", p.persistence());
        assert!(fit.forecast_next_variance() > 0.0);
        assert!(fit.log_likelihood().is_finite());
        assert!(fit.aic() < fit.bic());

        let vol = fit.conditional_volatility(false, 252);
        assert_eq!(vol.len(), returns.len());
        assert!(vol.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_fit_beats_starting_point() {
        let returns = simulate(500, TRUE_PARAMS, 3);
        let fit = fit_garch11(&returns, &GarchConfig::default()).unwrap();
        let x: Vec<f64> = returns.iter().map(|r| r * 100.0).collect();
        let v0 = sample_second_moment(&x);
        let start = GarchFit::from_params(
            &returns,
            GarchParams {
                omega: 0.05 * v0,
                alpha: 0.05,
                beta: 0.90,
            },
            100.0,
        )
        .unwrap();
        assert!(fit.log_likelihood() >= start.log_likelihood() - 1e-9);
    }

    #[test]
    fn test_scale_does_not_change_variance_units() {
        let returns = simulate(400, TRUE_PARAMS, 11);
        let fit = fit_garch11(&returns, &GarchConfig::default()).unwrap();
        let sample_var = returns.iter().map(|r| r * r).sum::<f64>() / returns.len() as f64;
        let next = fit.forecast_next_variance();
        // Daily variance should stay within an order of magnitude of the sample.
        assert!(next > sample_var / 10.0 && next < sample_var * 10.0);
    }

    #[test]
    fn test_rejects_short_or_flat_series() {
        let short = vec![0.01; MIN_OBSERVATIONS - 1];
        assert!(matches!(
            fit_garch11(&short, &GarchConfig::default()),
            Err(MathError::InsufficientData(_))
        ));

        let flat = vec![0.0; 50];
        assert!(fit_garch11(&flat, &GarchConfig::default()).is_err());
    }

    #[test]
    fn test_forecaster_interface() {
        let returns = simulate(300, TRUE_PARAMS, 5);
        let model = Garch11Model::default();
        assert_eq!(model.name(), "garch11");
        let forecast = model.forecast_next_variance(&returns).unwrap();
        assert!(forecast > 0.0 && forecast.is_finite());
    }
}
