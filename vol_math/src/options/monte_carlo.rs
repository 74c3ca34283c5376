//! Monte Carlo pricing for European options under geometric Brownian motion
//!
//! Each path advances `steps` log-increments of
//! (r − σ²/2)·dt + σ·√dt·Z with Z ~ N(0, 1). The discounted payoff at
//! the terminal price is averaged across paths and reported with its
//! standard error.

use super::{OptionParams, OptionType};
use crate::{MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

/// z-score of a two-sided 95% interval
pub const Z_95: f64 = 1.96;

/// Simulation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloConfig {
    /// Time steps per path
    pub steps: usize,
    /// Number of simulated paths
    pub n_paths: usize,
    /// RNG seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            steps: 252,
            n_paths: 50_000,
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }
}

/// Point estimate with its standard error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloResult {
    pub price: f64,
    pub std_error: f64,
    pub paths: usize,
}

impl MonteCarloResult {
    /// Symmetric interval price ± z·std_error
    pub fn confidence_interval(&self, z: f64) -> (f64, f64) {
        let radius = z * self.std_error;
        (self.price - radius, self.price + radius)
    }
}

/// Price, standard error and 95% confidence bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McEstimate {
    pub price: f64,
    pub std_error: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

impl From<MonteCarloResult> for McEstimate {
    fn from(result: MonteCarloResult) -> Self {
        let (ci_low, ci_high) = result.confidence_interval(Z_95);
        Self {
            price: result.price,
            std_error: result.std_error,
            ci_low,
            ci_high,
        }
    }
}

fn validate_grid(steps: usize, n_paths: usize, min_paths: usize) -> Result<()> {
    if steps == 0 {
        return Err(MathError::InvalidInput(
            "steps must be at least 1".to_string(),
        ));
    }
    if n_paths < min_paths {
        return Err(MathError::InvalidInput(format!(
            "n_paths must be at least {}, got {}",
            min_paths, n_paths
        )));
    }
    Ok(())
}

/// Per-step drift and diffusion of the log price
fn increments(params: &OptionParams, steps: usize) -> (f64, f64) {
    let dt = params.maturity / steps as f64;
    let vol = params.volatility;
    ((params.rate - 0.5 * vol * vol) * dt, vol * dt.sqrt())
}

/// Simulate GBM price paths.
///
/// Returns `n_paths` vectors of `steps` prices; the initial spot is not
/// included, so the last element of each path is the terminal price.
pub fn simulate_gbm_paths<R: Rng>(
    params: &OptionParams,
    steps: usize,
    n_paths: usize,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>> {
    params.validate()?;
    validate_grid(steps, n_paths, 1)?;
    let (drift, diffusion) = increments(params, steps);

    let mut paths = Vec::with_capacity(n_paths);
    for _ in 0..n_paths {
        let mut log_price = 0.0;
        let mut path = Vec::with_capacity(steps);
        for _ in 0..steps {
            let z: f64 = rng.sample(StandardNormal);
            log_price += drift + diffusion * z;
            path.push(params.spot * log_price.exp());
        }
        paths.push(path);
    }

    Ok(paths)
}

/// Monte Carlo estimator of a European option price.
///
/// Paths are generated one at a time and only their terminal value is kept.
pub fn price_european_option_mc<R: Rng>(
    params: &OptionParams,
    option_type: OptionType,
    steps: usize,
    n_paths: usize,
    rng: &mut R,
) -> Result<MonteCarloResult> {
    params.validate()?;
    validate_grid(steps, n_paths, 2)?;
    let (drift, diffusion) = increments(params, steps);
    let df = params.discount_factor();

    // Welford accumulation of the discounted payoff
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for i in 0..n_paths {
        let mut log_price = 0.0;
        for _ in 0..steps {
            let z: f64 = rng.sample(StandardNormal);
            log_price += drift + diffusion * z;
        }
        let terminal = params.spot * log_price.exp();
        let payoff = df * option_type.payoff(terminal, params.strike);

        let delta = payoff - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (payoff - mean);
    }

    let sample_var = m2 / (n_paths - 1) as f64;
    let std_error = (sample_var / n_paths as f64).sqrt();

    Ok(MonteCarloResult {
        price: mean,
        std_error,
        paths: n_paths,
    })
}

/// Monte Carlo price with a 95% confidence interval.
///
/// The RNG is seeded from `config.seed` when present.
pub fn price_european_option_mc_ci(
    params: &OptionParams,
    option_type: OptionType,
    config: &MonteCarloConfig,
) -> Result<McEstimate> {
    let mut rng = config.rng();
    let result =
        price_european_option_mc(params, option_type, config.steps, config.n_paths, &mut rng)?;
    debug!(
        price = result.price,
        std_error = result.std_error,
        paths = result.paths,
        "Monte Carlo estimate"
    );
    Ok(result.into())
}

/// Price across a grid of path counts to study convergence.
///
/// A single RNG seeded with `seed` is shared across the grid, so each entry
/// uses fresh draws.
pub fn convergence_curve(
    params: &OptionParams,
    option_type: OptionType,
    steps: usize,
    path_grid: &[usize],
    seed: u64,
) -> Result<Vec<(usize, MonteCarloResult)>> {
    let mut rng = StdRng::seed_from_u64(seed);
    path_grid
        .iter()
        .map(|&n| {
            price_european_option_mc(params, option_type, steps, n, &mut rng).map(|r| (n, r))
        })
        .collect()
}
