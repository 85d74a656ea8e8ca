use super::calibration::AcceptanceBand;
use super::moves::MoveWeights;
use super::shape::ShapeLimits;
use super::step_sizes::MoveStepSizes;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Default relative selection weights: volume, translate, rotate, dihedral,
/// shear, stretch.
pub const DEFAULT_MOVE_WEIGHTS: [f64; 6] = [1.0, 3.0, 3.0, 3.0, 1.0, 1.0];

/// Iteration-count periods for the loop's side activities. Every period is at
/// least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    /// Iterations between step-size recalibrations.
    pub mc_adjust: u64,
    /// Iterations between trajectory frames.
    pub vis: u64,
    /// Iterations between restart checkpoints.
    pub restart: u64,
    /// Iterations between progress log lines.
    pub log: u64,
}

impl Intervals {
    /// Population-scaled defaults: calibration and trajectory output every
    /// half population turnover.
    pub fn for_population(n_walkers: usize) -> Self {
        let mc_adjust = ((n_walkers / 2) as u64).max(1);
        Self {
            mc_adjust,
            vis: mc_adjust,
            restart: 5000,
            log: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub n_walkers: usize,
    pub n_chains: usize,
    pub n_beads: usize,
    pub total_iterations: u64,
    pub sweeps_per_walk: usize,
    pub pressure: f64,
    pub weights: MoveWeights,
    pub initial_steps: MoveStepSizes,
    pub band: AcceptanceBand,
    pub limits: ShapeLimits,
    pub intervals: Intervals,
    pub seed: Option<u64>,
    /// Wall-clock budget in seconds; checked right after each checkpoint.
    pub time_budget_secs: Option<u64>,
    pub checkpoint_path: PathBuf,
    pub eviction_log_path: PathBuf,
}

#[derive(Default)]
pub struct SamplingConfigBuilder {
    n_walkers: Option<usize>,
    n_chains: Option<usize>,
    n_beads: Option<usize>,
    total_iterations: Option<u64>,
    sweeps_per_walk: Option<usize>,
    pressure: Option<f64>,
    weights: Option<MoveWeights>,
    initial_steps: Option<MoveStepSizes>,
    band: Option<AcceptanceBand>,
    limits: Option<ShapeLimits>,
    intervals: Option<Intervals>,
    seed: Option<u64>,
    time_budget_secs: Option<u64>,
    checkpoint_path: Option<PathBuf>,
    eviction_log_path: Option<PathBuf>,
}

impl SamplingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_walkers(mut self, n: usize) -> Self {
        self.n_walkers = Some(n);
        self
    }
    pub fn n_chains(mut self, n: usize) -> Self {
        self.n_chains = Some(n);
        self
    }
    pub fn n_beads(mut self, n: usize) -> Self {
        self.n_beads = Some(n);
        self
    }
    pub fn total_iterations(mut self, n: u64) -> Self {
        self.total_iterations = Some(n);
        self
    }
    pub fn sweeps_per_walk(mut self, n: usize) -> Self {
        self.sweeps_per_walk = Some(n);
        self
    }
    pub fn pressure(mut self, p: f64) -> Self {
        self.pressure = Some(p);
        self
    }
    pub fn weights(mut self, weights: MoveWeights) -> Self {
        self.weights = Some(weights);
        self
    }
    pub fn initial_steps(mut self, steps: MoveStepSizes) -> Self {
        self.initial_steps = Some(steps);
        self
    }
    pub fn band(mut self, band: AcceptanceBand) -> Self {
        self.band = Some(band);
        self
    }
    pub fn limits(mut self, limits: ShapeLimits) -> Self {
        self.limits = Some(limits);
        self
    }
    pub fn intervals(mut self, intervals: Intervals) -> Self {
        self.intervals = Some(intervals);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn time_budget_secs(mut self, secs: u64) -> Self {
        self.time_budget_secs = Some(secs);
        self
    }
    pub fn checkpoint_path(mut self, path: PathBuf) -> Self {
        self.checkpoint_path = Some(path);
        self
    }
    pub fn eviction_log_path(mut self, path: PathBuf) -> Self {
        self.eviction_log_path = Some(path);
        self
    }

    pub fn build(self) -> Result<SamplingConfig, ConfigError> {
        let n_walkers = self
            .n_walkers
            .ok_or(ConfigError::MissingParameter("n_walkers"))?;
        let n_chains = self
            .n_chains
            .ok_or(ConfigError::MissingParameter("n_chains"))?;
        let n_beads = self
            .n_beads
            .ok_or(ConfigError::MissingParameter("n_beads"))?;
        let total_iterations = self
            .total_iterations
            .ok_or(ConfigError::MissingParameter("total_iterations"))?;

        for (name, value) in [
            ("n_walkers", n_walkers),
            ("n_chains", n_chains),
            ("n_beads", n_beads),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: "must be positive".into(),
                });
            }
        }

        let weights = self.weights.unwrap_or(MoveWeights(DEFAULT_MOVE_WEIGHTS));
        if !weights.is_valid() {
            return Err(ConfigError::InvalidParameter {
                name: "weights",
                reason: "must be non-negative with a positive sum".into(),
            });
        }

        let pressure = self.pressure.unwrap_or(0.0);
        if !pressure.is_finite() || pressure < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "pressure",
                reason: "must be finite and non-negative".into(),
            });
        }

        let band = self.band.unwrap_or_default();
        if !(band.low < band.high && band.low >= 0.0 && band.high <= 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "band",
                reason: "acceptance band must satisfy 0 <= low < high <= 1".into(),
            });
        }

        Ok(SamplingConfig {
            n_walkers,
            n_chains,
            n_beads,
            total_iterations,
            sweeps_per_walk: self.sweeps_per_walk.unwrap_or(20),
            pressure,
            weights,
            initial_steps: self.initial_steps.unwrap_or_default(),
            band,
            limits: self.limits.unwrap_or_default(),
            intervals: self
                .intervals
                .unwrap_or_else(|| Intervals::for_population(n_walkers)),
            seed: self.seed,
            time_budget_secs: self.time_budget_secs,
            checkpoint_path: self
                .checkpoint_path
                .unwrap_or_else(|| PathBuf::from("restart.json")),
            eviction_log_path: self
                .eviction_log_path
                .unwrap_or_else(|| PathBuf::from("volumes.csv")),
        })
    }
}
