use crate::cli::{ResumeArgs, RunArgs};
use crate::error::{CliError, Result};
use polyns::engine::calibration::AcceptanceBand;
use polyns::engine::config::{Intervals, SamplingConfig, SamplingConfigBuilder};
use polyns::engine::moves::MoveWeights;
use polyns::engine::shape::ShapeLimits;
use polyns::engine::step_sizes::MoveStepSizes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The fully resolved configuration of one invocation: the core sampling
/// parameters plus the CLI-side output paths.
pub struct AppConfig {
    pub core: SamplingConfig,
    pub trajectory_path: PathBuf,
}

/// CLI-side overrides that win over the file values.
#[derive(Debug, Default, Clone, Copy)]
struct Overrides {
    walkers: Option<usize>,
    chains: Option<usize>,
    beads: Option<usize>,
    sweeps: Option<usize>,
    iterations: Option<u64>,
    seed: Option<u64>,
    time_budget: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    pub system: FileSystemSection,
    #[serde(default)]
    pub sampling: FileSamplingSection,
    #[serde(default)]
    pub intervals: Option<FileIntervalsSection>,
    #[serde(default)]
    pub limits: Option<FileLimitsSection>,
    #[serde(default)]
    pub output: FileOutputSection,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSystemSection {
    pub walkers: usize,
    pub chains: usize,
    pub beads: usize,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSamplingSection {
    pub iterations: Option<u64>,
    #[serde(rename = "sweeps-per-walk")]
    pub sweeps_per_walk: Option<usize>,
    pub pressure: Option<f64>,
    pub seed: Option<u64>,
    #[serde(rename = "move-weights")]
    pub move_weights: Option<[f64; 6]>,
    #[serde(rename = "initial-step")]
    pub initial_step: Option<f64>,
    #[serde(rename = "acceptance-band")]
    pub acceptance_band: Option<[f64; 2]>,
    #[serde(rename = "time-budget-secs")]
    pub time_budget_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileIntervalsSection {
    #[serde(rename = "mc-adjust")]
    pub mc_adjust: u64,
    pub vis: u64,
    pub restart: u64,
    pub log: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileLimitsSection {
    #[serde(rename = "aspect-ratio")]
    pub aspect_ratio: f64,
    #[serde(rename = "min-angle-deg")]
    pub min_angle_deg: f64,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileOutputSection {
    pub trajectory: Option<PathBuf>,
    pub checkpoint: Option<PathBuf>,
    pub evictions: Option<PathBuf>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let parsed: Self = toml::from_str(&text).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        debug!(path = %path.display(), "run configuration parsed");
        Ok(parsed)
    }

    pub fn merge_with_run(self, args: &RunArgs) -> Result<AppConfig> {
        self.resolve(
            &args.output_dir,
            Overrides {
                walkers: args.walkers,
                chains: args.chains,
                beads: args.beads,
                sweeps: args.sweeps,
                iterations: args.iterations,
                seed: args.seed,
                time_budget: args.time_budget,
            },
        )
    }

    pub fn merge_with_resume(self, args: &ResumeArgs) -> Result<AppConfig> {
        self.resolve(
            &args.output_dir,
            Overrides {
                iterations: args.iterations,
                time_budget: args.time_budget,
                ..Overrides::default()
            },
        )
    }

    fn resolve(self, output_dir: &Path, overrides: Overrides) -> Result<AppConfig> {
        let total_iterations = overrides
            .iterations
            .or(self.sampling.iterations)
            .ok_or_else(|| CliError::Config("sampling.iterations is required".into()))?;

        let mut builder = SamplingConfigBuilder::new()
            .n_walkers(overrides.walkers.unwrap_or(self.system.walkers))
            .n_chains(overrides.chains.unwrap_or(self.system.chains))
            .n_beads(overrides.beads.unwrap_or(self.system.beads))
            .total_iterations(total_iterations)
            .checkpoint_path(output_dir.join(
                self.output
                    .checkpoint
                    .unwrap_or_else(|| PathBuf::from("restart.json")),
            ))
            .eviction_log_path(output_dir.join(
                self.output
                    .evictions
                    .unwrap_or_else(|| PathBuf::from("volumes.csv")),
            ));

        if let Some(budget) = overrides.time_budget.or(self.sampling.time_budget_secs) {
            builder = builder.time_budget_secs(budget);
        }
        if let Some(sweeps) = overrides.sweeps.or(self.sampling.sweeps_per_walk) {
            builder = builder.sweeps_per_walk(sweeps);
        }
        if let Some(pressure) = self.sampling.pressure {
            builder = builder.pressure(pressure);
        }
        if let Some(seed) = overrides.seed.or(self.sampling.seed) {
            builder = builder.seed(seed);
        }
        if let Some([low, high]) = self.sampling.acceptance_band {
            builder = builder.band(AcceptanceBand { low, high });
        }
        if let Some(weights) = self.sampling.move_weights {
            builder = builder.weights(MoveWeights(weights));
        }
        if let Some(step) = self.sampling.initial_step {
            builder = builder.initial_steps(MoveStepSizes {
                volume: step,
                translate: step,
                rotate: step,
                dihedral: step,
                shear: step,
                stretch: step,
            });
        }
        if let Some(intervals) = self.intervals {
            builder = builder.intervals(Intervals {
                mc_adjust: intervals.mc_adjust.max(1),
                vis: intervals.vis.max(1),
                restart: intervals.restart.max(1),
                log: intervals.log.max(1),
            });
        }
        if let Some(limits) = self.limits {
            builder = builder.limits(ShapeLimits {
                aspect_ratio: limits.aspect_ratio,
                min_angle_deg: limits.min_angle_deg,
            });
        }

        let core = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;
        let trajectory_path = output_dir.join(
            self.output
                .trajectory
                .unwrap_or_else(|| PathBuf::from("traj.extxyz")),
        );

        Ok(AppConfig {
            core,
            trajectory_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("run.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn minimal_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[system]
walkers = 8
chains = 10
beads = 4

[sampling]
iterations = 500
"#,
        );

        let partial = PartialRunConfig::from_file(&path).unwrap();
        let config = partial.resolve(dir.path(), Overrides::default()).unwrap();

        assert_eq!(config.core.n_walkers, 8);
        assert_eq!(config.core.total_iterations, 500);
        assert_eq!(config.core.sweeps_per_walk, 20);
        assert_eq!(config.core.time_budget_secs, None);
        assert_eq!(config.core.intervals.mc_adjust, 4);
        assert!(config.core.eviction_log_path.ends_with("volumes.csv"));
        assert!(config.trajectory_path.ends_with("traj.extxyz"));
    }

    #[test]
    fn cli_overrides_beat_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[system]
walkers = 8
chains = 10
beads = 4

[sampling]
iterations = 500
seed = 3
"#,
        );

        let partial = PartialRunConfig::from_file(&path).unwrap();
        let config = partial
            .resolve(
                dir.path(),
                Overrides {
                    walkers: Some(16),
                    iterations: Some(100),
                    seed: Some(9),
                    time_budget: Some(3600),
                    ..Overrides::default()
                },
            )
            .unwrap();

        assert_eq!(config.core.n_walkers, 16);
        assert_eq!(config.core.total_iterations, 100);
        assert_eq!(config.core.seed, Some(9));
        assert_eq!(config.core.time_budget_secs, Some(3600));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[system]
walkers = 8
chains = 10
beads = 4
colour = "red"
"#,
        );

        assert!(matches!(
            PartialRunConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn missing_iteration_count_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[system]
walkers = 8
chains = 10
beads = 4
"#,
        );

        let partial = PartialRunConfig::from_file(&path).unwrap();
        assert!(matches!(
            partial.resolve(dir.path(), Overrides::default()),
            Err(CliError::Config(_))
        ));
    }
}
