use crate::core::geometry::{GeometryEngine, HardSphereSystem};
use crate::core::models::walker::WalkerSnapshot;
use crate::engine::calibration::adjust_step_sizes;
use crate::engine::checkpoint::RunCheckpoint;
use crate::engine::config::SamplingConfig;
use crate::engine::error::EngineError;
use crate::engine::moves::{SweepParams, run_sweep};
use crate::engine::pool::WalkerPool;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::step_sizes::MoveStepSizes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::time::Instant;
use tracing::{info, instrument};

/// Equilibration sweeps applied to each freshly grown walker.
const EQUILIBRATION_SWEEPS: usize = 20;

/// Safety margin before the wall-clock budget: the run stops once less than
/// this many seconds remain, so the final checkpoint lands before any
/// external job kill.
const TIME_MARGIN_SECS: u64 = 1200;

/// Why the iteration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// All requested iterations ran.
    Completed,
    /// The wall-clock budget ran out; a checkpoint was written just before.
    TimeBudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct NsRunResult {
    pub termination: Termination,
    pub iterations_completed: u64,
    /// The last eviction threshold, i.e. the current volume ceiling.
    pub final_threshold: f64,
    /// Acceptance rates of the last constrained walk.
    pub final_acceptance: [f64; 6],
    pub step_sizes: MoveStepSizes,
    /// Where the last checkpoint was written, if any iteration ran.
    pub checkpoint_path: Option<std::path::PathBuf>,
}

/// Consumer of trajectory frames. One frame is the committed replacement
/// walker right after an eviction.
pub trait TrajectorySink {
    fn write_frame(
        &mut self,
        iteration: u64,
        threshold: f64,
        snapshot: &WalkerSnapshot,
    ) -> std::io::Result<()>;
}

/// Discards every frame.
pub struct NullSink;

impl TrajectorySink for NullSink {
    fn write_frame(&mut self, _: u64, _: f64, _: &WalkerSnapshot) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EvictionRecord {
    iteration: u64,
    volume: f64,
}

/// Runs a fresh nested sampling simulation to completion or until the time
/// budget expires.
#[instrument(skip_all, name = "sampling_workflow")]
pub fn run<S: TrajectorySink>(
    config: &SamplingConfig,
    reporter: &ProgressReporter,
    sink: &mut S,
) -> Result<NsRunResult, EngineError> {
    let mut sampler = Sampler::new(config, reporter, sink, false)?;
    sampler.populate()?;
    sampler.run_loop(0)
}

/// Resumes a run from the checkpoint at `config.checkpoint_path`, appending
/// to the existing eviction log.
#[instrument(skip_all, name = "sampling_workflow_resume")]
pub fn resume<S: TrajectorySink>(
    config: &SamplingConfig,
    reporter: &ProgressReporter,
    sink: &mut S,
) -> Result<NsRunResult, EngineError> {
    let checkpoint = RunCheckpoint::load(&config.checkpoint_path)?;
    let mut sampler = Sampler::new(config, reporter, sink, true)?;
    checkpoint.restore_into(&mut sampler.system)?;
    sampler.pool = WalkerPool::from_system(&sampler.system);
    sampler.audit_overlaps("restart")?;
    sampler.steps = checkpoint.step_sizes;
    info!(
        iteration = checkpoint.iteration,
        "resumed from restart checkpoint"
    );
    sampler.run_loop(checkpoint.iteration)
}

struct Sampler<'a, S: TrajectorySink> {
    system: HardSphereSystem,
    pool: WalkerPool,
    steps: MoveStepSizes,
    rng: StdRng,
    config: &'a SamplingConfig,
    reporter: &'a ProgressReporter<'a>,
    sink: &'a mut S,
    evictions: csv::Writer<File>,
    started: Instant,
    last_acceptance: [f64; 6],
    last_calibration: [f64; 6],
    checkpoints_written: u64,
}

impl<'a, S: TrajectorySink> Sampler<'a, S> {
    fn new(
        config: &'a SamplingConfig,
        reporter: &'a ProgressReporter<'a>,
        sink: &'a mut S,
        append_log: bool,
    ) -> Result<Self, EngineError> {
        let system = HardSphereSystem::new(config.n_walkers, config.n_chains, config.n_beads)?;
        let pool = WalkerPool::from_system(&system);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let log_file = OpenOptions::new()
            .create(true)
            .append(append_log)
            .truncate(!append_log)
            .write(true)
            .open(&config.eviction_log_path)?;
        let evictions = csv::WriterBuilder::new()
            .has_headers(!append_log)
            .from_writer(log_file);

        Ok(Self {
            system,
            pool,
            steps: config.initial_steps,
            rng,
            config,
            reporter,
            sink,
            evictions,
            started: Instant::now(),
            last_acceptance: [0.0; 6],
            last_calibration: [0.0; 6],
            checkpoints_written: 0,
        })
    }

    /// Phase 0: grows every sampled walker and relaxes it with a short burst
    /// of unconstrained sweeps, then audits the population for overlaps.
    fn populate(&mut self) -> Result<(), EngineError> {
        self.reporter.report(Progress::PhaseStart { name: "Population" });
        info!(
            n_walkers = self.config.n_walkers,
            n_chains = self.config.n_chains,
            n_beads = self.config.n_beads,
            "growing initial population"
        );

        let params = SweepParams {
            weights: &self.config.weights,
            steps: &self.config.initial_steps,
            limits: self.config.limits,
            pressure: self.config.pressure,
            volume_limit: None,
        };
        for id in self.system.sampled_walkers().to_vec() {
            self.system.grow_walker(id, &mut self.rng)?;
            let outcome =
                run_sweep(&mut self.system, id, EQUILIBRATION_SWEEPS, &params, &mut self.rng)?;
            self.pool.set_volume(id, outcome.final_volume);
        }

        self.audit_overlaps("population")?;

        self.reporter.report(Progress::PhaseFinish);
        Ok(())
    }

    fn audit_overlaps(&self, phase: &str) -> Result<(), EngineError> {
        for &id in self.pool.sampled() {
            if self.system.has_overlap(id) {
                return Err(EngineError::Internal(format!(
                    "{phase} audit found an overlapping walker"
                )));
            }
        }
        Ok(())
    }

    /// One nested sampling iteration: evict the largest-volume walker, walk a
    /// clone of a random survivor under the eviction threshold, and commit the
    /// clone into the evicted slot. Returns the threshold.
    fn iterate(&mut self, iteration: u64) -> Result<f64, EngineError> {
        let (evicted, threshold) = self.pool.max_volume_walker();
        let source = self.pool.choose_source(&mut self.rng);
        let scratch = self.pool.scratch();

        // Calibration clones the source into the scratch slot for each of its
        // passes; the walk below starts from yet another fresh copy.
        if iteration % self.config.intervals.mc_adjust == 0 {
            self.last_calibration = adjust_step_sizes(
                &mut self.system,
                source,
                scratch,
                &mut self.steps,
                self.config.band,
                self.config.limits,
                self.config.pressure,
                Some(threshold),
                &mut self.rng,
            )?;
            self.reporter.report(Progress::Calibration { iteration });
        }

        self.system.clone_walker(source, scratch);
        let params = SweepParams {
            weights: &self.config.weights,
            steps: &self.steps,
            limits: self.config.limits,
            pressure: self.config.pressure,
            volume_limit: Some(threshold),
        };
        let outcome = run_sweep(
            &mut self.system,
            scratch,
            self.config.sweeps_per_walk,
            &params,
            &mut self.rng,
        )?;

        self.evictions.serialize(EvictionRecord {
            iteration,
            volume: threshold,
        })?;
        self.system.clone_walker(scratch, evicted);
        self.pool.set_volume(evicted, outcome.final_volume);
        self.last_acceptance = outcome.acceptance;

        if iteration % self.config.intervals.vis == 0 {
            let (largest, _) = self.pool.max_volume_walker();
            let snapshot = self.system.snapshot(largest);
            self.sink.write_frame(iteration, threshold, &snapshot)?;
        }
        if iteration % self.config.intervals.log == 0 {
            info!(
                iteration,
                threshold,
                volume = outcome.final_volume,
                acceptance = ?outcome.acceptance,
                calibration = ?self.last_calibration,
                "eviction committed"
            );
        }
        self.reporter.report(Progress::Iteration {
            index: iteration,
            threshold,
        });
        Ok(threshold)
    }

    fn run_loop(&mut self, start: u64) -> Result<NsRunResult, EngineError> {
        self.reporter.report(Progress::RunStart {
            total_iterations: self.config.total_iterations,
        });

        let mut threshold = f64::INFINITY;
        for iteration in start..self.config.total_iterations {
            threshold = self.iterate(iteration)?;

            if (iteration + 1) % self.config.intervals.restart == 0 {
                self.write_checkpoint(iteration + 1)?;
                if let Some(budget) = self.config.time_budget_secs {
                    if self.started.elapsed().as_secs() + TIME_MARGIN_SECS >= budget {
                        info!(iteration, "wall-clock budget nearly exhausted, stopping");
                        return self.finish(
                            Termination::TimeBudgetExhausted,
                            iteration + 1,
                            threshold,
                        );
                    }
                }
            }
        }

        self.write_checkpoint(self.config.total_iterations)?;
        self.finish(
            Termination::Completed,
            self.config.total_iterations,
            threshold,
        )
    }

    fn write_checkpoint(&mut self, iteration: u64) -> Result<(), EngineError> {
        self.evictions.flush()?;
        let checkpoint = RunCheckpoint::capture(
            &self.system,
            self.config.sweeps_per_walk,
            iteration,
            &self.steps,
        );
        checkpoint.save(&self.config.checkpoint_path)?;
        self.checkpoints_written += 1;
        Ok(())
    }

    fn finish(
        &mut self,
        termination: Termination,
        iterations_completed: u64,
        final_threshold: f64,
    ) -> Result<NsRunResult, EngineError> {
        self.evictions.flush()?;
        Ok(NsRunResult {
            termination,
            iterations_completed,
            final_threshold,
            final_acceptance: self.last_acceptance,
            step_sizes: self.steps,
            checkpoint_path: (self.checkpoints_written > 0)
                .then(|| self.config.checkpoint_path.clone()),
        })
    }
}
