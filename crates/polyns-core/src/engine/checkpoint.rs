use super::step_sizes::MoveStepSizes;
use crate::core::geometry::GeometryEngine;
use crate::core::models::cell::CellError;
use crate::core::models::walker::WalkerSnapshot;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("checkpoint does not match the run: {0}")]
    Mismatch(String),
    #[error("checkpoint holds a degenerate cell: {0}")]
    Cell(#[from] CellError),
}

/// A complete restart image of a run: topology, progress counters, calibrated
/// step sizes, and every walker's configuration (sampled walkers first, the
/// scratch walker last).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub n_walkers: usize,
    pub n_chains: usize,
    pub n_beads: usize,
    pub sweeps_per_walk: usize,
    /// Iterations completed before this image was taken.
    pub iteration: u64,
    pub step_sizes: MoveStepSizes,
    pub walkers: Vec<WalkerSnapshot>,
}

impl RunCheckpoint {
    pub fn capture<G: GeometryEngine>(
        system: &G,
        sweeps_per_walk: usize,
        iteration: u64,
        step_sizes: &MoveStepSizes,
    ) -> Self {
        let mut walkers: Vec<WalkerSnapshot> = system
            .sampled_walkers()
            .iter()
            .map(|&id| system.snapshot(id))
            .collect();
        walkers.push(system.snapshot(system.scratch_walker()));

        Self {
            n_walkers: system.sampled_walkers().len(),
            n_chains: system.n_chains(),
            n_beads: system.n_beads(),
            sweeps_per_walk,
            iteration,
            step_sizes: *step_sizes,
            walkers,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        info!(path = %path.display(), iteration = self.iteration, "checkpoint written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let checkpoint: Self = serde_json::from_reader(BufReader::new(file))?;
        if checkpoint.walkers.len() != checkpoint.n_walkers + 1 {
            return Err(CheckpointError::Mismatch(format!(
                "expected {} walker snapshots, found {}",
                checkpoint.n_walkers + 1,
                checkpoint.walkers.len()
            )));
        }
        Ok(checkpoint)
    }

    /// Writes the stored walker configurations back into a freshly allocated
    /// system with matching topology.
    pub fn restore_into<G: GeometryEngine>(&self, system: &mut G) -> Result<(), CheckpointError> {
        if system.n_chains() != self.n_chains || system.n_beads() != self.n_beads {
            return Err(CheckpointError::Mismatch(format!(
                "system topology {}x{} does not match checkpoint {}x{}",
                system.n_chains(),
                system.n_beads(),
                self.n_chains,
                self.n_beads
            )));
        }
        if system.sampled_walkers().len() != self.n_walkers {
            return Err(CheckpointError::Mismatch(format!(
                "system holds {} sampled walkers, checkpoint {}",
                system.sampled_walkers().len(),
                self.n_walkers
            )));
        }

        let ids: Vec<_> = system.sampled_walkers().to_vec();
        for (id, snapshot) in ids.into_iter().zip(&self.walkers) {
            system.restore(id, snapshot)?;
        }
        system.restore(system.scratch_walker(), &self.walkers[self.n_walkers])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{GeometryEngine, HardSphereSystem};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-12;

    fn grown_system(n_walkers: usize) -> HardSphereSystem {
        let mut system = HardSphereSystem::new(n_walkers, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        for id in system.sampled_walkers().to_vec() {
            system.grow_walker(id, &mut rng).unwrap();
        }
        system
    }

    #[test]
    fn checkpoint_round_trips_through_a_file() {
        let system = grown_system(2);
        let steps = MoveStepSizes {
            volume: 1.25,
            ..MoveStepSizes::default()
        };
        let checkpoint = RunCheckpoint::capture(&system, 8, 42, &steps);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restart.json");
        checkpoint.save(&path).unwrap();
        let loaded = RunCheckpoint::load(&path).unwrap();

        assert_eq!(loaded.iteration, 42);
        assert_eq!(loaded.sweeps_per_walk, 8);
        assert!((loaded.step_sizes.volume - 1.25).abs() < TOLERANCE);
        assert_eq!(loaded.walkers.len(), 3);

        let mut fresh = HardSphereSystem::new(2, 3, 3).unwrap();
        loaded.restore_into(&mut fresh).unwrap();
        for (&a, &b) in system
            .sampled_walkers()
            .iter()
            .zip(fresh.sampled_walkers())
        {
            assert!((system.volume(a) - fresh.volume(b)).abs() < TOLERANCE);
            assert_eq!(
                system.snapshot(a).coordinates,
                fresh.snapshot(b).coordinates
            );
        }
    }

    #[test]
    fn topology_mismatch_is_rejected() {
        let system = grown_system(2);
        let checkpoint = RunCheckpoint::capture(&system, 8, 0, &MoveStepSizes::default());

        let mut wrong = HardSphereSystem::new(2, 4, 3).unwrap();
        assert!(matches!(
            checkpoint.restore_into(&mut wrong),
            Err(CheckpointError::Mismatch(_))
        ));
    }

    #[test]
    fn truncated_walker_list_fails_to_load() {
        let system = grown_system(2);
        let mut checkpoint = RunCheckpoint::capture(&system, 8, 0, &MoveStepSizes::default());
        checkpoint.walkers.pop();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restart.json");
        checkpoint.save(&path).unwrap();
        assert!(matches!(
            RunCheckpoint::load(&path),
            Err(CheckpointError::Mismatch(_))
        ));
    }
}
