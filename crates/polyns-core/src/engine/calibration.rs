use super::error::EngineError;
use super::moves::{MoveKind, MoveWeights, SweepParams, run_sweep};
use super::shape::ShapeLimits;
use super::step_sizes::MoveStepSizes;
use crate::core::geometry::GeometryEngine;
use crate::core::models::ids::WalkerId;
use rand::Rng;
use tracing::debug;

/// Sweeps per one-hot calibration pass.
pub const CALIBRATION_SWEEPS: usize = 20;

/// Target acceptance-rate window for step-size feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceBand {
    pub low: f64,
    pub high: f64,
}

impl Default for AcceptanceBand {
    fn default() -> Self {
        Self {
            low: 0.2,
            high: 0.5,
        }
    }
}

/// Recalibrates every applicable move step size against a disposable clone of
/// `source` in the `scratch` slot. Each move type gets a dedicated one-hot
/// pass of [`CALIBRATION_SWEEPS`] sweeps on a fresh clone, so every rate is
/// measured against the same starting configuration, and its step size is
/// doubled or halved when the measured acceptance rate falls outside the
/// band. Rotation is skipped for single-bead chains and dihedral for chains
/// shorter than four beads; the volume pass alone honors `volume_limit`.
/// Returns the six measured rates (0.0 for skipped kinds).
pub fn adjust_step_sizes<G: GeometryEngine>(
    system: &mut G,
    source: WalkerId,
    scratch: WalkerId,
    steps: &mut MoveStepSizes,
    band: AcceptanceBand,
    limits: ShapeLimits,
    pressure: f64,
    volume_limit: Option<f64>,
    rng: &mut impl Rng,
) -> Result<[f64; 6], EngineError> {
    let n_beads = system.n_beads();
    let mut rates = [0.0; 6];

    for kind in MoveKind::ALL {
        if kind == MoveKind::Rotate && n_beads < 2 {
            continue;
        }
        if kind == MoveKind::Dihedral && n_beads < 4 {
            continue;
        }

        system.clone_walker(source, scratch);
        let weights = MoveWeights::one_hot(kind);
        let params = SweepParams {
            weights: &weights,
            steps,
            limits,
            pressure,
            volume_limit: if kind == MoveKind::Volume {
                volume_limit
            } else {
                None
            },
        };
        let outcome = run_sweep(system, scratch, CALIBRATION_SWEEPS, &params, rng)?;
        let rate = outcome.acceptance[kind.index()];
        rates[kind.index()] = rate;

        if rate > band.high {
            steps.scale_up(kind);
        } else if rate < band.low {
            steps.scale_down(kind);
        }
        debug!(
            move_kind = kind.as_str(),
            rate,
            step = steps.get(kind),
            "calibration pass"
        );
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::HardSphereSystem;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn dilute_walker_grows_its_translation_step() {
        let mut system = HardSphereSystem::new(1, 2, 2).unwrap();
        let id = system.sampled_walkers()[0];
        let scratch = system.scratch_walker();
        let mut rng = StdRng::seed_from_u64(7);
        system.grow_walker(id, &mut rng).unwrap();

        let mut steps = MoveStepSizes {
            translate: 0.05,
            ..MoveStepSizes::default()
        };
        adjust_step_sizes(
            &mut system,
            id,
            scratch,
            &mut steps,
            AcceptanceBand::default(),
            ShapeLimits::default(),
            0.0,
            None,
            &mut rng,
        )
        .unwrap();

        // Tiny displacements in a dilute box are almost always accepted.
        assert_eq!(steps.translate, 0.1);
    }

    #[test]
    fn tight_volume_limit_shrinks_the_volume_step() {
        let mut system = HardSphereSystem::new(1, 4, 3).unwrap();
        let id = system.sampled_walkers()[0];
        let scratch = system.scratch_walker();
        let mut rng = StdRng::seed_from_u64(11);
        system.grow_walker(id, &mut rng).unwrap();

        let mut steps = MoveStepSizes {
            volume: 8.0,
            ..MoveStepSizes::default()
        };
        // Forbid any growth: only the rare shrinking draws can be accepted.
        let limit = system.volume(id) * 1.0001;
        adjust_step_sizes(
            &mut system,
            id,
            scratch,
            &mut steps,
            AcceptanceBand::default(),
            ShapeLimits::default(),
            0.0,
            Some(limit),
            &mut rng,
        )
        .unwrap();

        assert_eq!(steps.volume, 4.0);
    }

    #[test]
    fn every_pass_starts_from_a_fresh_clone_of_the_source() {
        let mut system = HardSphereSystem::new(1, 2, 4).unwrap();
        let id = system.sampled_walkers()[0];
        let scratch = system.scratch_walker();
        let mut rng = StdRng::seed_from_u64(29);
        system.grow_walker(id, &mut rng).unwrap();

        let before = system.snapshot(id);
        let mut steps = MoveStepSizes::default();
        adjust_step_sizes(
            &mut system,
            id,
            scratch,
            &mut steps,
            AcceptanceBand::default(),
            ShapeLimits::default(),
            0.0,
            None,
            &mut rng,
        )
        .unwrap();

        // The source walker never moves, and the final pass (stretch, which
        // preserves volume) leaves the scratch slot at the source volume
        // because it began from a fresh copy instead of one carrying the
        // volume moves of the earlier passes.
        assert_eq!(system.snapshot(id), before);
        let drift = (system.volume(scratch) - system.volume(id)).abs() / system.volume(id);
        assert!(drift < 1e-9);
    }

    #[test]
    fn dihedral_pass_is_skipped_for_short_chains() {
        let mut system = HardSphereSystem::new(1, 3, 3).unwrap();
        let id = system.sampled_walkers()[0];
        let scratch = system.scratch_walker();
        let mut rng = StdRng::seed_from_u64(19);
        system.grow_walker(id, &mut rng).unwrap();

        let mut steps = MoveStepSizes {
            dihedral: 0.25,
            ..MoveStepSizes::default()
        };
        adjust_step_sizes(
            &mut system,
            id,
            scratch,
            &mut steps,
            AcceptanceBand::default(),
            ShapeLimits::default(),
            0.0,
            None,
            &mut rng,
        )
        .unwrap();

        assert_eq!(steps.dihedral, 0.25);
    }
}
