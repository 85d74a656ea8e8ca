use super::error::EngineError;
use super::shape::{self, ShapeLimits};
use super::step_sizes::MoveStepSizes;
use crate::core::geometry::{GeometryEngine, ResizeMode};
use crate::core::models::ids::WalkerId;
use rand::Rng;

/// Elementary moves beyond those sized by chain length, per sweep.
const SWEEP_OVERHEAD: usize = 7;

/// The six elementary move types of the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveKind {
    /// Isotropic log-volume resize.
    Volume,
    /// Rigid whole-chain translation.
    Translate,
    /// Rigid whole-chain rotation about its centroid.
    Rotate,
    /// Tail rotation about a random internal bond.
    Dihedral,
    /// Off-diagonal cell deformation.
    Shear,
    /// Volume-preserving diagonal cell deformation.
    Stretch,
}

impl MoveKind {
    pub const ALL: [MoveKind; 6] = [
        MoveKind::Volume,
        MoveKind::Translate,
        MoveKind::Rotate,
        MoveKind::Dihedral,
        MoveKind::Shear,
        MoveKind::Stretch,
    ];

    pub fn index(&self) -> usize {
        match self {
            MoveKind::Volume => 0,
            MoveKind::Translate => 1,
            MoveKind::Rotate => 2,
            MoveKind::Dihedral => 3,
            MoveKind::Shear => 4,
            MoveKind::Stretch => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Volume => "volume",
            MoveKind::Translate => "translate",
            MoveKind::Rotate => "rotate",
            MoveKind::Dihedral => "dihedral",
            MoveKind::Shear => "shear",
            MoveKind::Stretch => "stretch",
        }
    }

    pub fn is_shape_move(&self) -> bool {
        matches!(self, MoveKind::Shear | MoveKind::Stretch)
    }
}

/// Relative selection weights for the six move types. They need not sum to
/// one; the move engine normalizes them into a cumulative partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveWeights(pub [f64; 6]);

impl MoveWeights {
    pub fn one_hot(kind: MoveKind) -> Self {
        let mut weights = [0.0; 6];
        weights[kind.index()] = 1.0;
        Self(weights)
    }

    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|w| *w >= 0.0 && w.is_finite()) && self.0.iter().sum::<f64>() > 0.0
    }

    fn cumulative(&self) -> Result<[f64; 6], EngineError> {
        if !self.is_valid() {
            return Err(EngineError::Internal(
                "move weights must be non-negative with a positive sum".into(),
            ));
        }
        let total: f64 = self.0.iter().sum();
        let mut partition = [0.0; 6];
        let mut running = 0.0;
        for (slot, weight) in partition.iter_mut().zip(self.0.iter()) {
            running += weight / total;
            *slot = running;
        }
        Ok(partition)
    }
}

/// Per-sweep attempted/accepted counters for each move type. Ephemeral:
/// recomputed every sweep batch and consumed into acceptance rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveStatistics {
    attempted: [u64; 6],
    accepted: [u64; 6],
}

impl MoveStatistics {
    pub fn record(&mut self, kind: MoveKind, accepted: bool) {
        self.attempted[kind.index()] += 1;
        if accepted {
            self.accepted[kind.index()] += 1;
        }
    }

    /// Acceptance rates with the attempt count floored at one, so an
    /// unattempted move type reports 0 instead of dividing by zero.
    pub fn rates(&self) -> [f64; 6] {
        let mut rates = [0.0; 6];
        for i in 0..6 {
            rates[i] = self.accepted[i] as f64 / self.attempted[i].max(1) as f64;
        }
        rates
    }
}

/// Everything a sweep needs besides the walker and the RNG.
pub struct SweepParams<'a> {
    pub weights: &'a MoveWeights,
    pub steps: &'a MoveStepSizes,
    pub limits: ShapeLimits,
    pub pressure: f64,
    /// Hard ceiling on the walker volume; volume moves that would exceed it
    /// are reverted. `None` means unconstrained.
    pub volume_limit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepOutcome {
    pub final_volume: f64,
    pub acceptance: [f64; 6],
}

/// Number of elementary moves per sweep, sized so each internal degree of
/// freedom is touched once per sweep on average.
pub fn moves_per_sweep(n_chains: usize, n_beads: usize) -> usize {
    let per_chain = match n_beads {
        0 | 1 => 1,
        2 | 3 => 2,
        n => n - 1,
    };
    per_chain * n_chains + SWEEP_OVERHEAD
}

/// Runs `n_sweeps` batches of elementary Monte Carlo moves on one walker,
/// applying or reverting each move, and returns the walker's final volume
/// together with the per-type acceptance rates.
pub fn run_sweep<G: GeometryEngine>(
    system: &mut G,
    walker: WalkerId,
    n_sweeps: usize,
    params: &SweepParams,
    rng: &mut impl Rng,
) -> Result<SweepOutcome, EngineError> {
    let partition = params.weights.cumulative()?;
    let per_sweep = moves_per_sweep(system.n_chains(), system.n_beads());
    let mut stats = MoveStatistics::default();

    for _ in 0..n_sweeps {
        for _ in 0..per_sweep {
            let ichain = rng.gen_range(0..system.n_chains());
            let xi: f64 = rng.gen_range(0.0..1.0);
            let kind = select_kind(&partition, xi);
            dispatch_move(system, walker, ichain, kind, params, &mut stats, rng)?;
        }
    }

    Ok(SweepOutcome {
        final_volume: system.volume(walker),
        acceptance: stats.rates(),
    })
}

fn select_kind(partition: &[f64; 6], xi: f64) -> MoveKind {
    for kind in MoveKind::ALL {
        if xi < partition[kind.index()] {
            return kind;
        }
    }
    MoveKind::Stretch
}

fn dispatch_move<G: GeometryEngine>(
    system: &mut G,
    walker: WalkerId,
    ichain: usize,
    kind: MoveKind,
    params: &SweepParams,
    stats: &mut MoveStatistics,
    rng: &mut impl Rng,
) -> Result<(), EngineError> {
    let max_step = params.steps.get(kind);
    match kind {
        MoveKind::Volume => {
            let boltz =
                system.resize_volume(walker, params.pressure, max_step, ResizeMode::Attempt, rng);
            let new_volume = system.volume(walker);
            let within_limit = params
                .volume_limit
                .is_none_or(|limit| new_volume - limit < f64::EPSILON);
            let accepted = within_limit && rng.gen_range(0.0..1.0) < boltz;
            if !accepted {
                system.resize_volume(walker, params.pressure, max_step, ResizeMode::RevertLast, rng);
            }
            stats.record(kind, accepted);
        }
        MoveKind::Translate | MoveKind::Rotate | MoveKind::Dihedral => {
            let snapshot = system.snapshot_chain(ichain, walker);
            let boltz = match kind {
                MoveKind::Translate => system.translate_chain(ichain, walker, max_step, rng),
                MoveKind::Rotate => system.rotate_chain(ichain, walker, max_step, rng).0,
                MoveKind::Dihedral => system.rotate_dihedral(ichain, walker, max_step, rng).0,
                _ => unreachable!(),
            };
            let accepted = rng.gen_range(0.0..1.0) < boltz;
            if !accepted {
                system.restore_chain(ichain, walker, &snapshot);
            }
            stats.record(kind, accepted);
        }
        MoveKind::Shear | MoveKind::Stretch => {
            let (accepted, delta) = if kind == MoveKind::Shear {
                shape::shear_step(system, walker, max_step, &params.limits, rng)?
            } else {
                shape::stretch_step(system, walker, max_step, &params.limits, rng)?
            };
            if !accepted {
                system.apply_cell_delta(walker, &(-delta))?;
            }
            stats.record(kind, accepted);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{GeometryEngine, HardSphereSystem};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grown_system(n_chains: usize, n_beads: usize) -> (HardSphereSystem, WalkerId) {
        let mut system = HardSphereSystem::new(1, n_chains, n_beads).unwrap();
        let id = system.sampled_walkers()[0];
        let mut rng = StdRng::seed_from_u64(101);
        system.grow_walker(id, &mut rng).unwrap();
        (system, id)
    }

    #[test]
    fn moves_per_sweep_follows_the_degree_of_freedom_rule() {
        assert_eq!(moves_per_sweep(10, 1), 17);
        assert_eq!(moves_per_sweep(10, 3), 27);
        assert_eq!(moves_per_sweep(10, 4), 37);
    }

    #[test]
    fn unattempted_move_types_report_zero_rate() {
        let (mut system, id) = grown_system(4, 3);
        let mut rng = StdRng::seed_from_u64(5);
        let weights = MoveWeights::one_hot(MoveKind::Translate);
        let params = SweepParams {
            weights: &weights,
            steps: &MoveStepSizes::default(),
            limits: ShapeLimits::default(),
            pressure: 0.0,
            volume_limit: None,
        };

        let outcome = run_sweep(&mut system, id, 2, &params, &mut rng).unwrap();
        for kind in MoveKind::ALL {
            if kind != MoveKind::Translate {
                assert_eq!(outcome.acceptance[kind.index()], 0.0);
            }
        }
    }

    #[test]
    fn volume_limit_is_never_exceeded() {
        let (mut system, id) = grown_system(6, 3);
        let mut rng = StdRng::seed_from_u64(13);
        let limit = system.volume(id);
        let weights = MoveWeights::one_hot(MoveKind::Volume);
        let params = SweepParams {
            weights: &weights,
            steps: &MoveStepSizes::default(),
            limits: ShapeLimits::default(),
            pressure: 0.0,
            volume_limit: Some(limit),
        };

        for _ in 0..5 {
            let outcome = run_sweep(&mut system, id, 1, &params, &mut rng).unwrap();
            assert!(outcome.final_volume <= limit * (1.0 + 1e-12));
        }
    }

    #[test]
    fn dilute_translations_are_mostly_accepted() {
        let (mut system, id) = grown_system(2, 2);
        let mut rng = StdRng::seed_from_u64(29);
        let weights = MoveWeights::one_hot(MoveKind::Translate);
        let steps = MoveStepSizes {
            translate: 0.05,
            ..MoveStepSizes::default()
        };
        let params = SweepParams {
            weights: &weights,
            steps: &steps,
            limits: ShapeLimits::default(),
            pressure: 0.0,
            volume_limit: None,
        };

        let outcome = run_sweep(&mut system, id, 10, &params, &mut rng).unwrap();
        assert!(outcome.acceptance[MoveKind::Translate.index()] > 0.8);
    }

    #[test]
    fn mixed_sweep_leaves_no_overlap() {
        let (mut system, id) = grown_system(5, 4);
        let mut rng = StdRng::seed_from_u64(37);
        let weights = MoveWeights([1.0, 3.0, 3.0, 3.0, 1.0, 1.0]);
        let params = SweepParams {
            weights: &weights,
            steps: &MoveStepSizes::default(),
            limits: ShapeLimits::default(),
            pressure: 0.0,
            volume_limit: None,
        };

        run_sweep(&mut system, id, 5, &params, &mut rng).unwrap();
        assert!(!system.has_overlap(id));
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let (mut system, id) = grown_system(2, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let weights = MoveWeights([0.0; 6]);
        let params = SweepParams {
            weights: &weights,
            steps: &MoveStepSizes::default(),
            limits: ShapeLimits::default(),
            pressure: 0.0,
            volume_limit: None,
        };
        assert!(run_sweep(&mut system, id, 1, &params, &mut rng).is_err());
    }
}
