//! # Geometry Engine Module
//!
//! The geometry/physics collaborator of the sampling engine: a slotmap arena of
//! walkers together with the primitive configurational moves, hard-sphere
//! overlap queries, and chain growth. The Monte Carlo layers consume it only
//! through the [`GeometryEngine`] trait and opaque [`WalkerId`] handles, never
//! through copies of bead data.
//!
//! Every primitive returns a Boltzmann-analog acceptance weight: 0.0 for a
//! configuration with hard-sphere overlap, otherwise 1.0 (or the entropic
//! volume factor for resize moves). Acceptance itself is decided by the caller.

pub(crate) mod growth;
pub(crate) mod overlap;

pub use growth::GrowthError;

use crate::core::models::cell::{CellError, SimulationCell};
use crate::core::models::chain::ChainSnapshot;
use crate::core::models::ids::WalkerId;
use crate::core::models::walker::{Walker, WalkerSnapshot};
use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use rand::{Rng, RngCore};
use slotmap::SlotMap;

/// Hard-sphere bead diameter in reduced units.
pub const BEAD_DIAMETER: f64 = 1.0;
/// Rigid bond length; tangent spheres.
pub const BOND_LENGTH: f64 = 1.0;
/// Fixed (tetrahedral) bond angle between consecutive bonds, degrees.
pub const BOND_ANGLE_DEG: f64 = 109.47;
/// Initial cell sizing: volume allotted per bead before equilibration.
pub const MAX_VOL_PER_BEAD: f64 = 15.0;

/// Whether a resize call attempts a new volume or undoes the previous attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Attempt,
    RevertLast,
}

/// The capability set the Monte Carlo engine needs from the geometry
/// collaborator. Walker handles are issued by the implementation's arena and
/// remain valid for its lifetime; passing a foreign handle is a logic error
/// and may panic.
pub trait GeometryEngine {
    fn n_chains(&self) -> usize;
    fn n_beads(&self) -> usize;
    /// The N sampled walkers, in creation order.
    fn sampled_walkers(&self) -> &[WalkerId];
    /// The reserved clone-and-perturb scratch walker.
    fn scratch_walker(&self) -> WalkerId;

    fn cell(&self, walker: WalkerId) -> &SimulationCell;
    fn set_cell(&mut self, walker: WalkerId, cell: SimulationCell);
    /// Adds `delta` to the cell matrix and rigidly remaps each chain by its
    /// anchor bead's fractional coordinates.
    fn apply_cell_delta(&mut self, walker: WalkerId, delta: &Matrix3<f64>) -> Result<(), CellError>;
    fn volume(&self, walker: WalkerId) -> f64;
    fn has_overlap(&self, walker: WalkerId) -> bool;

    /// Isotropic log-volume move. `Attempt` applies a resize and returns its
    /// acceptance weight; `RevertLast` restores the state prior to the most
    /// recent attempt on this walker and returns 0.0.
    fn resize_volume(
        &mut self,
        walker: WalkerId,
        pressure: f64,
        max_step: f64,
        mode: ResizeMode,
        rng: &mut dyn RngCore,
    ) -> f64;
    fn translate_chain(
        &mut self,
        chain: usize,
        walker: WalkerId,
        max_step: f64,
        rng: &mut dyn RngCore,
    ) -> f64;
    fn rotate_chain(
        &mut self,
        chain: usize,
        walker: WalkerId,
        max_step: f64,
        rng: &mut dyn RngCore,
    ) -> (f64, Rotation3<f64>);
    /// Rotates the chain tail beyond a random rotatable bond. Returns the
    /// acceptance weight, the first rotated bead index, and the angle.
    fn rotate_dihedral(
        &mut self,
        chain: usize,
        walker: WalkerId,
        max_step: f64,
        rng: &mut dyn RngCore,
    ) -> (f64, usize, f64);

    fn snapshot_chain(&self, chain: usize, walker: WalkerId) -> ChainSnapshot;
    fn restore_chain(&mut self, chain: usize, walker: WalkerId, snapshot: &ChainSnapshot);

    /// Copies the source walker's full state (cell + all chain coordinates)
    /// onto the destination walker.
    fn clone_walker(&mut self, src: WalkerId, dst: WalkerId);
    fn snapshot(&self, walker: WalkerId) -> WalkerSnapshot;
    fn restore(&mut self, walker: WalkerId, snapshot: &WalkerSnapshot) -> Result<(), CellError>;

    /// Grows every chain of the walker by sequential bead placement,
    /// redrawing failed chains in place up to a bounded retry budget.
    fn grow_walker(&mut self, walker: WalkerId, rng: &mut dyn RngCore) -> Result<(), GrowthError>;
}

/// Uniformly distributed direction on the unit sphere.
pub(crate) fn random_unit_vector(rng: &mut dyn RngCore) -> Vector3<f64> {
    let z: f64 = rng.gen_range(-1.0..1.0);
    let phi: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let r = (1.0 - z * z).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

struct ResizeUndo {
    walker: WalkerId,
    cell: SimulationCell,
    chains: Vec<ChainSnapshot>,
}

/// Arena-backed hard-sphere polymer model: N sampled walkers plus one scratch
/// walker, all sharing the same chain/bead topology.
pub struct HardSphereSystem {
    walkers: SlotMap<WalkerId, Walker>,
    sampled: Vec<WalkerId>,
    scratch: WalkerId,
    n_chains: usize,
    n_beads: usize,
    last_resize: Option<ResizeUndo>,
}

impl HardSphereSystem {
    /// Allocates `n_walkers` sampled walkers plus the scratch slot, each with
    /// an identical cubic cell sized to [`MAX_VOL_PER_BEAD`] per bead. Chains
    /// are empty until [`GeometryEngine::grow_walker`] populates them.
    pub fn new(n_walkers: usize, n_chains: usize, n_beads: usize) -> Result<Self, CellError> {
        let edge = 0.999 * ((n_beads * n_chains) as f64 * MAX_VOL_PER_BEAD).cbrt();
        let cell = SimulationCell::cubic(edge)?;

        let mut walkers = SlotMap::with_key();
        let sampled = (0..n_walkers)
            .map(|_| walkers.insert(Walker::empty(cell, n_chains)))
            .collect();
        let scratch = walkers.insert(Walker::empty(cell, n_chains));

        Ok(Self {
            walkers,
            sampled,
            scratch,
            n_chains,
            n_beads,
            last_resize: None,
        })
    }

    pub fn walker(&self, id: WalkerId) -> &Walker {
        &self.walkers[id]
    }

    fn overlap_weight(&self, walker: WalkerId, chain: usize) -> f64 {
        if overlap::chain_has_overlap(&self.walkers[walker], chain) {
            0.0
        } else {
            1.0
        }
    }
}

impl GeometryEngine for HardSphereSystem {
    fn n_chains(&self) -> usize {
        self.n_chains
    }

    fn n_beads(&self) -> usize {
        self.n_beads
    }

    fn sampled_walkers(&self) -> &[WalkerId] {
        &self.sampled
    }

    fn scratch_walker(&self) -> WalkerId {
        self.scratch
    }

    fn cell(&self, walker: WalkerId) -> &SimulationCell {
        &self.walkers[walker].cell
    }

    fn set_cell(&mut self, walker: WalkerId, cell: SimulationCell) {
        self.walkers[walker].cell = cell;
    }

    fn apply_cell_delta(&mut self, walker: WalkerId, delta: &Matrix3<f64>) -> Result<(), CellError> {
        let state = &mut self.walkers[walker];
        let old_cell = state.cell;
        let mut new_cell = old_cell;
        new_cell.apply_delta(delta);

        for chain in &mut state.chains {
            if let Some(anchor) = chain.anchor() {
                let s = old_cell.to_fractional(&anchor)?;
                let remapped = new_cell.to_cartesian(&s);
                chain.translate(&(remapped - anchor));
            }
        }
        state.cell = new_cell;
        Ok(())
    }

    fn volume(&self, walker: WalkerId) -> f64 {
        self.walkers[walker].cell.volume()
    }

    fn has_overlap(&self, walker: WalkerId) -> bool {
        overlap::walker_has_overlap(&self.walkers[walker])
    }

    fn resize_volume(
        &mut self,
        walker: WalkerId,
        pressure: f64,
        max_step: f64,
        mode: ResizeMode,
        rng: &mut dyn RngCore,
    ) -> f64 {
        match mode {
            ResizeMode::Attempt => {
                if max_step <= 0.0 {
                    self.last_resize = None;
                    return 0.0;
                }
                let state = &self.walkers[walker];
                let undo = ResizeUndo {
                    walker,
                    cell: state.cell,
                    chains: state.chains.iter().map(|c| c.snapshot()).collect(),
                };
                let old_volume = state.cell.volume();

                let log_step: f64 = rng.gen_range(-max_step..max_step);
                let scale = (log_step / 3.0).exp();

                let state = &mut self.walkers[walker];
                state.cell.scale(scale);
                for chain in &mut state.chains {
                    if let Some(anchor) = chain.anchor() {
                        let shift = anchor.coords * scale - anchor.coords;
                        chain.translate(&shift);
                    }
                }
                let new_volume = state.cell.volume();
                self.last_resize = Some(undo);

                if overlap::walker_has_overlap(&self.walkers[walker]) {
                    0.0
                } else {
                    (new_volume / old_volume).powi(self.n_chains as i32)
                        * (-pressure * (new_volume - old_volume)).exp()
                }
            }
            ResizeMode::RevertLast => {
                if let Some(undo) = self.last_resize.take() {
                    debug_assert_eq!(undo.walker, walker);
                    let state = &mut self.walkers[walker];
                    state.cell = undo.cell;
                    for (chain, snapshot) in state.chains.iter_mut().zip(&undo.chains) {
                        chain.restore(snapshot);
                    }
                }
                0.0
            }
        }
    }

    fn translate_chain(
        &mut self,
        chain: usize,
        walker: WalkerId,
        max_step: f64,
        rng: &mut dyn RngCore,
    ) -> f64 {
        if max_step <= 0.0 {
            return 0.0;
        }
        let shift = Vector3::new(
            rng.gen_range(-max_step..max_step),
            rng.gen_range(-max_step..max_step),
            rng.gen_range(-max_step..max_step),
        );
        self.walkers[walker].chains[chain].translate(&shift);
        self.overlap_weight(walker, chain)
    }

    fn rotate_chain(
        &mut self,
        chain: usize,
        walker: WalkerId,
        max_step: f64,
        rng: &mut dyn RngCore,
    ) -> (f64, Rotation3<f64>) {
        let Some(centroid) = self.walkers[walker].chains[chain].centroid() else {
            return (0.0, Rotation3::identity());
        };
        if max_step <= 0.0 {
            return (0.0, Rotation3::identity());
        }
        let axis = random_unit_vector(rng);
        let angle: f64 = rng.gen_range(-max_step..max_step);
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle);

        for bead in self.walkers[walker].chains[chain].beads_mut() {
            *bead = centroid + rotation * (*bead - centroid);
        }
        (self.overlap_weight(walker, chain), rotation)
    }

    fn rotate_dihedral(
        &mut self,
        chain: usize,
        walker: WalkerId,
        max_step: f64,
        rng: &mut dyn RngCore,
    ) -> (f64, usize, f64) {
        if self.n_beads < 4 || max_step <= 0.0 {
            return (0.0, 0, 0.0);
        }
        // Rotatable bonds join beads (i, i+1) for i in 1..n-2; the tail from
        // bead i+2 onward pivots about that bond.
        let bond_start = rng.gen_range(1..self.n_beads - 2);
        let first_moved = bond_start + 2;
        let angle: f64 = rng.gen_range(-max_step..max_step);

        let beads = self.walkers[walker].chains[chain].beads_mut();
        let pivot = beads[bond_start + 1];
        let axis = (pivot - beads[bond_start]).normalize();
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle);
        for bead in beads[first_moved..].iter_mut() {
            *bead = pivot + rotation * (*bead - pivot);
        }
        (self.overlap_weight(walker, chain), first_moved, angle)
    }

    fn snapshot_chain(&self, chain: usize, walker: WalkerId) -> ChainSnapshot {
        self.walkers[walker].chains[chain].snapshot()
    }

    fn restore_chain(&mut self, chain: usize, walker: WalkerId, snapshot: &ChainSnapshot) {
        self.walkers[walker].chains[chain].restore(snapshot);
    }

    fn clone_walker(&mut self, src: WalkerId, dst: WalkerId) {
        let clone = self.walkers[src].clone();
        self.walkers[dst] = clone;
    }

    fn snapshot(&self, walker: WalkerId) -> WalkerSnapshot {
        self.walkers[walker].snapshot()
    }

    fn restore(&mut self, walker: WalkerId, snapshot: &WalkerSnapshot) -> Result<(), CellError> {
        self.walkers[walker].restore(snapshot, self.n_beads)
    }

    fn grow_walker(&mut self, walker: WalkerId, rng: &mut dyn RngCore) -> Result<(), GrowthError> {
        for ichain in 0..self.n_chains {
            let mut grown = None;
            for _ in 0..growth::MAX_CHAIN_REDRAWS {
                if let Some(beads) =
                    growth::try_grow_chain(&self.walkers[walker], ichain, self.n_beads, rng)
                {
                    grown = Some(beads);
                    break;
                }
            }
            match grown {
                Some(beads) => self.walkers[walker].chains[ichain].replace_beads(beads),
                None => {
                    return Err(GrowthError {
                        chain: ichain,
                        attempts: growth::MAX_CHAIN_REDRAWS,
                    });
                }
            }
        }
        Ok(())
    }
}
