use super::BEAD_DIAMETER;
use crate::core::models::cell::SimulationCell;
use crate::core::models::walker::Walker;
use nalgebra::{Matrix3, Point3, Vector3};

/// Bonded (1-2) and angle (1-3) neighbors are fixed by the rigid chain
/// geometry and are excluded from the hard-sphere test.
pub(crate) const INTRA_CHAIN_EXCLUSION: usize = 3;

/// Tangent spheres touch at exactly one diameter; the relative tolerance keeps
/// bonded-distance roundoff from registering as overlap.
fn overlap_threshold_squared() -> f64 {
    BEAD_DIAMETER * BEAD_DIAMETER * (1.0 - 1e-9)
}

/// Minimum-image distance calculator for one cell. The wrapped separation is
/// scanned over the 27 neighboring images so skewed (sheared) cells are
/// handled correctly.
pub(crate) struct MinImage {
    h_t: Matrix3<f64>,
    inv_t: Matrix3<f64>,
}

impl MinImage {
    /// Returns `None` for a non-invertible cell, which the callers treat as an
    /// automatically rejecting (overlapping) state.
    pub(crate) fn new(cell: &SimulationCell) -> Option<Self> {
        let h_t = cell.matrix().transpose();
        let inv_t = h_t.try_inverse()?;
        Some(Self { h_t, inv_t })
    }

    pub(crate) fn dist_squared(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        let mut s = self.inv_t * (b - a);
        for k in 0..3 {
            s[k] -= s[k].round();
        }
        let mut min = f64::MAX;
        for ix in -1..=1 {
            for iy in -1..=1 {
                for iz in -1..=1 {
                    let shifted = s + Vector3::new(ix as f64, iy as f64, iz as f64);
                    min = min.min((self.h_t * shifted).norm_squared());
                }
            }
        }
        min
    }

    pub(crate) fn beads_overlap(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        self.dist_squared(a, b) < overlap_threshold_squared()
    }
}

fn pair_excluded(chain_a: usize, bead_a: usize, chain_b: usize, bead_b: usize) -> bool {
    chain_a == chain_b && bead_a.abs_diff(bead_b) < INTRA_CHAIN_EXCLUSION
}

/// Hard-sphere overlap scan over every non-excluded bead pair in the walker.
pub(crate) fn walker_has_overlap(walker: &Walker) -> bool {
    let Some(mi) = MinImage::new(&walker.cell) else {
        return true;
    };
    for (ic, chain_i) in walker.chains.iter().enumerate() {
        for (ia, bead_a) in chain_i.beads().iter().enumerate() {
            // Intra-chain partners above `ia`, then every bead of later chains.
            for (ib, bead_b) in chain_i.beads().iter().enumerate().skip(ia + 1) {
                if !pair_excluded(ic, ia, ic, ib) && mi.beads_overlap(bead_a, bead_b) {
                    return true;
                }
            }
            for chain_j in walker.chains.iter().skip(ic + 1) {
                for bead_b in chain_j.beads() {
                    if mi.beads_overlap(bead_a, bead_b) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Overlap scan restricted to one chain against itself and all others, used
/// after single-chain moves.
pub(crate) fn chain_has_overlap(walker: &Walker, ichain: usize) -> bool {
    let Some(mi) = MinImage::new(&walker.cell) else {
        return true;
    };
    let chain = &walker.chains[ichain];
    for (ia, bead_a) in chain.beads().iter().enumerate() {
        for (ib, bead_b) in chain.beads().iter().enumerate().skip(ia + 1) {
            if !pair_excluded(ichain, ia, ichain, ib) && mi.beads_overlap(bead_a, bead_b) {
                return true;
            }
        }
        for (jc, chain_j) in walker.chains.iter().enumerate() {
            if jc == ichain {
                continue;
            }
            for bead_b in chain_j.beads() {
                if mi.beads_overlap(bead_a, bead_b) {
                    return true;
                }
            }
        }
    }
    false
}
