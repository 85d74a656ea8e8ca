use super::cell::{CellError, SimulationCell};
use super::chain::BeadChain;
use nalgebra::{Matrix3, Point3};
use serde::{Deserialize, Serialize};

/// One independently evolving sample of the ensemble: a periodic cell filled
/// with bead chains. Owned by the geometry engine's arena; the Monte Carlo
/// layers only ever hold `WalkerId` handles into it.
#[derive(Debug, Clone)]
pub struct Walker {
    pub cell: SimulationCell,
    pub chains: Vec<BeadChain>,
}

impl Walker {
    /// A walker with `n_chains` empty chains awaiting growth.
    pub fn empty(cell: SimulationCell, n_chains: usize) -> Self {
        Self {
            cell,
            chains: vec![BeadChain::empty(); n_chains],
        }
    }

    pub fn snapshot(&self) -> WalkerSnapshot {
        let mut coordinates = Vec::new();
        for chain in &self.chains {
            for bead in chain.beads() {
                coordinates.push([bead.x, bead.y, bead.z]);
            }
        }
        let m = self.cell.matrix();
        WalkerSnapshot {
            cell: [
                [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
            ],
            coordinates,
        }
    }

    /// Rebuilds the walker's full state from a snapshot with `n_beads` beads
    /// per chain. The chain count is taken from the coordinate count.
    pub fn restore(&mut self, snapshot: &WalkerSnapshot, n_beads: usize) -> Result<(), CellError> {
        self.cell = SimulationCell::new(Matrix3::from_fn(|r, c| snapshot.cell[r][c]))?;
        let n_chains = snapshot.coordinates.len() / n_beads.max(1);
        let mut chains = Vec::with_capacity(n_chains);
        for ichain in 0..n_chains {
            let beads = snapshot.coordinates[ichain * n_beads..(ichain + 1) * n_beads]
                .iter()
                .map(|c| Point3::new(c[0], c[1], c[2]))
                .collect();
            chains.push(BeadChain::new(beads));
        }
        self.chains = chains;
        Ok(())
    }
}

/// Serialized form of a walker: the cell matrix (lattice vectors as rows) and
/// the flat bead coordinate list, chain-major. This is the interchange type
/// consumed by the checkpoint and trajectory collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerSnapshot {
    pub cell: [[f64; 3]; 3],
    pub coordinates: Vec<[f64; 3]>,
}

impl WalkerSnapshot {
    /// Coordinates with every bead wrapped back into the primary cell image,
    /// as trajectory writers expect.
    pub fn wrapped_coordinates(&self) -> Result<Vec<[f64; 3]>, CellError> {
        let cell = SimulationCell::new(Matrix3::from_fn(|r, c| self.cell[r][c]))?;
        let mut wrapped = Vec::with_capacity(self.coordinates.len());
        for c in &self.coordinates {
            let mut s = cell.to_fractional(&Point3::new(c[0], c[1], c[2]))?;
            for k in 0..3 {
                s[k] -= s[k].floor();
            }
            let p = cell.to_cartesian(&s);
            wrapped.push([p.x, p.y, p.z]);
        }
        Ok(wrapped)
    }
}
