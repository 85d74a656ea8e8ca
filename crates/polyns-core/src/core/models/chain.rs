use nalgebra::{Point3, Vector3};

/// A rigid-bond bead chain: unit-diameter hard spheres connected by unit-length
/// bonds with fixed tetrahedral bond angles. Dihedral angles are the only
/// internal degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct BeadChain {
    beads: Vec<Point3<f64>>,
}

/// Value-semantics copy of one chain's bead positions, taken before an
/// attempted move so a rejection can restore the chain exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    beads: Vec<Point3<f64>>,
}

impl BeadChain {
    pub fn new(beads: Vec<Point3<f64>>) -> Self {
        Self { beads }
    }

    pub fn empty() -> Self {
        Self { beads: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.beads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beads.is_empty()
    }

    pub fn beads(&self) -> &[Point3<f64>] {
        &self.beads
    }

    pub fn beads_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.beads
    }

    pub fn replace_beads(&mut self, beads: Vec<Point3<f64>>) {
        self.beads = beads;
    }

    /// The first bead, used as the chain's anchor for affine cell remapping.
    pub fn anchor(&self) -> Option<Point3<f64>> {
        self.beads.first().copied()
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.beads.is_empty() {
            return None;
        }
        let sum = self
            .beads
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.beads.len() as f64))
    }

    /// Rigidly translates every bead by `shift`.
    pub fn translate(&mut self, shift: &Vector3<f64>) {
        for bead in &mut self.beads {
            *bead += shift;
        }
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            beads: self.beads.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: &ChainSnapshot) {
        self.beads.clone_from(&snapshot.beads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chain() -> BeadChain {
        BeadChain::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn snapshot_restores_positions_after_mutation() {
        let mut chain = sample_chain();
        let snapshot = chain.snapshot();

        chain.translate(&Vector3::new(2.0, -1.0, 0.5));
        assert_ne!(chain, sample_chain());

        chain.restore(&snapshot);
        assert_eq!(chain, sample_chain());
    }

    #[test]
    fn centroid_averages_bead_positions() {
        let chain = sample_chain();
        let c = chain.centroid().unwrap();
        assert!((c - Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn empty_chain_has_no_anchor() {
        assert!(BeadChain::empty().anchor().is_none());
        assert!(BeadChain::empty().centroid().is_none());
    }
}
