use super::overlap::{INTRA_CHAIN_EXCLUSION, MinImage};
use super::{BOND_ANGLE_DEG, BOND_LENGTH, random_unit_vector};
use crate::core::models::walker::Walker;
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use rand::{Rng, RngCore};
use thiserror::Error;

/// Redraws of a single bead before the whole chain is abandoned and regrown.
const MAX_BEAD_ATTEMPTS: usize = 200;
/// Whole-chain redraws before growth is declared a fatal initialization error.
pub(crate) const MAX_CHAIN_REDRAWS: usize = 1000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to grow chain {chain} after {attempts} redraws")]
pub struct GrowthError {
    pub chain: usize,
    pub attempts: usize,
}

/// Attempts one sequential growth of chain `ichain` inside `walker`, checking
/// each placed bead against the partial chain and every other chain. Returns
/// `None` when a bead cannot be placed within its attempt budget, in which
/// case the caller redraws the chain from scratch.
pub(crate) fn try_grow_chain(
    walker: &Walker,
    ichain: usize,
    n_beads: usize,
    rng: &mut dyn RngCore,
) -> Option<Vec<Point3<f64>>> {
    let mi = MinImage::new(&walker.cell)?;
    let mut beads: Vec<Point3<f64>> = Vec::with_capacity(n_beads);

    while beads.len() < n_beads {
        let mut placed = false;
        for _ in 0..MAX_BEAD_ATTEMPTS {
            let candidate = propose_bead(&beads, walker, rng);
            if !candidate_clashes(&mi, &candidate, &beads, walker, ichain) {
                beads.push(candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            return None;
        }
    }
    Some(beads)
}

fn propose_bead(partial: &[Point3<f64>], walker: &Walker, rng: &mut dyn RngCore) -> Point3<f64> {
    match partial.len() {
        // Anchor bead: uniform over the cell.
        0 => {
            let s = Vector3::new(
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            );
            walker.cell.to_cartesian(&s)
        }
        // Second bead: free direction at bond length.
        1 => partial[0] + random_unit_vector(rng) * BOND_LENGTH,
        // Later beads: fixed bond angle, uniform dihedral about the previous bond.
        n => {
            let u = (partial[n - 1] - partial[n - 2]).normalize();
            let perp = perpendicular_to(&u);
            let dihedral = rng.gen_range(0.0..std::f64::consts::TAU);
            let spun = Rotation3::from_axis_angle(&Unit::new_normalize(u), dihedral) * perp;
            let alpha = (180.0 - BOND_ANGLE_DEG).to_radians();
            let direction = u * alpha.cos() + spun * alpha.sin();
            partial[n - 1] + direction * BOND_LENGTH
        }
    }
}

fn perpendicular_to(u: &Vector3<f64>) -> Vector3<f64> {
    let reference = if u.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    u.cross(&reference).normalize()
}

fn candidate_clashes(
    mi: &MinImage,
    candidate: &Point3<f64>,
    partial: &[Point3<f64>],
    walker: &Walker,
    ichain: usize,
) -> bool {
    let my_index = partial.len();
    for (ib, bead) in partial.iter().enumerate() {
        if my_index - ib >= INTRA_CHAIN_EXCLUSION && mi.beads_overlap(candidate, bead) {
            return true;
        }
    }
    for (jc, chain) in walker.chains.iter().enumerate() {
        if jc == ichain {
            continue;
        }
        for bead in chain.beads() {
            if mi.beads_overlap(candidate, bead) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BEAD_DIAMETER;
    use crate::core::models::cell::SimulationCell;
    use crate::core::models::chain::BeadChain;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn grown_chain_has_unit_bonds_and_fixed_angles() {
        let walker = Walker::empty(SimulationCell::cubic(30.0).unwrap(), 1);
        let mut rng = StdRng::seed_from_u64(7);
        let beads = try_grow_chain(&walker, 0, 6, &mut rng).unwrap();
        assert_eq!(beads.len(), 6);

        for pair in beads.windows(2) {
            assert!(((pair[1] - pair[0]).norm() - BOND_LENGTH).abs() < 1e-9);
        }
        for triple in beads.windows(3) {
            let a = (triple[0] - triple[1]).normalize();
            let b = (triple[2] - triple[1]).normalize();
            let angle = a.dot(&b).clamp(-1.0, 1.0).acos().to_degrees();
            assert!((angle - BOND_ANGLE_DEG).abs() < 1e-6);
        }
    }

    #[test]
    fn grown_chain_avoids_existing_chains() {
        let mut walker = Walker::empty(SimulationCell::cubic(12.0).unwrap(), 2);
        walker.chains[0] = BeadChain::new(vec![
            Point3::new(6.0, 6.0, 6.0),
            Point3::new(7.0, 6.0, 6.0),
            Point3::new(7.33, 6.94, 6.0),
        ]);
        let mut rng = StdRng::seed_from_u64(11);
        let beads = try_grow_chain(&walker, 1, 3, &mut rng).unwrap();

        let mi = MinImage::new(&walker.cell).unwrap();
        for bead in &beads {
            for other in walker.chains[0].beads() {
                assert!(mi.dist_squared(bead, other) >= BEAD_DIAMETER * BEAD_DIAMETER * 0.999);
            }
        }
    }
}
