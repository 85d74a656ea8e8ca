use super::error::EngineError;
use crate::core::geometry::GeometryEngine;
use crate::core::models::ids::WalkerId;
use nalgebra::Matrix3;
use rand::Rng;

/// A stretch ratio this close to zero would invert or annihilate a lattice
/// vector; the move is rejected before touching the cell.
const MIN_STRETCH_RATIO: f64 = 1e-6;

/// Shape-validity gates applied after every shear or stretch move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeLimits {
    /// Minimum normalized face-to-face distance.
    pub aspect_ratio: f64,
    /// Minimum angle between any two cell vectors, degrees.
    pub min_angle_deg: f64,
}

impl Default for ShapeLimits {
    fn default() -> Self {
        Self {
            aspect_ratio: 0.8,
            min_angle_deg: 55.0,
        }
    }
}

/// Shear move: perturbs one randomly chosen lattice vector within the plane
/// spanned by the orthonormalized other two.
///
/// The additive cell delta is always returned so the caller can revert a
/// rejected move by applying its negation. A degenerate cell (non-finite
/// orthonormal basis) is a fatal configuration error, not a rejection.
pub fn shear_step<G: GeometryEngine>(
    system: &mut G,
    walker: WalkerId,
    max_step: f64,
    limits: &ShapeLimits,
    rng: &mut impl Rng,
) -> Result<(bool, Matrix3<f64>), EngineError> {
    let cell = *system.cell(walker);
    let target = rng.gen_range(0..3usize);
    let (v1, v2) = cell.orthonormal_pair(target)?;

    if max_step <= 0.0 {
        return Ok((false, Matrix3::zeros()));
    }
    let rv1: f64 = rng.gen_range(-max_step..max_step);
    let rv2: f64 = rng.gen_range(-max_step..max_step);

    let mut delta = Matrix3::zeros();
    let perturbation = v1 * rv1 + v2 * rv2;
    delta.set_row(target, &perturbation.transpose());

    system.apply_cell_delta(walker, &delta)?;
    Ok((shape_acceptable(system, walker, limits), delta))
}

/// Stretch move: scales one randomly chosen diagonal cell component by
/// `1 + u` and a second, distinct one by `1 / (1 + u)`, which preserves the
/// volume by construction. Same gates and revert contract as [`shear_step`].
pub fn stretch_step<G: GeometryEngine>(
    system: &mut G,
    walker: WalkerId,
    max_step: f64,
    limits: &ShapeLimits,
    rng: &mut impl Rng,
) -> Result<(bool, Matrix3<f64>), EngineError> {
    if max_step <= 0.0 {
        return Ok((false, Matrix3::zeros()));
    }
    let cell = *system.cell(walker);
    let first = rng.gen_range(0..3usize);
    let mut second = rng.gen_range(0..3usize);
    if second == first {
        second = (second + 1) % 3;
    }

    let ratio = 1.0 + rng.gen_range(-max_step..max_step);
    if ratio.abs() < MIN_STRETCH_RATIO {
        return Ok((false, Matrix3::zeros()));
    }

    let mut delta = Matrix3::zeros();
    delta[(first, first)] = cell.matrix()[(first, first)] * (ratio - 1.0);
    delta[(second, second)] = cell.matrix()[(second, second)] * (1.0 / ratio - 1.0);

    system.apply_cell_delta(walker, &delta)?;
    Ok((shape_acceptable(system, walker, limits), delta))
}

fn shape_acceptable<G: GeometryEngine>(system: &G, walker: WalkerId, limits: &ShapeLimits) -> bool {
    let cell = system.cell(walker);
    cell.min_aspect_ratio() >= limits.aspect_ratio
        && cell.min_angle() >= limits.min_angle_deg.to_radians()
        && !system.has_overlap(walker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::HardSphereSystem;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grown_system() -> (HardSphereSystem, WalkerId) {
        let mut system = HardSphereSystem::new(1, 4, 4).unwrap();
        let id = system.sampled_walkers()[0];
        let mut rng = StdRng::seed_from_u64(19);
        system.grow_walker(id, &mut rng).unwrap();
        (system, id)
    }

    #[test]
    fn stretch_preserves_volume_on_a_diagonal_cell() {
        let (mut system, id) = grown_system();
        let mut rng = StdRng::seed_from_u64(2);
        let limits = ShapeLimits::default();
        let volume_before = system.volume(id);

        for _ in 0..20 {
            let (accepted, delta) =
                stretch_step(&mut system, id, 0.3, &limits, &mut rng).unwrap();
            if !accepted {
                system.apply_cell_delta(id, &(-delta)).unwrap();
            }
            let relative = (system.volume(id) - volume_before).abs() / volume_before;
            assert!(relative < 1e-9);
        }
    }

    #[test]
    fn accepted_shape_moves_respect_the_gates() {
        let (mut system, id) = grown_system();
        let mut rng = StdRng::seed_from_u64(23);
        let limits = ShapeLimits::default();
        let angle_limit = limits.min_angle_deg.to_radians();

        for step in 0..40 {
            let result = if step % 2 == 0 {
                shear_step(&mut system, id, 0.4, &limits, &mut rng).unwrap()
            } else {
                stretch_step(&mut system, id, 0.4, &limits, &mut rng).unwrap()
            };
            let (accepted, delta) = result;
            if accepted {
                let cell = system.cell(id);
                assert!(cell.min_aspect_ratio() >= limits.aspect_ratio);
                assert!(cell.min_angle() >= angle_limit);
                assert!(!system.has_overlap(id));
            } else {
                system.apply_cell_delta(id, &(-delta)).unwrap();
            }
        }
    }

    #[test]
    fn rejected_shear_reverts_to_the_original_cell() {
        let (mut system, id) = grown_system();
        let mut rng = StdRng::seed_from_u64(31);
        let cell_before = *system.cell(id);

        // A tiny aspect-ratio window rejects essentially every perturbation.
        let limits = ShapeLimits {
            aspect_ratio: 1.1,
            min_angle_deg: 55.0,
        };
        let (accepted, delta) = shear_step(&mut system, id, 0.3, &limits, &mut rng).unwrap();
        assert!(!accepted);
        system.apply_cell_delta(id, &(-delta)).unwrap();

        let diff = (system.cell(id).matrix() - cell_before.matrix()).abs().max();
        assert!(diff < 1e-9);
    }
}
