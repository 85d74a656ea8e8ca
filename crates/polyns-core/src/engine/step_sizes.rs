use super::moves::MoveKind;
use serde::{Deserialize, Serialize};

/// Multiplicative factor applied by the step-size controller.
pub const EQUIL_FACTOR: f64 = 2.0;

const FLOOR: f64 = 1e-10;
const FLOOR_SHAPE: f64 = 1e-5;
const CEILING: f64 = 10.0;

/// The six maximum step sizes, one per move type. Mutated only by the
/// step-size controller; read by the move engine.
///
/// Each size is floor-clamped so feedback can never collapse it to zero, and
/// the non-shape sizes are ceiling-clamped at 10.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveStepSizes {
    pub volume: f64,
    pub translate: f64,
    pub rotate: f64,
    pub dihedral: f64,
    pub shear: f64,
    pub stretch: f64,
}

impl Default for MoveStepSizes {
    fn default() -> Self {
        Self {
            volume: 0.5,
            translate: 0.5,
            rotate: 0.5,
            dihedral: 0.5,
            shear: 0.5,
            stretch: 0.5,
        }
    }
}

impl MoveStepSizes {
    pub fn get(&self, kind: MoveKind) -> f64 {
        match kind {
            MoveKind::Volume => self.volume,
            MoveKind::Translate => self.translate,
            MoveKind::Rotate => self.rotate,
            MoveKind::Dihedral => self.dihedral,
            MoveKind::Shear => self.shear,
            MoveKind::Stretch => self.stretch,
        }
    }

    fn get_mut(&mut self, kind: MoveKind) -> &mut f64 {
        match kind {
            MoveKind::Volume => &mut self.volume,
            MoveKind::Translate => &mut self.translate,
            MoveKind::Rotate => &mut self.rotate,
            MoveKind::Dihedral => &mut self.dihedral,
            MoveKind::Shear => &mut self.shear,
            MoveKind::Stretch => &mut self.stretch,
        }
    }

    fn floor(kind: MoveKind) -> f64 {
        if kind.is_shape_move() { FLOOR_SHAPE } else { FLOOR }
    }

    fn ceiling(kind: MoveKind) -> Option<f64> {
        if kind.is_shape_move() {
            None
        } else {
            Some(CEILING)
        }
    }

    /// Doubles the step size for `kind`, honoring its ceiling.
    pub fn scale_up(&mut self, kind: MoveKind) {
        let size = self.get_mut(kind);
        *size *= EQUIL_FACTOR;
        if let Some(ceiling) = Self::ceiling(kind) {
            *size = size.min(ceiling);
        }
    }

    /// Halves the step size for `kind`, honoring its floor.
    pub fn scale_down(&mut self, kind: MoveKind) {
        let size = self.get_mut(kind);
        *size = (*size / EQUIL_FACTOR).max(Self::floor(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_halving_pins_at_the_floor() {
        let mut steps = MoveStepSizes::default();
        for _ in 0..200 {
            steps.scale_down(MoveKind::Translate);
            steps.scale_down(MoveKind::Shear);
        }
        assert_eq!(steps.translate, 1e-10);
        assert_eq!(steps.shear, 1e-5);
        assert!(steps.translate > 0.0);
    }

    #[test]
    fn non_shape_moves_are_capped_at_the_ceiling() {
        let mut steps = MoveStepSizes::default();
        for _ in 0..10 {
            steps.scale_up(MoveKind::Volume);
        }
        assert_eq!(steps.volume, 10.0);
    }

    #[test]
    fn shape_moves_have_no_ceiling() {
        let mut steps = MoveStepSizes::default();
        for _ in 0..10 {
            steps.scale_up(MoveKind::Stretch);
        }
        assert!(steps.stretch > 10.0);
    }

    #[test]
    fn scaling_is_per_kind() {
        let mut steps = MoveStepSizes::default();
        steps.scale_up(MoveKind::Rotate);
        assert_eq!(steps.rotate, 1.0);
        assert_eq!(steps.dihedral, 0.5);
    }
}
