use crate::core::geometry::GeometryEngine;
use crate::core::models::ids::WalkerId;
use rand::Rng;
use rand::seq::SliceRandom;
use slotmap::SecondaryMap;

/// Bookkeeping over the sampled walker population: cached volumes and the
/// evict-and-clone plumbing of each iteration. Volumes are cached so the
/// arg-max scan does not recompute determinants every step.
pub struct WalkerPool {
    sampled: Vec<WalkerId>,
    volumes: SecondaryMap<WalkerId, f64>,
    scratch: WalkerId,
}

impl WalkerPool {
    pub fn from_system<G: GeometryEngine>(system: &G) -> Self {
        let sampled = system.sampled_walkers().to_vec();
        let mut volumes = SecondaryMap::new();
        for &id in &sampled {
            volumes.insert(id, system.volume(id));
        }
        Self {
            sampled,
            volumes,
            scratch: system.scratch_walker(),
        }
    }

    pub fn len(&self) -> usize {
        self.sampled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sampled.is_empty()
    }

    pub fn sampled(&self) -> &[WalkerId] {
        &self.sampled
    }

    pub fn scratch(&self) -> WalkerId {
        self.scratch
    }

    pub fn volume(&self, id: WalkerId) -> f64 {
        self.volumes[id]
    }

    pub fn set_volume(&mut self, id: WalkerId, volume: f64) {
        self.volumes[id] = volume;
    }

    /// The walker whose cached volume is largest. Ties resolve to the
    /// earliest-created walker.
    pub fn max_volume_walker(&self) -> (WalkerId, f64) {
        let mut best = self.sampled[0];
        let mut best_volume = self.volumes[best];
        for &id in &self.sampled[1..] {
            if self.volumes[id] > best_volume {
                best = id;
                best_volume = self.volumes[id];
            }
        }
        (best, best_volume)
    }

    /// Picks a clone source uniformly from the population. The evicted walker
    /// itself is a legitimate source.
    pub fn choose_source(&self, rng: &mut impl Rng) -> WalkerId {
        *self
            .sampled
            .choose(rng)
            .expect("walker pool must not be empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::HardSphereSystem;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn max_volume_ties_resolve_to_the_first_walker() {
        let system = HardSphereSystem::new(3, 2, 2).unwrap();
        let pool = WalkerPool::from_system(&system);

        // All cells start identical, so the first walker wins the tie.
        let (id, _) = pool.max_volume_walker();
        assert_eq!(id, pool.sampled()[0]);
    }

    #[test]
    fn cached_volume_updates_shift_the_maximum() {
        let system = HardSphereSystem::new(3, 2, 2).unwrap();
        let mut pool = WalkerPool::from_system(&system);

        let target = pool.sampled()[2];
        pool.set_volume(target, pool.volume(target) * 2.0);
        let (id, volume) = pool.max_volume_walker();
        assert_eq!(id, target);
        assert!(volume > pool.volume(pool.sampled()[0]));
    }

    #[test]
    fn clone_source_is_always_a_sampled_walker() {
        let system = HardSphereSystem::new(4, 2, 2).unwrap();
        let pool = WalkerPool::from_system(&system);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let src = pool.choose_source(&mut rng);
            assert!(pool.sampled().contains(&src));
            assert_ne!(src, pool.scratch());
        }
    }
}
