//! Seeded random selection of comparison targets.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::constants::MIN_POOL_SIZE;
use crate::data::Entity;

/// Upper bound on rejection-sampling draws before falling back to a direct
/// pick among eligible entities. Only reachable with a pathological pool.
const MAX_REJECTION_DRAWS: usize = 64;

/// Draws entities uniformly from a pool.
#[derive(Debug, Clone)]
pub struct Selector {
    rng: ChaCha20Rng,
    seed: u64,
}

impl Selector {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            seed,
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    /// Pick an entity whose name differs from `exclude`.
    ///
    /// Returns `None` when the pool holds fewer than two entities, or when
    /// every entity carries the excluded name.
    pub fn pick<'a>(&mut self, pool: &'a [Entity], exclude: Option<&str>) -> Option<&'a Entity> {
        if pool.len() < MIN_POOL_SIZE {
            return None;
        }
        for _ in 0..MAX_REJECTION_DRAWS {
            let candidate = &pool[self.rng.gen_range(0..pool.len())];
            if exclude != Some(candidate.name.as_str()) {
                return Some(candidate);
            }
        }
        let eligible: Vec<&Entity> = pool
            .iter()
            .filter(|entity| exclude != Some(entity.name.as_str()))
            .collect();
        if eligible.is_empty() {
            return None;
        }
        Some(eligible[self.rng.gen_range(0..eligible.len())])
    }

    /// Draw `current`, then `next` excluding `current`'s name.
    pub fn draw_pair<'a>(&mut self, pool: &'a [Entity]) -> Option<(&'a Entity, &'a Entity)> {
        let current = self.pick(pool, None)?;
        let next = self.pick(pool, Some(&current.name))?;
        Some((current, next))
    }
}
