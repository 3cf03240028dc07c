//! Seed management for reproducible runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derives independent, stable per-component seeds from one global seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedManager {
    pub global_seed: u64,
}

impl SeedManager {
    pub fn new(global_seed: u64) -> Self {
        Self { global_seed }
    }

    /// Same `(global_seed, component)` always gives the same seed, on every platform.
    pub fn seed_for(&self, component: &str) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.global_seed.to_le_bytes());
        hasher.update(component.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_seeds_are_stable_and_distinct() {
        let seeds = SeedManager::new(42);
        assert_eq!(seeds.seed_for("split"), SeedManager::new(42).seed_for("split"));
        assert_ne!(seeds.seed_for("split"), seeds.seed_for("sgd"));
        assert_ne!(seeds.seed_for("split"), SeedManager::new(43).seed_for("split"));
    }
}
