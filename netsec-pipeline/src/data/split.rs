//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{Fault, Result, ResultExt};

/// Row indices for the two partitions, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of test rows for `n` records: `round(n * ratio)` kept inside `[1, n - 1]`.
pub fn test_size(n: usize, ratio: f64) -> Result<usize> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(Fault::dataset(format!(
            "test ratio must be within (0, 1), got {ratio}"
        )))
        .at("split::test_size");
    }
    if n < 2 {
        return Err(Fault::dataset(format!(
            "need at least 2 records to split, got {n}"
        )))
        .at("split::test_size");
    }
    let raw = (n as f64 * ratio).round() as usize;
    Ok(raw.clamp(1, n - 1))
}

/// Shuffle `0..n` with a ChaCha8 stream seeded by `seed` and cut off the test rows.
///
/// The same `(n, ratio, seed)` always yields the same partition; every index
/// lands in exactly one side.
pub fn train_test_split(n: usize, ratio: f64, seed: u64) -> Result<SplitIndices> {
    let n_test = test_size(n, ratio).at("split::train_test_split")?;
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}
