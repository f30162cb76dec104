//! Reproducible train/test partition.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Row indices of the two partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded ChaCha20 stream and hold out ⌈test_fraction·n⌉ rows.
///
/// The same `(n, test_fraction, seed)` always yields the same split.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((test_fraction.clamp(0.0, 1.0) * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(n_test);
    TrainTestSplit {
        train,
        test: indices,
    }
}
