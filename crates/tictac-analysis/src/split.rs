//! Deterministic train / validation / test partitioning.
//!
//! Splits operate on row indices so that every feature representation of a
//! dataset can be gathered from the same partition.

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SplitError {
    #[display("split ratio must be in (0, 1), got {ratio}")]
    InvalidRatio { ratio: f64 },
    #[display("splitting {n} rows with ratio {ratio} leaves an empty partition")]
    EmptyPartition { n: usize, ratio: f64 },
}

/// Fractions carved off by [`three_way_split`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Fraction of all rows held out for testing.
    pub test: f64,
    /// Fraction of the remaining rows held out for validation.
    pub validation: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            test: 0.2,
            validation: 0.2,
        }
    }
}

/// Row indices of the three partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a generator seeded from `seed` and splits it in two.
///
/// The first `ceil(ratio * n)` permuted indices form the held-out part; the
/// rest form the kept part. Returns `(kept, held_out)`, both in permuted order.
pub fn split_indices(n: usize, seed: u64, ratio: f64) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(SplitError::InvalidRatio { ratio });
    }
    let n_held = held_out_len(n, ratio);
    if n_held == 0 || n_held >= n {
        return Err(SplitError::EmptyPartition { n, ratio });
    }
    let mut indices = (0..n).collect::<Vec<_>>();
    let mut rng = Pcg64::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let kept = indices.split_off(n_held);
    Ok((kept, indices))
}

#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn held_out_len(n: usize, ratio: f64) -> usize {
    (ratio * n as f64).ceil() as usize
}

/// Two-stage split: test first, then validation from the remainder.
///
/// Both stages use the same `seed`, so the result depends only on `n`,
/// `seed` and `ratios`.
pub fn three_way_split(n: usize, seed: u64, ratios: SplitRatios) -> Result<Partition, SplitError> {
    let (rest, test) = split_indices(n, seed, ratios.test)?;
    let (train_pos, validation_pos) = split_indices(rest.len(), seed, ratios.validation)?;
    let train = train_pos.into_iter().map(|i| rest[i]).collect();
    let validation = validation_pos.into_iter().map(|i| rest[i]).collect();
    tracing::debug!(n, seed, "three-way split");
    Ok(Partition {
        train,
        validation,
        test,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_sizes_follow_ceiling() {
        let (kept, held) = split_indices(10, 42, 0.2).unwrap();
        assert_eq!(held.len(), 2);
        assert_eq!(kept.len(), 8);
        let (kept, held) = split_indices(11, 42, 0.2).unwrap();
        assert_eq!(held.len(), 3);
        assert_eq!(kept.len(), 8);
    }

    #[test]
    fn test_three_way_partition_is_disjoint_and_complete() {
        let p = three_way_split(100, 7, SplitRatios::default()).unwrap();
        assert_eq!(p.test.len(), 20);
        assert_eq!(p.validation.len(), 16);
        assert_eq!(p.train.len(), 64);
        let all = p
            .train
            .iter()
            .chain(&p.validation)
            .chain(&p.test)
            .copied()
            .collect::<HashSet<_>>();
        assert_eq!(all.len(), 100);
        assert!(all.iter().all(|i| *i < 100));
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = three_way_split(500, 42, SplitRatios::default()).unwrap();
        let b = three_way_split(500, 42, SplitRatios::default()).unwrap();
        assert_eq!(a, b);
        let c = three_way_split(500, 43, SplitRatios::default()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_ratios() {
        assert!(matches!(
            split_indices(10, 0, 0.0),
            Err(SplitError::InvalidRatio { .. })
        ));
        assert!(matches!(
            split_indices(10, 0, 1.0),
            Err(SplitError::InvalidRatio { .. })
        ));
        assert!(matches!(
            split_indices(1, 0, 0.5),
            Err(SplitError::EmptyPartition { .. })
        ));
    }
}
