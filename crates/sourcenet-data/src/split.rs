//! Group-level dataset partitioning.
//!
//! The split operates on whole source groups, never on individual event
//! rows, so no source leaks across partitions. A fixed seed makes the
//! shuffle reproducible run to run.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use sourcenet_core::SplitRatios;

/// Indices of the groups assigned to each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl DatasetSplit {
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }
}

/// Partition `n_groups` group indices into train/validation/test.
///
/// Train and validation sizes round half-up from the ratios; the
/// remainder goes to test, so the partitions are always exhaustive.
pub fn split_groups(n_groups: usize, ratios: SplitRatios, seed: u64) -> DatasetSplit {
    let mut indices: Vec<usize> = (0..n_groups).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_train = ((n_groups as f64) * ratios.train).round() as usize;
    let n_val = ((n_groups as f64) * ratios.validation).round() as usize;
    let n_train = n_train.min(n_groups);
    let n_val = n_val.min(n_groups - n_train);

    let test = indices.split_off(n_train + n_val);
    let validation = indices.split_off(n_train);
    let train = indices;

    let split = DatasetSplit {
        train,
        validation,
        test,
    };

    let pct = |len: usize| 100.0 * len as f64 / n_groups.max(1) as f64;
    tracing::info!(
        train = split.train.len(),
        train_pct = pct(split.train.len()),
        validation = split.validation.len(),
        validation_pct = pct(split.validation.len()),
        test = split.test.len(),
        test_pct = pct(split.test.len()),
        "dataset split"
    );

    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const RATIOS: SplitRatios = SplitRatios {
        train: 0.70,
        validation: 0.15,
        test: 0.15,
    };

    #[test]
    fn same_seed_gives_same_split() {
        let a = split_groups(100, RATIOS, 7);
        let b = split_groups(100, RATIOS, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_gives_different_split() {
        let a = split_groups(100, RATIOS, 7);
        let b = split_groups(100, RATIOS, 8);
        assert_ne!(a, b);
    }

    #[test]
    fn partitions_are_disjoint_and_exhaustive() {
        for n in [10, 37, 100, 1000] {
            let split = split_groups(n, RATIOS, 1);
            let mut seen = HashSet::new();
            for idx in split
                .train
                .iter()
                .chain(&split.validation)
                .chain(&split.test)
            {
                assert!(seen.insert(*idx), "group {} appears twice", idx);
            }
            assert_eq!(seen.len(), n);
        }
    }

    #[test]
    fn proportions_match_within_rounding() {
        for n in [10, 50, 100, 999] {
            let split = split_groups(n, RATIOS, 3);
            let train_frac = split.train.len() as f64 / n as f64;
            assert!(
                (train_frac - 0.70).abs() <= 1.0 / n as f64 + 1e-9,
                "train fraction {} off for n={}",
                train_frac,
                n
            );
        }
    }

    #[test]
    fn two_groups_degenerate_rounding() {
        let split = split_groups(2, RATIOS, 42);
        assert_eq!(split.train.len(), 1);
        assert_eq!(split.validation.len(), 0);
        assert_eq!(split.test.len(), 1);
    }
}
