use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a seeded generator; the first `ceil(n * test_fraction)` indices become the
/// test partition. At least one row is kept on each side whenever `n >= 2`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut n_test = (n as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    if n >= 2 {
        n_test = n_test.clamp(1, n - 1);
    } else {
        n_test = 0;
    }

    let train = order.split_off(n_test);
    TrainTestSplit { train, test: order }
}

pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn eighty_twenty_partition_covers_every_row_once() {
        let split = train_test_split(101, 0.2, 42);
        assert_eq!(split.test.len(), 21);
        assert_eq!(split.train.len(), 80);

        let all: HashSet<usize> = split.train.iter().chain(&split.test).copied().collect();
        assert_eq!(all.len(), 101);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(
            train_test_split(50, 0.2, 42).test,
            train_test_split(50, 0.2, 43).test
        );
    }

    #[test]
    fn tiny_inputs_stay_usable() {
        let one = train_test_split(1, 0.2, 42);
        assert_eq!(one.train.len(), 1);
        assert!(one.test.is_empty());

        let two = train_test_split(2, 0.2, 42);
        assert_eq!((two.train.len(), two.test.len()), (1, 1));
    }
}
