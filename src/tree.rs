use std::cmp::Ordering;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` tries all of them.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        n_samples: usize,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// CART regression tree using variance reduction.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

struct Candidate {
    feature_idx: usize,
    threshold: f64,
    proxy: f64,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[f64]) {
        let indices: Vec<usize> = (0..labels.len()).collect();
        self.fit_indices(features, labels, &indices);
    }

    /// Fits on the given row indices. Duplicates are allowed, which is how bootstrap samples arrive.
    pub fn fit_indices(&mut self, features: &[Vec<f64>], labels: &[f64], indices: &[usize]) {
        self.n_features = features.first().map(|row| row.len()).unwrap_or(0);
        self.feature_importances = vec![0.0; self.n_features];
        if indices.is_empty() {
            self.root = None;
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut work = indices.to_vec();
        let root = self.build(features, labels, &mut work, 0, &mut rng);
        self.root = Some(root);

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build(
        &mut self,
        features: &[Vec<f64>],
        labels: &[f64],
        indices: &mut [usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = sums(labels, indices);
        let mean = sum / n as f64;
        let sse = (sum_sq - sum * sum / n as f64).max(0.0);

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
            || is_constant(labels, indices)
        {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        }

        let Some(best) = self.best_split(features, labels, indices, rng) else {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        };

        let mid = partition(indices, |i| features[i][best.feature_idx] <= best.threshold);
        let (left_idx, right_idx) = indices.split_at_mut(mid);

        let (l_sum, l_sq) = sums(labels, left_idx);
        let (r_sum, r_sq) = sums(labels, right_idx);
        let l_sse = (l_sq - l_sum * l_sum / left_idx.len() as f64).max(0.0);
        let r_sse = (r_sq - r_sum * r_sum / right_idx.len() as f64).max(0.0);
        self.feature_importances[best.feature_idx] += (sse - l_sse - r_sse).max(0.0);

        let left = self.build(features, labels, left_idx, depth + 1, rng);
        let right = self.build(features, labels, right_idx, depth + 1, rng);

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            n_samples: n,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    // Maximises sum_l^2/n_l + sum_r^2/n_r, which is equivalent to minimising child SSE.
    fn best_split(
        &self,
        features: &[Vec<f64>],
        labels: &[f64],
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<Candidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let total: f64 = indices.iter().map(|&i| labels[i]).sum();
        let parent_proxy = total * total / n as f64;

        let mut feature_order: Vec<usize> = (0..self.n_features).collect();
        feature_order.shuffle(rng);
        let max_features = self
            .config
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features.max(1));
        feature_order.truncate(max_features);

        let mut best: Option<Candidate> = None;
        let mut sorted = indices.to_vec();

        for &feature_idx in &feature_order {
            sorted.sort_by(|&a, &b| {
                features[a][feature_idx]
                    .partial_cmp(&features[b][feature_idx])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += labels[sorted[pos]];
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = features[sorted[pos]][feature_idx];
                let next = features[sorted[pos + 1]][feature_idx];
                if next <= here {
                    continue;
                }

                let right_sum = total - left_sum;
                let proxy =
                    left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if proxy <= parent_proxy {
                    continue;
                }
                if best.as_ref().is_none_or(|b| proxy > b.proxy) {
                    let mut threshold = (here + next) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(Candidate {
                        feature_idx,
                        threshold,
                        proxy,
                    });
                }
            }
        }

        best
    }

    pub fn predict_one(&self, features: &[f64]) -> f64 {
        let Some(mut node) = self.root.as_ref() else {
            return 0.0;
        };
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let x = features.get(*feature_idx).copied().unwrap_or(f64::NAN);
                    node = if x <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

fn sums(labels: &[f64], indices: &[usize]) -> (f64, f64) {
    indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
        let y = labels[i];
        (s + y, sq + y * y)
    })
}

fn is_constant(labels: &[f64], indices: &[usize]) -> bool {
    let first = labels[indices[0]];
    indices.iter().all(|&i| labels[i] == first)
}

// Moves indices satisfying `pred` to the front and returns how many there are.
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for pos in 0..indices.len() {
        if pred(indices[pos]) {
            indices.swap(mid, pos);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let labels: Vec<f64> = (0..40).map(|i| if i < 20 { 10.0 } else { 50.0 }).collect();
        (features, labels)
    }

    #[test]
    fn learns_a_step_function_exactly() {
        let (features, labels) = step_data();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&features, &labels);

        assert_eq!(tree.predict_one(&[3.0, 0.0]), 10.0);
        assert_eq!(tree.predict_one(&[35.0, 2.0]), 50.0);
        let root = tree.root().expect("fitted");
        assert_eq!(root.n_leaves(), 2);
        assert_eq!(root.depth(), 2);
        assert!((tree.feature_importances()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_labels_produce_a_single_leaf() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let labels = vec![7.5; 10];
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&features, &labels);

        assert_eq!(tree.root().map(|r| r.n_leaves()), Some(1));
        assert_eq!(tree.predict_one(&[100.0]), 7.5);
        assert!(tree.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn max_depth_limits_growth() {
        let features: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let mut tree = DecisionTree::new(TreeConfig {
            max_depth: Some(3),
            ..TreeConfig::default()
        });
        tree.fit(&features, &labels);
        assert!(tree.root().map(|r| r.depth()).unwrap_or(0) <= 4);
    }

    #[test]
    fn unfitted_tree_predicts_zero() {
        let tree = DecisionTree::new(TreeConfig::default());
        assert!(!tree.is_fitted());
        assert_eq!(tree.predict_one(&[1.0]), 0.0);
    }

    #[test]
    fn duplicate_indices_act_as_weights() {
        let features = vec![vec![0.0], vec![1.0]];
        let labels = vec![0.0, 10.0];
        let mut tree = DecisionTree::new(TreeConfig {
            min_samples_split: 10,
            ..TreeConfig::default()
        });
        tree.fit_indices(&features, &labels, &[0, 1, 1, 1]);
        assert_eq!(tree.predict_one(&[0.0]), 7.5);
    }

    #[test]
    fn partition_moves_matches_to_the_front() {
        let mut idx = vec![5, 2, 8, 1, 4];
        let mid = partition(&mut idx, |i| i < 4);
        assert_eq!(mid, 2);
        let mut front = idx[..mid].to_vec();
        front.sort_unstable();
        assert_eq!(front, vec![1, 2]);
        assert!(idx[mid..].iter().all(|&i| i >= 4));
    }
}
