//! Regression tree
//!
//! CART-style variance-reduction tree shared by the bagged forest and the
//! boosting ensemble. Split search scans sorted feature values with prefix
//! sums, so each candidate feature costs O(n log n).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_leaf: usize,
    /// Features considered per split; all when None
    pub feature_subsample: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Grow a tree over the given row indices.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.first().map_or(0, |row| row.len());
        let root = grow(x, y, rows, n_features, params, rng, 0);
        RegressionTree { root }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn grow(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    n_features: usize,
    params: &TreeParams,
    rng: &mut StdRng,
    depth: usize,
) -> Node {
    let leaf = Node::Leaf {
        value: mean(y, rows),
    };
    if depth >= params.max_depth || rows.len() < 2 * params.min_leaf {
        return leaf;
    }

    // Candidate features, optionally subsampled (bagging-style)
    let mut features: Vec<usize> = (0..n_features).collect();
    if let Some(k) = params.feature_subsample {
        features.shuffle(rng);
        features.truncate(k.max(1).min(n_features));
    }

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, sse)
    for &feature in &features {
        if let Some((threshold, sse)) = best_split(x, y, rows, feature, params.min_leaf) {
            if best.map_or(true, |(_, _, best_sse)| sse < best_sse) {
                best = Some((feature, threshold, sse));
            }
        }
    }

    let Some((feature, threshold, _)) = best else {
        return leaf;
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&r| x[r][feature] <= threshold);
    if left_rows.is_empty() || right_rows.is_empty() {
        return leaf;
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(x, y, &left_rows, n_features, params, rng, depth + 1)),
        right: Box::new(grow(x, y, &right_rows, n_features, params, rng, depth + 1)),
    }
}

/// Best threshold for one feature: the split minimizing the summed child
/// SSE, scanned over sorted values with prefix sums.
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    feature: usize,
    min_leaf: usize,
) -> Option<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&r| (x[r][feature], y[r])).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pairs.len();
    let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
    let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();

    let mut left_sum = 0.0;
    let mut left_sq = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for i in 1..n {
        left_sum += pairs[i - 1].1;
        left_sq += pairs[i - 1].1 * pairs[i - 1].1;

        // Can only split between distinct values
        if pairs[i].0 <= pairs[i - 1].0 {
            continue;
        }
        if i < min_leaf || n - i < min_leaf {
            continue;
        }

        let right_sum = total_sum - left_sum;
        let right_sq = total_sq - left_sq;
        let n_left = i as f64;
        let n_right = (n - i) as f64;
        let sse = (left_sq - left_sum * left_sum / n_left)
            + (right_sq - right_sum * right_sum / n_right);

        if best.map_or(true, |(_, best_sse)| sse < best_sse) {
            let threshold = (pairs[i - 1].0 + pairs[i].0) / 2.0;
            best = Some((threshold, sse));
        }
    }

    best
}

fn mean(y: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64
}
