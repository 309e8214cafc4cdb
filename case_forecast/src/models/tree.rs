//! Exact-greedy regression trees under squared error

/// Growth limits of a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary regression tree; rows with `x[feature] <= threshold` go left
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the given sample rows and candidate features.
    ///
    /// The squared-error reduction of every split is added to
    /// `gains[feature]`.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        samples: &[usize],
        features: &[usize],
        params: TreeParams,
        gains: &mut [f64],
    ) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow(rows, targets, samples.to_vec(), features, params, 0, gains);
        tree
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of leaves
    pub fn leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    #[allow(clippy::too_many_arguments)]
    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[f64],
        samples: Vec<usize>,
        features: &[usize],
        params: TreeParams,
        depth: usize,
        gains: &mut [f64],
    ) -> usize {
        let idx = self.nodes.len();
        let sum: f64 = samples.iter().map(|&s| targets[s]).sum();
        let value = if samples.is_empty() {
            0.0
        } else {
            sum / samples.len() as f64
        };
        self.nodes.push(Node::Leaf { value });

        if depth >= params.max_depth || samples.len() < 2 * params.min_samples_leaf.max(1) {
            return idx;
        }

        let best = match best_split(rows, targets, &samples, features, params.min_samples_leaf.max(1)) {
            Some(best) => best,
            None => return idx,
        };
        gains[best.feature] += best.gain;

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| rows[s][best.feature] <= best.threshold);

        let left = self.grow(rows, targets, left_samples, features, params, depth + 1, gains);
        let right = self.grow(rows, targets, right_samples, features, params, depth + 1, gains);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }
}

fn best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    samples: &[usize],
    features: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&s| targets[s]).sum();
    let parent_score = total * total / n as f64;
    let mut best: Option<BestSplit> = None;

    let mut order = samples.to_vec();
    for &f in features {
        order.sort_by(|&a, &b| rows[a][f].total_cmp(&rows[b][f]).then(a.cmp(&b)));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += targets[order[i]];
            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let here = rows[order[i]][f];
            let next = rows[order[i + 1]][f];
            if here == next {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent_score;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mid = here + (next - here) / 2.0;
                best = Some(BestSplit {
                    feature: f,
                    threshold: if mid < next { mid } else { here },
                    gain,
                });
            }
        }
    }

    best
}
