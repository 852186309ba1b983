// huntwarden/src/anomaly/forest.rs
//
// Isolation forest (Liu, Ting & Zhou 2008).
//
// Anomalies are few and different, so random axis-aligned splits isolate them
// in fewer steps. Score s(x) = 2^(−E[h(x)] / c(ψ)) where h is the path length
// and c(ψ) the expected path length of an unsuccessful BST search over ψ
// samples. s → 1 for anomalies, ≈ 0.5 or below for inliers.
//
// Trees are grown on sub-samples of ψ points up to height ⌈log2 ψ⌉. All
// randomness comes from the caller's seeded RNG so a given seed reproduces
// the same model across restarts.

use rand::seq::index::sample;
use rand::Rng;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a BST of `n` nodes.
pub fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2     => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

enum Node {
    Leaf { size: usize },
    Split { feature: usize, threshold: f64, left: Box<Node>, right: Box<Node> },
}

impl Node {
    fn grow<R: Rng>(rows: &[&[f64]], depth: usize, limit: usize, rng: &mut R) -> Node {
        if depth >= limit || rows.len() <= 1 {
            return Node::Leaf { size: rows.len() };
        }

        // Only features that still vary can split
        let dims = rows[0].len();
        let mut candidates: Vec<(usize, f64, f64)> = Vec::with_capacity(dims);
        for f in 0..dims {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r[f]), hi.max(r[f]))
            });
            if hi > lo { candidates.push((f, lo, hi)); }
        }
        if candidates.is_empty() {
            return Node::Leaf { size: rows.len() };
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);
        let (l, r): (Vec<&[f64]>, Vec<&[f64]>) =
            rows.iter().copied().partition(|row| row[feature] < threshold);

        Node::Split {
            feature,
            threshold,
            left:  Box::new(Node::grow(&l, depth + 1, limit, rng)),
            right: Box::new(Node::grow(&r, depth + 1, limit, rng)),
        }
    }

    fn path_length(&self, x: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + c_factor(*size),
            Node::Split { feature, threshold, left, right } => {
                if x[*feature] < *threshold {
                    left.path_length(x, depth + 1)
                } else {
                    right.path_length(x, depth + 1)
                }
            }
        }
    }
}

pub struct IsolationForest {
    trees:       Vec<Node>,
    sample_size: usize,
    dims:        usize,
}

impl IsolationForest {
    /// Fit on `data` (rows of equal width). Returns `None` for an empty set.
    pub fn fit<R: Rng>(data: &[Vec<f64>], n_trees: usize, sample_size: usize, rng: &mut R) -> Option<Self> {
        let first = data.first()?;
        let dims  = first.len();
        let psi   = sample_size.min(data.len()).max(1);
        let limit = (psi as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..n_trees.max(1))
            .map(|_| {
                let rows: Vec<&[f64]> = sample(rng, data.len(), psi)
                    .into_iter()
                    .map(|i| data[i].as_slice())
                    .collect();
                Node::grow(&rows, 0, limit, rng)
            })
            .collect();

        Some(Self { trees, sample_size: psi, dims })
    }

    pub fn dims(&self) -> usize { self.dims }

    /// Anomaly score in (0, 1]; higher is more isolated.
    pub fn score(&self, x: &[f64]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x, 0)).sum::<f64>()
            / self.trees.len() as f64;
        let c = c_factor(self.sample_size);
        if c == 0.0 { return 0.5; }
        2f64.powf(-mean_path / c)
    }
}
