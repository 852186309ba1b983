// huntwarden/src/anomaly/cluster.rs
//
// Density-based clustering (DBSCAN) of player feature vectors.
//
// Bot farms show up as tight groups of near-identical behaviour. Features
// are z-score standardised per column first so seconds-scale and
// ratio-scale fields weigh the same. Core points (≥ min_samples neighbours
// within eps, self included) are merged with union-find; border points join
// the cluster of their first core neighbour; everything else is noise.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

use crate::geo::{mean, std_dev};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Cluster(usize),
    Noise,
}

/// Per-column z-scores. Constant columns map to 0.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = rows.first() else { return Vec::new() };
    let dims = first.len();

    let stats: Vec<(f64, f64)> = (0..dims)
        .map(|d| {
            let col: Vec<f64> = rows.iter().map(|r| r[d]).collect();
            (mean(&col), std_dev(&col))
        })
        .collect();

    rows.iter()
        .map(|r| {
            r.iter().zip(&stats)
                .map(|(v, (m, s))| if *s > 0.0 { (v - m) / s } else { 0.0 })
                .collect()
        })
        .collect()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Label each row. Cluster ids are dense and ordered by first member.
pub fn dbscan(rows: &[Vec<f64>], eps: f64, min_samples: usize) -> Vec<Label> {
    let n = rows.len();
    let neighbours: Vec<Vec<usize>> = (0..n)
        .map(|i| (0..n).filter(|&j| euclidean(&rows[i], &rows[j]) <= eps).collect())
        .collect();
    let is_core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut uf = UnionFind::<usize>::new(n);
    for i in (0..n).filter(|&i| is_core[i]) {
        for &j in neighbours[i].iter().filter(|&&j| is_core[j]) {
            uf.union(i, j);
        }
    }

    let mut ids: HashMap<usize, usize> = HashMap::new();
    let mut labels = vec![Label::Noise; n];

    for i in 0..n {
        let root = if is_core[i] {
            Some(uf.find(i))
        } else {
            neighbours[i].iter().find(|&&j| is_core[j]).map(|&j| uf.find(j))
        };
        if let Some(root) = root {
            let next = ids.len();
            let id = *ids.entry(root).or_insert(next);
            labels[i] = Label::Cluster(id);
        }
    }
    labels
}
