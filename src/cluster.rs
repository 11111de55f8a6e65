//! Centroid-based partitioning of the normalized feature space.
//!
//! Seeded k-means with k-means++ initialization. The same input and seed
//! always produce the same assignment; adding tracks means a full refit.

use crate::track::{FeatureVector, FEATURE_COUNT};
use anyhow::{bail, Result};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Clustering parameters, fixed for the lifetime of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Convergence threshold relative to the mean column variance of the data.
    pub tolerance: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 6,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// Result of a single k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    centroids: Vec<FeatureVector>,
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

impl ClusterModel {
    /// Fit centroids over `data` and assign every row a cluster id in `0..k`.
    ///
    /// # Errors
    ///
    /// Fails when `k` is zero or larger than the number of rows.
    pub fn fit_predict(data: &[FeatureVector], params: &KMeansParams) -> Result<Self> {
        if params.k == 0 {
            bail!("Cluster count must be at least 1");
        }
        if data.len() < params.k {
            bail!(
                "Cannot partition {} tracks into {} clusters, the dataset is too small",
                data.len(),
                params.k
            );
        }

        let threshold = params.tolerance * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut centroids = kmeans_plus_plus(data, params.k, &mut rng);
        let mut labels = assign(data, &centroids);
        let mut iterations = 0;

        while iterations < params.max_iterations {
            iterations += 1;
            let updated = update_centroids(data, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;
            labels = assign(data, &centroids);
            trace!("k-means iteration {iterations}: centroid shift {shift:.6}");

            if shift <= threshold {
                debug!("k-means converged after {iterations} iterations");
                break;
            }
        }

        let inertia = data
            .iter()
            .zip(&labels)
            .map(|(row, &label)| squared_distance(row, &centroids[label]))
            .sum();
        info!(
            "Clustered {} tracks into {} groups ({} iterations, inertia {:.3})",
            data.len(),
            params.k,
            iterations,
            inertia
        );

        Ok(Self { centroids, labels, inertia, iterations })
    }

    /// Cluster id of every fitted row, in input order.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn centroids(&self) -> &[FeatureVector] {
        &self.centroids
    }

    /// Sum of squared distances from each row to its centroid.
    #[must_use]
    pub const fn inertia(&self) -> f64 {
        self.inertia
    }

    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Nearest fitted centroid for an already normalized vector.
    #[must_use]
    pub fn predict(&self, vector: &FeatureVector) -> usize {
        nearest(vector, &self.centroids).0
    }
}

/// D²-weighted seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn kmeans_plus_plus(data: &[FeatureVector], k: usize, rng: &mut StdRng) -> Vec<FeatureVector> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())]);

    let mut closest: Vec<f64> = data
        .iter()
        .map(|row| squared_distance(row, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut running = 0.0;
            closest
                .iter()
                .position(|&d| {
                    running += d;
                    running > target
                })
                .unwrap_or(data.len() - 1)
        } else {
            // Every row already coincides with a centroid.
            rng.gen_range(0..data.len())
        };

        let centroid = data[chosen];
        for (distance, row) in closest.iter_mut().zip(data) {
            *distance = distance.min(squared_distance(row, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

fn assign(data: &[FeatureVector], centroids: &[FeatureVector]) -> Vec<usize> {
    data.par_iter().map(|row| nearest(row, centroids).0).collect()
}

fn update_centroids(
    data: &[FeatureVector],
    labels: &[usize],
    previous: &[FeatureVector],
) -> Vec<FeatureVector> {
    let k = previous.len();
    let mut sums = vec![[0.0; FEATURE_COUNT]; k];
    let mut counts = vec![0usize; k];

    for (row, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(row) {
            *sum += value;
        }
    }

    let mut centroids: Vec<FeatureVector> = sums
        .into_iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), old)| {
            if count == 0 {
                *old
            } else {
                #[allow(clippy::cast_precision_loss)]
                let n = count as f64;
                sum.map(|value| value / n)
            }
        })
        .collect();

    // Reseat empty clusters on the rows farthest from their current centroid.
    let empty: Vec<usize> = (0..k).filter(|&cluster| counts[cluster] == 0).collect();
    if !empty.is_empty() {
        let mut by_distance: Vec<(usize, f64)> = data
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (row, &label))| (index, squared_distance(row, &previous[label])))
            .collect();
        by_distance.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        for (cluster, (index, _)) in empty.into_iter().zip(by_distance) {
            debug!("Reseating empty cluster {cluster} on row {index}");
            centroids[cluster] = data[index];
        }
    }

    centroids
}

/// Index of and squared distance to the closest centroid. Ties go to the lower index.
fn nearest(row: &FeatureVector, centroids: &[FeatureVector]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(index, centroid)| (index, squared_distance(row, centroid)))
        .fold((0, f64::INFINITY), |best, candidate| {
            if candidate.1 < best.1 {
                candidate
            } else {
                best
            }
        })
}

#[inline]
fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn mean_variance(data: &[FeatureVector]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = data.len() as f64;
    let total: f64 = (0..FEATURE_COUNT)
        .map(|column| {
            let mean = data.iter().map(|row| row[column]).sum::<f64>() / n;
            data.iter().map(|row| (row[column] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let columns = FEATURE_COUNT as f64;
    total / columns
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three tight, well separated blobs.
    fn blobs() -> Vec<FeatureVector> {
        let centers = [
            [-5.0, -5.0, -5.0, -5.0, -5.0],
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [5.0, 5.0, 5.0, 5.0, 5.0],
        ];
        centers
            .iter()
            .flat_map(|center| {
                (0..10_i32).map(move |i| {
                    let jitter = f64::from(i) * 0.01;
                    center.map(|value| value + jitter)
                })
            })
            .collect()
    }

    fn params(k: usize) -> KMeansParams {
        KMeansParams { k, ..KMeansParams::default() }
    }

    #[test]
    fn test_every_row_gets_a_cluster_in_range() {
        let data = blobs();
        let model = ClusterModel::fit_predict(&data, &params(6)).unwrap();
        assert_eq!(model.labels().len(), data.len());
        assert!(model.labels().iter().all(|&label| label < 6));
        assert_eq!(model.centroids().len(), 6);
    }

    #[test]
    fn test_separated_blobs_are_recovered() {
        let data = blobs();
        let model = ClusterModel::fit_predict(&data, &params(3)).unwrap();
        let labels = model.labels();

        for blob in 0..3 {
            let first = labels[blob * 10];
            assert!(labels[blob * 10..blob * 10 + 10].iter().all(|&label| label == first));
        }
        assert_ne!(labels[0], labels[10]);
        assert_ne!(labels[10], labels[20]);
        assert_ne!(labels[0], labels[20]);
        assert!(model.inertia() < 1.0);
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let data = blobs();
        let first = ClusterModel::fit_predict(&data, &params(6)).unwrap();
        let second = ClusterModel::fit_predict(&data, &params(6)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_predict_matches_fitted_labels() {
        let data = blobs();
        let model = ClusterModel::fit_predict(&data, &params(3)).unwrap();
        for (row, &label) in data.iter().zip(model.labels()) {
            assert_eq!(model.predict(row), label);
        }
    }

    #[test]
    fn test_duplicate_rows_do_not_break_seeding() {
        let data = vec![[1.0; FEATURE_COUNT]; 8];
        let model = ClusterModel::fit_predict(&data, &params(3)).unwrap();
        assert_eq!(model.labels().len(), 8);
        assert_eq!(model.inertia(), 0.0);
    }

    #[test]
    fn test_rejects_invalid_cluster_counts() {
        let data = blobs();
        assert!(ClusterModel::fit_predict(&data, &params(0)).is_err());
        assert!(ClusterModel::fit_predict(&data[..4], &params(6)).is_err());
    }

    #[test]
    fn test_iteration_budget_respected() {
        let data = blobs();
        let budget = KMeansParams { max_iterations: 1, ..params(6) };
        let model = ClusterModel::fit_predict(&data, &budget).unwrap();
        assert!(model.iterations() <= 1);
    }
}
