//! K-Means clustering engine and partition quality metrics

use crate::config::ClusterConfig;
use crate::error::RiskError;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Lloyd iteration cap per seeding
pub const MAX_ITERATIONS: u64 = 300;
/// Centroid movement below which a seeding is considered converged
pub const TOLERANCE: f64 = 1e-4;

/// Fitted partition of a standardized feature matrix
#[derive(Debug, Clone)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Raw cluster id per training row, in `[0, n_clusters)`
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
}

impl KMeansModel {
    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Raw ids that received no training rows
    pub fn empty_clusters(&self) -> Vec<usize> {
        self.cluster_sizes()
            .iter()
            .enumerate()
            .filter(|(_, &size)| size == 0)
            .map(|(id, _)| id)
            .collect()
    }
}

/// Fit K-Means on standardized features.
///
/// Runs `config.attempts` independent seedings from a generator seeded with
/// `config.seed` and keeps the lowest-inertia result, so identical input and
/// configuration always yield identical labels. Raw ids carry no ordering.
///
/// # Arguments
/// * `features` - Standardized feature matrix (n_samples, n_features)
/// * `config` - Number of clusters, seed and number of seedings
///
/// # Returns
/// * Fitted `KMeansModel`; clusters left without members are logged, not corrected
pub fn fit_kmeans(features: &Array2<f64>, config: &ClusterConfig) -> crate::Result<KMeansModel> {
    config.validate()?;

    let n_samples = features.nrows();
    let n_clusters = config.n_clusters;
    if n_samples == 0 {
        return Err(RiskError::EmptyRecordSet.into());
    }
    if n_samples < n_clusters {
        return Err(RiskError::TooFewSamples {
            samples: n_samples,
            clusters: n_clusters,
        }
        .into());
    }

    let distinct = count_distinct_rows(features);
    if distinct < n_clusters {
        warn!(
            distinct_points = distinct,
            clusters = n_clusters,
            "fewer distinct points than clusters, partition will be degenerate"
        );
    }

    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(features.clone(), targets);

    let rng = Xoshiro256Plus::seed_from_u64(config.seed);
    let fitted = KMeans::params_with(n_clusters, rng, L2Dist)
        .n_runs(config.attempts)
        .max_n_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .fit(&dataset)?;

    let centroids = fitted.centroids().clone();
    let labels: Array1<usize> = features
        .outer_iter()
        .map(|row| nearest_centroid(&centroids, row))
        .collect();
    let inertia = compute_inertia(features, &labels, &centroids);

    let model = KMeansModel {
        n_clusters,
        labels,
        centroids,
        inertia,
    };

    let empty = model.empty_clusters();
    if !empty.is_empty() {
        warn!(?empty, "K-Means produced empty clusters");
    }
    debug!(inertia = model.inertia, sizes = ?model.cluster_sizes(), "K-Means fitted");

    Ok(model)
}

/// Index of the nearest centroid by Euclidean distance; ties go to the lower index
pub fn nearest_centroid(centroids: &Array2<f64>, point: ArrayView1<f64>) -> usize {
    let mut min_distance = f64::INFINITY;
    let mut closest_cluster = 0;

    for (cluster_idx, centroid) in centroids.outer_iter().enumerate() {
        let distance = squared_distance(&point, &centroid);
        if distance < min_distance {
            min_distance = distance;
            closest_cluster = cluster_idx;
        }
    }

    closest_cluster
}

/// Mean silhouette coefficient over all points.
///
/// Points alone in their cluster score 0. Returns 0 when fewer than two
/// clusters are populated, where the coefficient is undefined.
pub fn silhouette_score(features: &Array2<f64>, labels: &Array1<usize>) -> f64 {
    let n_samples = features.nrows().min(labels.len());
    let n_labels = labels.iter().max().map_or(0, |&max| max + 1);

    let mut cluster_counts = vec![0usize; n_labels];
    for &label in labels.iter().take(n_samples) {
        cluster_counts[label] += 1;
    }
    let populated = cluster_counts.iter().filter(|&&c| c > 0).count();
    if n_samples < 2 || populated < 2 {
        debug!(populated, "silhouette undefined for fewer than two populated clusters");
        return 0.0;
    }

    let mut silhouette_sum = 0.0;
    let mut distance_sums = vec![0.0; n_labels];

    for i in 0..n_samples {
        let point = features.row(i);
        let cluster_label = labels[i];

        distance_sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n_samples {
            if i != j {
                distance_sums[labels[j]] += euclidean_distance(&point, &features.row(j));
            }
        }

        let own_count = cluster_counts[cluster_label];
        if own_count <= 1 {
            continue;
        }

        // a(i): mean distance to the rest of its own cluster
        let a_i = distance_sums[cluster_label] / (own_count - 1) as f64;

        // b(i): smallest mean distance to any other populated cluster
        let b_i = distance_sums
            .iter()
            .zip(cluster_counts.iter())
            .enumerate()
            .filter(|&(label, (_, &count))| label != cluster_label && count > 0)
            .map(|(_, (&sum, &count))| sum / count as f64)
            .fold(f64::INFINITY, f64::min);

        let denominator = a_i.max(b_i);
        if denominator > 0.0 {
            silhouette_sum += (b_i - a_i) / denominator;
        }
    }

    silhouette_sum / n_samples as f64
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    labels
        .iter()
        .zip(features.outer_iter())
        .filter(|(&cluster, _)| cluster < centroids.nrows())
        .map(|(&cluster, point)| squared_distance(&point, &centroids.row(cluster)))
        .sum()
}

fn count_distinct_rows(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        .map(|row| row.iter().map(|x| x.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

fn squared_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
}

/// Calculate Euclidean distance between two points
fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    squared_distance(point1, point2).sqrt()
}
