//! End-to-end segmentation: feature selection, standardization, K-Means,
//! quality evaluation and risk-tier stabilization, plus the persisted model
//! used to score new records without refitting.

use crate::config::ClusterConfig;
use crate::data::{attach_assignments, attach_derived_features, select_features};
use crate::error::RiskError;
use crate::features::CLUSTER_FEATURES;
use crate::model::{fit_kmeans, nearest_centroid, silhouette_score};
use crate::scaler::ScalingParams;
use crate::tiers::TierMapping;
use anyhow::Context;
use ndarray::{Array2, ArrayView1};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// Cluster membership of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Model-internal id, no ordering meaning
    pub raw_cluster_id: usize,
    /// 0 = lowest mean severity, k - 1 = highest
    pub risk_tier: usize,
}

/// Profile of one risk tier over the fitted population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub tier: usize,
    pub size: usize,
    /// Fraction of the population in this tier
    pub share: f64,
    pub mean_severity: f64,
    pub mean_payment_ratio: f64,
    pub mean_utilization: f64,
    pub mean_credit_limit: f64,
}

/// Fitted scaling state, centroids and tier mapping.
///
/// Produced by exactly one fit and read-only afterwards; pass it by reference
/// to score any number of later records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    pub feature_names: Vec<String>,
    pub scaling: ScalingParams,
    pub centroids: Array2<f64>,
    pub tiers: TierMapping,
    pub config: ClusterConfig,
}

/// Result of fitting the pipeline on a population
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub model: RiskModel,
    pub assignments: Vec<ClusterAssignment>,
    /// Mean silhouette coefficient, diagnostic only
    pub silhouette: f64,
    pub inertia: f64,
    pub summaries: Vec<TierSummary>,
}

impl Segmentation {
    pub fn risk_tiers(&self) -> Vec<usize> {
        self.assignments.iter().map(|a| a.risk_tier).collect()
    }
}

/// Fit the full pipeline on a record set carrying raw payment history.
///
/// # Arguments
/// * `records` - Cleaned record set with the payment-history columns
/// * `config` - Clustering configuration
///
/// # Returns
/// * The record set with the derived features, `raw_cluster_id` and
///   `risk_tier` columns attached (row order preserved), and the fit result
pub fn segment(records: DataFrame, config: &ClusterConfig) -> crate::Result<(DataFrame, Segmentation)> {
    info!(rows = records.height(), "deriving risk features");
    let records = attach_derived_features(records)?;
    let features = select_features(&records, &CLUSTER_FEATURES)?;

    let segmentation = fit_features(&features, config)?;
    let labeled = attach_assignments(records, &segmentation.assignments)?;
    Ok((labeled, segmentation))
}

/// Fit on raw (unstandardized) features.
///
/// # Arguments
/// * `features` - `(n_rows, 4)` matrix laid out as [`CLUSTER_FEATURES`]
/// * `config` - Clustering configuration
///
/// # Returns
/// * `Segmentation` with the reusable model, per-row assignments and diagnostics
pub fn fit_features(features: &Array2<f64>, config: &ClusterConfig) -> crate::Result<Segmentation> {
    config.validate()?;
    if features.ncols() != CLUSTER_FEATURES.len() {
        return Err(RiskError::DimensionMismatch {
            expected: CLUSTER_FEATURES.len(),
            actual: features.ncols(),
        }
        .into());
    }

    let scaling = ScalingParams::fit(features)?;
    let standardized = scaling.transform(features)?;

    info!(
        clusters = config.n_clusters,
        seed = config.seed,
        attempts = config.attempts,
        "fitting K-Means"
    );
    let kmeans = fit_kmeans(&standardized, config)?;

    let silhouette = silhouette_score(&standardized, &kmeans.labels);
    info!(silhouette, inertia = kmeans.inertia, "clustering quality");

    let severity: Vec<f64> = features.column(0).to_vec();
    let raw_labels = kmeans.labels.to_vec();
    let tiers = TierMapping::from_severity(&severity, &raw_labels, config.n_clusters);
    debug!(?tiers, "risk tiers stabilized");

    let assignments: Vec<ClusterAssignment> = raw_labels
        .iter()
        .map(|&raw| ClusterAssignment {
            raw_cluster_id: raw,
            risk_tier: tiers.tier(raw),
        })
        .collect();

    let risk_tiers: Vec<usize> = assignments.iter().map(|a| a.risk_tier).collect();
    let summaries = summarize_tiers(features, &risk_tiers, tiers.len());

    let model = RiskModel {
        feature_names: CLUSTER_FEATURES.iter().map(|s| s.to_string()).collect(),
        scaling,
        centroids: kmeans.centroids,
        tiers,
        config: *config,
    };

    Ok(Segmentation {
        model,
        assignments,
        silhouette,
        inertia: kmeans.inertia,
        summaries,
    })
}

/// Per-tier size and feature means over raw (unstandardized) features
pub fn summarize_tiers(features: &Array2<f64>, risk_tiers: &[usize], n_tiers: usize) -> Vec<TierSummary> {
    let total = risk_tiers.len();
    let n_cols = features.ncols();
    let mut sizes = vec![0usize; n_tiers];
    let mut sums = vec![vec![0.0; n_cols]; n_tiers];

    for (row, &tier) in features.outer_iter().zip(risk_tiers) {
        if tier >= n_tiers {
            continue;
        }
        sizes[tier] += 1;
        for (sum, value) in sums[tier].iter_mut().zip(row.iter()) {
            *sum += value;
        }
    }

    sizes
        .iter()
        .zip(sums)
        .enumerate()
        .map(|(tier, (&size, sum))| {
            let mean = |col: usize| {
                if size == 0 {
                    0.0
                } else {
                    sum.get(col).copied().unwrap_or(0.0) / size as f64
                }
            };
            TierSummary {
                tier,
                size,
                share: if total == 0 { 0.0 } else { size as f64 / total as f64 },
                mean_severity: mean(0),
                mean_payment_ratio: mean(1),
                mean_utilization: mean(2),
                mean_credit_limit: mean(3),
            }
        })
        .collect()
}

impl RiskModel {
    /// Score one feature vector laid out as `feature_names`
    pub fn score(&self, features: &[f64]) -> crate::Result<ClusterAssignment> {
        let scaled = self.scaling.transform_row(ArrayView1::from(features))?;
        let raw_cluster_id = nearest_centroid(&self.centroids, scaled.view());
        Ok(ClusterAssignment {
            raw_cluster_id,
            risk_tier: self.tiers.tier(raw_cluster_id),
        })
    }

    /// Score every row of a raw feature matrix
    pub fn score_matrix(&self, features: &Array2<f64>) -> crate::Result<Vec<ClusterAssignment>> {
        let scaled = self.scaling.transform(features)?;
        Ok(scaled
            .outer_iter()
            .map(|row| {
                let raw_cluster_id = nearest_centroid(&self.centroids, row);
                ClusterAssignment {
                    raw_cluster_id,
                    risk_tier: self.tiers.tier(raw_cluster_id),
                }
            })
            .collect())
    }

    /// Derive features for a raw record set and attach assignments, no refit
    pub fn score_records(&self, records: DataFrame) -> crate::Result<DataFrame> {
        let records = attach_derived_features(records)?;
        let names: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        let features = select_features(&records, &names)?;
        let assignments = self.score_matrix(&features)?;
        attach_assignments(records, &assignments)
    }

    pub fn n_tiers(&self) -> usize {
        self.tiers.len()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create model file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("failed to write model to {}", path.display()))?;
        info!(path = %path.display(), "model saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open model file {}", path.display()))?;
        let model: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse model from {}", path.display()))?;
        model.check_consistency()?;
        Ok(model)
    }

    fn check_consistency(&self) -> Result<(), RiskError> {
        if self.tiers.is_empty() || self.tiers.len() < self.centroids.nrows() {
            return Err(RiskError::DimensionMismatch {
                expected: self.centroids.nrows(),
                actual: self.tiers.len(),
            });
        }
        let expected = self.feature_names.len();
        for actual in [self.scaling.n_features(), self.centroids.ncols()] {
            if actual != expected {
                return Err(RiskError::DimensionMismatch { expected, actual });
            }
        }
        Ok(())
    }
}
