//! Clustering configuration

use crate::error::RiskError;
use serde::{Deserialize, Serialize};

/// Default number of risk tiers
pub const DEFAULT_N_CLUSTERS: usize = 4;
/// Default seed for the centroid seedings
pub const DEFAULT_SEED: u64 = 42;
/// Default number of independent K-Means restarts
pub const DEFAULT_ATTEMPTS: usize = 10;

/// Options recognized by the clustering stage.
///
/// Persisted inside the fitted model so a scored record can always be traced
/// back to the parameters that produced its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of clusters (and therefore risk tiers)
    #[serde(default = "default_n_clusters")]
    pub n_clusters: usize,
    /// Seed for reproducible centroid initialization
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of independent seedings; the lowest-inertia run wins
    #[serde(default = "default_attempts")]
    pub attempts: usize,
}

fn default_n_clusters() -> usize {
    DEFAULT_N_CLUSTERS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_attempts() -> usize {
    DEFAULT_ATTEMPTS
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_clusters: DEFAULT_N_CLUSTERS,
            seed: DEFAULT_SEED,
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl ClusterConfig {
    pub fn new(n_clusters: usize, seed: u64, attempts: usize) -> Self {
        Self {
            n_clusters,
            seed,
            attempts,
        }
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        if self.n_clusters == 0 {
            return Err(RiskError::InvalidConfig(
                "number of clusters must be at least 1".to_string(),
            ));
        }
        if self.attempts == 0 {
            return Err(RiskError::InvalidConfig(
                "number of attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
