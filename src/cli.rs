//! Command-line interface definitions and argument parsing

use crate::config::{ClusterConfig, DEFAULT_ATTEMPTS, DEFAULT_N_CLUSTERS, DEFAULT_SEED};
use crate::features::CLUSTER_FEATURES;
use clap::Parser;

/// Risk-tier segmentation of card customers using K-Means on payment history
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the cleaned record set (CSV)
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Output path for the labeled record set (CSV)
    #[arg(short, long, default_value = "risk_tiers.csv")]
    pub output: String,

    /// Model file written after fitting, read when scoring
    #[arg(short, long, default_value = "risk_model.json")]
    pub model: String,

    /// Number of clusters (risk tiers)
    #[arg(short = 'k', long, default_value_t = DEFAULT_N_CLUSTERS)]
    pub clusters: usize,

    /// Seed for centroid initialization
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Number of independent K-Means seedings
    #[arg(long, default_value_t = DEFAULT_ATTEMPTS)]
    pub attempts: usize,

    /// Score the input with the saved model instead of refitting
    #[arg(short, long)]
    pub score: bool,

    /// Prediction mode: derived features as comma-separated values
    /// Example: --predict "9,0.4,0.8,50000" for severity, payment ratio, utilization, credit limit
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig::new(self.clusters, self.seed, self.attempts)
    }

    /// Parse the predict string into a feature vector.
    /// Expected format: "severity,payment_ratio,utilization,credit_limit"
    pub fn parse_feature_values(&self) -> crate::Result<Option<Vec<f64>>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').collect();
        if parts.len() != CLUSTER_FEATURES.len() {
            anyhow::bail!(
                "Predict values must be in format '{}'",
                CLUSTER_FEATURES.join(",")
            );
        }

        let values = parts
            .iter()
            .zip(CLUSTER_FEATURES.iter())
            .map(|(part, name)| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", name, part))
            })
            .collect::<crate::Result<Vec<f64>>>()?;

        Ok(Some(values))
    }
}
