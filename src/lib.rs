//! RiskTier: behavioral risk segmentation of bank-card customers
//!
//! Derives weighted delinquency features from six months of payment history,
//! clusters customers with K-Means on standardized features and relabels the
//! clusters into risk tiers ordered by mean severity (tier 0 = lowest risk).

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod strategy;
pub mod tiers;

// Re-export public items for easier access
pub use cli::Args;
pub use config::ClusterConfig;
pub use data::{attach_derived_features, load_records, select_features, write_records};
pub use error::RiskError;
pub use features::{CustomerRecord, DerivedFeatures, CLUSTER_FEATURES};
pub use model::{fit_kmeans, silhouette_score, KMeansModel};
pub use pipeline::{fit_features, segment, ClusterAssignment, RiskModel, Segmentation, TierSummary};
pub use scaler::ScalingParams;
pub use strategy::{strategy_for, TierStrategy};
pub use tiers::TierMapping;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
