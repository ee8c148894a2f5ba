//! Semantic relabeling of raw cluster ids into ordered risk tiers.
//!
//! K-Means ids are exchangeable: the same population refit with another seed
//! can swap them freely. Tiers are assigned by ranking clusters on their mean
//! severity score, so tier 0 is always the least delinquent group and tier
//! `k - 1` the most delinquent one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw cluster id -> risk tier lookup fitted on a training population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMapping {
    /// `tier_of_raw[raw_id]` is the risk tier of that raw cluster
    tier_of_raw: Vec<usize>,
    /// Mean severity per raw id; `None` for clusters without members
    mean_severity: Vec<Option<f64>>,
}

impl TierMapping {
    /// Rank raw clusters by ascending mean severity.
    ///
    /// Equal means keep ascending raw-id order. Raw ids in `[0, n_clusters)`
    /// with no member rank after every populated cluster, also by raw id.
    pub fn from_severity(severity: &[f64], raw_labels: &[usize], n_clusters: usize) -> Self {
        let mut totals: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for (&score, &raw) in severity.iter().zip(raw_labels) {
            let entry = totals.entry(raw).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }

        let n_ids = totals
            .keys()
            .next_back()
            .map_or(n_clusters, |&max| n_clusters.max(max + 1));

        let mut mean_severity = vec![None; n_ids];
        for (&raw, &(sum, count)) in &totals {
            mean_severity[raw] = Some(sum / count as f64);
        }

        // stable sort over ids already in ascending order
        let mut order: Vec<usize> = totals.keys().copied().collect();
        order.sort_by(|a, b| {
            let mean_a = mean_severity[*a].unwrap_or(f64::INFINITY);
            let mean_b = mean_severity[*b].unwrap_or(f64::INFINITY);
            mean_a.total_cmp(&mean_b)
        });
        order.extend((0..n_ids).filter(|raw| mean_severity[*raw].is_none()));

        let mut tier_of_raw = vec![0; n_ids];
        for (tier, &raw) in order.iter().enumerate() {
            tier_of_raw[raw] = tier;
        }

        Self {
            tier_of_raw,
            mean_severity,
        }
    }

    /// Tier of a raw cluster id. Ids never seen at fit time map to the riskiest tier.
    pub fn tier(&self, raw_id: usize) -> usize {
        self.tier_of_raw
            .get(raw_id)
            .copied()
            .unwrap_or_else(|| self.tier_of_raw.len().saturating_sub(1))
    }

    pub fn apply(&self, raw_labels: &[usize]) -> Vec<usize> {
        raw_labels.iter().map(|&raw| self.tier(raw)).collect()
    }

    /// Number of tiers
    pub fn len(&self) -> usize {
        self.tier_of_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tier_of_raw.is_empty()
    }

    /// Mean training severity of the cluster mapped to `raw_id`, if it had members
    pub fn mean_severity(&self, raw_id: usize) -> Option<f64> {
        self.mean_severity.get(raw_id).copied().flatten()
    }
}
