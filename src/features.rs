//! Risk feature derivation from raw payment history.
//!
//! Every function here is a pure function of a single customer's history so it
//! can be checked against literal values without building a record set.

use serde::{Deserialize, Serialize};

/// Number of monthly observations per customer
pub const MONTHS: usize = 6;

/// Upper clip for limit utilization; higher ratios are treated as data artifacts
pub const MAX_LIMIT_UTILIZATION: f64 = 1.5;
/// Upper clip for the 6-month payment ratio
pub const MAX_PAYMENT_RATIO: f64 = 1.0;

/// Monthly delay-code columns, most recent first
pub const PAYMENT_STATUS_COLUMNS: [&str; MONTHS] = [
    "payment_status_1",
    "payment_status_2",
    "payment_status_3",
    "payment_status_4",
    "payment_status_5",
    "payment_status_6",
];

/// Monthly billed amount columns, most recent first
pub const BILLING_AMOUNT_COLUMNS: [&str; MONTHS] = [
    "billing_amount_1",
    "billing_amount_2",
    "billing_amount_3",
    "billing_amount_4",
    "billing_amount_5",
    "billing_amount_6",
];

/// Monthly paid amount columns, most recent first
pub const PAYMENT_AMOUNT_COLUMNS: [&str; MONTHS] = [
    "payment_amount_1",
    "payment_amount_2",
    "payment_amount_3",
    "payment_amount_4",
    "payment_amount_5",
    "payment_amount_6",
];

pub const CREDIT_LIMIT: &str = "credit_limit";

pub const SEVERITY_SCORE: &str = "severity_score";
pub const DELAY_FREQUENCY: &str = "delay_frequency";
pub const LIMIT_UTILIZATION: &str = "limit_utilization";
pub const PAYMENT_RATIO_6M: &str = "payment_ratio_6m";

/// Features fed to the clustering model, in matrix column order
pub const CLUSTER_FEATURES: [&str; 4] = [
    SEVERITY_SCORE,
    PAYMENT_RATIO_6M,
    LIMIT_UTILIZATION,
    CREDIT_LIMIT,
];

/// The payment-history fields of one customer consumed by the risk features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Delay codes per month; a positive N means N billing cycles late
    pub payment_status: [i64; MONTHS],
    pub billing_amount: [f64; MONTHS],
    pub payment_amount: [f64; MONTHS],
    pub credit_limit: f64,
}

/// Risk indicators derived from a [`CustomerRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    pub severity_score: u64,
    pub delay_frequency: u32,
    pub limit_utilization: f64,
    pub payment_ratio_6m: f64,
}

impl DerivedFeatures {
    pub fn derive(record: &CustomerRecord) -> Self {
        Self {
            severity_score: severity_score(&record.payment_status),
            delay_frequency: delay_frequency(&record.payment_status),
            limit_utilization: limit_utilization(record.billing_amount[0], record.credit_limit),
            payment_ratio_6m: payment_ratio_6m(&record.billing_amount, &record.payment_amount),
        }
    }
}

/// Sum of squared positive delay codes.
///
/// One three-cycle delay (9) weighs more than three one-cycle delays (3).
/// Saturates at `u64::MAX` for corrupt, absurdly large codes.
pub fn severity_score(payment_status: &[i64]) -> u64 {
    payment_status
        .iter()
        .filter(|&&d| d > 0)
        .fold(0u64, |total, &d| total.saturating_add((d as u64).saturating_pow(2)))
}

/// Number of months with a strictly positive delay code
pub fn delay_frequency(payment_status: &[i64]) -> u32 {
    payment_status.iter().filter(|&&d| d > 0).count() as u32
}

/// Most recent bill over the credit limit, clipped to `[0, 1.5]`.
/// A zero credit limit is replaced by 1.
pub fn limit_utilization(latest_billing: f64, credit_limit: f64) -> f64 {
    let limit = if credit_limit == 0.0 { 1.0 } else { credit_limit };
    (latest_billing / limit).clamp(0.0, MAX_LIMIT_UTILIZATION)
}

/// Six-month paid total over billed total, clipped to `[0, 1]`.
///
/// Customers whose cumulative billing is zero or negative owe nothing and get 1.
pub fn payment_ratio_6m(billing_amount: &[f64], payment_amount: &[f64]) -> f64 {
    let total_billed: f64 = billing_amount.iter().sum();
    if total_billed <= 0.0 {
        return 1.0;
    }
    let total_paid: f64 = payment_amount.iter().sum();
    (total_paid / total_billed).clamp(0.0, MAX_PAYMENT_RATIO)
}
