//! Integration tests for RiskTier

use risktier::data::{RAW_CLUSTER_ID, RISK_TIER};
use risktier::features::{
    BILLING_AMOUNT_COLUMNS, PAYMENT_AMOUNT_COLUMNS, PAYMENT_STATUS_COLUMNS, SEVERITY_SCORE,
};
use risktier::{
    attach_derived_features, load_records, segment, select_features, write_records,
    ClusterConfig, RiskError, RiskModel,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn header() -> String {
    let mut columns: Vec<&str> = vec!["customer_id"];
    columns.extend(PAYMENT_STATUS_COLUMNS);
    columns.extend(BILLING_AMOUNT_COLUMNS);
    columns.extend(PAYMENT_AMOUNT_COLUMNS);
    columns.extend(["credit_limit", "age"]);
    columns.join(",")
}

fn customer_line(id: usize, status: [i64; 6], bill: f64, paid: f64, limit: f64) -> String {
    let mut fields = vec![id.to_string()];
    fields.extend(status.iter().map(|s| s.to_string()));
    fields.extend((0..6).map(|_| format!("{:.2}", bill)));
    fields.extend((0..6).map(|_| format!("{:.2}", paid)));
    fields.push(format!("{:.0}", limit));
    fields.push((25 + id % 40).to_string());
    fields.join(",")
}

/// Four behavioral groups interleaved row by row:
/// clean payers, occasional slips, pressured short delays, long delays
fn population_lines() -> Vec<String> {
    let mut lines = Vec::new();
    for i in 0..6 {
        let j = i as f64;

        let limit = 200_000.0 + j * 1000.0;
        let bill = (0.10 + j * 0.01) * limit;
        lines.push(customer_line(4 * i, [0, -1, 0, 0, -1, 0], bill, bill, limit));

        let limit = 120_000.0 + j * 1000.0;
        let bill = (0.40 + j * 0.01) * limit;
        let status = if i % 2 == 0 { [1, 0, 0, 0, 0, 0] } else { [1, 1, 0, 0, 0, 0] };
        lines.push(customer_line(4 * i + 1, status, bill, 0.8 * bill, limit));

        let limit = 50_000.0 + j * 1000.0;
        let bill = (0.95 + j * 0.01) * limit;
        let status = match i % 3 {
            0 => [2, 2, 0, 0, 0, 0],
            1 => [2, 2, 1, 0, 0, 0],
            _ => [2, 2, 1, 1, 0, 0],
        };
        lines.push(customer_line(4 * i + 2, status, bill, 0.3 * bill, limit));

        let limit = 20_000.0 + j * 1000.0;
        let bill = (1.40 + j * 0.01) * limit;
        let status = if i % 2 == 0 { [4, 4, 2, 2, 0, 0] } else { [4, 4, 3, 2, 0, 0] };
        lines.push(customer_line(4 * i + 3, status, bill, 0.0, limit));
    }
    lines
}

fn write_csv(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", header()).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn column_values(df: &polars::prelude::DataFrame, name: &str) -> Vec<f64> {
    select_features(df, &[name]).unwrap().column(0).to_vec()
}

#[test]
fn test_end_to_end_pipeline() {
    let file = write_csv(&population_lines());
    let records = load_records(file.path()).unwrap();
    assert_eq!(records.height(), 24);

    let (labeled, segmentation) = segment(records, &ClusterConfig::default()).unwrap();
    assert_eq!(labeled.height(), 24);
    assert!(labeled.column(RAW_CLUSTER_ID).is_ok());
    assert!(labeled.column("customer_id").is_ok());

    let tiers = column_values(&labeled, RISK_TIER);
    assert!(tiers.iter().all(|&t| t >= 0.0 && t < 4.0));
    assert_eq!(
        tiers.iter().map(|&t| t as usize).collect::<Vec<_>>(),
        segmentation.risk_tiers()
    );

    // every group is one tier, ordered by delinquency
    for (row, &tier) in tiers.iter().enumerate() {
        assert_eq!(tier as usize, row % 4, "row {}", row);
    }

    assert!(segmentation.silhouette > 0.0);
    assert!(segmentation.inertia.is_finite() && segmentation.inertia >= 0.0);
}

#[test]
fn test_tier_mean_severity_non_decreasing() {
    let file = write_csv(&population_lines());
    let records = load_records(file.path()).unwrap();

    for k in 2..=5 {
        let (labeled, segmentation) = segment(records.clone(), &ClusterConfig::new(k, 42, 10)).unwrap();
        let severity = column_values(&labeled, SEVERITY_SCORE);
        let tiers = column_values(&labeled, RISK_TIER);

        let mut sums = vec![(0.0, 0usize); k];
        for (&s, &t) in severity.iter().zip(tiers.iter()) {
            sums[t as usize].0 += s;
            sums[t as usize].1 += 1;
        }
        let means: Vec<f64> = sums
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(sum, count)| sum / *count as f64)
            .collect();
        assert!(means.windows(2).all(|w| w[0] <= w[1]), "k={} means={:?}", k, means);
        assert_eq!(segmentation.summaries.len(), k);
    }
}

#[test]
fn test_refit_is_deterministic() {
    let file = write_csv(&population_lines());
    let records = load_records(file.path()).unwrap();
    let config = ClusterConfig::default();

    let (first, _) = segment(records.clone(), &config).unwrap();
    let (second, _) = segment(records, &config).unwrap();
    assert_eq!(column_values(&first, RISK_TIER), column_values(&second, RISK_TIER));
    assert_eq!(
        column_values(&first, RAW_CLUSTER_ID),
        column_values(&second, RAW_CLUSTER_ID)
    );
}

#[test]
fn test_saved_model_scores_held_out_records() {
    let lines = population_lines();
    let file = write_csv(&lines);
    let (labeled, segmentation) =
        segment(load_records(file.path()).unwrap(), &ClusterConfig::default()).unwrap();
    let fitted_tiers = column_values(&labeled, RISK_TIER);

    let model_file = NamedTempFile::new().unwrap();
    segmentation.model.save(model_file.path()).unwrap();
    let model = RiskModel::load(model_file.path()).unwrap();

    // the same customers arriving later are scored, not refit
    let held_out = write_csv(&lines[..8]);
    let scored = model.score_records(load_records(held_out.path()).unwrap()).unwrap();
    assert_eq!(column_values(&scored, RISK_TIER), fitted_tiers[..8].to_vec());

    let mut scored = scored;
    let out = NamedTempFile::new().unwrap();
    write_records(&mut scored, out.path()).unwrap();
    assert_eq!(load_records(out.path()).unwrap().height(), 8);
}

#[test]
fn test_missing_payment_columns() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "customer_id,credit_limit").unwrap();
    writeln!(file, "1,1000").unwrap();

    let records = load_records(file.path()).unwrap();
    let err = attach_derived_features(records).unwrap_err();
    match err.downcast_ref::<RiskError>() {
        Some(RiskError::MissingColumns(missing)) => assert_eq!(missing.len(), 18),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_too_many_clusters_for_population() {
    let file = write_csv(&population_lines()[..3]);
    let records = load_records(file.path()).unwrap();
    let err = segment(records, &ClusterConfig::new(4, 42, 10)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RiskError>(),
        Some(RiskError::TooFewSamples { samples: 3, clusters: 4 })
    ));
}
