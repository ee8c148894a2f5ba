//! Record-set boundary using Polars: CSV I/O, derived feature columns and
//! feature selection for the clustering matrix

use crate::error::RiskError;
use crate::features::{
    CustomerRecord, DerivedFeatures, BILLING_AMOUNT_COLUMNS, CREDIT_LIMIT, DELAY_FREQUENCY,
    LIMIT_UTILIZATION, MONTHS, PAYMENT_AMOUNT_COLUMNS, PAYMENT_RATIO_6M, PAYMENT_STATUS_COLUMNS,
    SEVERITY_SCORE,
};
use crate::pipeline::ClusterAssignment;
use anyhow::Context;
use ndarray::Array2;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Column holding the model-internal cluster id
pub const RAW_CLUSTER_ID: &str = "raw_cluster_id";
/// Column holding the stabilized risk tier
pub const RISK_TIER: &str = "risk_tier";

/// Load a cleaned record set from CSV.
///
/// Column names must already match the payment-history identifiers; no
/// renaming or format detection happens here.
pub fn load_records<P: AsRef<Path>>(path: P) -> crate::Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("failed to open record set {}", path.display()))?
        .finish()
        .with_context(|| format!("failed to parse record set {}", path.display()))?;

    if df.height() == 0 {
        return Err(RiskError::EmptyRecordSet.into());
    }
    Ok(df)
}

/// Write a record set to CSV with a header row
pub fn write_records<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> crate::Result<()> {
    let path = path.as_ref();
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Extract the payment-history fields of every row, preserving row order.
///
/// Fails with [`RiskError::MissingColumns`] listing every absent input column.
pub fn customer_records(df: &DataFrame) -> crate::Result<Vec<CustomerRecord>> {
    let required = PAYMENT_STATUS_COLUMNS
        .iter()
        .chain(BILLING_AMOUNT_COLUMNS.iter())
        .chain(PAYMENT_AMOUNT_COLUMNS.iter())
        .chain(std::iter::once(&CREDIT_LIMIT));
    let missing = missing_columns(df, required);
    if !missing.is_empty() {
        return Err(RiskError::MissingColumns(missing).into());
    }

    let mut status = Vec::with_capacity(MONTHS);
    let mut billing = Vec::with_capacity(MONTHS);
    let mut payment = Vec::with_capacity(MONTHS);
    for month in 0..MONTHS {
        status.push(i64_column(df, PAYMENT_STATUS_COLUMNS[month])?);
        billing.push(f64_column(df, BILLING_AMOUNT_COLUMNS[month])?);
        payment.push(f64_column(df, PAYMENT_AMOUNT_COLUMNS[month])?);
    }
    let credit_limit = f64_column(df, CREDIT_LIMIT)?;

    let records = (0..df.height())
        .map(|row| CustomerRecord {
            payment_status: std::array::from_fn(|month| status[month][row]),
            billing_amount: std::array::from_fn(|month| billing[month][row]),
            payment_amount: std::array::from_fn(|month| payment[month][row]),
            credit_limit: credit_limit[row],
        })
        .collect();
    Ok(records)
}

/// Derive the risk features for every row and attach them as new columns
pub fn attach_derived_features(mut df: DataFrame) -> crate::Result<DataFrame> {
    let derived: Vec<DerivedFeatures> = customer_records(&df)?
        .iter()
        .map(DerivedFeatures::derive)
        .collect();

    let severity: Vec<u64> = derived.iter().map(|f| f.severity_score).collect();
    let frequency: Vec<u32> = derived.iter().map(|f| f.delay_frequency).collect();
    let utilization: Vec<f64> = derived.iter().map(|f| f.limit_utilization).collect();
    let ratio: Vec<f64> = derived.iter().map(|f| f.payment_ratio_6m).collect();

    df.with_column(Series::new(SEVERITY_SCORE.into(), severity))?;
    df.with_column(Series::new(DELAY_FREQUENCY.into(), frequency))?;
    df.with_column(Series::new(LIMIT_UTILIZATION.into(), utilization))?;
    df.with_column(Series::new(PAYMENT_RATIO_6M.into(), ratio))?;
    Ok(df)
}

/// Build the `(n_rows, features.len())` matrix of the requested columns.
///
/// Row order is preserved. Every absent column is reported at once through
/// [`RiskError::MissingFeatures`]; nothing is computed on a partial set.
pub fn select_features(df: &DataFrame, features: &[&str]) -> crate::Result<Array2<f64>> {
    let missing = missing_columns(df, features.iter());
    if !missing.is_empty() {
        return Err(RiskError::MissingFeatures(missing).into());
    }

    let n_rows = df.height();
    let mut matrix = Array2::zeros((n_rows, features.len()));
    for (j, name) in features.iter().enumerate() {
        let values = f64_column(df, name)?;
        for (i, value) in values.into_iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }
    Ok(matrix)
}

/// Attach raw cluster ids and risk tiers as columns
pub fn attach_assignments(
    mut df: DataFrame,
    assignments: &[ClusterAssignment],
) -> crate::Result<DataFrame> {
    let raw: Vec<u32> = assignments.iter().map(|a| a.raw_cluster_id as u32).collect();
    let tiers: Vec<u32> = assignments.iter().map(|a| a.risk_tier as u32).collect();
    df.with_column(Series::new(RAW_CLUSTER_ID.into(), raw))?;
    df.with_column(Series::new(RISK_TIER.into(), tiers))?;
    Ok(df)
}

fn missing_columns<I>(df: &DataFrame, required: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    required
        .into_iter()
        .filter(|name| df.get_column_index(name.as_ref()).is_none())
        .map(|name| name.as_ref().to_string())
        .collect()
}

fn f64_column(df: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    check_nulls(name, column.null_count())?;
    Ok(column
        .as_materialized_series()
        .f64()?
        .into_no_null_iter()
        .collect())
}

fn i64_column(df: &DataFrame, name: &str) -> crate::Result<Vec<i64>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    check_nulls(name, column.null_count())?;
    Ok(column
        .as_materialized_series()
        .i64()?
        .into_no_null_iter()
        .collect())
}

fn check_nulls(column: &str, count: usize) -> Result<(), RiskError> {
    if count > 0 {
        return Err(RiskError::NullValues {
            column: column.to_string(),
            count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::CLUSTER_FEATURES;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn header() -> String {
        PAYMENT_STATUS_COLUMNS
            .iter()
            .chain(BILLING_AMOUNT_COLUMNS.iter())
            .chain(PAYMENT_AMOUNT_COLUMNS.iter())
            .chain(["credit_limit", "age"].iter())
            .copied()
            .collect::<Vec<_>>()
            .join(",")
    }

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", header()).unwrap();
        // three-cycle delay once, utilization 2.0 before clipping
        writeln!(
            file,
            "3,0,0,0,0,0,200,100,100,100,100,100,50,50,50,50,50,50,100,34"
        )
        .unwrap();
        // three one-cycle delays, nothing owed
        writeln!(file, "1,1,1,-1,-2,0,0,0,0,0,0,0,10,10,10,10,10,10,5000,52").unwrap();
        file
    }

    #[test]
    fn test_load_and_derive() {
        let file = create_test_csv();
        let df = load_records(file.path()).unwrap();
        assert_eq!(df.height(), 2);

        let df = attach_derived_features(df).unwrap();
        let matrix = select_features(&df, &CLUSTER_FEATURES).unwrap();
        assert_eq!(matrix.shape(), &[2, 4]);

        // severity, payment ratio, utilization, credit limit
        assert_eq!(matrix[[0, 0]], 9.0);
        assert!((matrix[[0, 1]] - 300.0 / 700.0).abs() < 1e-12);
        assert_eq!(matrix[[0, 2]], 1.5);
        assert_eq!(matrix[[0, 3]], 100.0);

        assert_eq!(matrix[[1, 0]], 3.0);
        assert_eq!(matrix[[1, 1]], 1.0);
        assert_eq!(matrix[[1, 2]], 0.0);

        let frequency = select_features(&df, &[DELAY_FREQUENCY]).unwrap();
        assert_eq!(frequency.column(0).to_vec(), vec![1.0, 3.0]);

        // pass-through attribute untouched
        assert!(df.column("age").is_ok());
    }

    #[test]
    fn test_missing_feature_named_exactly() {
        let df = df!(
            SEVERITY_SCORE => &[0.0, 4.0],
            PAYMENT_RATIO_6M => &[1.0, 0.5],
            CREDIT_LIMIT => &[1000.0, 2000.0]
        )
        .unwrap();

        let err = select_features(&df, &CLUSTER_FEATURES).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RiskError>(),
            Some(&RiskError::MissingFeatures(vec![
                LIMIT_UTILIZATION.to_string()
            ]))
        );
    }

    #[test]
    fn test_missing_features_all_listed() {
        let df = df!(CREDIT_LIMIT => &[1000.0]).unwrap();
        let err = select_features(&df, &CLUSTER_FEATURES).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RiskError>(),
            Some(&RiskError::MissingFeatures(vec![
                SEVERITY_SCORE.to_string(),
                PAYMENT_RATIO_6M.to_string(),
                LIMIT_UTILIZATION.to_string(),
            ]))
        );
    }

    #[test]
    fn test_missing_input_columns() {
        let df = df!("payment_status_1" => &[0i64], CREDIT_LIMIT => &[100.0]).unwrap();
        let err = customer_records(&df).unwrap_err();
        match err.downcast_ref::<RiskError>() {
            Some(RiskError::MissingColumns(missing)) => {
                assert_eq!(missing.len(), 17);
                assert!(!missing.contains(&"payment_status_1".to_string()));
                assert!(missing.contains(&"billing_amount_1".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_null_values_rejected() {
        let df = df!(SEVERITY_SCORE => &[Some(1.0), None]).unwrap();
        let err = select_features(&df, &[SEVERITY_SCORE]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RiskError>(),
            Some(&RiskError::NullValues {
                column: SEVERITY_SCORE.to_string(),
                count: 1
            })
        );
    }

    #[test]
    fn test_write_round_trip_keeps_rows() {
        let file = create_test_csv();
        let mut df = attach_derived_features(load_records(file.path()).unwrap()).unwrap();
        let out = NamedTempFile::new().unwrap();
        write_records(&mut df, out.path()).unwrap();

        let reloaded = load_records(out.path()).unwrap();
        assert_eq!(reloaded.height(), 2);
        assert!(reloaded.column(SEVERITY_SCORE).is_ok());
    }
}
