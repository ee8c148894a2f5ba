//! RiskTier: customer risk segmentation CLI
//!
//! Fits the segmentation pipeline on a cleaned record set, or applies a saved
//! model to new records or a single feature vector.

use anyhow::Result;
use clap::Parser;
use risktier::{load_records, segment, strategy_for, write_records, Args, RiskModel, TierSummary};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose { "risktier=debug" } else { "risktier=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    if let Some(features) = args.parse_feature_values()? {
        run_prediction_mode(&args, &features)
    } else if args.score {
        run_scoring_mode(&args)
    } else {
        run_full_pipeline(&args)
    }
}

/// Score a single derived-feature vector with the saved model
fn run_prediction_mode(args: &Args, features: &[f64]) -> Result<()> {
    println!("=== Prediction Mode ===");
    let model = RiskModel::load(&args.model)?;
    let assignment = model.score(features)?;

    println!("Input features:");
    for (name, value) in model.feature_names.iter().zip(features) {
        println!("  {name}: {value}");
    }
    println!("\n✓ Risk tier: {} of {}", assignment.risk_tier, model.n_tiers());
    println!("  Raw cluster id: {}", assignment.raw_cluster_id);
    if let Some(mean) = model.tiers.mean_severity(assignment.raw_cluster_id) {
        println!("  Tier mean severity at fit: {:.2}", mean);
    }
    if let Some(strategy) = strategy_for(assignment.risk_tier) {
        println!("  Profile: {}", strategy.profile);
        println!("  Messaging: {}", strategy.instruction);
    }
    Ok(())
}

/// Apply the saved model to the input record set without refitting
fn run_scoring_mode(args: &Args) -> Result<()> {
    println!("=== Scoring Mode ===\n");
    let start_time = Instant::now();

    let model = RiskModel::load(&args.model)?;
    info!(path = %args.model, tiers = model.n_tiers(), "model loaded");

    let records = load_records(&args.input)?;
    let rows = records.height();
    let mut labeled = model.score_records(records)?;
    write_records(&mut labeled, &args.output)?;

    println!("✓ Scored {} customers", rows);
    println!("Labeled records saved to: {}", args.output);
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Fit the full pipeline and persist the model and labeled records
fn run_full_pipeline(args: &Args) -> Result<()> {
    println!("=== Risk Segmentation Pipeline ===\n");
    let start_time = Instant::now();

    info!(input = %args.input, "loading record set");
    let records = load_records(&args.input)?;
    println!("✓ Data loaded: {} customers", records.height());

    let config = args.cluster_config();
    let (mut labeled, segmentation) = segment(records, &config)?;
    println!("✓ Model fitted: {} tiers", segmentation.model.n_tiers());

    println!("\n=== Tier Profiles ===");
    print_summaries(&segmentation.summaries);

    println!("\nSilhouette score: {:.3}", segmentation.silhouette);
    println!("Within-cluster sum of squares: {:.2}", segmentation.inertia);

    segmentation.model.save(&args.model)?;
    write_records(&mut labeled, &args.output)?;

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Labeled records saved to: {}", args.output);
    println!("Model saved to: {}", args.model);
    Ok(())
}

fn print_summaries(summaries: &[TierSummary]) {
    for summary in summaries {
        let profile = strategy_for(summary.tier).map_or("", |s| s.profile);
        println!(
            "Tier {}: {} customers ({:.1}%) {}",
            summary.tier,
            summary.size,
            summary.share * 100.0,
            profile
        );
        println!(
            "  severity {:.2} | paid {:.0}% | limit used {:.0}% | credit limit {:.0}",
            summary.mean_severity,
            summary.mean_payment_ratio * 100.0,
            summary.mean_utilization * 100.0,
            summary.mean_credit_limit
        );
    }
}
