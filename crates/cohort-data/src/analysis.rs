//! The analysis pipeline.
//!
//! Validates a raw table, normalizes it once, then computes the engagement
//! aggregates and one survival curve per churn threshold, returning an
//! [`AnalysisReport`] ready for a report assembler.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use cohort_core::error::Result;
use cohort_core::models::{required_columns, RawTable};
use cohort_core::settings::AnalysisConfig;
use cohort_core::time_utils::TimestampParser;
use serde::Serialize;
use tracing::info;

use crate::aggregator::{EngagementAggregates, EngagementAggregator};
use crate::loader::validate;
use crate::normalizer::normalize;
use crate::reader::load_raw_table;
use crate::retention::{survival_curves, ThresholdCurve};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Reporting timezone timestamps were converted to.
    pub timezone: String,
    pub rows_read: usize,
    /// Rows dropped by the loader for lacking a cohort.
    pub rows_dropped: usize,
    pub records_normalized: usize,
    pub distinct_users: usize,
    pub cohorts: usize,
    pub churn_thresholds: Vec<u32>,
    /// Wall-clock seconds spent validating and normalizing.
    pub normalize_time_seconds: f64,
    /// Wall-clock seconds spent in the aggregation engine.
    pub aggregate_time_seconds: f64,
    /// Wall-clock seconds spent fitting survival curves.
    pub survival_time_seconds: f64,
}

/// The complete output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub metadata: AnalysisMetadata,
    pub aggregates: EngagementAggregates,
    /// One curve per configured threshold, in configuration order.
    pub survival: Vec<ThresholdCurve>,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the pipeline over an in-memory raw table.
///
/// `raw` is not modified. Fails on a missing required column or on any cell
/// that cannot be coerced; nothing is computed in that case.
pub fn analyze_table(raw: &RawTable, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let parser = TimestampParser::from_name(&config.timezone);

    // ── Step 1: Validate and normalize ────────────────────────────────────────
    let normalize_start = Instant::now();
    let validated = validate(raw, &required_columns())?;
    let records = normalize(&validated, &parser)?;
    let normalize_time = normalize_start.elapsed().as_secs_f64();

    // ── Step 2: Aggregates ────────────────────────────────────────────────────
    let aggregate_start = Instant::now();
    let aggregates = EngagementAggregator::aggregate(&records, config.mean_usage_floor);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    // ── Step 3: Survival ──────────────────────────────────────────────────────
    let survival_start = Instant::now();
    let survival = survival_curves(&records, &config.churn_thresholds);
    let survival_time = survival_start.elapsed().as_secs_f64();

    let distinct_users = records
        .iter()
        .map(|r| r.record.user_key.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        timezone: parser.timezone().name().to_string(),
        rows_read: raw.len(),
        rows_dropped: raw.len() - validated.len(),
        records_normalized: records.len(),
        distinct_users,
        cohorts: aggregates.cohort_sizes.len(),
        churn_thresholds: config.churn_thresholds.clone(),
        normalize_time_seconds: normalize_time,
        aggregate_time_seconds: aggregate_time,
        survival_time_seconds: survival_time,
    };

    info!(
        "Analyzed {} sessions from {} users in {} cohorts",
        metadata.records_normalized, metadata.distinct_users, metadata.cohorts
    );

    Ok(AnalysisReport {
        metadata,
        aggregates,
        survival,
    })
}

/// Load a CSV file or directory and run the pipeline over it.
pub fn analyze_path(data_path: &Path, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let raw = load_raw_table(data_path)?;
    analyze_table(&raw, config)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
