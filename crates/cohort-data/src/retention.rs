//! Threshold-based churn labelling and per-threshold survival curves.

use chrono::TimeDelta;
use cohort_core::models::NormalizedRecord;
use cohort_core::survival::KaplanMeierCurve;
use serde::Serialize;
use tracing::debug;

/// Churn label of one session for one threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChurnLabel {
    pub session_key: String,
    pub user_key: String,
    /// Elapsed time since signup, floored to whole days.
    pub days_since_signup: i64,
    pub churned: bool,
}

/// Survival curve fitted for one churn threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCurve {
    pub threshold_days: u32,
    /// First day at which survival is at or below one half.
    pub median_survival_days: Option<u64>,
    pub curve: KaplanMeierCurve,
}

/// A session is churned for `threshold_days` when less than that many days
/// passed between signup and the session day.
pub fn is_churned(record: &NormalizedRecord, threshold_days: u32) -> bool {
    record.days_since_signup < TimeDelta::days(i64::from(threshold_days))
}

/// Label every record against `threshold_days`, in record order.
pub fn label_churn(records: &[NormalizedRecord], threshold_days: u32) -> Vec<ChurnLabel> {
    records
        .iter()
        .map(|r| ChurnLabel {
            session_key: r.record.session_key.clone(),
            user_key: r.record.user_key.clone(),
            days_since_signup: r.whole_days_since_signup(),
            churned: is_churned(r, threshold_days),
        })
        .collect()
}

/// Fit the survival curve for one threshold.
///
/// Only records with strictly positive elapsed time take part. Each
/// contributes its whole elapsed days as duration, with the event observed
/// when the record is *not* churned.
// NOTE: the usual convention would observe the churn itself. The inverted
// indicator is kept as is until product confirms the intended reading.
pub fn survival_curve(records: &[NormalizedRecord], threshold_days: u32) -> ThresholdCurve {
    let observations: Vec<(u64, bool)> = records
        .iter()
        .filter(|r| r.days_since_signup > TimeDelta::zero())
        .map(|r| {
            let days = r.whole_days_since_signup().max(0) as u64;
            (days, !is_churned(r, threshold_days))
        })
        .collect();

    debug!(
        "Fitting survival curve for {} day threshold over {} observations",
        threshold_days,
        observations.len()
    );
    let curve = KaplanMeierCurve::fit(observations);
    ThresholdCurve {
        threshold_days,
        median_survival_days: curve.median_survival(),
        curve,
    }
}

/// One curve per threshold, in the order given. Each threshold is fitted
/// independently of the others.
pub fn survival_curves(records: &[NormalizedRecord], thresholds: &[u32]) -> Vec<ThresholdCurve> {
    thresholds
        .iter()
        .map(|&t| survival_curve(records, t))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
