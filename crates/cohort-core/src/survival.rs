//! Kaplan-Meier product-limit estimation over right-censored durations.
//!
//! An observation is a `(duration, event_observed)` pair. Observations whose
//! event was not observed are *censored*: they are only known to have lasted
//! at least `duration`. They leave the at-risk set after their duration
//! without lowering the survival estimate.

use serde::{Deserialize, Serialize};

/// One step of a survival curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPoint {
    /// Elapsed time (whole days in this crate's usage).
    pub time: u64,
    /// Estimated probability of surviving past `time`, in `[0, 1]`.
    pub survival: f64,
    /// Observations with duration ≥ `time`.
    pub at_risk: usize,
    /// Observed events at exactly `time`.
    pub events: usize,
    /// Censored observations at exactly `time`.
    pub censored: usize,
}

/// Kaplan-Meier survival curve.
///
/// The curve is a right-continuous step function: `points[0]` is the origin
/// `(0, 1.0)` and each further point is one distinct observed duration in
/// ascending order. Survival never increases from one point to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaplanMeierCurve {
    pub points: Vec<SurvivalPoint>,
}

impl KaplanMeierCurve {
    /// Fit the estimator to `(duration, event_observed)` observations.
    ///
    /// With no observations the curve is the single origin point `(0, 1.0)`.
    /// Observations at duration 0 are applied at the origin step itself.
    ///
    /// ```
    /// use cohort_core::survival::KaplanMeierCurve;
    ///
    /// let curve = KaplanMeierCurve::fit(vec![(10, true), (20, false), (30, true)]);
    /// assert_eq!(curve.survival_at(0), 1.0);
    /// assert!((curve.survival_at(10) - 2.0 / 3.0).abs() < 1e-12);
    /// assert_eq!(curve.survival_at(30), 0.0);
    /// ```
    #[must_use]
    pub fn fit(mut observations: Vec<(u64, bool)>) -> Self {
        observations.sort_by_key(|(time, _)| *time);

        let total = observations.len();
        let mut points = Vec::new();
        if observations.first().map_or(true, |(t, _)| *t > 0) {
            points.push(SurvivalPoint {
                time: 0,
                survival: 1.0,
                at_risk: total,
                events: 0,
                censored: 0,
            });
        }

        let mut current_survival = 1.0_f64;
        let mut i = 0;
        while i < total {
            let current_time = observations[i].0;
            let at_risk = total - i;

            let mut events = 0usize;
            let mut j = i;
            while j < total && observations[j].0 == current_time {
                if observations[j].1 {
                    events += 1;
                }
                j += 1;
            }

            if events > 0 {
                current_survival *= 1.0 - events as f64 / at_risk as f64;
            }
            points.push(SurvivalPoint {
                time: current_time,
                survival: current_survival,
                at_risk,
                events,
                censored: (j - i) - events,
            });

            i = j;
        }

        Self { points }
    }

    /// `(time, survival)` pairs, the plain step sequence.
    pub fn steps(&self) -> Vec<(u64, f64)> {
        self.points.iter().map(|p| (p.time, p.survival)).collect()
    }

    /// Survival probability at `time` (step lookup: the value of the last
    /// point at or before `time`, `1.0` before the first point).
    pub fn survival_at(&self, time: u64) -> f64 {
        self.points
            .iter()
            .rev()
            .find(|p| p.time <= time)
            .map_or(1.0, |p| p.survival)
    }

    /// First time at which survival drops to 0.5 or below; `None` when the
    /// curve never gets there.
    pub fn median_survival(&self) -> Option<u64> {
        self.points
            .iter()
            .find(|p| p.survival <= 0.5)
            .map(|p| p.time)
    }

    /// Number of observations the curve was fitted on.
    pub fn observations(&self) -> usize {
        self.points.first().map_or(0, |p| p.at_risk)
    }
}
