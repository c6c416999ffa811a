//! Synthetic session exports for fixtures and demos.
//!
//! The generator draws everything from a caller-owned random source, so a
//! seeded generator always reproduces the same table.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use cohort_core::error::{InsightError, Result};
use cohort_core::models::{
    Feature, RawTable, DURATION_MINS, EVENT_PLATFORM, GROUP_CODE, REGISTRATION_DATE, SESSION_DAY,
    SESSION_KEY, SESSION_START_TIME, USER_KEY, USER_PLATFORM,
};
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use tracing::info;

/// Session end column written alongside the input contract columns.
pub const SESSION_END_TIME: &str = "session_end_time";

const PLATFORMS: [&str; 3] = ["Desktop", "Mobile", "Tablet"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_DURATION_MINS: i64 = 120;
const USAGE_RATE: f64 = 0.5;
const MAX_COUNTER: u64 = 5;

/// Shape of a generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureConfig {
    pub users: usize,
    /// Cohorts are drawn from `group_1..=group_<max_groups>`.
    pub max_groups: u32,
    pub max_sessions_per_user: u32,
    /// Registrations and sessions fall within `[window_start, window_end]`.
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            users: 50,
            max_groups: 3,
            max_sessions_per_user: 10,
            window_start: midnight(2023, 1, 1),
            window_end: midnight(2027, 12, 31),
        }
    }
}

/// Column order of generated tables.
pub fn fixture_columns() -> Vec<String> {
    let base = [
        SESSION_KEY,
        USER_KEY,
        GROUP_CODE,
        REGISTRATION_DATE,
        USER_PLATFORM,
        EVENT_PLATFORM,
        SESSION_START_TIME,
        SESSION_DAY,
        SESSION_END_TIME,
        DURATION_MINS,
    ];
    base.iter()
        .copied()
        .chain(Feature::ALL.iter().map(|f| f.column()))
        .map(str::to_string)
        .collect()
}

/// Generate a session table.
///
/// Every user gets a registration time in the window, a signup platform, a
/// cohort and between one and `max_sessions_per_user` sessions starting no
/// earlier than registration. Counters whose name mentions `usage` are
/// Poisson distributed; the others are uniform in `0..=5`.
pub fn generate<R: Rng + ?Sized>(config: &FixtureConfig, rng: &mut R) -> Result<RawTable> {
    if config.max_groups == 0 || config.max_sessions_per_user == 0 {
        return Err(InsightError::Config(
            "fixture needs at least one group and one session per user".to_string(),
        ));
    }
    if config.window_end < config.window_start {
        return Err(InsightError::Config(
            "fixture window ends before it starts".to_string(),
        ));
    }
    let usage = Poisson::new(USAGE_RATE)
        .map_err(|e| InsightError::Config(format!("invalid usage rate: {e}")))?;

    let mut table = RawTable::new(fixture_columns());
    for _ in 0..config.users {
        let user_key = random_key(rng);
        let registered = random_between(rng, config.window_start, config.window_end);
        let user_platform = PLATFORMS[rng.random_range(0..PLATFORMS.len())];
        let group_code = format!("group_{}", rng.random_range(1..=config.max_groups));

        for _ in 0..rng.random_range(1..=config.max_sessions_per_user) {
            let session_key = random_key(rng);
            let start = random_between(rng, registered, config.window_end);
            let duration = rng.random_range(1..=MAX_DURATION_MINS);
            let end = start + TimeDelta::minutes(duration);
            let event_platform = PLATFORMS[rng.random_range(0..PLATFORMS.len())];

            let mut row = vec![
                session_key,
                user_key.clone(),
                group_code.clone(),
                registered.format(TIMESTAMP_FORMAT).to_string(),
                user_platform.to_string(),
                event_platform.to_string(),
                start.format(TIMESTAMP_FORMAT).to_string(),
                start.date().format("%Y-%m-%d").to_string(),
                end.format(TIMESTAMP_FORMAT).to_string(),
                duration.to_string(),
            ];
            for feature in Feature::ALL {
                let count = if feature.column().contains("usage") {
                    usage.sample(rng) as u64
                } else {
                    rng.random_range(0..=MAX_COUNTER)
                };
                row.push(count.to_string());
            }
            table.push_row(row.into_iter().map(Some).collect());
        }
    }

    info!(
        "Generated {} sessions for {} users",
        table.len(),
        config.users
    );
    Ok(table)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Random v4-style UUID string.
fn random_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.random())
        .into_uuid()
        .to_string()
}

/// Uniform timestamp in `[from, to]` at one-second resolution.
fn random_between<R: Rng + ?Sized>(rng: &mut R, from: NaiveDateTime, to: NaiveDateTime) -> NaiveDateTime {
    let span = (to - from).num_seconds();
    if span <= 0 {
        return from;
    }
    from + TimeDelta::seconds(rng.random_range(0..=span))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
