//! Typed coercion and field derivation for validated session tables.
//!
//! One pass turns every validated row into a [`NormalizedRecord`]: timestamps
//! are parsed once, cohort codes canonicalized, calendar fields and the
//! per-user session rank derived, and the result ordered by session day.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDateTime, Timelike};
use cohort_core::error::{InsightError, Result};
use cohort_core::models::{
    Feature, FeatureCounts, NormalizedRecord, RawTable, SessionRecord, DURATION_MINS,
    EVENT_PLATFORM, GROUP_CODE, REGISTRATION_DATE, SESSION_DAY, SESSION_KEY,
    SESSION_START_TIME, USER_KEY, USER_PLATFORM,
};
use cohort_core::time_utils::TimestampParser;
use regex::Regex;
use tracing::debug;

/// Platform label used when a platform cell is empty.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Largest accepted per-session usage counter.
pub const MAX_COUNT: u64 = u32::MAX as u64;

// ── Public API ────────────────────────────────────────────────────────────────

/// Normalize a validated table.
///
/// Fails with [`InsightError::TypeCoercion`] on the first cell that cannot be
/// coerced; no partially normalized output is returned. Row numbers in errors
/// are 1-based positions in `table`.
pub fn normalize(table: &RawTable, parser: &TimestampParser) -> Result<Vec<NormalizedRecord>> {
    let columns = ColumnIndex::resolve(table)?;

    let mut records = Vec::with_capacity(table.len());
    for (i, row) in table.rows.iter().enumerate() {
        let record = coerce_row(row, i + 1, &columns, parser)?;
        records.push(derive_fields(record));
    }

    assign_session_ranks(&mut records);
    // Stable: equal days keep table order.
    records.sort_by_key(|r| r.record.session_day);

    debug!("Normalized {} session records", records.len());
    Ok(records)
}

/// Canonical cohort code: surrounding whitespace removed and a float artifact
/// dropped from numeric codes (`"7.0"` → `"7"`, `"12.00"` → `"12"`).
/// Non-numeric codes keep their text (`"group_1.0a"` stays as is).
pub fn canonical_group_code(raw: &str) -> String {
    static FLOAT_ARTIFACT: OnceLock<Regex> = OnceLock::new();
    let re = FLOAT_ARTIFACT
        .get_or_init(|| Regex::new(r"^([+-]?\d+)\.0+$").expect("regex is valid"));
    let trimmed = raw.trim();
    match re.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

struct ColumnIndex {
    session_key: usize,
    user_key: usize,
    group_code: usize,
    registration_date: usize,
    session_day: usize,
    session_start_time: usize,
    duration_mins: usize,
    event_platform: usize,
    user_platform: usize,
    features: Vec<(Feature, usize)>,
}

impl ColumnIndex {
    fn resolve(table: &RawTable) -> Result<Self> {
        let mut missing = Vec::new();
        let mut find = |name: &str| {
            table.column_index(name).unwrap_or_else(|| {
                missing.push(name.to_string());
                usize::MAX
            })
        };

        let index = Self {
            session_key: find(SESSION_KEY),
            user_key: find(USER_KEY),
            group_code: find(GROUP_CODE),
            registration_date: find(REGISTRATION_DATE),
            session_day: find(SESSION_DAY),
            session_start_time: find(SESSION_START_TIME),
            duration_mins: find(DURATION_MINS),
            event_platform: find(EVENT_PLATFORM),
            user_platform: find(USER_PLATFORM),
            features: Feature::ALL.iter().map(|&f| (f, find(f.column()))).collect(),
        };
        if missing.is_empty() {
            Ok(index)
        } else {
            Err(InsightError::Schema { missing })
        }
    }
}

fn coerce_row(
    row: &[Option<String>],
    row_no: usize,
    columns: &ColumnIndex,
    parser: &TimestampParser,
) -> Result<SessionRecord> {
    // Short rows read as nulls past their end.
    let cell = |i: usize| row.get(i).and_then(Option::as_deref);

    let mut features = FeatureCounts::default();
    for &(feature, i) in &columns.features {
        features.set(feature, parse_count(feature.column(), row_no, cell(i))?);
    }

    Ok(SessionRecord {
        session_key: required_text(SESSION_KEY, row_no, cell(columns.session_key))?,
        user_key: required_text(USER_KEY, row_no, cell(columns.user_key))?,
        group_code: canonical_group_code(&required_text(
            GROUP_CODE,
            row_no,
            cell(columns.group_code),
        )?),
        registration_date: parse_timestamp(
            REGISTRATION_DATE,
            row_no,
            cell(columns.registration_date),
            parser,
        )?,
        session_day: parse_timestamp(SESSION_DAY, row_no, cell(columns.session_day), parser)?,
        session_start_time: parse_timestamp(
            SESSION_START_TIME,
            row_no,
            cell(columns.session_start_time),
            parser,
        )?,
        duration_mins: parse_duration(row_no, cell(columns.duration_mins))?,
        event_platform: platform(cell(columns.event_platform)),
        user_platform: platform(cell(columns.user_platform)),
        features,
    })
}

fn derive_fields(record: SessionRecord) -> NormalizedRecord {
    let start = record.session_start_time;
    NormalizedRecord {
        session_hour: start.hour(),
        session_weekday: start.weekday(),
        session_date: start.date(),
        days_since_signup: record.session_day - record.registration_date,
        session_rank: 0,
        record,
    }
}

/// Rank each user's sessions 1..N by start time; identical start times keep
/// their relative table order.
fn assign_session_ranks(records: &mut [NormalizedRecord]) {
    let mut order: Vec<usize> = (0..records.len()).collect();
    // Stable sort: ties fall back to table position.
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&records[a].record, &records[b].record);
        ra.user_key
            .cmp(&rb.user_key)
            .then(ra.session_start_time.cmp(&rb.session_start_time))
    });

    let mut previous_user: Option<usize> = None;
    let mut rank = 0u32;
    for idx in order {
        let same_user = previous_user
            .is_some_and(|p| records[p].record.user_key == records[idx].record.user_key);
        rank = if same_user { rank + 1 } else { 1 };
        records[idx].session_rank = rank;
        previous_user = Some(idx);
    }
}

fn required_text(column: &str, row: usize, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(InsightError::coercion(column, row, "", "missing value")),
    }
}

fn platform(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_PLATFORM.to_string(),
    }
}

fn parse_timestamp(
    column: &str,
    row: usize,
    value: Option<&str>,
    parser: &TimestampParser,
) -> Result<NaiveDateTime> {
    let raw = value.unwrap_or("");
    parser
        .parse(raw)
        .ok_or_else(|| InsightError::coercion(column, row, raw, "unrecognised timestamp"))
}

fn parse_duration(row: usize, value: Option<&str>) -> Result<f64> {
    let raw = value.unwrap_or("");
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(InsightError::coercion(
            DURATION_MINS,
            row,
            raw,
            "expected a non-negative number of minutes",
        )),
    }
}

/// Usage counters: empty means zero; integral floats (`"3.0"`) are accepted.
/// Values above [`MAX_COUNT`] are rejected.
fn parse_count(column: &str, row: usize, value: Option<&str>) -> Result<u64> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(0);
    };
    let parsed = raw.parse::<u64>().ok().or_else(|| match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    });
    match parsed {
        Some(n) if n <= MAX_COUNT => Ok(n),
        Some(_) => Err(InsightError::coercion(
            column,
            row,
            raw,
            format!("count exceeds {MAX_COUNT}"),
        )),
        None => Err(InsightError::coercion(
            column,
            row,
            raw,
            "expected a non-negative integer count",
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
