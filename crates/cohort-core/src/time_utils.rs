use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use tracing::warn;

/// Naive patterns tried after RFC 3339, most specific first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// ── TimestampParser ───────────────────────────────────────────────────────────

/// Parses session timestamps into naive local time of a reporting timezone.
///
/// Values that carry an explicit offset (`Z`, `+02:00`) are converted into
/// the reporting timezone; naive values are assumed to already be local to it.
/// Hour-of-day and weekday derivations downstream read the local wall clock.
#[derive(Debug, Clone, Copy)]
pub struct TimestampParser {
    tz: Tz,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl TimestampParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build a parser from an IANA timezone name.
    ///
    /// Falls back to UTC and logs a warning for unrecognised names; callers
    /// that must reject bad names validate with [`parse_timezone`] first.
    pub fn from_name(tz_name: &str) -> Self {
        let tz = parse_timezone(tz_name).unwrap_or_else(|| {
            warn!(
                "TimestampParser: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse `s` into a naive local timestamp. Returns `None` for empty or
    /// unrecognised input.
    ///
    /// ```
    /// use cohort_core::time_utils::TimestampParser;
    ///
    /// let parser = TimestampParser::default();
    /// let ts = parser.parse("2024-03-05 14:30:00").unwrap();
    /// assert_eq!(ts.to_string(), "2024-03-05 14:30:00");
    /// assert!(parser.parse("last tuesday").is_none());
    /// ```
    pub fn parse(&self, s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&self.tz).naive_local());
        }
        // RFC 3339 demands a 'T'; accept the space-separated variant too.
        if let Ok(dt) = DateTime::parse_from_str(&normalised, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(dt.with_timezone(&self.tz).naive_local());
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        None
    }
}

/// Parse an IANA timezone name (`"Europe/Berlin"`, `"UTC"`).
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
