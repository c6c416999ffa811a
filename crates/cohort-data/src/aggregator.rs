//! Grouped engagement summaries over normalized session records.
//!
//! Every function is pure: it reads the records and returns its own result,
//! so any subset can be computed in any order. Counter sums saturate at
//! `u64::MAX` instead of wrapping.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use cohort_core::models::{weekday_name, Feature, NormalizedRecord, WEEK};
use serde::Serialize;

// ── Result rows ───────────────────────────────────────────────────────────────

/// Distinct users in one cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortSize {
    pub group_code: String,
    pub users: usize,
}

/// Session count for one `(cohort, signup platform, session platform)` cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceUsage {
    pub group_code: String,
    pub user_platform: String,
    pub event_platform: String,
    pub sessions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub sessions: u64,
}

/// A per-weekday total; `weekday` is the English day name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub weekday: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureEngagement {
    pub group_code: String,
    pub feature: &'static str,
    pub usage: u64,
}

/// Cohort × feature usage, restricted to features used at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureEngagementTable {
    /// Retained features in canonical order, by display name.
    pub features: Vec<&'static str>,
    /// Rows ordered by cohort code, then feature order.
    pub rows: Vec<FeatureEngagement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMean {
    pub feature: &'static str,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureTotal {
    pub feature: &'static str,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSessions {
    pub user_key: String,
    pub sessions: usize,
}

/// Raw session durations split by whether the session was the user's first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DurationSplit {
    pub first_session: Vec<f64>,
    pub later_sessions: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationPoint {
    pub date: NaiveDate,
    pub mean_duration_mins: f64,
}

/// Mean daily session duration for one cohort, ordered by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationSeries {
    pub group_code: String,
    pub points: Vec<DurationPoint>,
}

/// Every engagement summary for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementAggregates {
    pub cohort_sizes: Vec<CohortSize>,
    pub device_usage: Vec<DeviceUsage>,
    pub hourly_sessions: Vec<HourCount>,
    pub weekday_sessions: Vec<WeekdayCount>,
    pub logins_by_weekday: Vec<WeekdayCount>,
    pub feature_engagement: FeatureEngagementTable,
    pub average_feature_usage: Vec<FeatureMean>,
    pub total_feature_usage: Vec<FeatureTotal>,
    pub session_frequency: Vec<UserSessions>,
    pub first_vs_later_durations: DurationSplit,
    pub duration_over_time: Vec<DurationSeries>,
}

// ── EngagementAggregator ──────────────────────────────────────────────────────

/// Stateless helper computing the grouped summaries.
pub struct EngagementAggregator;

impl EngagementAggregator {
    /// Compute every summary. `mean_usage_floor` is the exclusive lower bound
    /// for [`Self::average_feature_usage`].
    pub fn aggregate(records: &[NormalizedRecord], mean_usage_floor: f64) -> EngagementAggregates {
        EngagementAggregates {
            cohort_sizes: Self::cohort_sizes(records),
            device_usage: Self::device_usage(records),
            hourly_sessions: Self::hourly_sessions(records),
            weekday_sessions: Self::weekday_sessions(records),
            logins_by_weekday: Self::logins_by_weekday(records),
            feature_engagement: Self::feature_engagement_by_cohort(records),
            average_feature_usage: Self::average_feature_usage(records, mean_usage_floor),
            total_feature_usage: Self::total_feature_usage(records),
            session_frequency: Self::session_frequency(records),
            first_vs_later_durations: Self::first_vs_later_durations(records),
            duration_over_time: Self::duration_over_time(records),
        }
    }

    /// Distinct users per cohort, largest first; equal sizes by cohort code.
    pub fn cohort_sizes(records: &[NormalizedRecord]) -> Vec<CohortSize> {
        let mut users: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for r in records {
            users
                .entry(r.record.group_code.as_str())
                .or_default()
                .insert(r.record.user_key.as_str());
        }

        let mut sizes: Vec<CohortSize> = users
            .into_iter()
            .map(|(code, members)| CohortSize {
                group_code: code.to_string(),
                users: members.len(),
            })
            .collect();
        // Stable over the code-ordered map.
        sizes.sort_by(|a, b| b.users.cmp(&a.users));
        sizes
    }

    /// Row counts per `(group_code, user_platform, event_platform)`, in key
    /// order.
    pub fn device_usage(records: &[NormalizedRecord]) -> Vec<DeviceUsage> {
        let mut counts: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();
        for r in records {
            let key = (
                r.record.group_code.as_str(),
                r.record.user_platform.as_str(),
                r.record.event_platform.as_str(),
            );
            *counts.entry(key).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|((group, user_platform, event_platform), sessions)| DeviceUsage {
                group_code: group.to_string(),
                user_platform: user_platform.to_string(),
                event_platform: event_platform.to_string(),
                sessions,
            })
            .collect()
    }

    /// Sessions per start hour; always 24 bins, hours 0 through 23.
    pub fn hourly_sessions(records: &[NormalizedRecord]) -> Vec<HourCount> {
        let mut bins = [0u64; 24];
        for r in records {
            bins[r.session_hour as usize % 24] += 1;
        }
        bins.iter()
            .enumerate()
            .map(|(hour, &sessions)| HourCount {
                hour: hour as u32,
                sessions,
            })
            .collect()
    }

    /// Sessions per weekday, Monday through Sunday.
    pub fn weekday_sessions(records: &[NormalizedRecord]) -> Vec<WeekdayCount> {
        Self::by_weekday(records, |_| 1)
    }

    /// Sum of the `logins` counter per weekday, Monday through Sunday.
    pub fn logins_by_weekday(records: &[NormalizedRecord]) -> Vec<WeekdayCount> {
        Self::by_weekday(records, |r| r.record.features.get(Feature::Logins))
    }

    /// Per-cohort usage of every feature whose dataset-wide total is positive.
    pub fn feature_engagement_by_cohort(records: &[NormalizedRecord]) -> FeatureEngagementTable {
        let totals = Self::feature_totals(records);
        let retained: Vec<Feature> = Feature::ALL
            .iter()
            .copied()
            .filter(|f| totals[f.index()] > 0)
            .collect();

        let mut by_cohort: BTreeMap<&str, [u64; Feature::COUNT]> = BTreeMap::new();
        for r in records {
            let sums = by_cohort
                .entry(r.record.group_code.as_str())
                .or_insert([0; Feature::COUNT]);
            for (feature, count) in r.record.features.iter() {
                let sum = &mut sums[feature.index()];
                *sum = sum.saturating_add(count);
            }
        }

        let rows = by_cohort
            .into_iter()
            .flat_map(|(code, sums)| {
                retained.iter().map(move |f| FeatureEngagement {
                    group_code: code.to_string(),
                    feature: f.display_name(),
                    usage: sums[f.index()],
                })
            })
            .collect();

        FeatureEngagementTable {
            features: retained.iter().map(|f| f.display_name()).collect(),
            rows,
        }
    }

    /// Per-feature mean over all rows, keeping means strictly above `floor`,
    /// highest first. Equal means keep canonical feature order.
    pub fn average_feature_usage(records: &[NormalizedRecord], floor: f64) -> Vec<FeatureMean> {
        if records.is_empty() {
            return Vec::new();
        }
        let totals = Self::feature_totals(records);
        let n = records.len() as f64;

        let mut means: Vec<FeatureMean> = Feature::ALL
            .iter()
            .map(|f| FeatureMean {
                feature: f.display_name(),
                mean: totals[f.index()] as f64 / n,
            })
            .filter(|m| m.mean > floor)
            .collect();
        means.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        means
    }

    /// Per-feature sum over all rows, keeping positive sums, highest first.
    pub fn total_feature_usage(records: &[NormalizedRecord]) -> Vec<FeatureTotal> {
        let totals = Self::feature_totals(records);
        let mut out: Vec<FeatureTotal> = Feature::ALL
            .iter()
            .filter(|f| totals[f.index()] > 0)
            .map(|f| FeatureTotal {
                feature: f.display_name(),
                total: totals[f.index()],
            })
            .collect();
        out.sort_by(|a, b| b.total.cmp(&a.total));
        out
    }

    /// Distinct session keys per user, ordered by user key.
    pub fn session_frequency(records: &[NormalizedRecord]) -> Vec<UserSessions> {
        let mut sessions: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for r in records {
            sessions
                .entry(r.record.user_key.as_str())
                .or_default()
                .insert(r.record.session_key.as_str());
        }
        sessions
            .into_iter()
            .map(|(user, keys)| UserSessions {
                user_key: user.to_string(),
                sessions: keys.len(),
            })
            .collect()
    }

    /// Durations of rank-1 sessions and of all later sessions, in record
    /// order.
    pub fn first_vs_later_durations(records: &[NormalizedRecord]) -> DurationSplit {
        let mut split = DurationSplit::default();
        for r in records {
            if r.session_rank == 1 {
                split.first_session.push(r.record.duration_mins);
            } else {
                split.later_sessions.push(r.record.duration_mins);
            }
        }
        split
    }

    /// Mean duration per `(session_date, cohort)`, one date-ordered series per
    /// cohort, cohorts ordered by code.
    pub fn duration_over_time(records: &[NormalizedRecord]) -> Vec<DurationSeries> {
        let mut acc: BTreeMap<&str, BTreeMap<NaiveDate, (f64, usize)>> = BTreeMap::new();
        for r in records {
            let (sum, count) = acc
                .entry(r.record.group_code.as_str())
                .or_default()
                .entry(r.session_date)
                .or_insert((0.0, 0));
            *sum += r.record.duration_mins;
            *count += 1;
        }

        acc.into_iter()
            .map(|(code, days)| DurationSeries {
                group_code: code.to_string(),
                points: days
                    .into_iter()
                    .map(|(date, (sum, count))| DurationPoint {
                        date,
                        mean_duration_mins: sum / count as f64,
                    })
                    .collect(),
            })
            .collect()
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn feature_totals(records: &[NormalizedRecord]) -> [u64; Feature::COUNT] {
        let mut totals = [0u64; Feature::COUNT];
        for r in records {
            for (feature, count) in r.record.features.iter() {
                let total = &mut totals[feature.index()];
                *total = total.saturating_add(count);
            }
        }
        totals
    }

    fn by_weekday(
        records: &[NormalizedRecord],
        value_fn: impl Fn(&NormalizedRecord) -> u64,
    ) -> Vec<WeekdayCount> {
        let mut bins = [0u64; 7];
        for r in records {
            let bin = &mut bins[r.session_weekday.num_days_from_monday() as usize];
            *bin = bin.saturating_add(value_fn(r));
        }
        WEEK.iter()
            .map(|&day| WeekdayCount {
                weekday: weekday_name(day),
                value: bins[day.num_days_from_monday() as usize],
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDateTime, Timelike};
    use cohort_core::models::{FeatureCounts, SessionRecord};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn make_record(
        group: &str,
        user: &str,
        session: &str,
        start: &str,
        duration: f64,
        rank: u32,
    ) -> NormalizedRecord {
        let start = ts(start);
        let registration = ts("2024-01-01 00:00:00");
        let day = start.date().and_hms_opt(0, 0, 0).unwrap();
        NormalizedRecord {
            record: SessionRecord {
                session_key: session.to_string(),
                user_key: user.to_string(),
                group_code: group.to_string(),
                registration_date: registration,
                session_day: day,
                session_start_time: start,
                duration_mins: duration,
                event_platform: "Mobile".to_string(),
                user_platform: "Desktop".to_string(),
                features: FeatureCounts::default(),
            },
            session_hour: start.hour(),
            session_weekday: start.weekday(),
            session_date: start.date(),
            days_since_signup: day - registration,
            session_rank: rank,
        }
    }

    fn with_features(mut r: NormalizedRecord, counts: &[(Feature, u64)]) -> NormalizedRecord {
        for &(f, v) in counts {
            r.record.features.set(f, v);
        }
        r
    }

    // ── cohort_sizes ──────────────────────────────────────────────────────────

    #[test]
    fn test_cohort_sizes_dedupes_users() {
        let records = vec![
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 5.0, 1),
            make_record("A", "u1", "s2", "2024-01-03 10:00:00", 5.0, 2),
            make_record("A", "u2", "s3", "2024-01-02 11:00:00", 5.0, 1),
            make_record("B", "u3", "s4", "2024-01-02 12:00:00", 5.0, 1),
        ];
        let sizes = EngagementAggregator::cohort_sizes(&records);
        assert_eq!(
            sizes,
            vec![
                CohortSize {
                    group_code: "A".into(),
                    users: 2
                },
                CohortSize {
                    group_code: "B".into(),
                    users: 1
                },
            ]
        );
    }

    #[test]
    fn test_cohort_sizes_ties_by_code() {
        let records = vec![
            make_record("Z", "u1", "s1", "2024-01-02 10:00:00", 5.0, 1),
            make_record("C", "u2", "s2", "2024-01-02 10:00:00", 5.0, 1),
        ];
        let codes: Vec<String> = EngagementAggregator::cohort_sizes(&records)
            .into_iter()
            .map(|c| c.group_code)
            .collect();
        assert_eq!(codes, vec!["C", "Z"]);
    }

    // ── device_usage ──────────────────────────────────────────────────────────

    #[test]
    fn test_device_usage_counts_rows() {
        let mut tablet = make_record("A", "u2", "s3", "2024-01-02 10:00:00", 5.0, 1);
        tablet.record.event_platform = "Tablet".into();
        let records = vec![
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 5.0, 1),
            make_record("A", "u1", "s2", "2024-01-03 10:00:00", 5.0, 2),
            tablet,
        ];
        let usage = EngagementAggregator::device_usage(&records);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].event_platform, "Mobile");
        assert_eq!(usage[0].sessions, 2);
        assert_eq!(usage[1].event_platform, "Tablet");
        assert_eq!(usage[1].sessions, 1);
    }

    // ── histograms ────────────────────────────────────────────────────────────

    #[test]
    fn test_hourly_sessions_has_24_bins() {
        let records = vec![
            make_record("A", "u1", "s1", "2024-01-02 23:10:00", 5.0, 1),
            make_record("A", "u1", "s2", "2024-01-03 23:40:00", 5.0, 2),
        ];
        let hours = EngagementAggregator::hourly_sessions(&records);
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[23].sessions, 2);
        assert_eq!(hours.iter().map(|h| h.sessions).sum::<u64>(), 2);
    }

    #[test]
    fn test_weekday_sessions_zero_filled_monday_first() {
        // 2024-01-03 is a Wednesday.
        let records = vec![make_record("A", "u1", "s1", "2024-01-03 10:00:00", 5.0, 1)];
        let days = EngagementAggregator::weekday_sessions(&records);
        let names: Vec<&str> = days.iter().map(|d| d.weekday).collect();
        assert_eq!(
            names,
            vec!["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
        );
        assert_eq!(days[2].value, 1);
        assert_eq!(days.iter().map(|d| d.value).sum::<u64>(), 1);

        let empty = EngagementAggregator::weekday_sessions(&[]);
        assert_eq!(empty.len(), 7);
        assert!(empty.iter().all(|d| d.value == 0));
    }

    #[test]
    fn test_logins_by_weekday_sums_counter() {
        let records = vec![
            with_features(
                make_record("A", "u1", "s1", "2024-01-01 10:00:00", 5.0, 1),
                &[(Feature::Logins, 3)],
            ),
            with_features(
                make_record("A", "u1", "s2", "2024-01-08 10:00:00", 5.0, 2),
                &[(Feature::Logins, 2)],
            ),
        ];
        let logins = EngagementAggregator::logins_by_weekday(&records);
        assert_eq!(logins[0].weekday, "Monday");
        assert_eq!(logins[0].value, 5);
        assert!(logins[1..].iter().all(|d| d.value == 0));
    }

    // ── feature usage ─────────────────────────────────────────────────────────

    #[test]
    fn test_feature_engagement_keeps_globally_used_features() {
        let records = vec![
            with_features(
                make_record("A", "u1", "s1", "2024-01-02 10:00:00", 5.0, 1),
                &[(Feature::Logins, 2), (Feature::AccountsCount, 1)],
            ),
            with_features(
                make_record("B", "u2", "s2", "2024-01-02 10:00:00", 5.0, 1),
                &[(Feature::Logins, 4)],
            ),
            with_features(
                make_record("A", "u3", "s3", "2024-01-03 10:00:00", 5.0, 1),
                &[(Feature::Logins, 1)],
            ),
        ];
        let table = EngagementAggregator::feature_engagement_by_cohort(&records);
        assert_eq!(table.features, vec!["accounts", "logins"]);
        assert_eq!(table.rows.len(), 4);

        let lookup = |code: &str, feature: &str| {
            table
                .rows
                .iter()
                .find(|r| r.group_code == code && r.feature == feature)
                .map(|r| r.usage)
        };
        assert_eq!(lookup("A", "logins"), Some(3));
        assert_eq!(lookup("B", "logins"), Some(4));
        assert_eq!(lookup("A", "accounts"), Some(1));
        // Zero for this cohort but retained: the feature is used elsewhere.
        assert_eq!(lookup("B", "accounts"), Some(0));
    }

    #[test]
    fn test_average_feature_usage_floor_and_order() {
        let mut records: Vec<NormalizedRecord> = (0..200)
            .map(|i| {
                make_record(
                    "A",
                    "u1",
                    &format!("s{i}"),
                    "2024-01-02 10:00:00",
                    5.0,
                    i + 1,
                )
            })
            .collect();
        records[0].record.features.set(Feature::Logins, 400);
        records[1].record.features.set(Feature::AccountsCount, 600);
        // Mean 0.005: below the floor.
        records[2].record.features.set(Feature::PlansCount, 1);
        // Mean exactly at the floor is excluded.
        records[3].record.features.set(Feature::DashboardVisits, 2);

        let means = EngagementAggregator::average_feature_usage(&records, 0.01);
        let names: Vec<&str> = means.iter().map(|m| m.feature).collect();
        assert_eq!(names, vec!["accounts", "logins"]);
        assert!((means[0].mean - 3.0).abs() < 1e-12);
        assert!(EngagementAggregator::average_feature_usage(&[], 0.01).is_empty());
    }

    #[test]
    fn test_total_feature_usage_positive_sorted_desc_stable() {
        let records = vec![with_features(
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 5.0, 1),
            &[
                (Feature::PlansCount, 2),
                (Feature::Logins, 7),
                (Feature::DashboardVisits, 2),
            ],
        )];
        let totals = EngagementAggregator::total_feature_usage(&records);
        let names: Vec<&str> = totals.iter().map(|t| t.feature).collect();
        // `plans` precedes `dashboard_visits` in canonical order.
        assert_eq!(names, vec!["logins", "plans", "dashboard_visits"]);
    }

    #[test]
    fn test_counter_sums_saturate() {
        let huge = u64::MAX / 2 + 1;
        let records = vec![
            with_features(
                make_record("A", "u1", "s1", "2024-01-01 10:00:00", 5.0, 1),
                &[(Feature::Logins, huge)],
            ),
            with_features(
                make_record("A", "u2", "s2", "2024-01-01 11:00:00", 5.0, 1),
                &[(Feature::Logins, huge)],
            ),
        ];

        let totals = EngagementAggregator::total_feature_usage(&records);
        assert_eq!(totals[0].total, u64::MAX);

        let engagement = EngagementAggregator::feature_engagement_by_cohort(&records);
        assert_eq!(engagement.rows[0].usage, u64::MAX);

        // 2024-01-01 is a Monday.
        let logins = EngagementAggregator::logins_by_weekday(&records);
        assert_eq!(logins[0].value, u64::MAX);
    }

    // ── sessions and durations ────────────────────────────────────────────────

    #[test]
    fn test_session_frequency_counts_distinct_keys() {
        let records = vec![
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 5.0, 1),
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 5.0, 2),
            make_record("A", "u1", "s2", "2024-01-03 10:00:00", 5.0, 3),
            make_record("A", "u2", "s3", "2024-01-03 10:00:00", 5.0, 1),
        ];
        let freq = EngagementAggregator::session_frequency(&records);
        assert_eq!(
            freq,
            vec![
                UserSessions {
                    user_key: "u1".into(),
                    sessions: 2
                },
                UserSessions {
                    user_key: "u2".into(),
                    sessions: 1
                },
            ]
        );
    }

    #[test]
    fn test_first_vs_later_durations_partition() {
        let records = vec![
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 10.0, 1),
            make_record("A", "u1", "s2", "2024-01-03 10:00:00", 20.0, 2),
            make_record("A", "u1", "s3", "2024-01-04 10:00:00", 30.0, 3),
            make_record("A", "u2", "s4", "2024-01-04 10:00:00", 40.0, 1),
        ];
        let split = EngagementAggregator::first_vs_later_durations(&records);
        assert_eq!(split.first_session, vec![10.0, 40.0]);
        assert_eq!(split.later_sessions, vec![20.0, 30.0]);
    }

    #[test]
    fn test_duration_over_time_means_per_cohort_and_date() {
        let records = vec![
            make_record("B", "u3", "s4", "2024-01-02 09:00:00", 8.0, 1),
            make_record("A", "u1", "s2", "2024-01-03 10:00:00", 30.0, 2),
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 10.0, 1),
            make_record("A", "u2", "s3", "2024-01-02 18:00:00", 20.0, 1),
        ];
        let series = EngagementAggregator::duration_over_time(&records);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].group_code, "A");
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(
            series[0].points[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!((series[0].points[0].mean_duration_mins - 15.0).abs() < 1e-12);
        assert!((series[0].points[1].mean_duration_mins - 30.0).abs() < 1e-12);
        assert_eq!(series[1].group_code, "B");
        assert_eq!(series[1].points.len(), 1);
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_empty_input() {
        let all = EngagementAggregator::aggregate(&[], 0.01);
        assert!(all.cohort_sizes.is_empty());
        assert!(all.device_usage.is_empty());
        assert_eq!(all.hourly_sessions.len(), 24);
        assert_eq!(all.weekday_sessions.len(), 7);
        assert_eq!(all.logins_by_weekday.len(), 7);
        assert!(all.feature_engagement.rows.is_empty());
        assert!(all.average_feature_usage.is_empty());
        assert!(all.total_feature_usage.is_empty());
        assert!(all.session_frequency.is_empty());
        assert!(all.first_vs_later_durations.first_session.is_empty());
        assert!(all.duration_over_time.is_empty());
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let records = vec![
            make_record("A", "u1", "s1", "2024-01-02 10:00:00", 10.0, 1),
            make_record("B", "u2", "s2", "2024-01-03 12:00:00", 20.0, 1),
        ];
        let first = EngagementAggregator::aggregate(&records, 0.01);
        let second = EngagementAggregator::aggregate(&records, 0.01);
        assert_eq!(first, second);
    }
}
