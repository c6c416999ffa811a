//! Markdown documents: a title page, a table of contents and one section per
//! analysis output.

use std::collections::BTreeMap;
use std::fmt::Write;

use cohort_core::error::{InsightError, Result};
use cohort_data::aggregator::EngagementAggregates;
use cohort_data::analysis::AnalysisReport;
use cohort_data::retention::ThresholdCurve;
use tracing::debug;

use crate::formatting::{format_count, format_minutes, format_number, format_probability};
use crate::narrative::{Narrative, Section};
use crate::ReportAssembler;

/// Days at which every survival curve is sampled in the retention table.
pub const RETENTION_CHECKPOINTS: [u64; 4] = [30, 90, 180, 365];

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReport;

impl ReportAssembler for MarkdownReport {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn assemble(&self, report: &AnalysisReport, narrative: &Narrative) -> Result<String> {
        let mut out = String::new();
        write_document(&mut out, report, narrative)
            .map_err(|e| InsightError::Other(anyhow::anyhow!("formatting report: {e}")))?;
        debug!("Assembled markdown report: {} bytes", out.len());
        Ok(out)
    }
}

// ── Document ──────────────────────────────────────────────────────────────────

fn write_document(out: &mut String, report: &AnalysisReport, narrative: &Narrative) -> std::fmt::Result {
    let meta = &report.metadata;
    writeln!(out, "# {}\n", narrative.title)?;
    writeln!(out, "{}\n", narrative.introduction)?;
    writeln!(
        out,
        "_{} sessions from {} users in {} cohorts. Generated {} ({})._\n",
        format_count(meta.records_normalized as u64),
        format_count(meta.distinct_users as u64),
        format_count(meta.cohorts as u64),
        meta.generated_at,
        meta.timezone,
    )?;

    writeln!(out, "## Contents\n")?;
    for section in Section::ALL {
        let text = narrative.section(section);
        writeln!(out, "- [{}](#{})", text.title, section.anchor())?;
    }
    writeln!(out)?;

    for section in Section::ALL {
        let text = narrative.section(section);
        writeln!(out, "<a id=\"{}\"></a>\n", section.anchor())?;
        writeln!(out, "## {}\n", text.title)?;
        writeln!(out, "{}\n", text.description)?;
        write_section(out, section, report)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_section(out: &mut String, section: Section, report: &AnalysisReport) -> std::fmt::Result {
    let agg: &EngagementAggregates = &report.aggregates;
    match section {
        Section::UsersPerCohort => {
            let rows = agg
                .cohort_sizes
                .iter()
                .map(|c| vec![c.group_code.clone(), format_count(c.users as u64)]);
            table(out, &["Cohort", "Users"], rows)
        }
        Section::DeviceUsage => {
            let rows = agg.device_usage.iter().map(|d| {
                vec![
                    d.group_code.clone(),
                    d.user_platform.clone(),
                    d.event_platform.clone(),
                    format_count(d.sessions as u64),
                ]
            });
            table(out, &["Cohort", "Signup platform", "Session platform", "Sessions"], rows)
        }
        Section::HourlyActivity => {
            let rows = agg
                .hourly_sessions
                .iter()
                .map(|h| vec![format!("{:02}:00", h.hour), format_count(h.sessions)]);
            table(out, &["Hour", "Sessions"], rows)
        }
        Section::WeekdayActivity => {
            let rows = agg
                .weekday_sessions
                .iter()
                .map(|d| vec![d.weekday.to_string(), format_count(d.value)]);
            table(out, &["Weekday", "Sessions"], rows)
        }
        Section::LoginsByWeekday => {
            let rows = agg
                .logins_by_weekday
                .iter()
                .map(|d| vec![d.weekday.to_string(), format_count(d.value)]);
            table(out, &["Weekday", "Logins"], rows)
        }
        Section::FeatureEngagement => feature_matrix(out, agg),
        Section::AverageFeatureUsage => {
            let rows = agg
                .average_feature_usage
                .iter()
                .map(|m| vec![m.feature.to_string(), format_number(m.mean, 3)]);
            table(out, &["Feature", "Mean per session"], rows)
        }
        Section::TotalFeatureUsage => {
            let rows = agg
                .total_feature_usage
                .iter()
                .map(|t| vec![t.feature.to_string(), format_count(t.total)]);
            table(out, &["Feature", "Total uses"], rows)
        }
        Section::SessionFrequency => {
            // Users per session count: the raw per-user list can be long.
            let mut histogram: BTreeMap<usize, u64> = BTreeMap::new();
            for user in &agg.session_frequency {
                *histogram.entry(user.sessions).or_insert(0) += 1;
            }
            let rows = histogram
                .into_iter()
                .map(|(sessions, users)| vec![sessions.to_string(), format_count(users)]);
            table(out, &["Sessions", "Users"], rows)
        }
        Section::FirstVsLaterSessions => {
            let split = &agg.first_vs_later_durations;
            let rows = [
                ("First session", &split.first_session),
                ("Later sessions", &split.later_sessions),
            ]
            .into_iter()
            .map(|(label, values)| summary_row(label, values));
            table(out, &["Sessions", "Count", "Mean", "Median", "Min", "Max"], rows)
        }
        Section::DurationOverTime => {
            let rows = agg.duration_over_time.iter().map(|series| {
                let means: Vec<f64> = series.points.iter().map(|p| p.mean_duration_mins).collect();
                let first = series.points.first().map(|p| p.date.to_string()).unwrap_or_default();
                let last = series.points.last().map(|p| p.date.to_string()).unwrap_or_default();
                vec![
                    series.group_code.clone(),
                    format_count(series.points.len() as u64),
                    first,
                    last,
                    format_minutes(mean(&means).unwrap_or(0.0)),
                ]
            });
            table(out, &["Cohort", "Active days", "First day", "Last day", "Mean of daily means"], rows)
        }
        Section::Retention => retention_table(out, &report.survival),
    }
}

// ── Section helpers ───────────────────────────────────────────────────────────

/// Cohorts as rows, retained features as columns.
fn feature_matrix(out: &mut String, agg: &EngagementAggregates) -> std::fmt::Result {
    let engagement = &agg.feature_engagement;
    let mut by_cohort: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for row in &engagement.rows {
        by_cohort
            .entry(row.group_code.as_str())
            .or_default()
            .insert(row.feature, row.usage);
    }

    let mut headers = vec!["Cohort"];
    headers.extend(engagement.features.iter().copied());
    let rows = by_cohort.into_iter().map(|(code, usage)| {
        let mut cells = vec![code.to_string()];
        cells.extend(
            engagement
                .features
                .iter()
                .map(|f| format_count(usage.get(f).copied().unwrap_or(0))),
        );
        cells
    });
    table(out, &headers, rows)
}

fn retention_table(out: &mut String, curves: &[ThresholdCurve]) -> std::fmt::Result {
    let mut headers: Vec<String> = ["Threshold", "Observations", "Events", "Median survival"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(RETENTION_CHECKPOINTS.iter().map(|d| format!("S({d}d)")));
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

    let rows = curves.iter().map(|fitted| {
        let events: usize = fitted.curve.points.iter().map(|p| p.events).sum();
        let mut cells = vec![
            format!("{} days", fitted.threshold_days),
            format_count(fitted.curve.observations() as u64),
            format_count(events as u64),
            fitted
                .median_survival_days
                .map_or_else(|| "not reached".to_string(), |d| format!("{d} days")),
        ];
        cells.extend(
            RETENTION_CHECKPOINTS
                .iter()
                .map(|&day| format_probability(fitted.curve.survival_at(day))),
        );
        cells
    });
    table(out, &header_refs, rows)
}

fn summary_row(label: &str, values: &[f64]) -> Vec<String> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), format_minutes);
    vec![
        label.to_string(),
        format_count(values.len() as u64),
        cell(mean(values)),
        cell(median(&sorted)),
        cell(sorted.first().copied()),
        cell(sorted.last().copied()),
    ]
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median of an ascending slice.
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// GitHub-flavoured table. An empty row set renders a placeholder line.
fn table<I>(out: &mut String, headers: &[&str], rows: I) -> std::fmt::Result
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return writeln!(out, "_No data._");
    }
    writeln!(out, "| {} |", headers.join(" | "))?;
    writeln!(out, "|{}", "---|".repeat(headers.len()))?;
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
        writeln!(out, "| {} |", cells.join(" | "))?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::models::{required_columns, RawTable};
    use cohort_core::settings::AnalysisConfig;
    use cohort_data::analysis::analyze_table;
    use cohort_data::synthetic::{generate, FixtureConfig};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn sample_report() -> AnalysisReport {
        let raw = generate(&FixtureConfig::default(), &mut Pcg64::seed_from_u64(11)).unwrap();
        analyze_table(&raw, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_markdown_has_every_section_in_order() {
        let report = sample_report();
        let text = MarkdownReport
            .assemble(&report, &Narrative::default().with_title("Weekly cohorts"))
            .unwrap();

        assert!(text.starts_with("# Weekly cohorts\n"));
        let mut last = 0;
        for section in Section::ALL {
            let heading = format!("## {}\n", section.default_text().title);
            let pos = text.find(&heading).unwrap_or_else(|| panic!("missing {heading}"));
            assert!(pos > last);
            last = pos;
            assert!(text.contains(&format!("](#{})", section.anchor())));
        }
        assert!(text.contains("| Monday |"));
        assert!(text.contains("| 15 days |"));
    }

    #[test]
    fn test_markdown_empty_report_uses_placeholders() {
        let raw = RawTable::new(required_columns().iter().map(|c| c.to_string()).collect());
        let report = analyze_table(&raw, &AnalysisConfig::default()).unwrap();
        let text = MarkdownReport.assemble(&report, &Narrative::default()).unwrap();
        assert!(text.contains("_No data._"));
        // Fixed-size histograms still render.
        assert!(text.contains("| 23:00 | 0 |"));
        assert!(text.contains("not reached"));
    }

    #[test]
    fn test_table_escapes_pipes() {
        let mut out = String::new();
        table(&mut out, &["A"], vec![vec!["x|y".to_string()]]).unwrap();
        assert_eq!(out, "| A |\n|---|\n| x\\|y |\n");
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1.0, 3.0, 9.0]), Some(3.0));
        assert_eq!(median(&[1.0, 3.0]), Some(2.0));
    }
}
