//! Caller-supplied report text: the document title and per-section headings
//! and descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One report section per analysis output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    UsersPerCohort,
    DeviceUsage,
    HourlyActivity,
    WeekdayActivity,
    LoginsByWeekday,
    FeatureEngagement,
    AverageFeatureUsage,
    TotalFeatureUsage,
    SessionFrequency,
    FirstVsLaterSessions,
    DurationOverTime,
    Retention,
}

impl Section {
    /// Sections in report order.
    pub const ALL: [Section; 12] = [
        Section::UsersPerCohort,
        Section::DeviceUsage,
        Section::HourlyActivity,
        Section::WeekdayActivity,
        Section::LoginsByWeekday,
        Section::FeatureEngagement,
        Section::AverageFeatureUsage,
        Section::TotalFeatureUsage,
        Section::SessionFrequency,
        Section::FirstVsLaterSessions,
        Section::DurationOverTime,
        Section::Retention,
    ];

    /// Stable anchor used for in-document links.
    pub fn anchor(self) -> &'static str {
        match self {
            Section::UsersPerCohort => "users-per-cohort",
            Section::DeviceUsage => "device-usage",
            Section::HourlyActivity => "hourly-activity",
            Section::WeekdayActivity => "weekday-activity",
            Section::LoginsByWeekday => "logins-by-weekday",
            Section::FeatureEngagement => "feature-engagement",
            Section::AverageFeatureUsage => "average-feature-usage",
            Section::TotalFeatureUsage => "total-feature-usage",
            Section::SessionFrequency => "session-frequency",
            Section::FirstVsLaterSessions => "first-vs-later-sessions",
            Section::DurationOverTime => "duration-over-time",
            Section::Retention => "retention",
        }
    }

    /// Built-in heading and description.
    pub fn default_text(self) -> SectionText {
        let (title, description) = match self {
            Section::UsersPerCohort => (
                "Users per Cohort",
                "Distinct users in each cohort, largest first. A user is counted once per cohort however many sessions they have.",
            ),
            Section::DeviceUsage => (
                "Device Usage",
                "Sessions per cohort broken down by the platform users signed up on and the platform each session ran on.",
            ),
            Section::HourlyActivity => (
                "Hourly Activity",
                "Sessions by hour of day of their start time, in the reporting timezone.",
            ),
            Section::WeekdayActivity => (
                "Weekday Activity",
                "Sessions by day of week, Monday through Sunday.",
            ),
            Section::LoginsByWeekday => (
                "Logins by Weekday",
                "Total login events by day of week, summed over all sessions.",
            ),
            Section::FeatureEngagement => (
                "Feature Engagement",
                "Usage of each feature per cohort. Features nobody used are left out.",
            ),
            Section::AverageFeatureUsage => (
                "Repeat Feature Usage",
                "Average uses per session of each feature, for features above the usage floor.",
            ),
            Section::TotalFeatureUsage => (
                "Feature Usage Distribution",
                "Total uses of each feature across all sessions, most used first.",
            ),
            Section::SessionFrequency => (
                "Session Frequency",
                "How many users had a given number of distinct sessions.",
            ),
            Section::FirstVsLaterSessions => (
                "First vs. Later Sessions",
                "Duration of each user's first session compared with all of their later sessions.",
            ),
            Section::DurationOverTime => (
                "Session Duration Over Time",
                "Mean daily session duration per cohort over the observed date range.",
            ),
            Section::Retention => (
                "Retention Curve",
                "Kaplan-Meier survival estimates by days since signup, one curve per churn threshold. Sessions on or before the signup day are excluded.",
            ),
        };
        SectionText {
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionText {
    pub title: String,
    pub description: String,
}

/// Titles and descriptions for one report.
///
/// Sections without an override use [`Section::default_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub title: String,
    pub introduction: String,
    #[serde(default)]
    pub sections: BTreeMap<Section, SectionText>,
}

impl Default for Narrative {
    fn default() -> Self {
        Self {
            title: "Cohort Engagement Report".to_string(),
            introduction: "Engagement, feature usage and retention of user cohorts, computed from per-session activity records.".to_string(),
            sections: BTreeMap::new(),
        }
    }
}

impl Narrative {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Override the text of one section.
    pub fn with_section(
        mut self,
        section: Section,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.sections.insert(
            section,
            SectionText {
                title: title.into(),
                description: description.into(),
            },
        );
        self
    }

    /// Effective text of `section`.
    pub fn section(&self, section: Section) -> SectionText {
        self.sections
            .get(&section)
            .cloned()
            .unwrap_or_else(|| section.default_text())
    }
}
