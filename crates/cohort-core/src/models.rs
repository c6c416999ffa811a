use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Column names ──────────────────────────────────────────────────────────────

pub const USER_KEY: &str = "user_key";
pub const GROUP_CODE: &str = "group_code";
pub const SESSION_KEY: &str = "session_key";
pub const REGISTRATION_DATE: &str = "registration_date";
pub const SESSION_DAY: &str = "session_day";
pub const SESSION_START_TIME: &str = "session_start_time";
pub const DURATION_MINS: &str = "duration_mins";
pub const EVENT_PLATFORM: &str = "event_platform";
pub const USER_PLATFORM: &str = "user_platform";

/// Identity, timestamp and platform columns every input table must carry,
/// in addition to one column per [`Feature`].
pub const BASE_COLUMNS: [&str; 9] = [
    USER_KEY,
    GROUP_CODE,
    SESSION_KEY,
    REGISTRATION_DATE,
    SESSION_DAY,
    SESSION_START_TIME,
    DURATION_MINS,
    EVENT_PLATFORM,
    USER_PLATFORM,
];

/// The full required column list: [`BASE_COLUMNS`] followed by every feature
/// counter in [`Feature::ALL`] order.
pub fn required_columns() -> Vec<&'static str> {
    BASE_COLUMNS
        .iter()
        .copied()
        .chain(Feature::ALL.iter().map(|f| f.column()))
        .collect()
}

// ── Feature ───────────────────────────────────────────────────────────────────

/// A named product feature whose per-session usage is recorded as an integer
/// counter column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PlansCount,
    AccountsCount,
    BankingUsage,
    BudgetsCreated,
    BudgetingUsage,
    LibraryViews,
    LibraryBankingViews,
    LibraryBudgetingViews,
    LibraryInvestingViews,
    CreditUsage,
    DashboardVisits,
    GoalsCreated,
    GoalModuleUsage,
    InternshipSubmissions,
    InvestingUsage,
    Logins,
    OnboardingInfoCompleted,
    OnboardingAvatarDone,
    OnboardingHobbiesSet,
    OnboardingQuestionsAnswered,
    QaInteractions,
    SavingEntries,
    SettingsVisits,
    Signups,
    SummerjobUsage,
    TaxModuleUsage,
    TuitionFeesRecorded,
}

impl Feature {
    pub const COUNT: usize = 27;

    /// Every feature, in canonical column order. Ties in sorted feature views
    /// fall back to this order.
    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::PlansCount,
        Feature::AccountsCount,
        Feature::BankingUsage,
        Feature::BudgetsCreated,
        Feature::BudgetingUsage,
        Feature::LibraryViews,
        Feature::LibraryBankingViews,
        Feature::LibraryBudgetingViews,
        Feature::LibraryInvestingViews,
        Feature::CreditUsage,
        Feature::DashboardVisits,
        Feature::GoalsCreated,
        Feature::GoalModuleUsage,
        Feature::InternshipSubmissions,
        Feature::InvestingUsage,
        Feature::Logins,
        Feature::OnboardingInfoCompleted,
        Feature::OnboardingAvatarDone,
        Feature::OnboardingHobbiesSet,
        Feature::OnboardingQuestionsAnswered,
        Feature::QaInteractions,
        Feature::SavingEntries,
        Feature::SettingsVisits,
        Feature::Signups,
        Feature::SummerjobUsage,
        Feature::TaxModuleUsage,
        Feature::TuitionFeesRecorded,
    ];

    /// Position of this feature in [`Feature::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The input column carrying this feature's counter.
    pub fn column(self) -> &'static str {
        match self {
            Feature::PlansCount => "plans_count",
            Feature::AccountsCount => "accounts_count",
            Feature::BankingUsage => "banking_usage",
            Feature::BudgetsCreated => "budgets_created",
            Feature::BudgetingUsage => "budgeting_usage",
            Feature::LibraryViews => "library_views",
            Feature::LibraryBankingViews => "library_banking_views",
            Feature::LibraryBudgetingViews => "library_budgeting_views",
            Feature::LibraryInvestingViews => "library_investing_views",
            Feature::CreditUsage => "credit_usage",
            Feature::DashboardVisits => "dashboard_visits",
            Feature::GoalsCreated => "goals_created",
            Feature::GoalModuleUsage => "goal_module_usage",
            Feature::InternshipSubmissions => "internship_submissions",
            Feature::InvestingUsage => "investing_usage",
            Feature::Logins => "logins",
            Feature::OnboardingInfoCompleted => "onboarding_info_completed",
            Feature::OnboardingAvatarDone => "onboarding_avatar_done",
            Feature::OnboardingHobbiesSet => "onboarding_hobbies_set",
            Feature::OnboardingQuestionsAnswered => "onboarding_questions_answered",
            Feature::QaInteractions => "qa_interactions",
            Feature::SavingEntries => "saving_entries",
            Feature::SettingsVisits => "settings_visits",
            Feature::Signups => "signups",
            Feature::SummerjobUsage => "summerjob_usage",
            Feature::TaxModuleUsage => "tax_module_usage",
            Feature::TuitionFeesRecorded => "tuition_fees_recorded",
        }
    }

    /// Name shown to report readers: the column name minus a trailing
    /// `_count` suffix (`plans_count` → `plans`).
    pub fn display_name(self) -> &'static str {
        let column = self.column();
        column.strip_suffix("_count").unwrap_or(column)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Per-session usage counter for every [`Feature`], indexed by
/// [`Feature::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureCounts([u64; Feature::COUNT]);

impl FeatureCounts {
    pub fn get(&self, feature: Feature) -> u64 {
        self.0[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: u64) {
        self.0[feature.index()] = value;
    }

    /// `(feature, count)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, u64)> + '_ {
        Feature::ALL.iter().map(move |&f| (f, self.get(f)))
    }
}

// ── Weekdays ──────────────────────────────────────────────────────────────────

/// Calendar week in Monday-first order, independent of locale.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English weekday name (`Weekday::Mon` → `"Monday"`).
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ── RawTable ──────────────────────────────────────────────────────────────────

/// Untyped tabular input: named columns and rows of optional string cells.
///
/// `None` marks a null / empty cell. Every row has exactly `columns.len()`
/// cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with nulls or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Session records ───────────────────────────────────────────────────────────

/// One typed session row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_key: String,
    pub user_key: String,
    /// Canonical cohort identifier.
    pub group_code: String,
    pub registration_date: NaiveDateTime,
    pub session_day: NaiveDateTime,
    pub session_start_time: NaiveDateTime,
    /// Session length in minutes (never negative).
    pub duration_mins: f64,
    /// Platform the session took place on.
    pub event_platform: String,
    /// Platform the user signed up on.
    pub user_platform: String,
    pub features: FeatureCounts,
}

/// A [`SessionRecord`] with the temporal and ordering fields later stages
/// depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: SessionRecord,
    /// Hour of `session_start_time`, 0–23.
    pub session_hour: u32,
    pub session_weekday: Weekday,
    /// Date component of `session_start_time`.
    pub session_date: NaiveDate,
    /// `session_day − registration_date`. Negative only when the
    /// registration timestamp is after the session day.
    pub days_since_signup: TimeDelta,
    /// 1-based chronological position among the same user's sessions.
    pub session_rank: u32,
}

impl NormalizedRecord {
    /// Elapsed time since signup floored to whole days.
    pub fn whole_days_since_signup(&self) -> i64 {
        self.days_since_signup
            .num_seconds()
            .div_euclid(86_400)
    }
}
