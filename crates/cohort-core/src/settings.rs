use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{InsightError, Result};
use crate::time_utils::parse_timezone;

/// Churn thresholds (days) used when none are configured.
pub const DEFAULT_CHURN_THRESHOLDS: [u32; 5] = [15, 30, 45, 60, 90];

/// Features whose mean per-session usage does not exceed this are left out of
/// the average-usage view.
pub const DEFAULT_MEAN_USAGE_FLOOR: f64 = 0.01;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Cohort engagement and retention analytics over session exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cohort-insight",
    about = "Cohort engagement and retention analytics over session exports",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (stderr when absent)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze a session export and write the report
    Analyze(AnalyzeArgs),
    /// Write a synthetic session export for testing
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// CSV file, or directory searched recursively for *.csv
    #[arg(long, short)]
    pub input: PathBuf,

    /// Report destination (stdout when absent)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Churn thresholds in days, comma separated
    #[arg(long, value_delimiter = ',')]
    pub churn_thresholds: Vec<u32>,

    /// Reporting timezone (IANA name)
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// JSON analysis configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report title
    #[arg(long, default_value = "Cohort Engagement Report")]
    pub title: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Destination CSV file
    #[arg(long)]
    pub out: PathBuf,

    /// Number of distinct users
    #[arg(long, default_value_t = 50)]
    pub users: usize,

    /// Number of cohort groups users are spread over
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_groups: u32,

    /// Upper bound on sessions per user
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_sessions: u32,

    /// Random seed
    #[arg(long, default_value_t = 123)]
    pub seed: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl Settings {
    /// Parse process arguments into [`Settings`] plus the raw matches, which
    /// [`AnalysisConfig::resolve`] needs to tell explicit flags from defaults.
    pub fn parse_with_matches() -> (Self, ArgMatches) {
        Self::parse_with_matches_from(std::env::args_os())
    }

    pub fn parse_with_matches_from<I, T>(args: I) -> (Self, ArgMatches)
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Settings::command().get_matches_from(args);
        let settings = match Settings::from_arg_matches(&matches) {
            Ok(s) => s,
            Err(e) => e.exit(),
        };
        (settings, matches)
    }

    /// Effective tracing level; `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

// ── AnalysisConfig ─────────────────────────────────────────────────────────────

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Ordered churn thresholds in days; one survival curve per entry.
    pub churn_thresholds: Vec<u32>,
    /// IANA timezone session timestamps are reported in.
    pub timezone: String,
    pub mean_usage_floor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            churn_thresholds: DEFAULT_CHURN_THRESHOLDS.to_vec(),
            timezone: "UTC".to_string(),
            mean_usage_floor: DEFAULT_MEAN_USAGE_FLOOR,
        }
    }
}

impl AnalysisConfig {
    /// Load a config file. Keys absent from the file keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| InsightError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Build the effective config for `analyze`: explicit CLI flags win over
    /// the config file, which wins over defaults. The result is validated.
    pub fn resolve(args: &AnalyzeArgs, matches: &ArgMatches) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };

        let sub = matches.subcommand_matches("analyze");
        let explicit = |name: &str| sub.is_some_and(|m| is_arg_explicitly_set(m, name));

        if explicit("churn_thresholds") {
            config.churn_thresholds = args.churn_thresholds.clone();
        }
        if explicit("timezone") {
            config.timezone = args.timezone.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject empty, zero or duplicated thresholds, an unknown timezone, and a
    /// negative or non-finite usage floor.
    pub fn validate(&self) -> Result<()> {
        if self.churn_thresholds.is_empty() {
            return Err(InsightError::Config(
                "at least one churn threshold is required".to_string(),
            ));
        }
        if self.churn_thresholds.contains(&0) {
            return Err(InsightError::Config(
                "churn thresholds must be positive day counts".to_string(),
            ));
        }
        for (i, t) in self.churn_thresholds.iter().enumerate() {
            if self.churn_thresholds[..i].contains(t) {
                return Err(InsightError::Config(format!(
                    "duplicate churn threshold: {t}"
                )));
            }
        }
        if parse_timezone(&self.timezone).is_none() {
            return Err(InsightError::Config(format!(
                "unknown timezone: {}",
                self.timezone
            )));
        }
        if !self.mean_usage_floor.is_finite() || self.mean_usage_floor < 0.0 {
            return Err(InsightError::Config(format!(
                "mean usage floor must be a non-negative number, got {}",
                self.mean_usage_floor
            )));
        }
        Ok(())
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value).
fn is_arg_explicitly_set(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
