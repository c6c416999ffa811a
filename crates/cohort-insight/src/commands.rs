use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use cohort_core::settings::{AnalysisConfig, AnalyzeArgs, GenerateArgs};
use cohort_data::analysis::analyze_path;
use cohort_data::reader::write_csv;
use cohort_data::synthetic::{generate, FixtureConfig};
use cohort_report::{assembler_for, Narrative};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::info;

/// `analyze`: resolve the config, run the pipeline and write the report.
pub fn run_analyze(args: &AnalyzeArgs, matches: &ArgMatches) -> Result<()> {
    let config = AnalysisConfig::resolve(args, matches).context("invalid analysis configuration")?;
    info!(
        "Analyzing {} with churn thresholds {:?} in {}",
        args.input.display(),
        config.churn_thresholds,
        config.timezone
    );

    let report = analyze_path(&args.input, &config)
        .with_context(|| format!("analyzing {}", args.input.display()))?;

    let narrative = Narrative::default().with_title(args.title.clone());
    let assembler = assembler_for(args.format);
    let document = assembler.assemble(&report, &narrative)?;

    match &args.output {
        Some(path) => {
            write_report(path, &document)?;
            info!("Wrote {} report to {}", assembler.extension(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            if !document.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// `generate`: write a seeded synthetic export.
pub fn run_generate(args: &GenerateArgs) -> Result<()> {
    let config = FixtureConfig {
        users: args.users,
        max_groups: args.max_groups,
        max_sessions_per_user: args.max_sessions,
        ..FixtureConfig::default()
    };
    let mut rng = Pcg64::seed_from_u64(args.seed);
    let table = generate(&config, &mut rng)?;
    write_csv(&table, &args.out).with_context(|| format!("writing {}", args.out.display()))?;
    info!(
        "Wrote {} sessions to {} (seed {})",
        table.len(),
        args.out.display(),
        args.seed
    );
    Ok(())
}

fn write_report(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, document).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::settings::{Command, Settings};
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> (Settings, ArgMatches) {
        Settings::parse_with_matches_from(argv.iter().copied())
    }

    fn generate_fixture(dir: &Path) -> std::path::PathBuf {
        let out = dir.join("data").join("sessions.csv");
        let out_str = out.to_str().unwrap();
        let (settings, _) = parse(&["cohort-insight", "generate", "--out", out_str, "--users", "25"]);
        let Command::Generate(args) = &settings.command else {
            panic!("expected generate");
        };
        run_generate(args).unwrap();
        out
    }

    #[test]
    fn test_generate_writes_reproducible_csv() {
        let tmp = TempDir::new().unwrap();
        let first = std::fs::read_to_string(generate_fixture(tmp.path())).unwrap();
        let second = std::fs::read_to_string(generate_fixture(tmp.path())).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("session_key,user_key,group_code,"));
    }

    #[test]
    fn test_analyze_writes_json_report() {
        let tmp = TempDir::new().unwrap();
        generate_fixture(tmp.path());
        let data_dir = tmp.path().join("data");
        let report_path = tmp.path().join("out").join("report.json");

        let (settings, matches) = parse(&[
            "cohort-insight",
            "analyze",
            "--input",
            data_dir.to_str().unwrap(),
            "--output",
            report_path.to_str().unwrap(),
            "--churn-thresholds",
            "7,30",
            "--title",
            "Fixture report",
        ]);
        let Command::Analyze(args) = &settings.command else {
            panic!("expected analyze");
        };
        run_analyze(args, &matches).unwrap();

        let text = std::fs::read_to_string(&report_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["narrative"]["title"], "Fixture report");
        assert_eq!(value["metadata"]["distinct_users"], 25);
        assert_eq!(value["metadata"]["churn_thresholds"], serde_json::json!([7, 30]));
        assert_eq!(value["survival"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_analyze_writes_markdown_report() {
        let tmp = TempDir::new().unwrap();
        let csv = generate_fixture(tmp.path());
        let report_path = tmp.path().join("report.md");

        let (settings, matches) = parse(&[
            "cohort-insight",
            "analyze",
            "-i",
            csv.to_str().unwrap(),
            "-o",
            report_path.to_str().unwrap(),
            "--format",
            "markdown",
        ]);
        let Command::Analyze(args) = &settings.command else {
            panic!("expected analyze");
        };
        run_analyze(args, &matches).unwrap();

        let text = std::fs::read_to_string(&report_path).unwrap();
        assert!(text.starts_with("# Cohort Engagement Report\n"));
        assert!(text.contains("## Retention Curve"));
    }

    #[test]
    fn test_analyze_rejects_invalid_thresholds() {
        let tmp = TempDir::new().unwrap();
        let csv = generate_fixture(tmp.path());
        let (settings, matches) = parse(&[
            "cohort-insight",
            "analyze",
            "-i",
            csv.to_str().unwrap(),
            "--churn-thresholds",
            "30,30",
        ]);
        let Command::Analyze(args) = &settings.command else {
            panic!("expected analyze");
        };
        let err = run_analyze(args, &matches).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate churn threshold"));
    }

    #[test]
    fn test_analyze_missing_input_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let (settings, matches) = parse(&["cohort-insight", "analyze", "-i", missing.to_str().unwrap()]);
        let Command::Analyze(args) = &settings.command else {
            panic!("expected analyze");
        };
        let err = run_analyze(args, &matches).unwrap_err();
        assert!(format!("{err:#}").contains("Data path not found"));
    }
}
