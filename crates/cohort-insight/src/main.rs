mod bootstrap;
mod commands;

use anyhow::Result;
use cohort_core::settings::{Command, Settings};

fn main() -> Result<()> {
    let (settings, matches) = Settings::parse_with_matches();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;

    tracing::info!("cohort-insight v{} starting", env!("CARGO_PKG_VERSION"));

    match &settings.command {
        Command::Analyze(args) => commands::run_analyze(args, &matches),
        Command::Generate(args) => commands::run_generate(args),
    }
}
