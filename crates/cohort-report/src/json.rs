//! Pretty-printed JSON documents.

use cohort_core::error::Result;
use cohort_data::analysis::AnalysisReport;
use serde::Serialize;
use tracing::debug;

use crate::narrative::Narrative;
use crate::ReportAssembler;

/// Writes the narrative next to the full analysis bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

#[derive(Serialize)]
struct Document<'a> {
    narrative: &'a Narrative,
    #[serde(flatten)]
    report: &'a AnalysisReport,
}

impl ReportAssembler for JsonReport {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn assemble(&self, report: &AnalysisReport, narrative: &Narrative) -> Result<String> {
        let json = serde_json::to_string_pretty(&Document { narrative, report })?;
        debug!("Assembled JSON report: {} bytes", json.len());
        Ok(json)
    }
}
