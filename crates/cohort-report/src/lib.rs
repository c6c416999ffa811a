//! Report assembly for cohort analytics.
//!
//! Turns an [`AnalysisReport`] plus caller-supplied [`Narrative`] text into a
//! finished document. Assemblers only read the plain data structures of the
//! analysis, so new output formats plug in behind [`ReportAssembler`].

pub mod formatting;
pub mod json;
pub mod markdown;
pub mod narrative;

use cohort_core::error::Result;
use cohort_core::settings::ReportFormat;
use cohort_data::analysis::AnalysisReport;

pub use json::JsonReport;
pub use markdown::MarkdownReport;
pub use narrative::{Narrative, Section, SectionText};

/// Renders an analysis report into one output document.
pub trait ReportAssembler {
    /// Conventional file extension of the output, without the dot.
    fn extension(&self) -> &'static str;

    fn assemble(&self, report: &AnalysisReport, narrative: &Narrative) -> Result<String>;
}

/// The assembler for a CLI output format.
pub fn assembler_for(format: ReportFormat) -> Box<dyn ReportAssembler> {
    match format {
        ReportFormat::Json => Box::new(JsonReport),
        ReportFormat::Markdown => Box::new(MarkdownReport),
    }
}
