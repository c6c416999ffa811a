//! Schema validation for raw session tables.

use cohort_core::error::{InsightError, Result};
use cohort_core::models::{RawTable, GROUP_CODE};
use tracing::debug;

/// Project `raw` onto `required` columns (in `required` order) and drop rows
/// without a cohort assignment.
///
/// A row is dropped when its `group_code` cell is null or blank; that is a
/// filtering rule, not an error. Every missing required column is reported in
/// a single [`InsightError::Schema`]. `raw` is left untouched.
pub fn validate(raw: &RawTable, required: &[&str]) -> Result<RawTable> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| raw.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InsightError::Schema { missing });
    }

    let indices: Vec<usize> = required
        .iter()
        .filter_map(|name| raw.column_index(name))
        .collect();
    let cohort_index = raw.column_index(GROUP_CODE);

    let mut table = RawTable::new(required.iter().map(|c| c.to_string()).collect());
    let mut dropped = 0usize;
    for row in &raw.rows {
        let has_cohort = match cohort_index {
            Some(i) => row
                .get(i)
                .and_then(Option::as_deref)
                .is_some_and(|v| !v.trim().is_empty()),
            // Not a required column for this caller: nothing to filter on.
            None => true,
        };
        if !has_cohort {
            dropped += 1;
            continue;
        }
        // Cells past a short row's end read as null.
        table.push_row(
            indices
                .iter()
                .map(|&i| row.get(i).cloned().flatten())
                .collect(),
        );
    }

    debug!(
        "Validated table: {} rows kept, {} dropped without cohort",
        table.len(),
        dropped
    );
    Ok(table)
}
