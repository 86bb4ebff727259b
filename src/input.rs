//! Work file handling
//!
//! The work file is a header row followed by
//! `identity_reference, category, city[, failure_marker]` rows.
//!
//! - [`validate_input`] normalizes it once per run: malformed rows are dropped
//!   (and logged), the header is kept, and the file is rewritten in place.
//!   Running it on an already valid file reproduces the file exactly.
//! - [`load_work_items`] turns the validated rows into [`WorkItem`]s.
//! - [`mark_failures`] writes the failure marker into column 4 for the given
//!   source indices. The orchestrator never calls it; it runs on request.

use crate::checkpoint::write_atomic;
use crate::csv::{parse_rows, rows_to_string};
use crate::error::{Error, Result};
use crate::types::WorkItem;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum columns a data row needs: identity, category, city
pub const MIN_COLUMNS: usize = 3;

/// Column holding the failure marker
pub const FAILURE_MARKER_COLUMN: usize = 3;

/// Value written into the failure marker column
pub const FAILURE_MARKER: &str = "*";

/// Outcome of a validation pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Whether the file had a header row
    pub header: bool,
    /// Data rows kept
    pub kept: usize,
    /// Data rows dropped as malformed
    pub dropped: usize,
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::InputFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(parse_rows(&text))
}

fn is_valid_row(row: &[String]) -> bool {
    row.len() >= MIN_COLUMNS && !row[0].trim().is_empty()
}

/// Drop malformed rows and rewrite the work file in place
pub fn validate_input(path: &Path) -> Result<ValidationSummary> {
    let mut rows = read_rows(path)?.into_iter();
    let mut retained = Vec::new();
    let mut summary = ValidationSummary::default();

    if let Some(header) = rows.next() {
        retained.push(header);
        summary.header = true;
    }

    for (position, row) in rows.enumerate() {
        if is_valid_row(&row) {
            retained.push(row);
            summary.kept += 1;
        } else {
            tracing::warn!(
                row = position + 1,
                content = ?row,
                "Dropping malformed input row"
            );
            summary.dropped += 1;
        }
    }

    write_atomic(path, rows_to_string(&retained).as_bytes())?;
    tracing::info!(
        path = %path.display(),
        kept = summary.kept,
        dropped = summary.dropped,
        "Input file validated"
    );
    Ok(summary)
}

/// Read the work list. `source_index` is the position after the header.
pub fn load_work_items(path: &Path) -> Result<Vec<WorkItem>> {
    let items = read_rows(path)?
        .into_iter()
        .skip(1)
        .enumerate()
        .map(|(source_index, row)| {
            let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or_default();
            WorkItem::new(cell(0), cell(1), cell(2), source_index)
        })
        .collect();
    Ok(items)
}

/// Put the failure marker on the rows at `failed_indices` (source indices).
/// Returns how many rows were marked.
pub fn mark_failures(path: &Path, failed_indices: &[usize]) -> Result<usize> {
    let mut rows = read_rows(path)?;
    let mut marked = 0;

    for &index in failed_indices {
        // Row 0 is the header
        let Some(row) = index.checked_add(1).and_then(|row| rows.get_mut(row)) else {
            tracing::warn!(index, "Failed index is past the end of the input file");
            continue;
        };
        if row.len() <= FAILURE_MARKER_COLUMN {
            row.resize(FAILURE_MARKER_COLUMN + 1, String::new());
        }
        row[FAILURE_MARKER_COLUMN] = FAILURE_MARKER.to_string();
        marked += 1;
    }

    write_atomic(path, rows_to_string(&rows).as_bytes())?;
    tracing::info!(path = %path.display(), marked, "Input file failure markers updated");
    Ok(marked)
}
