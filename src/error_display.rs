//! User-facing status messages.
//!
//! Uses typed error matching (ExploreError, PolarsError variants, io::ErrorKind) rather than
//! string parsing, so the rendering layer can show the text as-is.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

use crate::error::ExploreError;

/// Status-line text for a core error.
pub fn user_message(err: &ExploreError) -> String {
    match err {
        ExploreError::ParseFailure(msg) => format!("Could not read the CSV file: {}", msg),
        ExploreError::RowCountMismatch { primary, staged } => format!(
            "Merge file has {} rows, but the loaded data has {}. Row counts must match.",
            staged, primary
        ),
        ExploreError::EmptyMerge => "Merge file contains no rows or no columns.".to_string(),
        ExploreError::DuplicateColumn(name) => format!(
            "Column '{}' already exists. Rename it or leave it unselected.",
            name
        ),
        ExploreError::NoMergeLoaded => "Load a merge file first.".to_string(),
        ExploreError::NoColumnsSelected => "Select at least one column to merge.".to_string(),
        ExploreError::NoColorData(column) => format!(
            "Column '{}' has no numeric values; using the default color.",
            column
        ),
        ExploreError::InvalidNumericInput {
            field,
            input,
            corrected,
        } => format!("'{}' is not a valid {}; using {}.", input, field, corrected),
        ExploreError::NoDataset => "Load a CSV file first.".to_string(),
        ExploreError::ColumnNotFound(name) => format!("Column not found: {}.", name),
        ExploreError::Render(msg) => format!(
            "Chart could not be drawn: {}. Try different axis selections.",
            msg
        ),
    }
}

/// Format a PolarsError raised by the CSV reader by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::ShapeMismatch(msg) => format!("Rows have inconsistent field counts: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ComputeError(msg) => format!("Malformed CSV: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Read interrupted.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find ExploreError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(ee) = cause.downcast_ref::<ExploreError>() {
            return with_path(ee.to_string());
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // Fallback: first line of display to avoid long tracebacks
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}
