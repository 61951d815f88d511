//! Error taxonomy for the exploration core.
//!
//! Every variant is recoverable: an operation that fails leaves the dataset,
//! the merge staging and the navigation window exactly as they were.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExploreError {
    /// Whole-file parse failure. Single cells never produce this; they fall back to text.
    #[error("could not parse input: {0}")]
    ParseFailure(String),

    #[error("merge file has {staged} rows but the primary dataset has {primary}")]
    RowCountMismatch { primary: usize, staged: usize },

    #[error("merge file has no rows or no columns")]
    EmptyMerge,

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("no merge file is loaded")]
    NoMergeLoaded,

    #[error("no merge columns selected")]
    NoColumnsSelected,

    #[error("column '{0}' contains no numeric values")]
    NoColorData(String),

    /// Reported after the value has already been clamped; processing continues with `corrected`.
    #[error("invalid {field} '{input}', using {corrected}")]
    InvalidNumericInput {
        field: &'static str,
        input: String,
        corrected: String,
    },

    #[error("no dataset is loaded")]
    NoDataset,

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("render failed: {0}")]
    Render(String),
}

impl ExploreError {
    /// Merge-path validation errors leave the staged table in place for correction.
    pub fn is_merge_error(&self) -> bool {
        matches!(
            self,
            Self::RowCountMismatch { .. }
                | Self::EmptyMerge
                | Self::DuplicateColumn(_)
                | Self::NoMergeLoaded
                | Self::NoColumnsSelected
        )
    }
}
