//! In-memory table and the positional merge workflow.
//!
//! Rows are positionally ordered and position is the only join key. A merge is staged
//! first (row counts checked), then confirmed with a per-column include/rename list.
//! Confirm validates every selection before touching any row, so a rejected merge never
//! leaves the dataset partially updated.

use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;

use crate::coerce::{CellValue, ColumnType, TypedTable};
use crate::error::ExploreError;

static NULL_CELL: CellValue = CellValue::Null;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One row; cells are aligned with the owning table's column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `idx`, or null past the end.
    pub fn cell(&self, idx: usize) -> &CellValue {
        self.cells.get(idx).unwrap_or(&NULL_CELL)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn push(&mut self, value: CellValue) {
        self.cells.push(value);
    }

    pub(crate) fn set(&mut self, idx: usize, value: CellValue) {
        if let Some(cell) = self.cells.get_mut(idx) {
            *cell = value;
        }
    }
}

/// The primary dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Replace-style constructor used on every primary load.
    pub fn load(table: TypedTable) -> Self {
        let TypedTable { columns, mut rows } = table;
        let width = columns.len();
        for row in &mut rows {
            row.cells.resize(width, CellValue::Null);
        }
        tracing::info!(rows = rows.len(), columns = width, "dataset loaded");
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    /// Rows in `range`, clamped to the dataset.
    pub fn slice(&self, range: Range<usize>) -> &[Row] {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        &self.rows[start..end]
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r.cell(idx))
    }

    /// Every numeric (non-NaN) value of a column, in row order.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<f64>, ExploreError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| ExploreError::ColumnNotFound(column.to_string()))?;
        Ok(self
            .rows
            .iter()
            .filter_map(|r| r.cell(idx).as_number())
            .collect())
    }

    /// Hold a second table for column selection. Rows must line up one to one.
    pub fn stage_merge(&self, table: TypedTable) -> Result<MergeStaging, ExploreError> {
        if table.rows.is_empty() || table.columns.is_empty() {
            return Err(ExploreError::EmptyMerge);
        }
        if table.rows.len() != self.rows.len() {
            return Err(ExploreError::RowCountMismatch {
                primary: self.rows.len(),
                staged: table.rows.len(),
            });
        }
        tracing::debug!(columns = table.columns.len(), "merge staged");
        Ok(MergeStaging::new(table))
    }

    /// Apply a staged merge. `selections` order decides the order of appended columns.
    ///
    /// Returns the names of the columns that were added.
    pub fn confirm_merge(
        &mut self,
        staging: &MergeStaging,
        selections: &[MergeSelection],
    ) -> Result<Vec<String>, ExploreError> {
        if staging.table.rows.len() != self.rows.len() {
            return Err(ExploreError::RowCountMismatch {
                primary: self.rows.len(),
                staged: staging.table.rows.len(),
            });
        }

        // Validate everything first; nothing below this block may fail.
        let mut plan: Vec<(usize, String)> = Vec::new();
        let mut batch: HashSet<String> = HashSet::new();
        for selection in selections.iter().filter(|s| s.include) {
            let source = staging
                .table
                .column_index(&selection.column)
                .ok_or_else(|| ExploreError::ColumnNotFound(selection.column.clone()))?;
            let name = selection.effective_name().to_string();
            if self.has_column(&name) || !batch.insert(name.clone()) {
                tracing::warn!(column = %name, "merge rejected: duplicate column");
                return Err(ExploreError::DuplicateColumn(name));
            }
            plan.push((source, name));
        }
        if plan.is_empty() {
            return Err(ExploreError::NoColumnsSelected);
        }

        for (source, name) in &plan {
            for (row, staged) in self.rows.iter_mut().zip(&staging.table.rows) {
                row.push(staged.cell(*source).clone());
            }
            let kind = staging.table.columns[*source].kind;
            self.columns.push(Column::new(name.clone(), kind));
        }

        let added: Vec<String> = plan.into_iter().map(|(_, name)| name).collect();
        tracing::info!(added = ?added, "merge confirmed");
        Ok(added)
    }
}

/// Per-column merge decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSelection {
    pub column: String,
    pub include: bool,
    /// Target name; empty (after trimming) keeps the original.
    pub rename_to: String,
}

impl MergeSelection {
    pub fn include(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            include: true,
            rename_to: String::new(),
        }
    }

    pub fn renamed(column: impl Into<String>, rename_to: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            include: true,
            rename_to: rename_to.into(),
        }
    }

    pub fn effective_name(&self) -> &str {
        let renamed = self.rename_to.trim();
        if renamed.is_empty() {
            self.column.as_str()
        } else {
            renamed
        }
    }
}

/// A merge file between "load" and "confirm", with the user's per-column decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStaging {
    table: TypedTable,
    decisions: Vec<MergeSelection>,
}

impl MergeStaging {
    fn new(table: TypedTable) -> Self {
        let decisions = table
            .columns
            .iter()
            .map(|c| MergeSelection {
                column: c.name.clone(),
                include: false,
                rename_to: String::new(),
            })
            .collect();
        Self { table, decisions }
    }

    pub fn columns(&self) -> &[Column] {
        &self.table.columns
    }

    pub fn num_rows(&self) -> usize {
        self.table.rows.len()
    }

    pub fn set_include(&mut self, column: &str, include: bool) -> Result<(), ExploreError> {
        self.decision_mut(column)?.include = include;
        Ok(())
    }

    pub fn set_rename(&mut self, column: &str, rename_to: &str) -> Result<(), ExploreError> {
        self.decision_mut(column)?.rename_to = rename_to.to_string();
        Ok(())
    }

    /// Current decisions, in staged column order.
    pub fn selections(&self) -> &[MergeSelection] {
        &self.decisions
    }

    fn decision_mut(&mut self, column: &str) -> Result<&mut MergeSelection, ExploreError> {
        self.decisions
            .iter_mut()
            .find(|d| d.column == column)
            .ok_or_else(|| ExploreError::ColumnNotFound(column.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::coerce_table;
    use crate::config::CoercionConfig;
    use crate::source::RawTable;

    fn table(headers: &[&str], rows: &[&[&str]]) -> TypedTable {
        coerce_table(
            &RawTable::from_strings(headers, rows),
            &CoercionConfig::default(),
        )
    }

    fn primary() -> Dataset {
        Dataset::load(table(&["a", "b"], &[&["1", "x"], &["2", "y"]]))
    }

    #[test]
    fn load_keeps_header_order_and_types() {
        let ds = primary();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names(), vec!["a", "b"]);
        assert_eq!(ds.column("a").unwrap().kind, ColumnType::Number);
        assert_eq!(ds.column("b").unwrap().kind, ColumnType::Text);
        assert_eq!(ds.value(1, "a"), Some(&CellValue::Number(2.0)));
        assert_eq!(ds.value(5, "a"), None);
    }

    #[test]
    fn slice_is_clamped() {
        let ds = primary();
        assert_eq!(ds.slice(1..10).len(), 1);
        assert!(ds.slice(5..10).is_empty());
    }

    #[test]
    fn numeric_values_skip_non_numbers() {
        let ds = Dataset::load(table(&["v"], &[&["1"], &["x"], &[""], &["-3"]]));
        assert_eq!(ds.numeric_values("v").unwrap(), vec![1.0, -3.0]);
        assert_eq!(
            ds.numeric_values("nope"),
            Err(ExploreError::ColumnNotFound("nope".into()))
        );
    }

    #[test]
    fn stage_rejects_mismatched_and_empty_tables() {
        let ds = primary();
        let err = ds
            .stage_merge(table(&["c"], &[&["1"], &["2"], &["3"]]))
            .unwrap_err();
        assert_eq!(
            err,
            ExploreError::RowCountMismatch {
                primary: 2,
                staged: 3
            }
        );
        assert_eq!(
            ds.stage_merge(table(&["c"], &[])).unwrap_err(),
            ExploreError::EmptyMerge
        );
    }

    #[test]
    fn confirm_appends_in_selection_order() {
        let mut ds = primary();
        let staging = ds
            .stage_merge(table(&["a", "c"], &[&["10", "p"], &["20", "q"]]))
            .unwrap();
        let added = ds
            .confirm_merge(
                &staging,
                &[
                    MergeSelection::include("c"),
                    MergeSelection::renamed("a", "a2"),
                ],
            )
            .unwrap();
        assert_eq!(added, vec!["c", "a2"]);
        assert_eq!(ds.column_names(), vec!["a", "b", "c", "a2"]);
        assert_eq!(ds.value(1, "a2"), Some(&CellValue::Number(20.0)));
        assert_eq!(ds.value(0, "c"), Some(&CellValue::Text("p".into())));
        assert!(ds.rows().iter().all(|r| r.len() == 4));
    }

    #[test]
    fn confirm_is_atomic_on_collision() {
        let mut ds = primary();
        let before = ds.clone();
        let staging = ds
            .stage_merge(table(&["c", "d"], &[&["1", "2"], &["3", "4"]]))
            .unwrap();
        let err = ds
            .confirm_merge(
                &staging,
                &[MergeSelection::include("d"), MergeSelection::renamed("c", "b")],
            )
            .unwrap_err();
        assert_eq!(err, ExploreError::DuplicateColumn("b".into()));
        assert_eq!(ds, before);
    }

    #[test]
    fn confirm_rejects_batch_collisions() {
        let mut ds = primary();
        let staging = ds
            .stage_merge(table(&["c", "d"], &[&["1", "2"], &["3", "4"]]))
            .unwrap();
        let err = ds
            .confirm_merge(
                &staging,
                &[
                    MergeSelection::renamed("c", "e"),
                    MergeSelection::renamed("d", " e "),
                ],
            )
            .unwrap_err();
        assert_eq!(err, ExploreError::DuplicateColumn("e".into()));
        assert_eq!(ds.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn confirm_requires_a_selection() {
        let mut ds = primary();
        let staging = ds.stage_merge(table(&["c"], &[&["1"], &["2"]])).unwrap();
        assert_eq!(
            ds.confirm_merge(&staging, staging.selections()),
            Err(ExploreError::NoColumnsSelected)
        );
        assert_eq!(
            ds.confirm_merge(&staging, &[MergeSelection::include("zzz")]),
            Err(ExploreError::ColumnNotFound("zzz".into()))
        );
    }

    #[test]
    fn staging_decisions_are_editable() {
        let ds = primary();
        let mut staging = ds
            .stage_merge(table(&["c", "d"], &[&["1", "2"], &["3", "4"]]))
            .unwrap();
        staging.set_include("d", true).unwrap();
        staging.set_rename("d", "dee").unwrap();
        assert!(staging.set_include("zzz", true).is_err());
        let chosen: Vec<&str> = staging
            .selections()
            .iter()
            .filter(|s| s.include)
            .map(|s| s.effective_name())
            .collect();
        assert_eq!(chosen, vec!["dee"]);
    }
}
