//! CSV ingest. Parsing is delegated to the polars CSV reader with schema inference turned
//! off, so every field arrives as text and typing is left to [`crate::coerce`].

use color_eyre::eyre::{Report, WrapErr};
use color_eyre::Result;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

use crate::config::FileLoadingConfig;
use crate::error::ExploreError;

/// A parsed but untyped table: ordered header plus one optional string per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, records }
    }

    /// Build from string slices; empty fields become `None`.
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| (!v.is_empty()).then(|| v.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.records.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() || self.headers.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    pub delimiter: Option<u8>,
}

impl CsvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

impl From<&FileLoadingConfig> for CsvOptions {
    fn from(config: &FileLoadingConfig) -> Self {
        Self {
            delimiter: config.delimiter,
        }
    }
}

fn read_options(options: &CsvOptions) -> CsvReadOptions {
    let mut read_options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0));
    if let Some(delimiter) = options.delimiter {
        read_options = read_options.map_parse_options(|opts| opts.with_separator(delimiter));
    }
    read_options
}

fn dataframe_to_raw(df: &DataFrame) -> Result<RawTable> {
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut records: Vec<Vec<Option<String>>> =
        vec![Vec::with_capacity(headers.len()); df.height()];
    for name in &headers {
        let column = df.column(name.as_str())?.cast(&DataType::String)?;
        let values = column.str()?;
        for (record, value) in records.iter_mut().zip(values.into_iter()) {
            record.push(value.map(str::to_string));
        }
    }
    Ok(RawTable { headers, records })
}

fn no_data() -> Report {
    Report::new(ExploreError::ParseFailure(
        "No data found in the CSV file".to_string(),
    ))
}

/// Parse CSV text. A file without a header or without data rows is a whole-file failure.
pub fn read_csv_bytes(bytes: Vec<u8>, options: &CsvOptions) -> Result<RawTable> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(no_data());
    }
    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options(options))
        .finish()?;
    let table = dataframe_to_raw(&df)?;
    if table.is_empty() {
        return Err(no_data());
    }
    tracing::debug!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "parsed csv"
    );
    Ok(table)
}

pub fn read_csv_str(text: &str, options: &CsvOptions) -> Result<RawTable> {
    read_csv_bytes(text.as_bytes().to_vec(), options)
}

pub fn read_csv_path(path: &Path, options: &CsvOptions) -> Result<RawTable> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    read_csv_bytes(bytes, options)
}
