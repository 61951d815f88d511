//! Per-cell type inference: raw CSV strings become tagged values.
//!
//! Each cell is classified on its own, in order: empty → null, `YYYY-MM-DD HH:MM:SS` →
//! date-time, `YYYY-MM-DD` → date, a full-string numeric literal → number, anything
//! else stays as its original text. Text is a valid terminal type, not an error.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::config::CoercionConfig;
use crate::dataset::{Column, Row};
use crate::source::RawTable;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Formats tried before the regex and token fallbacks when reading a time column.
const TIME_COLUMN_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Semantic type tag of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    DateTime,
    Date,
    Number,
    Text,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Number => "number",
            Self::Text => "text",
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::DateTime | Self::Date)
    }

    /// Column tag from its cells. One tag wins outright; Date mixed with DateTime widens to
    /// DateTime; any other mix, or an all-null column, is Text.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut seen: Option<ColumnType> = None;
        for cell in cells {
            let Some(tag) = cell.tag() else {
                continue;
            };
            seen = match (seen, tag) {
                (None, t) => Some(t),
                (Some(a), b) if a == b => Some(a),
                (Some(Self::Date), Self::DateTime) | (Some(Self::DateTime), Self::Date) => {
                    Some(Self::DateTime)
                }
                _ => return Self::Text,
            };
        }
        seen.unwrap_or(Self::Text)
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Null,
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn tag(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::DateTime(_) => Some(ColumnType::DateTime),
            Self::Date(_) => Some(ColumnType::Date),
            Self::Number(_) => Some(ColumnType::Number),
            Self::Text(_) => Some(ColumnType::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// Position on a continuous axis: numbers as-is, temporal values as epoch milliseconds.
    pub fn as_plot_value(&self) -> Option<f64> {
        match self {
            Self::Number(_) => self.as_number(),
            Self::DateTime(_) | Self::Date(_) => self
                .as_datetime()
                .map(|dt| dt.and_utc().timestamp_millis() as f64),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Rows and columns after coercion, ready to become (or merge into) a Dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl TypedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

fn numeric_literal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid numeric regex")
    })
}

fn strict_temporal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}(?: \d{2}:\d{2}:\d{2})?$").expect("valid temporal regex")
    })
}

fn embedded_datetime() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})[ T](\d{1,2}):(\d{1,2}):(\d{1,2})")
            .expect("valid datetime regex")
    })
}

fn token_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\-:/]+").expect("valid separator regex"))
}

/// Classify one raw cell.
pub fn coerce_cell(raw: Option<&str>) -> CellValue {
    let Some(raw) = raw else {
        return CellValue::Null;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    // chrono's %Y/%m/%d also take short fields, so the shape is checked first.
    if strict_temporal().is_match(trimmed) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT) {
            return CellValue::DateTime(dt);
        }
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return CellValue::Date(d);
        }
    }
    if numeric_literal().is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return CellValue::Number(n);
        }
    }
    CellValue::Text(raw.to_string())
}

fn build_datetime(parts: &[i64]) -> Option<NaiveDateTime> {
    let get = |i: usize| parts.get(i).copied().unwrap_or(0);
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(get(0)).ok()?,
        u32::try_from(get(1)).ok()?,
        u32::try_from(get(2)).ok()?,
    )?;
    date.and_hms_opt(
        u32::try_from(get(3)).ok()?,
        u32::try_from(get(4)).ok()?,
        u32::try_from(get(5)).ok()?,
    )
}

/// Lenient date-time reading used for dedicated time columns.
///
/// Standard formats first, then a `YYYY-MM-DD HH:MM:SS` pattern found anywhere in the
/// string, then the first numeric tokens (split on whitespace, `-`, `:` and `/`) read
/// positionally as year, month, day, hour, minute, second. At least year, month and day
/// are required; missing time components are zero.
pub fn parse_time_fallback(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in TIME_COLUMN_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    if let Some(caps) = embedded_datetime().captures(trimmed) {
        let parts: Vec<i64> = (1..=6)
            .filter_map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
            .collect();
        if let Some(dt) = build_datetime(&parts) {
            return Some(dt);
        }
    }

    let tokens: Vec<i64> = token_separators()
        .split(trimmed)
        .filter_map(|t| t.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
        .take(6)
        .collect();
    if tokens.len() < 3 {
        return None;
    }
    build_datetime(&tokens)
}

type Derive = fn(&NaiveDateTime) -> CellValue;

fn formatted(dt: &NaiveDateTime) -> CellValue {
    CellValue::Text(dt.format(DATETIME_FORMAT).to_string())
}

fn date_only(dt: &NaiveDateTime) -> CellValue {
    CellValue::Text(dt.format(DATE_FORMAT).to_string())
}

fn time_only(dt: &NaiveDateTime) -> CellValue {
    CellValue::Text(dt.format(TIME_FORMAT).to_string())
}

fn epoch_millis(dt: &NaiveDateTime) -> CellValue {
    CellValue::Number(dt.and_utc().timestamp_millis() as f64)
}

fn derived_time_columns(header: &str) -> [(String, Derive); 4] {
    [
        (format!("{}_formatted", header), formatted as Derive),
        (format!("{}_date", header), date_only as Derive),
        (format!("{}_time", header), time_only as Derive),
        (format!("{}_timestamp", header), epoch_millis as Derive),
    ]
}

/// Coerce a whole raw table. Cells of time columns that only the lenient parser can read
/// become date-times. Time columns named in the config get four derived columns appended
/// (display string, date, time of day, epoch milliseconds), computed once per row.
pub fn coerce_table(raw: &RawTable, config: &CoercionConfig) -> TypedTable {
    let width = raw.headers.len();
    let mut rows: Vec<Row> = raw
        .records
        .iter()
        .map(|record| {
            Row::new(
                (0..width)
                    .map(|i| coerce_cell(record.get(i).and_then(|c| c.as_deref())))
                    .collect(),
            )
        })
        .collect();
    let mut names = raw.headers.clone();

    for (idx, header) in raw.headers.iter().enumerate() {
        if !config.is_time_column(header) {
            continue;
        }
        let stamps: Vec<Option<NaiveDateTime>> = rows
            .iter_mut()
            .zip(&raw.records)
            .map(|(row, record)| {
                if let Some(dt) = row.cell(idx).as_datetime() {
                    return Some(dt);
                }
                let parsed = record
                    .get(idx)
                    .and_then(|c| c.as_deref())
                    .and_then(parse_time_fallback);
                if let Some(dt) = parsed {
                    row.set(idx, CellValue::DateTime(dt));
                }
                parsed
            })
            .collect();
        if config.derive_time_columns {
            for (name, derive) in derived_time_columns(header) {
                if names.contains(&name) {
                    tracing::debug!(column = %name, "derived time column already present, skipping");
                    continue;
                }
                for (row, stamp) in rows.iter_mut().zip(&stamps) {
                    row.push(stamp.as_ref().map(derive).unwrap_or(CellValue::Null));
                }
                names.push(name);
            }
        }
    }

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let kind = ColumnType::infer(rows.iter().map(|r| r.cell(i)));
            Column::new(name, kind)
        })
        .collect();

    TypedTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn coerce_cell_classifies_in_order() {
        assert_eq!(coerce_cell(None), CellValue::Null);
        assert_eq!(coerce_cell(Some("")), CellValue::Null);
        assert_eq!(coerce_cell(Some("   ")), CellValue::Null);
        assert_eq!(
            coerce_cell(Some("2024-01-01 01:02:03")),
            CellValue::DateTime(dt(2024, 1, 1, 1, 2, 3))
        );
        assert_eq!(
            coerce_cell(Some("2024-02-29")),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(coerce_cell(Some(" -2.5 ")), CellValue::Number(-2.5));
        assert_eq!(coerce_cell(Some("1e3")), CellValue::Number(1000.0));
        assert_eq!(coerce_cell(Some(".5")), CellValue::Number(0.5));
        assert_eq!(coerce_cell(Some("abc")), CellValue::Text("abc".into()));
    }

    #[test]
    fn prefix_numeric_stays_text() {
        assert_eq!(coerce_cell(Some("12abc")), CellValue::Text("12abc".into()));
        assert_eq!(coerce_cell(Some("1.2.3")), CellValue::Text("1.2.3".into()));
        assert_eq!(coerce_cell(Some("NaN")), CellValue::Text("NaN".into()));
    }

    #[test]
    fn invalid_calendar_date_is_text() {
        assert_eq!(
            coerce_cell(Some("2023-02-30")),
            CellValue::Text("2023-02-30".into())
        );
    }

    #[test]
    fn short_hyphenated_codes_stay_text() {
        for code in ["5-6-7", "12-03-04", "2024-1-5", "2024-01-05 1:02:03"] {
            assert_eq!(coerce_cell(Some(code)), CellValue::Text(code.into()), "{}", code);
        }
    }

    #[test]
    fn fallback_time_cell_becomes_datetime() {
        let raw = RawTable::from_strings(
            &["time"],
            &[&["2024/01/02 03:04:05"], &["2024-01-03 00:00:00"]],
        );
        let table = coerce_table(&raw, &CoercionConfig::default());
        assert_eq!(
            table.rows[0].cell(0),
            &CellValue::DateTime(dt(2024, 1, 2, 3, 4, 5))
        );
        assert_eq!(table.columns[0].kind, ColumnType::DateTime);
        assert_eq!(table.rows[0].cell(4), &CellValue::Number(1_704_164_645_000.0));
    }

    #[test]
    fn fallback_reads_embedded_and_tokenized_times() {
        assert_eq!(
            parse_time_fallback("2024-03-04T05:06:07"),
            Some(dt(2024, 3, 4, 5, 6, 7))
        );
        assert_eq!(
            parse_time_fallback("ts=2024-03-04 05:06:07 UTC"),
            Some(dt(2024, 3, 4, 5, 6, 7))
        );
        assert_eq!(
            parse_time_fallback("2024/3/4 5:6:7"),
            Some(dt(2024, 3, 4, 5, 6, 7))
        );
        assert_eq!(
            parse_time_fallback("2024 03 04"),
            Some(dt(2024, 3, 4, 0, 0, 0))
        );
        assert_eq!(parse_time_fallback("yesterday"), None);
        assert_eq!(parse_time_fallback("2024-13-40 00:00:00"), None);
    }

    #[test]
    fn column_type_inference() {
        let d = CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let t = CellValue::DateTime(dt(2024, 1, 1, 0, 0, 0));
        let n = CellValue::Number(1.0);
        assert_eq!(
            ColumnType::infer([&n, &CellValue::Null, &n]),
            ColumnType::Number
        );
        assert_eq!(ColumnType::infer([&d, &t]), ColumnType::DateTime);
        assert_eq!(ColumnType::infer([&d, &n]), ColumnType::Text);
        assert_eq!(ColumnType::infer([&CellValue::Null]), ColumnType::Text);
    }

    #[test]
    fn display_formats_integers_without_fraction() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(-0.25).to_string(), "-0.25");
        assert_eq!(CellValue::Null.to_string(), "");
    }

    #[test]
    fn time_column_gets_derived_columns() {
        let raw = RawTable::from_strings(
            &["Time", "v"],
            &[&["2024-01-01 00:00:00", "1"], &["junk", "2"]],
        );
        let table = coerce_table(&raw, &CoercionConfig::default());
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Time",
                "v",
                "Time_formatted",
                "Time_date",
                "Time_time",
                "Time_timestamp"
            ]
        );
        let first = &table.rows[0];
        assert_eq!(first.cell(3), &CellValue::Text("2024-01-01".into()));
        assert_eq!(first.cell(4), &CellValue::Text("00:00:00".into()));
        assert_eq!(first.cell(5), &CellValue::Number(1_704_067_200_000.0));
        assert!(table.rows[1].cell(2).is_null());
        assert_eq!(table.columns[5].kind, ColumnType::Number);
    }

    #[test]
    fn derived_columns_disabled() {
        let raw = RawTable::from_strings(&["time"], &[&["2024-01-01 00:00:00"]]);
        let config = CoercionConfig {
            derive_time_columns: false,
            ..CoercionConfig::default()
        };
        let table = coerce_table(&raw, &config);
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.columns[0].kind, ColumnType::DateTime);
    }

    #[test]
    fn ragged_records_are_padded_with_nulls() {
        let raw = RawTable::from_strings(&["a", "b"], &[&["1"], &["2", "x"]]);
        let table = coerce_table(&raw, &CoercionConfig::default());
        assert!(table.rows[0].cell(1).is_null());
        assert_eq!(table.rows[1].cell(1), &CellValue::Text("x".into()));
        assert_eq!(table.columns[1].kind, ColumnType::Text);
    }
}
