// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::normalize_label;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::path::Path;

use crate::IngestError;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

// Excel serial dates count days from 1899-12-30 (1900 leap-year bug included).
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Empty => None,
            Self::DateTime(dt) => Some(dt.date()),
            Self::Number(serial) => excel_serial_to_date(*serial),
            Self::Text(raw) => parse_date_text(raw),
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(*v),
            Self::Text(raw) => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// String form used for every text-typed fact column.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(raw) => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{v:.0}")),
            Self::Number(v) => Some(v.to_string()),
            Self::DateTime(dt) => Some(dt.to_string()),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_SERIAL_MAX {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.trunc() as u64))
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// First worksheet (or CSV file) as a header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl RawTable {
    #[must_use]
    pub fn new(source: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            source: source.into(),
            headers: name_unnamed_headers(headers),
            rows,
        }
    }

    /// Column index whose header matches `name` after label normalization.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = normalize_label(name);
        self.headers
            .iter()
            .position(|header| normalize_label(header) == wanted)
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    #[must_use]
    pub fn normalized_headers(&self) -> Vec<String> {
        self.headers.iter().map(|h| normalize_label(h)).collect()
    }
}

// Blank header cells get the positional names spreadsheet tooling assigns them.
fn name_unnamed_headers(headers: Vec<String>) -> Vec<String> {
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let trimmed = header.trim();
            if trimmed.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

pub fn read_table(path: &Path) -> Result<RawTable, IngestError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => read_csv_table(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_table(path),
        other => Err(IngestError(format!(
            "unsupported source format `{other}` for {}",
            path.display()
        ))),
    }
}

fn read_csv_table(path: &Path) -> Result<RawTable, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| IngestError(format!("failed to open {}: {e}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError(format!("failed to read header of {}: {e}", path.display())))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| IngestError(format!("failed to read row of {}: {e}", path.display())))?;
        let cells = record
            .iter()
            .map(|raw| {
                if raw.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(raw.to_string())
                }
            })
            .collect::<Vec<_>>();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(cells);
    }
    Ok(RawTable::new(path.display().to_string(), headers, rows))
}

fn read_workbook_table(path: &Path) -> Result<RawTable, IngestError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IngestError(format!("failed to open {}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError(format!("workbook {} has no worksheets", path.display())))?
        .map_err(|e| IngestError(format!("failed to read {}: {e}", path.display())))?;

    let mut sheet_rows = range.rows();
    let headers = sheet_rows
        .next()
        .map(|cells| cells.iter().map(header_text).collect::<Vec<_>>())
        .unwrap_or_default();
    let rows = sheet_rows
        .map(|cells| cells.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(Cell::is_empty))
        .collect();
    Ok(RawTable::new(path.display().to_string(), headers, rows))
}

fn header_text(cell: &Data) -> String {
    cell_from_data(cell).as_text().unwrap_or_default()
}

fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(v) if v.trim().is_empty() => Cell::Empty,
        Data::String(v) => Cell::Text(v.clone()),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(v) => Cell::Text(v.to_string()),
        Data::DateTime(_) => cell.as_datetime().map_or(Cell::Empty, Cell::DateTime),
        Data::DateTimeIso(v) | Data::DurationIso(v) => Cell::Text(v.clone()),
    }
}
