//! Fixed-column tabular export. Column positions are derived from the
//! field schema, never hand-counted: the leading cells, one cell per
//! schema field, then the trailing comparison cells.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compare::{PageComparison, PageStatus};
use crate::schema;

pub const LEADING_COLUMNS: [&str; 3] = ["Timestamp", "URL", "Status"];
pub const TRAILING_COLUMNS: [&str; 3] = ["Comparison", "Errors", "Changes"];

/// Position of the URL cell, used to resolve a stored row by URL.
const URL_COLUMN: usize = 1;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table io: {0}")]
    Io(#[from] io::Error),
}

/// Destination store for exported rows. The spreadsheet API itself is
/// an external collaborator; this seam is what the exporter needs from
/// it.
pub trait TabularStore {
    fn write_row(&mut self, row: &[String]) -> Result<(), TableError>;
    /// Most recent stored row for a URL, if any.
    fn read_row(&self, url: &str) -> Result<Option<Vec<String>>, TableError>;
}

pub fn header_row() -> Vec<String> {
    LEADING_COLUMNS
        .iter()
        .copied()
        .chain(schema::fields())
        .chain(TRAILING_COLUMNS.iter().copied())
        .map(str::to_string)
        .collect()
}

/// Maps a page comparison to one export row: timestamp, URL, status,
/// the current value of every schema field in order, then comparison
/// outcome, errors and changes cells.
pub fn to_row(page: &PageComparison, timestamp: DateTime<Utc>) -> Vec<String> {
    let mut row = Vec::with_capacity(header_row().len());
    row.push(timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
    row.push(page.url.clone());
    row.push(page.status.as_str().to_string());

    for field in schema::fields() {
        let cell = page
            .current_count(field)
            .map(|v| v.to_string())
            .unwrap_or_default();
        row.push(cell);
    }

    row.push(comparison_cell(page).to_string());
    row.push(page.errors.join("; "));
    row.push(changes_cell(page));
    row
}

/// Spreadsheet-style letter for a zero-based column index (A, B, .. Z,
/// AA, ..).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = String::new();
    while n > 0 {
        n -= 1;
        letters.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters
}

/// First and last column letters of the export range, derived from the
/// schema's field count so a schema change moves the range with it.
pub fn column_range_for(field_count: usize) -> (String, String) {
    let total = LEADING_COLUMNS.len() + field_count + TRAILING_COLUMNS.len();
    (column_letter(0), column_letter(total - 1))
}

fn comparison_cell(page: &PageComparison) -> &'static str {
    match page.status {
        PageStatus::Error => "error",
        PageStatus::Baseline => "no_previous_data",
        _ => {
            if page.deltas.iter().any(|d| matches!(d.delta, Some(d) if d != 0)) {
                "changes_detected"
            } else {
                "no_changes"
            }
        }
    }
}

fn changes_cell(page: &PageComparison) -> String {
    if page.status == PageStatus::Baseline {
        return String::new();
    }
    let parts: Vec<String> = page
        .deltas
        .iter()
        .filter_map(|d| match d.delta {
            Some(delta) if delta != 0 => Some(format!("{}: {:+}", d.field, delta)),
            _ => None,
        })
        .collect();
    parts.join("; ")
}

/// CSV-file-backed tabular store. Rows are appended under a header row;
/// `read_row` scans for the last row recorded for a URL.
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularStore for CsvTable {
    fn write_row(&mut self, row: &[String]) -> Result<(), TableError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let fresh = !self.path.exists();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if fresh {
            write_csv_row(&mut file, &header_row())?;
        }
        write_csv_row(&mut file, row)?;
        Ok(())
    }

    fn read_row(&self, url: &str) -> Result<Option<Vec<String>>, TableError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let rows = parse_csv_rows(&text);
        Ok(rows
            .into_iter()
            .skip(1)
            .rev()
            .find(|row| row.get(URL_COLUMN).map(String::as_str) == Some(url)))
    }
}

fn needs_quotes(cell: &str) -> bool {
    cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
}

fn write_csv_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Minimal quote-aware CSV reader, enough to resolve stored rows.
fn parse_csv_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        cell.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => row.push(std::mem::take(&mut cell)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut cell));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => cell.push(ch),
        }
    }

    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::schema::{CountValue, PageCounts};
    use chrono::TimeZone;

    fn counts(pairs: &[(&str, i64)]) -> PageCounts {
        pairs
            .iter()
            .map(|(field, n)| (field.to_string(), CountValue::Count(*n)))
            .collect()
    }

    fn run_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn header_matches_derived_range() {
        let header = header_row();
        assert_eq!(header.len(), 20);
        assert_eq!(header[0], "Timestamp");
        assert_eq!(header[3], "h1_non_empty");
        assert_eq!(header[19], "Changes");
        assert_eq!(
            column_range_for(schema::FIELDS.len()),
            ("A".to_string(), "T".to_string())
        );
    }

    #[test]
    fn column_letters_roll_over_past_z() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(19), "T");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[test]
    fn row_places_field_values_by_schema_position() {
        let prev = counts(&[("h1_non_empty", 2), ("h1_total", 2)]);
        let cur = counts(&[("h1_non_empty", 1), ("h1_total", 2), ("title_count", 1)]);
        let page = compare("https://a.example/", Some(&prev), &cur);
        let row = to_row(&page, run_timestamp());

        assert_eq!(row.len(), 20);
        assert_eq!(row[0], "2026-08-06 12:00:00");
        assert_eq!(row[1], "https://a.example/");
        assert_eq!(row[2], "regression");
        assert_eq!(row[3 + schema::index_of("h1_non_empty").unwrap()], "1");
        assert_eq!(row[3 + schema::index_of("h1_total").unwrap()], "2");
        assert_eq!(row[3 + schema::index_of("title_count").unwrap()], "1");
        assert_eq!(row[17], "changes_detected");
        assert_eq!(row[18], "");
        assert_eq!(row[19], "h1_non_empty: -1; title_count: +1");
    }

    #[test]
    fn error_page_exports_blank_field_cells() {
        let page = PageComparison::fetch_failed("https://a.example/", "timed out".to_string());
        let row = to_row(&page, run_timestamp());

        assert_eq!(row[2], "error");
        for i in 3..17 {
            assert_eq!(row[i], "");
        }
        assert_eq!(row[17], "error");
        assert_eq!(row[18], "timed out");
    }

    #[test]
    fn csv_round_trips_quoted_cells() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = CsvTable::new(dir.path().join("export.csv"));

        let mut row = vec![String::new(); header_row().len()];
        row[0] = "2026-08-06 12:00:00".to_string();
        row[URL_COLUMN] = "https://a.example/".to_string();
        row[18] = "bad \"value\", retried".to_string();
        table.write_row(&row).unwrap();

        let stored = table.read_row("https://a.example/").unwrap().unwrap();
        assert_eq!(stored[18], "bad \"value\", retried");
        assert!(table.read_row("https://b.example/").unwrap().is_none());
    }

    #[test]
    fn read_row_returns_the_latest_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = CsvTable::new(dir.path().join("export.csv"));

        let cur = counts(&[("h1_total", 1)]);
        table
            .write_row(&to_row(&compare("https://a.example/", None, &cur), run_timestamp()))
            .unwrap();
        let newer = counts(&[("h1_total", 5)]);
        table
            .write_row(&to_row(
                &compare("https://a.example/", Some(&cur), &newer),
                run_timestamp(),
            ))
            .unwrap();

        let stored = table.read_row("https://a.example/").unwrap().unwrap();
        assert_eq!(stored[3 + schema::index_of("h1_total").unwrap()], "5");
    }
}
