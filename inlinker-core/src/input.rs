// Tabular input: loading keyword/URL sheets and normalising them for a crawl

/// File extensions read as spreadsheet workbooks rather than CSV
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

use crate::error::InputError;
use crate::model::KeywordSourcePair;
use calamine::{Reader, open_workbook_auto};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A header row plus string cells. Rows shorter than the header read as
/// empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a CSV with a header record. Header names are trimmed, cells are
    /// kept verbatim.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, InputError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Read the first worksheet of a workbook. The first row is the header;
    /// every cell is rendered as text.
    pub fn from_xlsx_path(path: &Path) -> Result<Self, InputError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| InputError::NoWorksheet(path.display().to_string()))??;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
        let headers = rows
            .next()
            .map(|header| header.iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            headers,
            rows: rows.collect(),
        })
    }

    /// Pick the reader from the file extension, CSV unless it names a workbook
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        if is_spreadsheet(path) {
            Self::from_xlsx_path(path)
        } else {
            Self::from_csv_path(path)
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column` in the header, or a schema error listing what
    /// the table does have.
    pub fn column_index(&self, column: &str) -> Result<usize, InputError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| InputError::Schema {
                column: column.to_string(),
                available: self.headers.clone(),
            })
    }

    fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Distinct values of `url_field` in first-seen order. Blank cells are not
/// targets.
pub fn unique_target_urls(table: &Table, url_field: &str) -> Result<Vec<String>, InputError> {
    let url_index = table.column_index(url_field)?;

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for url in table.column_values(url_index) {
        if url.trim().is_empty() {
            continue;
        }
        if seen.insert(url) {
            urls.push(url.to_string());
        }
    }

    Ok(urls)
}

/// One pair per row, in row order. Duplicates and empty keywords are kept;
/// an empty keyword simply never matches.
pub fn build_pairs(
    table: &Table,
    keyword_field: &str,
    url_field: &str,
) -> Result<Vec<KeywordSourcePair>, InputError> {
    let keyword_index = table.column_index(keyword_field)?;
    let url_index = table.column_index(url_field)?;

    Ok(table
        .column_values(keyword_index)
        .zip(table.column_values(url_index))
        .map(|(keyword, url)| KeywordSourcePair::new(keyword, url))
        .collect())
}
