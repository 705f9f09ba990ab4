use crate::error::{BudgetError, BudgetResult};
use crate::model::DatasetId;
use crate::utils::{column_number_to_name, hash_path_metadata, system_time_to_datetime};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use umya_spreadsheet::Worksheet;
use umya_spreadsheet::reader::xlsx;

/// File-level facts about the loaded workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub id: DatasetId,
    pub path: PathBuf,
    pub bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Header row plus data rows of one sheet, cells kept as raw trimmed text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(sheet: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            sheet: sheet.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.rows
            .push(cells.into_iter().map(|cell| cell.map(Into::into)).collect());
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }
}

pub fn ensure_extension(path: &Path, allowed: &[String]) -> BudgetResult<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if allowed.iter().any(|ext| *ext == extension) {
        Ok(())
    } else {
        Err(BudgetError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        })
    }
}

/// Reads `sheet` (or the first sheet) with row 1 as the header row.
pub fn read_table(path: &Path, sheet: Option<&str>) -> BudgetResult<(SourceInfo, RawTable)> {
    if !path.is_file() {
        return Err(BudgetError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let metadata = fs::metadata(path).map_err(|source| BudgetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let info = SourceInfo {
        id: DatasetId(hash_path_metadata(path, &metadata)),
        path: path.to_path_buf(),
        bytes: metadata.len(),
        last_modified: metadata.modified().ok().and_then(system_time_to_datetime),
    };

    let book = xlsx::read(path).map_err(|error| BudgetError::WorkbookParse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;

    let sheet_names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();

    let worksheet = match sheet {
        Some(name) => book.get_sheet_by_name(name),
        None => book.get_sheet_collection().first(),
    }
    .ok_or_else(|| BudgetError::SheetNotFound {
        sheet: sheet.unwrap_or("<first>").to_string(),
        available: sheet_names,
    })?;

    Ok((info, extract_table(worksheet)))
}

pub fn extract_table(sheet: &Worksheet) -> RawTable {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let mut table = RawTable::new(sheet.get_name(), Vec::new());
    if max_col == 0 || max_row == 0 {
        return table;
    }

    table.headers = build_headers(sheet, max_col);

    for row_idx in 2..=max_row {
        let cells: Vec<Option<String>> = (1..=max_col)
            .map(|col_idx| sheet.get_cell((col_idx, row_idx)).and_then(cell_to_value))
            .collect();
        if cells.iter().all(Option::is_none) {
            continue;
        }
        table.rows.push(cells);
    }
    table
}

pub fn cell_to_value(cell: &umya_spreadsheet::Cell) -> Option<String> {
    let raw = cell.get_value();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn build_headers(sheet: &Worksheet, max_col: u32) -> Vec<String> {
    let headers = (1..=max_col)
        .map(|col_idx| {
            sheet
                .get_cell((col_idx, 1u32))
                .and_then(cell_to_value)
                .unwrap_or_else(|| column_number_to_name(col_idx))
        })
        .collect();
    dedupe_headers(headers)
}

fn dedupe_headers(mut headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    for h in headers.iter_mut() {
        let count = seen.entry(h.clone()).or_insert(0);
        if *count > 0 {
            h.push_str(&format!("_{}", *count + 1));
        }
        *count += 1;
    }
    headers
}
