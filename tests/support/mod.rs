#![allow(dead_code)]

use std::path::{Path, PathBuf};

use budget_explorer::{CliArgs, ViewerConfig};
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet, Worksheet};

/// Cell content for fixture rows.
#[derive(Debug, Clone)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

impl From<&'static str> for Cell {
    fn from(value: &'static str) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

/// Writes `headers` on row 1 and `rows` below it.
pub fn fill_sheet(sheet: &mut Worksheet, headers: &[&str], rows: &[Vec<Cell>]) {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .get_cell_mut(((col + 1) as u32, 1u32))
            .set_value(*header);
    }
    for (row_idx, row) in rows.iter().enumerate() {
        let row_number = (row_idx + 2) as u32;
        for (col, cell) in row.iter().enumerate() {
            let target = sheet.get_cell_mut(((col + 1) as u32, row_number));
            match cell {
                Cell::Text(text) => {
                    target.set_value(*text);
                }
                Cell::Number(number) => {
                    target.set_value_number(*number);
                }
                Cell::Blank => {}
            }
        }
    }
}

/// The three-row dataset used across scenario tests.
pub fn scenario_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![2024.into(), "Crop Insurance".into(), 100.into()],
        vec![2024.into(), "Irrigation".into(), 50.into()],
        vec![2024.into(), "Defence Revenue".into(), 200.into()],
    ]
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    /// Single-sheet workbook with a header row and data rows.
    pub fn create_dataset(&self, name: &str, headers: &[&str], rows: &[Vec<Cell>]) -> PathBuf {
        self.create_workbook(name, |book| {
            let sheet = book.get_sheet_mut(&0).expect("default sheet");
            fill_sheet(sheet, headers, rows);
        })
    }

    pub fn config(&self, dataset: &Path) -> ViewerConfig {
        ViewerConfig::from_args(CliArgs {
            dataset: Some(dataset.to_path_buf()),
            ..CliArgs::default()
        })
        .expect("viewer config")
    }
}
