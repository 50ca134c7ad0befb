use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;

use crate::quiz::*;

/// The content of a cell, as kept when a table is read and written back.
#[derive(PartialEq, Debug, Clone)]
pub enum TableCell {
    Empty,
    Text(String),
    Number(f64),
    /// A number shown as a date, in days since the Excel epoch.
    DateTime(f64),
    Bool(bool),
    /// An error value such as `#N/A`.
    Error(String),
}

impl TableCell {
    pub fn from_calamine(cell: &DataType) -> TableCell {
        match cell {
            DataType::Empty => TableCell::Empty,
            DataType::String(s) => TableCell::Text(s.clone()),
            DataType::Float(f) => TableCell::Number(*f),
            DataType::Int(i) => TableCell::Number(*i as f64),
            DataType::Bool(b) => TableCell::Bool(*b),
            DataType::DateTime(f) => TableCell::DateTime(*f),
            DataType::Error(e) => TableCell::Error(e.to_string()),
            #[allow(unreachable_patterns)]
            other => TableCell::Text(format!("{:?}", other)),
        }
    }

    /// The cell as text. Integral numbers have no fractional part.
    pub fn text(&self) -> String {
        match self {
            TableCell::Empty => String::new(),
            TableCell::Text(s) => s.clone(),
            TableCell::Number(f) | TableCell::DateTime(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", *f as i64)
            }
            TableCell::Number(f) | TableCell::DateTime(f) => f.to_string(),
            TableCell::Bool(true) => "True".to_string(),
            TableCell::Bool(false) => "False".to_string(),
            TableCell::Error(e) => e.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TableCell::Empty)
    }
}

/// Opens the first worksheet of an Excel file held in memory.
///
/// `name` only serves in error messages.
pub fn first_sheet_from_bytes(bytes: &[u8], name: &str) -> QuizResult<Range<DataType>> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).context(OpeningExcelSnafu { name })?;
    workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu { name })?
        .context(OpeningExcelSnafu { name })
}

/// Opens the first worksheet of an Excel file on disk.
pub fn first_sheet_from_path(path: &str) -> QuizResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { name: path })?;
    workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu { name: path })?
        .context(OpeningExcelSnafu { name: path })
}

/// The names in the header row. Unnamed columns get a placeholder name.
pub fn header_names(header: &[DataType]) -> Vec<String> {
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match TableCell::from_calamine(cell).text() {
            s if s.is_empty() => format!("Unnamed: {}", idx),
            s => s,
        })
        .collect()
}

/// Given the header of a file (names of each of the columns), and the names of the required columns,
/// finds the index of each required column.
///
/// All the missing columns are reported at once. When a name appears more
/// than once in the header, the first column with that name is used.
pub fn get_col_index_mapping(req_col_names: &[&str], header: &[String]) -> QuizResult<Vec<usize>> {
    let mut col_names: HashMap<&str, usize> = HashMap::new();
    for (idx, s) in header.iter().enumerate() {
        col_names.entry(s.as_str()).or_insert(idx);
    }

    debug!("get_col_index_mapping: col_names: {:?}", col_names);

    let missing: Vec<String> = req_col_names
        .iter()
        .filter(|c| !col_names.contains_key(*c))
        .map(|c| c.to_string())
        .collect();
    ensure!(missing.is_empty(), MissingColumnsSnafu { missing });

    Ok(req_col_names.iter().map(|c| col_names[c]).collect())
}
