//! Spreadsheet codec.
//!
//! Reads the first worksheet with calamine and writes single-sheet
//! workbooks with `rust_xlsxwriter`. All cells are handled as trimmed text.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::ImportError;

/// Widest column written, in characters.
const MAX_COLUMN_WIDTH: usize = 60;

/// The first worksheet of an uploaded file.
#[derive(Debug)]
pub struct Sheet {
    /// Lowercased header to column index.
    columns: HashMap<String, usize>,
    rows: Vec<SheetRow>,
}

/// A non-blank data row.
#[derive(Debug)]
struct SheetRow {
    /// 1-based row number as shown by spreadsheet software.
    number: usize,
    cells: Vec<String>,
}

/// Borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    number: usize,
    cells: &'a [String],
    columns: &'a HashMap<String, usize>,
}

impl Sheet {
    /// Parse an `.xlsx`, `.xls` or `.ods` file.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the file is not a readable workbook or its
    /// first worksheet has no header row.
    pub fn read(bytes: &[u8]) -> Result<Self, ImportError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ImportError::NoWorksheet)??;
        Self::from_range(&range)
    }

    fn from_range(range: &Range<Data>) -> Result<Self, ImportError> {
        let first_row = range.start().map_or(0, |(row, _)| row as usize);
        let mut rows = range.rows();
        let header = rows.next().ok_or(ImportError::Empty)?;

        let mut columns = HashMap::new();
        for (index, cell) in header.iter().enumerate() {
            let name = cell_text(cell).to_lowercase();
            if !name.is_empty() {
                columns.entry(name).or_insert(index);
            }
        }
        if columns.is_empty() {
            return Err(ImportError::Empty);
        }

        // Header sits on sheet row `first_row + 1`, data starts one below.
        let rows = rows
            .enumerate()
            .map(|(offset, cells)| SheetRow {
                number: first_row + offset + 2,
                cells: cells.iter().map(cell_text).collect(),
            })
            .filter(|row| row.cells.iter().any(|cell| !cell.is_empty()))
            .collect();

        Ok(Self { columns, rows })
    }

    /// Fail unless every `required` header is present.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MissingColumns`] listing the absent headers.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), ImportError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !self.columns.contains_key(&name.to_lowercase()))
            .map(|name| (*name).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns(missing))
        }
    }

    /// Number of non-blank data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the sheet has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over non-blank data rows in sheet order.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|row| RowView {
            number: row.number,
            cells: &row.cells,
            columns: &self.columns,
        })
    }
}

impl<'a> RowView<'a> {
    /// 1-based sheet row number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Non-empty value under `column` (matched case-insensitively).
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = *self.columns.get(&column.to_lowercase())?;
        self.cells
            .get(index)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Render a cell as trimmed text. Whole floats lose their `.0`, so a
/// numeric `5` reads back as `"5"`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        #[allow(clippy::cast_possible_truncation)] // guarded by the magnitude check
        Data::Float(f) if f.fract().abs() < f64::EPSILON && f.abs() < 1e15 => {
            (*f as i64).to_string()
        }
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Write one worksheet with a bold, frozen header row.
///
/// Empty strings are left as blank cells.
///
/// # Errors
///
/// Returns [`XlsxError`] if the data exceeds worksheet limits.
pub fn write_sheet(
    name: &str,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;
    worksheet.set_freeze_panes(1, 0)?;

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, *header, &bold)?;
    }

    for (offset, row) in rows.iter().enumerate() {
        let row_index = u32::try_from(offset + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(row_index, column_index(col)?, value)?;
            if let Some(width) = widths.get_mut(col) {
                *width = (*width).max(value.chars().count());
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)] // capped at MAX_COLUMN_WIDTH
        let width = (*width).min(MAX_COLUMN_WIDTH) as f64 + 2.0;
        worksheet.set_column_width(column_index(col)?, width)?;
    }

    workbook.save_to_buffer()
}

fn column_index(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> Sheet {
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect();
        Sheet::read(&write_sheet("Data", headers, &rows).unwrap()).unwrap()
    }

    #[test]
    fn test_headers_case_insensitive() {
        let sheet = sheet(&[" NAME ", "nameAr"], &[&["Phones", "هواتف"]]);
        let row = sheet.rows().next().unwrap();
        assert_eq!(row.get("Name"), Some("Phones"));
        assert_eq!(row.get("NameAr"), Some("هواتف"));
        assert_eq!(row.get("Slug"), None);
    }

    #[test]
    fn test_row_numbers_skip_blank_rows() {
        let sheet = sheet(&["Name"], &[&["A"], &[""], &["B"]]);
        let numbers: Vec<usize> = sheet.rows().map(|r| r.number()).collect();
        assert_eq!(numbers, vec![2, 4]);
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_require_columns() {
        let sheet = sheet(&["Name", "SKU"], &[]);
        assert!(sheet.is_empty());
        assert!(sheet.require_columns(&["Name"]).is_ok());
        let err = sheet.require_columns(&["Name", "Price"]).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumns(ref cols) if cols == &["Price"]));
    }

    #[test]
    fn test_rejects_non_spreadsheet() {
        assert!(Sheet::read(b"name,slug\nphones,phones\n").is_err());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(5.0)), "5");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("  x ".into())), "x");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
