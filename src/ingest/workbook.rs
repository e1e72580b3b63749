//! First-sheet extraction from an uploaded workbook.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use tracing::debug;

use super::error::UploadError;
use super::row::{row_is_blank, CellValue, SheetRow};

/// Header substituted for empty header cells (`__EMPTY`, `__EMPTY_1`, …).
pub const EMPTY_HEADER: &str = "__EMPTY";

#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub sheet_name: String,
    pub rows: Vec<SheetRow>,
}

/// Read and validate the first sheet of the workbook at `path`.
///
/// The container format (.xls, .xlsx, .xlsb, .ods) is sniffed from content,
/// so the temp file does not need a meaningful extension.
pub fn read_first_sheet(path: &Path) -> Result<ParsedSheet, UploadError> {
    let bytes = std::fs::read(path)?;
    read_first_sheet_from_bytes(bytes)
}

pub fn read_first_sheet_from_bytes(bytes: Vec<u8>) -> Result<ParsedSheet, UploadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(UploadError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let rows = rows_from_range(&range)?;
    debug!(sheet = %sheet_name, rows = rows.len(), "parsed first sheet");

    Ok(ParsedSheet { sheet_name, rows })
}

/// First row is the header; rows with no cells at all are dropped, and every
/// kept row carries every header key.
///
/// Fails when nothing is left after the header, or when every remaining row
/// is made of empty values only.
pub fn rows_from_range(range: &Range<Data>) -> Result<Vec<SheetRow>, UploadError> {
    let rows = collect_rows(range);
    if rows.is_empty() {
        return Err(UploadError::EmptySheet);
    }
    if rows.iter().all(row_is_blank) {
        return Err(UploadError::AllRowsBlank);
    }
    Ok(rows)
}

fn collect_rows(range: &Range<Data>) -> Vec<SheetRow> {
    let mut rows = range.rows();
    let Some(header_cells) = rows.next() else {
        return Vec::new();
    };
    let headers = header_keys(header_cells);

    rows.filter(|cells| !cells.iter().all(|c| matches!(c, Data::Empty)))
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = cells.get(idx).map(cell_value).unwrap_or(CellValue::Empty);
                    (header.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// Raw header keys, made unique so they can key an ordered map.
fn header_keys(cells: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    cells
        .iter()
        .map(|cell| {
            let base = match header_text(cell) {
                t if t.is_empty() => EMPTY_HEADER.to_string(),
                t => t,
            };
            let Some(&count) = seen.get(&base) else {
                seen.insert(base.clone(), 1);
                return base;
            };
            let mut counter = count;
            let mut key = format!("{base}_{counter}");
            while seen.contains_key(&key) {
                counter += 1;
                key = format!("{base}_{counter}");
            }
            seen.insert(base, counter + 1);
            seen.insert(key.clone(), 1);
            key
        })
        .collect()
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => cell_value(other).to_text(),
    }
}

pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::test_support::{xlsx_bytes, XCell};

    #[test]
    fn reads_headers_and_rows_in_order() {
        let bytes = xlsx_bytes(&[
            vec![XCell::s("SKU"), XCell::s("Name"), XCell::s("Qty")],
            vec![XCell::s("A1"), XCell::s("Widget"), XCell::n(3.0)],
        ]);
        let sheet = read_first_sheet_from_bytes(bytes).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        let keys: Vec<_> = sheet.rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["SKU", "Name", "Qty"]);
        assert_eq!(sheet.rows[0]["Qty"].to_text(), "3");
    }

    #[test]
    fn missing_cells_become_empty_values() {
        let bytes = xlsx_bytes(&[
            vec![XCell::s("A"), XCell::s("B"), XCell::s("C")],
            vec![XCell::s("x"), XCell::Blank, XCell::s("z")],
            vec![XCell::s("only-a")],
        ]);
        let sheet = read_first_sheet_from_bytes(bytes).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0]["B"], CellValue::Empty);
        assert_eq!(sheet.rows[1].len(), 3);
        assert_eq!(sheet.rows[1]["C"], CellValue::Empty);
    }

    #[test]
    fn blank_rows_in_the_middle_are_dropped() {
        let bytes = xlsx_bytes(&[
            vec![XCell::s("A")],
            vec![XCell::s("1")],
            vec![],
            vec![XCell::s("2")],
        ]);
        let sheet = read_first_sheet_from_bytes(bytes).unwrap();
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn duplicate_and_empty_headers_get_distinct_keys() {
        let bytes = xlsx_bytes(&[
            vec![
                XCell::s("Qty"),
                XCell::s("Qty"),
                XCell::Blank,
                XCell::s("Qty_1"),
                XCell::Blank,
            ],
            vec![
                XCell::s("1"),
                XCell::s("2"),
                XCell::s("3"),
                XCell::s("4"),
                XCell::s("5"),
            ],
        ]);
        let sheet = read_first_sheet_from_bytes(bytes).unwrap();
        let keys: Vec<_> = sheet.rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["Qty", "Qty_1", "__EMPTY", "Qty_1_1", "__EMPTY_1"]);
    }

    #[test]
    fn header_only_sheet_is_empty() {
        let bytes = xlsx_bytes(&[vec![XCell::s("SKU"), XCell::s("Name")]]);
        let err = read_first_sheet_from_bytes(bytes).unwrap_err();
        assert!(matches!(err, UploadError::EmptySheet));
    }

    #[test]
    fn rows_of_empty_strings_are_all_blank() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String("SKU".into()));
        range.set_value((0, 1), Data::String("Name".into()));
        range.set_value((1, 0), Data::String(String::new()));
        range.set_value((2, 1), Data::String(String::new()));
        let err = rows_from_range(&range).unwrap_err();
        assert!(matches!(err, UploadError::AllRowsBlank));
    }

    #[test]
    fn whitespace_only_cell_keeps_the_sheet_valid() {
        let mut range: Range<Data> = Range::new((0, 0), (1, 1));
        range.set_value((0, 0), Data::String("SKU".into()));
        range.set_value((0, 1), Data::String("Name".into()));
        range.set_value((1, 1), Data::String("  ".into()));
        let rows = rows_from_range(&range).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn empty_range_is_an_empty_sheet() {
        let range: Range<Data> = Range::empty();
        assert!(matches!(rows_from_range(&range), Err(UploadError::EmptySheet)));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = read_first_sheet_from_bytes(b"not a spreadsheet".to_vec()).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn cell_value_mapping() {
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::from("true"));
        assert_eq!(cell_value(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
    }
}
