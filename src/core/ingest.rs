// VinSplit - core/ingest.rs
//
// Decodes uploaded bytes into a raw table: workbook or CSV cells become
// tagged CellValues, banner rows above the header are skipped, blank rows are
// dropped. Core layer: works on in-memory bytes only.

use crate::core::aliases::{normalize_header, FieldAliasTable};
use crate::core::dates;
use crate::core::model::{CellValue, InputFormat, RawRow, RawTable};
use crate::util::constants;
use crate::util::error::FormatError;
use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;

/// A decoded sheet before header location. Row `i` of `rows` is source row
/// `first_row + i` (1-based).
#[derive(Debug, Clone, Default)]
pub struct CellGrid {
    pub first_row: usize,
    pub rows: Vec<Vec<CellValue>>,
}

/// Decode `bytes` of the declared format and locate the header row.
///
/// The header is the row, among the first `header_scan_rows` non-blank rows,
/// with the most cells equal to a known field alias (earliest wins ties).
/// When no row contains a known header the first non-blank row is used.
pub fn read_table(
    bytes: &[u8],
    format: InputFormat,
    fields: &FieldAliasTable,
    header_scan_rows: usize,
) -> Result<RawTable, FormatError> {
    let grid = read_grid(bytes, format)?;
    tracing::debug!(
        format = %format,
        rows = grid.rows.len(),
        "Decoded cell grid"
    );
    locate_header(grid, fields, header_scan_rows)
}

/// Decode bytes into a cell grid without interpreting any row.
pub fn read_grid(bytes: &[u8], format: InputFormat) -> Result<CellGrid, FormatError> {
    match format {
        InputFormat::Xlsx => {
            let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
                .map_err(|e| workbook_error("xlsx", e))?;
            first_sheet(workbook, "xlsx")
        }
        InputFormat::Xls => {
            let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(bytes))
                .map_err(|e| workbook_error("xls", e))?;
            first_sheet(workbook, "xls")
        }
        InputFormat::Csv => read_csv_grid(bytes),
    }
}

fn workbook_error(format: &'static str, e: impl fmt::Display) -> FormatError {
    FormatError::Workbook {
        format,
        reason: e.to_string(),
    }
}

// =============================================================================
// Workbooks
// =============================================================================

fn first_sheet<'a, R>(mut workbook: R, format: &'static str) -> Result<CellGrid, FormatError>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: fmt::Display,
{
    let range = match workbook.worksheet_range_at(0) {
        None => return Err(FormatError::NoWorksheet { format }),
        Some(result) => result.map_err(|e| workbook_error(format, e))?,
    };

    // calamine trims leading empty rows; keep source numbering honest.
    let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(CellGrid { first_row, rows })
}

/// Map a calamine cell onto the pipeline's cell vocabulary.
fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match dates::excel_serial_to_datetime(serial) {
                Some(ndt) => CellValue::Date(ndt),
                None => CellValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    s.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| s.parse::<NaiveDate>().ok()?.and_hms_opt(0, 0, 0))
}

// =============================================================================
// CSV
// =============================================================================

fn read_csv_grid(bytes: &[u8]) -> Result<CellGrid, FormatError> {
    let sniff = &bytes[..bytes.len().min(constants::BINARY_SNIFF_BYTES)];
    if sniff.contains(&0) {
        return Err(FormatError::Binary);
    }

    let text = decode_text(bytes);
    let delimiter = detect_delimiter(&text);
    let shown = (delimiter as char).escape_default().to_string();
    tracing::debug!(delimiter = %shown, "CSV delimiter chosen");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| FormatError::Csv { source })?;
        // The csv reader skips empty lines; keep them as blank rows so that
        // row numbers stay equal to line numbers.
        let line = record
            .position()
            .map_or(rows.len() + 1, |p| p.line() as usize);
        while rows.len() + 1 < line {
            rows.push(Vec::new());
        }
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(CellGrid { first_row: 1, rows })
}

/// Decode CSV bytes: UTF-8 (BOM stripped) when valid, otherwise Windows-1252,
/// the encoding Excel uses for "CSV" exports on Western locales.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("CSV is not valid UTF-8; decoding as Windows-1252");
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(body);
            text
        }
    }
}

/// Pick the delimiter whose per-line count is highest and most consistent
/// over the first non-blank lines. Delimiters inside double quotes are not
/// counted. Falls back to a comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(constants::DELIMITER_SNIFF_LINES)
        .collect();
    if sample.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0.0f64;

    for &delimiter in constants::CSV_DELIMITERS {
        let counts: Vec<f64> = sample
            .iter()
            .map(|line| count_unquoted(line, delimiter as char) as f64)
            .collect();
        let avg = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance = counts.iter().map(|c| (c - avg).powi(2)).sum::<f64>() / counts.len() as f64;
        let score = avg / (1.0 + variance.sqrt());

        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

// =============================================================================
// Header location
// =============================================================================

/// Choose the header row and split the grid into headers and data rows.
pub fn locate_header(
    grid: CellGrid,
    fields: &FieldAliasTable,
    header_scan_rows: usize,
) -> Result<RawTable, FormatError> {
    let CellGrid { first_row, rows } = grid;

    let non_blank: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, cells)| !is_blank_row(cells))
        .map(|(i, _)| i)
        .collect();
    let Some(&first_non_blank) = non_blank.first() else {
        return Err(FormatError::NoTabularData);
    };

    let mut header_idx = first_non_blank;
    let mut best_score = 0usize;
    for &idx in non_blank.iter().take(header_scan_rows.max(1)) {
        let score = rows[idx]
            .iter()
            .filter_map(CellValue::to_text)
            .filter(|text| fields.is_known_header(&normalize_header(text)))
            .count();
        if score > best_score {
            best_score = score;
            header_idx = idx;
        }
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut headers: Vec<String> = rows[header_idx]
        .iter()
        .map(|c| c.to_text().unwrap_or_default())
        .collect();
    headers.resize(width, String::new());

    let mut data = Vec::new();
    let mut blank_rows = 0;
    for (i, cells) in rows.into_iter().enumerate().skip(header_idx + 1) {
        if is_blank_row(&cells) {
            blank_rows += 1;
            continue;
        }
        data.push(RawRow {
            source_row: first_row + i,
            cells,
        });
    }

    let header_row = first_row + header_idx;
    if header_idx != first_non_blank {
        tracing::info!(
            header_row,
            banner_rows = non_blank.iter().take_while(|&&i| i < header_idx).count(),
            "Skipped banner rows above the header"
        );
    }
    tracing::info!(
        header_row,
        columns = headers.len(),
        rows = data.len(),
        blank_rows,
        known_headers = best_score,
        "Located header row"
    );

    Ok(RawTable {
        headers,
        header_row,
        rows: data,
        blank_rows,
    })
}

fn is_blank_row(cells: &[CellValue]) -> bool {
    cells.iter().all(CellValue::is_blank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aliases::load_builtin_catalogs;

    fn fields() -> FieldAliasTable {
        load_builtin_catalogs().unwrap().fields
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3\n4,5,6"), b',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3\n4;5;6"), b';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a|b\n1|2"), b'|');
        // Commas inside quotes do not count.
        assert_eq!(
            detect_delimiter("name;city\n\"Doe, J\";Nairobi\n\"Roe, K\";Mombasa"),
            b';'
        );
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn test_decode_text_strips_bom_and_falls_back() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFVIN,Qty"), "VIN,Qty");
        // 0xE9 is 'é' in Windows-1252 and invalid on its own in UTF-8.
        assert_eq!(decode_text(b"Caf\xE9"), "Café");
    }

    #[test]
    fn test_csv_rejects_binary() {
        let bytes = b"VIN,Qty\n\x00\x01\x02";
        assert!(matches!(
            read_grid(bytes, InputFormat::Csv),
            Err(FormatError::Binary)
        ));
    }

    #[test]
    fn test_empty_csv_has_no_tabular_data() {
        let grid = read_grid(b"\n , \n", InputFormat::Csv).unwrap();
        assert!(matches!(
            locate_header(grid, &fields(), 15),
            Err(FormatError::NoTabularData)
        ));
    }

    #[test]
    fn test_header_found_below_banner_rows() {
        let csv = "ACME MOTORS LTD,,\n\
                   Dispatch Register May 2025,,\n\
                   ,,\n\
                   Customer Name,Chassis No,Qty\n\
                   Jane,LS5A3ABE0PB000001,1\n\
                   ,,\n\
                   John,LS5A3ABE0PB000002,2\n";
        let grid = read_grid(csv.as_bytes(), InputFormat::Csv).unwrap();
        let table = locate_header(grid, &fields(), 15).unwrap();

        assert_eq!(table.headers, vec!["Customer Name", "Chassis No", "Qty"]);
        assert_eq!(table.header_row, 4);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.blank_rows, 1);
        assert_eq!(table.rows[1].source_row, 7);
    }

    #[test]
    fn test_csv_row_numbers_follow_blank_lines() {
        let csv = "VIN,Qty\nLS5A3ABE0PB000001,1\n\n\nLS5A3ABE0PB000002,2\n";
        let grid = read_grid(csv.as_bytes(), InputFormat::Csv).unwrap();
        let table = locate_header(grid, &fields(), 15).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].source_row, 2);
        assert_eq!(table.rows[1].source_row, 5);
        assert_eq!(table.blank_rows, 2);
    }

    #[test]
    fn test_first_row_used_when_nothing_matches() {
        let csv = "alpha,beta\n1,2\n";
        let grid = read_grid(csv.as_bytes(), InputFormat::Csv).unwrap();
        let table = locate_header(grid, &fields(), 15).unwrap();
        assert_eq!(table.headers, vec!["alpha", "beta"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_headers_padded_to_widest_row() {
        let csv = "VIN\nLS5A3ABE0PB000001,extra\n";
        let grid = read_grid(csv.as_bytes(), InputFormat::Csv).unwrap();
        let table = locate_header(grid, &fields(), 15).unwrap();
        assert_eq!(table.headers, vec!["VIN".to_string(), String::new()]);
    }

    #[test]
    fn test_corrupt_workbook_is_format_error() {
        assert!(matches!(
            read_grid(b"definitely not a zip", InputFormat::Xlsx),
            Err(FormatError::Workbook { format: "xlsx", .. })
        ));
        assert!(matches!(
            read_grid(b"definitely not ole", InputFormat::Xls),
            Err(FormatError::Workbook { format: "xls", .. })
        ));
    }
}
