// VinSplit - core/workbook.rs
//
// Renders a sheet plan into xlsx bytes with rust_xlsxwriter. Nothing is
// written to disk here; the caller decides where the bytes go.

use crate::core::dates;
use crate::core::model::{format_number, ReportSheet, SheetCell, SheetKind};
use crate::util::constants;
use crate::util::error::ProcessingError;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

const HEADER_FILL: u32 = 0xD9D9D9;
const TOTAL_FILL: u32 = 0xDDEBF7;
const DATE_FORMAT: &str = "yyyy-mm-dd";

/// Cell formats shared by every sheet of one workbook.
struct Styles {
    header: Format,
    plain: Format,
    date: Format,
    total: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_border(FormatBorder::Thin),
            plain: Format::new(),
            date: Format::new().set_num_format(DATE_FORMAT),
            total: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(TOTAL_FILL))
                .set_border(FormatBorder::Thin),
        }
    }
}

/// Render `sheets` in order and return the workbook bytes.
pub fn render_workbook(sheets: &[ReportSheet]) -> Result<Vec<u8>, ProcessingError> {
    write_sheets(sheets).map_err(|source| {
        tracing::error!(error = %source, "Workbook rendering failed");
        ProcessingError::Workbook { source }
    })
}

fn write_sheets(sheets: &[ReportSheet]) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(&sheet.name))?;
        write_sheet(worksheet, sheet, &styles)?;
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(sheets = sheets.len(), bytes = bytes.len(), "Workbook rendered");
    Ok(bytes)
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &ReportSheet, styles: &Styles) -> Result<(), XlsxError> {
    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, sanitize_cell(header), &styles.header)?;
    }

    let total_row = match sheet.kind {
        SheetKind::Summary => sheet.rows.len().checked_sub(1),
        SheetKind::Brand(_) => None,
    };

    for (r, cells) in sheet.rows.iter().enumerate() {
        let row = (r + 1) as u32;
        let is_total = total_row == Some(r);
        let cell_fmt = if is_total { &styles.total } else { &styles.plain };

        for (c, cell) in cells.iter().enumerate() {
            let col = c as u16;
            match cell {
                SheetCell::Text(s) => {
                    worksheet.write_string_with_format(row, col, sanitize_cell(s), cell_fmt)?;
                }
                SheetCell::Number(n) => {
                    worksheet.write_number_with_format(row, col, *n, cell_fmt)?;
                }
                SheetCell::Date(d) => {
                    worksheet.write_number_with_format(
                        row,
                        col,
                        dates::date_to_excel_serial(*d),
                        &styles.date,
                    )?;
                }
                SheetCell::Empty if is_total => {
                    worksheet.write_blank(row, col, cell_fmt)?;
                }
                SheetCell::Empty => {}
            }
        }
    }

    for (col, width) in column_widths(sheet).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    if let SheetKind::Brand(_) = sheet.kind {
        if !sheet.headers.is_empty() {
            let last_col = (sheet.headers.len() - 1) as u16;
            worksheet.autofilter(0, 0, sheet.rows.len() as u32, last_col)?;
        }
    }

    Ok(())
}

/// Width per column from the longest header or cell: (chars + 2) x 1.1,
/// clamped to the configured bounds.
fn column_widths(sheet: &ReportSheet) -> Vec<f64> {
    let mut widest: Vec<usize> = sheet.headers.iter().map(|h| h.chars().count()).collect();
    for cells in &sheet.rows {
        for (c, cell) in cells.iter().enumerate() {
            let len = match cell {
                SheetCell::Text(s) => s.chars().count(),
                SheetCell::Number(n) => format_number(*n).len(),
                SheetCell::Date(_) => DATE_FORMAT.len(),
                SheetCell::Empty => 0,
            };
            if c >= widest.len() {
                widest.resize(c + 1, 0);
            }
            widest[c] = widest[c].max(len);
        }
    }
    widest
        .into_iter()
        .map(|len| {
            ((len + 2) as f64 * 1.1).clamp(constants::MIN_COLUMN_WIDTH, constants::MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Drop characters Excel cannot store (control characters other than tab,
/// newline and carriage return) and cut to Excel's per-cell limit.
pub fn sanitize_cell(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            c == '\t' || c == '\n' || c == '\r' || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .take(constants::MAX_CELL_CHARS)
        .collect()
}

/// Make a sheet name Excel accepts: `[ ] : * ? / \` become `-`, leading and
/// trailing apostrophes are removed, and the result is at most 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'');
    let cut: String = trimmed.chars().take(constants::MAX_SHEET_NAME_LEN).collect();
    if cut.trim().is_empty() {
        "Sheet".to_string()
    } else {
        cut
    }
}
