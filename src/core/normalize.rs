// VinSplit - core/normalize.rs
//
// Row normalisation: applies the column mapping to every raw row, coerces
// quantities and retail dates, and drops rows that carry no usable VIN.
// Per-row problems are counted, never raised.

use crate::core::dates::{self, DateOrder};
use crate::core::model::{
    CanonicalField, CellValue, ColumnMapping, NormalizeStats, NormalizedRow, RawRow, RawTable,
};
use crate::core::vin;
use crate::util::constants;
use chrono::NaiveDate;

/// Output of the normaliser: surviving rows in source order plus counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutput {
    pub rows: Vec<NormalizedRow>,
    pub stats: NormalizeStats,
}

/// Outcome of reading a retail date cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateCell {
    Missing,
    Parsed(NaiveDate),
    Unparsed,
}

/// Apply `mapping` to every row of `table`.
///
/// Rows whose VIN is empty or a placeholder are dropped and counted. A
/// composite ENGINE-VIN column yields one row per pair; when a cell holds
/// several pairs each resulting row stands for a single vehicle.
pub fn normalize_rows(
    table: RawTable,
    mapping: &ColumnMapping,
    date_order: DateOrder,
) -> NormalizeOutput {
    let mut stats = NormalizeStats {
        rows_read: table.rows.len(),
        blank_rows: table.blank_rows,
        ..NormalizeStats::default()
    };
    let mut rows = Vec::with_capacity(table.rows.len());

    let Some(vin_match) = mapping.get(CanonicalField::Vin) else {
        // Detection guarantees a VIN column; without one every row is unusable.
        stats.empty_vins = table.rows.len();
        return NormalizeOutput { rows, stats };
    };
    let vin_column = vin_match.column;
    let composite = vin_match.composite;

    for raw in &table.rows {
        let vin_text = raw.cell(vin_column).to_text();

        let pairs: Vec<(Option<String>, String)> = match vin_text {
            None => {
                stats.empty_vins += 1;
                tracing::trace!(row = raw.source_row, "Dropped row with empty VIN");
                continue;
            }
            Some(text) if composite && !vin::is_placeholder(&vin::canonical_vin(&text)) => {
                vin::split_composite(&text)
                    .into_iter()
                    .map(|p| (p.engine, p.vin))
                    .collect()
            }
            Some(text) => vec![(None, vin::canonical_vin(&text))],
        };

        let mut kept = 0usize;
        let multi = pairs.len() > 1;
        for (engine, vin_value) in pairs {
            if vin_value.is_empty() {
                stats.empty_vins += 1;
                continue;
            }
            if vin::is_placeholder(&vin_value) {
                stats.placeholder_vins += 1;
                tracing::trace!(row = raw.source_row, vin = %vin_value, "Dropped placeholder VIN");
                continue;
            }

            let mut row = build_row(raw, mapping, date_order, &mut stats, kept == 0);
            row.vin = vin_value;
            row.engine = engine;
            if multi {
                row.quantity = constants::DEFAULT_QUANTITY;
            }
            rows.push(row);
            kept += 1;
        }
        if kept > 1 {
            stats.split_records += kept - 1;
        }
    }

    if stats.discarded() > 0 {
        tracing::warn!(
            empty = stats.empty_vins,
            placeholder = stats.placeholder_vins,
            "Discarded entries without a usable VIN"
        );
    }
    tracing::info!(
        rows_read = stats.rows_read,
        records = rows.len(),
        quantities_defaulted = stats.quantities_defaulted,
        dates_unparsed = stats.dates_unparsed,
        split_records = stats.split_records,
        "Normalisation complete"
    );

    NormalizeOutput { rows, stats }
}

/// Build a row from every mapped field except the VIN. `count` is false for
/// the second and later pairs of a composite cell so per-cell problems are
/// only counted once.
fn build_row(
    raw: &RawRow,
    mapping: &ColumnMapping,
    date_order: DateOrder,
    stats: &mut NormalizeStats,
    count: bool,
) -> NormalizedRow {
    let text = |field: CanonicalField| -> Option<String> {
        mapping.column(field).and_then(|c| raw.cell(c).to_text())
    };

    let quantity = match mapping.column(CanonicalField::Quantity) {
        None => constants::DEFAULT_QUANTITY,
        Some(c) => parse_quantity(raw.cell(c)).unwrap_or_else(|| {
            if count {
                stats.quantities_defaulted += 1;
            }
            constants::DEFAULT_QUANTITY
        }),
    };

    let retail_date = match mapping.column(CanonicalField::RetailDate) {
        None => None,
        Some(c) => match read_date(raw.cell(c), date_order) {
            DateCell::Missing => None,
            DateCell::Parsed(d) => Some(d),
            DateCell::Unparsed => {
                if count {
                    stats.dates_unparsed += 1;
                }
                None
            }
        },
    };

    NormalizedRow {
        source_row: raw.source_row,
        brand_hint: text(CanonicalField::Brand),
        model: text(CanonicalField::Model),
        vin: String::new(),
        engine: None,
        retail_date,
        item_code: text(CanonicalField::ItemCode),
        customer_name: text(CanonicalField::CustomerName),
        purpose: text(CanonicalField::Purpose),
        quantity,
        city: text(CanonicalField::City),
        showroom: text(CanonicalField::Showroom),
    }
}

/// Read a whole, non-negative quantity. Text may carry thousands separators
/// or a `.0` suffix. Anything else is `None`.
pub fn parse_quantity(cell: &CellValue) -> Option<u32> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != ' ').collect();
            cleaned.parse::<f64>().ok()?
        }
        CellValue::Date(_) | CellValue::Empty => return None,
    };
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64)
        .then_some(value as u32)
}

fn read_date(cell: &CellValue, order: DateOrder) -> DateCell {
    let parsed = match cell {
        CellValue::Empty => return DateCell::Missing,
        CellValue::Text(s) if s.trim().is_empty() => return DateCell::Missing,
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Number(n) => dates::excel_serial_to_date(*n),
        CellValue::Text(s) => dates::parse_date_text(s, order),
    };
    parsed.map_or(DateCell::Unparsed, DateCell::Parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ColumnMatch, MatchTier};
    use std::collections::BTreeMap;

    fn mapping(columns: &[(CanonicalField, usize)], composite: bool) -> ColumnMapping {
        let matches: BTreeMap<_, _> = columns
            .iter()
            .map(|&(field, column)| {
                (
                    field,
                    ColumnMatch {
                        column,
                        header: field.label().to_string(),
                        tier: MatchTier::Exact,
                        alias: field.id().to_string(),
                        composite: composite && field == CanonicalField::Vin,
                    },
                )
            })
            .collect();
        ColumnMapping::new(matches, Vec::new())
    }

    fn row(n: usize, cells: Vec<CellValue>) -> RawRow {
        RawRow {
            source_row: n,
            cells,
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_quantity_policy() {
        assert_eq!(parse_quantity(&CellValue::Number(3.0)), Some(3));
        assert_eq!(parse_quantity(&CellValue::Number(0.0)), Some(0));
        assert_eq!(parse_quantity(&text(" 1,200 ")), Some(1200));
        assert_eq!(parse_quantity(&text("2.0")), Some(2));
        assert_eq!(parse_quantity(&CellValue::Number(1.5)), None);
        assert_eq!(parse_quantity(&CellValue::Number(-2.0)), None);
        assert_eq!(parse_quantity(&text("two")), None);
        assert_eq!(parse_quantity(&CellValue::Empty), None);
    }

    #[test]
    fn test_scenario_rows() {
        let table = RawTable {
            headers: vec!["Chassis No".into(), "Car Model".into(), "Qty".into()],
            header_row: 1,
            rows: vec![
                row(2, vec![text("VIN1"), text("Changan CS35"), CellValue::Number(1.0)]),
                row(3, vec![text(" vin2 "), text("Maxus T60"), CellValue::Empty]),
                row(4, vec![text(""), text("Geely Coolray"), CellValue::Number(1.0)]),
            ],
            blank_rows: 0,
        };
        let m = mapping(
            &[
                (CanonicalField::Vin, 0),
                (CanonicalField::Model, 1),
                (CanonicalField::Quantity, 2),
            ],
            false,
        );
        let out = normalize_rows(table, &m, DateOrder::DayFirst);

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].vin, "VIN1");
        assert_eq!(out.rows[1].vin, "VIN2");
        assert_eq!(out.rows[1].quantity, 1);
        assert_eq!(out.rows[1].source_row, 3);
        assert_eq!(out.stats.rows_read, 3);
        assert_eq!(out.stats.empty_vins, 1);
        assert_eq!(out.stats.quantities_defaulted, 1);
    }

    #[test]
    fn test_placeholders_dropped_and_counted() {
        let table = RawTable {
            headers: vec!["VIN".into()],
            header_row: 1,
            rows: vec![
                row(2, vec![text("N/A")]),
                row(3, vec![text("-")]),
                row(4, vec![text("0000000")]),
                row(5, vec![text("LS5A3ABE0PB000001")]),
            ],
            blank_rows: 2,
        };
        let m = mapping(&[(CanonicalField::Vin, 0)], false);
        let out = normalize_rows(table, &m, DateOrder::DayFirst);

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.stats.placeholder_vins, 3);
        assert_eq!(out.stats.blank_rows, 2);
        // Unmapped quantity defaults silently.
        assert_eq!(out.rows[0].quantity, 1);
        assert_eq!(out.stats.quantities_defaulted, 0);
    }

    #[test]
    fn test_excel_error_values_are_placeholders() {
        let table = RawTable {
            headers: vec!["VIN".into(), "Model".into()],
            header_row: 1,
            rows: vec![
                row(2, vec![text("#N/A"), text("Changan CS35")]),
                row(3, vec![text("#ref!"), text("Changan CS55")]),
                row(4, vec![text("#VALUE!"), text("GWM Poer")]),
                row(5, vec![text("#NAME?"), text("Foton Aumark")]),
                row(6, vec![text("LS5A3ABE0PB000001"), text("Maxus T60")]),
            ],
            blank_rows: 0,
        };
        let m = mapping(&[(CanonicalField::Vin, 0), (CanonicalField::Model, 1)], false);
        let out = normalize_rows(table, &m, DateOrder::DayFirst);

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].vin, "LS5A3ABE0PB000001");
        assert_eq!(out.stats.placeholder_vins, 4);
    }

    #[test]
    fn test_dates_and_optional_strings() {
        let table = RawTable {
            headers: vec!["VIN".into(), "Date".into(), "City".into()],
            header_row: 1,
            rows: vec![
                row(2, vec![text("A1"), CellValue::Number(45808.0), text("  Lagos ")]),
                row(3, vec![text("A2"), text("03/04/2025"), text("   ")]),
                row(4, vec![text("A3"), text("soon"), CellValue::Empty]),
                row(5, vec![text("A4"), CellValue::Empty]),
            ],
            blank_rows: 0,
        };
        let m = mapping(
            &[
                (CanonicalField::Vin, 0),
                (CanonicalField::RetailDate, 1),
                (CanonicalField::City, 2),
            ],
            false,
        );
        let out = normalize_rows(table, &m, DateOrder::DayFirst);

        assert_eq!(out.rows[0].retail_date, NaiveDate::from_ymd_opt(2025, 5, 31));
        assert_eq!(out.rows[0].city.as_deref(), Some("Lagos"));
        assert_eq!(out.rows[1].retail_date, NaiveDate::from_ymd_opt(2025, 4, 3));
        assert_eq!(out.rows[1].city, None);
        assert_eq!(out.rows[2].retail_date, None);
        assert_eq!(out.rows[3].retail_date, None);
        assert_eq!(out.stats.dates_unparsed, 1);
    }

    #[test]
    fn test_composite_cells_split_into_records() {
        let table = RawTable {
            headers: vec!["Item Description".into(), "Engine-Alternator No.".into(), "Qty".into()],
            header_row: 1,
            rows: vec![
                row(
                    2,
                    vec![
                        text("GEELY COOLRAY"),
                        text("JL-4G15-L6T7824Z5MW005162, JL-4G15-L6T7824Z5MW005163"),
                        CellValue::Number(2.0),
                    ],
                ),
                row(3, vec![text("GEELY EMGRAND"), text("E77--N/A"), CellValue::Number(1.0)]),
                row(4, vec![text("GEELY EMGRAND"), text("N/A"), CellValue::Number(1.0)]),
            ],
            blank_rows: 0,
        };
        let m = mapping(
            &[
                (CanonicalField::Model, 0),
                (CanonicalField::Vin, 1),
                (CanonicalField::Quantity, 2),
            ],
            true,
        );
        let out = normalize_rows(table, &m, DateOrder::DayFirst);

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].engine.as_deref(), Some("JL-4G15"));
        assert_eq!(out.rows[1].vin, "L6T7824Z5MW005163");
        assert!(out.rows.iter().all(|r| r.quantity == 1));
        assert_eq!(out.stats.split_records, 1);
        assert_eq!(out.stats.placeholder_vins, 2);
    }
}
