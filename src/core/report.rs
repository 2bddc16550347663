// VinSplit - core/report.rs
//
// Aggregation: groups classified records by brand, computes per-brand and
// whole-report statistics, and lays out the summary and brand sheets.

use crate::core::aliases::BrandCatalog;
use crate::core::model::{
    Brand, BrandSummary, CanonicalField, CategoryBreakdown, CategoryEntry, DispatchRecord,
    NormalizeStats, PreviewRow, ReportSheet, ReportStats, SheetCell, SheetKind,
};
use crate::core::workbook::sanitize_sheet_name;
use crate::util::constants;
use crate::util::error::ProcessingError;
use std::collections::{BTreeMap, HashSet};

/// Column headers of the summary sheet.
pub const SUMMARY_HEADERS: [&str; 6] = [
    "Brand",
    "Category",
    "Vehicle Count",
    "Unique VINs",
    "Unique Engines",
    "Total Quantity",
];

/// Header of the trailing engine-number column on brand sheets.
pub const ENGINE_HEADER: &str = "Engine";

/// Everything derived from the final record set, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
    pub sheets: Vec<ReportSheet>,
    pub summaries: Vec<BrandSummary>,
    pub stats: ReportStats,
    pub categories: Vec<CategoryBreakdown>,
    pub preview: Vec<PreviewRow>,
}

/// Group `records` by brand and build the report plan.
///
/// Brands appear in canonical order with `Unknown` last; records keep the
/// order they were read in. `Unknown` records count towards
/// `total_vehicles` and get their own sheet.
pub fn build_report(
    records: Vec<DispatchRecord>,
    normalize: NormalizeStats,
    catalog: &BrandCatalog,
) -> Result<ReportPlan, ProcessingError> {
    if records.is_empty() {
        tracing::warn!(
            rows_read = normalize.rows_read,
            discarded = normalize.discarded(),
            "No records survived normalisation"
        );
        return Err(ProcessingError::NoValidRecords {
            rows_read: normalize.rows_read,
            rows_discarded: normalize.discarded(),
        });
    }

    let mut groups: BTreeMap<Brand, Vec<DispatchRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.brand).or_default().push(record);
    }

    let summaries: Vec<BrandSummary> = groups
        .iter()
        .map(|(brand, records)| summarize(*brand, records, catalog))
        .collect();

    let stats = compute_stats(&groups, &summaries, normalize);
    let categories = category_breakdown(&summaries, stats.total_vehicles, catalog);

    let mut sheets = Vec::with_capacity(groups.len() + 1);
    sheets.push(summary_sheet(&summaries));
    sheets.extend(groups.iter().map(|(brand, records)| brand_sheet(*brand, records)));

    let preview = groups.values().flatten().map(PreviewRow::from).collect();

    for s in &summaries {
        tracing::debug!(
            brand = %s.brand,
            count = s.count,
            unique_vins = s.unique_vins,
            unique_engines = s.unique_engines,
            "Brand summary"
        );
    }
    tracing::info!(
        total = stats.total_vehicles,
        brands = stats.brands_count,
        unknown = stats.unknown_vehicles,
        sheets = sheets.len(),
        "Report assembled"
    );

    Ok(ReportPlan {
        sheets,
        summaries,
        stats,
        categories,
        preview,
    })
}

fn summarize(brand: Brand, records: &[DispatchRecord], catalog: &BrandCatalog) -> BrandSummary {
    let unique_vins = records
        .iter()
        .map(|r| r.vin.as_str())
        .collect::<HashSet<_>>()
        .len();
    let unique_engines = records
        .iter()
        .filter_map(|r| r.engine.as_deref())
        .collect::<HashSet<_>>()
        .len();

    BrandSummary {
        brand,
        category: catalog.category_for(brand).to_string(),
        count: records.len(),
        unique_vins,
        unique_engines,
        total_quantity: records.iter().map(|r| u64::from(r.quantity)).sum(),
    }
}

fn compute_stats(
    groups: &BTreeMap<Brand, Vec<DispatchRecord>>,
    summaries: &[BrandSummary],
    normalize: NormalizeStats,
) -> ReportStats {
    let total_vehicles: usize = summaries.iter().map(|s| s.count).sum();
    let unknown_vehicles = groups.get(&Brand::Unknown).map_or(0, Vec::len);
    let unique_models = groups
        .values()
        .flatten()
        .filter_map(|r| r.model.as_deref())
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect::<HashSet<_>>()
        .len();

    ReportStats {
        total_vehicles,
        classified_vehicles: total_vehicles - unknown_vehicles,
        unknown_vehicles,
        brands_count: summaries.len(),
        unique_models,
        total_unique_vins: summaries.iter().map(|s| s.unique_vins).sum(),
        normalize,
    }
}

/// Group brand counts by category. Categories follow catalog order with
/// "Other" last; within a category brands are sorted by count, largest first.
fn category_breakdown(
    summaries: &[BrandSummary],
    total: usize,
    catalog: &BrandCatalog,
) -> Vec<CategoryBreakdown> {
    let mut order: Vec<String> = Vec::new();
    for entry in catalog.entries() {
        if entry.category != constants::OTHER_CATEGORY && !order.contains(&entry.category) {
            order.push(entry.category.clone());
        }
    }
    order.push(constants::OTHER_CATEGORY.to_string());

    order
        .into_iter()
        .filter_map(|category| {
            let mut brands: Vec<CategoryEntry> = summaries
                .iter()
                .filter(|s| s.category == category)
                .map(|s| CategoryEntry {
                    brand: s.brand,
                    count: s.count,
                    percentage: percentage(s.count, total),
                })
                .collect();
            if brands.is_empty() {
                return None;
            }
            // Stable: equal counts keep canonical brand order.
            brands.sort_by(|a, b| b.count.cmp(&a.count));
            Some(CategoryBreakdown { category, brands })
        })
        .collect()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 10_000.0 / total as f64).round() / 100.0
}

fn summary_sheet(summaries: &[BrandSummary]) -> ReportSheet {
    let number = |n: usize| SheetCell::Number(n as f64);

    let mut rows: Vec<Vec<SheetCell>> = summaries
        .iter()
        .map(|s| {
            vec![
                SheetCell::Text(s.brand.label().to_string()),
                SheetCell::Text(s.category.clone()),
                number(s.count),
                number(s.unique_vins),
                number(s.unique_engines),
                SheetCell::Number(s.total_quantity as f64),
            ]
        })
        .collect();

    rows.push(vec![
        SheetCell::Text(constants::TOTAL_ROW_LABEL.to_string()),
        SheetCell::Empty,
        number(summaries.iter().map(|s| s.count).sum()),
        number(summaries.iter().map(|s| s.unique_vins).sum()),
        number(summaries.iter().map(|s| s.unique_engines).sum()),
        SheetCell::Number(summaries.iter().map(|s| s.total_quantity).sum::<u64>() as f64),
    ]);

    ReportSheet {
        name: constants::SUMMARY_SHEET_NAME.to_string(),
        kind: SheetKind::Summary,
        headers: SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

fn brand_sheet(brand: Brand, records: &[DispatchRecord]) -> ReportSheet {
    let headers = CanonicalField::all()
        .iter()
        .map(|f| f.label().to_string())
        .chain(std::iter::once(ENGINE_HEADER.to_string()))
        .collect();

    let rows = records
        .iter()
        .map(|r| {
            vec![
                SheetCell::Text(r.brand.label().to_string()),
                SheetCell::text(r.model.as_deref()),
                SheetCell::Text(r.vin.clone()),
                r.retail_date.map_or(SheetCell::Empty, SheetCell::Date),
                SheetCell::text(r.item_code.as_deref()),
                SheetCell::text(r.customer_name.as_deref()),
                SheetCell::text(r.purpose.as_deref()),
                SheetCell::Number(f64::from(r.quantity)),
                SheetCell::text(r.city.as_deref()),
                SheetCell::text(r.showroom.as_deref()),
                SheetCell::text(r.engine.as_deref()),
            ]
        })
        .collect();

    ReportSheet {
        name: sanitize_sheet_name(brand.label()),
        kind: SheetKind::Brand(brand),
        headers,
        rows,
    }
}
