// VinSplit - core/classify.rs
//
// Brand classification by keyword search over a row's text fields.

use crate::core::aliases::BrandCatalog;
use crate::core::model::{Brand, DispatchRecord, NormalizedRow};

/// Classify every row and attach its brand. Order is preserved.
pub fn classify_rows(rows: Vec<NormalizedRow>, catalog: &BrandCatalog) -> Vec<DispatchRecord> {
    let records: Vec<DispatchRecord> = rows
        .into_iter()
        .map(|row| {
            let brand = classify_row(&row, catalog);
            DispatchRecord::from_row(row, brand)
        })
        .collect();

    let unknown = records.iter().filter(|r| !r.brand.is_known()).count();
    if unknown > 0 {
        tracing::warn!(unknown, total = records.len(), "Rows matched no brand");
    }
    tracing::info!(records = records.len(), unknown, "Classification complete");
    records
}

/// Brand of one row.
///
/// The brand hint, then the model, then the item code are searched in turn;
/// the first of them that matches any keyword decides. No match anywhere
/// yields `Unknown`.
pub fn classify_row(row: &NormalizedRow, catalog: &BrandCatalog) -> Brand {
    [&row.brand_hint, &row.model, &row.item_code]
        .into_iter()
        .flatten()
        .find_map(|text| classify_text(text, catalog))
        .unwrap_or(Brand::Unknown)
}

/// Brand whose longest keyword found in `text` is longest overall. Equal
/// lengths go to the brand declared first in the catalog.
pub fn classify_text(text: &str, catalog: &BrandCatalog) -> Option<Brand> {
    let haystack = text.to_lowercase();
    let mut best: Option<(usize, Brand)> = None;

    for entry in catalog.entries() {
        let longest = entry
            .keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .map(|k| k.chars().count())
            .max();
        if let Some(len) = longest {
            if best.map_or(true, |(best_len, _)| len > best_len) {
                best = Some((len, entry.brand));
            }
        }
    }

    tracing::trace!(text, brand = ?best.map(|(_, b)| b), "Classified text");
    best.map(|(_, brand)| brand)
}
