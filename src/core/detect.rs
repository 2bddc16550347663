// VinSplit - core/detect.rs
//
// Schema detection: maps raw header columns onto canonical fields using the
// field alias table, with content-based fallbacks for the VIN and brand
// columns.

use crate::core::aliases::{normalize_header, BrandCatalog, FieldAliasTable, FieldAliases};
use crate::core::classify;
use crate::core::model::{
    CanonicalField, CellValue, ColumnMapping, ColumnMatch, MatchTier, OverflowColumn, RawTable,
};
use crate::core::vin;
use crate::util::constants;
use crate::util::error::SchemaError;
use std::collections::{BTreeMap, HashSet};

/// One way a column could satisfy a field.
#[derive(Debug, Clone)]
struct Candidate {
    field: CanonicalField,
    column: usize,
    tier: MatchTier,
    alias_rank: usize,
    alias: String,
    composite: bool,
}

/// Infer the column mapping for `table`.
///
/// Every (field, column) pair is scored by its best alias match. Pairs are
/// then assigned greedily: stronger tier first, then lower alias rank, then
/// canonical field order, then column order. A column serves at most one
/// field. When no header names the VIN, up to `sample_rows` values of each
/// unused column are checked for VIN-shaped content. When no header names a
/// brand, model or item column, the leading unused columns are checked for
/// brand keywords from `brands`.
pub fn detect_columns(
    table: &RawTable,
    fields: &FieldAliasTable,
    brands: &BrandCatalog,
    sample_rows: usize,
) -> Result<ColumnMapping, SchemaError> {
    let normalized: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();

    let mut candidates: Vec<Candidate> = fields
        .iter()
        .flat_map(|entry| {
            normalized
                .iter()
                .enumerate()
                .filter_map(move |(column, header)| best_match(entry, column, header))
        })
        .collect();
    candidates.sort_by(|a, b| {
        (a.tier, a.alias_rank, a.field, a.column).cmp(&(b.tier, b.alias_rank, b.field, b.column))
    });

    let mut matches: BTreeMap<CanonicalField, ColumnMatch> = BTreeMap::new();
    let mut used: HashSet<usize> = HashSet::new();
    let mut overflow: Vec<OverflowColumn> = Vec::new();

    for c in candidates {
        if used.contains(&c.column) {
            continue;
        }
        if matches.contains_key(&c.field) {
            overflow.push(OverflowColumn {
                field: c.field,
                column: c.column,
                header: table.headers[c.column].clone(),
            });
            continue;
        }
        tracing::debug!(
            field = c.field.id(),
            column = c.column,
            header = %table.headers[c.column],
            tier = ?c.tier,
            alias = %c.alias,
            "Mapped column"
        );
        used.insert(c.column);
        matches.insert(
            c.field,
            ColumnMatch {
                column: c.column,
                header: table.headers[c.column].clone(),
                tier: c.tier,
                alias: c.alias,
                composite: c.composite,
            },
        );
    }

    // A column listed as overflow may still have been taken by a weaker field.
    overflow.retain(|o| !used.contains(&o.column));
    overflow.sort_by_key(|o| o.column);
    overflow.dedup_by_key(|o| o.column);

    if !matches.contains_key(&CanonicalField::Vin) {
        if let Some(found) = vin_by_content(table, &used, sample_rows) {
            tracing::info!(
                column = found.column,
                header = %found.header,
                composite = found.composite,
                "VIN column identified from cell contents"
            );
            used.insert(found.column);
            matches.insert(CanonicalField::Vin, found);
        }
    }

    let has_brand_source = [
        CanonicalField::Brand,
        CanonicalField::Model,
        CanonicalField::ItemCode,
    ]
    .iter()
    .any(|f| matches.contains_key(f));
    if !has_brand_source {
        if let Some(found) = brand_by_content(table, &used, brands, sample_rows) {
            tracing::info!(
                column = found.column,
                header = %found.header,
                "Brand column identified from cell contents"
            );
            matches.insert(CanonicalField::Brand, found);
        }
    }

    if !matches.contains_key(&CanonicalField::Vin) {
        let headers: Vec<String> = table
            .headers
            .iter()
            .filter(|h| !h.trim().is_empty())
            .cloned()
            .collect();
        tracing::warn!(columns = headers.len(), "No VIN column found");
        return Err(SchemaError::MissingVin { headers });
    }

    let mapping = ColumnMapping::new(matches, overflow);
    let unmapped: Vec<&str> = mapping.unmapped().iter().map(|f| f.id()).collect();
    tracing::info!(
        mapped = CanonicalField::all().len() - unmapped.len(),
        unmapped = ?unmapped,
        overflow = mapping.overflow.len(),
        "Schema detection complete"
    );
    Ok(mapping)
}

/// Best match of one header against one field's aliases.
fn best_match(entry: &FieldAliases, column: usize, header: &str) -> Option<Candidate> {
    if header.is_empty() {
        return None;
    }

    let make = |tier, alias_rank, alias: &str, composite| Candidate {
        field: entry.field,
        column,
        tier,
        alias_rank,
        alias: alias.to_string(),
        composite,
    };

    // Regular aliases rank ahead of composite ones.
    let ranked: Vec<(usize, &String, bool)> = entry
        .aliases
        .iter()
        .map(|a| (a, false))
        .chain(entry.composite_aliases.iter().map(|a| (a, true)))
        .enumerate()
        .map(|(rank, (alias, composite))| (rank, alias, composite))
        .collect();

    if let Some(&(rank, alias, composite)) = ranked.iter().find(|(_, a, _)| a.as_str() == header) {
        let tier = if rank == 0 {
            MatchTier::Exact
        } else {
            MatchTier::Alias
        };
        return Some(make(tier, rank, alias.as_str(), composite));
    }

    let padded = format!(" {header} ");
    ranked
        .iter()
        .find(|(_, alias, _)| padded.contains(&format!(" {alias} ")))
        .map(|&(rank, alias, composite)| {
            make(MatchTier::Substring, rank, alias.as_str(), composite)
        })
}

/// Find an unused column whose sampled values look like VINs.
fn vin_by_content(
    table: &RawTable,
    used: &HashSet<usize>,
    sample_rows: usize,
) -> Option<ColumnMatch> {
    let mut best: Option<(f64, ColumnMatch)> = None;

    for column in (0..table.headers.len()).filter(|c| !used.contains(c)) {
        let samples = sample_text(table, column, sample_rows);
        if samples.is_empty() {
            continue;
        }

        let plain = samples.iter().filter(|s| vin::looks_like_vin(s)).count();
        let composite = samples.iter().filter(|s| vin::looks_like_composite(s)).count();
        let ratio = (plain + composite) as f64 / samples.len() as f64;
        tracing::debug!(column, ratio, samples = samples.len(), "Sampled column for VIN content");

        if ratio < constants::VIN_PATTERN_MIN_RATIO {
            continue;
        }
        if best.as_ref().map_or(true, |(r, _)| ratio > *r) {
            best = Some((
                ratio,
                ColumnMatch {
                    column,
                    header: table.headers[column].clone(),
                    tier: MatchTier::DataPattern,
                    alias: String::new(),
                    composite: composite > plain,
                },
            ));
        }
    }

    best.map(|(_, m)| m)
}

/// Find one of the leading unused columns whose sampled values name brands.
fn brand_by_content(
    table: &RawTable,
    used: &HashSet<usize>,
    brands: &BrandCatalog,
    sample_rows: usize,
) -> Option<ColumnMatch> {
    let mut best: Option<(f64, usize)> = None;

    let columns = (0..table.headers.len())
        .filter(|c| !used.contains(c))
        .take(constants::BRAND_SCAN_COLUMNS);
    for column in columns {
        let samples = sample_text(table, column, sample_rows);
        if samples.is_empty() {
            continue;
        }

        let hits = samples
            .iter()
            .filter(|s| classify::classify_text(s, brands).is_some())
            .count();
        let ratio = hits as f64 / samples.len() as f64;
        tracing::debug!(column, ratio, samples = samples.len(), "Sampled column for brand keywords");

        if ratio >= constants::BRAND_PATTERN_MIN_RATIO
            && best.map_or(true, |(r, _)| ratio > r)
        {
            best = Some((ratio, column));
        }
    }

    best.map(|(_, column)| ColumnMatch {
        column,
        header: table.headers[column].clone(),
        tier: MatchTier::DataPattern,
        alias: String::new(),
        composite: false,
    })
}

/// Up to `sample_rows` text values from `column`, in row order.
fn sample_text(table: &RawTable, column: usize, sample_rows: usize) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|r| r.cell(column))
        .filter(|c| matches!(c, CellValue::Text(_)))
        .filter_map(CellValue::to_text)
        .take(sample_rows.max(1))
        .collect()
}
