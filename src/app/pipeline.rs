// VinSplit - app/pipeline.rs
//
// One synchronous run of the dispatch pipeline over an in-memory upload.
// No filesystem, no clock, no shared state: the same inputs always give the
// same artifact content.

use crate::core::aliases::Catalogs;
use crate::core::classify;
use crate::core::dates::DateOrder;
use crate::core::detect;
use crate::core::ingest;
use crate::core::model::{InputFormat, ReportArtifact};
use crate::core::normalize;
use crate::core::report;
use crate::core::workbook;
use crate::util::constants;
use crate::util::error::Result;

/// Tunables for a pipeline run. Validated values come from config.toml.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Leading non-blank rows searched for the header row.
    pub header_scan_rows: usize,
    /// Data rows sampled per column when looking for VIN-shaped content.
    pub sample_rows: usize,
    /// Reading of all-numeric dates such as 03/04/2025.
    pub date_order: DateOrder,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: constants::DEFAULT_HEADER_SCAN_ROWS,
            sample_rows: constants::DEFAULT_SAMPLE_ROWS,
            date_order: DateOrder::default(),
        }
    }
}

/// Turn uploaded bytes into a report artifact.
///
/// Fails with exactly one of `Format`, `Schema` or `Processing`.
pub fn process(
    bytes: &[u8],
    format: InputFormat,
    catalogs: &Catalogs,
    config: &PipelineConfig,
) -> Result<ReportArtifact> {
    tracing::info!(
        format = format.label(),
        bytes = bytes.len(),
        date_order = config.date_order.label(),
        "Processing dispatch register"
    );

    let table = ingest::read_table(bytes, format, &catalogs.fields, config.header_scan_rows)?;
    let mapping = detect::detect_columns(
        &table,
        &catalogs.fields,
        &catalogs.brands,
        config.sample_rows,
    )?;

    let normalized = normalize::normalize_rows(table, &mapping, config.date_order);
    let stats = normalized.stats;
    let records = classify::classify_rows(normalized.rows, &catalogs.brands);

    let plan = report::build_report(records, stats, &catalogs.brands)?;
    let bytes = workbook::render_workbook(&plan.sheets)?;

    tracing::info!(
        sheets = plan.sheets.len(),
        total_vehicles = plan.stats.total_vehicles,
        unknown = plan.stats.unknown_vehicles,
        "Report built"
    );

    Ok(ReportArtifact {
        workbook: bytes,
        sheets: plan.sheets,
        summaries: plan.summaries,
        stats: plan.stats,
        categories: plan.categories,
        mapping,
        preview: plan.preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aliases::load_builtin_catalogs;
    use crate::core::model::Brand;
    use crate::util::error::VinSplitError;

    fn run(csv: &str) -> Result<ReportArtifact> {
        let catalogs = load_builtin_catalogs().unwrap();
        process(csv.as_bytes(), InputFormat::Csv, &catalogs, &PipelineConfig::default())
    }

    #[test]
    fn test_process_csv_end_to_end() {
        let artifact = run("VIN,Model,Qty\nLS5A3ABE0PB000001,Changan CS35,2\n").unwrap();
        assert_eq!(artifact.sheet_names(), vec!["Summary", "CHANGAN"]);
        assert_eq!(artifact.stats.total_vehicles, 1);
        assert_eq!(artifact.summary_for(Brand::Changan).unwrap().total_quantity, 2);
        assert!(!artifact.workbook.is_empty());
    }

    #[test]
    fn test_excel_na_vin_is_not_counted() {
        let artifact =
            run("VIN,Model\n#N/A,Changan CS35\nLS5A3ABE0PB000001,Maxus T60\n").unwrap();
        assert_eq!(artifact.stats.total_vehicles, 1);
        assert_eq!(artifact.stats.normalize.placeholder_vins, 1);
        assert_eq!(artifact.sheet_names(), vec!["Summary", "MAXUS"]);
    }

    #[test]
    fn test_brand_column_found_under_unrecognised_header() {
        let artifact = run(
            "Product,Chassis No,Qty\n\
             Changan CS35,LS5A3ABE0PB000001,1\n\
             Maxus T60,LS5A3ABE0PB000002,1\n",
        )
        .unwrap();
        assert_eq!(artifact.stats.unknown_vehicles, 0);
        assert_eq!(artifact.sheet_names(), vec!["Summary", "CHANGAN", "MAXUS"]);
    }

    #[test]
    fn test_each_stage_reports_its_own_error_kind() {
        let format = run("").unwrap_err();
        assert_eq!(format.kind(), "FormatError");

        let schema = run("Customer,City\nAda,Lagos\n").unwrap_err();
        assert!(matches!(schema, VinSplitError::Schema(_)));

        let processing = run("VIN,Model\n,Changan\nN/A,Maxus\n").unwrap_err();
        assert_eq!(processing.kind(), "ProcessingError");
    }
}
