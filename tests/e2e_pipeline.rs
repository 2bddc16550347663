// VinSplit - tests/e2e_pipeline.rs
//
// End-to-end tests for the dispatch pipeline.
//
// These tests run real fixture files from disk through real catalog
// loading, ingest, detection, normalisation, classification, aggregation and
// workbook rendering, then read the rendered workbook back with calamine.
// No mocks, no stubs.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;
use vinsplit::app::alias_mgr;
use vinsplit::app::pipeline::{process, PipelineConfig};
use vinsplit::core::aliases::{load_builtin_catalogs, Catalogs};
use vinsplit::core::dates::DateOrder;
use vinsplit::core::model::{Brand, CanonicalField, InputFormat, ReportArtifact, SheetCell};
use vinsplit::util::error::VinSplitError;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn catalogs() -> Catalogs {
    load_builtin_catalogs().expect("built-in catalogs must load")
}

/// Run a fixture file through the pipeline with default settings.
fn run_fixture(name: &str) -> Result<ReportArtifact, VinSplitError> {
    let bytes = std::fs::read(fixture(name)).expect("fixture must exist");
    let format = InputFormat::from_file_name(name).expect("fixture has a known extension");
    process(&bytes, format, &catalogs(), &PipelineConfig::default())
}

fn count(artifact: &ReportArtifact, brand: Brand) -> usize {
    artifact.summary_for(brand).map_or(0, |s| s.count)
}

fn read_back(artifact: &ReportArtifact) -> Xlsx<Cursor<Vec<u8>>> {
    open_workbook_from_rs(Cursor::new(artifact.workbook.clone()))
        .expect("rendered workbook must open")
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// =============================================================================
// Reference scenarios
// =============================================================================

/// Chassis No / Car Model / Qty register: empty VIN dropped, bad quantity
/// defaulted, one vehicle each for CHANGAN and MAXUS.
#[test]
fn e2e_scenario_register_totals() {
    let artifact = run_fixture("scenario_register.csv").unwrap();

    let changan = artifact.summary_for(Brand::Changan).unwrap();
    assert_eq!((changan.count, changan.unique_vins), (1, 1));
    let maxus = artifact.summary_for(Brand::Maxus).unwrap();
    assert_eq!((maxus.count, maxus.unique_vins), (1, 1));

    assert_eq!(artifact.stats.total_vehicles, 2);
    assert_eq!(artifact.stats.normalize.rows_read, 3);
    assert_eq!(artifact.stats.normalize.empty_vins, 1);
    assert_eq!(artifact.stats.normalize.quantities_defaulted, 1);

    // Row 3 ("abc") is normalised to one vehicle.
    let vin002 = artifact.preview.iter().find(|r| r.vin == "VIN002").unwrap();
    assert_eq!(vin002.quantity, 1);
    assert_eq!(vin002.brand, Brand::Maxus);
    let vin001 = artifact.preview.iter().find(|r| r.vin == "VIN001").unwrap();
    assert_eq!(vin001.quantity, 2);

    assert_eq!(
        artifact.mapping.get(CanonicalField::Vin).unwrap().header,
        "Chassis No"
    );
    assert_eq!(artifact.sheet_names(), vec!["Summary", "CHANGAN", "MAXUS"]);
}

#[test]
fn e2e_register_without_vin_column_is_schema_error() {
    let err = run_fixture("no_vin_column.csv").unwrap_err();
    assert_eq!(err.kind(), "SchemaError");
    let msg = err.to_string();
    assert!(msg.contains("Customer Name"), "headers listed in: {msg}");
}

#[test]
fn e2e_register_with_only_empty_vins_is_processing_error() {
    let err = run_fixture("empty_vins.csv").unwrap_err();
    assert_eq!(err.kind(), "ProcessingError");
    assert!(err.to_string().contains("3 rows read"), "{err}");
}

// =============================================================================
// Realistic registers
// =============================================================================

#[test]
fn e2e_banner_rows_above_header_are_skipped() {
    let artifact = run_fixture("banner_register.csv").unwrap();
    let stats = &artifact.stats;

    assert_eq!(stats.normalize.rows_read, 7);
    assert_eq!(stats.normalize.blank_rows, 1);
    assert_eq!(stats.normalize.placeholder_vins, 1);
    assert_eq!(stats.normalize.dates_unparsed, 1);

    assert_eq!(count(&artifact, Brand::Changan), 3);
    assert_eq!(artifact.summary_for(Brand::Changan).unwrap().unique_vins, 2);
    assert_eq!(count(&artifact, Brand::Gwm), 1);
    assert_eq!(count(&artifact, Brand::Foton), 1);
    assert_eq!(count(&artifact, Brand::Unknown), 1);
    assert_eq!(count(&artifact, Brand::Maxus), 0);

    assert_eq!(
        artifact.sheet_names(),
        vec!["Summary", "CHANGAN", "GWM", "FOTON", "Unknown"]
    );

    let changan: Vec<_> = artifact
        .preview
        .iter()
        .filter(|r| r.brand == Brand::Changan)
        .collect();
    assert_eq!(changan[0].retail_date, Some(d(2025, 5, 31)));
    // Ambiguous 03/05/2025 reads day-first by default.
    assert_eq!(changan[1].retail_date, Some(d(2025, 5, 3)));
    assert_eq!(changan[0].city.as_deref(), Some("Lagos"));

    let gwm = artifact.preview.iter().find(|r| r.brand == Brand::Gwm).unwrap();
    assert_eq!(gwm.retail_date, Some(d(2025, 5, 12)));
    assert_eq!(gwm.quantity, 2);
}

#[test]
fn e2e_month_first_setting_changes_ambiguous_dates_only() {
    let bytes = std::fs::read(fixture("banner_register.csv")).unwrap();
    let config = PipelineConfig {
        date_order: DateOrder::MonthFirst,
        ..PipelineConfig::default()
    };
    let artifact = process(&bytes, InputFormat::Csv, &catalogs(), &config).unwrap();

    let changan: Vec<_> = artifact
        .preview
        .iter()
        .filter(|r| r.brand == Brand::Changan)
        .collect();
    assert_eq!(changan[0].retail_date, Some(d(2025, 5, 31)));
    assert_eq!(changan[1].retail_date, Some(d(2025, 3, 5)));
}

#[test]
fn e2e_composite_engine_vin_cells_are_split() {
    let artifact = run_fixture("composite_engine_vin.csv").unwrap();

    let vin = artifact.mapping.get(CanonicalField::Vin).unwrap();
    assert!(vin.composite);

    assert_eq!(count(&artifact, Brand::Hyundai), 1);
    let lovol = artifact.summary_for(Brand::Lovol).unwrap();
    assert_eq!(lovol.count, 2);
    assert_eq!(lovol.unique_engines, 2);
    // Each vehicle of a multi-pair cell stands for one unit.
    assert_eq!(lovol.total_quantity, 2);

    assert_eq!(artifact.stats.normalize.placeholder_vins, 1);
    assert_eq!(artifact.stats.normalize.split_records, 1);

    let hyundai = artifact
        .preview
        .iter()
        .find(|r| r.brand == Brand::Hyundai)
        .unwrap();
    assert_eq!(hyundai.vin, "KMFGA17APNC000101");
    assert_eq!(hyundai.engine.as_deref(), Some("D4DD"));

    let engines: Vec<_> = artifact
        .preview
        .iter()
        .filter(|r| r.brand == Brand::Lovol)
        .map(|r| (r.engine.as_deref().unwrap_or(""), r.vin.as_str()))
        .collect();
    assert_eq!(
        engines,
        vec![
            ("ENG01", "LVLTB904KPA000201"),
            ("ENG02", "LVLTB904KPA000202")
        ]
    );
}

#[test]
fn e2e_windows_1252_csv_is_decoded() {
    let artifact = run_fixture("windows1252_register.csv").unwrap();
    assert_eq!(count(&artifact, Brand::Changan), 1);
    assert_eq!(count(&artifact, Brand::Gwm), 1);

    let customers: Vec<_> = artifact
        .preview
        .iter()
        .filter_map(|r| r.customer_name.as_deref())
        .collect();
    assert_eq!(customers, vec!["Société Générale", "José Muñoz"]);
}

// =============================================================================
// Classification policy
// =============================================================================

/// Rows matching no brand are kept on their own sheet and counted in the
/// vehicle total, but not as classified.
#[test]
fn e2e_unknown_rows_count_towards_total() {
    let artifact = run_fixture("ambiguous_brands.csv").unwrap();
    let stats = &artifact.stats;

    assert_eq!(stats.total_vehicles, 4);
    assert_eq!(stats.unknown_vehicles, 1);
    assert_eq!(stats.classified_vehicles, 3);
    assert_eq!(artifact.sheet_names().last(), Some(&"Unknown"));
}

#[test]
fn e2e_keyword_ties_resolve_by_length_then_catalog_order() {
    let artifact = run_fixture("ambiguous_brands.csv").unwrap();
    let brand_of = |vin: &str| {
        artifact
            .preview
            .iter()
            .find(|r| r.vin == vin)
            .map(|r| r.brand)
    };

    // "great wall" outlasts "kmc".
    assert_eq!(brand_of("LGXCE4CB0P0000001"), Some(Brand::Gwm));
    // "geely" and "foton" tie on length; GEELY is declared first.
    assert_eq!(brand_of("LGXCE4CB0P0000002"), Some(Brand::Geely));
    assert_eq!(brand_of("LGXCE4CB0P0000003"), Some(Brand::Unknown));
    assert_eq!(brand_of("LGXCE4CB0P0000004"), Some(Brand::Dfac));
}

#[test]
fn e2e_user_brand_override_changes_classification() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("brands.toml"),
        "[[brand]]\nid = \"ZNA\"\nkeywords = [\"zna\", \"hilux\"]\n",
    )
    .unwrap();
    let (catalogs, errors) = alias_mgr::load_catalogs(Some(tmp.path())).unwrap();
    assert!(errors.is_empty(), "{errors:?}");

    let bytes = std::fs::read(fixture("ambiguous_brands.csv")).unwrap();
    let artifact = process(&bytes, InputFormat::Csv, &catalogs, &PipelineConfig::default()).unwrap();
    assert_eq!(count(&artifact, Brand::Zna), 1);
    assert_eq!(artifact.stats.unknown_vehicles, 0);
    assert_eq!(artifact.summary_for(Brand::Zna).unwrap().category, "Other");
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn e2e_counts_and_brands_are_consistent() {
    let known: HashSet<Brand> = Brand::all().iter().copied().collect();

    for name in [
        "scenario_register.csv",
        "banner_register.csv",
        "composite_engine_vin.csv",
        "windows1252_register.csv",
        "ambiguous_brands.csv",
    ] {
        let artifact = run_fixture(name).unwrap();

        for row in &artifact.preview {
            assert!(known.contains(&row.brand), "{name}: stray brand {:?}", row.brand);
            assert!(!row.vin.trim().is_empty(), "{name}: empty VIN survived");
        }
        for s in &artifact.summaries {
            assert!(s.unique_vins <= s.count, "{name}: {:?}", s.brand);
            assert!(s.count > 0, "{name}: empty brand group {:?}", s.brand);
        }

        let total: usize = artifact.summaries.iter().map(|s| s.count).sum();
        assert_eq!(total, artifact.preview.len(), "{name}");
        assert_eq!(total, artifact.stats.total_vehicles, "{name}");

        // One sheet per brand group plus the summary.
        assert_eq!(artifact.sheets.len(), artifact.summaries.len() + 1, "{name}");

        let category_total: usize = artifact
            .categories
            .iter()
            .flat_map(|c| c.brands.iter())
            .map(|b| b.count)
            .sum();
        assert_eq!(category_total, total, "{name}");
    }
}

#[test]
fn e2e_same_input_same_artifact_content() {
    let first = run_fixture("banner_register.csv").unwrap();
    let second = run_fixture("banner_register.csv").unwrap();

    assert_eq!(first.sheets, second.sheets);
    assert_eq!(first.summaries, second.summaries);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.categories, second.categories);
    assert_eq!(first.preview, second.preview);
    assert_eq!(first.mapping, second.mapping);
}

// =============================================================================
// Workbook output
// =============================================================================

#[test]
fn e2e_rendered_workbook_matches_sheet_plan() {
    let artifact = run_fixture("banner_register.csv").unwrap();
    let mut workbook = read_back(&artifact);

    assert_eq!(
        workbook.sheet_names(),
        vec!["Summary", "CHANGAN", "GWM", "FOTON", "Unknown"]
    );

    let summary = workbook.worksheet_range("Summary").unwrap();
    assert_eq!(summary.get_value((0, 0)), Some(&Data::String("Brand".into())));
    assert_eq!(summary.get_value((1, 0)), Some(&Data::String("CHANGAN".into())));
    assert_eq!(summary.get_value((1, 2)), Some(&Data::Float(3.0)));
    let (rows, _) = summary.get_size();
    assert_eq!(
        summary.get_value((rows as u32 - 1, 0)),
        Some(&Data::String("TOTAL".into()))
    );
    assert_eq!(summary.get_value((rows as u32 - 1, 2)), Some(&Data::Float(6.0)));

    let changan = workbook.worksheet_range("CHANGAN").unwrap();
    assert_eq!(changan.get_value((0, 2)), Some(&Data::String("VIN".into())));
    assert_eq!(
        changan.get_value((1, 2)),
        Some(&Data::String("LS5A3ABE0PB000001".into()))
    );
    // Retail dates are real date cells.
    match changan.get_value((1, 3)) {
        Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 45808.0),
        other => panic!("expected a date cell, got {other:?}"),
    }

    // The plan mirrors what was written.
    let plan = artifact.sheets.iter().find(|s| s.name == "CHANGAN").unwrap();
    assert_eq!(plan.rows.len(), 3);
    assert!(matches!(plan.rows[0][7], SheetCell::Number(n) if n == 1.0));
}

#[test]
fn e2e_xlsx_input_with_banner_and_date_cells() {
    let mut source = Workbook::new();
    let sheet = source.add_worksheet();
    let date_fmt = Format::new().set_num_format("dd/mm/yyyy");

    sheet.write_string(0, 0, "ACME MOTORS - DISPATCH REGISTER").unwrap();
    for (col, header) in ["Vehicle Make", "Car Model", "Chassis Number", "Dispatch Date", "Qty", "Showroom"]
        .iter()
        .enumerate()
    {
        sheet.write_string(2, col as u16, *header).unwrap();
    }
    let rows = [
        ("Changan", "CS35 Plus", "LS5A3ABE0PB000021", 45808.0, 1.0, "Ikeja"),
        ("", "Maxus D90", "LSFAM11A0NA000022", 45790.0, 2.0, "Wuse"),
        ("Dingzhou", "DZ Loader", "", 45800.0, 1.0, "Kano"),
    ];
    for (i, (make, model, vin, date, qty, showroom)) in rows.iter().enumerate() {
        let r = (i + 3) as u32;
        sheet.write_string(r, 0, *make).unwrap();
        sheet.write_string(r, 1, *model).unwrap();
        sheet.write_string(r, 2, *vin).unwrap();
        sheet.write_number_with_format(r, 3, *date, &date_fmt).unwrap();
        sheet.write_number(r, 4, *qty).unwrap();
        sheet.write_string(r, 5, *showroom).unwrap();
    }
    let bytes = source.save_to_buffer().unwrap();

    let artifact = process(&bytes, InputFormat::Xlsx, &catalogs(), &PipelineConfig::default()).unwrap();

    assert_eq!(artifact.sheet_names(), vec!["Summary", "CHANGAN", "MAXUS"]);
    assert_eq!(artifact.stats.normalize.empty_vins, 1);

    let changan = artifact
        .preview
        .iter()
        .find(|r| r.brand == Brand::Changan)
        .unwrap();
    assert_eq!(changan.retail_date, Some(d(2025, 5, 31)));
    assert_eq!(changan.showroom.as_deref(), Some("Ikeja"));

    let maxus = artifact.summary_for(Brand::Maxus).unwrap();
    assert_eq!(maxus.total_quantity, 2);
}

#[test]
fn e2e_corrupt_workbook_is_format_error() {
    let err = process(
        b"PK\x03\x04 definitely not a zip",
        InputFormat::Xlsx,
        &catalogs(),
        &PipelineConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "FormatError");
}
