// VinSplit - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and logging initialisation (debug mode support)
// 3. Alias catalog loading (built-in + user-defined)
// 4. One pipeline run, output writing, and the printed summary

use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use vinsplit::app::{alias_mgr, pipeline};
use vinsplit::core::dates::DateOrder;
use vinsplit::core::export;
use vinsplit::core::model::{InputFormat, ReportArtifact};
use vinsplit::platform::{config, fs};
use vinsplit::util::error::{ExportError, Result, VinSplitError};
use vinsplit::util::{constants, logging};

/// VinSplit - split a vehicle dispatch register into per-brand sheets.
///
/// Reads an xlsx, xls or csv register, detects its columns, drops rows
/// without a usable VIN, classifies each vehicle by brand, and writes a
/// workbook with a Summary sheet plus one sheet per brand.
#[derive(Parser, Debug)]
#[command(name = "vinsplit", version, about)]
struct Cli {
    /// Dispatch register to process (.xlsx, .xls or .csv).
    input: PathBuf,

    /// Output workbook path [default: "Dispatch Report MM - YYYY.xlsx" next to the input].
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Input format, overriding the file extension (xlsx, xls, csv).
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// Also write the preview rows as JSON.
    #[arg(long = "preview-json")]
    preview_json: Option<PathBuf>,

    /// Also write the preview rows as CSV.
    #[arg(long = "preview-csv")]
    preview_csv: Option<PathBuf>,

    /// Also write stats, brand summaries, categories and the column mapping as JSON.
    #[arg(long = "summary-json")]
    summary_json: Option<PathBuf>,

    /// Directory containing user fields.toml / brands.toml overrides.
    #[arg(short = 'a', long = "alias-dir")]
    alias_dir: Option<PathBuf>,

    /// Configuration file to use instead of the platform default.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!(kind = e.kind(), error = %e, "Run failed");
        eprintln!("{}: {}", e.kind(), e.message());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let platform_paths = config::PlatformPaths::resolve();

    // An explicit --config must load; the default location may be absent.
    let (app_config, config_warnings) = match cli.config.as_deref() {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&platform_paths),
    };

    logging::init(cli.debug, app_config.log_level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "VinSplit starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
        eprintln!("warning: {warning}");
    }

    // Alias directory: CLI override > config > platform default
    let alias_dir = cli
        .alias_dir
        .as_deref()
        .or(app_config.user_alias_dir.as_deref())
        .unwrap_or(&platform_paths.user_aliases_dir);
    let (catalogs, alias_errors) = alias_mgr::load_catalogs(Some(alias_dir))?;
    for err in &alias_errors {
        eprintln!("warning: {err}");
    }

    let format = match cli.format.as_deref() {
        Some(declared) => declared.parse::<InputFormat>()?,
        None => {
            let name = cli.input.file_name().unwrap_or_default().to_string_lossy();
            InputFormat::from_file_name(&name)?
        }
    };

    let bytes = fs::read_input(&cli.input, app_config.max_file_bytes)?;

    let pipeline_config = pipeline::PipelineConfig {
        header_scan_rows: app_config.header_scan_rows,
        sample_rows: app_config.sample_rows,
        date_order: if app_config.month_first_dates {
            DateOrder::MonthFirst
        } else {
            DateOrder::DayFirst
        },
    };
    let artifact = pipeline::process(&bytes, format, &catalogs, &pipeline_config)?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    fs::write_output(&output, &artifact.workbook)?;

    if let Some(ref path) = cli.preview_json {
        let file = create_export(path)?;
        export::export_preview_json(&artifact.preview, file, path)?;
    }
    if let Some(ref path) = cli.preview_csv {
        let file = create_export(path)?;
        export::export_preview_csv(&artifact.preview, file, path)?;
    }
    if let Some(ref path) = cli.summary_json {
        let file = create_export(path)?;
        export::export_summary_json(&artifact, file, path)?;
    }

    print_summary(&artifact, &output);
    Ok(())
}

/// `Dispatch Report MM - YYYY.xlsx` in the input's directory, dated now.
fn default_output_path(input: &Path) -> PathBuf {
    let name = format!(
        "Dispatch Report {}.xlsx",
        chrono::Local::now().format("%m - %Y")
    );
    input
        .parent()
        .map(|dir| dir.join(&name))
        .unwrap_or_else(|| PathBuf::from(&name))
}

fn create_export(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| {
        VinSplitError::from(ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    })?;
    Ok(BufWriter::new(file))
}

fn print_summary(artifact: &ReportArtifact, output: &Path) {
    let stats = &artifact.stats;
    println!("Wrote {}", output.display());
    println!();
    println!(
        "{:<12} {:>8} {:>12} {:>8}",
        "Brand", "Vehicles", "Unique VINs", "Qty"
    );
    for summary in &artifact.summaries {
        println!(
            "{:<12} {:>8} {:>12} {:>8}",
            summary.brand.label(),
            summary.count,
            summary.unique_vins,
            summary.total_quantity
        );
    }
    println!();
    println!(
        "Total vehicles: {} ({} classified, {} unknown) across {} brands",
        stats.total_vehicles, stats.classified_vehicles, stats.unknown_vehicles, stats.brands_count
    );
    println!(
        "Rows read: {}, discarded: {} (empty VIN {}, placeholder VIN {})",
        stats.normalize.rows_read,
        stats.normalize.discarded(),
        stats.normalize.empty_vins,
        stats.normalize.placeholder_vins
    );
    if stats.normalize.dates_unparsed > 0 || stats.normalize.quantities_defaulted > 0 {
        println!(
            "Unparsed dates: {}, defaulted quantities: {}",
            stats.normalize.dates_unparsed, stats.normalize.quantities_defaulted
        );
    }
}
