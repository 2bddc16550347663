// VinSplit - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "VinSplit";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "VinSplit";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Input limits
// =============================================================================

/// Default maximum size of an input file accepted by the CLI.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024; // 16 MB

/// Minimum user-configurable input size limit.
pub const MIN_MAX_FILE_BYTES: u64 = 1024; // 1 KB

/// Hard upper bound on the input size limit. Everything is held in memory.
pub const ABSOLUTE_MAX_FILE_BYTES: u64 = 512 * 1024 * 1024; // 512 MB

/// Number of leading bytes inspected when deciding whether "CSV" content is
/// actually binary.
pub const BINARY_SNIFF_BYTES: usize = 4 * 1024;

/// Number of lines used for CSV delimiter detection.
pub const DELIMITER_SNIFF_LINES: usize = 10;

/// Candidate CSV delimiters, in preference order for ties.
pub const CSV_DELIMITERS: &[u8] = &[b',', b';', b'\t', b'|'];

// =============================================================================
// Schema detection
// =============================================================================

/// Default number of leading non-blank rows searched for the header row.
/// Dispatch registers exported from ERP systems often carry banner rows
/// (company name, report title, run date) above the real header.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 15;

/// Hard upper bound on the header scan window.
pub const MAX_HEADER_SCAN_ROWS: usize = 100;

/// Default number of data rows sampled per column for content-based detection.
pub const DEFAULT_SAMPLE_ROWS: usize = 25;

/// Hard upper bound on the detection sample.
pub const MAX_SAMPLE_ROWS: usize = 1_000;

/// Fraction of non-empty sampled values that must look like VINs before a
/// column without a recognisable header is accepted as the VIN column.
pub const VIN_PATTERN_MIN_RATIO: f64 = 0.6;

/// Number of leading unused columns searched for brand keywords when no
/// header names a brand, model or item column.
pub const BRAND_SCAN_COLUMNS: usize = 5;

/// Fraction of non-empty sampled values that must contain a brand keyword
/// before a column is accepted as the brand column.
pub const BRAND_PATTERN_MIN_RATIO: f64 = 0.5;

/// Length of a standard (ISO 3779) Vehicle Identification Number.
pub const VIN_LENGTH: usize = 17;

// =============================================================================
// Normalisation policy
// =============================================================================

/// Quantity assigned when the source value is missing, non-numeric,
/// fractional, or negative. A dispatch line always stands for at least one
/// vehicle.
pub const DEFAULT_QUANTITY: u32 = 1;

/// Values that mean "no VIN" in real registers (compared upper-cased).
pub const VIN_PLACEHOLDERS: &[&str] = &[
    "N/A", "NA", "N.A", "N.A.", "NIL", "NONE", "NULL", "NAN", "TBA", "TBD", "UNKNOWN", "PENDING",
    // Excel error values, as written by Excel's own CSV export.
    "#N/A", "#REF!", "#VALUE!", "#NAME?", "#DIV/0!", "#NUM!", "#NULL!",
];

/// Largest Excel serial date accepted (9999-12-31).
pub const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

// =============================================================================
// Alias catalogs
// =============================================================================

/// Maximum size of a user alias TOML file in bytes.
pub const MAX_ALIAS_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// File name of the canonical-field alias table.
pub const FIELD_ALIASES_FILE_NAME: &str = "fields.toml";

/// File name of the brand keyword catalog.
pub const BRAND_CATALOG_FILE_NAME: &str = "brands.toml";

/// User alias subdirectory name.
pub const ALIASES_DIR_NAME: &str = "aliases";

// =============================================================================
// Workbook output
// =============================================================================

/// Name of the first sheet in every report.
pub const SUMMARY_SHEET_NAME: &str = "Summary";

/// Label of the totals row on the summary sheet.
pub const TOTAL_ROW_LABEL: &str = "TOTAL";

/// Excel's hard limit on sheet name length.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Excel's hard limit on characters in a single cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Column width bounds (Excel character units).
pub const MIN_COLUMN_WIDTH: f64 = 10.0;
pub const MAX_COLUMN_WIDTH: f64 = 50.0;

/// Category label for brands without a configured category.
pub const OTHER_CATEGORY: &str = "Other";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
