// VinSplit - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation between layers.
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all VinSplit operations.
///
/// The pipeline itself only ever returns `Format`, `Schema` or `Processing`;
/// the remaining variants come from the surrounding CLI and loaders.
#[derive(Debug)]
pub enum VinSplitError {
    /// The input could not be read as a table.
    Format(FormatError),

    /// No usable identifier column was found.
    Schema(SchemaError),

    /// Aggregate-level failure after normalisation.
    Processing(ProcessingError),

    /// Alias catalog loading or validation failed.
    Alias(AliasError),

    /// Preview or summary export failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl VinSplitError {
    /// Stable tag for callers that surface the error category to users.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Format(_) => "FormatError",
            Self::Schema(_) => "SchemaError",
            Self::Processing(_) => "ProcessingError",
            Self::Alias(_) => "AliasError",
            Self::Export(_) => "ExportError",
            Self::Config(_) => "ConfigError",
            Self::Io { .. } => "IoError",
        }
    }

    /// The error's message without the category prefix, for display next
    /// to `kind()`.
    pub fn message(&self) -> String {
        match self {
            Self::Format(e) => e.to_string(),
            Self::Schema(e) => e.to_string(),
            Self::Processing(e) => e.to_string(),
            Self::Alias(e) => e.to_string(),
            Self::Export(e) => e.to_string(),
            Self::Config(e) => e.to_string(),
            Self::Io {
                path,
                operation,
                source,
            } => format!("{operation} failed on '{}': {source}", path.display()),
        }
    }
}

impl fmt::Display for VinSplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(e) => write!(f, "Format error: {e}"),
            Self::Schema(e) => write!(f, "Schema error: {e}"),
            Self::Processing(e) => write!(f, "Processing error: {e}"),
            Self::Alias(e) => write!(f, "Alias catalog error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for VinSplitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Format(e) => Some(e),
            Self::Schema(e) => Some(e),
            Self::Processing(e) => Some(e),
            Self::Alias(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Format errors
// ---------------------------------------------------------------------------

/// The uploaded bytes are not a readable table.
#[derive(Debug)]
pub enum FormatError {
    /// The declared format is not one of xlsx, xls, csv.
    Unsupported { declared: String },

    /// The spreadsheet container could not be opened or a sheet could not be read.
    Workbook {
        format: &'static str,
        reason: String,
    },

    /// The workbook contains no worksheets.
    NoWorksheet { format: &'static str },

    /// CSV tokenisation failed.
    Csv { source: csv::Error },

    /// Content declared as CSV contains binary data.
    Binary,

    /// The sheet has no non-blank rows.
    NoTabularData,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { declared } => write!(
                f,
                "Unsupported file format '{declared}'. Use .xlsx, .xls, or .csv"
            ),
            Self::Workbook { format, reason } => {
                write!(f, "Could not read {format} workbook: {reason}")
            }
            Self::NoWorksheet { format } => {
                write!(f, "The {format} workbook contains no worksheets")
            }
            Self::Csv { source } => write!(f, "Could not read CSV content: {source}"),
            Self::Binary => write!(f, "The file is not a text CSV (binary content detected)"),
            Self::NoTabularData => write!(f, "No data found in file"),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source } => Some(source),
            _ => None,
        }
    }
}

impl From<FormatError> for VinSplitError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

/// The table has no column the pipeline can deduplicate on.
#[derive(Debug)]
pub enum SchemaError {
    /// Neither a header nor the sampled data identified a VIN column.
    MissingVin { headers: Vec<String> },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVin { headers } => write!(
                f,
                "Could not find a VIN or chassis number column (headers: {})",
                if headers.is_empty() {
                    "none".to_string()
                } else {
                    headers.join(", ")
                }
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<SchemaError> for VinSplitError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

// ---------------------------------------------------------------------------
// Processing errors
// ---------------------------------------------------------------------------

/// Failures after rows have been normalised.
#[derive(Debug)]
pub enum ProcessingError {
    /// Every row was discarded during normalisation.
    NoValidRecords {
        rows_read: usize,
        rows_discarded: usize,
    },

    /// The report workbook could not be rendered.
    Workbook {
        source: rust_xlsxwriter::XlsxError,
    },
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValidRecords {
                rows_read,
                rows_discarded,
            } => write!(
                f,
                "No valid records: {rows_read} rows read, {rows_discarded} discarded \
                 for missing or placeholder VINs"
            ),
            Self::Workbook { source } => write!(f, "Could not build report workbook: {source}"),
        }
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Workbook { source } => Some(source),
            _ => None,
        }
    }
}

impl From<ProcessingError> for VinSplitError {
    fn from(e: ProcessingError) -> Self {
        Self::Processing(e)
    }
}

// ---------------------------------------------------------------------------
// Alias catalog errors
// ---------------------------------------------------------------------------

/// Errors related to field alias and brand keyword catalogs.
#[derive(Debug)]
pub enum AliasError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Alias file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A `[[field]]` entry names a field that is not canonical.
    UnknownField { path: PathBuf, id: String },

    /// A `[[brand]]` entry names a brand outside the known set.
    UnknownBrand { path: PathBuf, id: String },

    /// The same id appears twice in one file.
    DuplicateId { path: PathBuf, id: String },

    /// An entry has no usable aliases or keywords.
    EmptyAliases { path: PathBuf, id: String },

    /// A required canonical field has no entry after merging.
    MissingField { field: &'static str },

    /// I/O error reading an alias file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for AliasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Alias file '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::UnknownField { path, id } => write!(
                f,
                "'{}': unknown field id '{id}'",
                path.display()
            ),
            Self::UnknownBrand { path, id } => write!(
                f,
                "'{}': unknown brand id '{id}'",
                path.display()
            ),
            Self::DuplicateId { path, id } => {
                write!(f, "'{}': duplicate entry '{id}'", path.display())
            }
            Self::EmptyAliases { path, id } => write!(
                f,
                "'{}': entry '{id}' has no aliases",
                path.display()
            ),
            Self::MissingField { field } => {
                write!(f, "No aliases defined for required field '{field}'")
            }
            Self::Io { path, source } => {
                write!(f, "I/O error reading alias file '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AliasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<AliasError> for VinSplitError {
    fn from(e: AliasError) -> Self {
        Self::Alias(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for VinSplitError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for VinSplitError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for VinSplit results.
pub type Result<T> = std::result::Result<T, VinSplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_kinds_are_tagged() {
        let format: VinSplitError = FormatError::NoTabularData.into();
        let schema: VinSplitError = SchemaError::MissingVin { headers: vec![] }.into();
        let processing: VinSplitError = ProcessingError::NoValidRecords {
            rows_read: 3,
            rows_discarded: 3,
        }
        .into();

        assert_eq!(format.kind(), "FormatError");
        assert_eq!(schema.kind(), "SchemaError");
        assert_eq!(processing.kind(), "ProcessingError");
    }

    #[test]
    fn test_message_omits_category_prefix() {
        let inner = SchemaError::MissingVin {
            headers: vec!["Customer".to_string()],
        };
        let expected = inner.to_string();
        let e: VinSplitError = inner.into();

        assert!(e.to_string().starts_with("Schema error: "));
        assert_eq!(e.message(), expected);
    }

    #[test]
    fn test_missing_vin_message_lists_headers() {
        let e = SchemaError::MissingVin {
            headers: vec!["Customer".to_string(), "Qty".to_string()],
        };
        let msg = e.to_string();
        assert!(msg.contains("Customer, Qty"), "got: {msg}");
    }

    #[test]
    fn test_source_chain_is_preserved() {
        use std::error::Error;
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e = VinSplitError::Io {
            path: PathBuf::from("in.xlsx"),
            operation: "read",
            source: io,
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("in.xlsx"));
    }
}
