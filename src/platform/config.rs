// VinSplit - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for VinSplit configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/vinsplit/ or %APPDATA%\VinSplit\config\)
    pub config_dir: PathBuf,

    /// User alias directory (e.g. ~/.config/vinsplit/aliases/ or %APPDATA%\VinSplit\aliases\)
    pub user_aliases_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let paths = Self::from_config_dir(proj_dirs.config_dir().to_path_buf());
            tracing::debug!(
                config = %paths.config_dir.display(),
                aliases = %paths.user_aliases_dir.display(),
                "Platform paths resolved"
            );
            paths
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self::from_config_dir(PathBuf::from("."))
        }
    }

    /// Paths rooted at a platform config directory.
    pub fn from_config_dir(config_dir: PathBuf) -> Self {
        let user_aliases_dir = app_root(&config_dir).join(constants::ALIASES_DIR_NAME);
        Self {
            config_dir,
            user_aliases_dir,
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        app_root(&self.config_dir).join(constants::CONFIG_FILE_NAME)
    }
}

/// Application root for a config directory. Windows places the config
/// directory in a `config` subfolder of the application folder; elsewhere
/// the config directory is the application folder itself.
fn app_root(config_dir: &Path) -> &Path {
    match (config_dir.file_name(), config_dir.parent()) {
        (Some(name), Some(parent)) if name == "config" => parent,
        _ => config_dir,
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still works
/// with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[detection]` section.
    pub detection: DetectionSection,
    /// `[normalize]` section.
    pub normalize: NormalizeSection,
    /// `[input]` section.
    pub input: InputSection,
    /// `[aliases]` section.
    pub aliases: AliasesSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[detection]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DetectionSection {
    /// Leading non-blank rows searched for the header row.
    pub header_scan_rows: Option<usize>,
    /// Data rows sampled per column for content-based VIN detection.
    pub sample_rows: Option<usize>,
}

/// `[normalize]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct NormalizeSection {
    /// "day-first" or "month-first".
    pub ambiguous_dates: Option<String>,
}

/// `[input]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct InputSection {
    /// Largest input file accepted, in bytes.
    pub max_file_bytes: Option<u64>,
}

/// `[aliases]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AliasesSection {
    /// Directory holding user fields.toml / brands.toml.
    pub user_alias_directory: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Detection --
    pub header_scan_rows: usize,
    pub sample_rows: usize,

    // -- Normalisation --
    /// Read 03/04/2025 as 4 March instead of 3 April.
    pub month_first_dates: bool,

    // -- Input --
    pub max_file_bytes: u64,

    // -- Aliases --
    pub user_alias_dir: Option<PathBuf>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: constants::DEFAULT_HEADER_SCAN_ROWS,
            sample_rows: constants::DEFAULT_SAMPLE_ROWS,
            month_first_dates: false,
            max_file_bytes: constants::DEFAULT_MAX_FILE_BYTES,
            user_alias_dir: None,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from its default location.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file gives defaults with no warnings (first run). An unreadable
/// or unparseable file gives defaults plus a warning; the run still proceeds.
pub fn load_config(paths: &PlatformPaths) -> (AppConfig, Vec<String>) {
    let config_path = paths.config_file();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match load_config_file(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Load and validate a config file the user named explicitly.
///
/// Unlike `load_config`, a file that cannot be read or parsed is an error.
pub fn load_config_file(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), "Loaded config.toml");
    Ok(validate(raw))
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Detection: header_scan_rows --
    if let Some(rows) = raw.detection.header_scan_rows {
        if (1..=constants::MAX_HEADER_SCAN_ROWS).contains(&rows) {
            config.header_scan_rows = rows;
        } else {
            warnings.push(out_of_range(
                "[detection] header_scan_rows",
                rows,
                format!("1-{}", constants::MAX_HEADER_SCAN_ROWS),
                constants::DEFAULT_HEADER_SCAN_ROWS,
            ));
        }
    }

    // -- Detection: sample_rows --
    if let Some(rows) = raw.detection.sample_rows {
        if (1..=constants::MAX_SAMPLE_ROWS).contains(&rows) {
            config.sample_rows = rows;
        } else {
            warnings.push(out_of_range(
                "[detection] sample_rows",
                rows,
                format!("1-{}", constants::MAX_SAMPLE_ROWS),
                constants::DEFAULT_SAMPLE_ROWS,
            ));
        }
    }

    // -- Normalize: ambiguous_dates --
    if let Some(ref order) = raw.normalize.ambiguous_dates {
        match order.trim().to_lowercase().as_str() {
            "day-first" => config.month_first_dates = false,
            "month-first" => config.month_first_dates = true,
            other => warnings.push(format!(
                "[normalize] ambiguous_dates = \"{other}\" is not recognised. \
                 Expected \"day-first\" or \"month-first\". Using default (day-first).",
            )),
        }
    }

    // -- Input: max_file_bytes --
    if let Some(bytes) = raw.input.max_file_bytes {
        if (constants::MIN_MAX_FILE_BYTES..=constants::ABSOLUTE_MAX_FILE_BYTES).contains(&bytes) {
            config.max_file_bytes = bytes;
        } else {
            warnings.push(out_of_range(
                "[input] max_file_bytes",
                bytes,
                format!(
                    "{}-{}",
                    constants::MIN_MAX_FILE_BYTES,
                    constants::ABSOLUTE_MAX_FILE_BYTES
                ),
                constants::DEFAULT_MAX_FILE_BYTES,
            ));
        }
    }

    // -- Aliases: user_alias_directory --
    if let Some(ref dir) = raw.aliases.user_alias_directory {
        if !dir.trim().is_empty() {
            config.user_alias_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

fn out_of_range(
    key: &str,
    value: impl std::fmt::Display,
    range: String,
    default: impl std::fmt::Display,
) -> String {
    let e = ConfigError::ValueOutOfRange {
        field: key.to_string(),
        value: value.to_string(),
        expected: range,
    };
    format!("{e}. Using default ({default}).")
}
