// VinSplit - core/aliases.rs
//
// Field alias tables and brand keyword catalogs: parsing, validation, and
// compilation. Core layer: accepts TOML strings, never touches the filesystem.
// I/O is handled by app::alias_mgr which feeds content here.

use crate::core::model::{Brand, CanonicalField};
use crate::util::constants;
use crate::util::error::AliasError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw contents of a `fields.toml` file.
#[derive(Debug, Deserialize, Default)]
pub struct FieldAliasFile {
    #[serde(default)]
    pub field: Vec<FieldAliasDef>,
}

#[derive(Debug, Deserialize)]
pub struct FieldAliasDef {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub composite_aliases: Vec<String>,
}

/// Raw contents of a `brands.toml` file.
#[derive(Debug, Deserialize, Default)]
pub struct BrandCatalogFile {
    #[serde(default)]
    pub brand: Vec<BrandDef>,
}

#[derive(Debug, Deserialize)]
pub struct BrandDef {
    pub id: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

// =============================================================================
// Compiled runtime structures
// =============================================================================

/// Normalised aliases for one canonical field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAliases {
    pub field: CanonicalField,
    /// Primary alias first; position is the alias rank.
    pub aliases: Vec<String>,
    /// Headers that mark a composite ENGINE-VIN column (VIN only).
    pub composite_aliases: Vec<String>,
}

impl FieldAliases {
    pub fn primary(&self) -> Option<&str> {
        self.aliases.first().map(String::as_str)
    }
}

/// Alias lists for every configured field, in canonical field order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAliasTable {
    entries: Vec<FieldAliases>,
}

impl FieldAliasTable {
    /// Build a table from compiled entries. The VIN field is mandatory.
    pub fn from_entries(mut entries: Vec<FieldAliases>) -> Result<Self, AliasError> {
        if !entries.iter().any(|e| e.field == CanonicalField::Vin) {
            return Err(AliasError::MissingField {
                field: CanonicalField::Vin.id(),
            });
        }
        entries.sort_by_key(|e| e.field);
        Ok(Self { entries })
    }

    pub fn get(&self, field: CanonicalField) -> Option<&FieldAliases> {
        self.entries.iter().find(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldAliases> {
        self.entries.iter()
    }

    /// True when the normalised header equals any alias of any field.
    pub fn is_known_header(&self, normalized: &str) -> bool {
        !normalized.is_empty()
            && self.entries.iter().any(|e| {
                e.aliases.iter().any(|a| a == normalized)
                    || e.composite_aliases.iter().any(|a| a == normalized)
            })
    }
}

/// Keywords and category for one brand.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandEntry {
    pub brand: Brand,
    /// Lowercased keywords.
    pub keywords: Vec<String>,
    pub category: String,
}

/// Brand keyword catalog. Entry order is the tie-break order.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandCatalog {
    entries: Vec<BrandEntry>,
}

impl BrandCatalog {
    pub fn new(entries: Vec<BrandEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BrandEntry] {
        &self.entries
    }

    /// Category label for a brand; `Unknown` and uncatalogued brands fall
    /// into the "Other" category.
    pub fn category_for(&self, brand: Brand) -> &str {
        self.entries
            .iter()
            .find(|e| e.brand == brand)
            .map(|e| e.category.as_str())
            .unwrap_or(constants::OTHER_CATEGORY)
    }
}

/// Everything the pipeline needs from the alias files, loaded once per
/// process and passed explicitly into each run.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalogs {
    pub fields: FieldAliasTable,
    pub brands: BrandCatalog,
}

// =============================================================================
// Normalisation
// =============================================================================

/// Normalise a header or alias for comparison: lowercase, every
/// non-alphanumeric character becomes a space, runs of whitespace collapse.
pub fn normalize_header(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Parsing, validation, and compilation
// =============================================================================

/// Parse a TOML string into a `FieldAliasFile`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_field_aliases_toml(
    content: &str,
    source_path: &Path,
) -> Result<FieldAliasFile, AliasError> {
    toml::from_str(content).map_err(|e| AliasError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Parse a TOML string into a `BrandCatalogFile`.
pub fn parse_brand_catalog_toml(
    content: &str,
    source_path: &Path,
) -> Result<BrandCatalogFile, AliasError> {
    toml::from_str(content).map_err(|e| AliasError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate field definitions and compile them into normalised entries.
///
/// Validates:
/// - every id names a canonical field
/// - no id appears twice in the file
/// - every entry keeps at least one alias after normalisation
///
/// Entries are returned in file order.
pub fn compile_field_aliases(
    def: FieldAliasFile,
    source_path: &Path,
) -> Result<Vec<FieldAliases>, AliasError> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(def.field.len());

    for entry in def.field {
        let field = CanonicalField::from_id(entry.id.trim()).ok_or_else(|| {
            AliasError::UnknownField {
                path: source_path.to_path_buf(),
                id: entry.id.clone(),
            }
        })?;
        if !seen.insert(field) {
            return Err(AliasError::DuplicateId {
                path: source_path.to_path_buf(),
                id: entry.id,
            });
        }

        let aliases = normalize_list(&entry.aliases);
        if aliases.is_empty() {
            return Err(AliasError::EmptyAliases {
                path: source_path.to_path_buf(),
                id: entry.id,
            });
        }

        let composite_aliases = normalize_list(&entry.composite_aliases);
        if !composite_aliases.is_empty() && field != CanonicalField::Vin {
            tracing::warn!(
                field = field.id(),
                source = %source_path.display(),
                "composite_aliases only apply to the vin field; ignoring"
            );
        }

        compiled.push(FieldAliases {
            field,
            aliases,
            composite_aliases: if field == CanonicalField::Vin {
                composite_aliases
            } else {
                Vec::new()
            },
        });
    }

    Ok(compiled)
}

/// Validate brand definitions and compile them into catalog entries.
///
/// Brands missing a category are placed in the "Other" category.
/// Entries are returned in file order.
pub fn compile_brand_catalog(
    def: BrandCatalogFile,
    source_path: &Path,
) -> Result<Vec<BrandEntry>, AliasError> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(def.brand.len());

    for entry in def.brand {
        let brand = Brand::from_id(&entry.id).ok_or_else(|| AliasError::UnknownBrand {
            path: source_path.to_path_buf(),
            id: entry.id.clone(),
        })?;
        if !seen.insert(brand) {
            return Err(AliasError::DuplicateId {
                path: source_path.to_path_buf(),
                id: entry.id,
            });
        }

        let keywords: Vec<String> = entry
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(AliasError::EmptyAliases {
                path: source_path.to_path_buf(),
                id: entry.id,
            });
        }

        let category = entry
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| constants::OTHER_CATEGORY.to_string());

        compiled.push(BrandEntry {
            brand,
            keywords,
            category,
        });
    }

    Ok(compiled)
}

fn normalize_list(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for alias in raw {
        let norm = normalize_header(alias);
        if !norm.is_empty() && !out.contains(&norm) {
            out.push(norm);
        }
    }
    out
}

// =============================================================================
// Built-in catalogs (embedded at compile time)
// =============================================================================

/// Embedded TOML content of the built-in field alias table.
pub fn builtin_field_aliases_source() -> &'static str {
    include_str!("../../aliases/fields.toml")
}

/// Embedded TOML content of the built-in brand catalog.
pub fn builtin_brand_catalog_source() -> &'static str {
    include_str!("../../aliases/brands.toml")
}

/// Parse and compile the built-in field aliases.
pub fn builtin_field_aliases() -> Result<Vec<FieldAliases>, AliasError> {
    let path = builtin_path(constants::FIELD_ALIASES_FILE_NAME);
    parse_field_aliases_toml(builtin_field_aliases_source(), &path)
        .and_then(|def| compile_field_aliases(def, &path))
}

/// Parse and compile the built-in brand catalog.
pub fn builtin_brand_catalog() -> Result<Vec<BrandEntry>, AliasError> {
    let path = builtin_path(constants::BRAND_CATALOG_FILE_NAME);
    parse_brand_catalog_toml(builtin_brand_catalog_source(), &path)
        .and_then(|def| compile_brand_catalog(def, &path))
}

/// Load the built-in catalogs with no user overrides.
pub fn load_builtin_catalogs() -> Result<Catalogs, AliasError> {
    let fields = FieldAliasTable::from_entries(builtin_field_aliases()?)?;
    let brands = BrandCatalog::new(builtin_brand_catalog()?);
    tracing::debug!(
        fields = fields.iter().count(),
        brands = brands.entries().len(),
        "Loaded built-in catalogs"
    );
    Ok(Catalogs { fields, brands })
}

fn builtin_path(file_name: &str) -> PathBuf {
    PathBuf::from(format!("<builtin>/{file_name}"))
}

// =============================================================================
// Tests
// =============================================================================
