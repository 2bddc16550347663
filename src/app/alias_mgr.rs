// VinSplit - app/alias_mgr.rs
//
// Loads the field alias table and brand catalog from the built-in sources
// (embedded in the binary) and from optional user files on disk.
// A user entry replaces the built-in entry with the same id.

use crate::core::aliases::{
    self, BrandCatalog, BrandEntry, Catalogs, FieldAliasTable, FieldAliases,
};
use crate::util::constants;
use crate::util::error::AliasError;
use std::path::Path;

/// Load both catalogs: built-in first, then user overrides from `user_dir`.
///
/// A user file that cannot be read or fails validation is skipped as a
/// whole and reported in the returned error list; the built-in entries stay
/// in effect. Only a broken built-in catalog is fatal.
pub fn load_catalogs(user_dir: Option<&Path>) -> Result<(Catalogs, Vec<AliasError>), AliasError> {
    let mut fields = aliases::builtin_field_aliases()?;
    let mut brands = aliases::builtin_brand_catalog()?;
    let mut errors = Vec::new();

    tracing::info!(
        fields = fields.len(),
        brands = brands.len(),
        "Loaded built-in catalogs"
    );

    match user_dir {
        Some(dir) if dir.is_dir() => {
            let fields_path = dir.join(constants::FIELD_ALIASES_FILE_NAME);
            if fields_path.is_file() {
                match read_alias_file(&fields_path).and_then(|content| {
                    aliases::parse_field_aliases_toml(&content, &fields_path)
                        .and_then(|def| aliases::compile_field_aliases(def, &fields_path))
                }) {
                    Ok(user) => merge_fields(&mut fields, user),
                    Err(e) => errors.push(e),
                }
            }

            let brands_path = dir.join(constants::BRAND_CATALOG_FILE_NAME);
            if brands_path.is_file() {
                match read_alias_file(&brands_path).and_then(|content| {
                    aliases::parse_brand_catalog_toml(&content, &brands_path)
                        .and_then(|def| aliases::compile_brand_catalog(def, &brands_path))
                }) {
                    Ok(user) => merge_brands(&mut brands, user),
                    Err(e) => errors.push(e),
                }
            }
        }
        Some(dir) => {
            tracing::debug!(
                dir = %dir.display(),
                "User alias directory does not exist (skipping)"
            );
        }
        None => {}
    }

    for e in &errors {
        tracing::warn!(error = %e, "Skipped user alias file");
    }

    let catalogs = Catalogs {
        fields: FieldAliasTable::from_entries(fields)?,
        brands: BrandCatalog::new(brands),
    };
    tracing::info!(
        brands = catalogs.brands.entries().len(),
        errors = errors.len(),
        "Catalog loading complete"
    );

    Ok((catalogs, errors))
}

fn read_alias_file(path: &Path) -> Result<String, AliasError> {
    let metadata = std::fs::metadata(path).map_err(|e| AliasError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > constants::MAX_ALIAS_FILE_SIZE {
        return Err(AliasError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_ALIAS_FILE_SIZE,
        });
    }
    std::fs::read_to_string(path).map_err(|e| AliasError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// User entries replace the built-in entry for the same field. Every field
/// has a built-in entry, so nothing is ever appended.
fn merge_fields(base: &mut [FieldAliases], user: Vec<FieldAliases>) {
    for entry in user {
        if let Some(slot) = base.iter_mut().find(|b| b.field == entry.field) {
            tracing::info!(field = entry.field.id(), "User aliases override built-in");
            *slot = entry;
        }
    }
}

/// User entries replace the built-in brand in place, keeping its catalog
/// position for tie-breaks.
fn merge_brands(base: &mut [BrandEntry], user: Vec<BrandEntry>) {
    for entry in user {
        if let Some(slot) = base.iter_mut().find(|b| b.brand == entry.brand) {
            tracing::info!(brand = entry.brand.label(), "User keywords override built-in");
            *slot = entry;
        }
    }
}
