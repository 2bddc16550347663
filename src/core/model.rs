// VinSplit - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::error::FormatError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Input format
// =============================================================================

/// Declared format of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Xlsx,
    Xls,
    Csv,
}

impl InputFormat {
    /// Lowercase label, also the file extension.
    pub fn label(&self) -> &'static str {
        match self {
            InputFormat::Xlsx => "xlsx",
            InputFormat::Xls => "xls",
            InputFormat::Csv => "csv",
        }
    }

    /// Infer the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self, FormatError> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        ext.parse()
    }
}

impl FromStr for InputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "xlsx" | "xlsm" => Ok(InputFormat::Xlsx),
            "xls" => Ok(InputFormat::Xls),
            "csv" | "txt" => Ok(InputFormat::Csv),
            _ => Err(FormatError::Unsupported {
                declared: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Cells and raw tables (ingestion boundary)
// =============================================================================

/// A single spreadsheet cell, tagged at the moment it is read.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Empty,
}

impl CellValue {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    /// Render the cell as trimmed text; `None` when blank.
    ///
    /// Whole numbers render without a fractional part so numeric codes read
    /// from spreadsheets ("10045.0") come out as "10045".
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Date(dt) => Some(dt.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Format a number the way a spreadsheet user typed it.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One data row of a raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based row number in the source sheet.
    pub source_row: usize,
    /// Cells in column order. May be shorter than the header row.
    pub cells: Vec<CellValue>,
}

impl RawRow {
    /// Cell at `column`, treating missing trailing cells as empty.
    pub fn cell(&self, column: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.cells.get(column).unwrap_or(EMPTY)
    }
}

/// An uploaded sheet after header location.
///
/// Headers keep file order and may repeat; columns are addressed by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    /// 1-based source row number of the header row.
    pub header_row: usize,
    pub rows: Vec<RawRow>,
    /// Completely blank rows dropped below the header.
    pub blank_rows: usize,
}

// =============================================================================
// Canonical schema
// =============================================================================

/// The ten output columns, in canonical order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Brand,
    Model,
    Vin,
    RetailDate,
    ItemCode,
    CustomerName,
    Purpose,
    Quantity,
    City,
    Showroom,
}

impl CanonicalField {
    /// All fields in canonical order.
    pub fn all() -> &'static [CanonicalField] {
        &[
            CanonicalField::Brand,
            CanonicalField::Model,
            CanonicalField::Vin,
            CanonicalField::RetailDate,
            CanonicalField::ItemCode,
            CanonicalField::CustomerName,
            CanonicalField::Purpose,
            CanonicalField::Quantity,
            CanonicalField::City,
            CanonicalField::Showroom,
        ]
    }

    /// Stable identifier used in alias files and JSON.
    pub fn id(&self) -> &'static str {
        match self {
            CanonicalField::Brand => "brand",
            CanonicalField::Model => "model",
            CanonicalField::Vin => "vin",
            CanonicalField::RetailDate => "retail_date",
            CanonicalField::ItemCode => "item_code",
            CanonicalField::CustomerName => "customer_name",
            CanonicalField::Purpose => "purpose",
            CanonicalField::Quantity => "quantity",
            CanonicalField::City => "city",
            CanonicalField::Showroom => "showroom",
        }
    }

    /// Column header written to report sheets.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::Brand => "Brand",
            CanonicalField::Model => "Model",
            CanonicalField::Vin => "VIN",
            CanonicalField::RetailDate => "Retail Date",
            CanonicalField::ItemCode => "Item Code",
            CanonicalField::CustomerName => "Customer Name",
            CanonicalField::Purpose => "Purpose",
            CanonicalField::Quantity => "Quantity",
            CanonicalField::City => "City",
            CanonicalField::Showroom => "Showroom",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.id() == id)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How confidently a header matched a field. Declared best-first, so the
/// derived `Ord` sorts stronger matches before weaker ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Header equals the field's primary alias.
    Exact,
    /// Header equals one of the field's other aliases.
    Alias,
    /// An alias appears as a whole-word run inside the header.
    Substring,
    /// No header matched; the column's sampled values look like the field.
    DataPattern,
}

/// The raw column chosen for one canonical field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMatch {
    /// 0-based column index.
    pub column: usize,
    /// Header text as it appeared in the file.
    pub header: String,
    pub tier: MatchTier,
    /// Normalised alias that produced the match (empty for DataPattern).
    pub alias: String,
    /// The column holds comma-separated ENGINE-VIN pairs rather than bare VINs.
    pub composite: bool,
}

/// A column that also matched a field which was already mapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverflowColumn {
    pub field: CanonicalField,
    pub column: usize,
    pub header: String,
}

/// Canonical field -> raw column. Built once per file, immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMapping {
    matches: BTreeMap<CanonicalField, ColumnMatch>,
    /// Ignored candidate columns, in file order.
    pub overflow: Vec<OverflowColumn>,
}

impl ColumnMapping {
    pub fn new(
        matches: BTreeMap<CanonicalField, ColumnMatch>,
        overflow: Vec<OverflowColumn>,
    ) -> Self {
        Self { matches, overflow }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&ColumnMatch> {
        self.matches.get(&field)
    }

    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.matches.get(&field).map(|m| m.column)
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.matches.contains_key(&field)
    }

    /// Fields with no column, in canonical order.
    pub fn unmapped(&self) -> Vec<CanonicalField> {
        CanonicalField::all()
            .iter()
            .copied()
            .filter(|f| !self.is_mapped(*f))
            .collect()
    }
}

// =============================================================================
// Brands
// =============================================================================

/// The closed set of brands a record can belong to.
///
/// Declaration order is the canonical report order; `Unknown` is always last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Brand {
    #[serde(rename = "CHANGAN")]
    Changan,
    #[serde(rename = "MAXUS")]
    Maxus,
    #[serde(rename = "GEELY")]
    Geely,
    #[serde(rename = "GWM")]
    Gwm,
    #[serde(rename = "ZNA")]
    Zna,
    #[serde(rename = "DFAC")]
    Dfac,
    #[serde(rename = "KMC")]
    Kmc,
    #[serde(rename = "HYUNDAI")]
    Hyundai,
    #[serde(rename = "LOVOL")]
    Lovol,
    #[serde(rename = "FOTON")]
    Foton,
    #[serde(rename = "DINGZHOU")]
    Dingzhou,
    #[default]
    Unknown,
}

impl Brand {
    /// All variants in canonical order, `Unknown` last.
    pub fn all() -> &'static [Brand] {
        &[
            Brand::Changan,
            Brand::Maxus,
            Brand::Geely,
            Brand::Gwm,
            Brand::Zna,
            Brand::Dfac,
            Brand::Kmc,
            Brand::Hyundai,
            Brand::Lovol,
            Brand::Foton,
            Brand::Dingzhou,
            Brand::Unknown,
        ]
    }

    /// Display label; also the brand's sheet name.
    pub fn label(&self) -> &'static str {
        match self {
            Brand::Changan => "CHANGAN",
            Brand::Maxus => "MAXUS",
            Brand::Geely => "GEELY",
            Brand::Gwm => "GWM",
            Brand::Zna => "ZNA",
            Brand::Dfac => "DFAC",
            Brand::Kmc => "KMC",
            Brand::Hyundai => "HYUNDAI",
            Brand::Lovol => "LOVOL",
            Brand::Foton => "FOTON",
            Brand::Dingzhou => "DINGZHOU",
            Brand::Unknown => "Unknown",
        }
    }

    /// Parse a known brand id (case-insensitive). `Unknown` is not an id.
    pub fn from_id(id: &str) -> Option<Self> {
        let upper = id.trim().to_uppercase();
        Self::all()
            .iter()
            .copied()
            .filter(Brand::is_known)
            .find(|b| b.label() == upper)
    }

    pub fn is_known(&self) -> bool {
        *self != Brand::Unknown
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Records
// =============================================================================

/// A row after normalisation, before brand classification.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub source_row: usize,
    /// Text of the Brand column, if one was mapped.
    pub brand_hint: Option<String>,
    pub model: Option<String>,
    pub vin: String,
    pub engine: Option<String>,
    pub retail_date: Option<NaiveDate>,
    pub item_code: Option<String>,
    pub customer_name: Option<String>,
    pub purpose: Option<String>,
    pub quantity: u32,
    pub city: Option<String>,
    pub showroom: Option<String>,
}

/// The normalised unit of a dispatch register.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRecord {
    pub brand: Brand,
    pub model: Option<String>,
    /// Trimmed and upper-cased; never empty.
    pub vin: String,
    pub retail_date: Option<NaiveDate>,
    pub item_code: Option<String>,
    pub customer_name: Option<String>,
    pub purpose: Option<String>,
    pub quantity: u32,
    pub city: Option<String>,
    pub showroom: Option<String>,
    /// Engine number split out of a composite ENGINE-VIN cell.
    pub engine: Option<String>,
    #[serde(skip)]
    pub source_row: usize,
}

impl DispatchRecord {
    pub fn from_row(row: NormalizedRow, brand: Brand) -> Self {
        Self {
            brand,
            model: row.model,
            vin: row.vin,
            retail_date: row.retail_date,
            item_code: row.item_code,
            customer_name: row.customer_name,
            purpose: row.purpose,
            quantity: row.quantity,
            city: row.city,
            showroom: row.showroom,
            engine: row.engine,
            source_row: row.source_row,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters for per-row problems absorbed during normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    /// Non-blank data rows below the header.
    pub rows_read: usize,
    /// Blank rows skipped at ingest.
    pub blank_rows: usize,
    /// Rows (or ENGINE-VIN pairs) dropped for an empty VIN.
    pub empty_vins: usize,
    /// Rows (or ENGINE-VIN pairs) dropped for a placeholder VIN.
    pub placeholder_vins: usize,
    /// Quantities replaced by the default.
    pub quantities_defaulted: usize,
    /// Present date values that could not be parsed.
    pub dates_unparsed: usize,
    /// Extra records produced by splitting multi-pair ENGINE-VIN cells.
    pub split_records: usize,
}

impl NormalizeStats {
    pub fn discarded(&self) -> usize {
        self.empty_vins + self.placeholder_vins
    }
}

/// Per-brand aggregate. Computed once from the final record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandSummary {
    pub brand: Brand,
    pub category: String,
    pub count: usize,
    pub unique_vins: usize,
    pub unique_engines: usize,
    pub total_quantity: u64,
}

/// Whole-report statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStats {
    /// All surviving records, `Unknown` included.
    pub total_vehicles: usize,
    /// Records assigned to a known brand.
    pub classified_vehicles: usize,
    pub unknown_vehicles: usize,
    /// Brand buckets with at least one record.
    pub brands_count: usize,
    /// Distinct non-empty model names (case-insensitive).
    pub unique_models: usize,
    /// Sum of per-brand unique VIN counts.
    pub total_unique_vins: usize,
    pub normalize: NormalizeStats,
}

/// One brand's share within a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEntry {
    pub brand: Brand,
    pub count: usize,
    /// Share of `total_vehicles`, rounded to two decimals.
    pub percentage: f64,
}

/// Brands grouped under a category label, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub brands: Vec<CategoryEntry>,
}

// =============================================================================
// Report output
// =============================================================================

/// A typed cell in a report sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SheetCell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl SheetCell {
    pub fn text(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.is_empty() => SheetCell::Text(s.to_string()),
            _ => SheetCell::Empty,
        }
    }
}

/// What a sheet holds, for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    Summary,
    Brand(Brand),
}

/// Planned content of one worksheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSheet {
    pub name: String,
    pub kind: SheetKind,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
}

/// Flattened record for a searchable preview grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub brand: Brand,
    pub model: Option<String>,
    pub vin: String,
    pub retail_date: Option<NaiveDate>,
    pub item_code: Option<String>,
    pub customer_name: Option<String>,
    pub purpose: Option<String>,
    pub quantity: u32,
    pub city: Option<String>,
    pub showroom: Option<String>,
    pub engine: Option<String>,
}

impl From<&DispatchRecord> for PreviewRow {
    fn from(r: &DispatchRecord) -> Self {
        Self {
            brand: r.brand,
            model: r.model.clone(),
            vin: r.vin.clone(),
            retail_date: r.retail_date,
            item_code: r.item_code.clone(),
            customer_name: r.customer_name.clone(),
            purpose: r.purpose.clone(),
            quantity: r.quantity,
            city: r.city.clone(),
            showroom: r.showroom.clone(),
            engine: r.engine.clone(),
        }
    }
}

/// Final output of one pipeline run. Memory only; never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportArtifact {
    /// Rendered xlsx bytes.
    #[serde(skip)]
    pub workbook: Vec<u8>,
    #[serde(skip)]
    pub sheets: Vec<ReportSheet>,
    pub summaries: Vec<BrandSummary>,
    pub stats: ReportStats,
    pub categories: Vec<CategoryBreakdown>,
    pub mapping: ColumnMapping,
    pub preview: Vec<PreviewRow>,
}

impl ReportArtifact {
    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn summary_for(&self, brand: Brand) -> Option<&BrandSummary> {
        self.summaries.iter().find(|s| s.brand == brand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_from_declared_and_extension() {
        assert_eq!("XLSX".parse::<InputFormat>().unwrap(), InputFormat::Xlsx);
        assert_eq!(".csv".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert_eq!(
            InputFormat::from_file_name("Desp_regENDMAY2025.xls").unwrap(),
            InputFormat::Xls
        );
        assert!(matches!(
            InputFormat::from_file_name("report.pdf"),
            Err(FormatError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_cell_to_text() {
        assert_eq!(CellValue::Number(10045.0).to_text().unwrap(), "10045");
        assert_eq!(CellValue::Number(2.5).to_text().unwrap(), "2.5");
        assert_eq!(CellValue::Text("  ab ".into()).to_text().unwrap(), "ab");
        assert_eq!(CellValue::Text("   ".into()).to_text(), None);
        assert!(CellValue::Text(" ".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_raw_row_missing_cells_are_empty() {
        let row = RawRow {
            source_row: 2,
            cells: vec![CellValue::Text("a".into())],
        };
        assert_eq!(row.cell(5), &CellValue::Empty);
    }

    #[test]
    fn test_brand_order_puts_unknown_last() {
        let mut brands = vec![Brand::Unknown, Brand::Foton, Brand::Changan];
        brands.sort();
        assert_eq!(brands, vec![Brand::Changan, Brand::Foton, Brand::Unknown]);
    }

    #[test]
    fn test_brand_from_id() {
        assert_eq!(Brand::from_id("hyundai"), Some(Brand::Hyundai));
        assert_eq!(Brand::from_id("Unknown"), None);
        assert_eq!(Brand::from_id("TESLA"), None);
    }

    #[test]
    fn test_canonical_field_ids_round_trip() {
        for field in CanonicalField::all() {
            assert_eq!(CanonicalField::from_id(field.id()), Some(*field));
        }
    }
}
