// VinSplit - core/export.rs
//
// CSV and JSON export of report previews and run summaries.
// Core layer: writes to any Write trait object.

use crate::core::model::{PreviewRow, ReportArtifact};
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;

/// Export preview rows to CSV.
///
/// Writes: brand, model, vin, retail_date, item_code, customer_name, purpose,
/// quantity, city, showroom, engine
pub fn export_preview_csv<W: Write>(
    rows: &[PreviewRow],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            "brand",
            "model",
            "vin",
            "retail_date",
            "item_code",
            "customer_name",
            "purpose",
            "quantity",
            "city",
            "showroom",
            "engine",
        ])
        .map_err(csv_err)?;

    for row in rows {
        let date = row
            .retail_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        csv_writer
            .write_record([
                row.brand.label(),
                row.model.as_deref().unwrap_or(""),
                &row.vin,
                &date,
                row.item_code.as_deref().unwrap_or(""),
                row.customer_name.as_deref().unwrap_or(""),
                row.purpose.as_deref().unwrap_or(""),
                &row.quantity.to_string(),
                row.city.as_deref().unwrap_or(""),
                row.showroom.as_deref().unwrap_or(""),
                row.engine.as_deref().unwrap_or(""),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(rows.len())
}

/// Export preview rows to JSON (array of objects).
pub fn export_preview_json<W: Write>(
    rows: &[PreviewRow],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, rows).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(rows.len())
}

/// Export the run summary: stats, brand summaries, category breakdown,
/// column mapping, and preview rows. Workbook bytes are not included.
pub fn export_summary_json<W: Write>(
    artifact: &ReportArtifact,
    writer: W,
    export_path: &Path,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, artifact).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })
}
