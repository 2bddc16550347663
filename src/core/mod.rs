// VinSplit - core/mod.rs
//
// Core pipeline: ingest, schema detection, normalisation, classification,
// aggregation, and workbook rendering.
// Dependencies: spreadsheet and text crates only; no filesystem access.
// Must NOT depend on: platform, app.

pub mod aliases;
pub mod classify;
pub mod dates;
pub mod detect;
pub mod export;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod report;
pub mod vin;
pub mod workbook;
