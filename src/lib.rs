// VinSplit - lib.rs
//
// Library entry point. The CLI in `main.rs` is a thin shell over
// `app::pipeline::process`; integration tests and other front ends use the
// same surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
