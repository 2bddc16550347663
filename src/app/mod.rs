// VinSplit - app/mod.rs
//
// Application layer: pipeline orchestration and alias catalog loading.
// Dependencies: core layer.
// Must NOT depend on: platform specifics, CLI.

pub mod alias_mgr;
pub mod pipeline;
