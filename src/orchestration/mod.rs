//! Orchestration layer for the publish build step

pub mod build;

pub use build::{BuildOrchestrator, BuildReport, OUTPUT_DIR_PREFIX};
