//! Integration tests for devdrill
//!
//! Sources and task definitions live under `tests/fixtures`.

use std::fs;

use devdrill::Task;

mod config_loading;
mod python_run;
mod run_path;
mod sandbox_limits;
mod submit_path;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Helper to load a task definition
pub(crate) fn fixture_task(name: &str) -> Task {
    let path = format!("{FIXTURES_PATH}/tasks/{name}");
    let json = fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"));
    serde_json::from_str(&json).unwrap_or_else(|e| panic!("Invalid task {path}: {e}"))
}
