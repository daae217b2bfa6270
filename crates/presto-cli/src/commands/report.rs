//! `--report`: a read-only summary of each node's persisted status.
//!
//! The flag was previously declared but never implemented. Built from
//! scratch in the style of `run.rs`: plain `println!`, no table crate.

use std::collections::HashMap;
use std::path::Path;

use presto_core::ROOT_NAME;
use presto_engine::StatusStore;
use presto_runbook::load_pipeline;

pub fn report(pipe_yaml: &Path, scope_overrides: &HashMap<String, String>, presto_dir: &Path) -> presto_core::Result<()> {
    let pipeline = load_pipeline(pipe_yaml, scope_overrides)?;
    let store = StatusStore::new(presto_dir.to_path_buf());

    let mut names: Vec<&String> = pipeline.nodes().keys().filter(|name| name.as_str() != ROOT_NAME).collect();
    names.sort();

    for name in names {
        let status = store.load(name).unwrap_or_default();
        let total = status.by_value.len();
        let succeeded = status.by_value.values().filter(|v| v.is_success()).count();
        let failed = total - succeeded;
        println!("{name}: {succeeded}/{total} ({failed} failed)");

        for (scope_value, value_status) in &status.by_value {
            if !value_status.is_success() && !value_status.message.is_empty() {
                println!("  {scope_value}: {}", value_status.message);
            }
        }
    }
    Ok(())
}
