//! Local pipeline execution command: drives the orchestrator from a
//! pre-built [`presto_core::Pipeline`] and turns engine errors into
//! the process exit codes `main.rs` reports.

use std::path::PathBuf;
use std::sync::Arc;

use presto_core::Pipeline;
use presto_engine::{EngineError, Orchestrator};
use presto_exec::LocalExecutor;
use tracing::error;

pub async fn run(
    pipeline: Pipeline,
    presto_dir: PathBuf,
    workers: usize,
    print_only: bool,
    force: bool,
    node: Option<&str>,
) -> i32 {
    let mut orchestrator = Orchestrator::new(pipeline, Arc::new(LocalExecutor), presto_dir, workers);
    orchestrator.set_print_only(print_only);
    orchestrator.set_force_execution(force);

    match orchestrator.execute(node).await {
        Ok(()) => 0,
        Err(EngineError::UnknownNode(name)) => {
            error!(critical = true, node = %name, "unknown node");
            -1
        }
        Err(err) => {
            error!(critical = true, %err, "pipeline execution failed");
            -1
        }
    }
}
