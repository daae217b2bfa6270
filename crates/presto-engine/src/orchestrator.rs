//! Bounded-parallel execution of a pipeline from a starting node.
//!
//! Grounded on `PipelineOrchestrator::execute_inner` (single async
//! entry point driving a dependency-ordered walk) and
//! `ThreadedPipelineExecutor` (`_execute_one_node`/`_execute_one_scope_value`):
//! one bounded thread/task pool per node, skip-on-prior-success unless
//! forced, and a status dump after every individual completion so a
//! crash mid-run never loses more than the in-flight command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use presto_core::{Context, Node, Pipeline, ScopeValueStatus, ROOT_NAME};
use presto_exec::{Executor, Outcome};

use crate::progress::{finish_progress, print_progress};
use crate::status_store::StatusStore;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown node '{0}' in pipeline")]
    UnknownNode(String),
    #[error(transparent)]
    Pipeline(#[from] presto_core::Error),
    #[error(transparent)]
    Status(#[from] crate::status_store::StatusStoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Drives a [`Pipeline`] through a bounded-parallel executor.
pub struct Orchestrator<E: Executor = presto_exec::LocalExecutor> {
    pipeline: Pipeline,
    executor: Arc<E>,
    status_store: Arc<StatusStore>,
    max_workers: usize,
    print_only: bool,
    force_execution: bool,
}

impl<E: Executor + 'static> Orchestrator<E> {
    pub fn new(pipeline: Pipeline, executor: Arc<E>, presto_dir: PathBuf, max_workers: usize) -> Self {
        Self {
            pipeline,
            executor,
            status_store: Arc::new(StatusStore::new(presto_dir)),
            max_workers: max_workers.max(1),
            print_only: false,
            force_execution: false,
        }
    }

    pub fn set_print_only(&mut self, value: bool) {
        self.print_only = value;
    }

    pub fn set_force_execution(&mut self, value: bool) {
        self.force_execution = value;
    }

    /// Run (or print) `node_name` and every descendant reachable from
    /// it, in topological order. `None` starts from the synthetic
    /// root, which itself does nothing but anchor the walk.
    pub async fn execute(&self, node_name: Option<&str>) -> Result<()> {
        let start_name = node_name.unwrap_or(ROOT_NAME);
        let start = if start_name == ROOT_NAME {
            self.pipeline.root()
        } else {
            self.pipeline
                .get(start_name)
                .ok_or_else(|| EngineError::UnknownNode(start_name.to_string()))?
        };

        if !start.is_root() {
            self.run_or_print(start).await?;
        }

        for node in self.pipeline.walk(start_name) {
            self.run_or_print(node).await?;
        }
        Ok(())
    }

    async fn run_or_print(&self, node: &Node) -> Result<()> {
        if self.print_only {
            self.print_node(node);
        } else {
            self.run_node(node).await?;
        }
        Ok(())
    }

    fn print_node(&self, node: &Node) {
        println!("Executing: {}", node.name);
        for scope_value in &node.scope.values {
            if let Some(argv) = node.precomputed_argvs.get(scope_value) {
                println!("{}", argv.join(" "));
            }
        }
    }

    async fn run_node(&self, node: &Node) -> Result<()> {
        let previous = self.status_store.load(&node.name)?;
        let effective_workers = ((self.max_workers as f64) * node.workers_modifier).floor().max(1.0) as usize;
        let semaphore = Arc::new(Semaphore::new(effective_workers));

        let status = Arc::new(Mutex::new(previous));
        let total = node.scope.values.len().max(1);
        let mut completed = 0usize;
        let mut all_ok = true;
        let mut failed_values = Vec::new();

        let mut tasks: JoinSet<(String, ScopeValueStatus)> = JoinSet::new();
        for scope_value in node.scope.values.clone() {
            let permit = semaphore.clone();
            let executor = self.executor.clone();
            let force = self.force_execution;
            let argv = node
                .precomputed_argvs
                .get(&scope_value)
                .cloned()
                .unwrap_or_default();
            let previous_entry = status.lock().by_value.get(&scope_value).cloned();

            tasks.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore never closed");
                let outcome = execute_one_scope_value(executor.as_ref(), &argv, previous_entry, force).await;
                (scope_value, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (scope_value, entry) = joined.expect("scope value task panicked");
            if entry.is_success() {
                completed += 1;
            } else {
                all_ok = false;
                failed_values.push(scope_value.clone());
            }
            status.lock().by_value.insert(scope_value, entry);
            self.status_store.save(&node.name, &status.lock())?;
            print_progress(&node.description, completed as f64 / total as f64, all_ok);
        }
        finish_progress();

        if !failed_values.is_empty() {
            warn!(node = %node.name, ?failed_values, "node had failing scope values");
        }
        info!(node = %node.name, success = all_ok, "node finished");
        Ok(())
    }
}

async fn execute_one_scope_value(
    executor: &impl Executor,
    argv: &[String],
    previous: Option<ScopeValueStatus>,
    force: bool,
) -> ScopeValueStatus {
    let previous_success = previous.as_ref().is_some_and(|p| p.is_success());
    if previous_success && !force {
        return ScopeValueStatus::skipped(previous.as_ref().expect("previous_success implies previous"), argv);
    }

    match executor.run(argv).await {
        Outcome::Success { output } => ScopeValueStatus::executed(argv, true, output, Utc::now()),
        Outcome::NonZeroExit { output, .. } => ScopeValueStatus::executed(argv, false, output, Utc::now()),
        Outcome::CommandNotFound { message } => {
            let mut status = ScopeValueStatus::executed(argv, false, message, Utc::now());
            status.context = Context::CommandNotFound;
            status
        }
        Outcome::PermissionDenied { message } => {
            let mut status = ScopeValueStatus::executed(argv, false, message, Utc::now());
            status.context = Context::PermissionDenied;
            status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presto_core::{Node as CoreNode, Scope};
    use std::collections::HashMap as StdHashMap;

    struct AlwaysSucceeds;

    #[async_trait::async_trait]
    impl Executor for AlwaysSucceeds {
        async fn run(&self, _argv: &[String]) -> Outcome {
            Outcome::Success { output: "ok\n".to_string() }
        }
    }

    fn single_node_pipeline() -> Pipeline {
        let mut nodes = StdHashMap::new();
        nodes.insert(ROOT_NAME.to_string(), CoreNode::root());
        let scope = Scope::new("s", "s", vec!["v1".to_string()]);
        let mut precomputed = HashMap::new();
        precomputed.insert("v1".to_string(), vec!["echo".to_string(), "v1".to_string()]);
        let node = CoreNode {
            name: "build".to_string(),
            description: "build".to_string(),
            scope,
            cmd: vec!["echo".to_string(), "${value}".to_string()],
            parents: std::collections::HashSet::from([ROOT_NAME.to_string()]),
            workers_modifier: 1.0,
            precomputed_argvs: precomputed,
        };
        nodes.insert("build".to_string(), node);
        let mut edges = StdHashMap::new();
        edges.insert("build".to_string(), std::collections::HashSet::from([ROOT_NAME.to_string()]));
        Pipeline::new(nodes, edges).unwrap()
    }

    #[tokio::test]
    async fn executes_every_node_reachable_from_root() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = single_node_pipeline();
        let orchestrator = Orchestrator::new(pipeline, Arc::new(AlwaysSucceeds), dir.path().to_path_buf(), 2);
        orchestrator.execute(None).await.unwrap();
        let status = orchestrator.status_store.load("build").unwrap();
        assert!(status.by_value["v1"].is_success());
    }

    #[tokio::test]
    async fn skips_scope_values_that_already_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = single_node_pipeline();
        let orchestrator = Orchestrator::new(pipeline, Arc::new(AlwaysSucceeds), dir.path().to_path_buf(), 2);
        orchestrator.execute(None).await.unwrap();
        orchestrator.execute(None).await.unwrap();
        let status = orchestrator.status_store.load("build").unwrap();
        assert_eq!(status.by_value["v1"].context, Context::NoWorkToDo);
        assert!(status.by_value["v1"].is_success());
    }
}
