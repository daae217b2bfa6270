//! Assembles a [`presto_core::Pipeline`] from a runbook YAML file: the
//! first document is the data-model config (`__ROOT__`, `__SCOPES__`),
//! every later document is either a node or a `__FILE__` include that
//! expands to more documents.
//!
//! Grounded on `Pipeline._build_nodes_from_documents`/`_build_edges`
//! (recursive include expansion, then one edge per declared parent).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use presto_core::{Error, Node, Pipeline, Result, ROOT_NAME};

use crate::data_model::{compile_scope, FileIndex, SymbolTable};
use crate::evaluator::Evaluator;
use crate::node::{build_node, RawNode};

/// Parse every YAML document out of a file, in order.
fn load_all_yaml(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)?;
    serde_yaml::Deserializer::from_str(&text)
        .map(|de| Value::deserialize(de).map_err(Error::from))
        .collect()
}

/// Build a fully-resolved pipeline from a runbook file on disk.
///
/// `scope_overrides` mirrors `--override_scope NAME:REGEXP`: each
/// entry replaces a declared scope's regular expression before it is
/// compiled against the file index.
pub fn load_pipeline(path: &Path, scope_overrides: &HashMap<String, String>) -> Result<Pipeline> {
    let mut documents = load_all_yaml(path)?;
    if documents.is_empty() {
        return Err(Error::MalformedDataModel("empty pipe.yaml file".to_string()));
    }
    let config_doc = documents.remove(0);
    let config_map = config_doc
        .as_mapping()
        .ok_or_else(|| Error::MalformedDataModel("first document must be a mapping".to_string()))?;

    let mut symbols = SymbolTable::new();
    for (k, v) in config_map {
        if let (Some(k), Some(v)) = (k.as_str(), v.as_str()) {
            symbols.insert(k, v);
        }
    }
    for (name, expr) in scope_overrides {
        symbols.insert(name.clone(), expr.clone());
    }

    let root_raw = config_map
        .get("__ROOT__")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedDataModel("configuration file must have a '__ROOT__' attribute".to_string()))?;

    let runbook_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let empty_files = FileIndex::default();
    let root_evaluated = Evaluator::new(&symbols, &empty_files).evaluate(root_raw)?;
    let root_path = resolve_path(runbook_dir, &root_evaluated);
    let files = FileIndex::from_root(&root_path).map_err(|_| Error::RootNotFound(root_path.display().to_string()))?;

    let scope_dict = config_map
        .get("__SCOPES__")
        .and_then(Value::as_mapping)
        .ok_or_else(|| Error::MalformedDataModel("configuration file must have a '__SCOPES__' attribute".to_string()))?;

    let mut scope_exprs: HashMap<String, String> = HashMap::new();
    for (k, v) in scope_dict {
        if let (Some(k), Some(v)) = (k.as_str(), v.as_str()) {
            scope_exprs.insert(k.to_string(), v.to_string());
        }
    }
    for (name, expr) in scope_overrides {
        if !scope_exprs.contains_key(name) {
            return Err(Error::UnknownScopeOverride(name.clone()));
        }
        scope_exprs.insert(name.clone(), expr.clone());
    }

    let mut scopes = HashMap::new();
    for (name, raw_expr) in &scope_exprs {
        let evaluator = Evaluator::new(&symbols, &files);
        let expr = evaluator.evaluate(raw_expr)?;
        symbols.insert_scope_expression(name.clone(), expr.clone());
        let scope = compile_scope(name, &expr, &files)?;
        scopes.insert(name.clone(), scope);
    }

    let mut nodes: HashMap<String, Node> = HashMap::new();
    nodes.insert(ROOT_NAME.to_string(), Node::root());
    build_nodes_from_documents(documents, runbook_dir, &symbols, &files, &scopes, &mut nodes)?;

    let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
    for (name, node) in &nodes {
        if name != ROOT_NAME {
            edges.insert(name.clone(), node.parents.clone());
        }
    }

    Pipeline::new(nodes, edges)
}

fn resolve_path(base: &Path, candidate: &str) -> PathBuf {
    let candidate_path = Path::new(candidate);
    if candidate_path.is_absolute() {
        candidate_path.to_path_buf()
    } else {
        base.join(candidate_path)
    }
}

fn build_nodes_from_documents(
    documents: Vec<Value>,
    runbook_dir: &Path,
    symbols: &SymbolTable,
    files: &FileIndex,
    scopes: &HashMap<String, presto_core::Scope>,
    nodes: &mut HashMap<String, Node>,
) -> Result<()> {
    for doc in documents {
        let mapping = doc
            .as_mapping()
            .ok_or_else(|| Error::MalformedNode("expected a mapping document".to_string()))?;

        if let Some(file_ref) = mapping.get("__FILE__").and_then(Value::as_str) {
            let evaluator = Evaluator::new(symbols, files);
            let filename = evaluator.evaluate(file_ref)?;
            let included_path = resolve_path(runbook_dir, &filename);
            let included_docs = load_all_yaml(&included_path)?;
            let included_dir = included_path.parent().unwrap_or(runbook_dir);
            build_nodes_from_documents(included_docs, included_dir, symbols, files, scopes, nodes)?;
        } else {
            let raw: RawNode = serde_yaml::from_value(doc)?;
            if nodes.contains_key(&raw.name) {
                return Err(Error::DuplicateNode(raw.name));
            }
            let node = build_node(raw, scopes, symbols, files)?;
            nodes.insert(node.name.clone(), node);
        }
    }
    Ok(())
}
