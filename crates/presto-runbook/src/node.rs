//! Builds a [`presto_core::Node`] from one YAML document.
//!
//! Grounded on `Node.__init__`: most missing keys are hard errors, but
//! a missing `__DEPEND_ON__` or `__WORKERS_MODIFIER__` only warns and
//! falls back to a default.

use std::collections::{HashMap, HashSet};

use presto_core::{Error, Node, Result, Scope, ROOT_NAME};

use crate::data_model::{FileIndex, SymbolTable};
use crate::evaluator::Evaluator;

/// Raw shape of a pipeline node document, before scope resolution.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawNode {
    #[serde(rename = "__NAME__")]
    pub name: String,
    #[serde(rename = "__DESCRIPTION__")]
    pub description: String,
    #[serde(rename = "__SCOPE__")]
    pub scope: String,
    #[serde(rename = "__CMD__")]
    pub cmd: Vec<String>,
    #[serde(rename = "__DEPEND_ON__", default)]
    pub depend_on: Option<Vec<String>>,
    #[serde(rename = "__WORKERS_MODIFIER__", default)]
    pub workers_modifier: Option<f64>,
}

/// Compile a [`RawNode`] into a [`Node`], resolving its scope and
/// pre-evaluating its command template against every scope value so a
/// broken template fails at build time rather than mid-run.
pub fn build_node(
    raw: RawNode,
    scopes: &HashMap<String, Scope>,
    symbols: &SymbolTable,
    files: &FileIndex,
) -> Result<Node> {
    let scope = scopes
        .get(&raw.scope)
        .cloned()
        .ok_or_else(|| Error::UnknownScope {
            node: raw.name.clone(),
            scope: raw.scope.clone(),
        })?;

    let mut parents: HashSet<String> = HashSet::new();
    parents.insert(ROOT_NAME.to_string());
    match raw.depend_on {
        Some(extra) => parents.extend(extra),
        None => {
            tracing::warn!(
                node = %raw.name,
                "no '__DEPEND_ON__' section; defaulting to {{{ROOT_NAME}}}"
            );
        }
    }

    let workers_modifier = match raw.workers_modifier {
        Some(m) => m,
        None => {
            tracing::debug!(node = %raw.name, "no '__WORKERS_MODIFIER__'; defaulting to 1.0");
            1.0
        }
    };

    let mut precomputed_argvs = HashMap::new();
    for value in &scope.values {
        let evaluator = Evaluator::with_scope_value(symbols, files, value.clone());
        let argv = raw
            .cmd
            .iter()
            .map(|arg| evaluator.evaluate(arg))
            .collect::<Result<Vec<String>>>()?;
        precomputed_argvs.insert(value.clone(), argv);
    }

    Ok(Node {
        name: raw.name,
        description: raw.description,
        scope,
        cmd: raw.cmd,
        parents,
        workers_modifier,
        precomputed_argvs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_depend_on_to_root() {
        let mut scopes = HashMap::new();
        scopes.insert("s".to_string(), Scope::new("s", "s", vec!["v".to_string()]));
        let symbols = SymbolTable::new();
        let files = FileIndex::default();
        let raw = RawNode {
            name: "build".into(),
            description: "build".into(),
            scope: "s".into(),
            cmd: vec!["echo".into()],
            depend_on: None,
            workers_modifier: None,
        };
        let node = build_node(raw, &scopes, &symbols, &files).unwrap();
        assert!(node.parents.contains(ROOT_NAME));
        assert_eq!(node.workers_modifier, 1.0);
    }

    #[test]
    fn unknown_scope_is_an_error() {
        let scopes = HashMap::new();
        let symbols = SymbolTable::new();
        let files = FileIndex::default();
        let raw = RawNode {
            name: "build".into(),
            description: "build".into(),
            scope: "missing".into(),
            cmd: vec![],
            depend_on: None,
            workers_modifier: None,
        };
        let err = build_node(raw, &scopes, &symbols, &files).unwrap_err();
        assert!(matches!(err, Error::UnknownScope { .. }));
    }
}
