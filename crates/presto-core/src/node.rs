//! Node: a unit of execution bound to a scope and a command template.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// Name of the synthetic root node every pipeline is rooted at.
pub const ROOT_NAME: &str = "root";

/// A parsed pipeline node.
///
/// `precomputed_argvs` is filled in at construction time (one entry
/// per scope value) so a broken command template is caught before any
/// execution begins, as an integrity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub description: String,
    pub scope: Scope,
    pub cmd: Vec<String>,
    pub parents: HashSet<String>,
    pub workers_modifier: f64,
    pub precomputed_argvs: HashMap<String, Vec<String>>,
}

impl Node {
    /// The synthetic root node: no scope, no command, no parents.
    pub fn root() -> Self {
        Self {
            name: ROOT_NAME.to_string(),
            description: ROOT_NAME.to_string(),
            scope: Scope::new("", "", Vec::new()),
            cmd: Vec::new(),
            parents: HashSet::new(),
            workers_modifier: 1.0,
            precomputed_argvs: HashMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_NAME
    }
}
