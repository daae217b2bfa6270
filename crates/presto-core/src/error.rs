//! Error types for presto.

use thiserror::Error;

/// Build-time and structural errors. Per-value runtime outcomes
/// (command-not-found, permission-denied, non-zero exit) are not
/// modeled here; they are recorded directly into a node's
/// `ScopeValueStatus` and never propagate as an `Err`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("ambiguous match for '{key}' within '{context}': {candidates:?}")]
    AmbiguousMatch {
        key: String,
        context: String,
        candidates: Vec<String>,
    },

    #[error("bad regular expression '{pattern}': {source}")]
    BadRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("expected a string value for '{0}'")]
    NonString(String),

    #[error("root directory not found: {0}")]
    RootNotFound(String),

    #[error("unknown scope override: {0}")]
    UnknownScopeOverride(String),

    #[error("malformed data model: {0}")]
    MalformedDataModel(String),

    #[error("malformed node: {0}")]
    MalformedNode(String),

    #[error("unknown scope '{scope}' referenced by node '{node}'")]
    UnknownScope { node: String, scope: String },

    #[error("node '{node}' depends on unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },

    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("cyclic pipeline, cycles found: {0:?}")]
    CyclicPipeline(Vec<Vec<String>>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
