//! Core domain types for the presto pipeline runner: scopes, nodes,
//! the pipeline DAG, per-value execution status, and the error
//! taxonomy shared by every other presto crate.

pub mod error;
pub mod node;
pub mod pipeline;
pub mod scope;
pub mod status;

pub use error::{Error, Result};
pub use node::{Node, ROOT_NAME};
pub use pipeline::Pipeline;
pub use scope::{escape_reserved_re_char, Scope};
pub use status::{Context, ExecutionStatus, NodeStatus, ScopeValueStatus};
