//! Persisted outcome of running one node against one scope value.
//!
//! Field order matches the `.nexec` YAML layout so hand-written status
//! files from older runs stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Success,
    Failure,
    #[serde(rename = "")]
    Unknown,
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Why a value ended up in its current status. `Executed` means the
/// command actually ran (success or failure); the rest describe why it
/// didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Context {
    #[serde(rename = "EXECUTED")]
    Executed,
    #[serde(rename = "NO_WORK_TO_DO")]
    NoWorkToDo,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied,
    #[serde(rename = "COMMAND_NOT_FOUND")]
    CommandNotFound,
    #[serde(rename = "BAD_FORMAT")]
    BadFormat,
    #[serde(rename = "")]
    Unknown,
}

impl Default for Context {
    fn default() -> Self {
        Self::Unknown
    }
}

/// One scope value's recorded outcome for one node. `cmd` is the
/// space-joined rendering of the resolved argv, not the argv itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeValueStatus {
    pub execution_date: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub context: Context,
    pub cmd: String,
    pub message: String,
}

impl ScopeValueStatus {
    pub fn executed(cmd: &[String], success: bool, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            execution_date: now,
            status: if success { ExecutionStatus::Success } else { ExecutionStatus::Failure },
            context: Context::Executed,
            cmd: cmd.join(" "),
            message: message.into(),
        }
    }

    /// A scope value skipped because it already succeeded: keeps the
    /// prior record's `status`, `message` and `execution_date`, and
    /// only flips `context` to `NoWorkToDo`. `cmd` is still refreshed
    /// to the freshly rendered command.
    pub fn skipped(previous: &ScopeValueStatus, cmd: &[String]) -> Self {
        Self {
            cmd: cmd.join(" "),
            context: Context::NoWorkToDo,
            ..previous.clone()
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }
}

/// A node's full on-disk status: one entry per scope value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(flatten)]
    pub by_value: std::collections::HashMap<String, ScopeValueStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_yaml() {
        let status = ScopeValueStatus::executed(&["echo".to_string(), "hi".to_string()], true, "ok", Utc::now());
        let yaml = serde_yaml::to_string(&status).unwrap();
        let back: ScopeValueStatus = serde_yaml::from_str(&yaml).unwrap();
        assert!(back.is_success());
        assert_eq!(back.context, Context::Executed);
    }
}
