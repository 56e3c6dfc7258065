//! Error type shared by the loader, the compiler and the writer.

use std::path::PathBuf;

use thiserror::Error;

use crate::tree::NodeId;

/// Every failure a compilation run can surface.
///
/// Unreachable leaves are deliberately absent: they are dropped during
/// range minimization and only logged.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The tree itself is malformed. The run is aborted and no output is valid.
    #[error("malformed tree at node {node}: {reason}")]
    Structural { node: NodeId, reason: String },

    /// A path tests a feature that has no domain in the registry.
    #[error("node {node} splits on feature '{feature}' which has no configured domain")]
    UnknownFeature { node: NodeId, feature: String },

    /// The registry or table configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O failure on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A feature vector or labelled row could not be parsed.
    #[error("invalid sample data: {0}")]
    Sample(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl CompileError {
    pub(crate) fn structural(node: NodeId, reason: impl Into<String>) -> Self {
        CompileError::Structural { node, reason: reason.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
