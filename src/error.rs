// src/error.rs

use serde::Serialize;
use thiserror::Error;

/// Why a source file contributed nothing to the run. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    #[error("could not read file: {0}")]
    Io(String),

    #[error("no encoding/delimiter combination produced a usable header")]
    Unreadable,

    #[error("file parsed but holds no data rows")]
    Empty,

    #[error("no description column among {available:?}")]
    NoDescriptionColumn { available: Vec<String> },

    #[error("no row matched the expense keywords")]
    NoMatchingRows,
}

/// Structural failure on the registry side: the run continues un-enriched
/// and reports reduced output to the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Degraded {
    #[error("registry file {path} not found")]
    RegistryMissing { path: String },

    #[error("registry file {path} could not be read: {reason}")]
    RegistryUnreadable { path: String, reason: String },

    #[error("registry file {path} holds no usable rows")]
    RegistryEmpty { path: String },

    #[error("registry file {path} has no registry id column; available: {available:?}")]
    RegistryKeyColumnMissing { path: String, available: Vec<String> },
}
