//! Error types
//!
//! `GraphError` is the native error of the backend graph store. The cache and
//! the lock manager never let it escape: every backend call site maps it into
//! a `RepositoryError` naming the failing identifier and the workspace.

use crate::graph::Location;
use thiserror::Error;

/// Backend graph store errors
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("No node exists at {location}")]
    NotFound { location: Location },

    #[error("A node already exists at {path}")]
    AlreadyExists { path: String },

    #[error("Source error in workspace '{workspace}': {message}")]
    Source { workspace: String, message: String },
}

/// Repository-level errors surfaced by the session cache, lock manager and session
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Invalid item state: {0}")]
    InvalidItemState(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("No such workspace: {0}")]
    NoSuchWorkspace(String),

    #[error("Repository error: {0}")]
    Repository(String),

    /// Cache and backend have diverged
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

impl From<config::ConfigError> for RepositoryError {
    fn from(err: config::ConfigError) -> Self {
        RepositoryError::Config(err.to_string())
    }
}
