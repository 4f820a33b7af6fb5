//! jcrgraph: Session-Scoped Content Repository Cache
//!
//! A hierarchical content repository session layer over a pluggable graph
//! store: lazily materialized nodes with type-resolved properties, ordered
//! same-name siblings, batched path resolution, weak identity maps for the
//! handles given out to callers, and advisory workspace locks.

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod item;
pub mod lexicon;
pub mod lock;
pub mod logging;
pub mod nodetype;
pub mod path;
pub mod repository;
pub mod session;
pub mod types;

pub use cache::{CacheOptions, NodeEditor, SessionCache};
pub use error::{GraphError, RepositoryError, Result};
pub use item::{Item, JcrNode, JcrProperty};
pub use path::{Path, Segment};
pub use repository::Repository;
pub use session::Session;
pub use types::{Name, NodeUuid};
