//! Backend Graph Store
//!
//! Contract of the external content store the session cache delegates to.
//! Nodes are addressed by path or durable identifier; reads and writes can be
//! grouped into one ordered batch that executes in a single round trip.

pub mod batch;
pub mod memory;

pub use batch::{Batch, BatchResults, Request};
pub use memory::InMemoryGraph;

use crate::error::GraphError;
use crate::path::Path;
use crate::types::{Name, NodeUuid};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// A single property value as stored by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
    Name(Name),
    Path(Path),
    Uuid(NodeUuid),
    Reference(NodeUuid),
    Binary(Vec<u8>),
}

impl Value {
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Date(d) => d.to_rfc3339(),
            Value::Name(n) => n.to_string(),
            Value::Path(p) => p.to_string(),
            Value::Uuid(u) | Value::Reference(u) => u.to_string(),
            Value::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    pub fn as_uuid(&self) -> Option<NodeUuid> {
        match self {
            Value::Uuid(u) | Value::Reference(u) => Some(*u),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<Name> {
        match self {
            Value::Name(n) => Some(n.clone()),
            Value::String(s) if !s.is_empty() => Some(Name::new(s.clone())),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<Name> for Value {
    fn from(value: Name) -> Self {
        Value::Name(value)
    }
}

impl From<NodeUuid> for Value {
    fn from(value: NodeUuid) -> Self {
        Value::Uuid(value)
    }
}

/// A named, possibly multi-valued backend property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: Name,
    pub values: Vec<Value>,
}

impl Property {
    pub fn new(name: Name, values: Vec<Value>) -> Self {
        Property { name, values }
    }

    pub fn single(name: Name, value: impl Into<Value>) -> Self {
        Property {
            name,
            values: vec![value.into()],
        }
    }

    pub fn is_single(&self) -> bool {
        self.values.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }
}

/// Where a node lives: its path, its durable identifier, or both
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub path: Option<Path>,
    pub uuid: Option<NodeUuid>,
}

impl Location {
    pub fn new(path: Path, uuid: NodeUuid) -> Self {
        Location {
            path: Some(path),
            uuid: Some(uuid),
        }
    }

    pub fn at_path(path: Path) -> Self {
        Location {
            path: Some(path),
            uuid: None,
        }
    }

    pub fn with_uuid(uuid: NodeUuid) -> Self {
        Location {
            path: None,
            uuid: Some(uuid),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.as_ref().is_some_and(Path::is_root)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, &self.uuid) {
            (Some(path), Some(uuid)) => write!(f, "{} ({})", path, uuid),
            (Some(path), None) => write!(f, "{}", path),
            (None, Some(uuid)) => write!(f, "<{}>", uuid),
            (None, None) => f.write_str("<unknown>"),
        }
    }
}

/// A node as read from the backend
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub location: Location,
    pub properties: HashMap<Name, Property>,
    /// Child locations in backend order
    pub children: Vec<Location>,
}

impl GraphNode {
    pub fn property(&self, name: &Name) -> Option<&Property> {
        self.properties.get(name)
    }
}

/// Backend graph store contract
pub trait GraphStore: Send + Sync {
    /// Name of the workspace this store serves
    fn workspace_name(&self) -> &str;

    /// Read one node by path and/or identifier
    fn node_at(&self, location: &Location) -> Result<GraphNode, GraphError>;

    /// Execute requests atomically and in order, returning the results of
    /// every read request in request order
    fn execute(&self, requests: Vec<Request>) -> Result<BatchResults, GraphError>;
}

impl<'s> dyn GraphStore + 's {
    /// Start an ordered batch against this store
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }
}
