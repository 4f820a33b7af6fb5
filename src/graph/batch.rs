//! Ordered request batches
//!
//! A batch collects reads and writes and submits them to the store in one
//! round trip. Read results come back in request order so callers can link
//! each node to the one read just before it.

use super::{GraphNode, GraphStore, Location, Property};
use crate::error::GraphError;
use crate::path::Path;
use crate::types::{Name, NodeUuid};

/// One backend request
#[derive(Debug, Clone)]
pub enum Request {
    Read(Location),
    Create {
        path: Path,
        properties: Vec<Property>,
        if_absent: bool,
    },
    Delete(Location),
    SetProperties {
        on: Location,
        properties: Vec<Property>,
    },
    RemoveProperties {
        on: Location,
        names: Vec<Name>,
    },
    /// Move a node to be the last child of another node, optionally renaming it
    Move {
        from: Location,
        into: Location,
        new_name: Option<Name>,
    },
}

/// Results of the read requests of one batch, in request order
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    nodes: Vec<GraphNode>,
}

impl BatchResults {
    pub fn new(nodes: Vec<GraphNode>) -> Self {
        BatchResults { nodes }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<GraphNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Batch builder bound to one store
pub struct Batch<'a> {
    store: &'a dyn GraphStore,
    requests: Vec<Request>,
}

impl<'a> Batch<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Batch {
            store,
            requests: Vec::new(),
        }
    }

    pub fn read(&mut self, path: Path) -> &mut Self {
        self.requests.push(Request::Read(Location::at_path(path)));
        self
    }

    pub fn create(&mut self, path: Path, properties: Vec<Property>) -> &mut Self {
        self.requests.push(Request::Create {
            path,
            properties,
            if_absent: false,
        });
        self
    }

    /// Create unless a node already exists at the path
    pub fn create_if_absent(&mut self, path: Path, properties: Vec<Property>) -> &mut Self {
        self.requests.push(Request::Create {
            path,
            properties,
            if_absent: true,
        });
        self
    }

    pub fn delete(&mut self, location: Location) -> &mut Self {
        self.requests.push(Request::Delete(location));
        self
    }

    pub fn set_on(&mut self, uuid: NodeUuid, properties: Vec<Property>) -> &mut Self {
        self.requests.push(Request::SetProperties {
            on: Location::with_uuid(uuid),
            properties,
        });
        self
    }

    pub fn remove_on(&mut self, uuid: NodeUuid, names: Vec<Name>) -> &mut Self {
        self.requests.push(Request::RemoveProperties {
            on: Location::with_uuid(uuid),
            names,
        });
        self
    }

    pub fn push(&mut self, request: Request) -> &mut Self {
        self.requests.push(request);
        self
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn execute(self) -> Result<BatchResults, GraphError> {
        self.store.execute(self.requests)
    }
}
