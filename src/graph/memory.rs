//! In-memory graph store
//!
//! Reference implementation of `GraphStore`, used by tests and benches. Every
//! `node_at` and `execute` call counts as one round trip. Batches apply to a
//! copy of the graph that replaces the live one only when every request
//! succeeded.

use super::{BatchResults, GraphNode, GraphStore, Location, Property, Request, Value};
use crate::error::GraphError;
use crate::lexicon::{dna, jcr};
use crate::path::{Path, Segment};
use crate::types::{Name, NodeUuid};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredNode {
    parent: Option<NodeUuid>,
    name: Name,
    properties: HashMap<Name, Property>,
    children: Vec<NodeUuid>,
}

#[derive(Debug, Clone)]
struct GraphState {
    root: NodeUuid,
    nodes: HashMap<NodeUuid, StoredNode>,
}

/// JSON fixture node: `{"uuid": .., "properties": {..}, "children": [{"name": .., ..}]}`
#[derive(Debug, Deserialize)]
struct FixtureNode {
    #[serde(default)]
    uuid: Option<Uuid>,
    #[serde(default)]
    properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    children: Vec<FixtureChild>,
}

#[derive(Debug, Deserialize)]
struct FixtureChild {
    name: String,
    #[serde(flatten)]
    node: FixtureNode,
}

/// In-memory `GraphStore` for one workspace
pub struct InMemoryGraph {
    workspace: String,
    state: RwLock<GraphState>,
    round_trips: AtomicUsize,
}

impl InMemoryGraph {
    /// Create a workspace graph holding only a root node
    pub fn new(workspace: impl Into<String>) -> Self {
        let root = Uuid::new_v4();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            StoredNode {
                parent: None,
                name: Name::new(""),
                properties: HashMap::new(),
                children: Vec::new(),
            },
        );
        InMemoryGraph {
            workspace: workspace.into(),
            state: RwLock::new(GraphState { root, nodes }),
            round_trips: AtomicUsize::new(0),
        }
    }

    /// Create a workspace graph from a JSON fixture describing the root node
    pub fn from_json(workspace: impl Into<String>, json: &str) -> Result<Self, GraphError> {
        let graph = InMemoryGraph::new(workspace);
        let fixture: FixtureNode = serde_json::from_str(json).map_err(|e| GraphError::Source {
            workspace: graph.workspace.clone(),
            message: format!("Invalid graph fixture: {}", e),
        })?;
        {
            let mut state = graph.state.write();
            let root = state.root;
            if let Some(uuid) = fixture.uuid {
                let node = state
                    .nodes
                    .remove(&root)
                    .ok_or_else(|| graph.source_error("root missing"))?;
                state.nodes.insert(uuid, node);
                state.root = uuid;
            }
            let root = state.root;
            load_fixture(&mut state, root, fixture);
        }
        Ok(graph)
    }

    pub fn root_uuid(&self) -> NodeUuid {
        self.state.read().root
    }

    /// Number of backend round trips served so far
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn reset_round_trips(&self) {
        self.round_trips.store(0, Ordering::SeqCst);
    }

    /// Identifier of the node at a path, without counting a round trip
    pub fn uuid_at(&self, path: &str) -> Option<NodeUuid> {
        let path = Path::parse(path).ok()?;
        self.state.read().resolve(&path)
    }

    fn source_error(&self, message: &str) -> GraphError {
        GraphError::Source {
            workspace: self.workspace.clone(),
            message: message.to_string(),
        }
    }

    fn apply(
        &self,
        state: &mut GraphState,
        request: Request,
        reads: &mut Vec<GraphNode>,
    ) -> Result<(), GraphError> {
        match request {
            Request::Read(location) => {
                let uuid = state.locate(&location)?;
                reads.push(state.graph_node(uuid));
            }
            Request::Create {
                path,
                properties,
                if_absent,
            } => {
                if if_absent && state.resolve(&path).is_some() {
                    return Ok(());
                }
                let parent_path = path
                    .parent()
                    .ok_or_else(|| self.source_error("cannot create the root node"))?;
                let parent = state.resolve(&parent_path).ok_or_else(|| GraphError::NotFound {
                    location: Location::at_path(parent_path.clone()),
                })?;
                let name = path
                    .last_segment()
                    .map(|s| s.name().clone())
                    .ok_or_else(|| self.source_error("cannot create the root node"))?;
                let uuid = properties
                    .iter()
                    .filter(|p| p.name == jcr::UUID || p.name == dna::UUID)
                    .find_map(|p| p.first().and_then(Value::as_uuid))
                    .unwrap_or_else(Uuid::new_v4);
                if state.nodes.contains_key(&uuid) {
                    return Err(GraphError::AlreadyExists {
                        path: path.to_string(),
                    });
                }
                let properties = properties
                    .into_iter()
                    .filter(|p| p.name != dna::UUID)
                    .map(|p| (p.name.clone(), p))
                    .collect();
                state.nodes.insert(
                    uuid,
                    StoredNode {
                        parent: Some(parent),
                        name,
                        properties,
                        children: Vec::new(),
                    },
                );
                if let Some(parent) = state.nodes.get_mut(&parent) {
                    parent.children.push(uuid);
                }
            }
            Request::Delete(location) => {
                let uuid = state.locate(&location)?;
                if uuid == state.root {
                    return Err(self.source_error("cannot delete the root node"));
                }
                state.detach(uuid);
                let mut pending = vec![uuid];
                while let Some(next) = pending.pop() {
                    if let Some(node) = state.nodes.remove(&next) {
                        pending.extend(node.children);
                    }
                }
            }
            Request::SetProperties { on, properties } => {
                let uuid = state.locate(&on)?;
                if let Some(node) = state.nodes.get_mut(&uuid) {
                    for property in properties {
                        node.properties.insert(property.name.clone(), property);
                    }
                }
            }
            Request::RemoveProperties { on, names } => {
                let uuid = state.locate(&on)?;
                if let Some(node) = state.nodes.get_mut(&uuid) {
                    for name in &names {
                        node.properties.remove(name);
                    }
                }
            }
            Request::Move {
                from,
                into,
                new_name,
            } => {
                let uuid = state.locate(&from)?;
                let target = state.locate(&into)?;
                if state.is_ancestor_or_self(uuid, target) {
                    return Err(self.source_error("cannot move a node below itself"));
                }
                state.detach(uuid);
                if let Some(node) = state.nodes.get_mut(&uuid) {
                    node.parent = Some(target);
                    if let Some(name) = new_name {
                        node.name = name;
                    }
                }
                if let Some(target) = state.nodes.get_mut(&target) {
                    target.children.push(uuid);
                }
            }
        }
        Ok(())
    }
}

impl GraphStore for InMemoryGraph {
    fn workspace_name(&self) -> &str {
        &self.workspace
    }

    fn node_at(&self, location: &Location) -> Result<GraphNode, GraphError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read();
        let uuid = state.locate(location)?;
        Ok(state.graph_node(uuid))
    }

    fn execute(&self, requests: Vec<Request>) -> Result<BatchResults, GraphError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write();
        let mut working = state.clone();
        let mut reads = Vec::new();
        for request in requests {
            self.apply(&mut working, request, &mut reads)?;
        }
        *state = working;
        Ok(BatchResults::new(reads))
    }
}

impl GraphState {
    fn locate(&self, location: &Location) -> Result<NodeUuid, GraphError> {
        let found = match (&location.uuid, &location.path) {
            (Some(uuid), _) => self.nodes.contains_key(uuid).then_some(*uuid),
            (None, Some(path)) => self.resolve(path),
            (None, None) => None,
        };
        found.ok_or_else(|| GraphError::NotFound {
            location: location.clone(),
        })
    }

    fn resolve(&self, path: &Path) -> Option<NodeUuid> {
        let mut current = self.root;
        for segment in path.iter() {
            let node = self.nodes.get(&current)?;
            current = node
                .children
                .iter()
                .filter(|c| self.nodes.get(c).is_some_and(|n| n.name == *segment.name()))
                .nth(segment.index().checked_sub(1)?)
                .copied()?;
        }
        Some(current)
    }

    fn segment_of(&self, uuid: NodeUuid) -> Option<Segment> {
        let node = self.nodes.get(&uuid)?;
        let parent = self.nodes.get(&node.parent?)?;
        let index = parent
            .children
            .iter()
            .take_while(|c| **c != uuid)
            .filter(|c| self.nodes.get(c).is_some_and(|n| n.name == node.name))
            .count()
            + 1;
        Some(Segment::new(node.name.clone(), index))
    }

    fn path_of(&self, uuid: NodeUuid) -> Path {
        let mut segments = Vec::new();
        let mut current = uuid;
        while let Some(segment) = self.segment_of(current) {
            segments.push(segment);
            match self.nodes.get(&current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        Path::absolute(segments)
    }

    fn graph_node(&self, uuid: NodeUuid) -> GraphNode {
        let path = self.path_of(uuid);
        let node = &self.nodes[&uuid];
        let mut counts: HashMap<&Name, usize> = HashMap::new();
        let children = node
            .children
            .iter()
            .filter_map(|child| {
                let stored = self.nodes.get(child)?;
                let index = counts.entry(&stored.name).or_insert(0);
                *index += 1;
                Some(Location::new(
                    path.child(Segment::new(stored.name.clone(), *index)),
                    *child,
                ))
            })
            .collect();
        GraphNode {
            location: Location::new(path, uuid),
            properties: node.properties.clone(),
            children,
        }
    }

    fn detach(&mut self, uuid: NodeUuid) {
        let parent = self.nodes.get(&uuid).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != uuid);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeUuid, mut node: NodeUuid) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }
}

fn load_fixture(state: &mut GraphState, uuid: NodeUuid, fixture: FixtureNode) {
    if let Some(node) = state.nodes.get_mut(&uuid) {
        for (name, value) in fixture.properties {
            let name = Name::new(name);
            let values = match value {
                serde_json::Value::Array(items) => {
                    items.into_iter().filter_map(json_value).collect()
                }
                other => json_value(other).into_iter().collect(),
            };
            node.properties.insert(name.clone(), Property::new(name, values));
        }
    }
    for child in fixture.children {
        let child_uuid = child.node.uuid.unwrap_or_else(Uuid::new_v4);
        state.nodes.insert(
            child_uuid,
            StoredNode {
                parent: Some(uuid),
                name: Name::new(child.name),
                properties: HashMap::new(),
                children: Vec::new(),
            },
        );
        if let Some(parent) = state.nodes.get_mut(&uuid) {
            parent.children.push(child_uuid);
        }
        load_fixture(state, child_uuid, child.node);
    }
}

fn json_value(value: serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::String(s)),
        serde_json::Value::Bool(b) => Some(Value::Boolean(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(l) => Some(Value::Long(l)),
            None => n.as_f64().map(Value::Double),
        },
        _ => None,
    }
}
