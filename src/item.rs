//! API-facing item handles
//!
//! Handles carry identity only. State is read through the session cache that
//! issued them, so a handle never shows stale values after the cache reloads
//! a node. Within one session a handle is shared: looking the same item up
//! twice yields the same `Arc` while the first one is alive.

use crate::cache::PropertyId;
use crate::nodetype::PropertyDefinitionId;
use crate::types::{Name, NodeUuid};
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq)]
pub struct JcrNode {
    uuid: NodeUuid,
    root: bool,
}

impl JcrNode {
    pub(crate) fn new(uuid: NodeUuid, root: bool) -> Self {
        JcrNode { uuid, root }
    }

    pub fn uuid(&self) -> NodeUuid {
        self.uuid
    }

    pub fn is_root(&self) -> bool {
        self.root
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JcrProperty {
    id: PropertyId,
    definition_id: PropertyDefinitionId,
    multiple: bool,
}

impl JcrProperty {
    pub(crate) fn new(id: PropertyId, definition_id: PropertyDefinitionId, multiple: bool) -> Self {
        JcrProperty {
            id,
            definition_id,
            multiple,
        }
    }

    pub fn id(&self) -> &PropertyId {
        &self.id
    }

    pub fn node_uuid(&self) -> NodeUuid {
        self.id.node_id()
    }

    pub fn name(&self) -> &Name {
        self.id.property_name()
    }

    pub fn definition_id(&self) -> &PropertyDefinitionId {
        &self.definition_id
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }
}

/// A node or a property
#[derive(Debug, Clone)]
pub enum Item {
    Node(Arc<JcrNode>),
    Property(Arc<JcrProperty>),
}

impl Item {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    pub fn as_node(&self) -> Option<&Arc<JcrNode>> {
        match self {
            Item::Node(node) => Some(node),
            Item::Property(_) => None,
        }
    }

    pub fn as_property(&self) -> Option<&Arc<JcrProperty>> {
        match self {
            Item::Property(property) => Some(property),
            Item::Node(_) => None,
        }
    }
}
