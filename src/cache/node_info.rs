//! Materialized node and property state held by a session cache.

use super::children::Children;
use super::ids::PropertyId;
use crate::graph::{Location, Property, Value};
use crate::nodetype::{NodeDefinitionId, PropertyDefinitionId, PropertyType};
use crate::types::{Name, NodeUuid};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot of one property's values with its resolved definition
///
/// Never mutated: a changed property is replaced by a new `PropertyInfo`.
#[derive(Debug, Clone)]
pub struct PropertyInfo {
    id: PropertyId,
    definition_id: PropertyDefinitionId,
    property_type: PropertyType,
    property: Property,
    multi_valued: bool,
}

impl PropertyInfo {
    pub fn new(
        id: PropertyId,
        definition_id: PropertyDefinitionId,
        property_type: PropertyType,
        property: Property,
        multi_valued: bool,
    ) -> Self {
        PropertyInfo {
            id,
            definition_id,
            property_type,
            property,
            multi_valued,
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

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    pub fn values(&self) -> &[Value] {
        &self.property.values
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }
}

/// Session-local state of one backend node
///
/// The identifier and node types are fixed at creation. The parent pointer,
/// definition, children and properties change as the session edits the node.
#[derive(Debug)]
pub struct NodeInfo {
    original_location: Location,
    uuid: NodeUuid,
    parent: RwLock<Option<NodeUuid>>,
    primary_type_name: Name,
    mixin_type_names: Vec<Name>,
    definition_id: RwLock<NodeDefinitionId>,
    children: Children,
    properties: RwLock<HashMap<Name, Arc<PropertyInfo>>>,
}

impl NodeInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        original_location: Location,
        uuid: NodeUuid,
        parent: Option<NodeUuid>,
        primary_type_name: Name,
        mixin_type_names: Vec<Name>,
        definition_id: NodeDefinitionId,
        children: Children,
        properties: HashMap<Name, Arc<PropertyInfo>>,
    ) -> Self {
        debug_assert_eq!(children.parent(), uuid);
        NodeInfo {
            original_location,
            uuid,
            parent: RwLock::new(parent),
            primary_type_name,
            mixin_type_names,
            definition_id: RwLock::new(definition_id),
            children,
            properties: RwLock::new(properties),
        }
    }

    pub fn uuid(&self) -> NodeUuid {
        self.uuid
    }

    pub fn original_location(&self) -> &Location {
        &self.original_location
    }

    pub fn parent(&self) -> Option<NodeUuid> {
        *self.parent.read()
    }

    pub(crate) fn set_parent(&self, parent: Option<NodeUuid>) {
        *self.parent.write() = parent;
    }

    pub fn primary_type_name(&self) -> &Name {
        &self.primary_type_name
    }

    pub fn mixin_type_names(&self) -> &[Name] {
        &self.mixin_type_names
    }

    pub fn definition_id(&self) -> NodeDefinitionId {
        self.definition_id.read().clone()
    }

    pub(crate) fn set_definition_id(&self, definition_id: NodeDefinitionId) {
        *self.definition_id.write() = definition_id;
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn property(&self, name: &Name) -> Option<Arc<PropertyInfo>> {
        self.properties.read().get(name).cloned()
    }

    pub fn has_property(&self, name: &Name) -> bool {
        self.properties.read().contains_key(name)
    }

    pub fn property_names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.properties.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn properties(&self) -> Vec<Arc<PropertyInfo>> {
        let mut properties: Vec<Arc<PropertyInfo>> =
            self.properties.read().values().cloned().collect();
        properties.sort_by(|a, b| a.name().cmp(b.name()));
        properties
    }

    /// Replace a property wholesale, returning the previous snapshot
    pub(crate) fn set_property(&self, info: PropertyInfo) -> Option<Arc<PropertyInfo>> {
        self.properties
            .write()
            .insert(info.name().clone(), Arc::new(info))
    }

    pub(crate) fn remove_property(&self, name: &Name) -> Option<Arc<PropertyInfo>> {
        self.properties.write().remove(name)
    }
}
