//! Node Editor
//!
//! Session-local mutation of one node. Every edit updates the session's
//! `NodeInfo`s right away and records the matching backend request; nothing
//! reaches the backend before `SessionCache::save`.

use super::children::Children;
use super::ids::{ChildNode, PropertyId};
use super::node_info::NodeInfo;
use super::resolve::resolve_properties;
use super::session_cache::SessionCache;
use crate::error::{RepositoryError, Result};
use crate::graph::{Location, Property, Request, Value};
use crate::lexicon::{self, dna, dnaint, jcr};
use crate::types::{Name, NodeUuid};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

pub struct NodeEditor<'c> {
    cache: &'c SessionCache,
    node: Arc<NodeInfo>,
}

impl<'c> NodeEditor<'c> {
    pub(super) fn new(cache: &'c SessionCache, node: Arc<NodeInfo>) -> Self {
        NodeEditor { cache, node }
    }

    pub fn node(&self) -> &Arc<NodeInfo> {
        &self.node
    }

    pub fn uuid(&self) -> NodeUuid {
        self.node.uuid()
    }

    /// Set a single-valued property
    pub fn set_property(&self, name: Name, value: impl Into<Value>) -> Result<()> {
        self.set_values(name, vec![value.into()], false)
    }

    /// Set a multi-valued property; an empty list is allowed
    pub fn set_multi_property(&self, name: Name, values: Vec<Value>) -> Result<()> {
        self.set_values(name, values, true)
    }

    fn set_values(&self, name: Name, values: Vec<Value>, multi_valued: bool) -> Result<()> {
        let uuid = self.node.uuid();
        if lexicon::is_internal(&name) || name == dna::UUID {
            return Err(self.violation(format!("{} is reserved", name)));
        }
        if let Some(existing) = self.node.property(&name) {
            if existing.is_multi_valued() != multi_valued {
                return Err(self.violation(format!(
                    "{} is {}-valued",
                    name,
                    if existing.is_multi_valued() { "multi" } else { "single" }
                )));
            }
        }
        let resolver = self.cache.resolver_for(&self.node);
        let definition = resolver
            .definition_for(&name, multi_valued)
            .filter(|d| d.multiple == multi_valued)
            .ok_or_else(|| self.violation(format!("no definition allows property {}", name)))?;
        if definition.protected {
            return Err(self.violation(format!("{} is protected", name)));
        }
        let property = Property::new(name.clone(), values);
        let info = resolver
            .property_info(uuid, property.clone(), multi_valued)
            .ok_or_else(|| self.violation(format!("{} requires a value", name)))?;

        let markers_before = self.multi_valued_markers();
        if let Some(previous) = self.node.set_property(info) {
            if previous.definition_id() != &definition.id {
                self.cache.forget_property(previous.id());
            }
        }
        let mut properties = vec![property];
        let mut removed = Vec::new();
        self.marker_update(markers_before, &mut properties, &mut removed);
        self.cache.record(Request::SetProperties {
            on: Location::with_uuid(uuid),
            properties,
        });
        if !removed.is_empty() {
            self.cache.record(Request::RemoveProperties {
                on: Location::with_uuid(uuid),
                names: removed,
            });
        }
        tracing::trace!(node = %uuid, property = %name, "Set property");
        Ok(())
    }

    /// Remove a property; returns whether the node had it
    pub fn remove_property(&self, name: &Name) -> Result<bool> {
        let existing = match self.node.property(name) {
            Some(existing) => existing,
            None => return Ok(false),
        };
        let protected = self
            .cache
            .node_types()
            .property_definition(existing.definition_id())
            .is_some_and(|d| d.protected);
        if protected {
            return Err(self.violation(format!("{} is protected", name)));
        }
        let markers_before = self.multi_valued_markers();
        self.node.remove_property(name);
        self.cache
            .forget_property(&PropertyId::new(self.node.uuid(), name.clone()));

        let mut properties = Vec::new();
        let mut removed = vec![name.clone()];
        self.marker_update(markers_before, &mut properties, &mut removed);
        if !properties.is_empty() {
            self.cache.record(Request::SetProperties {
                on: Location::with_uuid(self.node.uuid()),
                properties,
            });
        }
        self.cache.record(Request::RemoveProperties {
            on: Location::with_uuid(self.node.uuid()),
            names: removed,
        });
        Ok(true)
    }

    /// Create a child node. The primary type defaults to the one named by
    /// the applicable child node definition.
    pub fn create_child(
        &self,
        name: Name,
        uuid: Option<NodeUuid>,
        primary_type: Option<Name>,
    ) -> Result<ChildNode> {
        let node_types = self.cache.node_types();
        let siblings = self.node.children().count_with_name(&name);
        let definition = node_types
            .find_child_node_definition(
                self.node.primary_type_name(),
                self.node.mixin_type_names(),
                &name,
                primary_type.as_ref(),
                siblings,
            )
            .ok_or_else(|| self.violation(format!("no definition allows child {}", name)))?;
        let primary_type = match primary_type.or_else(|| definition.default_primary_type.clone()) {
            Some(primary_type) => primary_type,
            None => {
                return Err(self.violation(format!(
                    "child {} needs an explicit primary type",
                    name
                )))
            }
        };
        if node_types.node_type(&primary_type).is_none() {
            return Err(self.violation(format!("unknown node type {}", primary_type)));
        }
        let uuid = uuid.unwrap_or_else(Uuid::new_v4);
        if self.cache.find_node_info_in_cache(uuid)?.is_some() {
            return Err(self.violation(format!("node {} already exists", uuid)));
        }

        let parent_path = self.cache.path_for_info(&self.node)?;
        let child = self.node.children().append(name, uuid);
        let path = parent_path.child(child.segment().clone());

        let mut raw = HashMap::new();
        raw.insert(
            jcr::PRIMARY_TYPE,
            Property::single(jcr::PRIMARY_TYPE, primary_type.clone()),
        );
        let resolver = super::PropertyResolver::new(
            node_types,
            &primary_type,
            &[],
            self.cache.options().include_properties_without_definition,
        );
        let properties = resolve_properties(&resolver, uuid, &raw);
        let info = NodeInfo::new(
            Location::new(path.clone(), uuid),
            uuid,
            Some(self.node.uuid()),
            primary_type.clone(),
            Vec::new(),
            definition.id.clone(),
            Children::new(uuid),
            properties,
        );
        self.cache.insert_changed(Arc::new(info));
        self.cache.invalidate_paths();
        self.cache.record(Request::Create {
            path: path.clone(),
            properties: vec![
                Property::single(jcr::PRIMARY_TYPE, primary_type),
                Property::single(dnaint::NODE_DEFINITION, definition.id.to_string()),
                Property::single(dna::UUID, uuid),
            ],
            if_absent: false,
        });
        tracing::debug!(parent = %self.node.uuid(), path = %path, node = %uuid, "Created child");
        Ok(child)
    }

    /// Remove a child and everything below it; returns whether it was a child
    pub fn destroy_child(&self, uuid: NodeUuid) -> Result<bool> {
        let child = match self.node.children().child(uuid) {
            Some(child) => child,
            None => return Ok(false),
        };
        self.node.children().remove(child.segment());
        let removed = self.cache.delete_node_infos(uuid);
        self.cache.invalidate_paths();
        self.cache.record(Request::Delete(Location::with_uuid(uuid)));
        tracing::debug!(parent = %self.node.uuid(), node = %uuid, removed, "Destroyed child");
        Ok(true)
    }

    /// Make an existing node the last child of this node, optionally
    /// renaming it
    pub fn move_to_be_child(&self, uuid: NodeUuid, new_name: Option<Name>) -> Result<ChildNode> {
        let target = self.node.uuid();
        if uuid == target || self.is_ancestor(uuid)? {
            return Err(RepositoryError::Repository(format!(
                "cannot move node {} below itself in workspace '{}'",
                uuid,
                self.cache.workspace_name()
            )));
        }
        let child_info = self.cache.find_node_info(uuid)?;
        let old_parent = child_info.parent().ok_or_else(|| {
            RepositoryError::Repository(format!(
                "cannot move the root node of workspace '{}'",
                self.cache.workspace_name()
            ))
        })?;
        let current_name = self.cache.name_of(uuid)?;
        let name = new_name.unwrap_or_else(|| current_name.clone());
        if old_parent == target && name == current_name {
            if let Some(existing) = self.node.children().child(uuid) {
                return Ok(existing);
            }
        }

        let mut siblings = self.node.children().count_with_name(&name);
        if old_parent == target {
            siblings = siblings.saturating_sub(1);
        }
        let definition = self
            .cache
            .node_types()
            .find_child_node_definition(
                self.node.primary_type_name(),
                self.node.mixin_type_names(),
                &name,
                Some(child_info.primary_type_name()),
                siblings,
            )
            .ok_or_else(|| self.violation(format!("no definition allows child {}", name)))?;
        let definition_id = definition.id.clone();

        let child_info = self.cache.promote(uuid)?;
        let old_parent_info = self.cache.promote(old_parent)?;
        old_parent_info.children().remove_uuid(uuid);
        let entry = self
            .node
            .children()
            .append_with(name.clone(), uuid, |_| child_info.set_parent(Some(target)));
        self.cache.invalidate_paths();

        let renamed = name != current_name;
        self.cache.record(Request::Move {
            from: Location::with_uuid(uuid),
            into: Location::with_uuid(target),
            new_name: renamed.then_some(name),
        });
        if child_info.definition_id() != definition_id {
            child_info.set_definition_id(definition_id.clone());
            self.cache.record(Request::SetProperties {
                on: Location::with_uuid(uuid),
                properties: vec![Property::single(
                    dnaint::NODE_DEFINITION,
                    definition_id.to_string(),
                )],
            });
        }
        tracing::debug!(node = %uuid, from = %old_parent, into = %target, "Moved node");
        Ok(entry)
    }

    /// Whether `candidate` is a proper ancestor of this node
    pub fn is_ancestor(&self, candidate: NodeUuid) -> Result<bool> {
        let mut current = self.node.parent();
        while let Some(uuid) = current {
            if uuid == candidate {
                return Ok(true);
            }
            current = self.cache.find_node_info(uuid)?.parent();
        }
        Ok(false)
    }

    /// Multi-valued properties holding at most one value; these need the
    /// internal marker to be read back as multi-valued
    fn multi_valued_markers(&self) -> BTreeSet<Name> {
        self.node
            .properties()
            .iter()
            .filter(|p| p.is_multi_valued() && p.values().len() <= 1)
            .map(|p| p.name().clone())
            .collect()
    }

    fn marker_update(
        &self,
        before: BTreeSet<Name>,
        properties: &mut Vec<Property>,
        removed: &mut Vec<Name>,
    ) {
        let after = self.multi_valued_markers();
        if after == before {
            return;
        }
        if after.is_empty() {
            removed.push(dnaint::MULTI_VALUED_PROPERTIES);
        } else {
            properties.push(Property::new(
                dnaint::MULTI_VALUED_PROPERTIES,
                after.into_iter().map(Value::Name).collect(),
            ));
        }
    }

    fn violation(&self, message: String) -> RepositoryError {
        RepositoryError::ConstraintViolation(format!(
            "{} on node {} in workspace '{}'",
            message,
            self.node.uuid(),
            self.cache.workspace_name()
        ))
    }
}
