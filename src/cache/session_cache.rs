//! Session Cache
//!
//! Per-session view of one workspace. Nodes are materialized lazily from the
//! backend into `NodeInfo`s, which live in an arena keyed by identifier and
//! refer to each other only by identifier. Unchanged nodes sit in the cached
//! map; the first edit moves a node into the changed map, which always wins.
//!
//! Resolving a path walks as far as locally known nodes allow and then reads
//! every remaining segment in a single batched round trip.

use super::children::Children;
use super::editor::NodeEditor;
use super::identity::IdentityMap;
use super::ids::PropertyId;
use super::node_info::{NodeInfo, PropertyInfo};
use super::resolve::{resolve_properties, PropertyResolver};
use crate::error::{GraphError, RepositoryError, Result};
use crate::graph::{GraphNode, GraphStore, Location, Property, Request, Value};
use crate::item::{Item, JcrNode, JcrProperty};
use crate::lexicon::{dna, dnaint, jcr, nt};
use crate::nodetype::{NodeDefinitionId, NodeTypes};
use crate::path::Path;
use crate::types::{Name, NodeUuid};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// Materialization policy of a session cache
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Keep properties no definition allows, under `nt:unstructured`'s
    /// multi-valued residual definition
    pub include_properties_without_definition: bool,
    /// Primary type of non-root nodes stored without one
    pub default_primary_type: Name,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            include_properties_without_definition: true,
            default_primary_type: nt::UNSTRUCTURED,
        }
    }
}

#[derive(Default)]
struct CacheState {
    cached: HashMap<NodeUuid, Arc<NodeInfo>>,
    changed: HashMap<NodeUuid, Arc<NodeInfo>>,
    deleted: HashSet<NodeUuid>,
    paths: HashMap<NodeUuid, Path>,
}

pub struct SessionCache {
    workspace_name: String,
    store: Arc<dyn GraphStore>,
    node_types: Arc<NodeTypes>,
    options: CacheOptions,
    root: RwLock<Option<NodeUuid>>,
    jcr_nodes: IdentityMap<NodeUuid, JcrNode>,
    jcr_properties: IdentityMap<PropertyId, JcrProperty>,
    state: RwLock<CacheState>,
    pending: Mutex<Vec<Request>>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn GraphStore>, node_types: Arc<NodeTypes>, options: CacheOptions) -> Self {
        SessionCache {
            workspace_name: store.workspace_name().to_string(),
            store,
            node_types,
            options,
            root: RwLock::new(None),
            jcr_nodes: IdentityMap::new(),
            jcr_properties: IdentityMap::new(),
            state: RwLock::new(CacheState::default()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn node_types(&self) -> &NodeTypes {
        &self.node_types
    }

    pub(crate) fn options(&self) -> &CacheOptions {
        &self.options
    }

    // ---------------------------------------------------------------------
    // API-facing handles
    // ---------------------------------------------------------------------

    pub fn find_jcr_root_node(&self) -> Result<Arc<JcrNode>> {
        let info = self.find_node_info_for_root()?;
        self.find_jcr_node(info.uuid())
    }

    /// Handle for the node with the identifier; the same `Arc` is returned
    /// while a previous handle is alive
    pub fn find_jcr_node(&self, uuid: NodeUuid) -> Result<Arc<JcrNode>> {
        if let Some(node) = self.jcr_nodes.get(&uuid) {
            tracing::trace!(node = %uuid, "Node handle cache hit");
            return Ok(node);
        }
        let info = self.find_node_info(uuid)?;
        Ok(self.create_jcr_node(&info))
    }

    /// Handle for the node at a path relative to a reference node (the root
    /// when `reference` is `None`)
    pub fn find_jcr_node_at(&self, reference: Option<NodeUuid>, relative: &Path) -> Result<Arc<JcrNode>> {
        let info = self.find_node_info_at(reference, relative)?;
        match self.jcr_nodes.get(&info.uuid()) {
            Some(node) => Ok(node),
            None => Ok(self.create_jcr_node(&info)),
        }
    }

    /// Handle for a property; `None` when the node has no such property
    pub fn find_jcr_property(&self, id: &PropertyId) -> Result<Option<Arc<JcrProperty>>> {
        let info = match self.find_property_info(id)? {
            Some(info) => info,
            None => return Ok(None),
        };
        if let Some(property) = self.jcr_properties.get(id) {
            if property.is_multiple() == info.is_multi_valued() {
                return Ok(Some(property));
            }
        }
        let property = Arc::new(JcrProperty::new(
            id.clone(),
            info.definition_id().clone(),
            info.is_multi_valued(),
        ));
        self.jcr_properties.replace(id.clone(), &property);
        Ok(Some(property))
    }

    /// Handles for every exposed property of a node, ordered by name
    pub fn find_jcr_properties_for(&self, uuid: NodeUuid) -> Result<Vec<Arc<JcrProperty>>> {
        let info = self.find_node_info(uuid)?;
        let mut properties = Vec::new();
        for name in info.property_names() {
            if let Some(property) = self.find_jcr_property(&PropertyId::new(uuid, name))? {
                properties.push(property);
            }
        }
        Ok(properties)
    }

    /// Node or property at a path relative to a reference node, or at an
    /// absolute path. A trailing SNS index above 1 always denotes a node;
    /// otherwise a child node wins over a property with the same name.
    pub fn find_jcr_item(&self, reference: Option<NodeUuid>, relative: &Path) -> Result<Item> {
        let reference = if relative.is_absolute() { None } else { reference };
        let path = self.relative_to_root(relative)?;
        let last = match path.last_segment() {
            None => return Ok(Item::Node(self.find_jcr_node_at(reference, &path)?)),
            Some(last) if last.is_self_reference() || last.is_parent_reference() => {
                return Ok(Item::Node(self.find_jcr_node_at(reference, &path)?))
            }
            Some(last) => last.clone(),
        };
        if last.index() > 1 {
            return Ok(Item::Node(self.find_jcr_node_at(reference, &path)?));
        }
        let parent_path = path.parent().unwrap_or_else(|| Path::relative(Vec::new()));
        let parent = self.find_node_info_at(reference, &parent_path)?;
        if let Some(child) = parent.children().child_at(&last) {
            return Ok(Item::Node(self.find_jcr_node(child.uuid())?));
        }
        if let Some(property) = parent.property(last.name()) {
            if let Some(property) = self.find_jcr_property(property.id())? {
                return Ok(Item::Property(property));
            }
        }
        let root = self.find_node_info_for_root()?.uuid();
        let message = match reference {
            Some(reference) if reference != root => format!(
                "{} relative to {} in workspace '{}'",
                path,
                self.path_for(reference)?,
                self.workspace_name
            ),
            _ => format!("{} in workspace '{}'", Path::root().resolve(&path)?, self.workspace_name),
        };
        Err(RepositoryError::ItemNotFound(message))
    }

    fn create_jcr_node(&self, info: &Arc<NodeInfo>) -> Arc<JcrNode> {
        let uuid = info.uuid();
        let known_root = *self.root.read();
        let is_root = match known_root {
            Some(root) => root == uuid,
            None => info.parent().is_none(),
        };
        if is_root && known_root.is_none() {
            *self.root.write() = Some(uuid);
        }
        self.jcr_nodes.insert(uuid, Arc::new(JcrNode::new(uuid, is_root)))
    }

    // ---------------------------------------------------------------------
    // Node info lookup
    // ---------------------------------------------------------------------

    /// Cached or changed info for the identifier, without reading the backend
    pub fn find_node_info_in_cache(&self, uuid: NodeUuid) -> Result<Option<Arc<NodeInfo>>> {
        let state = self.state.read();
        if let Some(info) = state.changed.get(&uuid).or_else(|| state.cached.get(&uuid)) {
            return Ok(Some(info.clone()));
        }
        if state.deleted.contains(&uuid) {
            return Err(RepositoryError::InvalidItemState(format!(
                "node {} was deleted in this session (workspace '{}')",
                uuid, self.workspace_name
            )));
        }
        Ok(None)
    }

    pub fn find_node_info(&self, uuid: NodeUuid) -> Result<Arc<NodeInfo>> {
        if let Some(info) = self.find_node_info_in_cache(uuid)? {
            tracing::trace!(node = %uuid, "Node info cache hit");
            return Ok(info);
        }
        self.load_from_graph(Location::with_uuid(uuid), None)
    }

    pub fn find_node_info_for_root(&self) -> Result<Arc<NodeInfo>> {
        let root = *self.root.read();
        match root {
            Some(uuid) => self.find_node_info(uuid),
            None => self.load_from_graph(Location::at_path(Path::root()), None),
        }
    }

    /// Info for the node at a path relative to a reference node (the root
    /// when `reference` is `None`). Absolute paths always resolve from the
    /// root, whatever the reference.
    pub fn find_node_info_at(&self, reference: Option<NodeUuid>, relative: &Path) -> Result<Arc<NodeInfo>> {
        let from = match reference {
            Some(uuid) if !relative.is_absolute() => self.find_node_info(uuid)?,
            _ => self.find_node_info_for_root()?,
        };
        let relative = self.relative_to_root(relative)?;
        let segments = relative.segments();
        if segments.is_empty() {
            return Ok(from);
        }

        let mut info = from.clone();
        let mut next = 0;
        while next < segments.len() {
            let segment = &segments[next];
            next += 1;
            if segment.is_parent_reference() {
                let parent = info.parent().ok_or_else(|| {
                    RepositoryError::PathNotFound(format!(
                        "{} leads above the root in workspace '{}'",
                        relative, self.workspace_name
                    ))
                })?;
                info = self.find_node_info(parent)?;
                continue;
            }
            let child = info
                .children()
                .child_at(segment)
                .ok_or_else(|| self.path_not_found(&relative, &from))?;
            if let Some(loaded) = self.find_node_info_in_cache(child.uuid())? {
                info = loaded;
                continue;
            }

            // Frontier of what this session knows. A changed parent may have
            // renumbered its children, so its backend path is not usable.
            let remaining = &segments[next..];
            if remaining.is_empty() || self.is_changed(info.uuid()) {
                info = self.load_from_graph(Location::with_uuid(child.uuid()), Some(info))?;
                continue;
            }
            let base = match &info.original_location().path {
                Some(path) => path.clone(),
                None => self.path_for_info(&info)?,
            };
            let mut path = base.child(segment.clone());
            let mut batch = self.store.batch();
            batch.read(path.clone());
            for segment in remaining {
                path = path.child(segment.clone());
                batch.read(path.clone());
            }
            next = segments.len();
            tracing::debug!(
                workspace = %self.workspace_name,
                from = %base,
                reads = batch.len(),
                "Loading path suffix in one batch"
            );
            let results = batch.execute().map_err(|err| match err {
                GraphError::NotFound { .. } => self.path_not_found(&relative, &from),
                other => RepositoryError::Repository(format!(
                    "error while finding node {} in workspace '{}': {}",
                    child.uuid(),
                    self.workspace_name,
                    other
                )),
            })?;
            for node in results.into_nodes() {
                let loaded = self.materialize(node, Some(info))?;
                info = self.cache_loaded(loaded);
            }
        }
        Ok(info)
    }

    pub fn find_property_info(&self, id: &PropertyId) -> Result<Option<Arc<PropertyInfo>>> {
        Ok(self.find_node_info(id.node_id())?.property(id.property_name()))
    }

    // ---------------------------------------------------------------------
    // Paths and names
    // ---------------------------------------------------------------------

    pub fn path_for(&self, uuid: NodeUuid) -> Result<Path> {
        if *self.root.read() == Some(uuid) {
            return Ok(Path::root());
        }
        let info = self.find_node_info(uuid)?;
        self.path_for_info(&info)
    }

    pub fn path_for_info(&self, info: &NodeInfo) -> Result<Path> {
        let uuid = info.uuid();
        if *self.root.read() == Some(uuid) {
            return Ok(Path::root());
        }
        if let Some(path) = self.state.read().paths.get(&uuid) {
            return Ok(path.clone());
        }
        let path = match info.parent() {
            None => {
                *self.root.write() = Some(uuid);
                Path::root()
            }
            Some(parent) => {
                let parent_info = self.find_node_info(parent)?;
                let parent_path = self.path_for_info(&parent_info)?;
                let child = parent_info.children().child(uuid).ok_or_else(|| {
                    RepositoryError::IllegalState(format!(
                        "node {} is not among the children of its parent {} in workspace '{}'",
                        uuid, parent, self.workspace_name
                    ))
                })?;
                parent_path.child(child.segment().clone())
            }
        };
        self.state.write().paths.insert(uuid, path.clone());
        Ok(path)
    }

    pub fn path_for_property(&self, info: &PropertyInfo) -> Result<Path> {
        Ok(self.path_for(info.node_uuid())?.child_named(info.name().clone()))
    }

    pub fn path_for_property_id(&self, id: &PropertyId) -> Result<Path> {
        match self.find_property_info(id)? {
            Some(info) => self.path_for_property(&info),
            None => Err(RepositoryError::PathNotFound(format!(
                "property {} in workspace '{}'",
                id, self.workspace_name
            ))),
        }
    }

    pub fn name_of(&self, uuid: NodeUuid) -> Result<Name> {
        Ok(self
            .child_entry(uuid)?
            .map_or_else(|| Name::new(""), |child| child.name().clone()))
    }

    pub fn sns_index_of(&self, uuid: NodeUuid) -> Result<usize> {
        Ok(self.child_entry(uuid)?.map_or(1, |child| child.sns_index()))
    }

    /// The node's entry in its parent's children; `None` for the root
    fn child_entry(&self, uuid: NodeUuid) -> Result<Option<super::ChildNode>> {
        let root = self.find_node_info_for_root()?.uuid();
        if uuid == root {
            return Ok(None);
        }
        let info = self.find_node_info(uuid)?;
        let parent = info.parent().ok_or_else(|| {
            RepositoryError::IllegalState(format!(
                "non-root node {} has no parent in workspace '{}'",
                uuid, self.workspace_name
            ))
        })?;
        let parent = self.find_node_info(parent)?;
        parent.children().child(uuid).map(Some).ok_or_else(|| {
            RepositoryError::IllegalState(format!(
                "node {} is not among the children of its parent in workspace '{}'",
                uuid, self.workspace_name
            ))
        })
    }

    // ---------------------------------------------------------------------
    // Editing, save and refresh
    // ---------------------------------------------------------------------

    /// Editor for a node; the node moves into the changed map
    pub fn editor_for(&self, uuid: NodeUuid) -> Result<NodeEditor<'_>> {
        let node = self.promote(uuid)?;
        Ok(NodeEditor::new(self, node))
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Execute every recorded change in one round trip, then drop all
    /// materialized state so later reads observe the saved workspace
    pub fn save(&self) -> Result<()> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            tracing::debug!(workspace = %self.workspace_name, "Nothing to save");
            return Ok(());
        }
        let count = pending.len();
        self.store
            .execute(pending.clone())
            .map_err(|err| match err {
                GraphError::NotFound { location } => RepositoryError::InvalidItemState(format!(
                    "{} no longer exists in workspace '{}'",
                    location, self.workspace_name
                )),
                other => RepositoryError::Repository(format!(
                    "error while saving workspace '{}': {}",
                    self.workspace_name, other
                )),
            })?;
        pending.clear();
        drop(pending);
        let mut state = self.state.write();
        state.cached.clear();
        state.changed.clear();
        state.deleted.clear();
        state.paths.clear();
        drop(state);
        self.purge_handles();
        tracing::info!(workspace = %self.workspace_name, requests = count, "Saved session changes");
        Ok(())
    }

    /// Drop unchanged state; with `keep_changes` false, pending changes are
    /// discarded too
    pub fn refresh(&self, keep_changes: bool) {
        let mut state = self.state.write();
        state.cached.clear();
        state.paths.clear();
        if !keep_changes {
            self.pending.lock().clear();
            state.changed.clear();
            state.deleted.clear();
        }
        drop(state);
        self.purge_handles();
        tracing::debug!(workspace = %self.workspace_name, keep_changes, "Refreshed session cache");
    }

    fn purge_handles(&self) {
        let nodes = self.jcr_nodes.purge();
        let properties = self.jcr_properties.purge();
        tracing::trace!(nodes, properties, "Purged released handles");
    }

    /// Mirror properties already written to the backend into a loaded node
    /// without recording a change. Nodes not loaded are left alone.
    pub(crate) fn sync_properties(&self, uuid: NodeUuid, set: Vec<Property>, remove: &[Name]) {
        let info = {
            let state = self.state.read();
            match state.changed.get(&uuid).or_else(|| state.cached.get(&uuid)) {
                Some(info) => info.clone(),
                None => return,
            }
        };
        if !set.is_empty() {
            let resolver = self.resolver_for(&info);
            for property in set {
                let name = property.name.clone();
                match resolver.property_info(uuid, property, false) {
                    Some(resolved) => {
                        info.set_property(resolved);
                    }
                    None => tracing::warn!(node = %uuid, property = %name, "No definition allows property"),
                }
            }
        }
        for name in remove {
            info.remove_property(name);
            self.jcr_properties.remove(&PropertyId::new(uuid, name.clone()));
        }
    }

    // ---------------------------------------------------------------------
    // Internals shared with the editor
    // ---------------------------------------------------------------------

    pub(super) fn resolver_for(&self, info: &NodeInfo) -> PropertyResolver<'_> {
        PropertyResolver::new(
            &self.node_types,
            info.primary_type_name(),
            info.mixin_type_names(),
            self.options.include_properties_without_definition,
        )
    }

    pub(super) fn record(&self, request: Request) {
        self.pending.lock().push(request);
    }

    /// Whether the node has unsaved changes in this session
    pub fn is_changed(&self, uuid: NodeUuid) -> bool {
        self.state.read().changed.contains_key(&uuid)
    }

    /// Move a node into the changed map, loading it first if needed
    pub(super) fn promote(&self, uuid: NodeUuid) -> Result<Arc<NodeInfo>> {
        let info = self.find_node_info(uuid)?;
        let mut state = self.state.write();
        if let Some(changed) = state.changed.get(&uuid) {
            return Ok(changed.clone());
        }
        state.cached.remove(&uuid);
        state.changed.insert(uuid, info.clone());
        tracing::trace!(node = %uuid, "Promoted node to changed");
        Ok(info)
    }

    pub(super) fn insert_changed(&self, info: Arc<NodeInfo>) {
        let mut state = self.state.write();
        state.deleted.remove(&info.uuid());
        state.changed.insert(info.uuid(), info);
    }

    pub(super) fn invalidate_paths(&self) {
        self.state.write().paths.clear();
    }

    pub(super) fn forget_property(&self, id: &PropertyId) {
        self.jcr_properties.remove(id);
    }

    /// Mark a node and every loaded descendant as deleted; returns how many
    /// nodes were marked
    pub(super) fn delete_node_infos(&self, uuid: NodeUuid) -> usize {
        let mut queue = VecDeque::from([uuid]);
        let mut removed = Vec::new();
        {
            let mut state = self.state.write();
            while let Some(next) = queue.pop_front() {
                let info = state.changed.remove(&next).or_else(|| state.cached.remove(&next));
                state.deleted.insert(next);
                state.paths.remove(&next);
                if let Some(info) = info {
                    queue.extend(info.children().as_list().iter().map(|c| c.uuid()));
                }
                removed.push(next);
            }
        }
        let gone: HashSet<NodeUuid> = removed.iter().copied().collect();
        self.jcr_nodes.retain(|uuid| !gone.contains(uuid));
        self.jcr_properties.retain(|id| !gone.contains(&id.node_id()));
        removed.len()
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    fn is_root_path(path: &Path) -> bool {
        path.is_absolute() && path.is_root()
    }

    /// Absolute paths become relative to the root; the result is normalized
    fn relative_to_root(&self, path: &Path) -> Result<Path> {
        if path.is_absolute() {
            path.normalized()?.relative_to(&Path::root())
        } else {
            path.normalized()
        }
    }

    fn path_not_found(&self, relative: &Path, from: &NodeInfo) -> RepositoryError {
        let from_path = self
            .path_for_info(from)
            .map(|p| p.to_string())
            .unwrap_or_else(|_| from.uuid().to_string());
        RepositoryError::PathNotFound(format!(
            "{} relative to {} in workspace '{}'",
            relative, from_path, self.workspace_name
        ))
    }

    fn load_error(&self, location: &Location, err: GraphError) -> RepositoryError {
        match err {
            GraphError::NotFound { .. } => match &location.path {
                Some(path) => RepositoryError::PathNotFound(format!(
                    "{} in workspace '{}'",
                    path, self.workspace_name
                )),
                None => RepositoryError::ItemNotFound(format!(
                    "no node {} in workspace '{}'",
                    location, self.workspace_name
                )),
            },
            other => RepositoryError::Repository(format!(
                "error while finding node {} in workspace '{}': {}",
                location, self.workspace_name, other
            )),
        }
    }

    /// Read one node and cache it; does not consult the cache first
    fn load_from_graph(&self, location: Location, parent: Option<Arc<NodeInfo>>) -> Result<Arc<NodeInfo>> {
        tracing::debug!(workspace = %self.workspace_name, location = %location, "Loading node");
        let node = self
            .store
            .node_at(&location)
            .map_err(|err| self.load_error(&location, err))?;
        let info = self.materialize(node, parent)?;
        Ok(self.cache_loaded(info))
    }

    /// Cache a freshly loaded node unless the session already holds one
    fn cache_loaded(&self, info: Arc<NodeInfo>) -> Arc<NodeInfo> {
        let uuid = info.uuid();
        let mut state = self.state.write();
        let existing = state
            .changed
            .get(&uuid)
            .or_else(|| state.cached.get(&uuid))
            .cloned();
        if let Some(existing) = existing {
            return existing;
        }
        state.cached.insert(uuid, info.clone());
        info
    }

    fn uuid_of(location: &Location, properties: &HashMap<Name, Property>) -> Option<NodeUuid> {
        location.uuid.or_else(|| {
            [jcr::UUID, dna::UUID]
                .iter()
                .filter_map(|name| properties.get(name))
                .flat_map(|p| p.values.iter())
                .find_map(Value::as_uuid)
        })
    }

    /// Build the session-local info for a backend node. `parent` is the
    /// info of the node's parent when the caller already has it.
    fn materialize(&self, node: GraphNode, parent: Option<Arc<NodeInfo>>) -> Result<Arc<NodeInfo>> {
        let GraphNode {
            location,
            properties: mut raw,
            children,
        } = node;
        let path = location.path.clone().ok_or_else(|| {
            RepositoryError::Repository(format!(
                "backend returned node {} without a path in workspace '{}'",
                location, self.workspace_name
            ))
        })?;
        let uuid = match Self::uuid_of(&location, &raw) {
            Some(uuid) => uuid,
            None => {
                tracing::warn!(path = %path, "Node has no identifier; assigning one");
                Uuid::new_v4()
            }
        };
        let is_root = Self::is_root_path(&path);

        let primary_type = raw
            .get(&jcr::PRIMARY_TYPE)
            .and_then(Property::first)
            .and_then(Value::as_name);
        let primary_type = match primary_type {
            Some(name) => name,
            None => {
                let name = if is_root {
                    dna::ROOT
                } else {
                    self.options.default_primary_type.clone()
                };
                raw.insert(
                    jcr::PRIMARY_TYPE,
                    Property::single(jcr::PRIMARY_TYPE, name.clone()),
                );
                name
            }
        };
        if self.node_types.node_type(&primary_type).is_none() {
            return Err(RepositoryError::Repository(format!(
                "node type {} of {} is not registered (workspace '{}')",
                primary_type, path, self.workspace_name
            )));
        }
        let mixin_types: Vec<Name> = raw
            .get(&jcr::MIXIN_TYPES)
            .map(|p| p.values.iter().filter_map(Value::as_name).collect())
            .unwrap_or_default();

        let stored_definition = raw
            .get(&dnaint::NODE_DEFINITION)
            .and_then(Property::first)
            .and_then(|v| v.as_string().parse::<NodeDefinitionId>().ok())
            .filter(|id| self.node_types.node_definition(id).is_some());

        let (parent_uuid, definition_id) = if is_root {
            let definition = stored_definition
                .unwrap_or_else(|| self.node_types.root_node_definition().id.clone());
            (None, definition)
        } else {
            let parent = match parent {
                Some(parent) => parent,
                None => {
                    let parent_path = path.parent().unwrap_or_else(Path::root);
                    self.find_node_info_at(None, &parent_path)?
                }
            };
            let definition = match stored_definition {
                Some(id) => id,
                None => self.child_definition(&parent, &path, &primary_type)?,
            };
            (Some(parent.uuid()), definition)
        };

        let resolver = PropertyResolver::new(
            &self.node_types,
            &primary_type,
            &mixin_types,
            self.options.include_properties_without_definition,
        );
        let properties = resolve_properties(&resolver, uuid, &raw);
        let children = Children::from_locations(uuid, &children);
        if is_root {
            *self.root.write() = Some(uuid);
        }
        tracing::debug!(
            workspace = %self.workspace_name,
            path = %path,
            node = %uuid,
            primary_type = %primary_type,
            children = children.size(),
            "Materialized node"
        );
        Ok(Arc::new(NodeInfo::new(
            Location::new(path, uuid),
            uuid,
            parent_uuid,
            primary_type,
            mixin_types,
            definition_id,
            children,
            properties,
        )))
    }

    fn child_definition(&self, parent: &NodeInfo, path: &Path, primary_type: &Name) -> Result<NodeDefinitionId> {
        let undetermined = || {
            RepositoryError::Repository(format!(
                "node definition could not be determined for {} in workspace '{}'",
                path, self.workspace_name
            ))
        };
        let name = path.last_segment().ok_or_else(undetermined)?.name();
        let siblings = parent.children().count_with_name(name).saturating_sub(1);
        self.node_types
            .find_child_node_definition(
                parent.primary_type_name(),
                parent.mixin_type_names(),
                name,
                Some(primary_type),
                siblings,
            )
            .map(|definition| definition.id.clone())
            .ok_or_else(undetermined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryGraph;

    const FIXTURE: &str = r#"{
        "children": [
            {"name": "a", "properties": {"jcr:primaryType": "nt:unstructured", "title": "A"},
             "children": [
                {"name": "b", "children": [
                    {"name": "c", "properties": {"count": 3}}
                ]}
             ]},
            {"name": "foo", "properties": {"kind": "first"}},
            {"name": "foo", "properties": {"kind": "second"}}
        ]
    }"#;

    fn cache() -> (Arc<InMemoryGraph>, SessionCache) {
        let graph = Arc::new(InMemoryGraph::from_json("default", FIXTURE).unwrap());
        let cache = SessionCache::new(
            graph.clone(),
            Arc::new(NodeTypes::with_builtins()),
            CacheOptions::default(),
        );
        (graph, cache)
    }

    #[test]
    fn test_root_node_loaded_once() {
        let (graph, cache) = cache();
        let root = cache.find_jcr_root_node().unwrap();
        assert!(root.is_root());
        assert_eq!(root.uuid(), graph.root_uuid());
        let trips = graph.round_trips();
        let again = cache.find_jcr_root_node().unwrap();
        assert!(Arc::ptr_eq(&root, &again));
        assert_eq!(graph.round_trips(), trips);
    }

    #[test]
    fn test_uncached_suffix_loaded_in_one_round_trip() {
        let (graph, cache) = cache();
        cache.find_node_info_for_root().unwrap();
        graph.reset_round_trips();

        let c = cache
            .find_node_info_at(None, &Path::parse("a/b/c").unwrap())
            .unwrap();
        assert_eq!(graph.round_trips(), 1);
        assert_eq!(Some(c.uuid()), graph.uuid_at("/a/b/c"));
        assert_eq!(cache.path_for(c.uuid()).unwrap().to_string(), "/a/b/c");
        let b = graph.uuid_at("/a/b").unwrap();
        assert_eq!(c.parent(), Some(b));
    }

    #[test]
    fn test_missing_child_reported_relative_to_reference() {
        let (graph, cache) = cache();
        let a = graph.uuid_at("/a").unwrap();
        let err = cache
            .find_node_info_at(Some(a), &Path::parse("b/missing").unwrap())
            .unwrap_err();
        match err {
            RepositoryError::PathNotFound(message) => {
                assert!(message.contains("b/missing relative to /a"), "{}", message)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parent_reference_above_root_fails() {
        let (_graph, cache) = cache();
        let err = cache
            .find_node_info_at(None, &Path::parse("..").unwrap())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::PathNotFound(_)));
    }

    #[test]
    fn test_sns_names_and_indexes() {
        let (graph, cache) = cache();
        let second = graph.uuid_at("/foo[2]").unwrap();
        let node = cache
            .find_jcr_node_at(None, &Path::parse("/foo[2]").unwrap())
            .unwrap();
        assert_eq!(node.uuid(), second);
        assert_eq!(cache.name_of(second).unwrap(), Name::from("foo"));
        assert_eq!(cache.sns_index_of(second).unwrap(), 2);
        assert_eq!(cache.sns_index_of(graph.root_uuid()).unwrap(), 1);
    }

    #[test]
    fn test_default_primary_types_and_definitions() {
        let (graph, cache) = cache();
        let root = cache.find_node_info_for_root().unwrap();
        assert_eq!(root.primary_type_name(), &dna::ROOT);
        assert_eq!(root.definition_id(), cache.node_types().root_node_definition().id);

        let c = cache.find_node_info(graph.uuid_at("/a/b/c").unwrap()).unwrap();
        assert_eq!(c.primary_type_name(), &nt::UNSTRUCTURED);
        assert_eq!(c.definition_id().declaring_type, nt::UNSTRUCTURED);
        let count = c.property(&Name::from("count")).unwrap();
        assert_eq!(count.values(), &[Value::Long(3)]);
    }

    #[test]
    fn test_loading_by_uuid_materializes_missing_ancestors() {
        let (graph, cache) = cache();
        let c = graph.uuid_at("/a/b/c").unwrap();
        let info = cache.find_node_info(c).unwrap();
        assert_eq!(cache.path_for_info(&info).unwrap().to_string(), "/a/b/c");
        assert!(cache.find_node_info_in_cache(graph.uuid_at("/a").unwrap()).unwrap().is_some());
    }

    #[test]
    fn test_absolute_path_ignores_reference() {
        let (graph, cache) = cache();
        let b = graph.uuid_at("/a/b").unwrap();
        let a = cache
            .find_node_info_at(Some(b), &Path::parse("/a").unwrap())
            .unwrap();
        assert_eq!(Some(a.uuid()), graph.uuid_at("/a"));
        let c = cache
            .find_node_info_at(Some(b), &Path::parse("/a/b/c").unwrap())
            .unwrap();
        assert_eq!(Some(c.uuid()), graph.uuid_at("/a/b/c"));
    }

    #[test]
    fn test_released_handles_are_purged_on_refresh() {
        let (graph, cache) = cache();
        let a = graph.uuid_at("/a").unwrap();
        let b = graph.uuid_at("/a/b").unwrap();
        let kept = cache.find_jcr_node(a).unwrap();
        drop(cache.find_jcr_node(b).unwrap());
        drop(cache.find_jcr_properties_for(a).unwrap());
        assert_eq!(cache.jcr_nodes.len(), 2);
        assert!(!cache.jcr_properties.is_empty());

        cache.refresh(true);
        assert_eq!(cache.jcr_nodes.len(), 1);
        assert!(cache.jcr_properties.is_empty());
        assert!(Arc::ptr_eq(&kept, &cache.find_jcr_node(a).unwrap()));
    }

    #[test]
    fn test_unknown_uuid_is_item_not_found() {
        let (_graph, cache) = cache();
        let err = cache.find_node_info(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RepositoryError::ItemNotFound(_)));
    }
}
