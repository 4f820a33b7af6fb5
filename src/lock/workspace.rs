//! Workspace Lock Manager
//!
//! Tracks the locks held on the nodes of one workspace. Each lock is written
//! three ways: a record node in the system workspace, the `jcr:lockOwner` and
//! `jcr:lockIsDeep` properties on the locked node (directly in the backend
//! and in the locking session's cache), and the in-memory lock table shared
//! by every session of the workspace. The table alone decides liveness.

use super::record::LockRecord;
use crate::cache::SessionCache;
use crate::error::{GraphError, RepositoryError, Result};
use crate::graph::{GraphStore, Location, Property, Request};
use crate::lexicon::{dna, jcr};
use crate::path::{Path, Segment};
use crate::types::{Name, NodeUuid};
use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use uuid::Uuid;

type LockTable = RwLock<HashMap<NodeUuid, Arc<WorkspaceLock>>>;

/// Claim on a node while its lock is being written; released on drop
struct Reservation<'m> {
    reserved: &'m Mutex<HashSet<NodeUuid>>,
    node_uuid: NodeUuid,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.reserved.lock().remove(&self.node_uuid);
    }
}

/// One lock on one node
#[derive(Debug)]
pub struct WorkspaceLock {
    lock_uuid: NodeUuid,
    node_uuid: NodeUuid,
    owner: String,
    deep: bool,
    session_scoped: bool,
    table: Weak<LockTable>,
}

impl WorkspaceLock {
    pub fn lock_uuid(&self) -> NodeUuid {
        self.lock_uuid
    }

    pub fn node_uuid(&self) -> NodeUuid {
        self.node_uuid
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_deep(&self) -> bool {
        self.deep
    }

    pub fn is_session_scoped(&self) -> bool {
        self.session_scoped
    }

    pub fn lock_token(&self) -> String {
        self.lock_uuid.to_string()
    }

    /// Whether the lock table still holds this lock for its node
    pub fn is_live(&self) -> bool {
        self.table.upgrade().is_some_and(|table| {
            table
                .read()
                .get(&self.node_uuid)
                .is_some_and(|lock| lock.lock_uuid == self.lock_uuid)
        })
    }
}

pub struct WorkspaceLockManager {
    system: Arc<dyn GraphStore>,
    workspace_name: String,
    locks_path: Path,
    lock_extension_interval: Duration,
    table: Arc<LockTable>,
    reserved: Mutex<HashSet<NodeUuid>>,
}

impl WorkspaceLockManager {
    pub fn new(
        system: Arc<dyn GraphStore>,
        workspace_name: impl Into<String>,
        locks_path: Path,
        lock_extension_interval: Duration,
    ) -> Self {
        WorkspaceLockManager {
            system,
            workspace_name: workspace_name.into(),
            locks_path,
            lock_extension_interval,
            table: Arc::new(RwLock::new(HashMap::new())),
            reserved: Mutex::new(HashSet::new()),
        }
    }

    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    fn record_path(&self, lock_uuid: NodeUuid) -> Path {
        self.locks_path
            .child(Segment::named(Name::new(lock_uuid.to_string())))
    }

    fn system_error(&self, action: &str, lock_uuid: NodeUuid, err: GraphError) -> RepositoryError {
        RepositoryError::Repository(format!(
            "error while {} lock {} of workspace '{}': {}",
            action, lock_uuid, self.workspace_name, err
        ))
    }

    fn new_lock(&self, record: &LockRecord) -> Arc<WorkspaceLock> {
        Arc::new(WorkspaceLock {
            lock_uuid: record.lock_uuid,
            node_uuid: record.node_uuid,
            owner: record.owner.clone(),
            deep: record.deep,
            session_scoped: record.session_scoped,
            table: Arc::downgrade(&self.table),
        })
    }

    /// Claim `node_uuid` for a lock about to be written. Fails if the node
    /// is locked or another lock on it is in flight.
    fn reserve(&self, node_uuid: NodeUuid) -> Result<Reservation<'_>> {
        let mut reserved = self.reserved.lock();
        if let Some(existing) = self.table.read().get(&node_uuid) {
            return Err(RepositoryError::Lock(format!(
                "node {} in workspace '{}' is already locked by {}",
                node_uuid, self.workspace_name, existing.owner
            )));
        }
        if !reserved.insert(node_uuid) {
            return Err(RepositoryError::Lock(format!(
                "node {} in workspace '{}' is being locked by another session",
                node_uuid, self.workspace_name
            )));
        }
        Ok(Reservation {
            reserved: &self.reserved,
            node_uuid,
        })
    }

    /// Remove the record of a lock that was never applied
    fn discard_record(&self, lock_uuid: NodeUuid) {
        let mut batch = self.system.batch();
        batch.delete(Location::at_path(self.record_path(lock_uuid)));
        if let Err(err) = batch.execute() {
            tracing::warn!(
                workspace = %self.workspace_name,
                lock = %lock_uuid,
                error = %err,
                "Failed to discard lock record"
            );
        }
    }

    /// Lock the node at `location`, which must carry the node's identifier
    pub fn lock(
        &self,
        cache: &SessionCache,
        location: &Location,
        owner: &str,
        deep: bool,
        session_scoped: bool,
        session_id: &str,
    ) -> Result<Arc<WorkspaceLock>> {
        let node_uuid = location.uuid.ok_or_else(|| {
            RepositoryError::Repository(format!(
                "cannot lock {} in workspace '{}': the node has no identifier",
                location, self.workspace_name
            ))
        })?;
        let _reservation = self.reserve(node_uuid)?;

        let record = LockRecord {
            lock_uuid: Uuid::new_v4(),
            node_uuid,
            workspace: self.workspace_name.clone(),
            owner: owner.to_string(),
            deep,
            session_scoped,
            held_by_session: false,
            locking_session: session_id.to_string(),
            expiration_date: Utc::now() + self.lock_extension_interval,
        };
        let mut batch = self.system.batch();
        batch.create_if_absent(self.record_path(record.lock_uuid), record.properties());
        batch
            .execute()
            .map_err(|err| self.system_error("creating", record.lock_uuid, err))?;

        let lock_properties = vec![
            Property::single(jcr::LOCK_OWNER, owner),
            Property::single(jcr::LOCK_IS_DEEP, deep),
        ];
        let mut batch = cache.store().batch();
        batch.set_on(node_uuid, lock_properties.clone());
        if let Err(err) = batch.execute() {
            self.discard_record(record.lock_uuid);
            return Err(match err {
                GraphError::NotFound { .. } => RepositoryError::ItemNotFound(format!(
                    "node {} in workspace '{}'",
                    node_uuid, self.workspace_name
                )),
                other => self.system_error("applying", record.lock_uuid, other),
            });
        }
        cache.sync_properties(node_uuid, lock_properties, &[]);

        let lock = self.new_lock(&record);
        self.table.write().insert(node_uuid, lock.clone());
        tracing::info!(
            workspace = %self.workspace_name,
            node = %node_uuid,
            token = %lock.lock_token(),
            deep,
            session_scoped,
            "Locked node"
        );
        Ok(lock)
    }

    /// Release a lock. A locked node deleted in the meantime only evicts the
    /// lock; a missing lock record means the table and the backend diverged.
    pub fn unlock(&self, cache: &SessionCache, lock: &WorkspaceLock) -> Result<()> {
        let mut batch = self.system.batch();
        batch.delete(Location::at_path(self.record_path(lock.lock_uuid)));
        batch.execute().map_err(|err| match err {
            GraphError::NotFound { .. } => RepositoryError::IllegalState(format!(
                "lock record {} of workspace '{}' is missing",
                lock.lock_uuid, self.workspace_name
            )),
            other => self.system_error("removing", lock.lock_uuid, other),
        })?;

        let names = [jcr::LOCK_OWNER, jcr::LOCK_IS_DEEP];
        let mut batch = cache.store().batch();
        batch.remove_on(lock.node_uuid, names.to_vec());
        match batch.execute() {
            Ok(_) => cache.sync_properties(lock.node_uuid, Vec::new(), &names),
            Err(GraphError::NotFound { .. }) => tracing::debug!(
                workspace = %self.workspace_name,
                node = %lock.node_uuid,
                "Locked node no longer exists"
            ),
            Err(other) => return Err(self.system_error("releasing", lock.lock_uuid, other)),
        }

        let mut table = self.table.write();
        if table
            .get(&lock.node_uuid)
            .is_some_and(|held| held.lock_uuid == lock.lock_uuid)
        {
            table.remove(&lock.node_uuid);
        }
        tracing::info!(
            workspace = %self.workspace_name,
            node = %lock.node_uuid,
            token = %lock.lock_token(),
            "Unlocked node"
        );
        Ok(())
    }

    fn invalid_token(&self, lock: &WorkspaceLock) -> RepositoryError {
        RepositoryError::Lock(format!(
            "invalid lock token {} in workspace '{}'",
            lock.lock_token(),
            self.workspace_name
        ))
    }

    pub fn is_held_by_session(&self, lock: &WorkspaceLock) -> Result<bool> {
        let location = Location::at_path(self.record_path(lock.lock_uuid));
        let node = self.system.node_at(&location).map_err(|err| match err {
            GraphError::NotFound { .. } => self.invalid_token(lock),
            other => self.system_error("reading", lock.lock_uuid, other),
        })?;
        Ok(node
            .property(&dna::IS_HELD_BY_SESSION)
            .and_then(Property::first)
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub fn set_held_by_session(&self, lock: &WorkspaceLock, held: bool) -> Result<()> {
        let request = Request::SetProperties {
            on: Location::at_path(self.record_path(lock.lock_uuid)),
            properties: vec![Property::single(dna::IS_HELD_BY_SESSION, held)],
        };
        self.system
            .execute(vec![request])
            .map_err(|err| match err {
                GraphError::NotFound { .. } => self.invalid_token(lock),
                other => self.system_error("updating", lock.lock_uuid, other),
            })?;
        Ok(())
    }

    /// Lock with the given token; tokens are few, so this scans
    pub fn lock_for_token(&self, token: &str) -> Option<Arc<WorkspaceLock>> {
        self.table
            .read()
            .values()
            .find(|lock| lock.lock_token() == token)
            .cloned()
    }

    pub fn lock_for_node(&self, node_uuid: NodeUuid) -> Option<Arc<WorkspaceLock>> {
        self.table.read().get(&node_uuid).cloned()
    }

    pub fn lock_count(&self) -> usize {
        self.table.read().len()
    }

    /// Unlock the session-scoped locks among `tokens`; open-scoped locks are
    /// left alone
    pub fn clean_locks<'t>(
        &self,
        cache: &SessionCache,
        tokens: impl IntoIterator<Item = &'t String>,
    ) -> Result<usize> {
        let mut released = 0;
        for token in tokens {
            match self.lock_for_token(token) {
                Some(lock) if lock.is_session_scoped() => {
                    self.unlock(cache, &lock)?;
                    released += 1;
                }
                _ => {}
            }
        }
        Ok(released)
    }

    /// Rebuild the lock table from the records in the system workspace;
    /// returns the number of locks loaded
    pub fn load_from_system(&self) -> Result<usize> {
        let locks = match self.system.node_at(&Location::at_path(self.locks_path.clone())) {
            Ok(node) => node,
            Err(GraphError::NotFound { .. }) => return Ok(0),
            Err(err) => {
                return Err(RepositoryError::Repository(format!(
                    "error while reading {} for workspace '{}': {}",
                    self.locks_path, self.workspace_name, err
                )))
            }
        };
        if locks.children.is_empty() {
            return Ok(0);
        }
        let mut batch = self.system.batch();
        for child in &locks.children {
            if let Some(path) = &child.path {
                batch.read(path.clone());
            }
        }
        let results = batch.execute().map_err(|err| {
            RepositoryError::Repository(format!(
                "error while reading lock records for workspace '{}': {}",
                self.workspace_name, err
            ))
        })?;

        let mut table = self.table.write();
        let mut loaded = 0;
        for node in results.nodes() {
            match LockRecord::from_node(node) {
                Some(record) if record.workspace == self.workspace_name => {
                    table.insert(record.node_uuid, self.new_lock(&record));
                    loaded += 1;
                }
                Some(_) => {}
                None => tracing::warn!(location = %node.location, "Ignoring malformed lock record"),
            }
        }
        tracing::debug!(workspace = %self.workspace_name, loaded, "Loaded lock records");
        Ok(loaded)
    }
}
