//! Sessions
//!
//! A session couples one user's `SessionCache` for a workspace with the set
//! of lock tokens the session holds. Logging out releases the session-scoped
//! locks among those tokens and gives the others up for adoption.

use crate::cache::SessionCache;
use crate::error::{RepositoryError, Result};
use crate::graph::Location;
use crate::lock::{WorkspaceLock, WorkspaceLockManager};
use crate::types::NodeUuid;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Session {
    id: String,
    user_id: String,
    cache: SessionCache,
    lock_manager: Arc<WorkspaceLockManager>,
    lock_tokens: Mutex<HashSet<String>>,
}

impl Session {
    pub(crate) fn new(
        id: String,
        user_id: String,
        cache: SessionCache,
        lock_manager: Arc<WorkspaceLockManager>,
    ) -> Self {
        Session {
            id,
            user_id,
            cache,
            lock_manager,
            lock_tokens: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn workspace_name(&self) -> &str {
        self.cache.workspace_name()
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn save(&self) -> Result<()> {
        self.cache.save()
    }

    pub fn refresh(&self, keep_changes: bool) {
        self.cache.refresh(keep_changes)
    }

    /// Lock a node on behalf of this session's user; the session then holds
    /// the lock token
    pub fn lock(&self, node: NodeUuid, deep: bool, session_scoped: bool) -> Result<Arc<WorkspaceLock>> {
        if self.cache.is_changed(node) {
            return Err(RepositoryError::InvalidItemState(format!(
                "node {} has unsaved changes in workspace '{}'",
                node,
                self.workspace_name()
            )));
        }
        // the node must exist before a record is written for it
        self.cache.find_node_info(node)?;
        let lock = self.lock_manager.lock(
            &self.cache,
            &Location::with_uuid(node),
            &self.user_id,
            deep,
            session_scoped,
            &self.id,
        )?;
        self.lock_manager.set_held_by_session(&lock, true)?;
        self.lock_tokens.lock().insert(lock.lock_token());
        Ok(lock)
    }

    /// Release the lock on a node; the session must hold its token
    pub fn unlock(&self, node: NodeUuid) -> Result<()> {
        let lock = self.lock_manager.lock_for_node(node).ok_or_else(|| {
            RepositoryError::Lock(format!(
                "node {} is not locked in workspace '{}'",
                node,
                self.workspace_name()
            ))
        })?;
        let token = lock.lock_token();
        if !self.lock_tokens.lock().contains(&token) {
            return Err(RepositoryError::Lock(format!(
                "session {} does not hold the lock token of node {}",
                self.id, node
            )));
        }
        self.lock_manager.unlock(&self.cache, &lock)?;
        self.lock_tokens.lock().remove(&token);
        Ok(())
    }

    pub fn lock_for_node(&self, node: NodeUuid) -> Option<Arc<WorkspaceLock>> {
        self.lock_manager.lock_for_node(node)
    }

    /// Take over a lock token no other session holds
    pub fn add_lock_token(&self, token: &str) -> Result<()> {
        let lock = self.lock_manager.lock_for_token(token).ok_or_else(|| {
            RepositoryError::Lock(format!(
                "invalid lock token {} in workspace '{}'",
                token,
                self.workspace_name()
            ))
        })?;
        let mut tokens = self.lock_tokens.lock();
        if tokens.contains(token) {
            return Ok(());
        }
        if self.lock_manager.is_held_by_session(&lock)? {
            return Err(RepositoryError::Lock(format!(
                "lock token {} is held by another session",
                token
            )));
        }
        self.lock_manager.set_held_by_session(&lock, true)?;
        tokens.insert(token.to_string());
        Ok(())
    }

    /// Give up a held lock token; the lock itself stays
    pub fn remove_lock_token(&self, token: &str) -> Result<()> {
        let mut tokens = self.lock_tokens.lock();
        if !tokens.contains(token) {
            return Err(RepositoryError::Lock(format!(
                "session {} does not hold lock token {}",
                self.id, token
            )));
        }
        if let Some(lock) = self.lock_manager.lock_for_token(token) {
            self.lock_manager.set_held_by_session(&lock, false)?;
        }
        tokens.remove(token);
        Ok(())
    }

    pub fn lock_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.lock_tokens.lock().iter().cloned().collect();
        tokens.sort();
        tokens
    }

    /// End the session. Session-scoped locks are released; the tokens of
    /// open-scoped locks are given up.
    pub fn logout(self) -> Result<()> {
        let tokens: Vec<String> = self.lock_tokens.lock().drain().collect();
        let released = self.lock_manager.clean_locks(&self.cache, &tokens)?;
        for token in &tokens {
            if let Some(lock) = self.lock_manager.lock_for_token(token) {
                self.lock_manager.set_held_by_session(&lock, false)?;
            }
        }
        tracing::info!(
            session = %self.id,
            workspace = %self.workspace_name(),
            released,
            "Logged out"
        );
        Ok(())
    }
}
