//! Repository
//!
//! Entry point: owns the node types, the workspace stores and the
//! repository-wide lock manager, and opens sessions.

use crate::cache::SessionCache;
use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::graph::GraphStore;
use crate::lock::RepositoryLockManager;
use crate::nodetype::NodeTypes;
use crate::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct Repository {
    config: RepositoryConfig,
    node_types: Arc<NodeTypes>,
    workspaces: HashMap<String, Arc<dyn GraphStore>>,
    lock_manager: RepositoryLockManager,
}

impl Repository {
    /// Create a repository over the given workspace stores. Lock records are
    /// kept in `system`, which is also reachable as a workspace under its
    /// own name.
    pub fn new(
        config: RepositoryConfig,
        node_types: NodeTypes,
        system: Arc<dyn GraphStore>,
        workspaces: Vec<Arc<dyn GraphStore>>,
    ) -> Result<Self> {
        if system.workspace_name() != config.system_workspace {
            return Err(RepositoryError::Config(format!(
                "system store serves workspace '{}' but system_workspace is '{}'",
                system.workspace_name(),
                config.system_workspace
            )));
        }
        let lock_manager = RepositoryLockManager::new(
            system.clone(),
            config.locks_path()?,
            config.lock_extension_interval(),
        )?;
        let mut stores: HashMap<String, Arc<dyn GraphStore>> = HashMap::new();
        stores.insert(system.workspace_name().to_string(), system);
        for store in workspaces {
            let name = store.workspace_name().to_string();
            if stores.insert(name.clone(), store).is_some() {
                return Err(RepositoryError::Config(format!(
                    "workspace '{}' is configured twice",
                    name
                )));
            }
        }
        tracing::info!(
            workspaces = stores.len(),
            default_workspace = %config.workspace,
            "Repository started"
        );
        Ok(Repository {
            config,
            node_types: Arc::new(node_types),
            workspaces: stores,
            lock_manager,
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn node_types(&self) -> &Arc<NodeTypes> {
        &self.node_types
    }

    pub fn lock_manager(&self) -> &RepositoryLockManager {
        &self.lock_manager
    }

    pub fn workspace_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workspaces.keys().cloned().collect();
        names.sort();
        names
    }

    /// Open a session on a workspace, the configured default when `None`
    pub fn login(&self, workspace: Option<&str>, user_id: &str) -> Result<Session> {
        let workspace = workspace.unwrap_or(&self.config.workspace);
        let store = self
            .workspaces
            .get(workspace)
            .ok_or_else(|| RepositoryError::NoSuchWorkspace(workspace.to_string()))?;
        let cache = SessionCache::new(
            store.clone(),
            self.node_types.clone(),
            self.config.cache_options(),
        );
        let session_id = Uuid::new_v4().to_string();
        let lock_manager = self.lock_manager.for_workspace(workspace)?;
        tracing::info!(session = %session_id, workspace, user = user_id, "Logged in");
        Ok(Session::new(
            session_id,
            user_id.to_string(),
            cache,
            lock_manager,
        ))
    }
}
