//! Node locking
//!
//! `RepositoryLockManager` owns the locks path in the system workspace and
//! hands out one `WorkspaceLockManager` per workspace, so every session of a
//! workspace shares one lock table.

pub mod record;
pub mod workspace;

pub use record::LockRecord;
pub use workspace::{WorkspaceLock, WorkspaceLockManager};

use crate::error::{RepositoryError, Result};
use crate::graph::{GraphStore, Property};
use crate::lexicon::{dna, jcr, nt};
use crate::path::Path;
use crate::types::Name;
use chrono::Duration;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RepositoryLockManager {
    system: Arc<dyn GraphStore>,
    locks_path: Path,
    lock_extension_interval: Duration,
    managers: Mutex<HashMap<String, Arc<WorkspaceLockManager>>>,
}

impl RepositoryLockManager {
    /// Create the manager, making sure the locks path exists in the system
    /// workspace
    pub fn new(
        system: Arc<dyn GraphStore>,
        locks_path: Path,
        lock_extension_interval: Duration,
    ) -> Result<Self> {
        if !locks_path.is_absolute() || locks_path.is_root() {
            return Err(RepositoryError::Config(format!(
                "locks path must be an absolute non-root path, got {}",
                locks_path
            )));
        }
        let mut batch = system.batch();
        let mut path = Path::root();
        for segment in locks_path.iter() {
            path = path.child(segment.clone());
            let primary_type = Self::container_type(segment.name());
            batch.create_if_absent(
                path.clone(),
                vec![Property::single(jcr::PRIMARY_TYPE, primary_type)],
            );
        }
        batch.execute().map_err(|err| {
            RepositoryError::Repository(format!(
                "error while creating {} in workspace '{}': {}",
                locks_path,
                system.workspace_name(),
                err
            ))
        })?;
        Ok(RepositoryLockManager {
            system,
            locks_path,
            lock_extension_interval,
            managers: Mutex::new(HashMap::new()),
        })
    }

    fn container_type(name: &Name) -> Name {
        if *name == jcr::SYSTEM {
            dna::SYSTEM
        } else if *name == dna::LOCKS {
            dna::LOCKS
        } else {
            nt::UNSTRUCTURED
        }
    }

    pub fn locks_path(&self) -> &Path {
        &self.locks_path
    }

    /// Lock manager of a workspace, created and loaded from the stored lock
    /// records on first use
    pub fn for_workspace(&self, workspace_name: &str) -> Result<Arc<WorkspaceLockManager>> {
        let mut managers = self.managers.lock();
        if let Some(manager) = managers.get(workspace_name) {
            return Ok(manager.clone());
        }
        let manager = Arc::new(WorkspaceLockManager::new(
            self.system.clone(),
            workspace_name,
            self.locks_path.clone(),
            self.lock_extension_interval,
        ));
        manager.load_from_system()?;
        managers.insert(workspace_name.to_string(), manager.clone());
        Ok(manager)
    }
}
