//! Lock record nodes
//!
//! A lock is persisted as a `dna:lock` node named after the lock identifier
//! under the repository's locks path in the system workspace.

use crate::graph::{GraphNode, Property, Value};
use crate::lexicon::{dna, jcr};
use crate::types::{Name, NodeUuid};
use chrono::{DateTime, Utc};

/// Persistent form of one workspace lock
#[derive(Debug, Clone, PartialEq)]
pub struct LockRecord {
    pub lock_uuid: NodeUuid,
    pub node_uuid: NodeUuid,
    pub workspace: String,
    pub owner: String,
    pub deep: bool,
    pub session_scoped: bool,
    pub held_by_session: bool,
    pub locking_session: String,
    pub expiration_date: DateTime<Utc>,
}

impl LockRecord {
    /// Record node name
    pub fn node_name(&self) -> Name {
        Name::new(self.lock_uuid.to_string())
    }

    /// Properties of a new record node
    pub fn properties(&self) -> Vec<Property> {
        vec![
            Property::single(jcr::PRIMARY_TYPE, dna::LOCK),
            Property::single(dna::UUID, self.lock_uuid),
            Property::single(dna::WORKSPACE, self.workspace.clone()),
            Property::single(dna::LOCKED_UUID, self.node_uuid.to_string()),
            Property::single(dna::IS_SESSION_SCOPED, self.session_scoped),
            Property::single(dna::LOCKING_SESSION, self.locking_session.clone()),
            Property::single(dna::EXPIRATION_DATE, Value::Date(self.expiration_date)),
            Property::single(dna::IS_HELD_BY_SESSION, self.held_by_session),
            Property::single(jcr::LOCK_OWNER, self.owner.clone()),
            Property::single(jcr::LOCK_IS_DEEP, self.deep),
        ]
    }

    /// Parse a record node; `None` when required properties are missing
    pub fn from_node(node: &GraphNode) -> Option<LockRecord> {
        let text = |name: &Name| node.property(name).and_then(Property::first).map(Value::as_string);
        let flag = |name: &Name| {
            node.property(name)
                .and_then(Property::first)
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        let lock_uuid = node.location.uuid.or_else(|| {
            node.location
                .path
                .as_ref()
                .and_then(|p| p.last_segment())
                .and_then(|s| s.name().as_str().parse().ok())
        })?;
        let node_uuid = node
            .property(&dna::LOCKED_UUID)
            .and_then(Property::first)
            .and_then(Value::as_uuid)?;
        let expiration_date = match node.property(&dna::EXPIRATION_DATE).and_then(Property::first) {
            Some(Value::Date(date)) => *date,
            Some(other) => DateTime::parse_from_rfc3339(&other.as_string())
                .ok()?
                .with_timezone(&Utc),
            None => Utc::now(),
        };
        Some(LockRecord {
            lock_uuid,
            node_uuid,
            workspace: text(&dna::WORKSPACE)?,
            owner: text(&jcr::LOCK_OWNER).unwrap_or_default(),
            deep: flag(&jcr::LOCK_IS_DEEP),
            session_scoped: flag(&dna::IS_SESSION_SCOPED),
            held_by_session: flag(&dna::IS_HELD_BY_SESSION),
            locking_session: text(&dna::LOCKING_SESSION).unwrap_or_default(),
            expiration_date,
        })
    }
}
