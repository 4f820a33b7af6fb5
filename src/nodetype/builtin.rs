//! Built-in node types needed by the session cache and the lock manager.

use super::definition::{NodeType, PropertyType};
use crate::lexicon::{dna, jcr, mix, nt, RESIDUAL};

pub fn builtin_node_types() -> Vec<NodeType> {
    vec![
        NodeType::builder(nt::BASE)
            .protected_property(jcr::PRIMARY_TYPE, PropertyType::Name, false)
            .multi_property(jcr::MIXIN_TYPES, PropertyType::Name)
            .build(),
        NodeType::builder(mix::REFERENCEABLE)
            .mixin()
            .protected_property(jcr::UUID, PropertyType::String, false)
            .build(),
        NodeType::builder(mix::LOCKABLE)
            .mixin()
            .property(jcr::LOCK_OWNER, PropertyType::String)
            .property(jcr::LOCK_IS_DEEP, PropertyType::Boolean)
            .build(),
        NodeType::builder(nt::UNSTRUCTURED)
            .supertype(nt::BASE)
            .property(RESIDUAL, PropertyType::Undefined)
            .multi_property(RESIDUAL, PropertyType::Undefined)
            .child(RESIDUAL, vec![nt::BASE], Some(nt::UNSTRUCTURED), true)
            .build(),
        NodeType::builder(nt::HIERARCHY_NODE)
            .supertype(nt::BASE)
            .property(jcr::CREATED, PropertyType::Date)
            .build(),
        NodeType::builder(nt::FOLDER)
            .supertype(nt::HIERARCHY_NODE)
            .child(RESIDUAL, vec![nt::HIERARCHY_NODE], None, false)
            .build(),
        NodeType::builder(nt::FILE)
            .supertype(nt::HIERARCHY_NODE)
            .child(jcr::CONTENT, vec![nt::BASE], None, false)
            .build(),
        NodeType::builder(nt::RESOURCE)
            .supertype(nt::BASE)
            .supertype(mix::REFERENCEABLE)
            .property(jcr::DATA, PropertyType::Binary)
            .property(jcr::MIME_TYPE, PropertyType::String)
            .property(jcr::ENCODING, PropertyType::String)
            .property(jcr::LAST_MODIFIED, PropertyType::Date)
            .build(),
        NodeType::builder(dna::ROOT)
            .supertype(nt::BASE)
            .supertype(mix::REFERENCEABLE)
            .property(RESIDUAL, PropertyType::Undefined)
            .multi_property(RESIDUAL, PropertyType::Undefined)
            .child(jcr::SYSTEM, vec![dna::SYSTEM], Some(dna::SYSTEM), false)
            .child(RESIDUAL, vec![nt::BASE], Some(nt::UNSTRUCTURED), true)
            .build(),
        NodeType::builder(dna::SYSTEM)
            .supertype(nt::BASE)
            .child(dna::LOCKS, vec![dna::LOCKS], Some(dna::LOCKS), false)
            .build(),
        NodeType::builder(dna::LOCKS)
            .supertype(nt::BASE)
            .child(RESIDUAL, vec![dna::LOCK], Some(dna::LOCK), false)
            .build(),
        NodeType::builder(dna::LOCK)
            .supertype(nt::BASE)
            .property(dna::LOCKED_UUID, PropertyType::String)
            .property(dna::WORKSPACE, PropertyType::String)
            .property(dna::IS_SESSION_SCOPED, PropertyType::Boolean)
            .property(dna::IS_HELD_BY_SESSION, PropertyType::Boolean)
            .property(dna::LOCKING_SESSION, PropertyType::String)
            .property(dna::EXPIRATION_DATE, PropertyType::Date)
            .property(jcr::LOCK_OWNER, PropertyType::String)
            .property(jcr::LOCK_IS_DEEP, PropertyType::Boolean)
            .build(),
    ]
}
