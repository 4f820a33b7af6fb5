//! Node Type Registry
//!
//! Read-only view of the type system used to materialize nodes: effective
//! (declared plus inherited) property and child node definitions, type
//! inheritance checks, and lookup of definitions by durable id.
//!
//! The registry is built in two phases: `NodeTypes::bootstrap()` yields a
//! registry holding only the root node definition, and `register` adds types
//! once their supertypes are known. `NodeTypes::with_builtins()` does both for
//! the built-in types.

pub mod builtin;
pub mod definition;

pub use definition::{
    NodeDefinition, NodeDefinitionId, NodeType, PropertyDefinition, PropertyDefinitionId,
    PropertyType,
};

use crate::error::{RepositoryError, Result};
use crate::lexicon::{dna, nt};
use crate::types::Name;
use std::collections::{HashMap, HashSet, VecDeque};

pub struct NodeTypes {
    types: HashMap<Name, NodeType>,
    root_definition: NodeDefinition,
}

impl NodeTypes {
    /// Registry holding no node types, only the root node definition
    pub fn bootstrap() -> Self {
        NodeTypes {
            types: HashMap::new(),
            root_definition: NodeDefinition {
                id: NodeDefinitionId {
                    declaring_type: dna::ROOT,
                    child_name: Name::new(""),
                    required_primary_types: vec![nt::BASE],
                },
                default_primary_type: Some(dna::ROOT),
                allows_same_name_siblings: false,
                mandatory: true,
            },
        }
    }

    /// Registry with every built-in type registered
    pub fn with_builtins() -> Self {
        let mut types = NodeTypes::bootstrap();
        // Built-in supertypes always resolve within the set itself.
        if let Err(err) = types.register(builtin::builtin_node_types()) {
            tracing::error!(error = %err, "Failed to register built-in node types");
        }
        types
    }

    /// Register a set of node types. Supertypes must be registered already or
    /// be part of the same set; nothing is registered if any check fails.
    pub fn register(&mut self, node_types: Vec<NodeType>) -> Result<()> {
        let incoming: HashSet<&Name> = node_types.iter().map(|t| &t.name).collect();
        for node_type in &node_types {
            if self.types.contains_key(&node_type.name) {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "node type {} is already registered",
                    node_type.name
                )));
            }
            for supertype in &node_type.supertypes {
                if !self.types.contains_key(supertype) && !incoming.contains(supertype) {
                    return Err(RepositoryError::ConstraintViolation(format!(
                        "supertype {} of node type {} is not registered",
                        supertype, node_type.name
                    )));
                }
            }
        }
        for node_type in node_types {
            tracing::debug!(node_type = %node_type.name, "Registered node type");
            self.types.insert(node_type.name.clone(), node_type);
        }
        Ok(())
    }

    pub fn node_type(&self, name: &Name) -> Option<&NodeType> {
        self.types.get(name)
    }

    pub fn root_node_definition(&self) -> &NodeDefinition {
        &self.root_definition
    }

    /// The type followed by all of its supertypes, breadth first, each once
    fn type_hierarchy(&self, name: &Name) -> Vec<&NodeType> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([name.clone()]);
        let mut result = Vec::new();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(node_type) = self.types.get(&next) {
                queue.extend(node_type.supertypes.iter().cloned());
                result.push(node_type);
            }
        }
        result
    }

    /// Whether `name` is `candidate` or inherits from it
    pub fn is_node_type(&self, name: &Name, candidate: &Name) -> bool {
        self.type_hierarchy(name).iter().any(|t| t.name == *candidate)
    }

    /// Declared definitions first, then those inherited from supertypes
    pub fn property_definitions(&self, name: &Name) -> Vec<&PropertyDefinition> {
        self.type_hierarchy(name)
            .into_iter()
            .flat_map(|t| t.property_definitions.iter())
            .collect()
    }

    pub fn child_node_definitions(&self, name: &Name) -> Vec<&NodeDefinition> {
        self.type_hierarchy(name)
            .into_iter()
            .flat_map(|t| t.child_node_definitions.iter())
            .collect()
    }

    pub fn property_definition(&self, id: &PropertyDefinitionId) -> Option<&PropertyDefinition> {
        self.types
            .get(&id.declaring_type)?
            .property_definitions
            .iter()
            .find(|d| d.id == *id)
    }

    pub fn node_definition(&self, id: &NodeDefinitionId) -> Option<&NodeDefinition> {
        if *id == self.root_definition.id {
            return Some(&self.root_definition);
        }
        self.types
            .get(&id.declaring_type)?
            .child_node_definitions
            .iter()
            .find(|d| d.id == *id)
    }

    /// Best child node definition for a child of a node with the given types.
    ///
    /// Definitions with an exact name win over residual ones; the primary
    /// type is consulted before the mixins. A definition applies when the
    /// child's primary type (if known) satisfies every required type and,
    /// for a same-name sibling, when it allows same-name siblings.
    pub fn find_child_node_definition(
        &self,
        parent_primary_type: &Name,
        parent_mixin_types: &[Name],
        child_name: &Name,
        child_primary_type: Option<&Name>,
        existing_siblings_with_name: usize,
    ) -> Option<&NodeDefinition> {
        let candidates: Vec<&NodeDefinition> = std::iter::once(parent_primary_type)
            .chain(parent_mixin_types.iter())
            .flat_map(|t| self.child_node_definitions(t))
            .collect();
        let applies = |definition: &&NodeDefinition| {
            if existing_siblings_with_name > 0 && !definition.allows_same_name_siblings {
                return false;
            }
            let child_type = child_primary_type.or(definition.default_primary_type.as_ref());
            match child_type {
                Some(child_type) => definition
                    .required_primary_types()
                    .iter()
                    .all(|required| self.is_node_type(child_type, required)),
                None => false,
            }
        };
        candidates
            .iter()
            .copied()
            .filter(|d| d.name() == child_name)
            .find(applies)
            .or_else(|| {
                candidates
                    .iter()
                    .copied()
                    .filter(|d| d.is_residual())
                    .find(applies)
            })
    }
}
