//! Property definition resolution
//!
//! Assigns each raw backend property of a node a property definition taken
//! from the node's primary type and mixins. The lookup order is: exact name
//! with matching cardinality, exact name declared multi-valued (single raw
//! values only), a residual definition of matching cardinality, a multi-valued
//! residual (single raw values only), and finally the multi-valued residual of
//! `nt:unstructured` when properties without a definition are included.
//! Properties matching none of these are left out of the node.

use super::ids::PropertyId;
use super::node_info::PropertyInfo;
use crate::graph::Property;
use crate::lexicon::{self, dna, jcr, mix, nt};
use crate::nodetype::{NodeTypes, PropertyDefinition, PropertyType};
use crate::types::{Name, NodeUuid};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Prioritized property definition lookup for one combination of node types
pub struct PropertyResolver<'a> {
    single: HashMap<&'a Name, &'a PropertyDefinition>,
    multi: HashMap<&'a Name, &'a PropertyDefinition>,
    residual_single: Vec<&'a PropertyDefinition>,
    residual_multi: Vec<&'a PropertyDefinition>,
    fallback: Option<&'a PropertyDefinition>,
    referenceable: bool,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(
        node_types: &'a NodeTypes,
        primary_type: &Name,
        mixin_types: &[Name],
        include_properties_without_definition: bool,
    ) -> Self {
        let mut resolver = PropertyResolver {
            single: HashMap::new(),
            multi: HashMap::new(),
            residual_single: Vec::new(),
            residual_multi: Vec::new(),
            fallback: None,
            referenceable: false,
        };
        for type_name in std::iter::once(primary_type).chain(mixin_types.iter()) {
            if node_types.node_type(type_name).is_none() {
                tracing::warn!(node_type = %type_name, "Ignoring unknown node type");
                continue;
            }
            resolver.referenceable |= node_types.is_node_type(type_name, &mix::REFERENCEABLE);
            for definition in node_types.property_definitions(type_name) {
                if definition.is_residual() {
                    if definition.multiple {
                        resolver.residual_multi.push(definition);
                    } else {
                        resolver.residual_single.push(definition);
                    }
                    continue;
                }
                let by_name = if definition.multiple {
                    &mut resolver.multi
                } else {
                    &mut resolver.single
                };
                by_name.entry(definition.name()).or_insert(definition);
            }
        }
        if include_properties_without_definition {
            resolver.fallback = node_types.node_type(&nt::UNSTRUCTURED).and_then(|t| {
                t.property_definitions
                    .iter()
                    .find(|d| d.is_residual() && d.multiple)
            });
        }
        resolver
    }

    /// Whether any of the types is `mix:referenceable` or inherits from it
    pub fn is_referenceable(&self) -> bool {
        self.referenceable
    }

    pub fn definition_for(&self, name: &Name, multi_valued: bool) -> Option<&'a PropertyDefinition> {
        let exact = if multi_valued {
            self.multi.get(name)
        } else {
            self.single.get(name).or_else(|| self.multi.get(name))
        };
        if let Some(definition) = exact {
            return Some(*definition);
        }
        let residual = if multi_valued {
            self.residual_multi.first()
        } else {
            self.residual_single
                .first()
                .or_else(|| self.residual_multi.first())
        };
        residual.copied().or(self.fallback)
    }

    /// Build the property info for a raw property, or `None` when no
    /// definition admits it
    pub fn property_info(
        &self,
        node: NodeUuid,
        property: Property,
        multi_valued: bool,
    ) -> Option<PropertyInfo> {
        let definition = self.definition_for(&property.name, multi_valued)?;
        if !definition.multiple && property.is_empty() {
            return None;
        }
        let property_type = match definition.required_type {
            PropertyType::Undefined => property
                .first()
                .map(PropertyType::of)
                .unwrap_or(PropertyType::String),
            required => required,
        };
        Some(PropertyInfo::new(
            PropertyId::new(node, property.name.clone()),
            definition.id.clone(),
            property_type,
            property,
            definition.multiple,
        ))
    }
}

/// Names listed by the internal multi-valued marker property
pub fn multi_valued_names(raw: &HashMap<Name, Property>) -> HashSet<Name> {
    raw.get(&lexicon::dnaint::MULTI_VALUED_PROPERTIES)
        .map(|p| p.values.iter().filter_map(|v| v.as_name()).collect())
        .unwrap_or_default()
}

/// Resolve the exposed properties of one node
///
/// Internal properties and `dna:uuid` are never exposed. `jcr:uuid` is
/// present exactly when the node is referenceable.
pub fn resolve_properties(
    resolver: &PropertyResolver<'_>,
    node: NodeUuid,
    raw: &HashMap<Name, Property>,
) -> HashMap<Name, Arc<PropertyInfo>> {
    let marked_multi = multi_valued_names(raw);
    let mut resolved = HashMap::with_capacity(raw.len());
    for property in raw.values() {
        let name = &property.name;
        if lexicon::is_internal(name) || *name == dna::UUID || *name == jcr::UUID {
            continue;
        }
        let multi_valued = property.values.len() > 1 || marked_multi.contains(name);
        match resolver.property_info(node, property.clone(), multi_valued) {
            Some(info) => {
                resolved.insert(name.clone(), Arc::new(info));
            }
            None => tracing::warn!(
                node = %node,
                property = %name,
                "Dropping property not allowed by the node's types"
            ),
        }
    }
    if resolver.is_referenceable() {
        let uuid_property = Property::single(jcr::UUID, node.to_string());
        if let Some(info) = resolver.property_info(node, uuid_property, false) {
            resolved.insert(jcr::UUID, Arc::new(info));
        }
    }
    resolved
}
