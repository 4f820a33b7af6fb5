//! Node type, property definition and child node definition values.

use crate::error::{RepositoryError, Result};
use crate::graph::Value;
use crate::types::Name;
use std::fmt;
use std::str::FromStr;

/// JCR property type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    Undefined,
}

impl PropertyType {
    /// Type implied by a backend value
    pub fn of(value: &Value) -> PropertyType {
        match value {
            Value::String(_) | Value::Uuid(_) => PropertyType::String,
            Value::Binary(_) => PropertyType::Binary,
            Value::Long(_) => PropertyType::Long,
            Value::Double(_) => PropertyType::Double,
            Value::Date(_) => PropertyType::Date,
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Name(_) => PropertyType::Name,
            Value::Path(_) => PropertyType::Path,
            Value::Reference(_) => PropertyType::Reference,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "String",
            PropertyType::Binary => "Binary",
            PropertyType::Long => "Long",
            PropertyType::Double => "Double",
            PropertyType::Date => "Date",
            PropertyType::Boolean => "Boolean",
            PropertyType::Name => "Name",
            PropertyType::Path => "Path",
            PropertyType::Reference => "Reference",
            PropertyType::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        let ty = match s {
            "String" => PropertyType::String,
            "Binary" => PropertyType::Binary,
            "Long" => PropertyType::Long,
            "Double" => PropertyType::Double,
            "Date" => PropertyType::Date,
            "Boolean" => PropertyType::Boolean,
            "Name" => PropertyType::Name,
            "Path" => PropertyType::Path,
            "Reference" => PropertyType::Reference,
            "Undefined" => PropertyType::Undefined,
            other => {
                return Err(RepositoryError::Repository(format!(
                    "unknown property type '{}'",
                    other
                )))
            }
        };
        Ok(ty)
    }
}

/// Durable identifier of a property definition
///
/// String form: `declaringType/propertyName/Type`, with a trailing `*` for
/// multi-valued definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyDefinitionId {
    pub declaring_type: Name,
    pub property_name: Name,
    pub property_type: PropertyType,
    pub multiple: bool,
}

impl fmt::Display for PropertyDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}{}",
            self.declaring_type,
            self.property_name,
            self.property_type,
            if self.multiple { "*" } else { "" }
        )
    }
}

impl FromStr for PropertyDefinitionId {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(RepositoryError::Repository(format!(
                "invalid property definition id '{}'",
                s
            )));
        }
        let (type_str, multiple) = match parts[2].strip_suffix('*') {
            Some(t) => (t, true),
            None => (parts[2], false),
        };
        Ok(PropertyDefinitionId {
            declaring_type: Name::from(parts[0]),
            property_name: Name::from(parts[1]),
            property_type: type_str.parse()?,
            multiple,
        })
    }
}

/// Durable identifier of a child node definition
///
/// String form: `declaringType/childName/requiredType1,requiredType2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeDefinitionId {
    pub declaring_type: Name,
    pub child_name: Name,
    pub required_primary_types: Vec<Name>,
}

impl fmt::Display for NodeDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let required: Vec<&str> = self
            .required_primary_types
            .iter()
            .map(Name::as_str)
            .collect();
        write!(
            f,
            "{}/{}/{}",
            self.declaring_type,
            self.child_name,
            required.join(",")
        )
    }
}

impl FromStr for NodeDefinitionId {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(RepositoryError::Repository(format!(
                "invalid node definition id '{}'",
                s
            )));
        }
        Ok(NodeDefinitionId {
            declaring_type: Name::from(parts[0]),
            child_name: Name::from(parts[1]),
            required_primary_types: parts[2]
                .split(',')
                .filter(|p| !p.is_empty())
                .map(Name::from)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub id: PropertyDefinitionId,
    pub required_type: PropertyType,
    pub multiple: bool,
    pub mandatory: bool,
    pub protected: bool,
}

impl PropertyDefinition {
    pub fn name(&self) -> &Name {
        &self.id.property_name
    }

    pub fn is_residual(&self) -> bool {
        self.id.property_name.is_residual()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
    pub id: NodeDefinitionId,
    pub default_primary_type: Option<Name>,
    pub allows_same_name_siblings: bool,
    pub mandatory: bool,
}

impl NodeDefinition {
    pub fn name(&self) -> &Name {
        &self.id.child_name
    }

    pub fn is_residual(&self) -> bool {
        self.id.child_name.is_residual()
    }

    pub fn required_primary_types(&self) -> &[Name] {
        &self.id.required_primary_types
    }
}

/// A node type with its declared (not inherited) definitions
#[derive(Debug, Clone)]
pub struct NodeType {
    pub name: Name,
    pub supertypes: Vec<Name>,
    pub mixin: bool,
    pub property_definitions: Vec<PropertyDefinition>,
    pub child_node_definitions: Vec<NodeDefinition>,
}

impl NodeType {
    pub fn builder(name: Name) -> NodeTypeBuilder {
        NodeTypeBuilder {
            node_type: NodeType {
                name,
                supertypes: Vec::new(),
                mixin: false,
                property_definitions: Vec::new(),
                child_node_definitions: Vec::new(),
            },
        }
    }
}

/// Builds a `NodeType` whose definitions carry the type's name as declaring type
pub struct NodeTypeBuilder {
    node_type: NodeType,
}

impl NodeTypeBuilder {
    pub fn supertype(mut self, name: Name) -> Self {
        self.node_type.supertypes.push(name);
        self
    }

    pub fn mixin(mut self) -> Self {
        self.node_type.mixin = true;
        self
    }

    fn add_property(
        mut self,
        name: Name,
        required_type: PropertyType,
        multiple: bool,
        mandatory: bool,
        protected: bool,
    ) -> Self {
        let id = PropertyDefinitionId {
            declaring_type: self.node_type.name.clone(),
            property_name: name,
            property_type: required_type,
            multiple,
        };
        self.node_type.property_definitions.push(PropertyDefinition {
            id,
            required_type,
            multiple,
            mandatory,
            protected,
        });
        self
    }

    pub fn property(self, name: Name, required_type: PropertyType) -> Self {
        self.add_property(name, required_type, false, false, false)
    }

    pub fn multi_property(self, name: Name, required_type: PropertyType) -> Self {
        self.add_property(name, required_type, true, false, false)
    }

    pub fn protected_property(self, name: Name, required_type: PropertyType, multiple: bool) -> Self {
        self.add_property(name, required_type, multiple, true, true)
    }

    pub fn child(
        mut self,
        name: Name,
        required_primary_types: Vec<Name>,
        default_primary_type: Option<Name>,
        allows_same_name_siblings: bool,
    ) -> Self {
        let id = NodeDefinitionId {
            declaring_type: self.node_type.name.clone(),
            child_name: name,
            required_primary_types,
        };
        self.node_type.child_node_definitions.push(NodeDefinition {
            id,
            default_primary_type,
            allows_same_name_siblings,
            mandatory: false,
        });
        self
    }

    pub fn build(self) -> NodeType {
        self.node_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_definition_id_string_form() {
        let id = PropertyDefinitionId {
            declaring_type: Name::from("nt:unstructured"),
            property_name: Name::from("*"),
            property_type: PropertyType::Undefined,
            multiple: true,
        };
        assert_eq!(id.to_string(), "nt:unstructured/*/Undefined*");
        assert_eq!(id.to_string().parse::<PropertyDefinitionId>().unwrap(), id);
    }

    #[test]
    fn test_node_definition_id_string_form() {
        let id = NodeDefinitionId {
            declaring_type: Name::from("nt:folder"),
            child_name: Name::from("*"),
            required_primary_types: vec![Name::from("nt:hierarchyNode")],
        };
        assert_eq!(id.to_string(), "nt:folder/*/nt:hierarchyNode");
        assert_eq!(id.to_string().parse::<NodeDefinitionId>().unwrap(), id);
        assert!("bogus".parse::<NodeDefinitionId>().is_err());
    }

    #[test]
    fn test_builder_sets_declaring_type() {
        let ty = NodeType::builder(Name::from("test:type"))
            .property(Name::from("p"), PropertyType::String)
            .build();
        assert_eq!(
            ty.property_definitions[0].id.declaring_type,
            Name::from("test:type")
        );
    }
}
