//! Identifier values for cached items.

use crate::path::Segment;
use crate::types::{Name, NodeUuid};
use std::fmt;

/// Identifies one property: owning node plus property name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyId {
    node_id: NodeUuid,
    property_name: Name,
}

impl PropertyId {
    pub fn new(node_id: NodeUuid, property_name: Name) -> Self {
        PropertyId {
            node_id,
            property_name,
        }
    }

    pub fn node_id(&self) -> NodeUuid {
        self.node_id
    }

    pub fn property_name(&self) -> &Name {
        &self.property_name
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node_id, self.property_name)
    }
}

/// One entry of a parent's children: identifier, name and SNS index
///
/// Immutable; renumbering produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildNode {
    uuid: NodeUuid,
    segment: Segment,
}

impl ChildNode {
    pub fn new(uuid: NodeUuid, name: Name, sns_index: usize) -> Self {
        ChildNode {
            uuid,
            segment: Segment::new(name, sns_index),
        }
    }

    pub fn uuid(&self) -> NodeUuid {
        self.uuid
    }

    pub fn name(&self) -> &Name {
        self.segment.name()
    }

    pub fn sns_index(&self) -> usize {
        self.segment.index()
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub(crate) fn with_sns_index(&self, sns_index: usize) -> ChildNode {
        ChildNode::new(self.uuid, self.name().clone(), sns_index)
    }
}
