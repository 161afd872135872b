//! Stored node and relationship records

use crate::graph::{NodeId, PropertyMap, RelationshipId, RelationshipType};
use serde::{Deserialize, Serialize};

/// A node as the engine stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub properties: PropertyMap,
}

impl NodeRecord {
    pub fn new(id: NodeId) -> Self {
        NodeRecord {
            id,
            properties: PropertyMap::new(),
        }
    }
}

/// A relationship as the engine stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub id: RelationshipId,
    pub start: NodeId,
    pub end: NodeId,
    pub rel_type: RelationshipType,
    pub properties: PropertyMap,
}

impl RelationshipRecord {
    pub fn new(id: RelationshipId, start: NodeId, end: NodeId, rel_type: RelationshipType) -> Self {
        RelationshipRecord {
            id,
            start,
            end,
            rel_type,
            properties: PropertyMap::new(),
        }
    }
}
