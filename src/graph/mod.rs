//! Graph primitives over an engine
//!
//! - Nodes and relationships as property containers
//! - Directed, typed relationship traversal through relationship factories
//! - Reentrant transactions scoped to the calling thread
//! - The database handle tying them to one engine connection

pub mod database;
pub mod entity;
pub mod property;
pub mod relationships;
pub mod transaction;
pub mod types;

// Re-export main types
pub use database::GraphDatabase;
pub use entity::{Entity, IndexedEntity, Node, PropertyContainer, Relationship};
pub use property::{PropertyMap, PropertyValue};
pub use relationships::{AsNodeId, RelationshipFactory};
pub use transaction::Transaction;
pub use types::{
    DirectedRelationshipType, Direction, EntityKind, EntityRef, NodeId, RelationshipId,
    RelationshipType,
};
