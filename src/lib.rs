//! Samyama ORM
//!
//! A typed access layer over an embedded, transactional graph engine, with a
//! small object mapping layer on top.
//!
//! # Architecture
//!
//! - `backend`: the engine contract (`GraphBackend`) and `GraphStore`, an
//!   in-memory reference engine with exact and full-text indices and
//!   optional on-disk snapshots
//! - `graph`: nodes and relationships as property containers, relationship
//!   factories, reentrant transactions and the database handle
//! - `index`: named node and relationship indices and their hit cursors
//! - `model`: typed, validated, indexed model properties and the save
//!   protocol that keeps properties and index entries consistent
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_orm::graph::{GraphDatabase, PropertyContainer, PropertyValue};
//! use samyama_orm::model::{Model, ModelSchema, PropertyDefinition};
//!
//! let db = GraphDatabase::in_memory();
//!
//! // Plain graph access
//! let root = db.create_node().unwrap();
//! let leaf = db.node_with([("name", "leaf")]).unwrap();
//! root.relationships_named("HAS").outgoing().create(&leaf).unwrap();
//! assert_eq!(root.relationships_named("HAS").len().unwrap(), 1);
//!
//! // Models
//! let plant = ModelSchema::new("Plant")
//!     .field("name", PropertyDefinition::string().indexed())
//!     .field("height", PropertyDefinition::float().min(0.0).nullable())
//!     .build();
//! let plants = Model::objects(&db, &plant);
//! let rose = plants.create([("name", "Rose")]).unwrap();
//!
//! let found = plants.lookup("name", "Rose").unwrap();
//! assert_eq!(found[0].id(), rose.id());
//! assert_eq!(found[0].get("name").unwrap(), Some(PropertyValue::from("Rose")));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod logging;
pub mod model;

// Re-export main types for convenience
pub use backend::{GraphBackend, GraphStore, IndexConfig};
pub use config::GraphConfig;
pub use error::{GraphError, GraphResult, ValidationError};
pub use graph::{
    Direction, GraphDatabase, Node, NodeId, PropertyContainer, PropertyMap, PropertyValue,
    Relationship, RelationshipId, RelationshipType, Transaction,
};
pub use index::{Index, IndexHits, IndexManager};
pub use model::{Model, ModelSchema, PropertyDefinition, QuerySet};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
