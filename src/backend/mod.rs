//! Engine contract consumed by the access layer
//!
//! The access layer never owns storage. Everything it needs from a native
//! graph engine is expressed by [`GraphBackend`]: entity and property
//! storage, typed relationship traversal, named secondary indices returning
//! engine-side cursors, and begin/commit/rollback transactions.
//!
//! [`GraphStore`] is an in-memory engine implementing the contract, with an
//! optional on-disk snapshot.

pub mod index_store;
pub mod memory;
pub mod query;
pub mod record;
pub mod snapshot;

pub use index_store::{tokenize, IndexStore};
pub use memory::GraphStore;
pub use query::{parse_query, QueryExpr};
pub use record::{NodeRecord, RelationshipRecord};

use crate::graph::{
    Direction, EntityKind, EntityRef, NodeId, PropertyValue, RelationshipId, RelationshipType,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Identifier of an engine transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.0)
    }
}

/// Identifier of an open index cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(pub u64);

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CursorId({})", self.0)
    }
}

/// Configuration an index is created with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Tokenized full-text matching instead of whole-term matching
    pub fulltext: bool,
    /// Index provider name, recorded verbatim
    pub provider: String,
}

impl IndexConfig {
    pub fn exact(provider: impl Into<String>) -> Self {
        IndexConfig {
            fulltext: false,
            provider: provider.into(),
        }
    }

    pub fn fulltext(provider: impl Into<String>) -> Self {
        IndexConfig {
            fulltext: true,
            provider: provider.into(),
        }
    }

    /// Index type name as the engine reports it
    pub fn type_name(&self) -> &'static str {
        if self.fulltext {
            "fulltext"
        } else {
            "exact"
        }
    }
}

/// Start, end and type of a stored relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    pub start: NodeId,
    pub end: NodeId,
    pub rel_type: RelationshipType,
}

/// Engine-native errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Relationship {0} not found")]
    RelationshipNotFound(RelationshipId),

    #[error("Node {0} still has relationships")]
    NodeHasRelationships(NodeId),

    #[error("Unsupported value of type {type_name} for key '{key}'")]
    UnsupportedValue { key: String, type_name: String },

    #[error("Index '{0}' already exists")]
    IndexExists(String),

    #[error("Index '{0}' not found")]
    IndexMissing(String),

    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    #[error("More than one {rel_type} relationship on {node}")]
    MoreThanOneRelationship {
        node: NodeId,
        rel_type: RelationshipType,
    },

    #[error("No transaction is open")]
    NotInTransaction,

    #[error("Transaction {0} is already open")]
    TransactionConflict(TxId),

    #[error("Unknown transaction {0}")]
    UnknownTransaction(TxId),

    #[error("Unknown cursor {0}")]
    UnknownCursor(CursorId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Operations a native graph engine provides
///
/// Writes require an open transaction. Index operations are namespaced per
/// entity kind: a node index and a relationship index may share a name.
pub trait GraphBackend: Send + Sync {
    // Transactions
    fn begin_transaction(&mut self) -> BackendResult<TxId>;
    fn commit_transaction(&mut self, tx: TxId) -> BackendResult<()>;
    fn rollback_transaction(&mut self, tx: TxId) -> BackendResult<()>;
    fn active_transaction(&self) -> Option<TxId>;

    // Nodes
    fn reference_node(&self) -> NodeId;
    fn create_node(&mut self) -> BackendResult<NodeId>;
    fn node_exists(&self, id: NodeId) -> bool;
    /// Fails with `NodeHasRelationships` while any relationship is attached
    fn delete_node(&mut self, id: NodeId) -> BackendResult<()>;
    fn all_nodes(&self) -> Vec<NodeId>;

    // Relationships
    fn create_relationship(
        &mut self,
        start: NodeId,
        end: NodeId,
        rel_type: &RelationshipType,
    ) -> BackendResult<RelationshipId>;
    fn relationship_exists(&self, id: RelationshipId) -> bool;
    fn relationship_info(&self, id: RelationshipId) -> BackendResult<RelationshipInfo>;
    fn delete_relationship(&mut self, id: RelationshipId) -> BackendResult<()>;
    /// Relationships of `node` in `direction`; an empty `types` slice means any type
    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[RelationshipType],
    ) -> BackendResult<Vec<RelationshipId>>;
    fn has_relationship(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[RelationshipType],
    ) -> BackendResult<bool>;
    /// The unique matching relationship, `None` if absent, an error if ambiguous
    fn single_relationship(
        &self,
        node: NodeId,
        rel_type: &RelationshipType,
        direction: Direction,
    ) -> BackendResult<Option<RelationshipId>>;
    fn relationship_types(&self) -> Vec<RelationshipType>;

    // Properties
    fn get_property(&self, entity: EntityRef, key: &str) -> BackendResult<Option<PropertyValue>>;
    fn set_property(
        &mut self,
        entity: EntityRef,
        key: &str,
        value: PropertyValue,
    ) -> BackendResult<()>;
    fn remove_property(&mut self, entity: EntityRef, key: &str)
        -> BackendResult<Option<PropertyValue>>;
    fn property_keys(&self, entity: EntityRef) -> BackendResult<Vec<String>>;

    // Indices
    fn index_exists(&self, kind: EntityKind, name: &str) -> bool;
    fn index_names(&self, kind: EntityKind) -> Vec<String>;
    fn create_index(&mut self, kind: EntityKind, name: &str, config: IndexConfig)
        -> BackendResult<()>;
    fn index_config(&self, kind: EntityKind, name: &str) -> BackendResult<IndexConfig>;
    fn delete_index(&mut self, kind: EntityKind, name: &str) -> BackendResult<()>;
    fn index_add(
        &mut self,
        name: &str,
        entity: EntityRef,
        key: &str,
        value: &PropertyValue,
    ) -> BackendResult<()>;
    /// Remove every entry of `entity`, or only those under `key`, or only `key`/`value`
    fn index_remove(
        &mut self,
        name: &str,
        entity: EntityRef,
        key: Option<&str>,
        value: Option<&PropertyValue>,
    ) -> BackendResult<()>;
    fn index_get(
        &mut self,
        kind: EntityKind,
        name: &str,
        key: &str,
        value: &PropertyValue,
    ) -> BackendResult<CursorId>;
    fn index_query(&mut self, kind: EntityKind, name: &str, expression: &str)
        -> BackendResult<CursorId>;
    fn index_query_field(
        &mut self,
        kind: EntityKind,
        name: &str,
        key: &str,
        value: &str,
    ) -> BackendResult<CursorId>;

    // Cursors
    fn cursor_size(&self, cursor: CursorId) -> BackendResult<usize>;
    /// Next hit as (raw entity id, score)
    fn cursor_next(&mut self, cursor: CursorId) -> BackendResult<Option<(u64, f32)>>;
    fn cursor_close(&mut self, cursor: CursorId) -> BackendResult<()>;
    fn open_cursor_count(&self) -> usize;

    // Lifecycle
    fn flush(&mut self) -> BackendResult<()>;
    fn shutdown(&mut self) -> BackendResult<()>;
}

/// Engine handle shared by every clone of a database handle
pub type SharedBackend = Arc<RwLock<dyn GraphBackend>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_config() {
        let exact = IndexConfig::exact("default");
        assert!(!exact.fulltext);
        assert_eq!(exact.type_name(), "exact");

        let fulltext = IndexConfig::fulltext("lucene");
        assert!(fulltext.fulltext);
        assert_eq!(fulltext.provider, "lucene");
        assert_eq!(fulltext.type_name(), "fulltext");
    }

    #[test]
    fn test_error_messages() {
        let err = BackendError::MoreThanOneRelationship {
            node: NodeId(4),
            rel_type: RelationshipType::new("KNOWS"),
        };
        assert_eq!(err.to_string(), "More than one KNOWS relationship on NodeId(4)");
        assert_eq!(
            BackendError::TransactionConflict(TxId(2)).to_string(),
            "Transaction TxId(2) is already open"
        );
    }
}
