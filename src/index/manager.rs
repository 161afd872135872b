//! Manager for named indices
//!
//! Handles creation, deletion, and access to the engine's named indices for
//! one entity kind. An [`Index`] adds and removes `(entity, key, value)`
//! entries and runs exact or full-text queries returning [`IndexHits`].

use super::hits::IndexHits;
use crate::backend::IndexConfig;
use crate::error::{GraphError, GraphResult};
use crate::graph::{GraphDatabase, IndexedEntity, PropertyContainer, PropertyValue};
use std::marker::PhantomData;
use tracing::debug;

/// Manager for all indices of one entity kind
#[derive(Clone)]
pub struct IndexManager<T: IndexedEntity> {
    db: GraphDatabase,
    _entity: PhantomData<T>,
}

impl<T: IndexedEntity> IndexManager<T> {
    pub fn new(db: GraphDatabase) -> Self {
        IndexManager {
            db,
            _entity: PhantomData,
        }
    }

    /// Create an index with the configured default provider
    pub fn create(&self, name: &str, fulltext: bool) -> GraphResult<Index<T>> {
        let provider = self.db.config().index_provider.clone();
        self.create_with_provider(name, fulltext, &provider)
    }

    /// Create an index; fails with `IndexAlreadyExists` if the name is taken
    pub fn create_with_provider(
        &self,
        name: &str,
        fulltext: bool,
        provider: &str,
    ) -> GraphResult<Index<T>> {
        if self.contains(name)? {
            return Err(GraphError::IndexAlreadyExists(name.to_string()));
        }
        let config = if fulltext {
            IndexConfig::fulltext(provider)
        } else {
            IndexConfig::exact(provider)
        };
        self.db
            .transaction(|_| self.db.write(|b| b.create_index(T::KIND, name, config)))?;
        debug!(index = name, kind = %T::KIND, fulltext, "Index created");
        Ok(Index::new(self.db.clone(), name))
    }

    /// The named index, created if missing
    pub fn get_or_create(&self, name: &str, fulltext: bool) -> GraphResult<Index<T>> {
        if self.contains(name)? {
            Ok(Index::new(self.db.clone(), name))
        } else {
            self.create(name, fulltext)
        }
    }

    /// The named index; `IndexNotFound` if absent
    pub fn get(&self, name: &str) -> GraphResult<Index<T>> {
        if self.contains(name)? {
            Ok(Index::new(self.db.clone(), name))
        } else {
            Err(GraphError::IndexNotFound(name.to_string()))
        }
    }

    pub fn contains(&self, name: &str) -> GraphResult<bool> {
        self.db.read(|b| Ok(b.index_exists(T::KIND, name)))
    }

    pub fn names(&self) -> GraphResult<Vec<String>> {
        self.db.read(|b| Ok(b.index_names(T::KIND)))
    }

    /// Every index of this kind
    pub fn iter(&self) -> GraphResult<Vec<Index<T>>> {
        Ok(self
            .names()?
            .iter()
            .map(|name| Index::new(self.db.clone(), name))
            .collect())
    }
}

/// Handle to one named index
#[derive(Clone)]
pub struct Index<T: IndexedEntity> {
    db: GraphDatabase,
    name: String,
    _entity: PhantomData<T>,
}

impl<T: IndexedEntity> Index<T> {
    fn new(db: GraphDatabase, name: &str) -> Self {
        Index {
            db,
            name: name.to_string(),
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> GraphResult<IndexConfig> {
        self.db.read(|b| b.index_config(T::KIND, &self.name))
    }

    pub fn is_fulltext(&self) -> GraphResult<bool> {
        Ok(self.config()?.fulltext)
    }

    fn check_kind(&self, entity: &impl PropertyContainer) -> GraphResult<()> {
        let found = entity.entity_ref();
        if found.kind() == T::KIND {
            Ok(())
        } else {
            Err(GraphError::EntityKindMismatch {
                entity: found.to_string(),
                expected: T::KIND,
                actual: found.kind(),
            })
        }
    }

    /// Index `entity` under `key`/`value`
    pub fn add(
        &self,
        entity: &impl PropertyContainer,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        self.check_kind(entity)?;
        let target = entity.entity_ref();
        let value = value.into();
        self.db.transaction(|_| {
            self.db
                .write(|b| b.index_add(&self.name, target, key, &value))
        })?;
        debug!(index = %self.name, entity = %target, key, value = %value, "Index entry added");
        Ok(())
    }

    /// Remove entries of `entity`: all of them, those under `key`, or exactly `key`/`value`
    pub fn remove(
        &self,
        entity: &impl PropertyContainer,
        key: Option<&str>,
        value: Option<&PropertyValue>,
    ) -> GraphResult<()> {
        self.check_kind(entity)?;
        let target = entity.entity_ref();
        self.db.transaction(|_| {
            self.db
                .write(|b| b.index_remove(&self.name, target, key, value))
        })?;
        debug!(index = %self.name, entity = %target, ?key, "Index entries removed");
        Ok(())
    }

    /// Entities indexed under exactly `key`/`value`
    pub fn get(&self, key: &str, value: impl Into<PropertyValue>) -> GraphResult<IndexHits<T>> {
        let value = value.into();
        let cursor = self
            .db
            .write(|b| b.index_get(T::KIND, &self.name, key, &value))?;
        IndexHits::open(self.db.clone(), cursor)
    }

    /// Run a query expression such as `lifeform:herb AND NOT region:europe`
    pub fn query(&self, expression: &str) -> GraphResult<IndexHits<T>> {
        let cursor = self
            .db
            .write(|b| b.index_query(T::KIND, &self.name, expression))?;
        IndexHits::open(self.db.clone(), cursor)
    }

    /// Query one key; a trailing `*` on `value` asks for a prefix match
    pub fn simple_query(&self, key: &str, value: &str) -> GraphResult<IndexHits<T>> {
        let cursor = self
            .db
            .write(|b| b.index_query_field(T::KIND, &self.name, key, value))?;
        IndexHits::open(self.db.clone(), cursor)
    }

    /// Drop the index and all its entries
    pub fn delete(self) -> GraphResult<()> {
        self.db
            .transaction(|_| self.db.write(|b| b.delete_index(T::KIND, &self.name)))?;
        debug!(index = %self.name, "Index deleted");
        Ok(())
    }
}

impl<T: IndexedEntity> std::fmt::Debug for Index<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Entity, Node, Relationship};

    #[test]
    fn test_create_and_lookup() {
        let db = GraphDatabase::in_memory();
        let indexes = db.node_indexes();
        assert!(matches!(indexes.get("people"), Err(GraphError::IndexNotFound(_))));

        let index = indexes.create("people", false).unwrap();
        assert_eq!(index.name(), "people");
        assert_eq!(index.config().unwrap(), IndexConfig::exact("default"));
        assert!(indexes.contains("people").unwrap());
        assert_eq!(indexes.names().unwrap(), vec!["people"]);
        assert!(!db.relationship_indexes().contains("people").unwrap());

        let again = indexes.get_or_create("people", true).unwrap();
        assert!(!again.is_fulltext().unwrap());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let db = GraphDatabase::in_memory();
        let indexes = db.node_indexes();
        let index = indexes.create("people", false).unwrap();
        let alice = db.create_node().unwrap();
        index.add(&alice, "name", "Alice").unwrap();

        assert!(matches!(
            indexes.create("people", true),
            Err(GraphError::IndexAlreadyExists(_))
        ));
        assert!(!index.is_fulltext().unwrap());
        assert_eq!(index.get("name", "Alice").unwrap().collect_all().unwrap().len(), 1);
        assert_eq!(db.open_cursor_count().unwrap(), 0);
    }

    #[test]
    fn test_entity_kind_checked() {
        let db = GraphDatabase::in_memory();
        let a = db.create_node().unwrap();
        let b = db.create_node().unwrap();
        let rel = a.relationships_named("KNOWS").create(&b).unwrap();

        let nodes = db.node_indexes().create("nodes", false).unwrap();
        let err = nodes.add(&Entity::from(rel.clone()), "k", "v").unwrap_err();
        assert!(matches!(
            err,
            GraphError::EntityKindMismatch { expected: crate::graph::EntityKind::Node, .. }
        ));

        let rels: Index<Relationship> = db.relationship_indexes().create("rels", false).unwrap();
        rels.add(&rel, "since", 2011).unwrap();
        assert!(rels.add(&a, "k", "v").is_err());
        let found: Vec<Relationship> = rels.get("since", 2011).unwrap().collect_all().unwrap();
        assert_eq!(found, vec![rel]);
    }

    #[test]
    fn test_remove_variants() {
        let db = GraphDatabase::in_memory();
        let index: Index<Node> = db.node_indexes().create("plants", false).unwrap();
        let node = db.create_node().unwrap();
        index.add(&node, "name", "Rose").unwrap();
        index.add(&node, "name", "Rosa").unwrap();
        index.add(&node, "colour", "red").unwrap();

        index
            .remove(&node, Some("name"), Some(&"Rose".into()))
            .unwrap();
        assert!(index.get("name", "Rose").unwrap().single().unwrap().is_none());
        assert!(index.get("name", "Rosa").unwrap().single().unwrap().is_some());

        index.remove(&node, Some("name"), None).unwrap();
        assert!(index.get("name", "Rosa").unwrap().collect_all().unwrap().is_empty());

        index.remove(&node, None, None).unwrap();
        assert!(index.get("colour", "red").unwrap().collect_all().unwrap().is_empty());
        index.remove(&node, None, None).unwrap();
    }

    #[test]
    fn test_delete_index() {
        let db = GraphDatabase::in_memory();
        let indexes = db.node_indexes();
        indexes.create("temp", true).unwrap().delete().unwrap();
        assert!(!indexes.contains("temp").unwrap());
        assert!(indexes.iter().unwrap().is_empty());
    }
}
