//! In-memory graph engine
//!
//! Nodes and relationships live in ordered maps with per-node adjacency
//! lists, as the access layer expects from a native engine. Transactions are
//! whole-state snapshots: `begin` clones the committed state and `rollback`
//! restores it. Only one transaction may be open at a time.

use super::index_store::{ranked, Hits, IndexStore};
use super::query::parse_query;
use super::record::{NodeRecord, RelationshipRecord};
use super::snapshot;
use super::{
    BackendError, BackendResult, CursorId, GraphBackend, IndexConfig, RelationshipInfo, TxId,
};
use crate::config::GraphConfig;
use crate::graph::{
    Direction, EntityKind, EntityRef, NodeId, PropertyMap, PropertyValue, RelationshipId,
    RelationshipType,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything a transaction can change, and everything a snapshot persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    nodes: BTreeMap<NodeId, NodeRecord>,
    relationships: BTreeMap<RelationshipId, RelationshipRecord>,
    /// Outgoing relationships per node (adjacency list)
    outgoing: BTreeMap<NodeId, Vec<RelationshipId>>,
    /// Incoming relationships per node (adjacency list)
    incoming: BTreeMap<NodeId, Vec<RelationshipId>>,
    node_indexes: BTreeMap<String, IndexStore>,
    relationship_indexes: BTreeMap<String, IndexStore>,
    next_node_id: u64,
    next_relationship_id: u64,
    next_tx_id: u64,
}

impl StoreState {
    fn with_reference_node() -> Self {
        let mut state = StoreState::default();
        let root = NodeId::new(0);
        state.nodes.insert(root, NodeRecord::new(root));
        state.next_node_id = 1;
        state
    }

    fn indexes(&self, kind: EntityKind) -> &BTreeMap<String, IndexStore> {
        match kind {
            EntityKind::Node => &self.node_indexes,
            EntityKind::Relationship => &self.relationship_indexes,
        }
    }

    fn indexes_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<String, IndexStore> {
        match kind {
            EntityKind::Node => &mut self.node_indexes,
            EntityKind::Relationship => &mut self.relationship_indexes,
        }
    }
}

struct OpenTransaction {
    id: TxId,
    /// Committed state to restore on rollback
    before: StoreState,
}

struct Cursor {
    hits: Vec<(u64, f32)>,
    position: usize,
}

/// In-memory graph engine
pub struct GraphStore {
    state: StoreState,
    tx: Option<OpenTransaction>,
    cursors: FxHashMap<CursorId, Cursor>,
    next_cursor_id: u64,
    store_dir: Option<PathBuf>,
    compress: bool,
    sync_on_commit: bool,
}

impl GraphStore {
    /// Create a new empty store holding only the reference node
    pub fn new() -> Self {
        GraphStore {
            state: StoreState::with_reference_node(),
            tx: None,
            cursors: FxHashMap::default(),
            next_cursor_id: 1,
            store_dir: None,
            compress: true,
            sync_on_commit: false,
        }
    }

    /// Open a store as configured, loading an existing snapshot
    pub fn open(config: &GraphConfig) -> BackendResult<Self> {
        let mut store = GraphStore::new();
        store.compress = config.compress_snapshots;
        store.sync_on_commit = config.sync_on_commit;

        if let Some(dir) = &config.store_dir {
            std::fs::create_dir_all(dir)?;
            let path = snapshot::snapshot_path(dir);
            if path.exists() {
                store.state = snapshot::read_snapshot(&path)?;
                info!(
                    path = %path.display(),
                    nodes = store.state.nodes.len(),
                    relationships = store.state.relationships.len(),
                    "Loaded graph snapshot"
                );
            }
            store.store_dir = Some(dir.clone());
        }
        Ok(store)
    }

    pub fn store_dir(&self) -> Option<&Path> {
        self.store_dir.as_deref()
    }

    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state.relationships.len()
    }

    fn require_tx(&self) -> BackendResult<()> {
        match self.tx {
            Some(_) => Ok(()),
            None => Err(BackendError::NotInTransaction),
        }
    }

    fn check_tx(&self, tx: TxId) -> BackendResult<()> {
        match &self.tx {
            Some(open) if open.id == tx => Ok(()),
            _ => Err(BackendError::UnknownTransaction(tx)),
        }
    }

    fn relationship(&self, id: RelationshipId) -> BackendResult<&RelationshipRecord> {
        self.state
            .relationships
            .get(&id)
            .ok_or(BackendError::RelationshipNotFound(id))
    }

    fn require_node(&self, id: NodeId) -> BackendResult<()> {
        if self.state.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(BackendError::NodeNotFound(id))
        }
    }

    fn properties(&self, entity: EntityRef) -> BackendResult<&PropertyMap> {
        match entity {
            EntityRef::Node(id) => self
                .state
                .nodes
                .get(&id)
                .map(|n| &n.properties)
                .ok_or(BackendError::NodeNotFound(id)),
            EntityRef::Relationship(id) => self.relationship(id).map(|r| &r.properties),
        }
    }

    fn properties_mut(&mut self, entity: EntityRef) -> BackendResult<&mut PropertyMap> {
        match entity {
            EntityRef::Node(id) => {
                let node = self
                    .state
                    .nodes
                    .get_mut(&id)
                    .ok_or(BackendError::NodeNotFound(id))?;
                Ok(&mut node.properties)
            }
            EntityRef::Relationship(id) => {
                let rel = self
                    .state
                    .relationships
                    .get_mut(&id)
                    .ok_or(BackendError::RelationshipNotFound(id))?;
                Ok(&mut rel.properties)
            }
        }
    }

    /// Matching relationships in adjacency order, a self-loop reported once
    fn matching(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[RelationshipType],
    ) -> BackendResult<Vec<RelationshipId>> {
        self.require_node(node)?;
        let empty = Vec::new();
        let outgoing = self.state.outgoing.get(&node).unwrap_or(&empty);
        let incoming = self.state.incoming.get(&node).unwrap_or(&empty);

        let candidates: Vec<RelationshipId> = match direction {
            Direction::Outgoing => outgoing.clone(),
            Direction::Incoming => incoming.clone(),
            Direction::Both => {
                let mut all = outgoing.clone();
                all.extend(incoming.iter().filter(|id| !outgoing.contains(*id)));
                all
            }
        };

        Ok(candidates
            .into_iter()
            .filter(|id| {
                types.is_empty()
                    || self
                        .state
                        .relationships
                        .get(id)
                        .is_some_and(|rel| types.contains(&rel.rel_type))
            })
            .collect())
    }

    fn index(&self, kind: EntityKind, name: &str) -> BackendResult<&IndexStore> {
        self.state
            .indexes(kind)
            .get(name)
            .ok_or_else(|| BackendError::IndexMissing(name.to_string()))
    }

    fn index_mut(&mut self, kind: EntityKind, name: &str) -> BackendResult<&mut IndexStore> {
        self.state
            .indexes_mut(kind)
            .get_mut(name)
            .ok_or_else(|| BackendError::IndexMissing(name.to_string()))
    }

    /// Drop index entries of a deleted entity from every index of its kind
    fn purge_index_entries(&mut self, entity: EntityRef) {
        for index in self.state.indexes_mut(entity.kind()).values_mut() {
            index.remove(entity.raw_id(), None, None);
        }
    }

    fn open_cursor(&mut self, hits: Hits) -> CursorId {
        let id = CursorId(self.next_cursor_id);
        self.next_cursor_id += 1;
        self.cursors.insert(
            id,
            Cursor {
                hits: ranked(hits),
                position: 0,
            },
        );
        id
    }

    fn write_snapshot(&self) -> BackendResult<()> {
        if let Some(dir) = &self.store_dir {
            let path = snapshot::snapshot_path(dir);
            snapshot::write_snapshot(&path, &self.state, self.compress)?;
            info!(path = %path.display(), "Wrote graph snapshot");
        }
        Ok(())
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBackend for GraphStore {
    fn begin_transaction(&mut self) -> BackendResult<TxId> {
        if let Some(open) = &self.tx {
            return Err(BackendError::TransactionConflict(open.id));
        }
        self.state.next_tx_id += 1;
        let id = TxId(self.state.next_tx_id);
        self.tx = Some(OpenTransaction {
            id,
            before: self.state.clone(),
        });
        debug!(tx = %id, "Transaction started");
        Ok(id)
    }

    fn commit_transaction(&mut self, tx: TxId) -> BackendResult<()> {
        self.check_tx(tx)?;
        self.tx = None;
        debug!(tx = %tx, "Transaction committed");
        if self.sync_on_commit {
            self.write_snapshot()?;
        }
        Ok(())
    }

    fn rollback_transaction(&mut self, tx: TxId) -> BackendResult<()> {
        self.check_tx(tx)?;
        if let Some(open) = self.tx.take() {
            // Keep transaction ids monotonic across rollbacks.
            let next_tx_id = self.state.next_tx_id;
            self.state = open.before;
            self.state.next_tx_id = next_tx_id;
        }
        debug!(tx = %tx, "Transaction rolled back");
        Ok(())
    }

    fn active_transaction(&self) -> Option<TxId> {
        self.tx.as_ref().map(|open| open.id)
    }

    fn reference_node(&self) -> NodeId {
        NodeId::new(0)
    }

    fn create_node(&mut self) -> BackendResult<NodeId> {
        self.require_tx()?;
        let id = NodeId::new(self.state.next_node_id);
        self.state.next_node_id += 1;
        self.state.nodes.insert(id, NodeRecord::new(id));
        Ok(id)
    }

    fn node_exists(&self, id: NodeId) -> bool {
        self.state.nodes.contains_key(&id)
    }

    fn delete_node(&mut self, id: NodeId) -> BackendResult<()> {
        self.require_tx()?;
        self.require_node(id)?;
        let attached = |adj: &BTreeMap<NodeId, Vec<RelationshipId>>| {
            adj.get(&id).is_some_and(|rels| !rels.is_empty())
        };
        if attached(&self.state.outgoing) || attached(&self.state.incoming) {
            return Err(BackendError::NodeHasRelationships(id));
        }
        self.state.nodes.remove(&id);
        self.state.outgoing.remove(&id);
        self.state.incoming.remove(&id);
        self.purge_index_entries(EntityRef::Node(id));
        Ok(())
    }

    fn all_nodes(&self) -> Vec<NodeId> {
        self.state.nodes.keys().copied().collect()
    }

    fn create_relationship(
        &mut self,
        start: NodeId,
        end: NodeId,
        rel_type: &RelationshipType,
    ) -> BackendResult<RelationshipId> {
        self.require_tx()?;
        self.require_node(start)?;
        self.require_node(end)?;

        let id = RelationshipId::new(self.state.next_relationship_id);
        self.state.next_relationship_id += 1;
        self.state
            .relationships
            .insert(id, RelationshipRecord::new(id, start, end, rel_type.clone()));
        self.state.outgoing.entry(start).or_default().push(id);
        self.state.incoming.entry(end).or_default().push(id);
        Ok(id)
    }

    fn relationship_exists(&self, id: RelationshipId) -> bool {
        self.state.relationships.contains_key(&id)
    }

    fn relationship_info(&self, id: RelationshipId) -> BackendResult<RelationshipInfo> {
        let rel = self.relationship(id)?;
        Ok(RelationshipInfo {
            start: rel.start,
            end: rel.end,
            rel_type: rel.rel_type.clone(),
        })
    }

    fn delete_relationship(&mut self, id: RelationshipId) -> BackendResult<()> {
        self.require_tx()?;
        let rel = self
            .state
            .relationships
            .remove(&id)
            .ok_or(BackendError::RelationshipNotFound(id))?;

        if let Some(adj) = self.state.outgoing.get_mut(&rel.start) {
            adj.retain(|&rid| rid != id);
        }
        if let Some(adj) = self.state.incoming.get_mut(&rel.end) {
            adj.retain(|&rid| rid != id);
        }
        self.purge_index_entries(EntityRef::Relationship(id));
        Ok(())
    }

    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[RelationshipType],
    ) -> BackendResult<Vec<RelationshipId>> {
        self.matching(node, direction, types)
    }

    fn has_relationship(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[RelationshipType],
    ) -> BackendResult<bool> {
        Ok(!self.matching(node, direction, types)?.is_empty())
    }

    fn single_relationship(
        &self,
        node: NodeId,
        rel_type: &RelationshipType,
        direction: Direction,
    ) -> BackendResult<Option<RelationshipId>> {
        let found = self.matching(node, direction, std::slice::from_ref(rel_type))?;
        match found.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(BackendError::MoreThanOneRelationship {
                node,
                rel_type: rel_type.clone(),
            }),
        }
    }

    fn relationship_types(&self) -> Vec<RelationshipType> {
        let types: BTreeSet<&RelationshipType> = self
            .state
            .relationships
            .values()
            .map(|rel| &rel.rel_type)
            .collect();
        types.into_iter().cloned().collect()
    }

    fn get_property(&self, entity: EntityRef, key: &str) -> BackendResult<Option<PropertyValue>> {
        Ok(self.properties(entity)?.get(key).cloned())
    }

    fn set_property(
        &mut self,
        entity: EntityRef,
        key: &str,
        value: PropertyValue,
    ) -> BackendResult<()> {
        self.require_tx()?;
        if !value.is_storable() {
            return Err(BackendError::UnsupportedValue {
                key: key.to_string(),
                type_name: value.type_name().to_string(),
            });
        }
        self.properties_mut(entity)?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_property(
        &mut self,
        entity: EntityRef,
        key: &str,
    ) -> BackendResult<Option<PropertyValue>> {
        self.require_tx()?;
        Ok(self.properties_mut(entity)?.shift_remove(key))
    }

    fn property_keys(&self, entity: EntityRef) -> BackendResult<Vec<String>> {
        Ok(self.properties(entity)?.keys().cloned().collect())
    }

    fn index_exists(&self, kind: EntityKind, name: &str) -> bool {
        self.state.indexes(kind).contains_key(name)
    }

    fn index_names(&self, kind: EntityKind) -> Vec<String> {
        self.state.indexes(kind).keys().cloned().collect()
    }

    fn create_index(
        &mut self,
        kind: EntityKind,
        name: &str,
        config: IndexConfig,
    ) -> BackendResult<()> {
        self.require_tx()?;
        if self.index_exists(kind, name) {
            return Err(BackendError::IndexExists(name.to_string()));
        }
        debug!(index = name, %kind, index_type = config.type_name(), "Created index");
        self.state
            .indexes_mut(kind)
            .insert(name.to_string(), IndexStore::new(config));
        Ok(())
    }

    fn index_config(&self, kind: EntityKind, name: &str) -> BackendResult<IndexConfig> {
        Ok(self.index(kind, name)?.config().clone())
    }

    fn delete_index(&mut self, kind: EntityKind, name: &str) -> BackendResult<()> {
        self.require_tx()?;
        self.state
            .indexes_mut(kind)
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::IndexMissing(name.to_string()))
    }

    fn index_add(
        &mut self,
        name: &str,
        entity: EntityRef,
        key: &str,
        value: &PropertyValue,
    ) -> BackendResult<()> {
        self.require_tx()?;
        let exists = match entity {
            EntityRef::Node(id) => self.node_exists(id),
            EntityRef::Relationship(id) => self.relationship_exists(id),
        };
        if !exists {
            return Err(match entity {
                EntityRef::Node(id) => BackendError::NodeNotFound(id),
                EntityRef::Relationship(id) => BackendError::RelationshipNotFound(id),
            });
        }
        if !value.is_storable() {
            return Err(BackendError::UnsupportedValue {
                key: key.to_string(),
                type_name: value.type_name().to_string(),
            });
        }
        self.index_mut(entity.kind(), name)?
            .insert(entity.raw_id(), key, value.index_term());
        Ok(())
    }

    fn index_remove(
        &mut self,
        name: &str,
        entity: EntityRef,
        key: Option<&str>,
        value: Option<&PropertyValue>,
    ) -> BackendResult<()> {
        self.require_tx()?;
        let term = value.map(PropertyValue::index_term);
        self.index_mut(entity.kind(), name)?
            .remove(entity.raw_id(), key, term.as_deref());
        Ok(())
    }

    fn index_get(
        &mut self,
        kind: EntityKind,
        name: &str,
        key: &str,
        value: &PropertyValue,
    ) -> BackendResult<CursorId> {
        let hits = self.index(kind, name)?.get(key, &value.index_term());
        Ok(self.open_cursor(hits))
    }

    fn index_query(
        &mut self,
        kind: EntityKind,
        name: &str,
        expression: &str,
    ) -> BackendResult<CursorId> {
        let index = self.index(kind, name)?;
        let expr = parse_query(expression)?;
        let hits = index.eval(&expr);
        Ok(self.open_cursor(hits))
    }

    fn index_query_field(
        &mut self,
        kind: EntityKind,
        name: &str,
        key: &str,
        value: &str,
    ) -> BackendResult<CursorId> {
        let hits = self.index(kind, name)?.query_field(key, value);
        Ok(self.open_cursor(hits))
    }

    fn cursor_size(&self, cursor: CursorId) -> BackendResult<usize> {
        self.cursors
            .get(&cursor)
            .map(|c| c.hits.len())
            .ok_or(BackendError::UnknownCursor(cursor))
    }

    fn cursor_next(&mut self, cursor: CursorId) -> BackendResult<Option<(u64, f32)>> {
        let open = self
            .cursors
            .get_mut(&cursor)
            .ok_or(BackendError::UnknownCursor(cursor))?;
        let hit = open.hits.get(open.position).copied();
        if hit.is_some() {
            open.position += 1;
        }
        Ok(hit)
    }

    fn cursor_close(&mut self, cursor: CursorId) -> BackendResult<()> {
        self.cursors
            .remove(&cursor)
            .map(|_| ())
            .ok_or(BackendError::UnknownCursor(cursor))
    }

    fn open_cursor_count(&self) -> usize {
        self.cursors.len()
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.write_snapshot()
    }

    fn shutdown(&mut self) -> BackendResult<()> {
        if let Some(open) = &self.tx {
            let id = open.id;
            warn!(tx = %id, "Shutting down with an open transaction; rolling back");
            self.rollback_transaction(id)?;
        }
        if !self.cursors.is_empty() {
            warn!(open = self.cursors.len(), "Closing cursors left open at shutdown");
            self.cursors.clear();
        }
        self.write_snapshot()
    }
}
