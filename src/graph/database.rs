//! Database handle
//!
//! A [`GraphDatabase`] owns one connection to an engine and hands out
//! entities, index managers and transactions. Clones share the connection
//! and the active-transaction slot.

use super::entity::{Node, PropertyContainer, Relationship};
use super::transaction::{Transaction, TxInner};
use super::types::{NodeId, RelationshipId, RelationshipType};
use crate::backend::{BackendResult, GraphBackend, GraphStore, SharedBackend};
use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};
use crate::graph::PropertyValue;
use crate::index::IndexManager;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, info, warn};

pub(crate) struct DbInner {
    backend: SharedBackend,
    config: GraphConfig,
    running: AtomicBool,
    /// Active transaction per calling thread
    active: Mutex<HashMap<ThreadId, Weak<TxInner>>>,
}

impl Drop for DbInner {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let result = match self.backend.write() {
                Ok(mut backend) => backend.shutdown(),
                Err(poisoned) => poisoned.into_inner().shutdown(),
            };
            if let Err(e) = result {
                warn!(error = %e, "Engine shutdown failed while dropping database handle");
            }
        }
    }
}

/// Handle to a graph database
#[derive(Clone)]
pub struct GraphDatabase {
    inner: Arc<DbInner>,
}

impl GraphDatabase {
    /// Open the built-in engine as configured
    pub fn open(config: GraphConfig) -> GraphResult<Self> {
        let store = GraphStore::open(&config)?;
        match &config.store_dir {
            Some(dir) => info!(store_dir = %dir.display(), "Opened graph database"),
            None => info!("Opened in-memory graph database"),
        }
        Ok(Self::with_backend(store, config))
    }

    /// Open a fresh in-memory database
    pub fn in_memory() -> Self {
        Self::with_backend(GraphStore::new(), GraphConfig::in_memory())
    }

    /// Open a database on the snapshot in `dir`
    pub fn open_dir(dir: impl AsRef<Path>) -> GraphResult<Self> {
        Self::open(GraphConfig::with_store_dir(dir))
    }

    /// Wrap any engine implementing [`GraphBackend`]
    pub fn with_backend(backend: impl GraphBackend + 'static, config: GraphConfig) -> Self {
        let backend: SharedBackend = Arc::new(RwLock::new(backend));
        GraphDatabase {
            inner: Arc::new(DbInner {
                backend,
                config,
                running: AtomicBool::new(true),
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    pub fn store_dir(&self) -> Option<&Path> {
        self.inner.config.store_dir.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Same underlying connection
    pub fn same_as(&self, other: &GraphDatabase) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_running(&self) -> GraphResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(GraphError::ShutDown)
        }
    }

    /// Run a read-only engine call
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&dyn GraphBackend) -> BackendResult<T>,
    ) -> GraphResult<T> {
        self.ensure_running()?;
        let backend = self
            .inner
            .backend
            .read()
            .map_err(|_| GraphError::Storage("engine lock poisoned".to_string()))?;
        Ok(f(&*backend)?)
    }

    /// Run a mutating engine call
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&mut dyn GraphBackend) -> BackendResult<T>,
    ) -> GraphResult<T> {
        self.ensure_running()?;
        let mut backend = self
            .inner
            .backend
            .write()
            .map_err(|_| GraphError::Storage("engine lock poisoned".to_string()))?;
        Ok(f(&mut *backend)?)
    }

    fn slots(&self) -> GraphResult<std::sync::MutexGuard<'_, HashMap<ThreadId, Weak<TxInner>>>> {
        self.inner
            .active
            .lock()
            .map_err(|_| GraphError::Storage("transaction slot lock poisoned".to_string()))
    }

    /// The calling thread's transaction, beginning one if none is active.
    ///
    /// Returns `(transaction, created)`. When `created` is true the caller
    /// owns the transaction and must finish it; otherwise it shares an outer
    /// transaction and may neither mark nor finish it.
    pub fn get_or_begin_transaction(&self) -> GraphResult<(Transaction, bool)> {
        self.ensure_running()?;
        let thread = thread::current().id();
        let mut slots = self.slots()?;

        if let Some(active) = slots.get(&thread).and_then(Weak::upgrade) {
            if !active.is_finished() {
                return Ok((Transaction::shared(active), false));
            }
        }

        let id = self.write(|b| b.begin_transaction())?;
        let inner = Arc::new(TxInner::new(self.clone(), id));
        slots.insert(thread, Arc::downgrade(&inner));
        Ok((Transaction::owned(inner), true))
    }

    /// Run `f` inside the calling thread's transaction.
    ///
    /// If this call began the transaction it also finishes it: committing
    /// when `f` succeeds (unless `f` marked it failed) and rolling back when
    /// `f` fails, even if `f` had marked it successful. Nested calls join the
    /// outer transaction. A panic in `f` rolls back when the handle drops.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction) -> GraphResult<T>) -> GraphResult<T> {
        let (tx, created) = self.get_or_begin_transaction()?;
        let result = f(&tx);
        if !created || tx.is_finished() {
            return result;
        }
        match result {
            Ok(value) => {
                tx.finish(true)?;
                Ok(value)
            }
            Err(e) => {
                let rollback = tx.mark_failure().and_then(|_| tx.finish(false));
                if let Err(finish_err) = rollback {
                    warn!(error = %finish_err, "Rollback after failed transaction scope failed");
                }
                Err(e)
            }
        }
    }

    /// Clear the slot of the thread that began `tx`
    pub(crate) fn release_slot(&self, tx: &TxInner) {
        if let Ok(mut slots) = self.inner.active.lock() {
            let current = slots
                .get(&tx.thread())
                .is_some_and(|w| std::ptr::eq(w.as_ptr(), tx));
            if current {
                slots.remove(&tx.thread());
            }
            slots.retain(|_, w| w.strong_count() > 0);
        }
    }

    /// The well-known root node
    pub fn reference_node(&self) -> GraphResult<Node> {
        let id = self.read(|b| Ok(b.reference_node()))?;
        Ok(Node::new(id, self.clone()))
    }

    /// Create a node
    pub fn create_node(&self) -> GraphResult<Node> {
        self.transaction(|_| {
            let id = self.write(|b| b.create_node())?;
            debug!(node = %id, "Created node");
            Ok(Node::new(id, self.clone()))
        })
    }

    /// Create a node with initial properties, in one transaction
    pub fn node_with<I, K, V>(&self, properties: I) -> GraphResult<Node>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.transaction(|_| {
            let node = self.create_node()?;
            node.update(properties)?;
            Ok(node)
        })
    }

    pub fn node_by_id(&self, id: impl Into<NodeId>) -> GraphResult<Node> {
        let id = id.into();
        if self.read(|b| Ok(b.node_exists(id)))? {
            Ok(Node::new(id, self.clone()))
        } else {
            Err(GraphError::NodeNotFound(id))
        }
    }

    pub fn relationship_by_id(&self, id: impl Into<RelationshipId>) -> GraphResult<Relationship> {
        let id = id.into();
        if self.read(|b| Ok(b.relationship_exists(id)))? {
            Ok(Relationship::new(id, self.clone()))
        } else {
            Err(GraphError::RelationshipNotFound(id))
        }
    }

    /// Every node, the reference node included
    pub fn nodes(&self) -> GraphResult<Vec<Node>> {
        let ids = self.read(|b| Ok(b.all_nodes()))?;
        Ok(ids.into_iter().map(|id| Node::new(id, self.clone())).collect())
    }

    /// Relationship types in use
    pub fn relationship_types(&self) -> GraphResult<Vec<RelationshipType>> {
        self.read(|b| Ok(b.relationship_types()))
    }

    pub fn node_indexes(&self) -> IndexManager<Node> {
        IndexManager::new(self.clone())
    }

    pub fn relationship_indexes(&self) -> IndexManager<Relationship> {
        IndexManager::new(self.clone())
    }

    /// Open index cursors held by the engine
    pub fn open_cursor_count(&self) -> GraphResult<usize> {
        self.read(|b| Ok(b.open_cursor_count()))
    }

    /// Persist committed state if the engine has a store directory
    pub fn flush(&self) -> GraphResult<()> {
        self.write(|b| b.flush())
    }

    /// Stop the database. Every later operation fails with `ShutDown`.
    pub fn shutdown(&self) -> GraphResult<()> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Ok(mut slots) = self.inner.active.lock() {
            slots.clear();
        }
        let mut backend = self
            .inner
            .backend
            .write()
            .map_err(|_| GraphError::Storage("engine lock poisoned".to_string()))?;
        backend.shutdown()?;
        info!("Graph database shut down");
        Ok(())
    }
}

impl std::fmt::Debug for GraphDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDatabase")
            .field("store_dir", &self.inner.config.store_dir)
            .field("running", &self.is_running())
            .finish()
    }
}
