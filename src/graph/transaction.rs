//! Transactions
//!
//! A [`Transaction`] wraps one begin/commit/rollback cycle of the engine.
//! The handle that began it is the owner; handles given to nested scopes
//! share the same underlying transaction but can neither mark nor finish it.

use super::database::GraphDatabase;
use crate::backend::TxId;
use crate::error::{GraphError, GraphResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct TxState {
    /// Explicit outcome from `mark_success`/`mark_failure`
    outcome: Option<bool>,
    finished: bool,
}

pub(crate) struct TxInner {
    db: GraphDatabase,
    id: TxId,
    thread: ThreadId,
    state: Mutex<TxState>,
}

impl TxInner {
    pub(crate) fn new(db: GraphDatabase, id: TxId) -> Self {
        TxInner {
            db,
            id,
            thread: thread::current().id(),
            state: Mutex::new(TxState::default()),
        }
    }

    pub(crate) fn thread(&self) -> ThreadId {
        self.thread
    }

    fn state(&self) -> MutexGuard<'_, TxState> {
        // The state is two flags; a panic mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state().finished
    }
}

impl Drop for TxInner {
    fn drop(&mut self) {
        if self.state().finished {
            return;
        }
        warn!(tx = %self.id, "Transaction dropped without finish; rolling back");
        if self.db.is_running() {
            let id = self.id;
            if let Err(e) = self.db.write(|b| b.rollback_transaction(id)) {
                warn!(tx = %id, error = %e, "Rollback of dropped transaction failed");
            }
        }
        self.db.release_slot(self);
    }
}

/// Handle to an engine transaction
pub struct Transaction {
    inner: Arc<TxInner>,
    owner: bool,
}

impl Transaction {
    pub(crate) fn owned(inner: Arc<TxInner>) -> Self {
        Transaction { inner, owner: true }
    }

    pub(crate) fn shared(inner: Arc<TxInner>) -> Self {
        Transaction {
            inner,
            owner: false,
        }
    }

    pub fn id(&self) -> TxId {
        self.inner.id
    }

    /// Whether this handle began the transaction and must finish it
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Explicit outcome recorded so far
    pub fn outcome(&self) -> Option<bool> {
        self.inner.state().outcome
    }

    fn require_owner(&self, action: &str) -> GraphResult<()> {
        if self.owner {
            Ok(())
        } else {
            Err(GraphError::TransactionMisuse(format!(
                "a nested scope cannot {} transaction {}",
                action, self.inner.id
            )))
        }
    }

    pub fn mark_success(&self) -> GraphResult<()> {
        self.mark(true)
    }

    pub fn mark_failure(&self) -> GraphResult<()> {
        self.mark(false)
    }

    fn mark(&self, success: bool) -> GraphResult<()> {
        self.require_owner("mark")?;
        let mut state = self.inner.state();
        if state.finished {
            return Err(GraphError::TransactionMisuse(format!(
                "transaction {} is already finished",
                self.inner.id
            )));
        }
        state.outcome = Some(success);
        Ok(())
    }

    /// Commit or roll back, releasing the engine transaction.
    ///
    /// An outcome recorded with `mark_success`/`mark_failure` wins over
    /// `default_success`.
    pub fn finish(&self, default_success: bool) -> GraphResult<()> {
        self.require_owner("finish")?;
        let commit = {
            let mut state = self.inner.state();
            if state.finished {
                return Err(GraphError::TransactionMisuse(format!(
                    "transaction {} is already finished",
                    self.inner.id
                )));
            }
            state.finished = true;
            state.outcome.unwrap_or(default_success)
        };

        let id = self.inner.id;
        let result = if commit {
            self.inner.db.write(|b| b.commit_transaction(id))
        } else {
            self.inner.db.write(|b| b.rollback_transaction(id))
        };
        self.inner.db.release_slot(&self.inner);
        debug!(tx = %id, committed = commit, "Transaction finished");
        result
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("owner", &self.owner)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PropertyContainer, PropertyValue};

    #[test]
    fn test_nested_transaction_is_shared() {
        let db = GraphDatabase::in_memory();
        let (outer, created) = db.get_or_begin_transaction().unwrap();
        assert!(created);
        assert!(outer.is_owner());

        let (inner, created) = db.get_or_begin_transaction().unwrap();
        assert!(!created);
        assert_eq!(inner.id(), outer.id());
        assert!(matches!(inner.finish(true), Err(GraphError::TransactionMisuse(_))));
        assert!(matches!(inner.mark_failure(), Err(GraphError::TransactionMisuse(_))));
        assert!(!outer.is_finished());

        outer.finish(true).unwrap();
        assert!(inner.is_finished());

        let (next, created) = db.get_or_begin_transaction().unwrap();
        assert!(created);
        assert_ne!(next.id(), outer.id());
        next.finish(true).unwrap();
    }

    #[test]
    fn test_marked_outcome_wins() {
        let db = GraphDatabase::in_memory();
        let node = db.create_node().unwrap();

        let (tx, _) = db.get_or_begin_transaction().unwrap();
        node.set("name", "lost").unwrap();
        tx.mark_failure().unwrap();
        tx.finish(true).unwrap();
        assert!(!node.contains("name").unwrap());

        let (tx, _) = db.get_or_begin_transaction().unwrap();
        node.set("name", "kept").unwrap();
        tx.mark_success().unwrap();
        tx.finish(false).unwrap();
        assert_eq!(node.get("name").unwrap(), PropertyValue::from("kept"));
    }

    #[test]
    fn test_double_finish_is_misuse() {
        let db = GraphDatabase::in_memory();
        let (tx, _) = db.get_or_begin_transaction().unwrap();
        tx.finish(true).unwrap();
        assert!(matches!(tx.finish(true), Err(GraphError::TransactionMisuse(_))));
        assert!(matches!(tx.mark_success(), Err(GraphError::TransactionMisuse(_))));
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let db = GraphDatabase::in_memory();
        {
            let (_tx, created) = db.get_or_begin_transaction().unwrap();
            assert!(created);
            db.create_node().unwrap();
        }
        assert_eq!(db.nodes().unwrap().len(), 1);
        let (tx, created) = db.get_or_begin_transaction().unwrap();
        assert!(created);
        tx.finish(true).unwrap();
    }
}
