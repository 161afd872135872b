//! Index query results
//!
//! [`IndexHits`] is a one-shot forward cursor. It holds an engine-side
//! resource that is released exactly once: by [`IndexHits::close`], by
//! iterating to the end, or by [`IndexHits::single`]. Dropping an open
//! cursor releases it too, with a warning, but that is a safety net and not
//! the supported discipline.

use crate::backend::CursorId;
use crate::error::GraphResult;
use crate::graph::{GraphDatabase, IndexedEntity};
use std::marker::PhantomData;
use tracing::warn;

/// Cursor over index hits
pub struct IndexHits<T: IndexedEntity> {
    db: GraphDatabase,
    cursor: CursorId,
    size: usize,
    closed: bool,
    current_score: Option<f32>,
    _entity: PhantomData<T>,
}

impl<T: IndexedEntity> IndexHits<T> {
    pub(crate) fn open(db: GraphDatabase, cursor: CursorId) -> GraphResult<Self> {
        let size = match db.read(|b| b.cursor_size(cursor)) {
            Ok(size) => size,
            Err(e) => {
                let _ = db.write(|b| b.cursor_close(cursor));
                return Err(e);
            }
        };
        Ok(IndexHits {
            db,
            cursor,
            size,
            closed: false,
            current_score: None,
            _entity: PhantomData,
        })
    }

    /// Total number of hits, consumed or not
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Score of the hit most recently returned
    pub fn current_score(&self) -> Option<f32> {
        self.current_score
    }

    /// Release the engine cursor; closing twice is a no-op
    pub fn close(&mut self) -> GraphResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let cursor = self.cursor;
        self.db.write(|b| b.cursor_close(cursor))
    }

    /// First hit, discarding the rest and closing the cursor
    pub fn single(mut self) -> GraphResult<Option<T>> {
        let first = self.next_scored();
        let closed = self.close();
        let first = first?;
        closed?;
        Ok(first.map(|(entity, _)| entity))
    }

    /// Hits paired with their scores
    pub fn with_scores(self) -> ScoredHits<T> {
        ScoredHits { hits: self }
    }

    /// Drain the remaining hits into a vector, closing the cursor
    pub fn collect_all(self) -> GraphResult<Vec<T>> {
        self.collect()
    }

    fn next_scored(&mut self) -> GraphResult<Option<(T, f32)>> {
        if self.closed {
            return Ok(None);
        }
        let cursor = self.cursor;
        let next = match self.db.write(|b| b.cursor_next(cursor)) {
            Ok(next) => next,
            Err(e) => {
                let _ = self.close();
                return Err(e);
            }
        };
        match next {
            Some((id, score)) => {
                self.current_score = Some(score);
                Ok(Some((T::from_raw(id, self.db.clone()), score)))
            }
            None => {
                self.close()?;
                Ok(None)
            }
        }
    }
}

impl<T: IndexedEntity> Iterator for IndexHits<T> {
    type Item = GraphResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_scored()
            .transpose()
            .map(|hit| hit.map(|(entity, _)| entity))
    }
}

impl<T: IndexedEntity> Drop for IndexHits<T> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(cursor = %self.cursor, "IndexHits dropped without close");
            if self.db.is_running() {
                let _ = self.close();
            }
        }
    }
}

impl<T: IndexedEntity> std::fmt::Debug for IndexHits<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHits")
            .field("cursor", &self.cursor)
            .field("size", &self.size)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Iterator over `(entity, score)` pairs
pub struct ScoredHits<T: IndexedEntity> {
    hits: IndexHits<T>,
}

impl<T: IndexedEntity> ScoredHits<T> {
    pub fn close(&mut self) -> GraphResult<()> {
        self.hits.close()
    }
}

impl<T: IndexedEntity> Iterator for ScoredHits<T> {
    type Item = GraphResult<(T, f32)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.hits.next_scored().transpose()
    }
}
