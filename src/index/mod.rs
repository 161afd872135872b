//! Named indices over nodes and relationships
//!
//! Exact indices match whole values; full-text indices tokenize values and
//! support prefix, phrase and boolean queries.

pub mod hits;
pub mod manager;

pub use hits::{IndexHits, ScoredHits};
pub use manager::{Index, IndexManager};
