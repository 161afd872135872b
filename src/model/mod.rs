//! Object mapping over nodes
//!
//! Models declare typed, validated and optionally indexed properties in a
//! [`ModelSchema`]. Saving a [`Model`] validates every changed field before
//! anything is written, then writes the properties and reconciles the
//! model's index entries inside one transaction.

pub mod base;
pub mod definition;
pub mod property;
pub mod query_set;
pub mod registry;

pub use base::{Model, ModelSchema};
pub use definition::{PropertyDefinition, PropertyKind};
pub use property::PropertyModel;
pub use query_set::QuerySet;
