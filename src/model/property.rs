//! Per-instance property cells
//!
//! A [`PropertyModel`] caches the unsaved value of one property of one model
//! instance and knows how to persist it: write or delete the raw property on
//! the backing node and reconcile the node's index entries.

use super::definition::PropertyDefinition;
use crate::error::{GraphError, GraphResult, ValidationError};
use crate::graph::{Node, PropertyContainer, PropertyValue};
use crate::index::Index;
use tracing::debug;

/// Cached value and dirty state of one model property
#[derive(Debug, Clone)]
pub struct PropertyModel {
    name: String,
    definition: PropertyDefinition,
    node: Option<Node>,
    unsaved_value: Option<PropertyValue>,
    dirty: bool,
}

impl PropertyModel {
    /// A cell with no backing node yet; it starts dirty so a first save
    /// writes the default
    pub fn new(name: impl Into<String>, definition: PropertyDefinition) -> Self {
        PropertyModel {
            name: name.into(),
            definition,
            node: None,
            unsaved_value: None,
            dirty: true,
        }
    }

    /// A clean cell reading through to `node`
    pub fn bound(name: impl Into<String>, definition: PropertyDefinition, node: Node) -> Self {
        PropertyModel {
            name: name.into(),
            definition,
            node: Some(node),
            unsaved_value: None,
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &PropertyDefinition {
        &self.definition
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Coerce and cache a value; `Null` clears the property on save
    pub fn set(&mut self, value: impl Into<PropertyValue>) -> GraphResult<()> {
        self.unsaved_value = self.definition.clean_value(value.into())?;
        self.dirty = true;
        Ok(())
    }

    /// Current value: the unsaved one while dirty, else the stored one
    pub fn get(&self) -> GraphResult<Option<PropertyValue>> {
        if self.dirty {
            return Ok(self
                .unsaved_value
                .clone()
                .or_else(|| self.definition.default_value().cloned()));
        }
        match &self.node {
            Some(node) => match node.get_opt(&self.name)? {
                Some(raw) => self.definition.from_storage(raw),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Validate the unsaved value; clean cells always pass
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.dirty {
            self.definition.validate(self.unsaved_value.as_ref())
        } else {
            Ok(())
        }
    }

    /// Persist the unsaved value to `node`, or to the node the cell is
    /// already bound to. Returns whether anything was written.
    ///
    /// Index entries derived from the previously stored value are removed
    /// before entries for the new value are added.
    pub fn save(&mut self, node: &Node, index: Option<&Index<Node>>) -> GraphResult<bool> {
        if self.node.is_none() {
            self.node = Some(node.clone());
        }
        if !self.dirty {
            return Ok(false);
        }
        let node = match &self.node {
            Some(node) => node.clone(),
            None => return Ok(false),
        };
        let value = self
            .unsaved_value
            .take()
            .or_else(|| self.definition.default_value().cloned());

        if let (true, Some(index)) = (self.definition.is_indexed(), index) {
            if let Some(raw) = node.get_opt(&self.name)? {
                if let Some(previous) = self.definition.from_storage(raw)? {
                    for term in self.definition.to_index_values(&previous) {
                        index.remove(&node, Some(self.name.as_str()), Some(&term))?;
                    }
                }
            }
            if let Some(value) = &value {
                for term in self.definition.to_index_values(value) {
                    index.add(&node, &self.name, term)?;
                }
            }
        }

        match &value {
            Some(value) => node.set(&self.name, self.definition.to_storage(value)?)?,
            None => match node.remove(&self.name) {
                Ok(_) | Err(GraphError::MissingProperty(_)) => {}
                Err(e) => return Err(e),
            },
        }
        debug!(node = %node.id(), property = %self.name, cleared = value.is_none(), "Property saved");

        self.unsaved_value = value;
        self.dirty = false;
        Ok(true)
    }
}
