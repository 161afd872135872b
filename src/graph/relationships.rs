//! Relationship factory
//!
//! A [`RelationshipFactory`] is a view over one node's relationships,
//! filtered by direction and by zero or more relationship types. It creates,
//! enumerates, counts and single-fetches the relationships it matches.

use super::database::GraphDatabase;
use super::entity::{Node, PropertyContainer, Relationship};
use super::property::PropertyValue;
use super::types::{Direction, NodeId, RelationshipType};
use crate::error::{GraphError, GraphResult};
use tracing::debug;

/// Anything that identifies a node: a raw engine id or a node handle
pub trait AsNodeId {
    fn node_id(&self) -> NodeId;
}

impl AsNodeId for NodeId {
    fn node_id(&self) -> NodeId {
        *self
    }
}

impl AsNodeId for Node {
    fn node_id(&self) -> NodeId {
        self.id()
    }
}

impl<T: AsNodeId + ?Sized> AsNodeId for &T {
    fn node_id(&self) -> NodeId {
        (**self).node_id()
    }
}

/// Relationships of one node, filtered by direction and types
#[derive(Debug, Clone)]
pub struct RelationshipFactory {
    node: Node,
    direction: Direction,
    /// Empty means any type
    types: Vec<RelationshipType>,
}

impl RelationshipFactory {
    pub fn new(node: Node, direction: Direction, types: Vec<RelationshipType>) -> Self {
        RelationshipFactory {
            node,
            direction,
            types,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn types(&self) -> &[RelationshipType] {
        &self.types
    }

    fn db(&self) -> &GraphDatabase {
        self.node.db()
    }

    /// Same node and types, incoming only
    pub fn incoming(&self) -> RelationshipFactory {
        RelationshipFactory::new(self.node.clone(), Direction::Incoming, self.types.clone())
    }

    /// Same node and types, outgoing only
    pub fn outgoing(&self) -> RelationshipFactory {
        RelationshipFactory::new(self.node.clone(), Direction::Outgoing, self.types.clone())
    }

    fn single_type(&self) -> GraphResult<&RelationshipType> {
        match self.types.as_slice() {
            [only] => Ok(only),
            types => Err(GraphError::TypeMismatch(format!(
                "expected exactly one relationship type, factory has {}",
                types.len()
            ))),
        }
    }

    /// Matching relationships.
    ///
    /// With several types the per-type results are concatenated in filter
    /// order; a relationship is never listed twice for one type.
    pub fn iter(&self) -> GraphResult<Vec<Relationship>> {
        let node = self.node.id();
        let direction = self.direction;
        let ids = match self.types.len() {
            0 | 1 => self
                .db()
                .read(|b| b.relationships(node, direction, &self.types))?,
            _ => {
                let mut ids = Vec::new();
                for rel_type in &self.types {
                    ids.extend(self.db().read(|b| {
                        b.relationships(node, direction, std::slice::from_ref(rel_type))
                    })?);
                }
                ids
            }
        };
        Ok(ids
            .into_iter()
            .map(|id| Relationship::new(id, self.db().clone()))
            .collect())
    }

    /// Whether any relationship matches, stopping at the first type that does
    pub fn exists(&self) -> GraphResult<bool> {
        let node = self.node.id();
        let direction = self.direction;
        if self.types.len() <= 1 {
            return self
                .db()
                .read(|b| b.has_relationship(node, direction, &self.types));
        }
        for rel_type in &self.types {
            let found = self.db().read(|b| {
                b.has_relationship(node, direction, std::slice::from_ref(rel_type))
            })?;
            if found {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Number of matching relationships
    pub fn len(&self) -> GraphResult<usize> {
        Ok(self.iter()?.len())
    }

    pub fn is_empty(&self) -> GraphResult<bool> {
        Ok(!self.exists()?)
    }

    fn check_single(&self) -> GraphResult<&RelationshipType> {
        if self.direction == Direction::Both {
            return Err(GraphError::TypeMismatch(
                "single relationship needs a direction".to_string(),
            ));
        }
        self.single_type()
    }

    /// The unique matching relationship, if any.
    ///
    /// Needs exactly one type and a direction; more than one match fails
    /// with `AmbiguousSingleRelationship`.
    pub fn single(&self) -> GraphResult<Option<Relationship>> {
        let rel_type = self.check_single()?;
        let node = self.node.id();
        let direction = self.direction;
        let found = self
            .db()
            .read(|b| b.single_relationship(node, rel_type, direction))?;
        Ok(found.map(|id| Relationship::new(id, self.db().clone())))
    }

    /// Replace the unique relationship with one to `target`
    pub fn set_single(&self, target: impl AsNodeId) -> GraphResult<Relationship> {
        self.check_single()?;
        self.db().transaction(|_| {
            self.delete_single()?;
            self.create(target)
        })
    }

    /// Delete the unique relationship if present; returns whether one existed
    pub fn delete_single(&self) -> GraphResult<bool> {
        self.check_single()?;
        self.db().transaction(|_| match self.single()? {
            Some(rel) => {
                rel.delete()?;
                Ok(true)
            }
            None => Ok(false),
        })
    }

    /// Create a relationship between the bound node and `target`.
    ///
    /// For an incoming factory the relationship runs from `target` to the
    /// bound node; otherwise from the bound node to `target`.
    pub fn create(&self, target: impl AsNodeId) -> GraphResult<Relationship> {
        self.create_with(target, Vec::<(String, PropertyValue)>::new())
    }

    /// Create a relationship and set its properties in the same transaction
    pub fn create_with<I, K, V>(&self, target: impl AsNodeId, properties: I) -> GraphResult<Relationship>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let rel_type = self.single_type()?.clone();
        let (start, end) = match self.direction {
            Direction::Incoming => (target.node_id(), self.node.id()),
            Direction::Outgoing | Direction::Both => (self.node.id(), target.node_id()),
        };
        let db = self.db();
        db.transaction(|_| {
            let id = db.write(|b| b.create_relationship(start, end, &rel_type))?;
            debug!(relationship = %id, %start, %end, rel_type = %rel_type, "Created relationship");
            let rel = Relationship::new(id, db.clone());
            rel.update(properties)?;
            Ok(rel)
        })
    }
}
