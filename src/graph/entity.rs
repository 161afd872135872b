//! Nodes and relationships as property containers
//!
//! Handles carry only the engine-assigned id and a database handle. Equality
//! and hashing use the id alone, so two handles to the same entity are
//! interchangeable. Property reads go straight to the engine every time;
//! writes join the calling thread's transaction or run in their own.

use super::database::GraphDatabase;
use super::property::{PropertyMap, PropertyValue};
use super::relationships::RelationshipFactory;
use super::types::{
    DirectedRelationshipType, Direction, EntityKind, EntityRef, NodeId, RelationshipId,
    RelationshipType,
};
use crate::error::{GraphError, GraphResult};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A node or relationship viewed as a key to scalar-value mapping
pub trait PropertyContainer {
    fn db(&self) -> &GraphDatabase;

    fn entity_ref(&self) -> EntityRef;

    /// Property value, or `MissingProperty` if the key is absent
    fn get(&self, key: &str) -> GraphResult<PropertyValue> {
        self.get_opt(key)?
            .ok_or_else(|| GraphError::MissingProperty(key.to_string()))
    }

    fn get_opt(&self, key: &str) -> GraphResult<Option<PropertyValue>> {
        let entity = self.entity_ref();
        self.db().read(|b| b.get_property(entity, key))
    }

    /// Property value, or `default` if the key is absent
    fn get_or_default(&self, key: &str, default: PropertyValue) -> GraphResult<PropertyValue> {
        match self.get(key) {
            Err(GraphError::MissingProperty(_)) => Ok(default),
            other => other,
        }
    }

    /// Store a value; `List` and `Null` are rejected with `UnsupportedValueType`
    fn set(&self, key: &str, value: impl Into<PropertyValue>) -> GraphResult<()>
    where
        Self: Sized,
    {
        let entity = self.entity_ref();
        let value = value.into();
        let db = self.db();
        db.transaction(|_| db.write(|b| b.set_property(entity, key, value)))
    }

    /// Delete a property, `MissingProperty` if it was absent
    fn remove(&self, key: &str) -> GraphResult<PropertyValue> {
        let entity = self.entity_ref();
        let db = self.db();
        db.transaction(|_| db.write(|b| b.remove_property(entity, key)))?
            .ok_or_else(|| GraphError::MissingProperty(key.to_string()))
    }

    fn contains(&self, key: &str) -> GraphResult<bool> {
        Ok(self.get_opt(key)?.is_some())
    }

    /// Property keys in insertion order
    fn keys(&self) -> GraphResult<Vec<String>> {
        let entity = self.entity_ref();
        self.db().read(|b| b.property_keys(entity))
    }

    /// `(key, value)` pairs in insertion order
    fn items(&self) -> GraphResult<Vec<(String, PropertyValue)>> {
        let entity = self.entity_ref();
        self.db().read(|b| {
            b.property_keys(entity)?
                .into_iter()
                .filter_map(|key| match b.get_property(entity, &key) {
                    Ok(Some(value)) => Some(Ok((key, value))),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                })
                .collect()
        })
    }

    fn properties(&self) -> GraphResult<PropertyMap> {
        Ok(self.items()?.into_iter().collect())
    }

    /// Number of properties, counted afresh on every call
    fn len(&self) -> GraphResult<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> GraphResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Set several properties in one transaction
    fn update<I, K, V>(&self, properties: I) -> GraphResult<()>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let entity = self.entity_ref();
        let db = self.db();
        let properties: Vec<(String, PropertyValue)> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if properties.is_empty() {
            return Ok(());
        }
        db.transaction(|_| {
            for (key, value) in properties {
                db.write(|b| b.set_property(entity, &key, value))?;
            }
            Ok(())
        })
    }
}

/// Handle to a node
#[derive(Clone)]
pub struct Node {
    id: NodeId,
    db: GraphDatabase,
}

impl Node {
    pub(crate) fn new(id: NodeId, db: GraphDatabase) -> Self {
        Node { id, db }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn exists(&self) -> GraphResult<bool> {
        self.db.read(|b| Ok(b.node_exists(self.id)))
    }

    /// Relationships of any listed type in either direction; no types means any type
    pub fn relationships<I, T>(&self, types: I) -> RelationshipFactory
    where
        I: IntoIterator<Item = T>,
        T: Into<RelationshipType>,
    {
        RelationshipFactory::new(
            self.clone(),
            Direction::Both,
            types.into_iter().map(Into::into).collect(),
        )
    }

    /// Relationships of every type in either direction
    pub fn all_relationships(&self) -> RelationshipFactory {
        RelationshipFactory::new(self.clone(), Direction::Both, Vec::new())
    }

    /// Relationships of one type in either direction
    pub fn relationships_named(&self, rel_type: impl Into<RelationshipType>) -> RelationshipFactory {
        RelationshipFactory::new(self.clone(), Direction::Both, vec![rel_type.into()])
    }

    /// Relationships of one type in the given direction
    pub fn relationships_directed(&self, directed: DirectedRelationshipType) -> RelationshipFactory {
        RelationshipFactory::new(self.clone(), directed.direction, vec![directed.rel_type])
    }

    /// Delete the node. Its relationships must be deleted first.
    pub fn delete(&self) -> GraphResult<()> {
        let id = self.id;
        self.db.transaction(|_| self.db.write(|b| b.delete_node(id)))
    }
}

impl PropertyContainer for Node {
    fn db(&self) -> &GraphDatabase {
        &self.db
    }

    fn entity_ref(&self) -> EntityRef {
        EntityRef::Node(self.id)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.id.as_u64())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node[{}]", self.id.as_u64())
    }
}

/// Handle to a relationship
#[derive(Clone)]
pub struct Relationship {
    id: RelationshipId,
    db: GraphDatabase,
}

impl Relationship {
    pub(crate) fn new(id: RelationshipId, db: GraphDatabase) -> Self {
        Relationship { id, db }
    }

    pub fn id(&self) -> RelationshipId {
        self.id
    }

    pub fn exists(&self) -> GraphResult<bool> {
        self.db.read(|b| Ok(b.relationship_exists(self.id)))
    }

    pub fn relationship_type(&self) -> GraphResult<RelationshipType> {
        Ok(self.db.read(|b| b.relationship_info(self.id))?.rel_type)
    }

    pub fn is_type(&self, rel_type: impl Into<RelationshipType>) -> GraphResult<bool> {
        Ok(self.relationship_type()? == rel_type.into())
    }

    pub fn start(&self) -> GraphResult<Node> {
        let info = self.db.read(|b| b.relationship_info(self.id))?;
        Ok(Node::new(info.start, self.db.clone()))
    }

    pub fn end(&self) -> GraphResult<Node> {
        let info = self.db.read(|b| b.relationship_info(self.id))?;
        Ok(Node::new(info.end, self.db.clone()))
    }

    /// `(start, end)`
    pub fn nodes(&self) -> GraphResult<(Node, Node)> {
        let info = self.db.read(|b| b.relationship_info(self.id))?;
        Ok((
            Node::new(info.start, self.db.clone()),
            Node::new(info.end, self.db.clone()),
        ))
    }

    /// The endpoint opposite `node`; `NodeNotFound` if `node` is not an endpoint
    pub fn other(&self, node: &Node) -> GraphResult<Node> {
        let info = self.db.read(|b| b.relationship_info(self.id))?;
        let other = if info.start == node.id() {
            info.end
        } else if info.end == node.id() {
            info.start
        } else {
            return Err(GraphError::NodeNotFound(node.id()));
        };
        Ok(Node::new(other, self.db.clone()))
    }

    pub fn delete(&self) -> GraphResult<()> {
        let id = self.id;
        self.db
            .transaction(|_| self.db.write(|b| b.delete_relationship(id)))
    }
}

impl PropertyContainer for Relationship {
    fn db(&self) -> &GraphDatabase {
        &self.db
    }

    fn entity_ref(&self) -> EntityRef {
        EntityRef::Relationship(self.id)
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relationship({})", self.id.as_u64())
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relationship[{}]", self.id.as_u64())
    }
}

/// Either kind of entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Node(Node),
    Relationship(Relationship),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        self.entity_ref().kind()
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(node) => Some(node),
            Entity::Relationship(_) => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Entity::Relationship(rel) => Some(rel),
            Entity::Node(_) => None,
        }
    }
}

impl PropertyContainer for Entity {
    fn db(&self) -> &GraphDatabase {
        match self {
            Entity::Node(node) => node.db(),
            Entity::Relationship(rel) => rel.db(),
        }
    }

    fn entity_ref(&self) -> EntityRef {
        match self {
            Entity::Node(node) => node.entity_ref(),
            Entity::Relationship(rel) => rel.entity_ref(),
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

impl From<Relationship> for Entity {
    fn from(rel: Relationship) -> Self {
        Entity::Relationship(rel)
    }
}

/// Entities an index can hold
pub trait IndexedEntity: PropertyContainer + Clone + Sized {
    const KIND: EntityKind;

    fn from_raw(id: u64, db: GraphDatabase) -> Self;
}

impl IndexedEntity for Node {
    const KIND: EntityKind = EntityKind::Node;

    fn from_raw(id: u64, db: GraphDatabase) -> Self {
        Node::new(NodeId(id), db)
    }
}

impl IndexedEntity for Relationship {
    const KIND: EntityKind = EntityKind::Relationship;

    fn from_raw(id: u64, db: GraphDatabase) -> Self {
        Relationship::new(RelationshipId(id), db)
    }
}
