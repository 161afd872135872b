//! Core type definitions for the graph access layer

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};

/// Unique identifier for a node, assigned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Unique identifier for a relationship, assigned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RelationshipId(pub u64);

impl RelationshipId {
    pub fn new(id: u64) -> Self {
        RelationshipId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationshipId({})", self.0)
    }
}

impl From<u64> for RelationshipId {
    fn from(id: u64) -> Self {
        RelationshipId(id)
    }
}

/// The two kinds of entity the engine stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Relationship => write!(f, "relationship"),
        }
    }
}

/// Raw reference to an engine entity: what the engine hands back and accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Node(NodeId),
    Relationship(RelationshipId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Node(_) => EntityKind::Node,
            EntityRef::Relationship(_) => EntityKind::Relationship,
        }
    }

    pub fn raw_id(&self) -> u64 {
        match self {
            EntityRef::Node(id) => id.as_u64(),
            EntityRef::Relationship(id) => id.as_u64(),
        }
    }

    pub fn from_raw(kind: EntityKind, id: u64) -> Self {
        match kind {
            EntityKind::Node => EntityRef::Node(NodeId(id)),
            EntityKind::Relationship => EntityRef::Relationship(RelationshipId(id)),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Node(id) => write!(f, "{}", id),
            EntityRef::Relationship(id) => write!(f, "{}", id),
        }
    }
}

impl From<NodeId> for EntityRef {
    fn from(id: NodeId) -> Self {
        EntityRef::Node(id)
    }
}

impl From<RelationshipId> for EntityRef {
    fn from(id: RelationshipId) -> Self {
        EntityRef::Relationship(id)
    }
}

static RELATIONSHIP_TYPES: LazyLock<Mutex<HashSet<Arc<str>>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

fn intern(name: &str) -> Arc<str> {
    // A poisoned table still holds valid tokens; keep using it.
    let mut table = RELATIONSHIP_TYPES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = table.get(name) {
        return Arc::clone(existing);
    }
    let token: Arc<str> = Arc::from(name);
    table.insert(Arc::clone(&token));
    token
}

/// Relationship type token (e.g., "KNOWS", "IS_A")
///
/// Tokens are interned process-wide, so cloning and comparing them is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipType(Arc<str>);

impl RelationshipType {
    pub fn new(name: impl AsRef<str>) -> Self {
        RelationshipType(intern(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        RelationshipType::new(s)
    }
}

impl From<String> for RelationshipType {
    fn from(s: String) -> Self {
        RelationshipType::new(s)
    }
}

impl From<&RelationshipType> for RelationshipType {
    fn from(t: &RelationshipType) -> Self {
        t.clone()
    }
}

impl Serialize for RelationshipType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RelationshipType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(RelationshipType::new(name))
    }
}

/// Traversal direction relative to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl Direction {
    /// Relationships that carry no particular semantic direction
    pub const UNDIRECTED: Direction = Direction::Both;

    /// Pair this direction with a relationship type
    pub fn with(self, rel_type: impl Into<RelationshipType>) -> DirectedRelationshipType {
        DirectedRelationshipType::new(self, rel_type)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::Incoming => "INCOMING",
            Direction::Outgoing => "OUTGOING",
            Direction::Both => "BOTH",
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Incoming => Direction::Outgoing,
            Direction::Outgoing => Direction::Incoming,
            Direction::Both => Direction::Both,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A relationship type paired with a direction.
///
/// Only used as a query or creation filter; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectedRelationshipType {
    pub direction: Direction,
    pub rel_type: RelationshipType,
}

impl DirectedRelationshipType {
    pub fn new(direction: Direction, rel_type: impl Into<RelationshipType>) -> Self {
        DirectedRelationshipType {
            direction,
            rel_type: rel_type.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.rel_type.as_str()
    }
}

impl fmt::Display for DirectedRelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} ({})>", self.rel_type, self.direction)
    }
}
