//! Error taxonomy exposed to callers
//!
//! Engine-native errors (`BackendError`) never escape the public API: every
//! one of them is translated here with its message preserved.

use crate::backend::BackendError;
use crate::graph::{EntityKind, NodeId, PropertyValue, RelationshipId};
use crate::model::PropertyDefinition;
use std::fmt;
use thiserror::Error;

/// A single property value that failed its schema constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The offending value (`None` when the value was absent)
    pub value: Option<PropertyValue>,
    /// Human-readable constraint failures
    pub errors: Vec<String>,
    /// The definition that rejected the value
    pub definition: PropertyDefinition,
    /// Qualified `Model.field` name, set when raised from a model
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(
        value: Option<PropertyValue>,
        definition: &PropertyDefinition,
        error: impl Into<String>,
    ) -> Self {
        ValidationError {
            value,
            errors: vec![error.into()],
            definition: definition.clone(),
            field: None,
        }
    }

    /// Attach the owning field's qualified name
    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            Some(v) => v.to_string(),
            None => "None".to_string(),
        };
        match &self.field {
            Some(field) => write!(
                f,
                "Value '{}' for {} failed to validate: {}",
                value,
                field,
                self.errors.join(", ")
            ),
            None => write!(
                f,
                "Value '{}' failed to validate: {}",
                value,
                self.errors.join(", ")
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by the access layer
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Property '{0}' not found")]
    MissingProperty(String),

    #[error("Value of unsupported type {type_name} for property '{key}'")]
    UnsupportedValueType { key: String, type_name: String },

    #[error("Entity {entity} is a {actual}, expected a {expected}")]
    EntityKindMismatch {
        entity: String,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("Index [{0}] already exists")]
    IndexAlreadyExists(String),

    #[error("Index [{0}] does not exist")]
    IndexNotFound(String),

    #[error("Malformed index query: {0}")]
    MalformedQuery(String),

    #[error("Validation failed: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("More than one relationship matched {0}")]
    AmbiguousSingleRelationship(String),

    #[error("Transaction misuse: {0}")]
    TransactionMisuse(String),

    #[error("Relationship type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Relationship {0} not found")]
    RelationshipNotFound(RelationshipId),

    #[error("Model {model} has no field '{field}'")]
    UnknownField { model: String, field: String },

    #[error("Field {0} is not indexed")]
    FieldNotIndexed(String),

    #[error("Write attempted outside a transaction")]
    NotInTransaction,

    #[error("Another transaction is already active: {0}")]
    TransactionConflict(String),

    #[error("Graph database has been shut down")]
    ShutDown,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            GraphError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<ValidationError> for GraphError {
    fn from(err: ValidationError) -> Self {
        GraphError::Validation(vec![err])
    }
}

impl From<BackendError> for GraphError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NodeNotFound(id) => GraphError::NodeNotFound(id),
            BackendError::RelationshipNotFound(id) => GraphError::RelationshipNotFound(id),
            BackendError::UnsupportedValue { key, type_name } => {
                GraphError::UnsupportedValueType { key, type_name }
            }
            BackendError::IndexExists(name) => GraphError::IndexAlreadyExists(name),
            BackendError::IndexMissing(name) => GraphError::IndexNotFound(name),
            BackendError::QuerySyntax(message) => GraphError::MalformedQuery(message),
            BackendError::MoreThanOneRelationship { node, rel_type } => {
                GraphError::AmbiguousSingleRelationship(format!("{} on {}", rel_type, node))
            }
            BackendError::NotInTransaction => GraphError::NotInTransaction,
            BackendError::TransactionConflict(active) => {
                GraphError::TransactionConflict(format!("transaction {} is open", active))
            }
            other @ (BackendError::NodeHasRelationships(_)
            | BackendError::UnknownTransaction(_)
            | BackendError::UnknownCursor(_)
            | BackendError::Io(_)
            | BackendError::Serialization(_)) => GraphError::Storage(other.to_string()),
        }
    }
}
