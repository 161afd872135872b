//! Model type registry
//!
//! The reference node links to one type node per model through a
//! `MODEL_TYPE_NODE` relationship carrying `section` and `model` properties.
//! Every saved instance hangs off its type node through an `INSTANCE`
//! relationship, so the instances of a model can be listed without a scan.

use super::base::ModelSchema;
use crate::error::GraphResult;
use crate::graph::{
    Direction, GraphDatabase, Node, PropertyContainer, PropertyValue, Relationship,
};
use tracing::debug;

pub const MODEL_TYPE_NODE: &str = "MODEL_TYPE_NODE";
pub const INSTANCE: &str = "INSTANCE";

fn matches_schema(rel: &Relationship, schema: &ModelSchema) -> GraphResult<bool> {
    let section = rel.get_opt("section")?;
    let model = rel.get_opt("model")?;
    Ok(section == Some(PropertyValue::from(schema.section_label()))
        && model == Some(PropertyValue::from(schema.name())))
}

/// The model's type node, if any instance was ever saved
pub fn type_node(db: &GraphDatabase, schema: &ModelSchema) -> GraphResult<Option<Node>> {
    let types = db
        .reference_node()?
        .relationships_directed(Direction::Outgoing.with(MODEL_TYPE_NODE));
    for rel in types.iter()? {
        if matches_schema(&rel, schema)? {
            return rel.end().map(Some);
        }
    }
    Ok(None)
}

/// The model's type node, created and linked to the reference node if missing
pub fn get_or_create_type_node(db: &GraphDatabase, schema: &ModelSchema) -> GraphResult<Node> {
    db.transaction(|_| {
        if let Some(node) = type_node(db, schema)? {
            return Ok(node);
        }
        let node = db.create_node()?;
        db.reference_node()?
            .relationships_directed(Direction::Outgoing.with(MODEL_TYPE_NODE))
            .create_with(
                &node,
                [("section", schema.section_label()), ("model", schema.name())],
            )?;
        debug!(model = %schema.qualified_name(), type_node = %node.id(), "Registered model type");
        Ok(node)
    })
}

/// Link a freshly created instance node to its model's type node
pub fn register_instance(
    db: &GraphDatabase,
    schema: &ModelSchema,
    instance: &Node,
) -> GraphResult<Relationship> {
    db.transaction(|_| {
        get_or_create_type_node(db, schema)?
            .relationships_directed(Direction::Outgoing.with(INSTANCE))
            .create(instance)
    })
}

/// Instance nodes of the model in engine order
pub fn instances(db: &GraphDatabase, schema: &ModelSchema) -> GraphResult<Vec<Node>> {
    let Some(type_node) = type_node(db, schema)? else {
        return Ok(Vec::new());
    };
    type_node
        .relationships_directed(Direction::Outgoing.with(INSTANCE))
        .iter()?
        .iter()
        .map(Relationship::end)
        .collect()
}

/// Whether `node` was registered as an instance of the model
pub fn is_instance(db: &GraphDatabase, schema: &ModelSchema, node: &Node) -> GraphResult<bool> {
    let Some(type_node) = type_node(db, schema)? else {
        return Ok(false);
    };
    for rel in node
        .relationships_directed(Direction::Incoming.with(INSTANCE))
        .iter()?
    {
        if rel.start()? == type_node {
            return Ok(true);
        }
    }
    Ok(false)
}
