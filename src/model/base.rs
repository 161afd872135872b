//! Model schemas and instances
//!
//! A [`ModelSchema`] is the ordered list of `(field, definition)` pairs of
//! one model type, built once and shared. A [`Model`] is one instance: a
//! [`PropertyModel`] cell per field plus the node backing the instance,
//! which is created no earlier than the first successful save.

use super::definition::PropertyDefinition;
use super::property::PropertyModel;
use super::query_set::QuerySet;
use super::registry;
use crate::error::{GraphError, GraphResult};
use crate::graph::{GraphDatabase, Node, NodeId, PropertyValue};
use crate::index::Index;
use std::sync::Arc;
use tracing::debug;

/// Static description of a model type
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    name: String,
    section: String,
    fields: Vec<(String, PropertyDefinition)>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        ModelSchema {
            name: name.into(),
            section: String::new(),
            fields: Vec::new(),
        }
    }

    /// Group the model under a section label
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Declare a field; redeclaring a name replaces its definition
    pub fn field(mut self, name: impl Into<String>, definition: PropertyDefinition) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = definition,
            None => self.fields.push((name, definition)),
        }
        self
    }

    /// Finish building; models share the schema through an `Arc`
    pub fn build(self) -> Arc<ModelSchema> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section_label(&self) -> &str {
        &self.section
    }

    /// `<section>.<Name>`, or `<Name>` without a section
    pub fn qualified_name(&self) -> String {
        if self.section.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.section, self.name)
        }
    }

    pub fn fields(&self) -> &[(String, PropertyDefinition)] {
        &self.fields
    }

    pub fn definition(&self, field: &str) -> Option<&PropertyDefinition> {
        self.position(field).map(|i| &self.fields[i].1)
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|(name, _)| name == field)
    }

    /// Name of the exact index shared by the model's indexed fields
    pub fn index_name(&self) -> String {
        format!("NodeModel::{}", self.qualified_name())
    }

    /// Name of the full-text index shared by the model's full-text fields
    pub fn fulltext_index_name(&self) -> String {
        format!("NodeModel::{}::fulltext", self.qualified_name())
    }

    fn unknown_field(&self, field: &str) -> GraphError {
        GraphError::UnknownField {
            model: self.qualified_name(),
            field: field.to_string(),
        }
    }
}

/// One instance of a model, backed by a node once saved
#[derive(Debug, Clone)]
pub struct Model {
    db: GraphDatabase,
    schema: Arc<ModelSchema>,
    node: Option<Node>,
    properties: Vec<PropertyModel>,
}

impl Model {
    /// An unbound instance; every field starts dirty with no value
    pub fn new(db: &GraphDatabase, schema: &Arc<ModelSchema>) -> Self {
        let properties = schema
            .fields()
            .iter()
            .map(|(name, def)| PropertyModel::new(name.clone(), def.clone()))
            .collect();
        Model {
            db: db.clone(),
            schema: Arc::clone(schema),
            node: None,
            properties,
        }
    }

    /// An unbound instance with the given field values set
    pub fn with_values<I, K, V>(
        db: &GraphDatabase,
        schema: &Arc<ModelSchema>,
        values: I,
    ) -> GraphResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        let mut model = Model::new(db, schema);
        model.update(values)?;
        Ok(model)
    }

    /// An instance bound to an existing node; fields are read on access
    pub fn from_node(node: Node, schema: &Arc<ModelSchema>) -> Self {
        let db = crate::graph::PropertyContainer::db(&node).clone();
        let properties = schema
            .fields()
            .iter()
            .map(|(name, def)| PropertyModel::bound(name.clone(), def.clone(), node.clone()))
            .collect();
        Model {
            db,
            schema: Arc::clone(schema),
            node: Some(node),
            properties,
        }
    }

    /// An instance bound to the node with `id`
    pub fn from_id(
        db: &GraphDatabase,
        schema: &Arc<ModelSchema>,
        id: impl Into<NodeId>,
    ) -> GraphResult<Self> {
        Ok(Model::from_node(db.node_by_id(id)?, schema))
    }

    /// Query surface over all saved instances of `schema`
    pub fn objects(db: &GraphDatabase, schema: &Arc<ModelSchema>) -> QuerySet {
        QuerySet::new(db, schema)
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn db(&self) -> &GraphDatabase {
        &self.db
    }

    /// Engine id of the backing node; `None` until first saved
    pub fn id(&self) -> Option<NodeId> {
        self.node.as_ref().map(Node::id)
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    fn cell(&self, field: &str) -> GraphResult<&PropertyModel> {
        self.schema
            .position(field)
            .map(|i| &self.properties[i])
            .ok_or_else(|| self.schema.unknown_field(field))
    }

    fn cell_mut(&mut self, field: &str) -> GraphResult<&mut PropertyModel> {
        match self.schema.position(field) {
            Some(i) => Ok(&mut self.properties[i]),
            None => Err(self.schema.unknown_field(field)),
        }
    }

    pub fn get(&self, field: &str) -> GraphResult<Option<PropertyValue>> {
        self.cell(field)?.get()
    }

    pub fn set(&mut self, field: &str, value: impl Into<PropertyValue>) -> GraphResult<()> {
        self.cell_mut(field)?.set(value)
    }

    /// Clear a field; the stored property and its index entries go on save
    pub fn clear(&mut self, field: &str) -> GraphResult<()> {
        self.set(field, PropertyValue::Null)
    }

    /// Set several fields, stopping at the first failure
    pub fn update<I, K, V>(&mut self, values: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        for (field, value) in values {
            self.set(field.as_ref(), value)?;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.properties.iter().any(PropertyModel::is_dirty)
    }

    /// Validate every dirty field, collecting all failures
    pub fn validate(&self) -> GraphResult<()> {
        let errors: Vec<_> = self
            .properties
            .iter()
            .filter_map(|cell| cell.validate().err().map(|err| {
                err.for_field(format!("{}.{}", self.schema.qualified_name(), cell.name()))
            }))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GraphError::Validation(errors))
        }
    }

    /// Validate and persist the instance.
    ///
    /// Nothing is written unless every field validates. The first save
    /// creates the backing node and registers it with the model's type node.
    /// On failure the instance is left exactly as it was before the call.
    pub fn save(&mut self) -> GraphResult<()> {
        self.validate()?;
        let node = self.node.clone();
        let properties = self.properties.clone();
        let db = self.db.clone();
        match db.transaction(|_| self.save_in_transaction()) {
            Ok(written) => {
                debug!(model = %self.schema.qualified_name(), id = ?self.id(), written, "Model saved");
                Ok(())
            }
            Err(e) => {
                self.node = node;
                self.properties = properties;
                Err(e)
            }
        }
    }

    fn save_in_transaction(&mut self) -> GraphResult<usize> {
        let node = match &self.node {
            Some(node) => node.clone(),
            None => {
                let node = self.db.create_node()?;
                registry::register_instance(&self.db, &self.schema, &node)?;
                self.node = Some(node.clone());
                node
            }
        };

        let mut exact: Option<Index<Node>> = None;
        let mut fulltext: Option<Index<Node>> = None;
        let mut written = 0;
        for cell in &mut self.properties {
            if !cell.is_dirty() {
                continue;
            }
            let definition = cell.definition();
            let index = match (definition.is_indexed(), definition.is_fulltext()) {
                (false, _) => None,
                (true, false) => Some(model_index(&mut exact, &self.db, &self.schema.index_name(), false)?),
                (true, true) => Some(model_index(
                    &mut fulltext,
                    &self.db,
                    &self.schema.fulltext_index_name(),
                    true,
                )?),
            };
            if cell.save(&node, index.as_ref())? {
                written += 1;
            }
        }
        Ok(written)
    }
}

/// The model index cached in `slot`, created on first use
fn model_index(
    slot: &mut Option<Index<Node>>,
    db: &GraphDatabase,
    name: &str,
    fulltext: bool,
) -> GraphResult<Index<Node>> {
    if let Some(index) = slot {
        return Ok(index.clone());
    }
    let index = db.node_indexes().get_or_create(name, fulltext)?;
    *slot = Some(index.clone());
    Ok(index)
}
