//! Query surface over the saved instances of one model

use super::base::{Model, ModelSchema};
use super::registry;
use crate::error::{GraphError, GraphResult};
use crate::graph::{GraphDatabase, NodeId, PropertyValue};
use std::sync::Arc;

/// Instances of one model, read through the type registry
#[derive(Debug, Clone)]
pub struct QuerySet {
    db: GraphDatabase,
    schema: Arc<ModelSchema>,
}

impl QuerySet {
    pub fn new(db: &GraphDatabase, schema: &Arc<ModelSchema>) -> Self {
        QuerySet {
            db: db.clone(),
            schema: Arc::clone(schema),
        }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Every instance; each call to [`iter`](Self::iter) reads afresh
    pub fn all(&self) -> QuerySet {
        self.clone()
    }

    /// Instances in engine order, bound lazily as the iterator advances
    pub fn iter(&self) -> GraphResult<impl Iterator<Item = Model>> {
        let schema = Arc::clone(&self.schema);
        Ok(registry::instances(&self.db, &self.schema)?
            .into_iter()
            .map(move |node| Model::from_node(node, &schema)))
    }

    pub fn count(&self) -> GraphResult<usize> {
        Ok(registry::instances(&self.db, &self.schema)?.len())
    }

    /// Build, validate and save a new instance
    pub fn create<I, K, V>(&self, values: I) -> GraphResult<Model>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        let mut model = Model::with_values(&self.db, &self.schema, values)?;
        model.save()?;
        Ok(model)
    }

    /// The instance with `id`; `NodeNotFound` if no such node is an instance
    pub fn get(&self, id: impl Into<NodeId>) -> GraphResult<Model> {
        let id = id.into();
        let node = self.db.node_by_id(id)?;
        if registry::is_instance(&self.db, &self.schema, &node)? {
            Ok(Model::from_node(node, &self.schema))
        } else {
            Err(GraphError::NodeNotFound(id))
        }
    }

    /// Instances whose indexed `field` equals `value`.
    ///
    /// Answered from the model's own index: case-insensitive fields match
    /// regardless of case, full-text fields match on every token of `value`.
    pub fn lookup(&self, field: &str, value: impl Into<PropertyValue>) -> GraphResult<Vec<Model>> {
        let definition =
            self.schema
                .definition(field)
                .ok_or_else(|| GraphError::UnknownField {
                    model: self.schema.qualified_name(),
                    field: field.to_string(),
                })?;
        if !definition.is_indexed() {
            return Err(GraphError::FieldNotIndexed(format!(
                "{}.{}",
                self.schema.qualified_name(),
                field
            )));
        }
        let index_name = if definition.is_fulltext() {
            self.schema.fulltext_index_name()
        } else {
            self.schema.index_name()
        };
        let indexes = self.db.node_indexes();
        if !indexes.contains(&index_name)? {
            return Ok(Vec::new());
        }
        let index = indexes.get(&index_name)?;

        let Some(value) = definition.clean_value(value.into())? else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for term in definition.to_index_values(&value) {
            for node in index.get(field, term)?.collect_all()? {
                if !found.contains(&node) {
                    found.push(node);
                }
            }
        }
        Ok(found
            .into_iter()
            .map(|node| Model::from_node(node, &self.schema))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyDefinition;

    fn schema() -> Arc<ModelSchema> {
        ModelSchema::new("Herb")
            .section("flora")
            .field("name", PropertyDefinition::string().indexed())
            .field("notes", PropertyDefinition::string().index_fulltext().nullable())
            .field("region", PropertyDefinition::string().index_icase().nullable())
            .field("height", PropertyDefinition::float().nullable())
            .build()
    }

    #[test]
    fn test_create_all_count() {
        let db = GraphDatabase::in_memory();
        let herbs = Model::objects(&db, &schema());
        assert_eq!(herbs.count().unwrap(), 0);
        assert_eq!(herbs.all().iter().unwrap().count(), 0);

        let basil = herbs.create([("name", "Basil")]).unwrap();
        herbs.create([("name", "Thyme")]).unwrap();
        assert_eq!(herbs.count().unwrap(), 2);

        let names: Vec<_> = herbs
            .all()
            .iter()
            .unwrap()
            .map(|m| m.get("name").unwrap().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Basil", "Thyme"]);

        let id = basil.id().unwrap();
        assert_eq!(herbs.get(id).unwrap().id(), Some(id));
    }

    #[test]
    fn test_get_rejects_foreign_nodes() {
        let db = GraphDatabase::in_memory();
        let herbs = Model::objects(&db, &schema());
        let stray = db.create_node().unwrap();
        assert!(matches!(herbs.get(stray.id()), Err(GraphError::NodeNotFound(_))));
    }

    #[test]
    fn test_lookup() {
        let db = GraphDatabase::in_memory();
        let herbs = Model::objects(&db, &schema());
        assert!(herbs.lookup("name", "Basil").unwrap().is_empty());

        herbs
            .create([
                ("name", "Basil"),
                ("notes", "Sweet annual herb"),
                ("region", "Mediterranean"),
            ])
            .unwrap();
        herbs.create([("name", "Sage"), ("notes", "Perennial herb")]).unwrap();

        assert_eq!(herbs.lookup("name", "Basil").unwrap().len(), 1);
        assert!(herbs.lookup("name", "basil").unwrap().is_empty());
        assert_eq!(herbs.lookup("region", "MEDITERRANEAN").unwrap().len(), 1);
        assert_eq!(herbs.lookup("notes", "herb").unwrap().len(), 2);
        assert_eq!(herbs.lookup("notes", "annual herb").unwrap().len(), 1);

        assert!(matches!(herbs.lookup("height", 2.0), Err(GraphError::FieldNotIndexed(_))));
        assert!(matches!(herbs.lookup("colour", "red"), Err(GraphError::UnknownField { .. })));
        assert_eq!(db.open_cursor_count().unwrap(), 0);
    }
}
