use samyama_orm::graph::{
    Direction, GraphDatabase, PropertyContainer, PropertyValue, RelationshipType,
};
use samyama_orm::{GraphConfig, GraphError};

#[test]
fn test_property_round_trip_all_scalars() {
    let db = GraphDatabase::in_memory();
    let node = db.create_node().unwrap();

    let values = [
        ("string", PropertyValue::from("hello")),
        ("int", PropertyValue::Int(i32::MIN)),
        ("long", PropertyValue::Long(i64::MAX)),
        ("float", PropertyValue::Float(-0.125)),
        ("bool", PropertyValue::Boolean(false)),
    ];
    for (key, value) in &values {
        node.set(key, value.clone()).unwrap();
    }
    for (key, value) in &values {
        assert_eq!(&node.get(key).unwrap(), value);
    }
    assert_eq!(node.len().unwrap(), 5);
}

#[test]
fn test_deletion_clears_presence() {
    let db = GraphDatabase::in_memory();
    let node = db.create_node().unwrap();
    node.set("name", "test").unwrap();
    assert!(node.contains("name").unwrap());

    assert_eq!(node.remove("name").unwrap(), PropertyValue::from("test"));
    assert!(!node.contains("name").unwrap());
    assert!(node.keys().unwrap().is_empty());
}

#[test]
fn test_is_a_scenario() {
    let db = GraphDatabase::in_memory();
    let root = db.create_node().unwrap();
    let mut members = Vec::new();
    for i in 0..5 {
        let node = db.node_with([("n", i)]).unwrap();
        node.relationships_named("IS_A").outgoing().create(&root).unwrap();
        members.push(node);
    }
    // Noise that must not be counted
    let other = db.create_node().unwrap();
    root.relationships_named("IS_A").outgoing().create(&other).unwrap();
    root.relationships_named("LIKES").incoming().create(&other).unwrap();

    let incoming = root.relationships_named("IS_A").incoming();
    let rels = incoming.iter().unwrap();
    assert_eq!(rels.len(), 5);
    let starts: Vec<_> = rels.iter().map(|r| r.start().unwrap()).collect();
    assert_eq!(starts, members);
    assert_eq!(incoming.len().unwrap(), 5);
    assert!(incoming.exists().unwrap());

    let directed = root.relationships_directed(Direction::Incoming.with("IS_A"));
    assert_eq!(directed.len().unwrap(), 5);
    assert_eq!(root.relationships_named("IS_A").len().unwrap(), 6);
}

#[test]
fn test_single_relationship_enforcement() {
    let db = GraphDatabase::in_memory();
    let a = db.create_node().unwrap();
    let b = db.create_node().unwrap();
    let c = db.create_node().unwrap();

    assert!(matches!(
        a.all_relationships().outgoing().single(),
        Err(GraphError::TypeMismatch(_))
    ));

    let owns = a.relationships_named("OWNS").outgoing();
    let rel = owns.create(&b).unwrap();
    assert_eq!(owns.single().unwrap(), Some(rel));

    owns.create(&c).unwrap();
    assert!(matches!(
        owns.single(),
        Err(GraphError::AmbiguousSingleRelationship(_))
    ));
}

#[test]
fn test_relationship_types_are_interned() {
    let db = GraphDatabase::in_memory();
    let a = db.create_node().unwrap();
    let b = db.create_node().unwrap();
    a.relationships_named("KNOWS").create(&b).unwrap();

    let types = db.relationship_types().unwrap();
    assert!(types.contains(&RelationshipType::new("KNOWS")));
}

#[test]
fn test_fresh_handle_sees_saved_state() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let db = GraphDatabase::open_dir(dir.path()).unwrap();
        let node = db.node_with([("name", PropertyValue::from("test")), ("number", 5.into())]).unwrap();
        db.shutdown().unwrap();
        node.id()
    };

    let db = GraphDatabase::open(GraphConfig::with_store_dir(dir.path())).unwrap();
    assert_eq!(db.store_dir(), Some(dir.path()));
    let node = db.node_by_id(id).unwrap();
    assert_eq!(node.get("name").unwrap(), PropertyValue::from("test"));
    assert_eq!(node.get("number").unwrap(), PropertyValue::Int(5));
    assert_eq!(node.keys().unwrap(), vec!["name", "number"]);
}

#[test]
fn test_shutdown_fails_fast() {
    let db = GraphDatabase::in_memory();
    let node = db.create_node().unwrap();
    db.shutdown().unwrap();
    db.shutdown().unwrap();

    assert!(!db.is_running());
    assert!(matches!(db.create_node(), Err(GraphError::ShutDown)));
    assert!(matches!(node.get("x"), Err(GraphError::ShutDown)));
}
