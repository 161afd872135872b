use samyama_orm::graph::{GraphDatabase, Node, PropertyContainer, PropertyValue};
use samyama_orm::GraphError;

fn flowers(db: &GraphDatabase) -> (Node, Node, Node) {
    let index = db.node_indexes().create("flowers", false).unwrap();
    let rose = db.node_with([("name", "rose"), ("colour", "red")]).unwrap();
    let tulip = db.node_with([("name", "tulip"), ("colour", "red")]).unwrap();
    let lily = db.node_with([("name", "lily"), ("colour", "white")]).unwrap();
    for node in [&rose, &tulip, &lily] {
        for key in ["name", "colour"] {
            index.add(node, key, node.get(key).unwrap()).unwrap();
        }
    }
    (rose, tulip, lily)
}

#[test]
fn test_added_entry_is_found() {
    let db = GraphDatabase::in_memory();
    let index = db.node_indexes().create("numbers", false).unwrap();
    let node = db.node_with([("number", 5)]).unwrap();
    index.add(&node, "number", 5).unwrap();

    let hits = index.get("number", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits.single().unwrap(), Some(node));
    assert!(index.get("number", 6).unwrap().collect_all().unwrap().is_empty());
    assert_eq!(db.open_cursor_count().unwrap(), 0);
}

#[test]
fn test_duplicate_index_name() {
    let db = GraphDatabase::in_memory();
    db.node_indexes().create("plants", true).unwrap();
    assert!(matches!(
        db.node_indexes().create("plants", false),
        Err(GraphError::IndexAlreadyExists(_))
    ));
    // Node and relationship indices live in separate namespaces
    db.relationship_indexes().create("plants", false).unwrap();
}

#[test]
fn test_fulltext_matches_word() {
    let db = GraphDatabase::in_memory();
    let index = db.node_indexes().create("plants", true).unwrap();
    for lifeform in ["Perennial herb"; 5].into_iter().chain(["Annual herb"; 3]) {
        let node = db.node_with([("lifeform", lifeform)]).unwrap();
        index.add(&node, "lifeform", lifeform).unwrap();
    }
    let shrub = db.node_with([("lifeform", "Shrub")]).unwrap();
    index.add(&shrub, "lifeform", "Shrub").unwrap();

    let hits = index.simple_query("lifeform", "herb").unwrap();
    assert_eq!(hits.len(), 8);
    assert_eq!(hits.collect_all().unwrap().len(), 8);
    assert_eq!(index.simple_query("lifeform", "HERB").unwrap().collect_all().unwrap().len(), 8);
    assert_eq!(index.get("lifeform", "annual herb").unwrap().collect_all().unwrap().len(), 3);
    assert_eq!(index.simple_query("lifeform", "per*").unwrap().collect_all().unwrap().len(), 5);

    let run = |q: &str| index.query(q).unwrap().collect_all().unwrap();
    assert_eq!(run("lifeform:herb AND NOT lifeform:annual").len(), 5);
    assert_eq!(run("lifeform:shrub OR lifeform:annual").len(), 4);
    assert_eq!(run("NOT lifeform:herb"), vec![shrub]);
    assert_eq!(db.open_cursor_count().unwrap(), 0);
}

#[test]
fn test_scores_order_hits() {
    let db = GraphDatabase::in_memory();
    let index = db.node_indexes().create("plants", true).unwrap();
    let mut nodes = Vec::new();
    for text in ["Annual woody herb", "herb", "Perennial herb"] {
        let node = db.create_node().unwrap();
        index.add(&node, "lifeform", text).unwrap();
        nodes.push(node);
    }

    let scored: Vec<(Node, f32)> = index
        .simple_query("lifeform", "herb")
        .unwrap()
        .with_scores()
        .collect::<Result<_, _>>()
        .unwrap();
    let order: Vec<_> = scored.iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(order, vec![nodes[1].clone(), nodes[2].clone(), nodes[0].clone()]);
    assert_eq!(scored[0].1, 1.0);
    assert_eq!(scored[1].1, 0.5);
    assert!(scored[2].1 < scored[1].1);
}

#[test]
fn test_query_language() {
    let db = GraphDatabase::in_memory();
    let (rose, tulip, lily) = flowers(&db);
    let index = db.node_indexes().get("flowers").unwrap();
    let run = |q: &str| index.query(q).unwrap().collect_all().unwrap();

    assert_eq!(run("colour:red AND NOT name:rose"), vec![tulip.clone()]);
    assert_eq!(run("colour:red && !name:tulip"), vec![rose.clone()]);
    assert_eq!(run("name:rose OR name:lily"), vec![rose.clone(), lily.clone()]);
    assert_eq!(run("name:rose name:lily"), vec![rose.clone(), lily.clone()]);
    assert_eq!(run("name:t*"), vec![tulip.clone()]);
    assert_eq!(run("(name:rose || name:tulip) AND colour:red").len(), 2);
    assert_eq!(run("colour:\"white\""), vec![lily]);
    // Exact indices are case-sensitive
    assert!(run("name:Rose").is_empty());
    assert_eq!(db.open_cursor_count().unwrap(), 0);
}

#[test]
fn test_phrase_query_on_fulltext() {
    let db = GraphDatabase::in_memory();
    let index = db.node_indexes().create("notes", true).unwrap();
    let sweet = db.create_node().unwrap();
    let other = db.create_node().unwrap();
    index.add(&sweet, "notes", "Sweet annual herb").unwrap();
    index.add(&other, "notes", "Annual, rarely sweet").unwrap();

    let phrase = index.query("notes:\"sweet annual\"").unwrap().collect_all().unwrap();
    assert_eq!(phrase, vec![sweet.clone()]);
    let words = index.query("notes:sweet AND notes:annual").unwrap().collect_all().unwrap();
    assert_eq!(words.len(), 2);
}

#[test]
fn test_malformed_query() {
    let db = GraphDatabase::in_memory();
    let index = db.node_indexes().create("flowers", false).unwrap();
    for bad in ["name:", "(name:rose", "AND", "name:rose AND"] {
        assert!(
            matches!(index.query(bad), Err(GraphError::MalformedQuery(_))),
            "{bad:?} should not parse"
        );
    }
    assert_eq!(db.open_cursor_count().unwrap(), 0);
}

#[test]
fn test_cursor_lifecycle() {
    let db = GraphDatabase::in_memory();
    flowers(&db);
    let index = db.node_indexes().get("flowers").unwrap();

    let first = index.get("colour", "red").unwrap().single().unwrap();
    assert!(first.is_some());
    assert_eq!(db.open_cursor_count().unwrap(), 0);

    let mut hits = index.get("colour", "red").unwrap();
    assert_eq!(db.open_cursor_count().unwrap(), 1);
    assert!(hits.next().is_some());
    hits.close().unwrap();
    hits.close().unwrap();
    assert!(hits.is_closed());
    assert!(hits.next().is_none());
    assert_eq!(db.open_cursor_count().unwrap(), 0);

    {
        let _abandoned = index.get("colour", "red").unwrap();
        assert_eq!(db.open_cursor_count().unwrap(), 1);
    }
    assert_eq!(db.open_cursor_count().unwrap(), 0);
}

#[test]
fn test_remove_entries() {
    let db = GraphDatabase::in_memory();
    let (rose, _, _) = flowers(&db);
    let index = db.node_indexes().get("flowers").unwrap();

    index
        .remove(&rose, Some("colour"), Some(&PropertyValue::from("red")))
        .unwrap();
    assert_eq!(index.get("colour", "red").unwrap().collect_all().unwrap().len(), 1);
    assert_eq!(index.get("name", "rose").unwrap().collect_all().unwrap(), vec![rose.clone()]);

    // Removing what is not there is a no-op
    index
        .remove(&rose, Some("colour"), Some(&PropertyValue::from("red")))
        .unwrap();
    index.remove(&rose, None, None).unwrap();
    assert!(index.get("name", "rose").unwrap().collect_all().unwrap().is_empty());
}

#[test]
fn test_relationship_index() {
    let db = GraphDatabase::in_memory();
    let a = db.create_node().unwrap();
    let b = db.create_node().unwrap();
    let rel = a.relationships_named("LIKES").outgoing().create(&b).unwrap();
    rel.set("since", 2020).unwrap();

    let index = db.relationship_indexes().create("likes", false).unwrap();
    index.add(&rel, "since", 2020).unwrap();
    assert_eq!(index.get("since", 2020).unwrap().single().unwrap(), Some(rel));

    assert!(matches!(
        index.add(&a, "since", 2020),
        Err(GraphError::EntityKindMismatch { .. })
    ));
}

#[test]
fn test_rolled_back_index_write() {
    let db = GraphDatabase::in_memory();
    let index = db.node_indexes().create("names", false).unwrap();
    let node = db.create_node().unwrap();

    let result: Result<(), GraphError> = db.transaction(|_| {
        index.add(&node, "name", "ghost")?;
        Err(GraphError::TransactionMisuse("abort".to_string()))
    });
    assert!(result.is_err());
    assert!(index.get("name", "ghost").unwrap().collect_all().unwrap().is_empty());
}
