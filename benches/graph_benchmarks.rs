use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use samyama_orm::graph::{GraphDatabase, PropertyContainer};
use samyama_orm::model::{Model, ModelSchema, PropertyDefinition};
use std::sync::Arc;

fn plant_schema() -> Arc<ModelSchema> {
    ModelSchema::new("Plant")
        .field("name", PropertyDefinition::string().indexed())
        .field("lifeform", PropertyDefinition::string().index_fulltext())
        .field("height", PropertyDefinition::float().min(0.0).nullable())
        .build()
}

/// Benchmark raw node creation, one transaction per node
fn bench_node_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_creation");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let db = GraphDatabase::in_memory();
                for i in 0..size {
                    db.node_with([("name", format!("Node{}", i))]).unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark node creation batched into a single transaction
fn bench_batched_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_creation");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let db = GraphDatabase::in_memory();
                db.transaction(|_| {
                    for i in 0..size {
                        let node = db.create_node()?;
                        node.set("name", format!("Node{}", i))?;
                    }
                    Ok(())
                })
                .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark model saves, including validation and index reconciliation
fn bench_model_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_save");
    let schema = plant_schema();

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let db = GraphDatabase::in_memory();
                let plants = Model::objects(&db, &schema);
                for i in 0..size {
                    plants
                        .create([
                            ("name", format!("Plant{}", i)),
                            ("lifeform", "Perennial herb".to_string()),
                        ])
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark exact and full-text lookups against a populated model index
fn bench_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_lookup");

    for size in [100, 1000].iter() {
        let db = GraphDatabase::in_memory();
        let schema = plant_schema();
        let plants = Model::objects(&db, &schema);
        for i in 0..*size {
            let lifeform = if i % 2 == 0 { "Perennial herb" } else { "Annual shrub" };
            plants
                .create([("name", format!("Plant{}", i)), ("lifeform", lifeform.to_string())])
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::new("exact", size), size, |b, _| {
            b.iter(|| {
                let found = plants.lookup("name", "Plant42").unwrap();
                criterion::black_box(found.len());
            });
        });

        let index = db.node_indexes().get(&schema.fulltext_index_name()).unwrap();
        group.bench_with_input(BenchmarkId::new("fulltext", size), size, |b, _| {
            b.iter(|| {
                let hits = index.simple_query("lifeform", "herb").unwrap();
                criterion::black_box(hits.collect_all().unwrap().len());
            });
        });
    }
    group.finish();
}

/// Benchmark relationship expansion from a hub node
fn bench_relationship_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("relationship_expansion");

    let db = GraphDatabase::in_memory();
    let hub = db.create_node().unwrap();
    db.transaction(|_| {
        for i in 0..1000 {
            let leaf = db.create_node()?;
            let rel_type = if i % 4 == 0 { "IS_A" } else { "KNOWS" };
            leaf.relationships_named(rel_type).outgoing().create(&hub)?;
        }
        Ok(())
    })
    .unwrap();

    group.bench_function("incoming_is_a", |b| {
        b.iter(|| {
            let rels = hub.relationships_named("IS_A").incoming().iter().unwrap();
            criterion::black_box(rels.len());
        });
    });
    group.bench_function("all", |b| {
        b.iter(|| {
            let rels = hub.all_relationships().iter().unwrap();
            criterion::black_box(rels.len());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_node_creation,
    bench_batched_creation,
    bench_model_save,
    bench_index_lookup,
    bench_relationship_expansion,
);
criterion_main!(benches);
