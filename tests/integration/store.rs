#![allow(missing_docs)]

use std::cell::Cell;

use myrial::{
    query::{
        Driver, DriverOptions, EvalMode, Executor, ExecutorOptions, MemoryStore, Output,
        RelationKey, RelationStore,
    },
    relation::{Bag, Schema},
    tuple, ErrorKind, Result,
};

/// Store wrapper that counts traffic so tests can observe evaluation order.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    scans: Cell<usize>,
    writes: usize,
    removes: usize,
}

impl RelationStore for CountingStore {
    fn schema(&self, key: &RelationKey) -> Result<Schema> {
        self.inner.schema(key)
    }

    fn scan(&self, key: &RelationKey) -> Result<Bag> {
        self.scans.set(self.scans.get() + 1);
        self.inner.scan(key)
    }

    fn insert(&mut self, key: &RelationKey, schema: &Schema, bag: Bag) -> Result<()> {
        self.writes += 1;
        self.inner.insert(key, schema, bag)
    }

    fn replace(&mut self, key: &RelationKey, schema: Schema, bag: Bag) -> Result<()> {
        self.writes += 1;
        self.inner.replace(key, schema, bag)
    }

    fn remove(&mut self, key: &RelationKey) -> bool {
        self.removes += 1;
        self.inner.remove(key)
    }

    fn contains(&self, key: &RelationKey) -> bool {
        self.inner.contains(key)
    }

    fn keys(&self) -> Vec<RelationKey> {
        self.inner.keys()
    }
}

fn driver(mode: EvalMode) -> Driver<CountingStore> {
    Driver::with_executor(
        Executor::new(CountingStore::default(), ExecutorOptions::default()),
        DriverOptions {
            mode,
            owner: "bill".into(),
            program: Some("store-test".into()),
            max_iterations: Some(10),
        },
    )
}

const PROGRAM: &str = "
    A = TABLE [(1, 'a'), (2, 'b')] AS (id:int, tag:string);
    B = DISTINCT A;
    C = UNION A, B;
    DUMP C;
";

#[test]
fn eager_materializes_each_assignment() -> Result<()> {
    let mut d = driver(EvalMode::Eager);
    let mut out = Vec::new();
    d.run_source(PROGRAM, &mut out)?;

    let store = d.executor().store();
    assert_eq!(store.writes, 3);
    let keys = store.keys();
    let names: Vec<&str> = keys.iter().map(|k| k.relation.as_str()).collect();
    assert_eq!(names, vec!["A#1", "B#2", "C#3"]);
    assert!(keys
        .iter()
        .all(|k| k.owner == "bill" && k.program == d.run_id()));
    assert!(d.run_id().starts_with("store-test-"));
    // B and C read materialized inputs; the DUMP reads C.
    assert_eq!(store.scans.get(), 4);
    Ok(())
}

const CLOSURE: &str = "
    Edge = TABLE [(1, 2), (2, 3), (3, 4), (3, 5), (6, 5), (7, 2)] AS (src:int, dst:int);
    Reach = Edge;
    Delta = Edge;
    DO
        J = JOIN Delta BY dst, Edge BY src;
        New = FOREACH J EMIT (Delta.src, Edge.dst) AS (src:int, dst:int);
        Delta = DISTINCT DIFF New, Reach;
        Reach = UNION Reach, Delta;
    WHILE Delta;
    DUMP Reach;
";

#[test]
fn eager_fixpoint_keeps_one_relation_per_binding() -> Result<()> {
    let mut d = driver(EvalMode::Eager);
    let mut out = Vec::new();
    d.run_source(CLOSURE, &mut out)?;
    match &out[0] {
        Output::Dump { tuples, .. } => assert_eq!(tuples.len(), 14),
        other => panic!("expected dump, got {other:?}"),
    }

    let store = d.executor().store();
    assert_eq!(store.keys().len(), d.bindings().len());
    assert_eq!(store.writes, store.keys().len() + store.removes);
    assert!(store.removes > 0);
    Ok(())
}

#[test]
fn lazy_never_touches_the_store() -> Result<()> {
    let mut d = driver(EvalMode::Lazy);
    let mut out = Vec::new();
    d.run_source(PROGRAM, &mut out)?;
    let store = d.executor().store();
    assert_eq!(store.writes, 0);
    assert_eq!(store.scans.get(), 0);
    assert!(store.keys().is_empty());
    match &out[0] {
        Output::Dump { tuples, .. } => assert_eq!(tuples.len(), 4),
        other => panic!("expected dump, got {other:?}"),
    }
    Ok(())
}

#[test]
fn runs_do_not_share_namespaces() {
    let a = driver(EvalMode::Eager);
    let b = driver(EvalMode::Eager);
    assert_ne!(a.run_id(), b.run_id());
}

#[test]
fn insert_into_existing_relation_checks_compatibility() -> Result<()> {
    let key = RelationKey::new("andrew", "foo.exe", "table1");
    let ints = Schema::from_strings(&["a:int", "b:int"])?;
    let renamed = Schema::from_strings(&["x:int", "y:int"])?;
    let mut store = MemoryStore::new();
    store.insert(&key, &ints, [tuple![1, 2]].into_iter().collect())?;
    store.insert(&key, &renamed, [tuple![1, 2]].into_iter().collect())?;
    assert_eq!(store.schema(&key)?, ints);
    assert_eq!(store.scan(&key)?.count(&tuple![1, 2]), 2);

    let strings = Schema::from_strings(&["a:string", "b:int"])?;
    let err = store.insert(&key, &strings, Bag::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaCompatibility);
    assert!(store.contains(&key));
    assert!(!store.contains(&RelationKey::new("andrew", "foo.exe", "table2")));
    Ok(())
}
