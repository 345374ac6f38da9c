#![allow(missing_docs)]

use std::path::PathBuf;

use myrial::{
    query::{Driver, DriverOptions, EvalMode, ExecutorOptions, Output},
    relation::{Bag, Tuple},
    tuple, ErrorKind, Result,
};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn run_in(mode: EvalMode, source: &str) -> Result<Vec<Output>> {
    let mut driver = Driver::new(
        DriverOptions {
            mode,
            ..DriverOptions::default()
        },
        ExecutorOptions {
            data_dir: Some(data_dir()),
        },
    );
    let mut out = Vec::new();
    driver.run_source(source, &mut out)?;
    Ok(out)
}

fn run(source: &str) -> Result<Vec<Output>> {
    run_in(EvalMode::Lazy, source)
}

fn dumps(outputs: &[Output]) -> Vec<Vec<Tuple>> {
    outputs
        .iter()
        .filter_map(|o| match o {
            Output::Dump { tuples, .. } => Some(tuples.clone()),
            _ => None,
        })
        .collect()
}

fn bag(tuples: &[Tuple]) -> Bag {
    tuples.iter().cloned().collect()
}

const EMP_DEPT: &str = r#"
    Emp = LOAD "employees.txt" AS (id:int, dept_id:int, name:string, salary:int);
    Dept = LOAD "departments.txt" AS (id:int, name:string, manager:int);
    EmpDept = JOIN Emp BY dept_id, Dept BY id;
    DESCRIBE EmpDept;
    DUMP EmpDept;
"#;

#[test]
fn join_employees_with_departments() -> Result<()> {
    let out = run(EMP_DEPT)?;
    match &out[0] {
        Output::Describe { ident, schema } => {
            assert_eq!(ident, "EmpDept");
            assert_eq!(schema.len(), 7);
            assert_eq!(schema.columns()[4].name, "Dept.id");
        }
        other => panic!("expected describe, got {other:?}"),
    }
    let rows = &dumps(&out)[0];
    assert_eq!(rows.len(), 7);
    for row in rows {
        assert_eq!(row.len(), 7);
        assert_eq!(row.get(1), row.get(4));
    }
    assert!(rows.contains(&tuple![
        1,
        2,
        "Bill Howe",
        25000,
        2,
        "human resources",
        2
    ]));
    Ok(())
}

#[test]
fn transitive_closure_from_file() -> Result<()> {
    let source = std::fs::read_to_string(data_dir().join("closure.myl")).expect("program");
    let lazy = run_in(EvalMode::Lazy, &source)?;
    let eager = run_in(EvalMode::Eager, &source)?;

    let reach = bag(&dumps(&lazy)[0]);
    assert_eq!(reach.len(), 14);
    assert_eq!(reach.distinct(), reach);
    for pair in [tuple![1, 4], tuple![1, 5], tuple![7, 5], tuple![6, 5], tuple![2, 5]] {
        assert_eq!(reach.count(&pair), 1, "missing {pair}");
    }
    assert_eq!(reach.count(&tuple![4, 1]), 0);
    assert_eq!(reach, bag(&dumps(&eager)[0]));
    assert_eq!(lazy[0].to_string(), "Reach : (src:int,dst:int)");
    Ok(())
}

#[test]
fn distinct_table() -> Result<()> {
    let out = run("T = TABLE [(1,1),(1,1),(2,2)] AS (a:int, b:int); DUMP DISTINCT T;")?;
    let rows = bag(&dumps(&out)[0]);
    assert_eq!(rows.count(&tuple![1, 1]), 1);
    assert_eq!(rows.count(&tuple![2, 2]), 1);
    assert_eq!(rows.len(), 2);
    Ok(())
}

#[test]
fn set_operations_and_limit() -> Result<()> {
    let out = run(r#"
        A = TABLE [(1), (1), (1), (2)] AS (x:int);
        B = TABLE [(1), (3)] AS (y:int);
        U = UNION A, B;
        I = INTERSECT A, B;
        D = DIFF A, B;
        L = LIMIT A, 2;
        DUMP U; DUMP I; DUMP D; DUMP L;
    "#)?;
    let d = dumps(&out);
    assert_eq!(bag(&d[0]).count(&tuple![1]), 4);
    assert_eq!(d[0].len(), 6);
    assert_eq!(d[1], vec![tuple![1]]);
    assert_eq!(bag(&d[2]).count(&tuple![1]), 2);
    assert_eq!(bag(&d[2]).count(&tuple![2]), 1);
    assert_eq!(d[3], vec![tuple![1], tuple![1]]);
    Ok(())
}

#[test]
fn foreach_renames_and_reorders() -> Result<()> {
    let out = run(r#"
        Emp = LOAD "employees.txt" AS (id:int, dept_id:int, name:string, salary:int);
        Pay = FOREACH Emp EMIT (salary, name) AS (amount:int, who:string);
        Twice = FOREACH Emp EMIT (id, id) AS (a:int, b:int);
        DESCRIBE Pay;
        DUMP LIMIT Twice, 1;
    "#)?;
    assert_eq!(out[0].to_string(), "Pay : (amount:int,who:string)");
    assert_eq!(dumps(&out)[0], vec![tuple![1, 1]]);
    Ok(())
}

#[test]
fn explain_shows_plan_tree() -> Result<()> {
    let out = run(r#"
        T = TABLE [(1)] AS (x:int);
        D = DISTINCT UNION T, T;
        EXPLAIN D;
    "#)?;
    let text = out[0].to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "D : ");
    assert_eq!(lines[1], "DISTINCT schema=(x:int)");
    assert_eq!(lines[2], "  UNION schema=(x:int)");
    assert_eq!(lines.len(), 5);
    Ok(())
}

#[test]
fn analysis_errors_have_kinds() {
    let cases = [
        (
            "A = TABLE [(1)] AS (x:int); B = TABLE [('s')] AS (x:string); C = UNION A, B;",
            ErrorKind::SchemaCompatibility,
        ),
        (
            "A = TABLE [(1)] AS (x:int); B = FOREACH A EMIT (y);",
            ErrorKind::NoSuchColumn,
        ),
        ("A = TABLE [(1, 2)] AS (x:int);", ErrorKind::TupleType),
        ("DUMP Missing;", ErrorKind::UnknownSymbol),
        ("EXPLAIN Missing;", ErrorKind::UnknownSymbol),
        ("A = = B;", ErrorKind::Syntax),
        (
            "A = TABLE [(1)] AS (x:int); B = TABLE [('s')] AS (y:string); \
             J = JOIN A BY x, B BY y;",
            ErrorKind::SchemaCompatibility,
        ),
        ("A = LOAD \"no-such-file.txt\" AS (x:int); DUMP A;", ErrorKind::Io),
    ];
    for (source, kind) in cases {
        let err = run(source).unwrap_err();
        assert_eq!(err.kind(), kind, "{source}: {err}");
    }
}

#[test]
fn failing_statement_stops_the_program() {
    let mut driver = Driver::new(DriverOptions::default(), ExecutorOptions::default());
    let mut out = Vec::new();
    let err = driver
        .run_source(
            "A = TABLE [(1)] AS (x:int); DUMP A; DUMP Nope; DUMP A;",
            &mut out,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSymbol);
    assert_eq!(out.len(), 1);
}

#[test]
fn eager_load_errors_surface_at_assignment() {
    let err = run_in(
        EvalMode::Eager,
        "A = LOAD \"no-such-file.txt\" AS (x:int);",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    // Lazy mode defers the read until something pulls from the plan.
    assert!(run("A = LOAD \"no-such-file.txt\" AS (x:int);").is_ok());
}
