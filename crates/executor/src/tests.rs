use super::*;
use parser::{parse_program, Command};
use tempfile::TempDir;

fn engine() -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let pool = BufferPool::new(dir.path(), 100);
    (dir, Engine::open(pool).unwrap())
}

fn run(engine: &mut Engine, sql: &str) -> Vec<DbResult<ExecResult>> {
    parse_program(sql)
        .unwrap()
        .into_iter()
        .map(|cmd| match cmd.unwrap() {
            Command::Sql(stmt) => engine.execute(stmt),
            other => panic!("expected a SQL statement, got {other:?}"),
        })
        .collect()
}

#[test]
fn create_table_insert_and_select_round_trip() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, name char(8) unique, primary key(id));
         insert into t values (1, 'alice');
         insert into t values (2, 'bob');
         select * from t;",
    );
    assert!(matches!(results.remove(0).unwrap(), ExecResult::TableCreated { .. }));
    assert!(matches!(results.remove(0).unwrap(), ExecResult::Inserted { id: 0 }));
    assert!(matches!(results.remove(0).unwrap(), ExecResult::Inserted { id: 1 }));
    match results.remove(0).unwrap() {
        ExecResult::Selected { columns, rows } => {
            assert_eq!(columns, vec!["id".to_string(), "name".to_string()]);
            assert_eq!(rows.len(), 2);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn duplicate_unique_value_is_rejected() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, name char(8) unique, primary key(id));
         insert into t values (1, 'alice');
         insert into t values (2, 'alice');",
    );
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, DbError::Constraint(_)));
}

#[test]
fn duplicate_primary_key_is_rejected_via_its_implicit_index() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, name char(8), primary key(id));
         insert into t values (1, 'alice');
         insert into t values (1, 'bob');",
    );
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, DbError::Constraint(_)));
}

#[test]
fn select_with_equality_predicate_uses_index_shortcut() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, name char(8), primary key(id));
         insert into t values (1, 'alice');
         insert into t values (2, 'bob');
         select * from t where id = 2;",
    );
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    match results.remove(0).unwrap() {
        ExecResult::Selected { rows, .. } => {
            assert_eq!(rows, vec![vec![Value::Int(2), Value::Char("bob".into())]]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn select_with_conjunctive_predicates_on_non_indexed_column() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, age int, primary key(id));
         insert into t values (1, 20);
         insert into t values (2, 30);
         insert into t values (3, 30);
         select * from t where age = 30 and id <> 2;",
    );
    for _ in 0..4 {
        results.remove(0).unwrap();
    }
    match results.remove(0).unwrap() {
        ExecResult::Selected { rows, .. } => {
            assert_eq!(rows, vec![vec![Value::Int(3), Value::Int(30)]]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn delete_removes_row_from_heap_and_every_index() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, name char(8) unique, primary key(id));
         create index name_idx on t(name);
         insert into t values (1, 'alice');
         delete from t where id = 1;
         select * from t;
         insert into t values (2, 'alice');",
    );
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    match results.remove(0).unwrap() {
        ExecResult::Deleted { count } => assert_eq!(count, 1),
        other => panic!("unexpected result: {other:?}"),
    }
    match results.remove(0).unwrap() {
        ExecResult::Selected { rows, .. } => assert!(rows.is_empty()),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(results.remove(0).unwrap(), ExecResult::Inserted { .. }));
}

#[test]
fn insert_rejects_value_type_mismatch() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, primary key(id));
         insert into t values ('not an int');",
    );
    results.remove(0).unwrap();
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, DbError::Schema(_)));
}

#[test]
fn drop_table_then_recreate_is_allowed() {
    let (_dir, mut engine) = engine();
    let mut results = run(
        &mut engine,
        "create table t (id int, primary key(id));
         drop table t;
         create table t (id int, name char(4), primary key(id));",
    );
    results.remove(0).unwrap();
    results.remove(0).unwrap();
    assert!(matches!(results.remove(0).unwrap(), ExecResult::TableCreated { .. }));
}
