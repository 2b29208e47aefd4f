use super::*;

fn one(sql: &str) -> Command {
    let mut results = parse_program(sql).expect("tokenize should succeed");
    assert_eq!(results.len(), 1, "expected exactly one statement");
    results.remove(0).expect("parse should succeed")
}

#[test]
fn parses_create_table_with_trailing_primary_key() {
    let cmd = one("CREATE TABLE t (a INT, b CHAR(4) UNIQUE, PRIMARY KEY(a));");
    match cmd {
        Command::Sql(Statement::CreateTable {
            name,
            columns,
            primary_key,
        }) => {
            assert_eq!(name, "t");
            assert_eq!(primary_key, "a");
            assert_eq!(columns.len(), 2);
            assert_eq!(columns[0].type_code, TypeCode::Int);
            assert_eq!(columns[1].type_code, TypeCode::Char(4));
            assert!(columns[1].unique);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_primary_key_without_parens_inline() {
    let cmd = one("create table t (a int primary key b, b int);");
    match cmd {
        Command::Sql(Statement::CreateTable { primary_key, .. }) => assert_eq!(primary_key, "b"),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn rejects_missing_primary_key() {
    let err = parse_program("create table t (a int);")
        .unwrap()
        .remove(0)
        .unwrap_err();
    assert!(matches!(err, DbError::Parse(_)));
}

#[test]
fn parses_insert_values() {
    let cmd = one("INSERT INTO t VALUES (1, 'x', 2.5);");
    match cmd {
        Command::Sql(Statement::Insert { table, values }) => {
            assert_eq!(table, "t");
            assert_eq!(
                values,
                vec![Literal::Int(1), Literal::Str("x".into()), Literal::Float(2.5)]
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_select_with_conjunctive_where() {
    let cmd = one("SELECT * FROM t WHERE a = 1 AND b <> 'z';");
    match cmd {
        Command::Sql(Statement::Select { table, predicates }) => {
            assert_eq!(table, "t");
            assert_eq!(predicates.len(), 2);
            assert_eq!(predicates[0].column, "a");
            assert_eq!(predicates[0].comparator, Comparator::Eq);
            assert_eq!(predicates[1].comparator, Comparator::Ne);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn select_without_where_has_no_predicates() {
    let cmd = one("SELECT * FROM t;");
    match cmd {
        Command::Sql(Statement::Select { predicates, .. }) => assert!(predicates.is_empty()),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn select_requires_star_wildcard() {
    let err = parse_program("select a from t;").unwrap().remove(0).unwrap_err();
    assert!(matches!(err, DbError::Parse(_)));
}

#[test]
fn parses_delete_with_where() {
    let cmd = one("DELETE FROM t WHERE a = 1;");
    match cmd {
        Command::Sql(Statement::Delete { table, predicates }) => {
            assert_eq!(table, "t");
            assert_eq!(predicates.len(), 1);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_create_and_drop_index() {
    assert_eq!(
        one("CREATE INDEX i ON t(a);"),
        Command::Sql(Statement::CreateIndex {
            name: "i".into(),
            table: "t".into(),
            column: "a".into(),
        })
    );
    assert_eq!(
        one("DROP INDEX i;"),
        Command::Sql(Statement::DropIndex { name: "i".into() })
    );
}

#[test]
fn parses_drop_table() {
    assert_eq!(
        one("DROP TABLE t;"),
        Command::Sql(Statement::DropTable { name: "t".into() })
    );
}

#[test]
fn parses_execfile_and_exit() {
    assert_eq!(one("EXECFILE 'script.sql';"), Command::ExecFile("script.sql".into()));
    assert_eq!(one("exit;"), Command::Exit);
    assert_eq!(one("quit;"), Command::Exit);
}

#[test]
fn parse_program_isolates_errors_per_statement() {
    let results = parse_program("select * from t; garbage statement here; exit;").unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
}

#[test]
fn split_first_statement_carries_remainder() {
    let (first, rest) = split_first_statement("select * from t; insert").unwrap().unwrap();
    assert_eq!(first, "select * from t;");
    assert_eq!(rest, " insert");
}

#[test]
fn split_first_statement_is_none_without_terminator() {
    assert_eq!(split_first_statement("select * from t").unwrap(), None);
}

#[test]
fn char_length_out_of_range_is_rejected() {
    let err = parse_program("create table t (a char(0), primary key a);")
        .unwrap()
        .remove(0)
        .unwrap_err();
    assert!(matches!(err, DbError::Parse(_)));
}
