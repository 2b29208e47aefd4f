use types::{Comparator, TypeCode};

/// A literal value as written in SQL text, not yet checked against a
/// column's declared type — that happens once the executor knows which
/// column it binds to.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i32),
    Float(f32),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub type_code: TypeCode,
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WherePredicate {
    pub column: String,
    pub comparator: Comparator,
    pub value: Literal,
}

/// One parsed SQL statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: String,
    },
    DropTable {
        name: String,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
    },
    DropIndex {
        name: String,
    },
    Insert {
        table: String,
        values: Vec<Literal>,
    },
    Select {
        table: String,
        predicates: Vec<WherePredicate>,
    },
    Delete {
        table: String,
        predicates: Vec<WherePredicate>,
    },
}

/// A REPL command: either an SQL statement or one of the meta-commands that
/// the grammar handles outside the SQL statement forms.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Sql(Statement),
    ExecFile(String),
    Exit,
}
