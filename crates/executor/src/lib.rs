//! Statement execution: binds parsed statements to the catalog and storage
//! engine, picks between a full table scan and an index point lookup, and
//! carries out inserts/deletes against the heap file and any indices
//! defined on the table.

#[cfg(test)]
mod tests;

use buffer::BufferPool;
use catalog::{Catalog, Column, TableSchema};
use common::{DbError, DbResult, RecordId};
use parser::{ColumnDef, Literal, Statement, WherePredicate};
use types::{TypeCode, Value};

/// Result of running one [`Statement`] against an [`Engine`].
#[derive(Debug)]
pub enum ExecResult {
    TableCreated { name: String },
    TableDropped { name: String },
    IndexCreated { name: String },
    IndexDropped { name: String },
    Inserted { id: RecordId },
    Selected { columns: Vec<String>, rows: Vec<Vec<Value>> },
    Deleted { count: usize },
}

/// Owns the buffer pool and catalog for one running database. There is no
/// global state: every caller (the REPL, a test harness) holds its own
/// `Engine`.
pub struct Engine {
    pool: BufferPool,
    catalog: Catalog,
}

impl Engine {
    pub fn open(mut pool: BufferPool) -> DbResult<Self> {
        let catalog = Catalog::open(&mut pool)?;
        Ok(Self { pool, catalog })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Flush every dirty page to disk. Called on clean shutdown; the engine
    /// keeps no recovery log, so this is the only durability boundary.
    pub fn flush(&mut self) -> DbResult<()> {
        self.pool.flush()
    }

    pub fn execute(&mut self, statement: Statement) -> DbResult<ExecResult> {
        match statement {
            Statement::CreateTable {
                name,
                columns,
                primary_key,
            } => self.create_table(name, columns, primary_key),
            Statement::DropTable { name } => self.drop_table(name),
            Statement::CreateIndex { name, table, column } => self.create_index(name, table, column),
            Statement::DropIndex { name } => self.drop_index(name),
            Statement::Insert { table, values } => self.insert(table, values),
            Statement::Select { table, predicates } => self.select(table, predicates),
            Statement::Delete { table, predicates } => self.delete(table, predicates),
        }
    }

    fn create_table(
        &mut self,
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: String,
    ) -> DbResult<ExecResult> {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|c| Column::new(c.name, c.type_code, c.unique))
            .collect();
        self.catalog.create_table(&mut self.pool, &name, &primary_key, columns)?;
        Ok(ExecResult::TableCreated { name })
    }

    fn drop_table(&mut self, name: String) -> DbResult<ExecResult> {
        self.catalog.drop_table(&mut self.pool, &name)?;
        Ok(ExecResult::TableDropped { name })
    }

    fn create_index(&mut self, name: String, table: String, column: String) -> DbResult<ExecResult> {
        self.catalog.create_index(&mut self.pool, &name, &table, &column)?;
        Ok(ExecResult::IndexCreated { name })
    }

    fn drop_index(&mut self, name: String) -> DbResult<ExecResult> {
        self.catalog.drop_index(&mut self.pool, &name)?;
        Ok(ExecResult::IndexDropped { name })
    }

    fn insert(&mut self, table: String, values: Vec<Literal>) -> DbResult<ExecResult> {
        let schema = self.catalog.table(&table)?.clone();
        if values.len() != schema.columns.len() {
            return Err(DbError::Schema(format!(
                "table '{table}' has {} columns, {} values given",
                schema.columns.len(),
                values.len()
            )));
        }
        let row: Vec<Value> = values
            .iter()
            .zip(&schema.columns)
            .map(|(lit, col)| literal_to_value(lit, col.type_code, &col.name))
            .collect::<DbResult<_>>()?;

        let outcome = record::insert(&mut self.pool, &schema, &row)?;
        let id = match outcome {
            record::InsertOutcome::Inserted(id) => id,
            record::InsertOutcome::Duplicate { column } => {
                return Err(DbError::Constraint(format!(
                    "value for unique column '{column}' already exists in table '{table}'"
                )));
            }
        };

        for index in self.catalog.indices_for_table(&table) {
            let col_idx = schema.column_index(&index.column).expect("index column is validated at creation");
            let key = schema.encode_value(col_idx, &row[col_idx])?;
            let mut tree = btree::BPTree::open(&mut self.pool, &catalog::index_file(&index.name))?;
            if !tree.add(&mut self.pool, &key, id)? {
                return Err(DbError::Constraint(format!(
                    "value for indexed column '{}' already exists in table '{table}'",
                    index.column
                )));
            }
        }

        Ok(ExecResult::Inserted { id })
    }

    fn select(&mut self, table: String, predicates: Vec<WherePredicate>) -> DbResult<ExecResult> {
        let schema = self.catalog.table(&table)?.clone();
        let resolved = resolve_predicates(&schema, &predicates)?;
        let rows = self.scan(&table, &schema, &resolved)?;
        let columns = schema.columns.iter().map(|c| c.name.clone()).collect();
        let rows = rows.into_iter().map(|(_, row)| row).collect();
        Ok(ExecResult::Selected { columns, rows })
    }

    fn delete(&mut self, table: String, predicates: Vec<WherePredicate>) -> DbResult<ExecResult> {
        let schema = self.catalog.table(&table)?.clone();
        let resolved = resolve_predicates(&schema, &predicates)?;
        let matches = self.scan(&table, &schema, &resolved)?;
        let indices = self.catalog.indices_for_table(&table);

        for (id, row) in &matches {
            record::remove(&mut self.pool, &schema, &[*id])?;
            for index in &indices {
                let col_idx = schema.column_index(&index.column).expect("index column is validated at creation");
                let key = schema.encode_value(col_idx, &row[col_idx])?;
                let mut tree = btree::BPTree::open(&mut self.pool, &catalog::index_file(&index.name))?;
                tree.remove(&mut self.pool, &key)?;
            }
        }

        Ok(ExecResult::Deleted { count: matches.len() })
    }

    /// Scan a table for rows matching every predicate. When exactly one
    /// predicate is an equality test on an indexed column, look the key up
    /// in that index instead of reading the whole table, then re-check the
    /// remaining predicates against the one row that can possibly match.
    fn scan(
        &mut self,
        table: &str,
        schema: &TableSchema,
        predicates: &[record::Predicate],
    ) -> DbResult<Vec<(RecordId, Vec<Value>)>> {
        if let Some(shortcut) = predicates.iter().enumerate().find(|(_, p)| {
            p.comparator == types::Comparator::Eq
                && self
                    .catalog
                    .index_on(table, &schema.columns[p.column].name)
                    .is_some()
        }) {
            let (_, p) = shortcut;
            let index = self
                .catalog
                .index_on(table, &schema.columns[p.column].name)
                .expect("just checked it exists")
                .clone();
            let key = schema.encode_value(p.column, &p.value)?;
            let tree = btree::BPTree::open(&mut self.pool, &catalog::index_file(&index.name))?;
            let found = tree.find(&mut self.pool, &key)?;
            return match found {
                None => Ok(Vec::new()),
                Some(id) => match record::read_row(&mut self.pool, schema, id)? {
                    Some(row) if row_matches(&row, predicates) => Ok(vec![(id, row)]),
                    _ => Ok(Vec::new()),
                },
            };
        }

        record::scan_filter(&mut self.pool, schema, predicates)
    }
}

fn row_matches(row: &[Value], predicates: &[record::Predicate]) -> bool {
    predicates.iter().all(|p| {
        row[p.column]
            .compare(&p.value)
            .is_some_and(|ord| p.comparator.matches(ord))
    })
}

fn resolve_predicates(schema: &TableSchema, predicates: &[WherePredicate]) -> DbResult<Vec<record::Predicate>> {
    predicates
        .iter()
        .map(|p| {
            let idx = schema
                .column_index(&p.column)
                .ok_or_else(|| DbError::Schema(format!("unknown column '{}' on table '{}'", p.column, schema.name)))?;
            let value = literal_to_value(&p.value, schema.columns[idx].type_code, &p.column)?;
            Ok(record::Predicate {
                column: idx,
                comparator: p.comparator,
                value,
            })
        })
        .collect()
}

/// Bind a literal to a column's declared type with no coercion: an `INT`
/// column only accepts an integer literal, a `CHAR` column only a quoted
/// string, and so on.
fn literal_to_value(literal: &Literal, type_code: TypeCode, column: &str) -> DbResult<Value> {
    match (literal, type_code) {
        (Literal::Int(i), TypeCode::Int) => Ok(Value::Int(*i)),
        (Literal::Float(f), TypeCode::Float) => Ok(Value::Float(*f)),
        (Literal::Str(s), TypeCode::Char(_)) => Ok(Value::Char(s.clone())),
        _ => Err(DbError::Schema(format!(
            "value for column '{column}' does not match its declared type"
        ))),
    }
}
