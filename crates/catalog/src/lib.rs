//! Table and index metadata registry.
//!
//! The catalog is not a parallel storage mechanism: table names, primary
//! keys, column lists, and index definitions all live in `storage::HeapFile`s
//! that flow through the same `buffer::BufferPool` as user data. In-memory
//! maps are rebuilt by scanning those heap files once on [`Catalog::open`].


use std::collections::HashMap;

use buffer::BufferPool;
use btree::BPTree;
use common::{DbError, DbResult, RecordId};
use storage::HeapFile;
use types::{TypeCode, Value};

/// Max length of a table, column, or index name.
pub const NAME_LEN: usize = 31;

const TABLES_FILE: &str = "catalog/tables";
const INDICES_FILE: &str = "catalog/indices";

fn table_columns_file(table: &str) -> String {
    format!("catalog/table_{table}")
}

/// Logical name of the heap file backing a table's live rows.
pub fn record_file(table: &str) -> String {
    format!("record/{table}")
}

/// Logical name of the B+-tree file backing an index.
pub fn index_file(index: &str) -> String {
    format!("index/{index}")
}

fn write_fixed(buf: &mut [u8], offset: usize, len: usize, s: &str) -> DbResult<()> {
    let bytes = s.as_bytes();
    if bytes.len() > len {
        return Err(DbError::Schema(format!(
            "identifier '{s}' exceeds the {len}-byte name limit"
        )));
    }
    buf[offset..offset + len].fill(0);
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn read_fixed(buf: &[u8], offset: usize, len: usize) -> String {
    let slice = &buf[offset..offset + len];
    let end = slice.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&slice[..end]).into_owned()
}

/// One declared column: name, on-disk type, and whether it carries a
/// uniqueness constraint (the primary-key column is implicitly unique).
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub type_code: TypeCode,
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, type_code: TypeCode, unique: bool) -> Self {
        Self {
            name: name.into(),
            type_code,
            unique,
        }
    }
}

/// A table's schema: name, primary-key column, and ordered column list.
/// Record layout is the columns concatenated in declaration order at fixed
/// offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub primary: String,
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Sum of every column's on-disk size; the heap file's slot payload
    /// length (excluding the tombstone byte).
    pub fn record_length(&self) -> i32 {
        self.columns.iter().map(|c| c.type_code.size() as i32).sum()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// A column is unique if declared `UNIQUE` or if it is the primary key.
    pub fn is_unique_column(&self, idx: usize) -> bool {
        self.columns[idx].unique || self.columns[idx].name == self.primary
    }

    /// Byte offset of column `idx` within the fixed record layout.
    pub fn offset(&self, idx: usize) -> usize {
        self.columns[..idx]
            .iter()
            .map(|c| c.type_code.size())
            .sum()
    }

    /// Encode one value to its fixed-width on-disk representation.
    pub fn encode_value(&self, idx: usize, value: &Value) -> DbResult<Vec<u8>> {
        let column = &self.columns[idx];
        match (value, column.type_code) {
            (Value::Char(s), TypeCode::Char(n)) => {
                let bytes = s.as_bytes();
                if bytes.len() > n as usize {
                    return Err(DbError::Schema(format!(
                        "value '{s}' exceeds CHAR({n}) for column '{}'",
                        column.name
                    )));
                }
                let mut out = vec![0u8; n as usize + 1];
                out[..bytes.len()].copy_from_slice(bytes);
                Ok(out)
            }
            (Value::Int(i), TypeCode::Int) => Ok(i.to_le_bytes().to_vec()),
            (Value::Float(f), TypeCode::Float) => Ok(f.to_le_bytes().to_vec()),
            _ => Err(DbError::Schema(format!(
                "value type mismatch for column '{}'",
                column.name
            ))),
        }
    }

    fn decode_value(&self, idx: usize, bytes: &[u8]) -> Value {
        match self.columns[idx].type_code {
            TypeCode::Char(n) => {
                let end = bytes[..n as usize + 1]
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(n as usize);
                Value::Char(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            TypeCode::Int => Value::Int(i32::from_le_bytes(bytes[..4].try_into().unwrap())),
            TypeCode::Float => Value::Float(f32::from_le_bytes(bytes[..4].try_into().unwrap())),
            TypeCode::Null => Value::Int(0),
        }
    }

    /// Concatenate every column's encoding into one record-length payload.
    pub fn encode_row(&self, values: &[Value]) -> DbResult<Vec<u8>> {
        if values.len() != self.columns.len() {
            return Err(DbError::Schema(format!(
                "expected {} values for table '{}', got {}",
                self.columns.len(),
                self.name,
                values.len()
            )));
        }
        let mut out = Vec::with_capacity(self.record_length() as usize);
        for (idx, value) in values.iter().enumerate() {
            out.extend(self.encode_value(idx, value)?);
        }
        Ok(out)
    }

    /// Split a record-length payload back into typed values, one per column.
    pub fn decode_row(&self, payload: &[u8]) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.columns.len());
        let mut offset = 0usize;
        for (idx, column) in self.columns.iter().enumerate() {
            let size = column.type_code.size();
            values.push(self.decode_value(idx, &payload[offset..offset + size]));
            offset += size;
        }
        values
    }
}

/// One index definition: name, owning table, and indexed column. An index
/// may only exist on a unique column, and at most one index per
/// `(table, column)` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexMeta {
    pub name: String,
    pub table: String,
    pub column: String,
}

struct TableEntry {
    record_id: RecordId,
    schema: TableSchema,
}

struct IndexEntry {
    record_id: RecordId,
    meta: IndexMeta,
}

/// Persistent registry of tables and indices, heap-file backed.
pub struct Catalog {
    tables: HashMap<String, TableEntry>,
    indices: HashMap<String, IndexEntry>,
}

impl Catalog {
    /// Open the catalog, creating its backing heap files on first use and
    /// rebuilding the in-memory lookup maps by scanning them.
    pub fn open(pool: &mut BufferPool) -> DbResult<Self> {
        if !pool.data_dir().join(format!("{TABLES_FILE}.mdb")).exists() {
            HeapFile::create(pool, TABLES_FILE, (NAME_LEN * 2) as i32)?;
        }
        if !pool.data_dir().join(format!("{INDICES_FILE}.mdb")).exists() {
            HeapFile::create(pool, INDICES_FILE, (NAME_LEN * 3) as i32)?;
        }

        let table_rows: Vec<(RecordId, String, String)> = {
            let mut hf = HeapFile::open(pool, TABLES_FILE)?;
            let mut rows = Vec::new();
            while let Some((id, payload)) = hf.next_record()? {
                let name = read_fixed(&payload, 0, NAME_LEN);
                let primary = read_fixed(&payload, NAME_LEN, NAME_LEN);
                rows.push((id, name, primary));
            }
            rows
        };

        let mut tables = HashMap::new();
        for (record_id, name, primary) in table_rows {
            let columns = Self::load_columns(pool, &name)?;
            tables.insert(
                name.clone(),
                TableEntry {
                    record_id,
                    schema: TableSchema {
                        name,
                        primary,
                        columns,
                    },
                },
            );
        }

        let index_rows: Vec<(RecordId, String, String, String)> = {
            let mut hf = HeapFile::open(pool, INDICES_FILE)?;
            let mut rows = Vec::new();
            while let Some((id, payload)) = hf.next_record()? {
                let name = read_fixed(&payload, 0, NAME_LEN);
                let table = read_fixed(&payload, NAME_LEN, NAME_LEN);
                let column = read_fixed(&payload, NAME_LEN * 2, NAME_LEN);
                rows.push((id, name, table, column));
            }
            rows
        };

        let mut indices = HashMap::new();
        for (record_id, name, table, column) in index_rows {
            indices.insert(
                name.clone(),
                IndexEntry {
                    record_id,
                    meta: IndexMeta { name, table, column },
                },
            );
        }

        Ok(Self { tables, indices })
    }

    fn load_columns(pool: &mut BufferPool, table: &str) -> DbResult<Vec<Column>> {
        let mut hf = HeapFile::open(pool, &table_columns_file(table))?;
        let mut columns = Vec::new();
        while let Some((_, payload)) = hf.next_record()? {
            let name = read_fixed(&payload, 0, NAME_LEN);
            let type_code_raw = i16::from_le_bytes(payload[NAME_LEN..NAME_LEN + 2].try_into().unwrap());
            let type_code = TypeCode::try_from_u16(type_code_raw as u16).ok_or_else(|| {
                DbError::Catalog(format!("table '{table}' has a corrupt type code for column '{name}'"))
            })?;
            let unique = payload[NAME_LEN + 2] != 0;
            columns.push(Column { name, type_code, unique });
        }
        Ok(columns)
    }

    pub fn table(&self, name: &str) -> DbResult<&TableSchema> {
        self.tables
            .get(name)
            .map(|e| &e.schema)
            .ok_or_else(|| DbError::Schema(format!("table '{name}' does not exist")))
    }

    /// Every index defined on `table`.
    pub fn indices_for_table(&self, table: &str) -> Vec<&IndexMeta> {
        self.indices
            .values()
            .filter(|e| e.meta.table == table)
            .map(|e| &e.meta)
            .collect()
    }

    /// The index (if any) on `(table, column)`.
    pub fn index_on(&self, table: &str, column: &str) -> Option<&IndexMeta> {
        self.indices
            .values()
            .find(|e| e.meta.table == table && e.meta.column == column)
            .map(|e| &e.meta)
    }

    pub fn index(&self, name: &str) -> DbResult<&IndexMeta> {
        self.indices
            .get(name)
            .map(|e| &e.meta)
            .ok_or_else(|| DbError::Schema(format!("index '{name}' does not exist")))
    }

    /// Create a table, its column-list heap file, its empty record heap
    /// file, and an implicit index on the primary key.
    pub fn create_table(
        &mut self,
        pool: &mut BufferPool,
        name: &str,
        primary: &str,
        columns: Vec<Column>,
    ) -> DbResult<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::Schema(format!("table '{name}' already exists")));
        }
        if columns.iter().filter(|c| c.name == primary).count() != 1 {
            return Err(DbError::Schema(format!(
                "primary key column '{primary}' is not declared exactly once"
            )));
        }
        {
            let mut seen = std::collections::HashSet::new();
            for column in &columns {
                if !seen.insert(&column.name) {
                    return Err(DbError::Schema(format!(
                        "duplicate column name '{}'",
                        column.name
                    )));
                }
            }
        }

        let mut row = vec![0u8; NAME_LEN * 2];
        write_fixed(&mut row, 0, NAME_LEN, name)?;
        write_fixed(&mut row, NAME_LEN, NAME_LEN, primary)?;
        let mut hf = HeapFile::open(pool, TABLES_FILE)?;
        let record_id = hf.add(&row)?;
        drop(hf);

        let columns_file = table_columns_file(name);
        HeapFile::create(pool, &columns_file, (NAME_LEN + 2 + 1) as i32)?;
        {
            let mut hf = HeapFile::open(pool, &columns_file)?;
            for column in &columns {
                let mut entry = vec![0u8; NAME_LEN + 2 + 1];
                write_fixed(&mut entry, 0, NAME_LEN, &column.name)?;
                entry[NAME_LEN..NAME_LEN + 2]
                    .copy_from_slice(&(column.type_code.as_u16() as i16).to_le_bytes());
                entry[NAME_LEN + 2] = column.unique as u8;
                hf.add(&entry)?;
            }
        }

        let schema = TableSchema {
            name: name.to_string(),
            primary: primary.to_string(),
            columns,
        };
        HeapFile::create(pool, &record_file(name), schema.record_length())?;

        self.tables.insert(
            name.to_string(),
            TableEntry {
                record_id,
                schema: schema.clone(),
            },
        );

        let implicit_index = format!("pk_{name}_{primary}");
        self.create_index(pool, &implicit_index, name, primary)?;
        Ok(())
    }

    /// Drop a table: its indices first, then its column-list and record
    /// heap files, then its `catalog/tables` entry.
    pub fn drop_table(&mut self, pool: &mut BufferPool, name: &str) -> DbResult<()> {
        let record_id = self
            .tables
            .get(name)
            .map(|e| e.record_id)
            .ok_or_else(|| DbError::Schema(format!("table '{name}' does not exist")))?;

        let index_names: Vec<String> = self
            .indices
            .values()
            .filter(|e| e.meta.table == name)
            .map(|e| e.meta.name.clone())
            .collect();
        for index_name in index_names {
            self.drop_index(pool, &index_name)?;
        }

        let columns_file = table_columns_file(name);
        pool.remove_file(&columns_file);
        buffer::delete_file(pool.data_dir(), &columns_file)?;

        let records_file = record_file(name);
        pool.remove_file(&records_file);
        buffer::delete_file(pool.data_dir(), &records_file)?;

        let mut hf = HeapFile::open(pool, TABLES_FILE)?;
        hf.delete(record_id)?;
        drop(hf);

        self.tables.remove(name);
        Ok(())
    }

    /// Create a B+-tree index on a unique column.
    pub fn create_index(
        &mut self,
        pool: &mut BufferPool,
        name: &str,
        table: &str,
        column: &str,
    ) -> DbResult<()> {
        if self.indices.contains_key(name) {
            return Err(DbError::Schema(format!("index '{name}' already exists")));
        }
        let schema = self
            .tables
            .get(table)
            .map(|e| &e.schema)
            .ok_or_else(|| DbError::Schema(format!("table '{table}' does not exist")))?;
        let col_idx = schema
            .column_index(column)
            .ok_or_else(|| DbError::Schema(format!("unknown column '{column}' on table '{table}'")))?;
        if !schema.is_unique_column(col_idx) {
            return Err(DbError::Schema(format!(
                "index target column '{column}' is not declared UNIQUE"
            )));
        }
        if self.index_on(table, column).is_some() {
            return Err(DbError::Schema(format!(
                "an index already exists on '{table}({column})'"
            )));
        }
        let key_len = schema.columns[col_idx].type_code.size();

        BPTree::create(pool, &index_file(name), key_len, None)?;
        let mut row = vec![0u8; NAME_LEN * 3];
        write_fixed(&mut row, 0, NAME_LEN, name)?;
        write_fixed(&mut row, NAME_LEN, NAME_LEN, table)?;
        write_fixed(&mut row, NAME_LEN * 2, NAME_LEN, column)?;
        let mut hf = HeapFile::open(pool, INDICES_FILE)?;
        let record_id = hf.add(&row)?;
        drop(hf);

        self.indices.insert(
            name.to_string(),
            IndexEntry {
                record_id,
                meta: IndexMeta {
                    name: name.to_string(),
                    table: table.to_string(),
                    column: column.to_string(),
                },
            },
        );
        Ok(())
    }

    pub fn drop_index(&mut self, pool: &mut BufferPool, name: &str) -> DbResult<()> {
        let record_id = self
            .indices
            .get(name)
            .map(|e| e.record_id)
            .ok_or_else(|| DbError::Schema(format!("index '{name}' does not exist")))?;

        let file = index_file(name);
        pool.remove_file(&file);
        buffer::delete_file(pool.data_dir(), &file)?;

        let mut hf = HeapFile::open(pool, INDICES_FILE)?;
        hf.delete(record_id)?;
        drop(hf);

        self.indices.remove(name);
        Ok(())
    }
}
