//! Record engine: table scan filtering and unique-constraint enforcement
//! on top of a table's `HeapFile`.
//!
//! Drives `HeapFile` with a linear scan for `select`/`delete`, and a linear
//! uniqueness scan before every `insert`.


use buffer::BufferPool;
use catalog::TableSchema;
use common::{DbResult, RecordId};
use storage::HeapFile;
use types::{Comparator, Value};

/// A resolved `(column, comparator, value)` triple, produced by the executor
/// once column names have been looked up against a schema. All predicates of
/// a statement are implicitly ANDed together.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub column: usize,
    pub comparator: Comparator,
    pub value: Value,
}

fn row_matches(row: &[Value], predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| {
        row[p.column]
            .compare(&p.value)
            .is_some_and(|ord| p.comparator.matches(ord))
    })
}

/// Outcome of [`insert`]: either the new record-id, or the name of the
/// unique column that already held a matching value.
pub enum InsertOutcome {
    Inserted(RecordId),
    Duplicate { column: String },
}

/// Full table scan, keeping live rows for which every predicate holds.
pub fn scan_filter(
    pool: &mut BufferPool,
    schema: &TableSchema,
    predicates: &[Predicate],
) -> DbResult<Vec<(RecordId, Vec<Value>)>> {
    let mut hf = HeapFile::open(pool, &catalog::record_file(&schema.name))?;
    let mut out = Vec::new();
    while let Some((id, payload)) = hf.next_record()? {
        let row = schema.decode_row(&payload);
        if row_matches(&row, predicates) {
            out.push((id, row));
        }
    }
    Ok(out)
}

/// Random-access read of a single live row, used by the index shortcut
/// once a record-id has been resolved.
pub fn read_row(pool: &mut BufferPool, schema: &TableSchema, id: RecordId) -> DbResult<Option<Vec<Value>>> {
    let mut hf = HeapFile::open(pool, &catalog::record_file(&schema.name))?;
    Ok(hf.read(id)?.map(|payload| schema.decode_row(&payload)))
}

/// Insert a row, rejecting it if any unique column collides byte-for-byte
/// with a live record already in the table.
pub fn insert(pool: &mut BufferPool, schema: &TableSchema, values: &[Value]) -> DbResult<InsertOutcome> {
    let payload = schema.encode_row(values)?;
    let unique_columns: Vec<usize> = (0..schema.columns.len())
        .filter(|&idx| schema.is_unique_column(idx))
        .collect();

    if !unique_columns.is_empty() {
        let record_file = catalog::record_file(&schema.name);
        let mut hf = HeapFile::open(pool, &record_file)?;
        while let Some((_, existing)) = hf.next_record()? {
            for &idx in &unique_columns {
                let offset = schema.offset(idx);
                let size = schema.columns[idx].type_code.size();
                if existing[offset..offset + size] == payload[offset..offset + size] {
                    return Ok(InsertOutcome::Duplicate {
                        column: schema.columns[idx].name.clone(),
                    });
                }
            }
        }
    }

    let mut hf = HeapFile::open(pool, &catalog::record_file(&schema.name))?;
    let id = hf.add(&payload)?;
    Ok(InsertOutcome::Inserted(id))
}

/// Delete a set of record-ids from a table's heap file.
pub fn remove(pool: &mut BufferPool, schema: &TableSchema, ids: &[RecordId]) -> DbResult<()> {
    let mut hf = HeapFile::open(pool, &catalog::record_file(&schema.name))?;
    for &id in ids {
        hf.delete(id)?;
    }
    Ok(())
}
