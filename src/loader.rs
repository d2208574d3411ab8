// Generic table loader: CSV file -> canonical table -> store
//
// One loader serves all four annex files. Each load reads the whole file,
// renames columns by position, runs the optional transform, coerces cells
// to the schema types and replaces the table in a single transaction.

use crate::db::verify_count;
use crate::error::{ImportError, Result};
use crate::normalize::parse_number;
use crate::schema::{quote_ident, ColumnType, TableSchema};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One field of a loaded row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Real(f64),
}

impl Cell {
    /// Raw CSV field; an empty field is a missing value
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Null
        } else {
            Cell::Text(field.to_string())
        }
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Cell::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
        })
    }
}

/// Full in-memory row set of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Coerce every cell to its canonical column type.
    ///
    /// REAL columns must hold a number or nothing; anything else is a
    /// parse error naming the 1-based data row.
    pub fn conform(mut self, schema: &TableSchema) -> Result<Table> {
        check_column_count(schema, self.columns.len())?;

        for (row_num, row) in self.rows.iter_mut().enumerate() {
            for (column, cell) in schema.columns.iter().zip(row.iter_mut()) {
                if column.column_type != ColumnType::Real {
                    continue;
                }
                if let Cell::Text(text) = cell {
                    let value = parse_number(text).map_err(|e| ImportError::Parse {
                        table: schema.name.to_string(),
                        column: column.name.to_string(),
                        row: row_num + 1,
                        value: e.value,
                    })?;
                    *cell = Cell::Real(value);
                }
            }
        }

        Ok(self)
    }
}

/// Per-table step run between reading and writing
pub trait TableTransform {
    fn name(&self) -> &str;

    fn apply(&self, table: &mut Table) -> Result<()>;
}

/// Outcome of loading one table
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    pub source: PathBuf,
    pub rows: usize,
    /// SHA-256 of the source file, hex encoded
    pub source_sha256: String,
}

// ============================================================================
// READ
// ============================================================================

fn check_column_count(schema: &TableSchema, found: usize) -> Result<()> {
    if found != schema.column_count() {
        return Err(ImportError::SchemaMismatch {
            table: schema.name.to_string(),
            expected: schema.column_count(),
            found,
        });
    }
    Ok(())
}

pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse CSV bytes into a table carrying the canonical column names.
///
/// The header row only fixes the column count; its text is discarded.
pub fn parse_table(bytes: &[u8], path: &Path, schema: &TableSchema) -> Result<Table> {
    let csv_error = |source: csv::Error| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(csv_error)?.clone();
    check_column_count(schema, headers.len())?;
    debug!(
        table = schema.name,
        source_headers = ?headers.iter().collect::<Vec<_>>(),
        "renaming columns by position"
    );

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        rows.push(record.iter().map(Cell::from_field).collect());
    }

    Ok(Table {
        name: schema.name.to_string(),
        columns: schema.column_names().iter().map(|c| c.to_string()).collect(),
        rows,
    })
}

pub fn read_table(path: &Path, schema: &TableSchema) -> Result<Table> {
    let bytes = read_source(path)?;
    parse_table(&bytes, path, schema)
}

// ============================================================================
// WRITE
// ============================================================================

/// Replace the stored table with exactly `table`'s rows.
///
/// Drop, recreate and insert run in one transaction: on error the previous
/// table is left as it was.
pub fn replace_table(conn: &mut Connection, schema: &TableSchema, table: &Table) -> Result<usize> {
    check_column_count(schema, table.columns.len())?;

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(schema.name)), [])?;
    tx.execute(&schema.create_sql(), [])?;

    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(&schema.insert_sql())?;
        for row in &table.rows {
            stmt.execute(params_from_iter(row.iter()))?;
            inserted += 1;
        }
    }

    tx.commit()?;
    Ok(inserted)
}

/// Read, rename, transform, coerce and replace one table.
pub fn load_table(
    conn: &mut Connection,
    path: &Path,
    schema: &TableSchema,
    transform: Option<&dyn TableTransform>,
) -> Result<TableReport> {
    let bytes = read_source(path)?;
    let source_sha256 = format!("{:x}", Sha256::digest(&bytes));

    let mut table = parse_table(&bytes, path, schema)?;
    info!(table = schema.name, rows = table.row_count(), source = %path.display(), "read source");

    if let Some(transform) = transform {
        debug!(table = schema.name, transform = transform.name(), "applying transform");
        transform.apply(&mut table)?;
    }

    let table = table.conform(schema)?;
    let inserted = replace_table(conn, schema, &table)?;
    let stored = verify_count(conn, schema.name)?;
    info!(table = schema.name, inserted, stored, "table replaced");

    Ok(TableReport {
        table: schema.name.to_string(),
        source: path.to_path_buf(),
        rows: stored as usize,
        source_sha256,
    })
}
