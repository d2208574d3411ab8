use crate::error::Result;
use crate::schema::{quote_ident, CANONICAL_SCHEMAS};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Open (or create) the store file.
///
/// The connection closes when dropped, so callers own it for exactly as
/// long as they need it.
pub fn open_store(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    info!(path = %db_path.display(), "store opened");
    Ok(conn)
}

/// Create every canonical table that does not exist yet.
///
/// Safe to run repeatedly: existing tables keep their structure and rows.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    for schema in CANONICAL_SCHEMAS.iter() {
        let sql = schema.create_sql();
        debug!(table = schema.name, %sql, "create if absent");
        conn.execute(&sql, [])?;
    }

    info!(tables = CANONICAL_SCHEMAS.len(), "schema registered");
    Ok(())
}

pub fn verify_count(conn: &Connection, table: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Column names of a stored table, in declaration order
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ITEM_CATALOG, LOSS_RATES};

    #[test]
    fn test_setup_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        for schema in CANONICAL_SCHEMAS.iter() {
            assert_eq!(
                table_columns(&conn, schema.name).unwrap(),
                schema.column_names(),
                "columns of {}",
                schema.name
            );
            assert_eq!(verify_count(&conn, schema.name).unwrap(), 0);
        }
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        conn.execute(
            "INSERT INTO annex1 (Item_Code, Item_Name, Category_Code, Category_Name) VALUES ('I001', 'Apple', 'C1', 'Fruit')",
            [],
        )
        .unwrap();

        // Second run must not error nor touch existing rows
        setup_database(&conn).unwrap();
        assert_eq!(verify_count(&conn, ITEM_CATALOG.name).unwrap(), 1);
    }

    #[test]
    fn test_setup_keeps_foreign_structure() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE annex4 (legacy TEXT)", []).unwrap();

        setup_database(&conn).unwrap();
        assert_eq!(table_columns(&conn, LOSS_RATES.name).unwrap(), vec!["legacy"]);
    }

    #[test]
    fn test_primary_key_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let insert = "INSERT INTO annex4 (Item_Code, Item_Name, Loss_Rate) VALUES ('I001', 'Apple', 1.0)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_open_store_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("store.db");

        let conn = open_store(&path).unwrap();
        setup_database(&conn).unwrap();
        drop(conn);

        assert!(path.exists());
    }
}
