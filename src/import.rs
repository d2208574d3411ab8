// Import driver: registrar, then the four loaders in fixed order
//
// There is no transaction spanning the four tables. If annex3 fails,
// annex1 and annex2 stay replaced and annex3/annex4 keep their previous
// contents.

use crate::db::{open_store, setup_database};
use crate::error::Result;
use crate::loader::{load_table, TableReport, TableTransform};
use crate::normalize::LossRateNormalizer;
use crate::schema::{TableSchema, ITEM_CATALOG, LOSS_RATES, SALES_TRANSACTIONS, WHOLESALE_PRICES};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_DB_NAME: &str = "projet_data.db";

/// Where the import reads from and writes to
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Directory holding annex1.csv .. annex4.csv
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            data_dir: PathBuf::from("."),
            db_path: PathBuf::from(DEFAULT_DB_NAME),
        }
    }
}

impl ImportConfig {
    pub fn source_path(&self, schema: &TableSchema) -> PathBuf {
        self.data_dir.join(schema.source_file)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub db_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u128,
    pub tables: Vec<TableReport>,
}

impl ImportSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Run the whole import once.
///
/// The store connection lives only inside this call and is released on
/// every return path, error or not.
pub fn run_import(config: &ImportConfig) -> Result<ImportSummary> {
    let started_at = Utc::now();
    let clock = Instant::now();

    let mut conn = open_store(&config.db_path)?;
    setup_database(&conn)?;

    let normalizer = LossRateNormalizer::new();
    let steps: [(&TableSchema, Option<&dyn TableTransform>); 4] = [
        (&ITEM_CATALOG, None),
        (&SALES_TRANSACTIONS, None),
        (&WHOLESALE_PRICES, None),
        (&LOSS_RATES, Some(&normalizer as &dyn TableTransform)),
    ];

    let mut tables = Vec::with_capacity(steps.len());
    for (schema, transform) in steps {
        let report = load_table(&mut conn, &config.source_path(schema), schema, transform)?;
        tables.push(report);
    }

    let summary = ImportSummary {
        db_path: config.db_path.clone(),
        started_at,
        elapsed_ms: clock.elapsed().as_millis(),
        tables,
    };

    info!(
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        elapsed_ms = summary.elapsed_ms as u64,
        "import complete"
    );
    if let Ok(json) = serde_json::to_string(&summary) {
        debug!(summary = %json, "import summary");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{table_columns, verify_count};
    use crate::error::ImportError;
    use crate::schema::CANONICAL_SCHEMAS;
    use rusqlite::Connection;
    use std::fs;
    use tempfile::TempDir;

    fn write_fixtures(dir: &TempDir) {
        let files = [
            (
                "annex1.csv",
                "单品编码,单品名称,分类编码,分类名称\nI001,Apple,C1,Fruit\nI002,Pear,C1,Fruit\n",
            ),
            (
                "annex2.csv",
                "销售日期,扫码销售时间,单品编码,销量,销售单价,销售类型,是否打折销售\n\
                 2024-01-01,08:00,I001,5.0,3.2,sale,0\n\
                 2024-01-01,08:05,I001,5.0,3.2,sale,0\n\
                 2024-01-02,10:30,I002,-1,4,return,1\n",
            ),
            ("annex3.csv", "日期,单品编码,批发价格\n2024-01-01,I001,2.1\n2024-01-01,I002,3\n"),
            ("annex4.csv", "单品编码,单品名称,损耗率\nI001,Apple,12.5%\nI002,Pear, 7% \n"),
        ];
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
    }

    fn config_for(dir: &TempDir) -> ImportConfig {
        ImportConfig {
            data_dir: dir.path().to_path_buf(),
            db_path: dir.path().join(DEFAULT_DB_NAME),
        }
    }

    fn dump(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", table))
            .unwrap();
        let width = stmt.column_count();
        stmt.query_map([], |row| {
            let mut fields = Vec::with_capacity(width);
            for i in 0..width {
                let value: rusqlite::types::Value = row.get(i)?;
                fields.push(format!("{:?}", value));
            }
            Ok(fields.join("|"))
        })
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap()
    }

    #[test]
    fn test_default_config_uses_working_directory() {
        let config = ImportConfig::default();
        assert_eq!(config.db_path, PathBuf::from("projet_data.db"));
        assert_eq!(config.source_path(&LOSS_RATES), PathBuf::from("./annex4.csv"));
    }

    #[test]
    fn test_full_import() {
        let dir = TempDir::new().unwrap();
        write_fixtures(&dir);
        let config = config_for(&dir);

        let summary = run_import(&config).unwrap();
        let rows: Vec<(&str, usize)> = summary.tables.iter().map(|t| (t.table.as_str(), t.rows)).collect();
        assert_eq!(rows, vec![("annex1", 2), ("annex2", 3), ("annex3", 2), ("annex4", 2)]);
        assert_eq!(summary.total_rows(), 9);

        let conn = Connection::open(&config.db_path).unwrap();
        for schema in CANONICAL_SCHEMAS.iter() {
            assert_eq!(table_columns(&conn, schema.name).unwrap(), schema.column_names());
        }

        let rates: Vec<f64> = conn
            .prepare("SELECT Loss_Rate FROM annex4 ORDER BY Item_Code")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(rates, vec![12.5, 7.0]);
    }

    #[test]
    fn test_import_twice_is_identical() {
        let dir = TempDir::new().unwrap();
        write_fixtures(&dir);
        let config = config_for(&dir);

        let first = run_import(&config).unwrap();
        let conn = Connection::open(&config.db_path).unwrap();
        let before: Vec<Vec<String>> = CANONICAL_SCHEMAS.iter().map(|s| dump(&conn, s.name)).collect();
        drop(conn);

        let second = run_import(&config).unwrap();
        let conn = Connection::open(&config.db_path).unwrap();
        let after: Vec<Vec<String>> = CANONICAL_SCHEMAS.iter().map(|s| dump(&conn, s.name)).collect();

        assert_eq!(before, after);
        for (a, b) in first.tables.iter().zip(second.tables.iter()) {
            assert_eq!(a.source_sha256, b.source_sha256);
            assert_eq!(a.rows, b.rows);
        }
    }

    #[test]
    fn test_bad_loss_rate_aborts_after_earlier_tables() {
        let dir = TempDir::new().unwrap();
        write_fixtures(&dir);
        let config = config_for(&dir);
        run_import(&config).unwrap();

        fs::write(dir.path().join("annex1.csv"), "a,b,c,d\nI003,Plum,C1,Fruit\n").unwrap();
        fs::write(dir.path().join("annex4.csv"), "a,b,c\nI001,Apple,abc\n").unwrap();

        let err = run_import(&config).unwrap_err();
        assert!(matches!(err, ImportError::Parse { ref column, .. } if column == "Loss_Rate"));

        // annex1 was replaced before the failure, annex4 kept its previous rows
        let conn = Connection::open(&config.db_path).unwrap();
        assert_eq!(verify_count(&conn, "annex1").unwrap(), 1);
        assert_eq!(verify_count(&conn, "annex4").unwrap(), 2);
    }

    #[test]
    fn test_missing_source_file_fails() {
        let dir = TempDir::new().unwrap();
        write_fixtures(&dir);
        fs::remove_file(dir.path().join("annex3.csv")).unwrap();

        let err = run_import(&config_for(&dir)).unwrap_err();
        match err {
            ImportError::Io { path, .. } => assert!(path.ends_with("annex3.csv")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_summary_serializes() {
        let dir = TempDir::new().unwrap();
        write_fixtures(&dir);

        let summary = run_import(&config_for(&dir)).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tables"][3]["table"], "annex4");
        assert_eq!(json["tables"][3]["rows"], 2);
    }
}
