// Annex Import - Core Library
// Loads the four annex CSV files into a SQLite store

pub mod db;
pub mod error;
pub mod import;
pub mod loader;
pub mod normalize;
pub mod schema;

// Re-export commonly used types
pub use db::{open_store, setup_database, table_columns, verify_count};
pub use error::{ImportError, InvalidNumber, Result};
pub use import::{run_import, ImportConfig, ImportSummary, DEFAULT_DB_NAME};
pub use loader::{
    load_table, parse_table, read_source, read_table, replace_table,
    Cell, Table, TableReport, TableTransform,
};
pub use normalize::{normalize_loss_rate, parse_number, LossRateNormalizer};
pub use schema::{
    Column, ColumnType, TableSchema,
    CANONICAL_SCHEMAS, ITEM_CATALOG, LOSS_RATES, SALES_TRANSACTIONS, WHOLESALE_PRICES,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
