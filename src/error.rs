use std::path::PathBuf;
use thiserror::Error;

/// Every failure aborts the import; nothing here is recovered from.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: source has {found} columns, canonical schema expects {expected}")]
    SchemaMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("{table}.{column} row {row}: cannot parse {value:?} as a number")]
    Parse {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Text that does not parse as a finite number
#[derive(Error, Debug, Clone, PartialEq)]
#[error("not a finite number: {value:?}")]
pub struct InvalidNumber {
    pub value: String,
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, ImportError>;
