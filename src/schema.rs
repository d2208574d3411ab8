// Canonical table schemas for the four annex files
//
// Source headers are never consulted: the Nth CSV column is stored under
// the Nth canonical column name. If a supplier reorders columns the data
// lands under the wrong names, so column order in these tables is the
// contract with the source files.

use serde::Serialize;

// ============================================================================
// COLUMN TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Text,
    Real,
}

impl ColumnType {
    /// SQLite type name used in CREATE TABLE
    pub fn sql_type(&self) -> &str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub primary_key: bool,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Column {
            name,
            column_type: ColumnType::Text,
            primary_key: false,
        }
    }

    pub const fn real(name: &'static str) -> Self {
        Column {
            name,
            column_type: ColumnType::Real,
            primary_key: false,
        }
    }

    /// Text column declared PRIMARY KEY
    pub const fn key(name: &'static str) -> Self {
        Column {
            name,
            column_type: ColumnType::Text,
            primary_key: true,
        }
    }
}

// ============================================================================
// TABLE SCHEMA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Table name in the store
    pub name: &'static str,
    /// CSV file the table is loaded from, relative to the data directory
    pub source_file: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", quote_ident(c.name), c.column_type.sql_type());
                if c.primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                def
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_ident(self.name),
            columns.join(",\n    ")
        )
    }

    pub fn insert_sql(&self) -> String {
        let names: Vec<String> = self.columns.iter().map(|c| quote_ident(c.name)).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{}", i)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(self.name),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

/// Double-quote an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// CANONICAL SCHEMAS
// ============================================================================

pub static ITEM_CATALOG: TableSchema = TableSchema {
    name: "annex1",
    source_file: "annex1.csv",
    columns: &[
        Column::key("Item_Code"),
        Column::text("Item_Name"),
        Column::text("Category_Code"),
        Column::text("Category_Name"),
    ],
};

pub static SALES_TRANSACTIONS: TableSchema = TableSchema {
    name: "annex2",
    source_file: "annex2.csv",
    columns: &[
        Column::text("Date"),
        Column::text("Time"),
        Column::text("Item_Code"),
        Column::real("Quantity_Sold"),
        Column::real("Unit_Selling_Price"),
        Column::text("Sale_or_Return"),
        Column::text("Discount"),
    ],
};

pub static WHOLESALE_PRICES: TableSchema = TableSchema {
    name: "annex3",
    source_file: "annex3.csv",
    columns: &[
        Column::text("Date"),
        Column::text("Item_Code"),
        Column::real("Wholesale_Price"),
    ],
};

pub static LOSS_RATES: TableSchema = TableSchema {
    name: "annex4",
    source_file: "annex4.csv",
    columns: &[
        Column::key("Item_Code"),
        Column::text("Item_Name"),
        Column::real("Loss_Rate"),
    ],
};

/// All tables in load order
pub static CANONICAL_SCHEMAS: [&TableSchema; 4] =
    [&ITEM_CATALOG, &SALES_TRANSACTIONS, &WHOLESALE_PRICES, &LOSS_RATES];
