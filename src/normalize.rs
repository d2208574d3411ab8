// Loss-rate cleanup for annex4
//
// Rates arrive as "12.5%", " 7% " or "3.0". The percent sign is dropped and
// the magnitude kept as-is: "12.5%" is stored as 12.5, never 0.125.

use crate::error::{ImportError, InvalidNumber, Result};
use crate::loader::{Cell, Table, TableTransform};
use crate::schema::LOSS_RATES;

/// Strip every `%`, trim whitespace, parse as a finite `f64`.
///
/// # Examples
/// ```
/// use annex_import::normalize_loss_rate;
///
/// assert_eq!(normalize_loss_rate("12.5%").unwrap(), 12.5);
/// assert_eq!(normalize_loss_rate(" 7% ").unwrap(), 7.0);
/// assert!(normalize_loss_rate("abc").is_err());
/// ```
pub fn normalize_loss_rate(raw: &str) -> std::result::Result<f64, InvalidNumber> {
    parse_number(&raw.replace('%', "")).map_err(|_| InvalidNumber {
        value: raw.to_string(),
    })
}

/// Parse trimmed text as a finite `f64`.
pub fn parse_number(raw: &str) -> std::result::Result<f64, InvalidNumber> {
    let invalid = || InvalidNumber {
        value: raw.to_string(),
    };

    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Applies [`normalize_loss_rate`] to the `Loss_Rate` column.
pub struct LossRateNormalizer {
    column: &'static str,
}

impl LossRateNormalizer {
    pub fn new() -> Self {
        LossRateNormalizer {
            column: LOSS_RATES.columns[2].name,
        }
    }
}

impl Default for LossRateNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableTransform for LossRateNormalizer {
    fn name(&self) -> &str {
        "loss_rate_normalizer"
    }

    fn apply(&self, table: &mut Table) -> Result<()> {
        let index = table
            .columns
            .iter()
            .position(|c| c == self.column)
            .ok_or_else(|| ImportError::SchemaMismatch {
                table: table.name.clone(),
                expected: LOSS_RATES.column_count(),
                found: table.columns.len(),
            })?;

        let table_name = table.name.clone();
        for (row_num, row) in table.rows.iter_mut().enumerate() {
            // Cells are coerced to text first, so a missing rate fails like any other bad text
            let text = match &row[index] {
                Cell::Null => String::new(),
                Cell::Text(s) => s.clone(),
                Cell::Real(v) => v.to_string(),
            };

            let rate = normalize_loss_rate(&text).map_err(|e| ImportError::Parse {
                table: table_name.clone(),
                column: self.column.to_string(),
                row: row_num + 1,
                value: e.value,
            })?;

            row[index] = Cell::Real(rate);
        }

        Ok(())
    }
}
