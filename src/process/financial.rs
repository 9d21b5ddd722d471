use tracing::{debug, warn};

use crate::ingest::RawTable;
use crate::model::{FinancialRecord, Quarter, RegistryKey};
use crate::process::{
    key::normalize_key,
    period::PeriodHint,
    utils::{coerce_amount, non_empty},
};
use crate::schema::{description_column, ColumnMap, Role};

/// Turn filtered ledger rows into canonical records.
///
/// Nothing is dropped here: a missing key column leaves every key
/// [`RegistryKey::Invalid`], a missing value column leaves every amount 0.
pub fn canonicalize_ledger(
    table: &RawTable,
    columns: &ColumnMap,
    fallback_year: i32,
    fallback_quarter: Quarter,
) -> Vec<FinancialRecord> {
    let key_col = columns.index(Role::RegistryId);
    let value_col = columns.index(Role::AccountValue);
    let desc_col = description_column(&table.headers);
    let period_col = columns.index(Role::Period);

    if key_col.is_none() {
        warn!(
            source = %table.source,
            available = ?table.headers,
            "no registry id column; rows will stay unenriched"
        );
    }
    if value_col.is_none() {
        warn!(
            source = %table.source,
            available = ?table.headers,
            "no value column; amounts default to 0"
        );
    }

    let file_hint = PeriodHint::from_text(&table.source);
    debug!(source = %table.source, ?file_hint, "period from file name");

    table
        .rows
        .iter()
        .map(|row| {
            let cell = |col: Option<usize>| col.and_then(|i| row.get(i)).map(String::as_str);

            let registry_id = cell(key_col).map_or(RegistryKey::Invalid, normalize_key);
            let amount = cell(value_col).map_or(0.0, coerce_amount);
            let description = cell(desc_col).and_then(non_empty);
            let row_hint = cell(period_col).map(PeriodHint::from_cell).unwrap_or_default();
            let (year, quarter) = file_hint.or(row_hint).resolve(fallback_year, fallback_quarter);

            FinancialRecord {
                registry_id,
                year,
                quarter,
                amount,
                description,
            }
        })
        .collect()
}
