use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::ingest::RawTable;
use crate::model::{RegistryEntry, RegistryKey};
use crate::process::{key::normalize_key, utils::non_empty};
use crate::schema::{ColumnMap, Role};

/// Registry rows in canonical form, before deduplication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRegistry {
    pub entries: Vec<RegistryEntry>,
    /// Rows whose registry id could not be normalized; they never enter the join.
    pub invalid_keys: usize,
}

/// Keep the digits of a tax id, dropping dots, slashes and dashes.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Canonicalize registry rows. `None` when no column can serve as the
/// registry id, in which case the table cannot take part in the join.
pub fn canonicalize_registry(table: &RawTable, columns: &ColumnMap) -> Option<CanonicalRegistry> {
    let Some(key_col) = columns.index(Role::RegistryId) else {
        warn!(
            source = %table.source,
            available = ?table.headers,
            "registry has no registry id column"
        );
        return None;
    };
    let tax_col = columns.index(Role::TaxId);
    let name_col = columns.index(Role::LegalName);
    let region_col = columns.index(Role::Region);

    let mut out = CanonicalRegistry::default();
    for row in &table.rows {
        let cell = |col: Option<usize>| col.and_then(|i| row.get(i)).map(String::as_str);

        let RegistryKey::Id(registry_id) = normalize_key(cell(Some(key_col)).unwrap_or("")) else {
            out.invalid_keys += 1;
            continue;
        };
        out.entries.push(RegistryEntry {
            registry_id,
            tax_id: cell(tax_col).map(digits_only).unwrap_or_default(),
            legal_name: cell(name_col).and_then(non_empty),
            region: cell(region_col)
                .and_then(non_empty)
                .map(|r| r.to_uppercase()),
        });
    }

    if out.invalid_keys > 0 {
        warn!(
            source = %table.source,
            invalid = out.invalid_keys,
            "registry rows with unusable ids left out of the join"
        );
    }
    debug!(source = %table.source, rows = out.entries.len(), "registry canonicalized");
    Some(out)
}

/// One entry per registry id; the first occurrence in source order wins and
/// later duplicates are discarded whole, never merged.
pub fn deduplicate(entries: &[RegistryEntry]) -> Vec<RegistryEntry> {
    let mut seen: HashSet<u64> = HashSet::with_capacity(entries.len());
    let unique: Vec<RegistryEntry> = entries
        .iter()
        .filter(|e| seen.insert(e.registry_id))
        .cloned()
        .collect();

    let collapsed = entries.len() - unique.len();
    if collapsed > 0 {
        info!(collapsed, kept = unique.len(), "collapsed duplicate registry rows");
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::map_columns;

    fn entry(id: u64, name: &str) -> RegistryEntry {
        RegistryEntry {
            registry_id: id,
            tax_id: "11222333000181".into(),
            legal_name: Some(name.into()),
            region: Some("SP".into()),
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let entries = vec![entry(500, "FIRST"), entry(7, "OTHER"), entry(500, "SECOND")];
        let unique = deduplicate(&entries);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].legal_name.as_deref(), Some("FIRST"));
        assert_eq!(unique[1].registry_id, 7);
    }

    #[test]
    fn deduplication_is_idempotent() {
        let entries = vec![entry(1, "A"), entry(2, "B"), entry(1, "C"), entry(2, "D"), entry(3, "E")];
        let once = deduplicate(&entries);
        let twice = deduplicate(&once);
        assert_eq!(once, twice);
        let ids: HashSet<u64> = once.iter().map(|e| e.registry_id).collect();
        assert_eq!(ids.len(), once.len());
    }

    #[test]
    fn registry_rows_are_canonicalized() {
        let table = RawTable {
            source: "Relatorio_cadop.csv".into(),
            headers: ["Registro_ANS", "CNPJ", "Razao_Social", "UF"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: vec![
                vec!["419761".into(), "11.222.333/0001-81".into(), " ACME SAUDE ".into(), "sp".into()],
                vec!["n/a".into(), "1".into(), "GHOST".into(), "RJ".into()],
                vec!["0".into(), "".into(), "".into(), "".into()],
            ],
            ..RawTable::default()
        };
        let reg = canonicalize_registry(&table, &map_columns(&table.headers)).unwrap();
        assert_eq!(reg.invalid_keys, 1);
        assert_eq!(reg.entries.len(), 2);
        assert_eq!(
            reg.entries[0],
            RegistryEntry {
                registry_id: 419761,
                tax_id: "11222333000181".into(),
                legal_name: Some("ACME SAUDE".into()),
                region: Some("SP".into()),
            }
        );
        assert_eq!(reg.entries[1].registry_id, 0);
        assert_eq!(reg.entries[1].legal_name, None);
    }

    #[test]
    fn registry_without_key_column_is_unusable() {
        let table = RawTable {
            source: "cadop.csv".into(),
            headers: vec!["CNPJ".into(), "UF".into()],
            rows: vec![vec!["1".into(), "SP".into()]],
            ..RawTable::default()
        };
        assert!(canonicalize_registry(&table, &map_columns(&table.headers)).is_none());
    }
}
