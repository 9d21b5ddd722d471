// src/enrich/mod.rs

use std::collections::HashMap;
use tracing::{info, instrument};

use crate::model::{EnrichedRecord, FinancialRecord, RegistryEntry};

/// Hash index over a deduplicated registry.
pub struct RegistryIndex<'a> {
    by_id: HashMap<u64, &'a RegistryEntry>,
}

impl<'a> RegistryIndex<'a> {
    /// Build the index. With duplicate ids the first entry is kept, matching
    /// the deduplicator, so an undeduplicated slice still joins deterministically.
    pub fn new(entries: &'a [RegistryEntry]) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for e in entries {
            by_id.entry(e.registry_id).or_insert(e);
        }
        Self { by_id }
    }

    pub fn get(&self, id: u64) -> Option<&'a RegistryEntry> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Join outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub matched: usize,
    pub unmatched: usize,
    pub invalid_keys: usize,
}

/// Left join of `records` onto `registry` by registry id.
///
/// Every input record appears exactly once in the output, in input order:
/// invalid keys and ids the registry does not know simply stay unenriched.
#[instrument(level = "info", skip_all, fields(records = records.len(), registry = registry.len()))]
pub fn enrich(
    records: &[FinancialRecord],
    registry: &[RegistryEntry],
) -> (Vec<EnrichedRecord>, JoinStats) {
    let index = RegistryIndex::new(registry);
    let mut stats = JoinStats::default();

    let out: Vec<EnrichedRecord> = records
        .iter()
        .map(|rec| match rec.registry_id.id() {
            None => {
                stats.invalid_keys += 1;
                EnrichedRecord::unmatched(rec.clone())
            }
            Some(id) => match index.get(id) {
                Some(entry) => {
                    stats.matched += 1;
                    EnrichedRecord::with_entry(rec.clone(), entry)
                }
                None => {
                    stats.unmatched += 1;
                    EnrichedRecord::unmatched(rec.clone())
                }
            },
        })
        .collect();

    info!(
        matched = stats.matched,
        unmatched = stats.unmatched,
        invalid_keys = stats.invalid_keys,
        "join complete"
    );
    (out, stats)
}

/// The un-enriched table returned when the registry side is unusable.
pub fn passthrough(records: &[FinancialRecord]) -> Vec<EnrichedRecord> {
    records.iter().cloned().map(EnrichedRecord::unmatched).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Quarter, RegistryKey};

    fn record(key: RegistryKey, amount: f64) -> FinancialRecord {
        FinancialRecord {
            registry_id: key,
            year: 2024,
            quarter: Quarter::Q1,
            amount,
            description: Some("EVENTOS".into()),
        }
    }

    fn entry(id: u64, name: &str, region: &str) -> RegistryEntry {
        RegistryEntry {
            registry_id: id,
            tax_id: "11222333000181".into(),
            legal_name: Some(name.into()),
            region: Some(region.into()),
        }
    }

    #[test]
    fn matched_records_pick_up_registry_fields() {
        let records = vec![record(RegistryKey::Id(1), 10.0)];
        let registry = vec![entry(1, "ACME", "SP")];
        let (out, stats) = enrich(&records, &registry);
        assert_eq!(out.len(), 1);
        assert!(out[0].matched);
        assert_eq!(out[0].tax_id.as_deref(), Some("11222333000181"));
        assert_eq!(out[0].legal_name.as_deref(), Some("ACME"));
        assert_eq!(out[0].region.as_deref(), Some("SP"));
        assert_eq!(out[0].record, records[0]);
        assert_eq!(stats.matched, 1);
    }

    #[test]
    fn unknown_id_is_retained_unenriched() {
        let records = vec![record(RegistryKey::Id(999), 5.0)];
        let registry = vec![entry(1, "ACME", "SP")];
        let (out, stats) = enrich(&records, &registry);
        assert_eq!(out.len(), 1);
        assert!(!out[0].matched);
        assert_eq!(out[0].tax_id, None);
        assert_eq!(out[0].legal_name, None);
        assert_eq!(out[0].region, None);
        assert_eq!(stats.unmatched, 1);
    }

    #[test]
    fn left_join_never_changes_row_count_or_order() {
        let records: Vec<FinancialRecord> = (0..50)
            .map(|i| {
                let key = if i % 7 == 0 { RegistryKey::Invalid } else { RegistryKey::Id(i % 5) };
                record(key, i as f64)
            })
            .collect();
        let registry = vec![entry(1, "A", "SP"), entry(3, "B", "RJ")];
        let (out, stats) = enrich(&records, &registry);
        assert_eq!(out.len(), records.len());
        assert_eq!(stats.matched + stats.unmatched + stats.invalid_keys, records.len());
        for (o, r) in out.iter().zip(&records) {
            assert_eq!(&o.record, r);
        }
    }

    #[test]
    fn zero_is_joinable_but_invalid_is_not() {
        let records = vec![record(RegistryKey::Id(0), 1.0), record(RegistryKey::Invalid, 1.0)];
        let registry = vec![entry(0, "ZERO", "MG")];
        let (out, stats) = enrich(&records, &registry);
        assert!(out[0].matched);
        assert!(!out[1].matched);
        assert_eq!(stats.invalid_keys, 1);
    }

    #[test]
    fn index_keeps_first_duplicate() {
        let registry = vec![entry(500, "FIRST", "SP"), entry(500, "SECOND", "RJ")];
        let index = RegistryIndex::new(&registry);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(500).and_then(|e| e.legal_name.as_deref()), Some("FIRST"));
    }

    #[test]
    fn passthrough_keeps_everything() {
        let records = vec![record(RegistryKey::Id(1), 1.0), record(RegistryKey::Invalid, 2.0)];
        let out = passthrough(&records);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.matched));
    }
}
