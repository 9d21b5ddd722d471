use std::collections::BTreeMap;

use crate::model::{AggregateRow, EnrichedRecord, UNKNOWN};
use crate::process::utils::round2;

fn group_key(rec: &EnrichedRecord) -> (String, String) {
    let name = rec.legal_name.clone().unwrap_or_else(|| UNKNOWN.to_string());
    let region = rec.region.clone().unwrap_or_else(|| UNKNOWN.to_string());
    (name, region)
}

/// Sample standard deviation; a single observation has none, reported as 0.
fn sample_stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Group by `(legal_name, region)` and compute total, mean, sample stddev
/// and count, rounded to cents and sorted by total, largest first.
///
/// Callers pass records that already passed validation; absent names or
/// regions group under [`UNKNOWN`] so no record is lost.
pub fn aggregate<'a, I>(records: I) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for rec in records {
        groups.entry(group_key(rec)).or_default().push(rec.record.amount);
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|((legal_name, region), values)| {
            let count = values.len();
            let total: f64 = values.iter().sum();
            let mean = total / count as f64;
            AggregateRow {
                legal_name,
                region,
                total: round2(total),
                mean: round2(mean),
                stddev: round2(sample_stddev(&values, mean)),
                count,
            }
        })
        .collect();

    // stable: equal totals keep the key order from the BTreeMap
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));
    rows
}
