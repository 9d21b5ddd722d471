// src/model.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel used for group keys when enrichment left a field empty.
pub const UNKNOWN: &str = "unknown";

/// Canonical form of the registry identifier, the join key between the two datasets.
///
/// `Invalid` is kept distinct from `Id(0)`: garbage never collides with a real id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RegistryKey {
    Id(u64),
    Invalid,
}

impl RegistryKey {
    pub fn id(&self) -> Option<u64> {
        match self {
            RegistryKey::Id(id) => Some(*id),
            RegistryKey::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, RegistryKey::Id(_))
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKey::Id(id) => write!(f, "{}", id),
            RegistryKey::Invalid => Ok(()),
        }
    }
}

/// Calendar quarter, written as the regulator's "1T".."4T" tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    #[serde(rename = "1T")]
    Q1,
    #[serde(rename = "2T")]
    Q2,
    #[serde(rename = "3T")]
    Q3,
    #[serde(rename = "4T")]
    Q4,
}

impl Quarter {
    pub fn label(&self) -> &'static str {
        match self {
            Quarter::Q1 => "1T",
            Quarter::Q2 => "2T",
            Quarter::Q3 => "3T",
            Quarter::Q4 => "4T",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "1T" => Some(Quarter::Q1),
            "2T" => Some(Quarter::Q2),
            "3T" => Some(Quarter::Q3),
            "4T" => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            1..=3 => Some(Quarter::Q1),
            4..=6 => Some(Quarter::Q2),
            7..=9 => Some(Quarter::Q3),
            10..=12 => Some(Quarter::Q4),
            _ => None,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of reported claims expenditure.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRecord {
    pub registry_id: RegistryKey,
    pub year: i32,
    pub quarter: Quarter,
    /// Never null: unparseable amounts are coerced to 0.
    pub amount: f64,
    pub description: Option<String>,
}

/// One organization from the regulator's registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub registry_id: u64,
    /// Digits only. May fail the checksum; that is data, not an ingestion error.
    pub tax_id: String,
    pub legal_name: Option<String>,
    pub region: Option<String>,
}

/// A financial record plus whatever the registry knew about its reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: FinancialRecord,
    /// Whether a registry entry was found for the record's key.
    pub matched: bool,
    pub tax_id: Option<String>,
    pub legal_name: Option<String>,
    pub region: Option<String>,
}

impl EnrichedRecord {
    pub fn unmatched(record: FinancialRecord) -> Self {
        Self {
            record,
            matched: false,
            tax_id: None,
            legal_name: None,
            region: None,
        }
    }

    pub fn with_entry(record: FinancialRecord, entry: &RegistryEntry) -> Self {
        Self {
            record,
            matched: true,
            tax_id: (!entry.tax_id.is_empty()).then(|| entry.tax_id.clone()),
            legal_name: entry.legal_name.clone(),
            region: entry.region.clone(),
        }
    }
}

/// Statistics for one `(legal_name, region)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub legal_name: String,
    pub region: String,
    pub total: f64,
    pub mean: f64,
    pub stddev: f64,
    pub count: usize,
}
