// src/process/mod.rs
pub mod filter;
pub mod financial;
pub mod key;
pub mod period;
pub mod registry;
pub mod utils;

pub use filter::ExpenseFilter;
pub use financial::canonicalize_ledger;
pub use key::normalize_key;
pub use registry::{canonicalize_registry, deduplicate, CanonicalRegistry};
