pub mod aggregate;
pub mod validate;

pub use aggregate::aggregate;
pub use validate::{clean_records, is_valid_tax_id, validate, Verdict};
