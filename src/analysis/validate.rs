use crate::model::EnrichedRecord;

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

/// Checksum test for a 14-digit tax id. Punctuation is ignored; wrong
/// length and the all-identical-digit placeholder always fail.
pub fn is_valid_tax_id(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 14 {
        return false;
    }
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_WEIGHTS);
    if first != digits[12] {
        return false;
    }
    let second = check_digit(&digits[..13], &SECOND_WEIGHTS);
    second == digits[13]
}

pub fn is_valid_amount(amount: f64) -> bool {
    amount > 0.0
}

/// Per-record verdict. Validation tags, it never edits the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub tax_id_ok: bool,
    pub amount_ok: bool,
}

impl Verdict {
    pub fn is_clean(&self) -> bool {
        self.tax_id_ok && self.amount_ok
    }
}

pub fn validate(rec: &EnrichedRecord) -> Verdict {
    Verdict {
        tax_id_ok: rec.tax_id.as_deref().is_some_and(is_valid_tax_id),
        amount_ok: is_valid_amount(rec.record.amount),
    }
}

/// The records that pass both checks, in input order.
pub fn clean_records(records: &[EnrichedRecord]) -> Vec<&EnrichedRecord> {
    records.iter().filter(|r| validate(r).is_clean()).collect()
}
