use crate::model::RegistryKey;
use crate::process::utils::clean_str;

/// Canonicalize a raw registry identifier.
///
/// Integer or decimal text is truncated to an integer (`"123.0"` → 123).
/// Empty, non-numeric, negative or non-finite input is [`RegistryKey::Invalid`];
/// it is never folded into 0.
pub fn normalize_key(raw: &str) -> RegistryKey {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        return RegistryKey::Invalid;
    }

    if let Ok(id) = cleaned.parse::<u64>() {
        return RegistryKey::Id(id);
    }

    // A lone comma is a decimal mark ("123,0"); anything fancier is not a key.
    let dotted = if cleaned.matches(',').count() == 1 && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    match dotted.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 => {
            RegistryKey::Id(v.trunc() as u64)
        }
        _ => RegistryKey::Invalid,
    }
}
