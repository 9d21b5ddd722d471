/// Trim whitespace and strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// `None` for blank cells, the cleaned text otherwise.
pub fn non_empty(raw: &str) -> Option<String> {
    let cleaned = clean_str(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Parse a monetary amount written in either decimal convention.
///
/// - both `.` and `,` present: the right-most one is the decimal mark
/// - a lone `,` is a decimal mark (`"1234,56"`)
/// - several `.` and no `,` are thousands separators (`"1.234.567"`)
/// - `(12,50)` is negative
///
/// Returns `None` for anything that is not a finite number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s = clean_str(raw);
    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }

    let s: String = s
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');
    let canonical = match (last_dot, last_comma) {
        (Some(d), Some(c)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(_)) if s.matches(',').count() == 1 => s.replace(',', "."),
        (None, Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s,
    };

    let v: f64 = canonical.parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    Some(if negative { -v } else { v })
}

/// Amount coercion used on the ledger: unparseable becomes 0, never null.
pub fn coerce_amount(raw: &str) -> f64 {
    parse_amount(raw).unwrap_or(0.0)
}

/// Round half away from zero to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
