use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Quarter;
use crate::process::utils::clean_str;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").expect("year regex"));
static QUARTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^0-9])([1-4])T").expect("quarter regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Year and quarter as far as a piece of text (a file name, a period cell) reveals them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodHint {
    pub year: Option<i32>,
    pub quarter: Option<Quarter>,
}

impl PeriodHint {
    /// Scan free text for a `20YY` year and a `nT` quarter tag.
    pub fn from_text(text: &str) -> Self {
        let upper = text.to_uppercase();
        let year = YEAR_RE
            .find(&upper)
            .and_then(|m| m.as_str().parse::<i32>().ok());
        let quarter = QUARTER_RE
            .captures(&upper)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .and_then(|n| Quarter::from_month(n * 3));
        Self { year, quarter }
    }

    /// Read a period cell: a calendar date gives both parts, otherwise the
    /// cell is scanned like free text.
    pub fn from_cell(raw: &str) -> Self {
        let cleaned = clean_str(raw);
        if cleaned.is_empty() {
            return Self::default();
        }
        if let Some(date) = parse_date(&cleaned) {
            return Self {
                year: Some(date.year()),
                quarter: Quarter::from_month(date.month()),
            };
        }
        Self::from_text(&cleaned)
    }

    /// Fill the gaps in `self` from `other`.
    pub fn or(self, other: PeriodHint) -> Self {
        Self {
            year: self.year.or(other.year),
            quarter: self.quarter.or(other.quarter),
        }
    }

    pub fn resolve(self, fallback_year: i32, fallback_quarter: Quarter) -> (i32, Quarter) {
        (
            self.year.unwrap_or(fallback_year),
            self.quarter.unwrap_or(fallback_quarter),
        )
    }
}

/// Parse the date part of a cell such as `2024-01-01` or `01/04/2024 00:00:00`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let head: String = s.chars().take(10).collect();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&head, fmt).ok())
}
