use tracing::{debug, warn};

use crate::error::SkipReason;
use crate::ingest::RawTable;
use crate::schema::description_column;

/// Keeps only ledger rows whose description names a claims-expenditure account.
#[derive(Debug, Clone)]
pub struct ExpenseFilter {
    keywords: Vec<String>,
}

impl ExpenseFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Case-insensitive "contains any keyword".
    pub fn matches(&self, description: &str) -> bool {
        let upper = description.to_uppercase();
        self.keywords.iter().any(|k| upper.contains(k.as_str()))
    }

    /// A new table holding only the expenditure rows of `table`.
    ///
    /// The description is the first column whose name contains `DESC`. A
    /// table without one contributes nothing; that is reported as a
    /// [`SkipReason`] and never aborts the run.
    pub fn apply(&self, table: &RawTable) -> Result<RawTable, SkipReason> {
        let Some(desc) = description_column(&table.headers) else {
            warn!(
                source = %table.source,
                available = ?table.headers,
                "no description column; file contributes no rows"
            );
            return Err(SkipReason::NoDescriptionColumn {
                available: table.headers.clone(),
            });
        };

        let kept = table.filter_rows(|row| row.get(desc).is_some_and(|d| self.matches(d)));
        debug!(
            source = %table.source,
            before = table.len(),
            after = kept.len(),
            "expense filter"
        );
        if kept.is_empty() {
            return Err(SkipReason::NoMatchingRows);
        }
        Ok(kept)
    }
}
