use super::sniff::Format;

/// A parsed delimited file, before any column has been given meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Where the rows came from (file name, or `archive.zip/entry.csv`).
    pub source: String,
    /// Column names exactly as the file spells them.
    pub headers: Vec<String>,
    /// Data rows, each padded to `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
    /// The encoding/delimiter pair the sniffer settled on.
    pub format: Option<Format>,
    /// Records dropped while parsing (malformed, or wider than the header).
    pub skipped_records: usize,
}

impl RawTable {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (`row`, `col`), empty when the index is out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// A new table with the same header, holding only the rows `keep` accepts.
    pub fn filter_rows<F>(&self, mut keep: F) -> RawTable
    where
        F: FnMut(&[String]) -> bool,
    {
        RawTable {
            source: self.source.clone(),
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
            format: self.format,
            skipped_records: self.skipped_records,
        }
    }
}
