// src/ingest/sniff.rs

use csv::ReaderBuilder;
use serde::Serialize;
use std::{borrow::Cow, fmt};
use tracing::{debug, trace, warn};

use super::raw_table::RawTable;
use crate::error::SkipReason;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Data rows read during a trial parse, on top of the header.
const SAMPLE_RECORDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextEncoding {
    /// UTF-8, with or without a leading byte-order mark.
    Utf8,
    /// Windows-1252, a superset of Latin-1 for every printable byte.
    Windows1252,
}

impl TextEncoding {
    /// Decode, failing on the first invalid sequence.
    fn decode_strict<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(strip_bom(bytes)).ok().map(Cow::Borrowed),
            TextEncoding::Windows1252 => {
                let (text, had_errors) =
                    encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
                (!had_errors).then_some(text)
            }
        }
    }

    /// Decode, replacing anything invalid.
    fn decode_lossy<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(strip_bom(bytes)),
            TextEncoding::Windows1252 => {
                encoding_rs::WINDOWS_1252
                    .decode_without_bom_handling(bytes)
                    .0
            }
        }
    }
}

/// An (encoding, delimiter) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Format {
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delim = match self.delimiter {
            b'\t' => "\\t".to_string(),
            d => (d as char).to_string(),
        };
        write!(f, "{:?} '{}'", self.encoding, delim)
    }
}

/// Trial order. UTF-8 first: Windows-1252 accepts any byte sequence, so it
/// can only ever be a fallback.
pub const CANDIDATES: &[Format] = &[
    Format { encoding: TextEncoding::Utf8, delimiter: b';' },
    Format { encoding: TextEncoding::Utf8, delimiter: b',' },
    Format { encoding: TextEncoding::Utf8, delimiter: b'\t' },
    Format { encoding: TextEncoding::Utf8, delimiter: b'|' },
    Format { encoding: TextEncoding::Windows1252, delimiter: b';' },
    Format { encoding: TextEncoding::Windows1252, delimiter: b',' },
    Format { encoding: TextEncoding::Windows1252, delimiter: b'\t' },
    Format { encoding: TextEncoding::Windows1252, delimiter: b'|' },
];

/// Used when no candidate produced more than one column.
pub const LAST_RESORT: Format = Format {
    encoding: TextEncoding::Utf8,
    delimiter: b',',
};

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// The first `max_bytes` of `bytes`, cut back to the last complete line so a
/// multi-byte character is never split.
fn header_sample(bytes: &[u8], max_bytes: usize) -> &[u8] {
    if bytes.len() <= max_bytes {
        return bytes;
    }
    let head = &bytes[..max_bytes];
    match head.iter().rposition(|&b| b == b'\n') {
        Some(pos) => &head[..=pos],
        None => head,
    }
}

/// Parse the header and a couple of records of `sample` with `format`.
/// Returns the header width when the combination is usable.
fn trial_parse(sample: &[u8], format: Format) -> Option<usize> {
    let text = format.encoding.decode_strict(sample)?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let width = rdr.headers().ok()?.len();
    for record in rdr.records().take(SAMPLE_RECORDS) {
        if record.is_err() {
            return None;
        }
    }
    Some(width)
}

/// Probe `bytes` with every candidate in priority order and return the first
/// combination whose header splits into more than one column.
pub fn sniff_format(bytes: &[u8], sample_bytes: usize) -> Option<Format> {
    let sample = header_sample(bytes, sample_bytes.max(1));
    CANDIDATES.iter().copied().find(|&format| {
        let width = trial_parse(sample, format);
        trace!(%format, ?width, "trial parse");
        matches!(width, Some(w) if w > 1)
    })
}

/// Parse all of `bytes` with a known `format`.
///
/// Records wider than the header are dropped, short ones are padded, and
/// records the CSV reader rejects are skipped; all three are counted.
pub fn parse_with(bytes: &[u8], format: Format, source: &str) -> RawTable {
    let text = format.encoding.decode_lossy(bytes);
    let mut rdr = ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match rdr.headers() {
        Ok(h) => h
            .iter()
            .map(|s| s.trim_start_matches('\u{feff}').to_string())
            .collect(),
        Err(e) => {
            debug!(source, error = %e, "header unreadable");
            return RawTable::empty(source);
        }
    };

    let width = headers.len();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        match result {
            Ok(record) if record.len() <= width => {
                let mut row: Vec<String> = record.iter().map(str::to_string).collect();
                row.resize(width, String::new());
                rows.push(row);
            }
            Ok(_) => skipped += 1,
            Err(e) => {
                trace!(source, error = %e, "skipping bad record");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(source, skipped, "dropped malformed records");
    }

    RawTable {
        source: source.to_string(),
        headers,
        rows,
        format: Some(format),
        skipped_records: skipped,
    }
}

/// Sniff, then parse. Unreadable input is reported as a [`SkipReason`],
/// never as a panic or a hard error.
pub fn read_table(bytes: &[u8], source: &str, sample_bytes: usize) -> Result<RawTable, SkipReason> {
    let format = match sniff_format(bytes, sample_bytes) {
        Some(f) => {
            debug!(source, %f, "format detected");
            f
        }
        None => {
            warn!(source, "no candidate format matched; trying last-resort parse");
            LAST_RESORT
        }
    };

    // The sample may end before the first non-UTF-8 byte.
    let format = match format.encoding {
        TextEncoding::Utf8 if format.encoding.decode_strict(bytes).is_none() => {
            let fallback = Format {
                encoding: TextEncoding::Windows1252,
                ..format
            };
            warn!(source, %format, %fallback, "invalid UTF-8 past the sniff sample; re-reading");
            fallback
        }
        _ => format,
    };

    let table = parse_with(bytes, format, source);
    if table.headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SkipReason::Unreadable);
    }
    if table.is_empty() {
        return Err(SkipReason::Empty);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: usize = 64 * 1024;

    #[test]
    fn semicolon_utf8_is_first_choice() {
        let data = "DATA;REG_ANS;DESCRICAO;VL_SALDO_FINAL\n2024-01-01;123;EVENTOS;1,5\n";
        let f = sniff_format(data.as_bytes(), SAMPLE).unwrap();
        assert_eq!(f, Format { encoding: TextEncoding::Utf8, delimiter: b';' });
    }

    #[test]
    fn comma_file_falls_through_to_comma() {
        let data = "a,b,c\n1,2,3\n";
        let f = sniff_format(data.as_bytes(), SAMPLE).unwrap();
        assert_eq!(f.delimiter, b',');
        assert_eq!(f.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn latin1_bytes_select_windows_1252() {
        // "Razão" in Latin-1: 0xE3 is not valid UTF-8 on its own.
        let mut data = b"Registro_ANS;Raz".to_vec();
        data.push(0xE3);
        data.extend_from_slice(b"o_Social\n1;ACME\n");
        let f = sniff_format(&data, SAMPLE).unwrap();
        assert_eq!(f.encoding, TextEncoding::Windows1252);
        assert_eq!(f.delimiter, b';');

        let table = read_table(&data, "cadop.csv", SAMPLE).unwrap();
        assert_eq!(table.headers, vec!["Registro_ANS", "Razão_Social"]);
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice("RegistroANS;Ano\n1;2024\n".as_bytes());
        let table = read_table(&data, "x.csv", SAMPLE).unwrap();
        assert_eq!(table.headers[0], "RegistroANS");
    }

    #[test]
    fn sample_is_cut_at_a_line_boundary() {
        let data = "aé;b\n1;2\n3;4\n";
        let cut = header_sample(data.as_bytes(), 7);
        assert_eq!(cut, "aé;b\n".as_bytes());
    }

    #[test]
    fn wide_rows_are_skipped_and_short_rows_padded() {
        let data = "a;b;c\n1;2;3\n1;2;3;4\n1;2\n";
        let table = read_table(data.as_bytes(), "x.csv", SAMPLE).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["1", "2", ""]);
        assert_eq!(table.skipped_records, 1);
    }

    #[test]
    fn single_column_file_uses_last_resort() {
        let data = "only\nvalue\n";
        let table = read_table(data.as_bytes(), "x.csv", SAMPLE).unwrap();
        assert_eq!(table.format, Some(LAST_RESORT));
        assert_eq!(table.headers, vec!["only"]);
    }

    #[test]
    fn tab_and_pipe_delimiters_are_detected() {
        let f = sniff_format(b"REG_ANS\tDESCRICAO\n1\tEVENTOS\n", SAMPLE).unwrap();
        assert_eq!(f, Format { encoding: TextEncoding::Utf8, delimiter: b'\t' });

        let f = sniff_format(b"REG_ANS|DESCRICAO\n1|EVENTOS\n", SAMPLE).unwrap();
        assert_eq!(f, Format { encoding: TextEncoding::Utf8, delimiter: b'|' });
    }

    #[test]
    fn latin1_after_the_sample_is_not_mangled() {
        let data = b"Registro_ANS;Razao_Social\n1;ACME\n2;RAZ\xC3O LTDA\n";
        let table = read_table(data, "cadop.csv", 32).unwrap();
        assert_eq!(
            table.format,
            Some(Format { encoding: TextEncoding::Windows1252, delimiter: b';' })
        );
        assert_eq!(table.rows[1], vec!["2", "RAZÃO LTDA"]);
    }

    #[test]
    fn empty_input_is_a_skip_not_a_panic() {
        assert_eq!(read_table(b"", "x.csv", SAMPLE), Err(SkipReason::Unreadable));
        assert_eq!(read_table(b"a;b\n", "x.csv", SAMPLE), Err(SkipReason::Empty));
    }
}
