//! CSV payload parsing.
//!
//! Rules:
//! - the first non-empty line is the header; every field is trimmed
//! - empty lines (including a trailing newline) are skipped
//! - rows may have fewer cells than the header (missing columns are simply
//!   absent from the row) or more (cells without a header are dropped)
//! - a record that cannot be decoded is skipped with a warning; only an
//!   unreadable header or a payload that is clearly not CSV fails the feed

use csv::{ReaderBuilder, Trim};
use tracing::warn;

use crate::{
    models::raw_row::RawRow,
    providers::{ParseSnafu, ProviderError},
};

/// Parses a header-delimited CSV payload into rows.
pub fn parse_csv(payload: &[u8]) -> Result<Vec<RawRow>, ProviderError> {
    match payload.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        None => return Ok(Vec::new()),
        Some(b'<') => {
            return ParseSnafu {
                message: "payload looks like HTML, expected CSV",
            }
            .fail();
        }
        Some(b'{') => {
            return ParseSnafu {
                message: "payload looks like JSON, expected CSV",
            }
            .fail();
        }
        Some(_) => {}
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(payload);

    let headers = reader
        .headers()
        .map_err(|e| {
            ParseSnafu {
                message: format!("unreadable header row: {e}"),
            }
            .build()
        })?
        .clone();

    if headers.iter().all(str::is_empty) {
        return ParseSnafu {
            message: "header row has no column names",
        }
        .fail();
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let row: RawRow = headers
                    .iter()
                    .zip(record.iter())
                    .filter(|(h, _)| !h.is_empty())
                    .collect();
                rows.push(row);
            }
            Err(err) => {
                let line = err.position().map(|p| p.line());
                warn!(?line, error = %err, "skipping malformed feed record");
            }
        }
    }
    Ok(rows)
}
