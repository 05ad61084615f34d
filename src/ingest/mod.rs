// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::error::FetchError;
use crate::ingest::types::RowRecord;
use std::mem::take;

/// Rows recovered from one CSV payload plus the count of data lines dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    pub rows: Vec<RowRecord>,
    pub skipped: usize,
}

/// Parse a published CSV export. The first line is a header and is discarded.
///
/// Fails with [`FetchError::ParseEmpty`] when the trimmed payload has fewer
/// than two lines. Individual lines that do not yield a team name and a
/// finite score are skipped and counted, never reported as errors: live
/// spreadsheets routinely carry blank or half-filled rows.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, FetchError> {
    let mut lines = text.trim().lines();
    lines.next(); // header
    let mut data = lines.peekable();
    if data.peek().is_none() {
        return Err(FetchError::ParseEmpty);
    }

    let mut out = ParsedCsv::default();
    for line in data {
        match parse_line(line) {
            Some(row) => out.rows.push(row),
            None => out.skipped += 1,
        }
    }
    Ok(out)
}

fn parse_line(line: &str) -> Option<RowRecord> {
    let cols = split_fields(line);
    if cols.len() < 2 {
        return None;
    }
    let team_name = clean_field(&cols[0]);
    if team_name.is_empty() {
        return None;
    }
    let score = parse_score(&clean_field(&cols[1]))?;
    Some(RowRecord { team_name, score })
}

/// Split one line on commas, keeping commas inside double-quoted fields.
/// A doubled quote inside a quoted field is a literal quote.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => fields.push(take(&mut field)),
            _ => field.push(ch),
        }
    }
    // Unterminated quotes still flush what we have.
    fields.push(field);
    fields
}

/// Trim, drop every literal quote character, trim again.
pub fn clean_field(raw: &str) -> String {
    raw.trim().replace('"', "").trim().to_string()
}

/// Parse a score cell from its leading number, so "10 pts" reads as 10.
/// Accepts a single decimal comma ("10,5"). Cells with no leading digits
/// and non-finite values are rejected.
pub fn parse_score(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized;
    let cell = if raw.matches(',').count() == 1 && !raw.contains('.') {
        normalized = raw.replace(',', ".");
        normalized.as_str()
    } else {
        raw
    };
    let parsed = numeric_prefix(cell)?.parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Longest prefix shaped like `[+-]digits[.digits][e[+-]digits]` with at
/// least one mantissa digit.
fn numeric_prefix(s: &str) -> Option<&str> {
    let b = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if b.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(b.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    Some(&s[..end])
}
