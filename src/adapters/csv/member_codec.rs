use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Member;

use super::errors::ParseError;
use super::fields::{quote, split_line};

/// Header line of `members.csv`.
pub const MEMBERS_HEADER: &str = "memberId,name,borrowedBooks";

/// One loan inside the borrowed-books field.
#[derive(Debug, Serialize, Deserialize)]
struct LoanEntry {
    isbn: String,
    due: NaiveDate,
}

/// Encode one member as a single CSV record.
///
/// The borrowed-books set is embedded in the third field as a
/// self-describing JSON array. The old `isbn\:date;...` scheme relied on
/// three delimiters colliding with user data, so the writer settled on
/// JSON; the decoder still reads both forms. Entries are sorted by ISBN
/// so repeated saves of the same catalog are byte-identical.
pub fn encode_member(member: &Member) -> String {
    // Member id carries comma escaping on top of quote doubling
    let safe_id = member.member_id().replace('"', "\"\"").replace(',', "\\,");
    // Newlines cannot survive a line-oriented format
    let safe_name = member
        .name()
        .replace('"', "\"\"")
        .replace('\n', " ")
        .replace('\r', "");

    let mut loans: Vec<LoanEntry> = member
        .borrowed_books()
        .iter()
        .map(|(isbn, due)| LoanEntry {
            isbn: isbn.clone(),
            due: *due,
        })
        .collect();
    loans.sort_by(|a, b| a.isbn.cmp(&b.isbn));

    let loans_json =
        serde_json::to_string(&loans).expect("loan entries always serialize to JSON");

    format!("\"{safe_id}\",\"{safe_name}\",{}", quote(&loans_json))
}

/// Decode one CSV record into a member.
///
/// A line with fewer than two top-level fields, or a blank id or name,
/// fails the whole record. Damage inside the borrowed-books field only
/// costs the affected entries (logged and skipped), so one bad due date
/// never throws away the member.
pub fn decode_member(line: &str) -> Result<Member, ParseError> {
    let fields = split_line(line);
    if fields.len() < 2 {
        return Err(ParseError::FieldCount {
            expected: 3,
            found: fields.len(),
        });
    }

    let member_id = fields[0].trim().replace("\\,", ",");
    let name = fields[1].trim().to_owned();
    if member_id.is_empty() {
        return Err(ParseError::EmptyField("memberId"));
    }
    if name.is_empty() {
        return Err(ParseError::EmptyField("name"));
    }

    let borrowed_books = match fields.get(2).map(|f| f.trim()) {
        None | Some("") => HashMap::new(),
        Some(raw) if raw.starts_with('[') => decode_loans_json(raw)?,
        Some(raw) => decode_loans_legacy(raw),
    };

    Ok(Member::from_parts(member_id, name, borrowed_books))
}

/// Read the JSON form of the borrowed-books field.
///
/// An unreadable array fails the record; unreadable elements are skipped
/// individually.
fn decode_loans_json(raw: &str) -> Result<HashMap<String, NaiveDate>, ParseError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| ParseError::InvalidLoans(e.to_string()))?;

    let mut borrowed = HashMap::new();
    for value in entries {
        match serde_json::from_value::<LoanEntry>(value.clone()) {
            Ok(entry) if !entry.isbn.trim().is_empty() => {
                borrowed.insert(entry.isbn, entry.due);
            }
            Ok(_) => tracing::warn!(%value, "skipping loan entry with blank ISBN"),
            Err(e) => tracing::warn!(%value, error = %e, "skipping invalid loan entry"),
        }
    }
    Ok(borrowed)
}

/// Read the legacy `isbn:YYYY-MM-DD;...` form of the borrowed-books field.
///
/// Literal colons inside an ISBN arrive escaped as `\:`. Malformed pairs
/// (missing colon, blank ISBN, unparseable date) are skipped with a
/// diagnostic; the rest of the field still loads.
fn decode_loans_legacy(raw: &str) -> HashMap<String, NaiveDate> {
    let mut borrowed = HashMap::new();
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let Some((isbn_raw, date_raw)) = split_legacy_pair(pair) else {
            tracing::warn!(entry = pair, "skipping loan entry without a due date");
            continue;
        };

        let isbn = isbn_raw.trim().replace("\\:", ":");
        if isbn.is_empty() {
            tracing::warn!(entry = pair, "skipping loan entry with blank ISBN");
            continue;
        }

        match date_raw.trim().parse::<NaiveDate>() {
            Ok(due) => {
                borrowed.insert(isbn, due);
            }
            Err(_) => tracing::warn!(entry = pair, "skipping loan entry with invalid date"),
        }
    }
    borrowed
}

/// Split a legacy pair at the first unescaped colon.
fn split_legacy_pair(pair: &str) -> Option<(&str, &str)> {
    let mut prev_backslash = false;
    for (i, c) in pair.char_indices() {
        if c == ':' && !prev_backslash {
            return Some((&pair[..i], &pair[i + 1..]));
        }
        prev_backslash = c == '\\' && !prev_backslash;
    }
    None
}
