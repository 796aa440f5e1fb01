//! Front-matter codec for Markdown posts.
//!
//! A post may start with a header block:
//!
//! ```text
//! ---
//! title: "Hello"
//! tags: ["rust", "blog"]
//! ---
//! Body text
//! ```
//!
//! Only flat `key: value` lines are understood. Values are either scalar
//! strings or JSON arrays of strings. Decoding never fails: anything that does
//! not look like a well-formed header is returned untouched as the body.

use crate::models::{FrontMatter, FrontMatterValue};

const DELIMITER: &str = "---";

/// Splits a raw document into its front matter and body.
pub fn decode(raw: &str) -> (FrontMatter, String) {
    let Some((header, body)) = split_header(raw) else {
        return (FrontMatter::new(), raw.to_string());
    };

    match parse_header(header) {
        Some(front_matter) => (front_matter, body.to_string()),
        None => {
            tracing::debug!("Malformed front matter, treating whole document as body");
            (FrontMatter::new(), raw.to_string())
        }
    }
}

/// Renders front matter and body back into a single document.
///
/// Scalars are always written double-quoted and lists as JSON arrays, so the
/// original quoting style is not preserved. Empty front matter produces no
/// header at all.
pub fn encode(front_matter: &FrontMatter, body: &str) -> String {
    if front_matter.is_empty() {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len() + 64);
    out.push_str(DELIMITER);
    out.push('\n');
    for (key, value) in front_matter.iter() {
        out.push_str(key);
        out.push_str(": ");
        match value {
            FrontMatterValue::Scalar(s) => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            FrontMatterValue::List(items) => {
                let quoted: Vec<String> = items
                    .iter()
                    .map(|item| serde_json::Value::String(item.clone()).to_string())
                    .collect();
                out.push('[');
                out.push_str(&quoted.join(", "));
                out.push(']');
            }
        }
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body);
    out
}

/// Returns `(header, body)` when `raw` opens with a delimiter line and has a
/// matching closing delimiter line.
fn split_header(raw: &str) -> Option<(&str, &str)> {
    let mut lines = raw.split_inclusive('\n');

    let first = lines.next()?;
    if !is_delimiter(first) || !first.ends_with('\n') {
        return None;
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if is_delimiter(line) {
            let body_start = offset + line.len();
            return Some((&raw[header_start..offset], &raw[body_start..]));
        }
        offset += line.len();
    }

    None
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == DELIMITER
}

fn parse_header(header: &str) -> Option<FrontMatter> {
    let mut front_matter = FrontMatter::new();

    for line in header.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }

        front_matter.insert(key, parse_value(value.trim()));
    }

    Some(front_matter)
}

fn parse_value(value: &str) -> FrontMatterValue {
    if value.starts_with('[') && value.ends_with(']') {
        return match serde_json::from_str::<Vec<String>>(value) {
            Ok(items) => FrontMatterValue::List(items),
            Err(_) => FrontMatterValue::Scalar(value.to_string()),
        };
    }

    FrontMatterValue::Scalar(strip_quotes(value).to_string())
}

/// Removes one layer of matching single or double quotes.
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
