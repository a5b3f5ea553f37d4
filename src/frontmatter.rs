//! Front matter codec.
//!
//! A contact file starts with a YAML block fenced by `---` lines. Whatever
//! follows the closing fence belongs to the user and is carried through
//! every rewrite untouched.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::format_description;
use time::Date;

use crate::contact::{ContactRecord, PostalAddress};

pub const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("file does not start with a `---` line")]
    MissingOpening,

    #[error("no closing `---` line after the front matter")]
    Unterminated,

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Canonical front matter of one contact.
///
/// Field order is the key order on disk. Empty values are stored as
/// explicit `null`s rather than omitted, so every file carries every key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(rename = "fn")]
    pub full_name: Option<String>,
    pub uid: String,
    pub bday: Option<String>,
    pub tel: Option<Vec<String>>,
    pub email: Option<Vec<String>>,
    pub address: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Build the front matter for a contact, normalizing empty values to `None`.
pub fn encode(record: &ContactRecord) -> FrontMatter {
    FrontMatter {
        full_name: non_empty(&record.fullname),
        uid: record.uid.clone(),
        bday: record.birthday.and_then(format_date),
        tel: non_empty_list(record.telephones.iter().cloned()),
        email: non_empty_list(record.emails.iter().cloned()),
        address: non_empty_list(record.addresses.iter().map(PostalAddress::one_line)),
        notes: record.note.as_deref().and_then(non_empty),
    }
}

/// Render the full fenced block, closing `---` line included.
pub fn serialize(front_matter: &FrontMatter) -> Result<String, FrontMatterError> {
    let yaml = serde_yaml::to_string(front_matter)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n"))
}

pub fn parse(text: &str) -> Result<FrontMatter, FrontMatterError> {
    let segments = locate(text)?;
    Ok(serde_yaml::from_str(&text[segments.yaml])?)
}

/// Swap the leading block of `text` for the serialized `front_matter`.
pub fn replace(text: &str, front_matter: &FrontMatter) -> Result<String, FrontMatterError> {
    splice(text, &serialize(front_matter)?)
}

/// Text after the closing fence, verbatim.
pub fn body(text: &str) -> Result<&str, FrontMatterError> {
    let segments = locate(text)?;
    Ok(&text[segments.body..])
}

fn splice(text: &str, block: &str) -> Result<String, FrontMatterError> {
    let body = body(text)?;
    let mut out = String::with_capacity(block.len() + body.len());
    out.push_str(block);
    out.push_str(body);
    Ok(out)
}

struct Segments {
    yaml: Range<usize>,
    body: usize,
}

// First fence must be the first line; the block ends at the next fence line.
fn locate(text: &str) -> Result<Segments, FrontMatterError> {
    let mut offset = if text.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };

    let mut lines = text[offset..].split_inclusive('\n');
    let first = lines.next().ok_or(FrontMatterError::MissingOpening)?;
    if !is_delimiter(first) {
        return Err(FrontMatterError::MissingOpening);
    }
    offset += first.len();
    let yaml_start = offset;

    for line in lines {
        if is_delimiter(line) {
            return Ok(Segments {
                yaml: yaml_start..offset,
                body: offset + line.len(),
            });
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn format_date(date: Date) -> Option<String> {
    date.format(format_description!("[year]-[month]-[day]")).ok()
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn non_empty_list(values: impl Iterator<Item = String>) -> Option<Vec<String>> {
    let values: Vec<String> = values.filter(|v| !v.trim().is_empty()).collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
