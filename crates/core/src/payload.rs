//! Parser for raw confirmation payloads.
//!
//! The detail endpoint returns a semi-structured text blob, e.g.:
//!
//! ```text
//! Received Time:20240115103000
//! Accession:12345
//! MSH|^~\&|LAB|...
//! ```
//!
//! Fields are scraped by pattern. A missing field is not an error; it is
//! reported through [`ParsedConfirmation::missing_fields`].

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;

static RECEIVED_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"Received Time:\s*(\d+)").unwrap());
static ACCESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Accession:\s*(\d+)").unwrap());
static MESSAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)MSH\|.*").unwrap());

/// A field the parser looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    ReceivedTime,
    AccessionNumber,
    Message,
}

impl fmt::Display for PayloadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayloadField::ReceivedTime => "received_time",
            PayloadField::AccessionNumber => "accession_number",
            PayloadField::Message => "message",
        })
    }
}

/// Fields extracted from a confirmation payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConfirmation {
    pub received_time: Option<String>,
    pub accession_number: Option<String>,
    /// Embedded protocol message starting at `MSH|`, kept as-is.
    pub message: Option<String>,
}

impl ParsedConfirmation {
    /// Fields that were not found in the payload.
    pub fn missing_fields(&self) -> Vec<PayloadField> {
        let mut missing = Vec::new();
        if self.received_time.is_none() {
            missing.push(PayloadField::ReceivedTime);
        }
        if self.accession_number.is_none() {
            missing.push(PayloadField::AccessionNumber);
        }
        if self.message.is_none() {
            missing.push(PayloadField::Message);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Extract the known fields from a raw payload.
pub fn parse_confirmation(raw: &str) -> ParsedConfirmation {
    let capture = |re: &Regex| {
        re.captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    let message = MESSAGE
        .find(raw)
        .map(|m| m.as_str().trim_end().to_string())
        .filter(|m| !m.is_empty());

    ParsedConfirmation {
        received_time: capture(&RECEIVED_TIME),
        accession_number: capture(&ACCESSION),
        message,
    }
}
