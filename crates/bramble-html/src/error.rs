//! Recoverable parse diagnostics.
//!
//! Malformed markup never aborts a parse. Each recovery the parser performs is
//! recorded as a [`ParseError`] and parsing carries on.

use std::fmt;

use serde::Serialize;
use strum_macros::{Display, EnumString};

/// The kind of problem a [`ParseError`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
pub enum ParseErrorCode {
    /// A start tag was never closed before the end of the input.
    TagNotClosed,
    /// An end tag had no matching open element.
    TagNotOpened,
    /// A `<meta>` declared an encoding different from the byte stream's.
    CharsetMismatch,
    /// An end tag was written for an element that never has content.
    EndTagNotRequired,
    /// An end tag would have crossed an open nesting boundary.
    EndTagInvalidHere,
}

/// A single recorded recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// What went wrong.
    pub code: ParseErrorCode,
    /// 1-based line of the offending markup.
    pub line: usize,
    /// 1-based column of the offending markup.
    pub column: usize,
    /// Byte offset of the offending markup in the source.
    pub stream_position: usize,
    /// Human readable message.
    pub reason: String,
    /// Excerpt of the source starting at `stream_position`, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} ({})",
            self.line, self.column, self.reason, self.code
        )
    }
}
