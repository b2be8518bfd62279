//! Error-tolerant HTML parser for bramble.
//!
//! # Scope
//!
//! This crate implements:
//! - **Parsing state machine** ([`HtmlParser`])
//!   - One left-to-right pass over the whole input, one character of lookahead
//!   - Start/end tags, attributes (quoted, unquoted, valueless), comments
//!   - Raw text for CDATA elements such as `<script>` and `<style>`
//!   - Embedded `<% ... %>` blocks passed through untouched
//!   - Recovery from unclosed, unopened and badly nested tags, reported as
//!     [`ParseError`]s
//!   - Exact source offsets for every node, so unmodified markup is written back
//!     byte for byte
//!
//! - **Encodings** ([`Charset`])
//!   - `<meta charset>` / `<meta http-equiv="content-type">` sniffing
//!   - Byte order mark detection
//!
//! - **Entities**: HTML 4 named and numeric character references.
//!
//! # Not Implemented
//!
//! - The HTML5 tree construction algorithm (insertion modes, foster parenting,
//!   adoption agency)
//! - Incremental parsing

/// Character encodings and `<meta>` charset extraction.
pub mod encoding;
/// HTML 4 entity encoding and decoding.
pub mod entities;
mod error;
/// HTML parser and tree construction.
pub mod parser;

pub use encoding::{Charset, content_charset, detect_bom};
pub use entities::{decode_entities, encode_entities};
pub use error::{ParseError, ParseErrorCode};
pub use parser::{HtmlParser, ParseOutput, ParseState, format_tree, print_tree};
