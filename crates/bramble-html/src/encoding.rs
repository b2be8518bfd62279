//! Character encodings.
//!
//! Labels are resolved with `encoding_rs`, which follows the WHATWG Encoding
//! Standard. A [`Charset`] keeps the label it was created from as well, so a
//! document declaring `iso-8859-1` reports that name even though the decoder
//! behind it is windows-1252.

use std::fmt;

use bramble_common::warning::warn_once;
use encoding_rs::{Encoding, UTF_8};

/// A resolved character encoding together with the label it was named by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    label: String,
    encoding: &'static Encoding,
}

impl Charset {
    /// Resolves an encoding label such as `utf-8` or `ISO-8859-1`.
    ///
    /// `utf8` is accepted as an alias of `utf-8`. Unknown labels yield `None`
    /// and log a warning once.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim().trim_matches(|c| c == '"' || c == '\'');
        let label = if trimmed.eq_ignore_ascii_case("utf8") {
            "utf-8".to_string()
        } else {
            trimmed.to_ascii_lowercase()
        };
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => Some(Self { label, encoding }),
            None => {
                warn_once("Encoding", &format!("unknown charset label '{label}'"));
                None
            }
        }
    }

    /// Wraps an encoding under its canonical name.
    #[must_use]
    pub fn from_encoding(encoding: &'static Encoding) -> Self {
        Self {
            label: encoding.name().to_ascii_lowercase(),
            encoding,
        }
    }

    /// UTF-8, the default for text without any other indication.
    #[must_use]
    pub fn utf8() -> Self {
        Self::from_encoding(UTF_8)
    }

    /// The (lowercased) label this charset was created from.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The decoder/encoder behind the label.
    #[must_use]
    pub const fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Canonical name of the encoding, e.g. `windows-1252`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// True if both charsets decode bytes the same way, whatever their labels.
    #[must_use]
    pub fn same_encoding(&self, other: &Self) -> bool {
        self.encoding == other.encoding
    }

    /// Decodes `bytes`, replacing malformed sequences with U+FFFD.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            warn_once(
                "Encoding",
                &format!("malformed {} input was replaced", self.name()),
            );
        }
        text.into_owned()
    }

    /// Encodes `text`, writing unmappable characters as numeric references.
    ///
    /// UTF-16 labels encode as UTF-8, as `encoding_rs` does for output.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Looks for a byte order mark at the start of `bytes`.
///
/// Returns the charset it announces and the length of the mark.
#[must_use]
pub fn detect_bom(bytes: &[u8]) -> Option<(Charset, usize)> {
    Encoding::for_bom(bytes).map(|(encoding, len)| (Charset::from_encoding(encoding), len))
}

/// Extracts the `charset` parameter of a content type such as
/// `text/html; charset=iso-8859-1`.
#[must_use]
pub fn content_charset(content: &str) -> Option<&str> {
    content.split(';').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}
