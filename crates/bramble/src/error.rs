//! Errors returned by [`Document`](crate::Document) operations.

use bramble_dom::DomError;
use thiserror::Error;

/// Why a load, save or tree operation could not complete.
///
/// Malformed markup is not an error here; it is recorded in
/// [`Document::errors`](crate::Document::errors) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A tree operation failed, including a parse that nested too deeply.
    #[error(transparent)]
    Dom(#[from] DomError),

    /// Reading the input or writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
