//! High-level document API for bramble.
//!
//! # Scope
//!
//! This crate provides:
//! - **Document Loading** - decode bytes (byte order mark, declared or default
//!   encoding) and parse them into a tree
//! - **Queries** - id lookup, parse errors, encodings, unparsed remainder
//! - **Saving** - write the document back as HTML or XML, reusing the original
//!   markup of every node that was not modified
//!
//! # Example
//!
//! ```ignore
//! let mut doc = Document::parse("<div id=main><p>hello</div>")?;
//! let main = doc.get_by_id("main")?.unwrap();
//! doc.tree_mut().set_attribute(main, "class", "x")?;
//! assert_eq!(doc.to_html()?, "<div id=\"main\" class=\"x\"><p>hello</div>");
//! ```

mod document;
mod error;

pub use bramble_common as common;
pub use bramble_dom as dom;
pub use bramble_html as html;

pub use bramble_common::Options;
pub use bramble_dom::{DomError, DomTree, NodeId};
pub use bramble_html::{Charset, ParseError, ParseErrorCode};
pub use document::Document;
pub use error::Error;
