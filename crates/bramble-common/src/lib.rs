//! Common building blocks for bramble.
//!
//! This crate provides infrastructure shared by the parser, the tree and the
//! document container:
//! - **Options** - the per-document parse and output configuration
//! - **Element table** - the immutable name to behavior-flags mapping
//! - **Warning System** - deduplicated warnings routed through `log`

/// Name to behavior-flags mapping consulted by the parser and the serializer.
pub mod elements;
/// Parse and output configuration.
pub mod options;
pub mod warning;

pub use elements::{ElementFlags, ElementTable};
pub use options::Options;
