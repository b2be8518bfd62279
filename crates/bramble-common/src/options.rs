//! Per-document configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::elements::ElementTable;

/// Parse and output configuration for one document.
///
/// Passed by value into the document at construction. Nothing here is global, so
/// two documents with different settings can live side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Track open elements and report the ones left unclosed at end of input.
    pub check_syntax: bool,
    /// Leave unclosed descendants open until end of input instead of closing
    /// them when their ancestor closes.
    pub auto_close_on_end: bool,
    /// Auto-close same-named predecessors and honor nesting resetters.
    pub fix_nested_tags: bool,
    /// Read the declared encoding from `meta` elements.
    pub read_encoding: bool,
    /// Maintain the id to node index.
    pub use_id_attribute: bool,
    /// Serialize using XML structure and escaping.
    pub output_as_xml: bool,
    /// Write names in their source casing. Takes precedence over upper case.
    pub output_original_case: bool,
    /// Write names in upper case.
    pub output_upper_case: bool,
    /// Drop quotes around attribute values that contain no whitespace.
    pub output_optimize_attribute_values: bool,
    /// Always write void elements as `<name />`.
    pub write_empty_nodes: bool,
    /// Attach a source excerpt to every parse error.
    pub extract_error_source_text: bool,
    /// Maximum excerpt length in characters.
    pub extract_error_source_text_max_length: usize,
    /// Stop parsing once an element with this name is closed.
    pub stopper_node_name: Option<String>,
    /// Emit `_closed`, `_children` and `_child_N` attributes on output.
    pub add_debugging_attributes: bool,
    /// Maximum nesting depth for parsing, traversal and serialization.
    pub max_depth: usize,
    /// Element behavior flags.
    #[serde(skip, default = "ElementTable::shared_default")]
    pub elements: Arc<ElementTable>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            check_syntax: true,
            auto_close_on_end: false,
            fix_nested_tags: false,
            read_encoding: true,
            use_id_attribute: true,
            output_as_xml: false,
            output_original_case: false,
            output_upper_case: false,
            output_optimize_attribute_values: false,
            write_empty_nodes: false,
            extract_error_source_text: false,
            extract_error_source_text_max_length: 100,
            stopper_node_name: None,
            add_debugging_attributes: false,
            max_depth: usize::MAX,
            elements: ElementTable::shared_default(),
        }
    }
}

impl Options {
    /// True when clean nodes may be written as their original source text.
    ///
    /// Any option that rewrites markup forces regeneration instead.
    #[must_use]
    pub const fn is_verbatim_output(&self) -> bool {
        !(self.output_as_xml
            || (self.output_upper_case && !self.output_original_case)
            || self.output_optimize_attribute_values
            || self.write_empty_nodes
            || self.add_debugging_attributes)
    }

    /// Applies the configured casing policy to an element or attribute name.
    ///
    /// `lower` is the lowercase name and `original` the source spelling.
    #[must_use]
    pub fn output_name(&self, lower: &str, original: &str) -> String {
        if self.output_original_case {
            original.to_string()
        } else if self.output_upper_case {
            lower.to_uppercase()
        } else {
            lower.to_string()
        }
    }
}
