//! Lazy markup generation.
//!
//! A clean node answers from its cache or from its slice of the source text. A
//! changed node is regenerated from its current structure; the result is cached
//! and the node's own flag is cleared. Ancestors stay changed until they are
//! rendered themselves.

use std::ops::Range;

use bramble_common::Options;

use crate::traverse::comment_content;
use crate::{DomError, DomTree, ElementData, Node, NodeId, NodeType};

/// Encodes `&`, `<`, `>` and `"` for XML output.
///
/// An ampersand that already starts an `&amp;`, `&lt;`, `&gt;` or `&quot;`
/// reference is left alone.
#[must_use]
pub fn html_encode(text: &str) -> String {
    const KNOWN: [&str; 4] = ["amp;", "lt;", "gt;", "quot;"];
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' => {
                let rest = &text[i + 1..];
                let encoded = KNOWN.iter().any(|entity| {
                    rest.get(..entity.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(entity))
                });
                out.push_str(if encoded { "&" } else { "&amp;" });
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turns an HTML name into a valid XML name.
///
/// Characters other than letters, digits, `_`, `-`, `.` and `:` become `_`, and
/// a name that does not start with a letter, `_` or `:` gets a `_` prefix.
#[must_use]
pub fn xml_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !out.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == ':') {
        out.insert(0, '_');
    }
    out
}

enum Step {
    Open(NodeId, usize),
    Close { tag: Option<String>, top: bool },
}

/// Renders nodes of a tree to HTML or XML text.
///
/// [`DomTree::outer_html`] and [`DomTree::inner_html`] go through a serializer
/// built from the tree's own options and cache their result. A serializer made
/// with [`Serializer::with_options`] renders with other settings and never
/// touches the caches.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    tree: &'a DomTree,
    options: &'a Options,
    use_caches: bool,
}

impl<'a> Serializer<'a> {
    /// A serializer using the tree's options.
    #[must_use]
    pub fn new(tree: &'a DomTree) -> Self {
        Self {
            tree,
            options: tree.options(),
            use_caches: true,
        }
    }

    /// A serializer using `options` for output decisions.
    #[must_use]
    pub const fn with_options(tree: &'a DomTree, options: &'a Options) -> Self {
        Self {
            tree,
            options,
            use_caches: false,
        }
    }

    /// Markup of the node including its own tags.
    ///
    /// # Errors
    /// Returns [`DomError::DepthExceeded`] past the depth limit.
    pub fn outer_html(&self, id: NodeId) -> Result<String, DomError> {
        self.render(id).map(|(outer, _)| outer)
    }

    /// Markup of the node's content.
    ///
    /// # Errors
    /// Returns [`DomError::DepthExceeded`] past the depth limit.
    pub fn inner_html(&self, id: NodeId) -> Result<String, DomError> {
        let (outer, inner) = self.render(id)?;
        Ok(outer[inner].to_string())
    }

    /// Writes the markup of a clean node without regenerating it.
    /// Returns false if the node has to be regenerated.
    fn push_reusable(&self, id: NodeId, out: &mut String) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        if node.changed.get() {
            return false;
        }
        if self.use_caches
            && let Some(cached) = node.outer_cache.borrow().as_deref()
        {
            out.push_str(cached);
            return true;
        }
        match source_slice(self.tree, self.options, node, false) {
            Some(text) => {
                out.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Regenerates `top` from its structure. Clean descendants are reused.
    ///
    /// Returns the outer markup and the byte range of the inner markup within it.
    pub(crate) fn render(&self, top: NodeId) -> Result<(String, Range<usize>), DomError> {
        let xml = self.options.output_as_xml;
        let limit = self.options.max_depth;
        let mut out = String::new();
        let mut inner = 0..0;
        let mut inner_start = 0;
        let mut stack = vec![Step::Open(top, 0)];

        while let Some(step) = stack.pop() {
            let (id, depth) = match step {
                Step::Open(id, depth) => (id, depth),
                Step::Close { tag, top } => {
                    if top {
                        inner = inner_start..out.len();
                    }
                    if let Some(tag) = tag {
                        out.push_str("</");
                        out.push_str(&tag);
                        out.push('>');
                    }
                    continue;
                }
            };
            if depth > limit {
                return Err(self.tree.depth_exceeded());
            }
            let is_top = id == top;
            if !is_top && self.push_reusable(id, &mut out) {
                continue;
            }
            let node = self.tree.node(id)?;
            let start = out.len();
            match &node.node_type {
                NodeType::Text(text) => {
                    if xml {
                        out.push_str(&html_encode(text));
                    } else {
                        out.push_str(text);
                    }
                    if is_top {
                        inner = start..out.len();
                    }
                }
                NodeType::Comment(markup) => {
                    if xml {
                        out.push_str("<!--");
                        out.push_str(&comment_content(markup).replace("--", " - -"));
                        out.push_str(" -->");
                    } else {
                        out.push_str(markup);
                    }
                    if is_top {
                        inner = start..out.len();
                    }
                }
                NodeType::Document => {
                    let wrapper = if xml { self.open_document(id, &mut out) } else { None };
                    inner_start = out.len();
                    stack.push(Step::Close {
                        tag: wrapper,
                        top: is_top,
                    });
                    push_children(&mut stack, node, depth);
                }
                NodeType::Element(data) => {
                    if xml && (data.name.trim().is_empty() || data.name.starts_with('?')) {
                        continue;
                    }
                    let mut name = self.options.output_name(&data.name, &data.original_name);
                    if xml {
                        name = xml_name(&name);
                    }
                    out.push('<');
                    out.push_str(&name);
                    self.write_attributes(node, data, &mut out);

                    if node.children.is_empty() {
                        self.close_childless(&data.name, &name, &mut out);
                        if is_top {
                            inner = out.len()..out.len();
                        }
                        continue;
                    }

                    out.push('>');
                    if is_top {
                        inner_start = out.len();
                    }
                    if xml && self.options.elements.is_cdata(&data.name) {
                        out.push_str("\r\n//<![CDATA[\r\n");
                        for &child in &node.children {
                            if let Some(text) = self.tree.as_text(child) {
                                out.push_str(text);
                            }
                        }
                        out.push_str("\r\n//]]>//\r\n");
                        stack.push(Step::Close {
                            tag: Some(name),
                            top: is_top,
                        });
                        continue;
                    }
                    stack.push(Step::Close {
                        tag: Some(name),
                        top: is_top,
                    });
                    push_children(&mut stack, node, depth);
                }
            }
        }
        Ok((out, inner))
    }

    /// Writes the XML declaration and opens a wrapper when there are several roots.
    fn open_document(&self, id: NodeId, out: &mut String) -> Option<String> {
        out.push_str(&format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>",
            self.tree.output_encoding()
        ));
        let children = self.tree.children(id);
        let declarations = children
            .iter()
            .filter(|&&c| self.tree.name(c) == "?xml")
            .count();
        if children.len() - declarations <= 1 {
            return None;
        }
        let wrapper = if self.options.output_upper_case && !self.options.output_original_case {
            "SPAN"
        } else {
            "span"
        };
        out.push('<');
        out.push_str(wrapper);
        out.push('>');
        Some(wrapper.to_string())
    }

    fn close_childless(&self, lower: &str, name: &str, out: &mut String) {
        if self.options.elements.is_empty_element(lower) {
            if self.options.write_empty_nodes || self.options.output_as_xml {
                out.push_str(" />");
            } else {
                if lower.starts_with('?') {
                    out.push('?');
                }
                out.push('>');
            }
        } else {
            out.push_str("></");
            out.push_str(name);
            out.push('>');
        }
    }

    fn write_attributes(&self, node: &Node, data: &ElementData, out: &mut String) {
        for attr in &data.attrs {
            if !self.options.output_as_xml && attr.is_server_code() {
                out.push(' ');
                out.push_str(attr.original_name());
                continue;
            }
            let mut name = self.options.output_name(attr.name(), attr.original_name());
            let mut value = attr.value().to_string();
            if self.options.output_as_xml {
                name = xml_name(&name);
                value = html_encode(&value);
            }
            out.push(' ');
            out.push_str(&name);
            out.push('=');
            let bare = self.options.output_optimize_attribute_values
                && !self.options.output_as_xml
                && !value.is_empty()
                && !value.contains([' ', '\t', '\n', '\r', '"', '\'', '>']);
            if bare {
                out.push_str(&value);
                continue;
            }
            out.push(attr.quote.as_char());
            out.push_str(&attr.quote.escape(&value));
            out.push(attr.quote.as_char());
        }

        if self.options.add_debugging_attributes {
            out.push_str(&format!(
                " _closed=\"{}\" _children=\"{}\"",
                node.closed,
                node.children.len()
            ));
            for (i, &child) in node.children.iter().enumerate() {
                out.push_str(&format!(" _child_{i}=\"{}\"", self.tree.name(child)));
            }
        }
    }
}

fn push_children(stack: &mut Vec<Step>, node: &Node, depth: usize) {
    stack.extend(node.children.iter().rev().map(|&c| Step::Open(c, depth + 1)));
}

/// Source text of a clean, closed node when the output options allow it.
fn source_slice<'t>(
    tree: &'t DomTree,
    options: &Options,
    node: &Node,
    inner: bool,
) -> Option<&'t str> {
    if !options.is_verbatim_output() || !node.closed {
        return None;
    }
    let span = node.span?;
    let range = if inner {
        span.inner_start..span.inner_end()
    } else {
        span.outer_start..span.outer_end()
    };
    tree.source().get(range)
}

impl DomTree {
    /// Markup of a node including its own tags.
    ///
    /// A clean node returns its cached markup or its original source text. A
    /// changed node is regenerated, cached, and marked clean.
    ///
    /// # Errors
    /// Returns [`DomError::UnknownNode`] or [`DomError::DepthExceeded`].
    pub fn outer_html(&self, id: NodeId) -> Result<String, DomError> {
        let node = self.node(id)?;
        if !node.changed.get() {
            if let Some(cached) = node.outer_cache.borrow().as_ref() {
                return Ok(cached.clone());
            }
            if let Some(text) = source_slice(self, self.options(), node, false) {
                return Ok(text.to_string());
            }
        }
        self.refresh(id).map(|(outer, _)| outer)
    }

    /// Markup of a node's content, following the same rules as
    /// [`DomTree::outer_html`].
    ///
    /// # Errors
    /// Returns [`DomError::UnknownNode`] or [`DomError::DepthExceeded`].
    pub fn inner_html(&self, id: NodeId) -> Result<String, DomError> {
        let node = self.node(id)?;
        if !node.changed.get() {
            if let Some(cached) = node.inner_cache.borrow().as_ref() {
                return Ok(cached.clone());
            }
            if let Some(text) = source_slice(self, self.options(), node, true) {
                return Ok(text.to_string());
            }
        }
        self.refresh(id).map(|(_, inner)| inner)
    }

    fn refresh(&self, id: NodeId) -> Result<(String, String), DomError> {
        let (outer, range) = Serializer::new(self).render(id)?;
        let inner = outer[range].to_string();
        let node = self.node(id)?;
        *node.outer_cache.borrow_mut() = Some(outer.clone());
        *node.inner_cache.borrow_mut() = Some(inner.clone());
        node.changed.set(false);
        log::trace!(target: "bramble::serialize", "regenerated {} ({} bytes)", node.name(), outer.len());
        Ok((outer, inner))
    }
}
