//! Node tree for bramble.
//!
//! This crate provides the arena-based tree that the HTML parser builds and that
//! callers query and mutate afterwards.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues. A node is
//! owned by the tree for the tree's whole life; unlinking it only detaches it.
//!
//! Every node remembers the slice of source text it was parsed from. As long as a
//! node is clean, asking for its markup returns that slice. Mutations mark the node
//! and all of its ancestors changed, and the next request regenerates the markup
//! (see [`DomTree::outer_html`]).

mod attributes;
mod error;
mod mutation;
mod serialize;
mod traverse;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::str::FromStr;

use bramble_common::Options;

pub use attributes::{Attribute, Attributes, QuoteStyle};
pub use error::DomError;
pub use serialize::{Serializer, html_encode, xml_name};
pub use traverse::{Ancestors, Descendants, Siblings, comment_content};

/// A type-safe index into the tree.
///
/// `NodeId` provides O(1) access to any node in the tree without borrowing issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// Byte offsets of a parsed node in the source text.
///
/// `outer` covers the whole node including its tags; `inner` covers only the
/// content between the start tag and the end tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSpan {
    /// Offset of the first byte of the node.
    pub outer_start: usize,
    /// Length of the node, tags included.
    pub outer_len: usize,
    /// Offset of the first content byte.
    pub inner_start: usize,
    /// Length of the content.
    pub inner_len: usize,
}

impl SourceSpan {
    /// A span whose inner and outer ranges are the same, as for text.
    #[must_use]
    pub const fn flat(start: usize, len: usize) -> Self {
        Self {
            outer_start: start,
            outer_len: len,
            inner_start: start,
            inner_len: len,
        }
    }

    /// Offset one past the last byte of the node.
    #[must_use]
    pub const fn outer_end(&self) -> usize {
        self.outer_start + self.outer_len
    }

    /// Offset one past the last content byte.
    #[must_use]
    pub const fn inner_end(&self) -> usize {
        self.inner_start + self.inner_len
    }
}

/// What kind of node this is, with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    /// The single root of every tree.
    Document,
    /// An element with a name and attributes.
    Element(ElementData),
    /// Character data, stored exactly as it appeared in the source.
    Text(String),
    /// A comment, doctype or other `<!...>` construct, stored with its delimiters.
    Comment(String),
}

/// Element-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name.
    pub name: String,
    /// Tag name as written in the source.
    pub original_name: String,
    /// Attributes in source order.
    pub attrs: Attributes,
}

impl ElementData {
    /// Element data for `name` with no attributes.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            original_name: name.to_string(),
            attrs: Attributes::new(),
        }
    }

    /// Returns the element's id attribute value if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.value("id")
    }
}

/// One node of the tree.
///
/// Structural links are read-only from outside the crate; they change only through
/// [`DomTree`]'s mutation methods, which keep parent, child and sibling links in step.
#[derive(Debug, Clone)]
pub struct Node {
    /// Kind and payload.
    pub node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    /// Source offsets, set by the parser. `None` for nodes created in code.
    pub span: Option<SourceSpan>,
    /// 1-based source line, 0 for nodes created in code.
    pub line: usize,
    /// 1-based source column, 0 for nodes created in code.
    pub column: usize,
    /// Byte offset where the node starts in the source.
    pub stream_position: usize,
    /// An end tag, real or synthesized, has been matched to this node.
    /// Always true for non-element nodes.
    pub closed: bool,
    changed: Cell<bool>,
    outer_cache: RefCell<Option<String>>,
    inner_cache: RefCell<Option<String>>,
}

impl Node {
    fn new(node_type: NodeType, changed: bool) -> Self {
        let closed = !matches!(node_type, NodeType::Element(_));
        Self {
            node_type,
            parent: None,
            children: Vec::new(),
            prev_sibling: None,
            next_sibling: None,
            span: None,
            line: 0,
            column: 0,
            stream_position: 0,
            closed,
            changed: Cell::new(changed),
            outer_cache: RefCell::new(None),
            inner_cache: RefCell::new(None),
        }
    }

    /// Parent node, if attached.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in document order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Sibling immediately before this node.
    #[must_use]
    pub const fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    /// Sibling immediately after this node.
    #[must_use]
    pub const fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// True when the node's markup must be regenerated before it is read.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed.get()
    }

    /// Lowercase element name, or `#document`, `#text`, `#comment`.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.node_type {
            NodeType::Document => "#document",
            NodeType::Element(data) => &data.name,
            NodeType::Text(_) => "#text",
            NodeType::Comment(_) => "#comment",
        }
    }

    /// Element name as written, or the pseudo-name for other kinds.
    #[must_use]
    pub fn original_name(&self) -> &str {
        match &self.node_type {
            NodeType::Element(data) => &data.original_name,
            _ => self.name(),
        }
    }

    /// Element data if this node is an element.
    #[must_use]
    pub const fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Attributes if this node is an element.
    #[must_use]
    pub const fn attributes(&self) -> Option<&Attributes> {
        match &self.node_type {
            NodeType::Element(data) => Some(&data.attrs),
            _ => None,
        }
    }

    /// True for element nodes.
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }

    /// True for nodes that may hold children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self.node_type, NodeType::Document | NodeType::Element(_))
    }
}

/// Arena-based node tree with O(1) node access and traversal.
///
/// This structure stores all nodes in a contiguous vector, using indices
/// for all relationships. It also owns the source text the nodes point into,
/// the configuration used to render them, and the optional id index.
#[derive(Debug, Clone)]
pub struct DomTree {
    /// All nodes in the tree, indexed by `NodeId`.
    /// The Document node is always at index 0 (`NodeId::ROOT`).
    nodes: Vec<Node>,
    source: String,
    options: Options,
    id_index: Option<HashMap<String, NodeId>>,
    output_encoding: String,
}

impl DomTree {
    /// Create an empty tree with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(String::new(), Options::default())
    }

    /// Create an empty tree with the given options.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self::with_source(String::new(), options)
    }

    /// Create a tree for `source`, holding only the Document node.
    ///
    /// The Document node spans the whole source, so an untouched tree renders
    /// back to exactly `source`.
    #[must_use]
    pub fn with_source(source: String, options: Options) -> Self {
        let mut document = Node::new(NodeType::Document, false);
        document.span = Some(SourceSpan::flat(0, source.len()));
        document.line = 1;
        document.column = 1;
        let id_index = options.use_id_attribute.then(HashMap::new);
        Self {
            nodes: vec![document],
            source,
            options,
            id_index,
            output_encoding: "utf-8".to_string(),
        }
    }

    /// Get the root document node ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    ///
    /// Edits made through this reference bypass change tracking; call
    /// [`DomTree::mark_changed`] afterwards if they affect the markup.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Like [`DomTree::get`], failing with [`DomError::UnknownNode`].
    ///
    /// # Errors
    /// Returns an error if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    /// Get the number of allocated nodes, attached or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the Document).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The source text this tree was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The configuration used for id indexing, depth limits and output.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Replaces the configuration.
    ///
    /// Cached markup is discarded and the id index is rebuilt or dropped to match
    /// `use_id_attribute`.
    ///
    /// # Errors
    /// Returns [`DomError::DepthExceeded`] if rebuilding the id index walks past
    /// the new depth limit.
    pub fn set_options(&mut self, options: Options) -> Result<(), DomError> {
        self.options = options;
        for node in &mut self.nodes {
            *node.outer_cache.get_mut() = None;
            *node.inner_cache.get_mut() = None;
        }
        self.rebuild_id_index()
    }

    /// Encoding label written into the XML declaration.
    #[must_use]
    pub fn output_encoding(&self) -> &str {
        &self.output_encoding
    }

    /// Sets the encoding label written into the XML declaration.
    pub fn set_output_encoding(&mut self, label: &str) {
        label.clone_into(&mut self.output_encoding);
    }

    /// Allocate a new node and return its ID.
    ///
    /// The node is detached and starts out changed, so it always renders from its
    /// structure.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        self.push(Node::new(node_type, true))
    }

    /// Allocate a node on behalf of a parser.
    ///
    /// The node starts out clean; the caller is expected to fill in its span and
    /// position before anyone renders it.
    pub fn alloc_parsed(&mut self, node_type: NodeType) -> NodeId {
        self.push(Node::new(node_type, false))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Appends `child` to `parent` while building a parsed tree.
    ///
    /// No change tracking and no id indexing: the parser links fresh, detached
    /// nodes into a tree that nobody has rendered yet. Ids that do not belong to
    /// this tree are ignored.
    pub fn append_parsed(&mut self, parent: NodeId, child: NodeId) {
        if self.get(child).is_none() {
            return;
        }
        let Some(index) = self.get(parent).map(|n| n.children.len()) else {
            return;
        };
        self.link_at(parent, child, index);
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// True if the node has at least one child.
    #[must_use]
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Get the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Lowercase name of a node, empty for unknown ids.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        self.get(id).map_or("", Node::name)
    }

    /// Source-cased name of a node, empty for unknown ids.
    #[must_use]
    pub fn original_name(&self, id: NodeId) -> &str {
        self.get(id).map_or("", Node::original_name)
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Get the raw markup of a comment node, delimiters included.
    #[must_use]
    pub fn as_comment(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Comment(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Value of an attribute on an element, looked up case-insensitively.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.as_element(id).and_then(|e| e.attrs.value(name))
    }

    /// Value of an attribute parsed as `T`, or `default` when the attribute is
    /// missing or does not parse.
    ///
    /// ```ignore
    /// let width: u32 = tree.attribute_value(img, "width", 0);
    /// let title: String = tree.attribute_value(img, "title", String::new());
    /// ```
    #[must_use]
    pub fn attribute_value<T: FromStr>(&self, id: NodeId, name: &str, default: T) -> T {
        self.attribute(id, name)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Check if `descendant` is a descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// True if the node is the Document node or hangs below it.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.is_descendant_of(id, NodeId::ROOT)
    }

    /// The first element child of the Document node, usually `<html>`.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .copied()
            .find(|&id| self.get(id).is_some_and(Node::is_element))
    }

    pub(crate) const fn depth_exceeded(&self) -> DomError {
        DomError::DepthExceeded {
            limit: self.options.max_depth,
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
