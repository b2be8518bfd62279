use std::collections::{BTreeMap, HashMap};

use bramble_common::Options;
use bramble_dom::{Attributes, DomError, DomTree, NodeId, NodeType, SourceSpan};

use super::state::ParseState;
use crate::encoding::Charset;
use crate::error::ParseError;

/// What kind of node the parser is currently scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CursorKind {
    Text,
    Comment,
    Element,
}

/// The node being scanned. Elements only get a tree node once their tag is
/// complete, so everything known so far lives here.
#[derive(Debug)]
pub(super) struct Cursor {
    pub(super) kind: CursorKind,
    pub(super) start: usize,
    pub(super) line: usize,
    pub(super) column: usize,
    pub(super) name_start: Option<usize>,
    pub(super) name_len: Option<usize>,
    pub(super) start_tag: bool,
    pub(super) attributes: Attributes,
    pub(super) node: Option<NodeId>,
}

impl Cursor {
    pub(super) const fn new(kind: CursorKind, start: usize, line: usize, column: usize) -> Self {
        Self {
            kind,
            start,
            line,
            column,
            name_start: None,
            name_len: None,
            start_tag: true,
            attributes: Attributes::new(),
            node: None,
        }
    }
}

/// An attribute whose name or value is still being read.
#[derive(Debug)]
pub(super) struct PendingAttribute {
    pub(super) name_start: usize,
    pub(super) name: Option<String>,
    pub(super) value_start: Option<usize>,
    pub(super) value_done: bool,
    pub(super) single_quoted: bool,
    pub(super) line: usize,
    pub(super) column: usize,
}

/// Parse-time bookkeeping for an open element.
#[derive(Debug, Clone, Copy)]
pub(super) struct ElementMark {
    /// The previously opened element with the same name, still unclosed at the
    /// time this one was opened.
    pub(super) prev_same_name: Option<NodeId>,
    /// Nesting depth below the Document node.
    pub(super) depth: usize,
}

/// Everything a parse produces.
#[derive(Debug)]
pub struct ParseOutput {
    /// The tree, rooted at [`NodeId::ROOT`].
    pub tree: DomTree,
    /// Recoverable problems, in the order they were found.
    pub errors: Vec<ParseError>,
    /// Encoding announced by a `<meta>` element, if any.
    pub declared_encoding: Option<Charset>,
    /// Byte offset where parsing stopped early because of the stopper element.
    pub remainder_offset: Option<usize>,
}

/// Error-tolerant HTML parser.
///
/// Scans the whole input once, left to right, building the tree as it goes.
/// Malformed markup is repaired and reported through [`ParseError`]s; only a
/// nesting depth beyond [`Options::max_depth`] aborts the parse.
pub struct HtmlParser<'a> {
    pub(super) text: &'a str,
    pub(super) options: Options,
    pub(super) tree: DomTree,

    pub(super) state: ParseState,
    /// State to return to when a `<% ... %>` block ends.
    pub(super) old_state: ParseState,
    pub(super) index: usize,
    pub(super) c: u8,
    pub(super) line: usize,
    pub(super) column: usize,
    pub(super) max_column: usize,
    pub(super) full_comment: bool,
    pub(super) quote: u8,
    /// Line and column where the raw text of a CDATA element starts.
    pub(super) raw_text_position: (usize, usize),

    pub(super) current: Cursor,
    pub(super) attribute: Option<PendingAttribute>,
    /// Element that receives new children.
    pub(super) last_parent: NodeId,
    /// Most recently opened, still unclosed element per name.
    pub(super) last_nodes: HashMap<String, NodeId>,
    pub(super) marks: HashMap<NodeId, ElementMark>,
    /// Unclosed start tags keyed by source offset. Only tracked with
    /// `check_syntax`.
    pub(super) opened: Option<BTreeMap<usize, NodeId>>,

    pub(super) errors: Vec<ParseError>,
    pub(super) stream_encoding: Option<Charset>,
    pub(super) declared_encoding: Option<Charset>,
    pub(super) remainder_offset: Option<usize>,
    pub(super) stopped: bool,
}

impl<'a> HtmlParser<'a> {
    /// Creates a parser for `text`.
    #[must_use]
    pub fn new(text: &'a str, options: Options) -> Self {
        let opened = options.check_syntax.then(BTreeMap::new);
        let tree = DomTree::with_source(text.to_string(), options.clone());
        Self {
            text,
            options,
            tree,
            state: ParseState::Text,
            old_state: ParseState::Text,
            index: 0,
            c: 0,
            line: 1,
            column: 1,
            max_column: 1,
            full_comment: false,
            quote: 0,
            raw_text_position: (1, 1),
            current: Cursor::new(CursorKind::Text, 0, 1, 1),
            attribute: None,
            last_parent: NodeId::ROOT,
            last_nodes: HashMap::new(),
            marks: HashMap::new(),
            opened,
            errors: Vec::new(),
            stream_encoding: None,
            declared_encoding: None,
            remainder_offset: None,
            stopped: false,
        }
    }

    /// Sets the encoding the text was decoded from, so a conflicting `<meta>`
    /// declaration can be reported.
    #[must_use]
    pub fn with_stream_encoding(mut self, charset: Option<Charset>) -> Self {
        self.stream_encoding = charset;
        self
    }

    /// Parses the whole input.
    ///
    /// # Errors
    /// Returns [`DomError::DepthExceeded`] if elements nest deeper than
    /// [`Options::max_depth`].
    pub fn run(mut self) -> Result<ParseOutput, DomError> {
        log::debug!(target: "bramble::parser", "parsing {} bytes", self.text.len());

        while !self.stopped && self.index < self.text.len() {
            self.c = self.text.as_bytes()[self.index];
            self.increment_position();
            self.step()?;
        }

        if !self.stopped {
            self.finish_input()?;
        }
        if self.options.check_syntax {
            self.fix_opened_nodes()?;
        }
        if let Some(offset) = self.remainder_offset
            && let Some(root) = self.tree.get_mut(NodeId::ROOT)
        {
            root.span = Some(SourceSpan::flat(0, offset));
        }
        self.tree.rebuild_id_index()?;

        log::debug!(
            target: "bramble::parser",
            "parsed {} nodes, {} errors",
            self.tree.len(),
            self.errors.len()
        );
        Ok(ParseOutput {
            tree: self.tree,
            errors: self.errors,
            declared_encoding: self.declared_encoding,
            remainder_offset: self.remainder_offset,
        })
    }

    fn step(&mut self) -> Result<(), DomError> {
        match self.state {
            ParseState::Text => {
                let _ = self.new_check()?;
            }
            ParseState::WhichTag => self.which_tag_state()?,
            ParseState::Tag => self.tag_state()?,
            ParseState::BetweenAttributes => self.between_attributes_state()?,
            ParseState::EmptyTag => self.empty_tag_state()?,
            ParseState::AttributeName => self.attribute_name_state()?,
            ParseState::AttributeBeforeEquals => self.attribute_before_equals_state()?,
            ParseState::AttributeAfterEquals => self.attribute_after_equals_state()?,
            ParseState::AttributeValue => self.attribute_value_state()?,
            ParseState::QuotedAttributeValue => self.quoted_attribute_value_state(),
            ParseState::Comment => self.comment_state()?,
            ParseState::ServerSideCode => self.server_side_code_state(),
            ParseState::PcData => self.pcdata_state(),
        }
        Ok(())
    }

    // ===== states =====

    fn which_tag_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? {
            return Ok(());
        }
        if self.c == b'/' {
            self.push_node_name_start(false, self.index);
        } else {
            self.push_node_name_start(true, self.index - 1);
            self.decrement_position();
        }
        self.state = ParseState::Tag;
        Ok(())
    }

    fn tag_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? {
            return Ok(());
        }
        if is_whitespace(self.c) {
            self.push_node_name_end(self.index - 1)?;
            self.state = ParseState::BetweenAttributes;
        } else if self.c == b'/' {
            self.push_node_name_end(self.index - 1)?;
            self.state = ParseState::EmptyTag;
        } else if self.c == b'>' {
            self.push_node_name_end(self.index - 1)?;
            self.finish_tag(false)?;
        }
        Ok(())
    }

    fn between_attributes_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? || is_whitespace(self.c) {
            return Ok(());
        }
        match self.c {
            b'/' | b'?' => self.state = ParseState::EmptyTag,
            b'>' => self.finish_tag(false)?,
            _ => {
                self.push_attribute_name_start(self.index - 1);
                self.state = ParseState::AttributeName;
            }
        }
        Ok(())
    }

    fn empty_tag_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? {
            return Ok(());
        }
        if self.c == b'>' {
            return self.finish_tag(true);
        }
        // `<a/b>`: the character after the slash starts an attribute
        self.state = ParseState::BetweenAttributes;
        self.decrement_position();
        Ok(())
    }

    fn attribute_name_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? {
            return Ok(());
        }
        if is_whitespace(self.c) {
            self.push_attribute_name_end(self.index - 1);
            self.state = ParseState::AttributeBeforeEquals;
        } else if self.c == b'=' {
            self.push_attribute_name_end(self.index - 1);
            self.state = ParseState::AttributeAfterEquals;
        } else if self.c == b'>' {
            self.push_attribute_name_end(self.index - 1);
            self.finish_tag(false)?;
        }
        Ok(())
    }

    fn attribute_before_equals_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? || is_whitespace(self.c) {
            return Ok(());
        }
        match self.c {
            b'>' => self.finish_tag(false)?,
            b'=' => self.state = ParseState::AttributeAfterEquals,
            _ => {
                // no `=`: the previous attribute had no value and a new one starts
                self.state = ParseState::BetweenAttributes;
                self.decrement_position();
            }
        }
        Ok(())
    }

    fn attribute_after_equals_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? || is_whitespace(self.c) {
            return Ok(());
        }
        match self.c {
            b'\'' | b'"' => {
                self.state = ParseState::QuotedAttributeValue;
                self.push_attribute_value_start(self.index, self.c == b'\'');
                self.quote = self.c;
            }
            b'>' => self.finish_tag(false)?,
            _ => {
                self.push_attribute_value_start(self.index - 1, false);
                self.state = ParseState::AttributeValue;
            }
        }
        Ok(())
    }

    fn attribute_value_state(&mut self) -> Result<(), DomError> {
        if self.new_check()? {
            return Ok(());
        }
        if is_whitespace(self.c) {
            self.push_attribute_value_end(self.index - 1);
            self.state = ParseState::BetweenAttributes;
        } else if self.c == b'>' {
            self.push_attribute_value_end(self.index - 1);
            self.finish_tag(false)?;
        }
        Ok(())
    }

    fn quoted_attribute_value_state(&mut self) {
        if self.c == self.quote {
            self.push_attribute_value_end(self.index - 1);
            self.state = ParseState::BetweenAttributes;
        } else if self.c == b'<' && self.peek() == Some(b'%') {
            self.old_state = self.state;
            self.state = ParseState::ServerSideCode;
        }
    }

    fn comment_state(&mut self) -> Result<(), DomError> {
        if self.c != b'>' {
            return Ok(());
        }
        if self.full_comment
            && !(self.byte_at(self.index.wrapping_sub(2)) == Some(b'-')
                && self.byte_at(self.index.wrapping_sub(3)) == Some(b'-'))
        {
            return Ok(());
        }
        self.finish_tag(false)
    }

    fn server_side_code_state(&mut self) {
        if self.c != b'%' || self.peek() != Some(b'>') {
            return;
        }
        match self.old_state {
            ParseState::AttributeAfterEquals => self.state = ParseState::AttributeValue,
            ParseState::BetweenAttributes => {
                self.push_attribute_name_end(self.index + 1);
                self.state = ParseState::BetweenAttributes;
            }
            other => self.state = other,
        }
        // step over the `>`
        self.increment_position();
    }

    fn pcdata_state(&mut self) {
        if self.c != b'<' {
            return;
        }
        let Some(element) = self.current.node else {
            return;
        };
        let name = self.tree.name(element).to_string();
        let at = self.index - 1;
        let bytes = self.text.as_bytes();
        let Some(candidate) = bytes.get(at..at + name.len() + 2) else {
            return;
        };
        if !(candidate.starts_with(b"</") && candidate[2..].eq_ignore_ascii_case(name.as_bytes())) {
            return;
        }
        let Some(&next) = bytes.get(at + name.len() + 2) else {
            return;
        };
        if next != b'>' && !is_whitespace(next) {
            return;
        }

        let content_start = self
            .tree
            .get(element)
            .and_then(|n| n.span)
            .map_or(at, |span| span.outer_end());
        self.append_raw_text(element, content_start, at);

        self.push_node_start(CursorKind::Element, at);
        self.push_node_name_start(false, at + 2);
        self.state = ParseState::Tag;
        // step over the `/`
        self.increment_position();
    }

    // ===== shared transitions =====

    /// Handles a `<` seen in most states. Returns true if the character was
    /// consumed here.
    fn new_check(&mut self) -> Result<bool, DomError> {
        if self.c != b'<' {
            return Ok(false);
        }
        if self.peek() == Some(b'%') {
            match self.state {
                ParseState::AttributeAfterEquals => {
                    self.push_attribute_value_start(self.index - 1, false);
                }
                ParseState::BetweenAttributes => self.push_attribute_name_start(self.index - 1),
                ParseState::WhichTag => {
                    self.push_node_name_start(true, self.index - 1);
                    self.state = ParseState::Tag;
                }
                _ => {}
            }
            self.old_state = self.state;
            self.state = ParseState::ServerSideCode;
            return Ok(true);
        }

        // a tag left unterminated by a new `<` ends here, as if self-closed
        self.complete_pending(self.index - 1)?;
        if !self.push_node_end(self.index - 1, true)? {
            self.stopped = true;
            return Ok(true);
        }
        self.state = ParseState::WhichTag;
        if self.peek() == Some(b'!') {
            self.push_node_start(CursorKind::Comment, self.index - 1);
            self.push_node_name_start(true, self.index);
            self.push_node_name_end(self.index + 1)?;
            self.state = ParseState::Comment;
            self.full_comment = self.byte_at(self.index + 1) == Some(b'-')
                && self.byte_at(self.index + 2) == Some(b'-');
            return Ok(true);
        }
        self.push_node_start(CursorKind::Element, self.index - 1);
        Ok(true)
    }

    /// Ends the current tag at the `>` just read, then starts a text node
    /// unless the tag switched the parser into raw text.
    fn finish_tag(&mut self, close: bool) -> Result<(), DomError> {
        let state = self.state;
        if !self.push_node_end(self.index, close)? {
            self.stopped = true;
            return Ok(());
        }
        if self.state == state {
            self.state = ParseState::Text;
            self.push_node_start(CursorKind::Text, self.index);
        }
        Ok(())
    }

    /// Finalizes whatever is left when the input runs out.
    fn finish_input(&mut self) -> Result<(), DomError> {
        let end = self.text.len();
        if self.state == ParseState::PcData {
            // no end tag: the rest of the input is the element's text
            if let Some(element) = self.current.node {
                let start = self
                    .tree
                    .get(element)
                    .and_then(|n| n.span)
                    .map_or(end, |span| span.outer_end());
                self.append_raw_text(element, start, end);
            }
            return Ok(());
        }
        self.complete_pending(end)?;
        let _ = self.push_node_end(end, false)?;
        Ok(())
    }

    /// Ends an element name or attribute that is still being read.
    fn complete_pending(&mut self, index: usize) -> Result<(), DomError> {
        if self.current.kind != CursorKind::Element {
            return Ok(());
        }
        if self.current.name_start.is_some() && self.current.name_len.is_none() {
            self.push_node_name_end(index)?;
        }
        let (name_open, value_open) = match &self.attribute {
            Some(attribute) => (
                attribute.name.is_none(),
                attribute.value_start.is_some() && !attribute.value_done,
            ),
            None => (false, false),
        };
        if name_open {
            self.push_attribute_name_end(index);
        } else if value_open {
            self.push_attribute_value_end(index);
        }
        Ok(())
    }

    fn append_raw_text(&mut self, parent: NodeId, start: usize, end: usize) {
        if end <= start {
            return;
        }
        let text = NodeType::Text(self.slice(start, end).to_string());
        let id = self.alloc_flat(text, start, end, self.raw_text_position);
        self.tree.append_parsed(parent, id);
    }
}

/// Print the tree below `id`, one node per line.
///
/// # Errors
/// Returns [`DomError::DepthExceeded`] if the subtree is deeper than the tree's
/// `max_depth`.
pub fn print_tree(tree: &DomTree, id: NodeId, indent: usize) -> Result<(), DomError> {
    print!("{}", format_tree(tree, id, indent)?);
    Ok(())
}

/// The text [`print_tree`] prints.
///
/// # Errors
/// Returns [`DomError::DepthExceeded`] if the subtree is deeper than the tree's
/// `max_depth`.
pub fn format_tree(tree: &DomTree, id: NodeId, indent: usize) -> Result<String, DomError> {
    let mut out = String::new();
    // open ancestors of the node being printed, innermost last
    let mut path: Vec<NodeId> = Vec::new();
    for node_id in tree.descendants_and_self(id) {
        let node_id = node_id?;
        let parent = tree.parent(node_id);
        while path.last().is_some_and(|&top| Some(top) != parent) {
            let _ = path.pop();
        }
        let Some(node) = tree.get(node_id) else {
            continue;
        };
        let prefix = "  ".repeat(indent + path.len());
        path.push(node_id);
        let line = match &node.node_type {
            NodeType::Document => "#document".to_string(),
            NodeType::Element(data) => {
                let attrs: Vec<String> = data
                    .attrs
                    .iter()
                    .map(|a| {
                        if a.value().is_empty() {
                            a.original_name().to_string()
                        } else {
                            format!("{}=\"{}\"", a.original_name(), a.value())
                        }
                    })
                    .collect();
                let closed = if node.closed { "" } else { " (unclosed)" };
                if attrs.is_empty() {
                    format!("<{}>{closed}", data.name)
                } else {
                    format!("<{} {}>{closed}", data.name, attrs.join(" "))
                }
            }
            NodeType::Text(text) => {
                let display = text.replace('\n', "\\n").replace(' ', "\u{00B7}");
                format!("\"{display}\"")
            }
            NodeType::Comment(markup) => markup.clone(),
        };
        out.push_str(&prefix);
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

pub(super) const fn is_whitespace(c: u8) -> bool {
    matches!(c, b'\n' | b'\r' | b' ' | b'\t')
}
