//! Position tracking and the node/attribute push helpers the states call.

use bramble_dom::{Attribute, DomError, ElementData, NodeId, NodeType, QuoteStyle, SourceSpan};

use super::core::{Cursor, CursorKind, ElementMark, HtmlParser, PendingAttribute};
use super::state::ParseState;
use crate::encoding::{Charset, content_charset};
use crate::error::{ParseError, ParseErrorCode};

const fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

impl<'a> HtmlParser<'a> {
    // ===== input =====

    /// Moves past the character just read.
    pub(super) fn increment_position(&mut self) {
        self.index += 1;
        self.max_column = self.column;
        if self.c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !is_continuation(self.c) {
            self.column += 1;
        }
    }

    /// Un-reads the character just read, so the next state sees it again.
    pub(super) fn decrement_position(&mut self) {
        self.index -= 1;
        if self.c == b'\n' {
            self.line -= 1;
            self.column = self.max_column;
        } else if !is_continuation(self.c) {
            self.column -= 1;
        }
    }

    pub(super) fn byte_at(&self, index: usize) -> Option<u8> {
        self.text.as_bytes().get(index).copied()
    }

    /// The character after the one just read.
    pub(super) fn peek(&self) -> Option<u8> {
        self.byte_at(self.index)
    }

    pub(super) fn slice(&self, start: usize, end: usize) -> &'a str {
        self.text.get(start..end).unwrap_or_default()
    }

    /// Name of the element being scanned, as written.
    pub(super) fn current_name(&self) -> &'a str {
        match (self.current.name_start, self.current.name_len) {
            (Some(start), Some(len)) => self.slice(start, start + len),
            _ => "",
        }
    }

    // ===== nodes =====

    pub(super) fn push_node_start(&mut self, kind: CursorKind, index: usize) {
        // elements and comments are started after their `<` was read
        let column = if kind == CursorKind::Text {
            self.column
        } else {
            self.column.saturating_sub(1).max(1)
        };
        self.current = Cursor::new(kind, index, self.line, column);
        self.attribute = None;
    }

    pub(super) fn push_node_name_start(&mut self, start_tag: bool, index: usize) {
        self.current.start_tag = start_tag;
        self.current.name_start = Some(index);
    }

    pub(super) fn push_node_name_end(&mut self, index: usize) -> Result<(), DomError> {
        if let Some(start) = self.current.name_start {
            self.current.name_len = Some(index.saturating_sub(start));
        }
        if self.options.fix_nested_tags
            && self.current.kind == CursorKind::Element
            && self.current.start_tag
        {
            self.fix_nested_tag()?;
        }
        Ok(())
    }

    /// Completes the node being scanned at `index`.
    ///
    /// Text and comments are attached to the current parent. A start tag becomes
    /// an element and the new parent; `close` (or an Empty/Closed element name)
    /// closes it right away. An end tag closes its matching element.
    ///
    /// Returns `Ok(false)` when the stopper element was closed and parsing must
    /// end.
    pub(super) fn push_node_end(&mut self, index: usize, close: bool) -> Result<bool, DomError> {
        if self.current.kind == CursorKind::Element && self.current.name_start.is_none() {
            // a `<` that never got a name is plain text
            self.current.kind = CursorKind::Text;
        }

        let start = self.current.start;
        match self.current.kind {
            CursorKind::Text | CursorKind::Comment => {
                if index > start {
                    let raw = self.slice(start, index).to_string();
                    let node_type = if self.current.kind == CursorKind::Text {
                        NodeType::Text(raw)
                    } else {
                        NodeType::Comment(raw)
                    };
                    let position = (self.current.line, self.current.column);
                    let id = self.alloc_flat(node_type, start, index, position);
                    self.tree.append_parsed(self.last_parent, id);
                }
                return Ok(true);
            }
            CursorKind::Element => {}
        }

        let original = self.current_name();
        let name = original.to_ascii_lowercase();
        let mut close = close;
        if self.current.start_tag && self.current.node.is_none() {
            let id = self.attach_element(original, &name, index)?;
            self.read_document_encoding(id);

            if self.options.elements.is_cdata(&name) {
                self.state = ParseState::PcData;
                self.raw_text_position = (self.line, self.column);
                return Ok(true);
            }
            if self.options.elements.is_closed(&name) || self.options.elements.is_empty_element(&name) {
                close = true;
            }
        }

        if close || !self.current.start_tag {
            let stopper = self
                .options
                .stopper_node_name
                .as_deref()
                .is_some_and(|stopper| stopper.eq_ignore_ascii_case(&name));
            if stopper && self.remainder_offset.is_none() {
                self.remainder_offset = Some(index);
                self.close_current_node(index)?;
                log::trace!(target: "bramble::parser", "stopped after </{name}> at offset {index}");
                return Ok(false);
            }
            self.close_current_node(index)?;
        }
        Ok(true)
    }

    /// Creates the element for the start tag being scanned and makes it the
    /// current parent.
    fn attach_element(&mut self, original: &str, name: &str, end: usize) -> Result<NodeId, DomError> {
        let start = self.current.start;
        let depth = self.check_depth(self.last_parent)?;

        let mut data = ElementData::new(original);
        data.attrs = std::mem::take(&mut self.current.attributes);
        let position = (self.current.line, self.current.column);
        let id = self.alloc_flat(NodeType::Element(data), start, end, position);
        self.tree.append_parsed(self.last_parent, id);

        if let Some(opened) = self.opened.as_mut() {
            let _ = opened.insert(start, id);
        }
        let prev_same_name = self.last_nodes.insert(name.to_string(), id);
        let _ = self.marks.insert(
            id,
            ElementMark {
                prev_same_name,
                depth,
            },
        );
        self.last_parent = id;
        self.current.node = Some(id);
        Ok(id)
    }

    /// Depth a new child of `parent` would have, failing past the limit.
    pub(super) fn check_depth(&self, parent: NodeId) -> Result<usize, DomError> {
        let depth = self.marks.get(&parent).map_or(0, |mark| mark.depth) + 1;
        if depth > self.options.max_depth {
            return Err(DomError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(depth)
    }

    /// Allocates a parsed node covering `start..end` with no separate content.
    pub(super) fn alloc_flat(
        &mut self,
        node_type: NodeType,
        start: usize,
        end: usize,
        (line, column): (usize, usize),
    ) -> NodeId {
        let id = self.tree.alloc_parsed(node_type);
        if let Some(node) = self.tree.get_mut(id) {
            node.span = Some(SourceSpan::flat(start, end.saturating_sub(start)));
            node.line = line;
            node.column = column;
            node.stream_position = start;
        }
        id
    }

    // ===== attributes =====

    pub(super) fn push_attribute_name_start(&mut self, index: usize) {
        self.attribute = Some(PendingAttribute {
            name_start: index,
            name: None,
            value_start: None,
            value_done: false,
            single_quoted: false,
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        });
    }

    pub(super) fn push_attribute_name_end(&mut self, index: usize) {
        let text = self.text;
        let Some(pending) = self.attribute.as_mut() else {
            return;
        };
        let raw = text.get(pending.name_start..index).unwrap_or_default();
        let mut attribute = Attribute::new(raw, "");
        attribute.line = pending.line;
        attribute.column = pending.column;
        attribute.stream_position = pending.name_start;
        pending.name = Some(attribute.name().to_string());
        self.current.attributes.insert(attribute);
    }

    pub(super) fn push_attribute_value_start(&mut self, index: usize, single_quoted: bool) {
        if let Some(pending) = self.attribute.as_mut() {
            pending.value_start = Some(index);
            pending.single_quoted = single_quoted;
        }
    }

    pub(super) fn push_attribute_value_end(&mut self, index: usize) {
        let text = self.text;
        let Some(pending) = self.attribute.as_mut() else {
            return;
        };
        let (Some(name), Some(start)) = (pending.name.as_deref(), pending.value_start) else {
            return;
        };
        pending.value_done = true;
        let value = text.get(start..index).unwrap_or_default();
        if let Some(attribute) = self.current.attributes.get_mut(name) {
            attribute.set_value(value);
            attribute.quote = if pending.single_quoted {
                QuoteStyle::Single
            } else {
                QuoteStyle::Double
            };
        }
    }

    // ===== diagnostics =====

    pub(super) fn add_error(
        &mut self,
        code: ParseErrorCode,
        (line, column): (usize, usize),
        stream_position: usize,
        reason: String,
    ) {
        let source_text = self.options.extract_error_source_text.then(|| {
            self.slice(stream_position, self.text.len())
                .chars()
                .take(self.options.extract_error_source_text_max_length)
                .collect()
        });
        log::trace!(target: "bramble::parser", "{code} at {line}:{column}: {reason}");
        self.errors.push(ParseError {
            code,
            line,
            column,
            stream_position,
            reason,
            source_text,
        });
    }

    /// Picks up the encoding declared by a `<meta>` element.
    ///
    /// Recognises `<meta charset="...">` and
    /// `<meta http-equiv="content-type" content="text/html; charset=...">`.
    pub(super) fn read_document_encoding(&mut self, id: NodeId) {
        if !self.options.read_encoding || self.tree.name(id) != "meta" {
            return;
        }
        let Some(data) = self.tree.as_element(id) else {
            return;
        };
        let label = match data.attrs.value("charset") {
            Some(charset) => charset.to_string(),
            None => {
                let content_type = data
                    .attrs
                    .value("http-equiv")
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"));
                if !content_type {
                    return;
                }
                match data.attrs.value("content").and_then(content_charset) {
                    Some(charset) => charset.to_string(),
                    None => return,
                }
            }
        };
        if label.trim().is_empty() {
            return;
        }

        self.declared_encoding = Charset::from_label(&label);
        if let (Some(stream), Some(declared)) = (&self.stream_encoding, &self.declared_encoding)
            && !stream.same_encoding(declared)
        {
            let reason = format!(
                "Encoding mismatch between StreamEncoding: {} and DeclaredEncoding: {}",
                stream.label(),
                declared.label()
            );
            self.add_error(
                ParseErrorCode::CharsetMismatch,
                (self.line, self.column),
                self.index,
                reason,
            );
        }
    }
}
