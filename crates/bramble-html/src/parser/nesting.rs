//! Matching end tags to open elements and repairing bad nesting.

use std::sync::Arc;

use bramble_dom::{DomError, ElementData, NodeId, NodeType, SourceSpan};

use super::core::HtmlParser;
use crate::error::ParseErrorCode;

/// What closes an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EndMarker {
    /// The start tag closes itself (`<br>`, `<div/>`).
    Itself,
    /// A real end tag at `start`, `len` bytes long.
    Tag { start: usize, len: usize },
    /// A zero-length closer at the end of the element's content.
    Synthetic,
}

/// Open elements that stop a same-named element from being closed implicitly.
pub(super) fn resetters(name: &str) -> &'static [&'static str] {
    match name {
        "li" => &["ul", "ol"],
        "option" => &["select"],
        "tr" => &["table"],
        "p" => &["div", "header", "footer", "article", "section"],
        "th" | "td" => &["tr", "table"],
        _ => &[],
    }
}

impl HtmlParser<'_> {
    /// Closes `node` against `marker`, first closing any element children that
    /// are still open (unless `auto_close_on_end` defers that to the end of the
    /// document).
    pub(super) fn close_node(&mut self, node: NodeId, marker: EndMarker) -> Result<(), DomError> {
        if !self.options.auto_close_on_end {
            let limit = self.options.max_depth;
            let mut stack = vec![(node, 0_usize, false)];
            while let Some((id, level, expanded)) = stack.pop() {
                if level > limit {
                    return Err(DomError::DepthExceeded { limit });
                }
                if expanded {
                    if id != node {
                        self.finish_node(id, EndMarker::Synthetic);
                    }
                    continue;
                }
                stack.push((id, level, true));
                for &child in self.tree.children(id).iter().rev() {
                    if self.is_open_element(child) {
                        stack.push((child, level + 1, false));
                    }
                }
            }
        }
        self.finish_node(node, marker);
        Ok(())
    }

    fn is_open_element(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some_and(|n| n.is_element() && !n.closed)
    }

    /// Marks `id` closed and stretches its span over its content and end tag.
    fn finish_node(&mut self, id: NodeId, marker: EndMarker) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if node.closed {
            return;
        }
        let name = node.name().to_string();
        let Some(span) = node.span else {
            return;
        };
        let open_end = span.outer_end();
        let (inner_end, outer_end) = match marker {
            EndMarker::Itself => (open_end, open_end),
            EndMarker::Tag { start, len } => (start, start + len),
            EndMarker::Synthetic => {
                let end = self.content_end(id, open_end);
                (end, end)
            }
        };

        if let Some(node) = self.tree.get_mut(id) {
            node.closed = true;
            node.span = Some(SourceSpan {
                outer_start: span.outer_start,
                outer_len: outer_end.saturating_sub(span.outer_start),
                inner_start: open_end,
                inner_len: inner_end.saturating_sub(open_end),
            });
        }
        if let Some(opened) = self.opened.as_mut() {
            let _ = opened.remove(&span.outer_start);
        }
        if self.last_nodes.get(&name) == Some(&id) {
            let _ = self.last_nodes.remove(&name);
            self.update_last_parent_node();
        }
    }

    /// End offset of everything parsed inside `id` so far.
    ///
    /// A closed last child already spans its own content, so the walk only goes
    /// deeper through children left open by `auto_close_on_end`.
    fn content_end(&self, id: NodeId, open_end: usize) -> usize {
        let mut end = open_end;
        let mut current = id;
        while let Some(last) = self.tree.last_child(current) {
            let Some(node) = self.tree.get(last) else {
                break;
            };
            if let Some(span) = node.span {
                end = end.max(span.outer_end());
            }
            if node.closed {
                break;
            }
            current = last;
        }
        end
    }

    /// Moves the insertion point up past elements that are already closed.
    pub(super) fn update_last_parent_node(&mut self) {
        while self.last_parent != NodeId::ROOT
            && self.tree.get(self.last_parent).is_none_or(|n| n.closed)
        {
            self.last_parent = self.tree.parent(self.last_parent).unwrap_or(NodeId::ROOT);
        }
    }

    /// Handles the end of a self-closing start tag or of an end tag ending at
    /// `end`.
    pub(super) fn close_current_node(&mut self, end: usize) -> Result<(), DomError> {
        if let Some(id) = self.current.node
            && self.tree.get(id).is_some_and(|n| n.closed)
        {
            return Ok(());
        }

        let original = self.current_name();
        let name = original.to_ascii_lowercase();
        let elements = Arc::clone(&self.options.elements);
        let start = self.current.start;
        let position = (self.current.line, self.current.column);
        let mut error = false;

        match self.last_nodes.get(&name).copied() {
            None if elements.is_closed(&name) => self.close_orphan_end_tag(original, end)?,
            None if elements.can_overlap(&name) => {
                // kept as literal text
                let id = self.alloc_flat(
                    NodeType::Text(self.slice(start, end).to_string()),
                    start,
                    end,
                    position,
                );
                self.tree.append_parsed(self.last_parent, id);
            }
            None if elements.is_empty_element(&name) => {
                self.add_error(
                    ParseErrorCode::EndTagNotRequired,
                    position,
                    start,
                    format!("End tag </{name}> is not required"),
                );
            }
            None => {
                self.add_error(
                    ParseErrorCode::TagNotOpened,
                    position,
                    start,
                    format!("Start tag <{name}> was not found"),
                );
                error = true;
            }
            Some(prev) => {
                if self.options.fix_nested_tags && self.find_resetter_nodes(prev, resetters(&name)) {
                    self.add_error(
                        ParseErrorCode::EndTagInvalidHere,
                        position,
                        start,
                        format!("End tag </{name}> invalid here"),
                    );
                    error = true;
                }
                if !error {
                    match self.marks.get(&prev).and_then(|mark| mark.prev_same_name) {
                        Some(earlier) => {
                            let _ = self.last_nodes.insert(name.clone(), earlier);
                        }
                        None => {
                            let _ = self.last_nodes.remove(&name);
                        }
                    }
                    let marker = if self.current.node == Some(prev) {
                        EndMarker::Itself
                    } else {
                        EndMarker::Tag {
                            start,
                            len: end - start,
                        }
                    };
                    self.close_node(prev, marker)?;
                }
            }
        }

        if !error && (!elements.is_closed(&name) || self.current.start_tag) {
            self.update_last_parent_node();
        }
        Ok(())
    }

    /// An end tag like `</br>` with nothing open to close.
    ///
    /// If the current parent has an earlier childless element of the same name,
    /// that element takes everything after it and the end tag closes it.
    /// Otherwise the end tag becomes an element of its own.
    fn close_orphan_end_tag(&mut self, original: &str, end: usize) -> Result<(), DomError> {
        let name = original.to_ascii_lowercase();
        let start = self.current.start;
        let siblings = self.tree.children(self.last_parent).to_vec();
        let found = siblings
            .iter()
            .rposition(|&c| self.tree.name(c) == name && !self.tree.has_children(c));

        if let Some(pos) = found {
            let target = siblings[pos];
            for &child in &siblings[pos + 1..] {
                self.tree.move_parsed(target, child);
            }
            if let Some(node) = self.tree.get_mut(target)
                && let Some(span) = node.span
            {
                node.span = Some(SourceSpan {
                    outer_start: span.outer_start,
                    outer_len: end.saturating_sub(span.outer_start),
                    inner_start: span.outer_end(),
                    inner_len: start.saturating_sub(span.outer_end()),
                });
            }
            log::trace!(target: "bramble::parser", "</{name}> at offset {start} closes an earlier <{name}>");
            return Ok(());
        }

        let _ = self.check_depth(self.last_parent)?;
        let position = (self.current.line, self.current.column);
        let id = self.alloc_flat(
            NodeType::Element(ElementData::new(original)),
            start,
            end,
            position,
        );
        if let Some(node) = self.tree.get_mut(id) {
            node.closed = true;
            node.span = Some(SourceSpan {
                outer_start: start,
                outer_len: end.saturating_sub(start),
                inner_start: end,
                inner_len: 0,
            });
        }
        self.tree.append_parsed(self.last_parent, id);
        Ok(())
    }

    fn find_resetter_nodes(&self, node: NodeId, names: &[&str]) -> bool {
        names.iter().any(|name| self.find_resetter_node(node, name))
    }

    /// True if an open `name` element was started at or after `node`.
    fn find_resetter_node(&self, node: NodeId, name: &str) -> bool {
        let Some(&resetter) = self.last_nodes.get(name) else {
            return false;
        };
        let Some(resetter) = self.tree.get(resetter) else {
            return false;
        };
        let position = self.tree.get(node).map_or(0, |n| n.stream_position);
        !resetter.closed && resetter.stream_position >= position
    }

    /// With `fix_nested_tags`, a start tag implicitly closes an open element of
    /// the same name unless a resetter was opened after it.
    pub(super) fn fix_nested_tag(&mut self) -> Result<(), DomError> {
        let name = self.current_name().to_ascii_lowercase();
        let names = resetters(&name);
        if names.is_empty() {
            return Ok(());
        }
        let Some(&prev) = self.last_nodes.get(&name) else {
            return Ok(());
        };
        if !self.is_open_element(prev) || self.find_resetter_nodes(prev, names) {
            return Ok(());
        }
        log::trace!(target: "bramble::parser", "<{name}> at offset {} closes the previous <{name}>", self.current.start);
        self.close_node(prev, EndMarker::Synthetic)
    }

    /// Reports every start tag still open at the end of the input, then closes
    /// them all.
    pub(super) fn fix_opened_nodes(&mut self) -> Result<(), DomError> {
        let Some(opened) = self.opened.take() else {
            return Ok(());
        };
        for &id in opened.values() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let position = (node.line, node.column);
            let stream_position = node.stream_position;
            let reason = format!("End tag </{}> was not found", node.name());
            self.add_error(ParseErrorCode::TagNotClosed, position, stream_position, reason);
        }
        for &id in opened.values().rev() {
            self.close_node(id, EndMarker::Synthetic)?;
        }
        Ok(())
    }
}
