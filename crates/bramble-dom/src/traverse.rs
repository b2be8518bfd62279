//! Lazy traversal.
//!
//! Iterators borrow the tree and hold their own cursor, so several can run over
//! the same tree independently. Subtree walks keep an explicit work stack with a
//! depth counter instead of recursing.

use crate::{DomError, DomTree, NodeId, NodeType};

/// Pre-order walk over a subtree, bounded by the tree's `max_depth`.
///
/// Yields `Err(DomError::DepthExceeded)` once when a node sits deeper than the
/// limit, then stops.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<(NodeId, usize)>,
    limit: usize,
    failed: bool,
}

impl Iterator for Descendants<'_> {
    type Item = Result<NodeId, DomError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (id, depth) = self.stack.pop()?;
        if depth > self.limit {
            self.failed = true;
            self.stack.clear();
            return Some(Err(self.tree.depth_exceeded()));
        }
        self.stack
            .extend(self.tree.children(id).iter().rev().map(|&c| (c, depth + 1)));
        Some(Ok(id))
    }
}

/// Iterator over ancestors of a node.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Iterator along sibling links in one direction.
#[derive(Debug, Clone)]
pub struct Siblings<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
    forward: bool,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = if self.forward {
            self.tree.next_sibling(id)
        } else {
            self.tree.prev_sibling(id)
        };
        Some(id)
    }
}

impl DomTree {
    /// Every node below `id` in document order, `id` excluded.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self.children(id).iter().rev().map(|&c| (c, 1)).collect();
        Descendants {
            tree: self,
            stack,
            limit: self.options().max_depth,
            failed: false,
        }
    }

    /// `id` followed by every node below it in document order.
    #[must_use]
    pub fn descendants_and_self(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.get(id).is_some() { vec![(id, 0)] } else { Vec::new() };
        Descendants {
            tree: self,
            stack,
            limit: self.options().max_depth,
            failed: false,
        }
    }

    /// Elements below `id` whose name matches `name`, ignoring case.
    pub fn descendants_named<'a>(
        &'a self,
        id: NodeId,
        name: &str,
    ) -> impl Iterator<Item = Result<NodeId, DomError>> + 'a {
        let name = name.to_ascii_lowercase();
        self.descendants(id)
            .filter(move |item| item.as_ref().map_or(true, |&n| self.name(n) == name))
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(id),
        }
    }

    /// `id` followed by its ancestors up to the root.
    #[must_use]
    pub fn ancestors_and_self(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.get(id).map(|_| id),
        }
    }

    /// Iterate over preceding siblings (from immediately before to first child).
    #[must_use]
    pub fn preceding_siblings(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            current: self.prev_sibling(id),
            forward: false,
        }
    }

    /// Iterate over following siblings (from immediately after to last child).
    #[must_use]
    pub fn following_siblings(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            current: self.next_sibling(id),
            forward: true,
        }
    }

    /// Direct element children of `id` named `name`, ignoring case.
    pub fn elements<'a>(&'a self, id: NodeId, name: &str) -> impl Iterator<Item = NodeId> + 'a {
        let name = name.to_ascii_lowercase();
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.as_element(c).is_some_and(|e| e.name == name))
    }

    /// First direct element child of `id` named `name`.
    #[must_use]
    pub fn element(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.elements(id, name).next()
    }

    /// Concatenated text of every text node below `id`.
    ///
    /// For a text node this is its own text and for a comment node its content
    /// without delimiters.
    ///
    /// # Errors
    /// Returns [`DomError::DepthExceeded`] if the subtree is deeper than the limit.
    pub fn inner_text(&self, id: NodeId) -> Result<String, DomError> {
        match &self.node(id)?.node_type {
            NodeType::Text(text) => return Ok(text.clone()),
            NodeType::Comment(markup) => return Ok(comment_content(markup).to_string()),
            NodeType::Document | NodeType::Element(_) => {}
        }
        let mut text = String::new();
        for node in self.descendants(id) {
            if let Some(chunk) = self.as_text(node?) {
                text.push_str(chunk);
            }
        }
        Ok(text)
    }

    /// Location path of a node, such as `/html[1]/body[1]/div[2]`.
    ///
    /// Each step is the node name plus its 1-based position among same-named
    /// siblings. The Document node's path is `/`.
    #[must_use]
    pub fn xpath(&self, id: NodeId) -> String {
        let mut steps: Vec<String> = self
            .ancestors_and_self(id)
            .filter(|&n| n != NodeId::ROOT)
            .map(|n| {
                let name = self.name(n);
                let position = 1 + self
                    .preceding_siblings(n)
                    .filter(|&s| self.name(s) == name)
                    .count();
                format!("{name}[{position}]")
            })
            .collect();
        steps.reverse();
        format!("/{}", steps.join("/"))
    }
}

/// Content of a stored comment with its `<!--`/`-->` or `<!`/`>` delimiters removed.
#[must_use]
pub fn comment_content(markup: &str) -> &str {
    if let Some(inner) = markup
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
    {
        return inner;
    }
    markup
        .strip_prefix("<!")
        .map_or(markup, |rest| rest.strip_suffix('>').unwrap_or(rest))
}
