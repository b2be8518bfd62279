//! Structural and attribute mutation.
//!
//! Every public operation here keeps parent, child and sibling links consistent,
//! keeps the id index in step, and marks the modified node and all its
//! ancestors changed.

use std::collections::HashMap;

use crate::{Attribute, DomError, DomTree, ElementData, Node, NodeId, NodeType};

impl DomTree {
    // ===== low-level linking =====

    /// Inserts a detached `child` into `parent.children` at `index`, fixing up
    /// sibling links on both sides.
    pub(crate) fn link_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let siblings = &self.nodes[parent.0].children;
        let prev = index.checked_sub(1).and_then(|i| siblings.get(i).copied());
        let next = siblings.get(index).copied();

        self.nodes[parent.0].children.insert(index, child);
        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.prev_sibling = prev;
        node.next_sibling = next;
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = Some(child);
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = Some(child);
        }
    }

    /// Removes `child` from its parent, joining its former siblings to each other.
    /// Returns the old parent.
    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes[child.0].parent.take()?;
        let prev = self.nodes[child.0].prev_sibling.take();
        let next = self.nodes[child.0].next_sibling.take();
        self.nodes[parent.0].children.retain(|&c| c != child);
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = next;
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = prev;
        }
        Some(parent)
    }

    /// Moves a parsed node to the end of `parent`'s children while the tree is
    /// still being built. Like [`DomTree::append_parsed`], nothing is tracked
    /// and unknown ids are ignored.
    pub fn move_parsed(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() {
            return;
        }
        let _ = self.unlink(child);
        self.append_parsed(parent, child);
    }

    /// Unlinks `child` from wherever it currently is, updating the id index and
    /// change flags of the old location.
    fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
        if self.nodes[child.0].parent.is_none() {
            return Ok(());
        }
        self.unregister_ids(child)?;
        if let Some(parent) = self.unlink(child) {
            self.mark_changed(parent);
        }
        Ok(())
    }

    fn index_of(&self, parent: NodeId, reference: NodeId) -> Result<usize, DomError> {
        self.children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::NotAChild { parent, reference })
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.node(parent)?.is_container() {
            return Err(DomError::NotAContainer(parent));
        }
        let node = self.node(child)?;
        if matches!(node.node_type, NodeType::Document)
            || child == parent
            || self.is_descendant_of(parent, child)
        {
            return Err(DomError::WouldCycle {
                node: child,
                parent,
            });
        }
        Ok(())
    }

    fn insert_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<(), DomError> {
        self.link_at(parent, child, index);
        self.register_ids(child)?;
        self.mark_changed(parent);
        Ok(())
    }

    // ===== change tracking =====

    /// Marks `id` and every ancestor changed, dropping their cached markup.
    pub fn mark_changed(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(node) = self.nodes.get_mut(id.0) else {
                return;
            };
            node.changed.set(true);
            *node.outer_cache.get_mut() = None;
            *node.inner_cache.get_mut() = None;
            current = node.parent;
        }
    }

    // ===== child list mutation =====

    /// Appends `child` as the last child of `parent`.
    ///
    /// A child that is already attached somewhere is moved.
    ///
    /// # Errors
    /// Fails if `parent` cannot hold children or the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.check_insert(parent, child)?;
        self.detach(child)?;
        let index = self.children(parent).len();
        self.insert_at(parent, child, index)?;
        Ok(child)
    }

    /// Inserts `child` as the first child of `parent`.
    ///
    /// # Errors
    /// Fails if `parent` cannot hold children or the move would create a cycle.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.check_insert(parent, child)?;
        self.detach(child)?;
        self.insert_at(parent, child, 0)?;
        Ok(child)
    }

    /// Inserts `child` right before `reference`, or at the end when `reference`
    /// is `None`.
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `reference` is not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        let Some(reference) = reference else {
            return self.append_child(parent, child);
        };
        self.check_insert(parent, child)?;
        let _ = self.index_of(parent, reference)?;
        if child == reference {
            return Ok(child);
        }
        self.detach(child)?;
        let index = self.index_of(parent, reference)?;
        self.insert_at(parent, child, index)?;
        Ok(child)
    }

    /// Inserts `child` right after `reference`, or at the start when `reference`
    /// is `None`.
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `reference` is not a child of `parent`.
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, DomError> {
        let Some(reference) = reference else {
            return self.prepend_child(parent, child);
        };
        self.check_insert(parent, child)?;
        let _ = self.index_of(parent, reference)?;
        if child == reference {
            return Ok(child);
        }
        self.detach(child)?;
        let index = self.index_of(parent, reference)? + 1;
        self.insert_at(parent, child, index)?;
        Ok(child)
    }

    /// Detaches `child` from `parent` and returns it.
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.remove_child_with(parent, child, false)
    }

    /// Detaches `child` from `parent`. With `keep_grandchildren` the child's own
    /// children are moved up into its place first, in order.
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `child` is not a child of `parent`.
    pub fn remove_child_with(
        &mut self,
        parent: NodeId,
        child: NodeId,
        keep_grandchildren: bool,
    ) -> Result<NodeId, DomError> {
        let mut index = self.index_of(parent, child)?;
        if keep_grandchildren {
            let grandchildren = self.children(child).to_vec();
            for grandchild in grandchildren {
                self.detach(grandchild)?;
                self.insert_at(parent, grandchild, index)?;
                index += 1;
            }
        }
        self.detach(child)?;
        Ok(child)
    }

    /// Puts `new_child` where `old_child` was and returns `old_child`, now detached.
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `old_child` is not a child of `parent`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<NodeId, DomError> {
        let _ = self.index_of(parent, old_child)?;
        if new_child == old_child {
            return Ok(old_child);
        }
        self.check_insert(parent, new_child)?;
        self.detach(new_child)?;
        let index = self.index_of(parent, old_child)?;
        self.detach(old_child)?;
        self.insert_at(parent, new_child, index)?;
        Ok(old_child)
    }

    /// Detaches a node from its parent. Detached nodes and the Document node are
    /// left as they are.
    ///
    /// # Errors
    /// Fails if `id` is unknown or the id index walk exceeds the depth limit.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        let _ = self.node(id)?;
        self.detach(id)
    }

    /// Detaches every child of `id`.
    ///
    /// # Errors
    /// Fails if `id` is unknown or the id index walk exceeds the depth limit.
    pub fn remove_all_children(&mut self, id: NodeId) -> Result<(), DomError> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.detach(child)?;
        }
        Ok(())
    }

    // ===== node factories =====

    /// Creates a detached element.
    ///
    /// # Errors
    /// Returns [`DomError::InvalidName`] for an empty or blank name.
    pub fn create_element(&mut self, name: &str) -> Result<NodeId, DomError> {
        if name.trim().is_empty() {
            return Err(DomError::InvalidName(name.to_string()));
        }
        let id = self.alloc(NodeType::Element(ElementData::new(name)));
        self.nodes[id.0].closed = true;
        Ok(id)
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeType::Text(text.to_string()))
    }

    /// Creates a detached comment node holding `<!--text-->`.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeType::Comment(format!("<!--{text}-->")))
    }

    /// Copies a node into a new detached node.
    ///
    /// A shallow clone copies the node and its attributes; a deep clone copies the
    /// whole subtree. Clones have no source span and start out changed.
    ///
    /// # Errors
    /// Fails if `id` is unknown or the subtree is deeper than the depth limit.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId, DomError> {
        let limit = self.options.max_depth;
        let copy = self.copy_of(id)?;
        if !deep {
            return Ok(copy);
        }
        let mut pending = vec![(id, copy, 0usize)];
        while let Some((source, target, depth)) = pending.pop() {
            if depth > limit {
                return Err(self.depth_exceeded());
            }
            let children = self.nodes[source.0].children.clone();
            for child in children {
                let child_copy = self.copy_of(child)?;
                self.append_parsed(target, child_copy);
                pending.push((child, child_copy, depth + 1));
            }
        }
        Ok(copy)
    }

    /// Deep-clones `id` and renames the copy.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements,
    /// [`DomError::InvalidName`] for a blank name, or the errors of
    /// [`DomTree::clone_node`].
    pub fn clone_node_named(&mut self, id: NodeId, new_name: &str, deep: bool) -> Result<NodeId, DomError> {
        if !self.node(id)?.is_element() {
            return Err(DomError::NotAnElement(id));
        }
        if new_name.trim().is_empty() {
            return Err(DomError::InvalidName(new_name.to_string()));
        }
        let copy = self.clone_node(id, deep)?;
        if let NodeType::Element(data) = &mut self.node_mut(copy)?.node_type {
            data.name = new_name.to_ascii_lowercase();
            new_name.clone_into(&mut data.original_name);
        }
        Ok(copy)
    }

    /// Copies the subtree of `id` in `other` into this tree.
    ///
    /// The copy is detached, has no source spans, and starts out changed, so
    /// it renders from its structure wherever it is inserted.
    ///
    /// # Errors
    /// Fails if `id` is unknown in `other` or the subtree is deeper than this
    /// tree's depth limit.
    pub fn import_node(&mut self, other: &Self, id: NodeId) -> Result<NodeId, DomError> {
        let limit = self.options.max_depth;
        let copy = self.alloc_copy(other.node(id)?);
        let mut pending = vec![(id, copy, 0usize)];
        while let Some((source, target, depth)) = pending.pop() {
            if depth > limit {
                return Err(self.depth_exceeded());
            }
            for &child in other.children(source) {
                let child_copy = self.alloc_copy(other.node(child)?);
                self.append_parsed(target, child_copy);
                pending.push((child, child_copy, depth + 1));
            }
        }
        Ok(copy)
    }

    fn alloc_copy(&mut self, source: &Node) -> NodeId {
        let copy = self.alloc(source.node_type.clone());
        self.nodes[copy.0].closed = source.closed;
        copy
    }

    fn copy_of(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let source = self.node(id)?;
        let node_type = source.node_type.clone();
        let (line, column, closed) = (source.line, source.column, source.closed);
        let copy = self.alloc(node_type);
        let node = &mut self.nodes[copy.0];
        node.line = line;
        node.column = column;
        node.closed = closed;
        Ok(copy)
    }

    // ===== content mutation =====

    /// Replaces the content of a text or comment node.
    ///
    /// Comment content is the full markup, delimiters included.
    ///
    /// # Errors
    /// Returns [`DomError::NotText`] for elements and the Document node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.node_type {
            NodeType::Text(content) | NodeType::Comment(content) => text.clone_into(content),
            _ => return Err(DomError::NotText(id)),
        }
        self.mark_changed(id);
        Ok(())
    }

    /// Creates or updates an attribute.
    ///
    /// Setting `id` on an attached element also updates the id index.
    ///
    /// # Errors
    /// Fails for non-elements and empty names.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if name.is_empty() {
            return Err(DomError::InvalidName(String::new()));
        }
        let is_id = name.eq_ignore_ascii_case("id");
        if is_id {
            self.unindex_node(id);
        }
        match &mut self.node_mut(id)?.node_type {
            NodeType::Element(data) => data.attrs.set(name, value),
            _ => return Err(DomError::NotAnElement(id)),
        }
        if is_id && self.is_attached(id) {
            self.register_id(id);
        }
        self.mark_changed(id);
        Ok(())
    }

    /// Adds a prepared attribute, replacing the value of an existing one with the
    /// same name.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn insert_attribute(&mut self, id: NodeId, attribute: Attribute) -> Result<(), DomError> {
        let is_id = attribute.name() == "id";
        if is_id {
            self.unindex_node(id);
        }
        match &mut self.node_mut(id)?.node_type {
            NodeType::Element(data) => data.attrs.insert(attribute),
            _ => return Err(DomError::NotAnElement(id)),
        }
        if is_id && self.is_attached(id) {
            self.register_id(id);
        }
        self.mark_changed(id);
        Ok(())
    }

    /// Removes an attribute and returns it.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<Attribute>, DomError> {
        if name.eq_ignore_ascii_case("id") {
            self.unindex_node(id);
        }
        let removed = match &mut self.node_mut(id)?.node_type {
            NodeType::Element(data) => data.attrs.remove(name),
            _ => return Err(DomError::NotAnElement(id)),
        };
        if removed.is_some() {
            self.mark_changed(id);
        }
        Ok(removed)
    }

    // ===== id index =====

    fn id_index_mut(&mut self) -> Result<&mut HashMap<String, NodeId>, DomError> {
        self.id_index.as_mut().ok_or(DomError::IdIndexDisabled)
    }

    /// The `id` attribute of a node.
    ///
    /// # Errors
    /// Returns [`DomError::IdIndexDisabled`] unless `use_id_attribute` is on.
    pub fn id_of(&self, id: NodeId) -> Result<Option<&str>, DomError> {
        if self.id_index.is_none() {
            return Err(DomError::IdIndexDisabled);
        }
        Ok(self.attribute(id, "id"))
    }

    /// Writes the `id` attribute and, if the node is attached, points the index at it.
    ///
    /// # Errors
    /// Returns [`DomError::IdIndexDisabled`] unless `use_id_attribute` is on, or
    /// [`DomError::NotAnElement`] for non-elements.
    pub fn set_id(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let _ = self.id_index_mut()?;
        self.set_attribute(id, "id", value)
    }

    /// Finds the node whose id matches `value`, ignoring case.
    ///
    /// # Errors
    /// Returns [`DomError::IdIndexDisabled`] unless `use_id_attribute` is on.
    pub fn get_by_id(&self, value: &str) -> Result<Option<NodeId>, DomError> {
        let index = self.id_index.as_ref().ok_or(DomError::IdIndexDisabled)?;
        Ok(index.get(&value.to_lowercase()).copied())
    }

    /// Points the id index at `id` if it is an element with a non-empty id.
    ///
    /// A previous holder of the same id loses the entry.
    pub fn register_id(&mut self, id: NodeId) {
        let Some(value) = self.attribute(id, "id").filter(|v| !v.is_empty()) else {
            return;
        };
        let key = value.to_lowercase();
        if let Some(index) = self.id_index.as_mut() {
            let _ = index.insert(key, id);
        }
    }

    /// Drops the index entry for `id`'s current id, if the entry still points at it.
    fn unindex_node(&mut self, id: NodeId) {
        let Some(key) = self.attribute(id, "id").map(str::to_lowercase) else {
            return;
        };
        if let Some(index) = self.id_index.as_mut()
            && index.get(&key) == Some(&id)
        {
            let _ = index.remove(&key);
        }
    }

    /// Rebuilds the id index from the attached nodes, in document order.
    ///
    /// # Errors
    /// Returns [`DomError::DepthExceeded`] if the tree is deeper than allowed.
    pub fn rebuild_id_index(&mut self) -> Result<(), DomError> {
        self.id_index = self.options.use_id_attribute.then(HashMap::new);
        self.register_ids(NodeId::ROOT)
    }

    /// Registers every id in the subtree of `id`, if it hangs below the Document.
    pub(crate) fn register_ids(&mut self, id: NodeId) -> Result<(), DomError> {
        if self.id_index.is_none() || !self.is_attached(id) {
            return Ok(());
        }
        let nodes = self.descendants_and_self(id).collect::<Result<Vec<_>, _>>()?;
        for node in nodes {
            self.register_id(node);
        }
        Ok(())
    }

    fn unregister_ids(&mut self, id: NodeId) -> Result<(), DomError> {
        if self.id_index.is_none() {
            return Ok(());
        }
        let nodes = self.descendants_and_self(id).collect::<Result<Vec<_>, _>>()?;
        for node in nodes {
            self.unindex_node(node);
        }
        Ok(())
    }
}
