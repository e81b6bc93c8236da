// src/annotation/tree.rs
//
// Arena-backed tree of text and element nodes with DOM-compatible range
// extraction. Serves as the annotation surface outside a browser.

use super::{
    embed_text, AnnotationError, AnnotationSurface, MarkSpec, SelectionSnapshot, EMBED_CLASS,
    FLATTENED_ATTR, MARK_CLASS,
};
use std::collections::BTreeMap;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Text(String),
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A boundary point. Offsets count chars inside text nodes and children
/// inside elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRange {
    pub start: Position,
    pub end: Position,
}

impl TreeRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Detached top-level nodes removed from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<Node>,
    root: NodeId,
    panel: NodeId,
    selection: Option<TreeRange>,
}

impl ContentTree {
    /// An empty tree whose root element doubles as the results panel until
    /// `set_panel` says otherwise.
    pub fn new() -> Self {
        let root = Node {
            kind: NodeKind::Element {
                tag: "body".to_string(),
                attrs: BTreeMap::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: 0,
            panel: 0,
            selection: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_panel(&mut self, panel: NodeId) {
        self.panel = panel;
    }

    pub fn select(&mut self, range: TreeRange) {
        self.selection = Some(range);
    }

    pub fn selection(&self) -> Option<TreeRange> {
        self.selection
    }

    // ---- building ----

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Create an element and append it to `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Create a text node and append it to `parent`.
    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let at = self.nodes[parent].children.len();
        self.insert_child(parent, at, child);
    }

    pub fn set_attr(&mut self, node: NodeId, key: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[node].kind {
            attrs.insert(key.to_string(), value.to_string());
        }
    }

    /// Unhook a node from its parent. The node stays in the arena.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|c| *c != node);
        }
    }

    // ---- reading ----

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Element { attrs, .. } => attrs.get(key).map(|v| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// Text covered by a range, without touching the tree.
    pub fn range_text(&self, range: &TreeRange) -> Result<String, AnnotationError> {
        self.validate(range)?;
        let mut out = String::new();
        let start = self.point_key(range.start);
        let end = self.point_key(range.end);
        self.collect_range_text(self.root, &start, &end, &mut out);
        Ok(out)
    }

    /// Annotation marks under `scope`, in document order.
    pub fn marks_in(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(scope, &mut |id, tree| {
            if tree.is_element(id) && tree.has_class(id, MARK_CLASS) {
                out.push(id);
            }
        });
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[node].children {
            self.write_html(*child, &mut out);
        }
        out
    }

    /// Render every unflattened mark's comment as a visible note right after
    /// it. Returns how many marks were flattened.
    pub fn flatten_marks(&mut self) -> usize {
        let mut count = 0;
        for mark in self.marks_in(self.panel) {
            if self.attr(mark, FLATTENED_ATTR).is_some() {
                continue;
            }
            let comment = match self.attr(mark, "title") {
                Some(c) if !c.is_empty() => c.to_string(),
                _ => continue,
            };
            let (parent, idx) = match self.parent_and_index(mark) {
                Some(p) => p,
                None => continue,
            };
            let inline = self.create_element("mark");
            self.set_attr(inline, "class", EMBED_CLASS);
            let note = self.create_text(&embed_text(&comment));
            self.append_child(inline, note);
            self.insert_child(parent, idx + 1, inline);
            self.set_attr(mark, FLATTENED_ATTR, "true");
            count += 1;
        }
        count
    }

    // ---- internals ----

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn insert_child(&mut self, parent: NodeId, at: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(at, child);
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node].kind, NodeKind::Element { .. })
    }

    fn node_len(&self, node: NodeId) -> usize {
        match &self.nodes[node].kind {
            NodeKind::Text(t) => t.chars().count(),
            NodeKind::Element { .. } => self.nodes[node].children.len(),
        }
    }

    fn parent_and_index(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes[node].parent?;
        let idx = self.nodes[parent].children.iter().position(|c| *c == node)?;
        Some((parent, idx))
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut cur = node;
        while let Some(parent) = self.nodes[cur].parent {
            cur = parent;
        }
        cur == self.root
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.nodes[id].parent;
        }
        false
    }

    /// The ancestor of `node` whose parent is `ancestor`.
    fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut cur = node;
        loop {
            let parent = self.nodes[cur].parent?;
            if parent == ancestor {
                return Some(cur);
            }
            cur = parent;
        }
    }

    fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut cur = Some(a);
        while let Some(id) = cur {
            if self.is_inclusive_ancestor(id, b) {
                return Some(id);
            }
            cur = self.nodes[id].parent;
        }
        None
    }

    fn path(&self, node: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = node;
        while let Some((parent, idx)) = self.parent_and_index(cur) {
            path.push(idx);
            cur = parent;
        }
        path.reverse();
        path
    }

    /// Sort key of a boundary point in document order.
    fn point_key(&self, pos: Position) -> Vec<usize> {
        let mut key = self.path(pos.node);
        key.push(pos.offset);
        key
    }

    fn validate(&self, range: &TreeRange) -> Result<(), AnnotationError> {
        for pos in [range.start, range.end] {
            if pos.node >= self.nodes.len() {
                return Err(AnnotationError::InvalidRange(format!(
                    "unknown node {}",
                    pos.node
                )));
            }
            if !self.is_attached(pos.node) {
                return Err(AnnotationError::InvalidRange(format!(
                    "node {} is detached",
                    pos.node
                )));
            }
            if pos.offset > self.node_len(pos.node) {
                return Err(AnnotationError::InvalidRange(format!(
                    "offset {} out of bounds for node {}",
                    pos.offset, pos.node
                )));
            }
        }
        if self.point_key(range.start) > self.point_key(range.end) {
            return Err(AnnotationError::InvalidRange(
                "start is after end".to_string(),
            ));
        }
        Ok(())
    }

    /// Split a text node at a char offset; the tail becomes the next sibling.
    fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId, AnnotationError> {
        let (parent, idx) = self.parent_and_index(node).ok_or_else(|| {
            AnnotationError::Mutation(format!("text node {} has no parent", node))
        })?;
        let tail = match &mut self.nodes[node].kind {
            NodeKind::Text(text) => {
                let byte = text
                    .char_indices()
                    .nth(offset)
                    .map(|(b, _)| b)
                    .unwrap_or(text.len());
                text.split_off(byte)
            }
            NodeKind::Element { .. } => {
                return Err(AnnotationError::Mutation(format!(
                    "node {} is not text",
                    node
                )))
            }
        };
        let tail_id = self.create_text(&tail);
        self.insert_child(parent, idx + 1, tail_id);
        Ok(tail_id)
    }

    /// Turn a boundary point into an (element, child index) pair, splitting
    /// a text node when the point falls inside it.
    fn to_element_boundary(&mut self, pos: Position) -> Result<(NodeId, usize), AnnotationError> {
        if self.is_element(pos.node) {
            return Ok((pos.node, pos.offset));
        }
        let (parent, idx) = self.parent_and_index(pos.node).ok_or_else(|| {
            AnnotationError::InvalidRange(format!("text node {} has no parent", pos.node))
        })?;
        let len = self.node_len(pos.node);
        if pos.offset == 0 {
            Ok((parent, idx))
        } else if pos.offset >= len {
            Ok((parent, idx + 1))
        } else {
            self.split_text(pos.node, pos.offset)?;
            Ok((parent, idx + 1))
        }
    }

    fn take_children(&mut self, parent: NodeId, from: usize, to: usize) -> Vec<NodeId> {
        let taken: Vec<NodeId> = self.nodes[parent].children.drain(from..to).collect();
        for id in &taken {
            self.nodes[*id].parent = None;
        }
        taken
    }

    fn shallow_clone(&mut self, node: NodeId) -> NodeId {
        let kind = self.nodes[node].kind.clone();
        self.push(kind)
    }

    /// Clone `node` holding everything after the boundary (sp, si) beneath it.
    fn split_off_start(&mut self, node: NodeId, sp: NodeId, si: usize) -> Result<NodeId, AnnotationError> {
        let clone = self.shallow_clone(node);
        if node == sp {
            let len = self.nodes[node].children.len();
            for id in self.take_children(node, si, len) {
                self.append_child(clone, id);
            }
            return Ok(clone);
        }
        let child = self
            .child_toward(node, sp)
            .ok_or_else(|| AnnotationError::Mutation("broken ancestor chain".to_string()))?;
        let (_, idx) = self
            .parent_and_index(child)
            .ok_or_else(|| AnnotationError::Mutation("broken ancestor chain".to_string()))?;
        let inner = self.split_off_start(child, sp, si)?;
        self.append_child(clone, inner);
        let len = self.nodes[node].children.len();
        for id in self.take_children(node, idx + 1, len) {
            self.append_child(clone, id);
        }
        Ok(clone)
    }

    /// Clone `node` holding everything before the boundary (ep, ei) beneath it.
    fn split_off_end(&mut self, node: NodeId, ep: NodeId, ei: usize) -> Result<NodeId, AnnotationError> {
        let clone = self.shallow_clone(node);
        if node == ep {
            for id in self.take_children(node, 0, ei) {
                self.append_child(clone, id);
            }
            return Ok(clone);
        }
        let child = self
            .child_toward(node, ep)
            .ok_or_else(|| AnnotationError::Mutation("broken ancestor chain".to_string()))?;
        let (_, idx) = self
            .parent_and_index(child)
            .ok_or_else(|| AnnotationError::Mutation("broken ancestor chain".to_string()))?;
        for id in self.take_children(node, 0, idx) {
            self.append_child(clone, id);
        }
        let inner = self.split_off_end(child, ep, ei)?;
        self.append_child(clone, inner);
        Ok(clone)
    }

    fn extract(&mut self, range: &TreeRange) -> Result<(Fragment, Position), AnnotationError> {
        self.validate(range)?;

        // End first: splitting the end never moves the start.
        let (ep, mut ei) = self.to_element_boundary(range.end)?;
        let start_needs_split = !self.is_element(range.start.node)
            && range.start.offset > 0
            && range.start.offset < self.node_len(range.start.node);
        let (sp, si) = self.to_element_boundary(range.start)?;
        if start_needs_split && sp == ep && ei >= si {
            ei += 1;
        }

        let broken = || AnnotationError::Mutation("broken ancestor chain".to_string());

        if sp == ep {
            let nodes = self.take_children(sp, si, ei);
            return Ok((Fragment { nodes }, Position::new(sp, si)));
        }

        if self.is_inclusive_ancestor(sp, ep) {
            let e_child = self.child_toward(sp, ep).ok_or_else(broken)?;
            let (_, ec_idx) = self.parent_and_index(e_child).ok_or_else(broken)?;
            let mut nodes = self.take_children(sp, si, ec_idx);
            nodes.push(self.split_off_end(e_child, ep, ei)?);
            return Ok((Fragment { nodes }, Position::new(sp, si)));
        }

        if self.is_inclusive_ancestor(ep, sp) {
            let s_child = self.child_toward(ep, sp).ok_or_else(broken)?;
            let (_, sc_idx) = self.parent_and_index(s_child).ok_or_else(broken)?;
            let mut nodes = vec![self.split_off_start(s_child, sp, si)?];
            nodes.extend(self.take_children(ep, sc_idx + 1, ei));
            return Ok((Fragment { nodes }, Position::new(ep, sc_idx + 1)));
        }

        let common = self.common_ancestor(sp, ep).ok_or_else(broken)?;
        let s_child = self.child_toward(common, sp).ok_or_else(broken)?;
        let e_child = self.child_toward(common, ep).ok_or_else(broken)?;
        let (_, sc_idx) = self.parent_and_index(s_child).ok_or_else(broken)?;
        let (_, ec_idx) = self.parent_and_index(e_child).ok_or_else(broken)?;

        let mut nodes = vec![self.split_off_start(s_child, sp, si)?];
        nodes.extend(self.take_children(common, sc_idx + 1, ec_idx));
        nodes.push(self.split_off_end(e_child, ep, ei)?);
        Ok((Fragment { nodes }, Position::new(common, sc_idx + 1)))
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node].kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for child in &self.nodes[node].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    fn collect_range_text(&self, node: NodeId, start: &[usize], end: &[usize], out: &mut String) {
        match &self.nodes[node].kind {
            NodeKind::Text(t) => {
                let path = self.path(node);
                for (i, ch) in t.chars().enumerate() {
                    let mut before = path.clone();
                    before.push(i);
                    let mut after = path.clone();
                    after.push(i + 1);
                    if before.as_slice() >= start && after.as_slice() <= end {
                        out.push(ch);
                    }
                }
            }
            NodeKind::Element { .. } => {
                for child in &self.nodes[node].children {
                    self.collect_range_text(*child, start, end, out);
                }
            }
        }
    }

    fn walk(&self, node: NodeId, visit: &mut dyn FnMut(NodeId, &ContentTree)) {
        visit(node, self);
        for child in &self.nodes[node].children {
            self.walk(*child, visit);
        }
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node].kind {
            NodeKind::Text(t) => out.push_str(&escape(t)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", k, escape(v).replace('"', "&quot;")));
                }
                out.push('>');
                for child in &self.nodes[node].children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl AnnotationSurface for ContentTree {
    type Range = TreeRange;
    type Position = Position;
    type Fragment = Fragment;
    type Node = NodeId;

    fn current_selection(&self) -> Option<SelectionSnapshot<TreeRange>> {
        let range = self.selection?;
        let inside_panel = range.start.node < self.nodes.len()
            && range.end.node < self.nodes.len()
            && self.is_inclusive_ancestor(self.panel, range.start.node)
            && self.is_inclusive_ancestor(self.panel, range.end.node);
        Some(SelectionSnapshot {
            range,
            collapsed: range.is_collapsed(),
            inside_panel,
        })
    }

    fn remove_and_capture(
        &mut self,
        range: &TreeRange,
    ) -> Result<(Fragment, Position), AnnotationError> {
        self.extract(range)
    }

    fn insert_fragment_wrapped(
        &mut self,
        at: Position,
        fragment: Fragment,
        mark: &MarkSpec,
    ) -> Result<NodeId, AnnotationError> {
        if at.node >= self.nodes.len() || !self.is_attached(at.node) {
            return Err(AnnotationError::InvalidRange(format!(
                "insertion point {} is not in the tree",
                at.node
            )));
        }
        let (parent, idx) = self.to_element_boundary(at)?;
        if idx > self.nodes[parent].children.len() {
            return Err(AnnotationError::InvalidRange(format!(
                "offset {} out of bounds for node {}",
                idx, parent
            )));
        }
        let wrapper = self.create_element(&mark.tag);
        self.set_attr(wrapper, "class", &mark.class);
        self.set_attr(wrapper, "title", &mark.comment);
        for id in fragment.nodes {
            self.append_child(wrapper, id);
        }
        self.insert_child(parent, idx, wrapper);
        Ok(wrapper)
    }

    fn overlaps_mark(&self, range: &TreeRange) -> bool {
        if self.validate(range).is_err() {
            return false;
        }
        let start = self.point_key(range.start);
        let end = self.point_key(range.end);
        self.marks_in(self.root).into_iter().any(|mark| {
            if !self.is_attached(mark) {
                return false;
            }
            let Some((parent, idx)) = self.parent_and_index(mark) else {
                return false;
            };
            let before = self.point_key(Position::new(parent, idx));
            let after = self.point_key(Position::new(parent, idx + 1));
            start < after && before < end
        })
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn flatten_marks(&mut self) -> Result<usize, AnnotationError> {
        Ok(ContentTree::flatten_marks(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// body > [p "Before the panel.", div#annotated > p(text)]
    fn panel_with(text: &str) -> (ContentTree, NodeId, NodeId) {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let outside = tree.element(root, "p");
        tree.text(outside, "Before the panel.");
        let panel = tree.element(root, "div");
        tree.set_attr(panel, "id", "annotated");
        tree.set_panel(panel);
        let p = tree.element(panel, "p");
        let t = tree.text(p, text);
        (tree, panel, t)
    }

    fn wrap(tree: &mut ContentTree, range: TreeRange, comment: &str) -> NodeId {
        let (fragment, at) = tree.remove_and_capture(&range).unwrap();
        tree.insert_fragment_wrapped(at, fragment, &MarkSpec::for_comment(comment))
            .unwrap()
    }

    #[test]
    fn test_wrap_inside_single_text_node() {
        let (mut tree, panel, t) = panel_with("The essay says the dog run fast today.");
        let range = TreeRange::new(Position::new(t, 15), Position::new(t, 31));
        assert_eq!(tree.range_text(&range).unwrap(), "the dog run fast");

        let mark = wrap(&mut tree, range, "awkward phrasing");

        assert_eq!(tree.text_content(mark), "the dog run fast");
        assert_eq!(tree.attr(mark, "title"), Some("awkward phrasing"));
        assert_eq!(
            tree.inner_html(panel),
            "<p>The essay says <span class=\"teacher-manual-annotation\" \
             title=\"awkward phrasing\">the dog run fast</span> today.</p>"
        );
        assert_eq!(tree.text_content(panel), "The essay says the dog run fast today.");
    }

    #[test]
    fn test_wrap_whole_text_node_does_not_leave_empty_text() {
        let (mut tree, panel, t) = panel_with("whole");
        let range = TreeRange::new(Position::new(t, 0), Position::new(t, 5));
        wrap(&mut tree, range, "c");
        let p = tree.children(panel)[0];
        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(
            tree.inner_html(p),
            "<span class=\"teacher-manual-annotation\" title=\"c\">whole</span>"
        );
    }

    #[test]
    fn test_wrap_multibyte_text() {
        let (mut tree, panel, t) = panel_with("naïve café prose");
        let range = TreeRange::new(Position::new(t, 6), Position::new(t, 10));
        let mark = wrap(&mut tree, range, "accent");
        assert_eq!(tree.text_content(mark), "café");
        assert_eq!(tree.text_content(panel), "naïve café prose");
    }

    #[test]
    fn test_wrap_into_nested_element() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let panel = tree.element(root, "div");
        tree.set_panel(panel);
        let p = tree.element(panel, "p");
        let t1 = tree.text(p, "Hello ");
        let b = tree.element(p, "b");
        let t2 = tree.text(b, "bold");
        tree.text(p, " world");

        let range = TreeRange::new(Position::new(t1, 3), Position::new(t2, 2));
        let mark = wrap(&mut tree, range, "note");

        assert_eq!(tree.text_content(mark), "lo bo");
        assert_eq!(
            tree.inner_html(p),
            "Hel<span class=\"teacher-manual-annotation\" title=\"note\">lo <b>bo</b></span>\
             <b>ld</b> world"
        );
        assert_eq!(tree.text_content(panel), "Hello bold world");
    }

    #[test]
    fn test_wrap_out_of_nested_element() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let panel = tree.element(root, "div");
        tree.set_panel(panel);
        let p = tree.element(panel, "p");
        tree.text(p, "A ");
        let b = tree.element(p, "b");
        let t2 = tree.text(b, "bold");
        let t3 = tree.text(p, " tail");

        let range = TreeRange::new(Position::new(t2, 2), Position::new(t3, 2));
        let mark = wrap(&mut tree, range, "x");

        assert_eq!(tree.text_content(mark), "ld t");
        assert_eq!(
            tree.inner_html(p),
            "A <b>bo</b><span class=\"teacher-manual-annotation\" title=\"x\"><b>ld</b> t</span>ail"
        );
    }

    #[test]
    fn test_wrap_across_paragraphs() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let panel = tree.element(root, "div");
        tree.set_panel(panel);
        let p1 = tree.element(panel, "p");
        let t1 = tree.text(p1, "first para");
        let p2 = tree.element(panel, "p");
        let t2 = tree.text(p2, "second para");
        let before = tree.text_content(panel);

        let range = TreeRange::new(Position::new(t1, 6), Position::new(t2, 6));
        let mark = wrap(&mut tree, range, "run-on");

        assert_eq!(tree.text_content(mark), "parasecond");
        assert_eq!(tree.text_content(panel), before);
        assert_eq!(tree.children(panel).len(), 3);
        assert_eq!(tree.children(panel)[1], mark);
        assert_eq!(tree.inner_html(mark), "<p>para</p><p>second</p>");
    }

    #[test]
    fn test_wrap_element_boundaries() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let panel = tree.element(root, "div");
        tree.set_panel(panel);
        for word in ["one", "two", "three"] {
            let em = tree.element(panel, "em");
            tree.text(em, word);
        }
        let range = TreeRange::new(Position::new(panel, 1), Position::new(panel, 3));
        let mark = wrap(&mut tree, range, "list");
        assert_eq!(tree.text_content(mark), "twothree");
        assert_eq!(tree.children(panel).len(), 2);
    }

    #[test]
    fn test_rejects_invalid_ranges() {
        let (mut tree, _panel, t) = panel_with("short");

        let past_end = TreeRange::new(Position::new(t, 2), Position::new(t, 40));
        assert!(matches!(
            tree.remove_and_capture(&past_end),
            Err(AnnotationError::InvalidRange(_))
        ));

        let reversed = TreeRange::new(Position::new(t, 4), Position::new(t, 1));
        assert!(matches!(
            tree.remove_and_capture(&reversed),
            Err(AnnotationError::InvalidRange(_))
        ));

        tree.detach(t);
        let detached = TreeRange::new(Position::new(t, 0), Position::new(t, 3));
        assert!(matches!(
            tree.remove_and_capture(&detached),
            Err(AnnotationError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_overlap_detection() {
        let (mut tree, _panel, t) = panel_with("alpha beta gamma delta");
        let first = TreeRange::new(Position::new(t, 6), Position::new(t, 10));
        let mark = wrap(&mut tree, first, "beta");
        let p = tree.parent(mark).unwrap();
        let kids = tree.children(p).to_vec();
        let (head, inner, tail) = (kids[0], tree.children(mark)[0], kids[2]);

        // Crosses into the mark from the left.
        let crossing = TreeRange::new(Position::new(head, 2), Position::new(inner, 2));
        assert!(tree.overlaps_mark(&crossing));
        // Entirely inside the mark.
        let within = TreeRange::new(Position::new(inner, 1), Position::new(inner, 3));
        assert!(tree.overlaps_mark(&within));
        // Touches the mark's edge without covering it.
        let adjacent = TreeRange::new(Position::new(head, 0), Position::new(head, 6));
        assert!(!tree.overlaps_mark(&adjacent));
        let disjoint = TreeRange::new(Position::new(tail, 1), Position::new(tail, 6));
        assert!(!tree.overlaps_mark(&disjoint));
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let (mut tree, panel, t) = panel_with("the dog run fast");
        let range = TreeRange::new(Position::new(t, 0), Position::new(t, 16));
        let mark = wrap(&mut tree, range, "awkward phrasing");

        assert_eq!(tree.flatten_marks(), 1);
        assert_eq!(tree.attr(mark, FLATTENED_ATTR), Some("true"));
        let once = tree.inner_html(panel);
        assert!(once.contains(
            "<mark class=\"manual-comment-embed\"> [Manual Annotation: awkward phrasing]</mark>"
        ));

        assert_eq!(tree.flatten_marks(), 0);
        assert_eq!(tree.inner_html(panel), once);
    }

    #[test]
    fn test_flatten_skips_marks_without_comment() {
        let (mut tree, panel, _t) = panel_with("text");
        let stray = tree.element(panel, "span");
        tree.set_attr(stray, "class", MARK_CLASS);
        assert_eq!(tree.flatten_marks(), 0);
        assert_eq!(tree.attr(stray, FLATTENED_ATTR), None);
    }

    #[test]
    fn test_selection_outside_panel_is_reported() {
        let (mut tree, _panel, _t) = panel_with("inside");
        let outside_text = tree.children(tree.children(tree.root())[0])[0];
        tree.select(TreeRange::new(
            Position::new(outside_text, 0),
            Position::new(outside_text, 6),
        ));
        let snap = tree.current_selection().unwrap();
        assert!(!snap.inside_panel);
        assert!(!snap.collapsed);
    }
}
