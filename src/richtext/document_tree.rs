// Document Tree
// A mutable tree of element and text nodes that the editor changes in place.
// Nodes live in an arena and are addressed by stable ids, so a removed node
// keeps its identity (and its children) while detached. A slot is only reused
// after its detached node has been released explicitly.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Zero-width space used to keep otherwise empty wrappers addressable
pub const PLACEHOLDER: char = '\u{200B}';

/// Stable identifier of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by structural tree operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),
    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),
    #[error("offset {offset} is out of bounds for node {node} (length {len})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("node {0} is not a text node")]
    NotText(NodeId),
    #[error("node {0} is not an element")]
    NotElement(NodeId),
    #[error("node {child} cannot be placed inside {parent}")]
    Hierarchy { parent: NodeId, child: NodeId },
    #[cfg(test)]
    #[error("injected fault")]
    Injected,
}

pub type TreeResult<T> = Result<T, TreeError>;

/// Element kinds understood by the editing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Body,
    Div,
    Paragraph,
    Heading(u8),
    BlockQuote,
    UnorderedList,
    OrderedList,
    ListItem,
    Strong,
    Emphasis,
    Underline,
    Strike,
    Span,
    Anchor,
    Image,
    LineBreak,
}

impl Tag {
    pub fn heading(level: u8) -> Self {
        Tag::Heading(level.clamp(1, 6))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tag::Body => "body",
            Tag::Div => "div",
            Tag::Paragraph => "p",
            Tag::Heading(1) => "h1",
            Tag::Heading(2) => "h2",
            Tag::Heading(3) => "h3",
            Tag::Heading(4) => "h4",
            Tag::Heading(5) => "h5",
            Tag::Heading(_) => "h6",
            Tag::BlockQuote => "blockquote",
            Tag::UnorderedList => "ul",
            Tag::OrderedList => "ol",
            Tag::ListItem => "li",
            Tag::Strong => "strong",
            Tag::Emphasis => "em",
            Tag::Underline => "u",
            Tag::Strike => "s",
            Tag::Span => "span",
            Tag::Anchor => "a",
            Tag::Image => "img",
            Tag::LineBreak => "br",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let tag = match name.to_ascii_lowercase().as_str() {
            "body" => Tag::Body,
            "div" => Tag::Div,
            "p" => Tag::Paragraph,
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "blockquote" => Tag::BlockQuote,
            "ul" => Tag::UnorderedList,
            "ol" => Tag::OrderedList,
            "li" => Tag::ListItem,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Emphasis,
            "u" => Tag::Underline,
            "s" => Tag::Strike,
            "span" => Tag::Span,
            "a" => Tag::Anchor,
            "img" => Tag::Image,
            "br" => Tag::LineBreak,
            _ => return None,
        };
        Some(tag)
    }

    /// Block-level elements start on a new line when laid out
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Tag::Body
                | Tag::Div
                | Tag::Paragraph
                | Tag::Heading(_)
                | Tag::BlockQuote
                | Tag::UnorderedList
                | Tag::OrderedList
                | Tag::ListItem
        )
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Tag::Image)
    }

    /// Void elements never hold children
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Image | Tag::LineBreak)
    }
}

/// Element payload: tag plus inline style properties and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub style: BTreeMap<String, String>,
    pub attrs: BTreeMap<String, String>,
}

impl Element {
    fn new(tag: Tag) -> Self {
        Element {
            tag,
            style: BTreeMap::new(),
            attrs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    released: bool,
}

/// The document tree
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<NodeData>,
    free: Vec<NodeId>,
    root: NodeId,
    #[cfg(test)]
    fault: Option<usize>,
}

impl DocumentTree {
    /// Create a tree holding only a `body` root
    pub fn new() -> Self {
        DocumentTree {
            nodes: vec![NodeData {
                kind: NodeKind::Element(Element::new(Tag::Body)),
                parent: None,
                children: Vec::new(),
                released: false,
            }],
            free: Vec::new(),
            root: NodeId(0),
            #[cfg(test)]
            fault: None,
        }
    }

    /// Build a tree with one editable `div` whose paragraphs come from
    /// blank-line separated blocks of `text`. Returns the tree and the div.
    pub fn from_plain_text(text: &str) -> (Self, NodeId) {
        let mut tree = Self::new();
        let editable = tree.create_element(Tag::Div);
        tree.nodes[editable.0].parent = Some(tree.root);
        let root = tree.root;
        tree.nodes[root.0].children.push(editable);

        let normalized = text.replace("\r\n", "\n");
        for block in normalized.split("\n\n") {
            let block = block.trim_matches('\n');
            if block.is_empty() {
                continue;
            }
            let paragraph = tree.create_element(Tag::Paragraph);
            for (i, line) in block.split('\n').enumerate() {
                if i > 0 {
                    let br = tree.create_element(Tag::LineBreak);
                    tree.attach_unchecked(paragraph, br);
                }
                if !line.is_empty() {
                    let run = tree.create_text(line);
                    tree.attach_unchecked(paragraph, run);
                }
            }
            tree.attach_unchecked(editable, paragraph);
        }
        (tree, editable)
    }

    // Only used while building fresh trees where the invariants hold trivially
    fn attach_unchecked(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: Tag) -> NodeId {
        self.alloc(NodeKind::Element(Element::new(tag)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Create a detached element with the same tag, style and attributes as `id`
    pub fn clone_shell(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let element = self.element(id).ok_or(TreeError::NotElement(id))?.clone();
        Ok(self.alloc(NodeKind::Element(element)))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            released: false,
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = data;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    /// Hand a detached node and everything below it back to the arena. The
    /// ids must not be used afterwards; later nodes may get them.
    pub fn release(&mut self, id: NodeId) -> TreeResult<()> {
        if id == self.root || self.data(id)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(id));
        }
        for node in self.descendants(id) {
            let data = &mut self.nodes[node.0];
            data.kind = NodeKind::Text(String::new());
            data.parent = None;
            data.children.clear();
            data.released = true;
            self.free.push(node);
        }
        Ok(())
    }

    /// Slots in the arena, released ones included
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn data(&self, id: NodeId) -> TreeResult<&NodeData> {
        self.nodes
            .get(id.0)
            .filter(|data| !data.released)
            .ok_or(TreeError::NodeNotFound(id))
    }

    fn data_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes
            .get_mut(id.0)
            .filter(|data| !data.released)
            .ok_or(TreeError::NodeNotFound(id))
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.data(id).is_ok()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).ok().map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&Tag> {
        self.element(id).map(|e| &e.tag)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)?.style.get(property).map(String::as_str)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Index of `id` among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Length used for positions: characters for text, children for elements
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            Some(NodeKind::Element(_)) => self.children(id).len(),
            None => 0,
        }
    }

    /// Whether `node` is `ancestor` or lies below it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.exists(id) && self.contains(self.root, id)
    }

    /// Ancestors from the node's parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Lowest node containing both `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|&candidate| self.contains(candidate, b))
    }

    /// The node and everything below it, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Concatenated text below the node; line breaks count as "\n"
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match self.kind(node) {
                Some(NodeKind::Text(text)) => out.push_str(text),
                Some(NodeKind::Element(e)) if e.tag == Tag::LineBreak => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    /// Child-index path from the root, `None` when detached
    pub fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        if !self.is_connected(id) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.index_in_parent(current)?);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Document order of two boundary points, `None` if either is detached
    pub fn compare_points(
        &self,
        a: (NodeId, usize),
        b: (NodeId, usize),
    ) -> Option<Ordering> {
        let mut key_a = self.path(a.0)?;
        key_a.push(a.1);
        let mut key_b = self.path(b.0)?;
        key_b.push(b.1);
        Some(key_a.cmp(&key_b))
    }

    /// Point at a character offset of the text below `container`
    pub fn point_at_char(&self, container: NodeId, offset: usize) -> Option<(NodeId, usize)> {
        let mut seen = 0usize;
        let mut last = None;
        for node in self.descendants(container) {
            match self.kind(node) {
                Some(NodeKind::Text(text)) => {
                    let len = text.chars().count();
                    if offset <= seen + len {
                        return Some((node, offset - seen));
                    }
                    seen += len;
                    last = Some((node, len));
                }
                Some(NodeKind::Element(e)) if e.tag == Tag::LineBreak => {
                    let parent = self.parent(node)?;
                    let index = self.index_in_parent(node)?;
                    if offset == seen {
                        return Some((parent, index));
                    }
                    seen += 1;
                    last = Some((parent, index + 1));
                }
                _ => {}
            }
        }
        if offset == seen {
            return last.or(Some((container, 0)));
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn fail_after(&mut self, mutations: usize) {
        self.fault = Some(mutations);
    }

    #[cfg(test)]
    fn checkpoint(&mut self) -> TreeResult<()> {
        match self.fault {
            Some(0) => {
                self.fault = None;
                Err(TreeError::Injected)
            }
            Some(n) => {
                self.fault = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    #[cfg(not(test))]
    #[inline]
    fn checkpoint(&mut self) -> TreeResult<()> {
        Ok(())
    }

    /// Insert a detached node as the `index`-th child of `parent`
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> TreeResult<()> {
        let element = self.element(parent).ok_or(TreeError::NotElement(parent))?;
        if element.tag.is_void() || self.contains(child, parent) {
            return Err(TreeError::Hierarchy { parent, child });
        }
        if self.data(child)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        let len = self.children(parent).len();
        if index > len {
            return Err(TreeError::OffsetOutOfBounds {
                node: parent,
                offset: index,
                len,
            });
        }
        self.checkpoint()?;
        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Detach a node from its parent, returning the index it occupied
    pub fn detach(&mut self, id: NodeId) -> TreeResult<usize> {
        let parent = self.data(id)?.parent.ok_or(TreeError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;
        self.checkpoint()?;
        self.data_mut(parent)?.children.remove(index);
        self.data_mut(id)?.parent = None;
        Ok(index)
    }

    /// Put detached `new` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> TreeResult<()> {
        let parent = self.parent(old).ok_or(TreeError::Detached(old))?;
        let index = self.detach(old)?;
        if let Err(err) = self.insert_child(parent, index, new) {
            // put the old node back so a failed replace leaves no gap
            let _ = self.insert_child(parent, index, old);
            return Err(err);
        }
        Ok(())
    }

    /// Replace the text of a text node, returning the previous text
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> TreeResult<String> {
        if !self.is_text(id) {
            return Err(TreeError::NotText(id));
        }
        self.checkpoint()?;
        match &mut self.data_mut(id)?.kind {
            NodeKind::Text(current) => Ok(std::mem::replace(current, text.into())),
            NodeKind::Element(_) => Err(TreeError::NotText(id)),
        }
    }

    /// Set or clear a style property, returning the previous value
    pub fn set_style(
        &mut self,
        id: NodeId,
        property: &str,
        value: Option<&str>,
    ) -> TreeResult<Option<String>> {
        if self.element(id).is_none() {
            return Err(TreeError::NotElement(id));
        }
        self.checkpoint()?;
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element(element) => Ok(match value {
                Some(value) => element.style.insert(property.to_string(), value.to_string()),
                None => element.style.remove(property),
            }),
            NodeKind::Text(_) => Err(TreeError::NotElement(id)),
        }
    }

    /// Set or clear an attribute, returning the previous value
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> TreeResult<Option<String>> {
        if self.element(id).is_none() {
            return Err(TreeError::NotElement(id));
        }
        self.checkpoint()?;
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element(element) => Ok(match value {
                Some(value) => element.attrs.insert(name.to_string(), value.to_string()),
                None => element.attrs.remove(name),
            }),
            NodeKind::Text(_) => Err(TreeError::NotElement(id)),
        }
    }

    /// Move the text after character `at` into the detached text node
    /// `sibling` and insert it right after `id`
    pub fn split_text_into(&mut self, id: NodeId, at: usize, sibling: NodeId) -> TreeResult<()> {
        let text = self.text(id).ok_or(TreeError::NotText(id))?.to_string();
        let len = text.chars().count();
        if at > len {
            return Err(TreeError::OffsetOutOfBounds {
                node: id,
                offset: at,
                len,
            });
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;
        let byte = char_to_byte(&text, at);

        self.set_text(sibling, &text[byte..])?;
        self.set_text(id, &text[..byte])?;
        if let Err(err) = self.insert_child(parent, index + 1, sibling) {
            let _ = self.set_text(id, text);
            return Err(err);
        }
        Ok(())
    }

    /// Undo `split_text_into`: append the sibling's text and detach it
    pub fn join_text(&mut self, id: NodeId, sibling: NodeId) -> TreeResult<()> {
        let tail = self.text(sibling).ok_or(TreeError::NotText(sibling))?.to_string();
        let head = self.text(id).ok_or(TreeError::NotText(id))?.to_string();
        let parent = self.parent(sibling).ok_or(TreeError::Detached(sibling))?;
        let index = self.detach(sibling)?;
        if let Err(err) = self.set_text(id, head + &tail) {
            let _ = self.insert_child(parent, index, sibling);
            return Err(err);
        }
        Ok(())
    }

    /// Move children from index `at` on into the detached element `sibling`
    /// and insert it right after `id`
    pub fn split_element_into(&mut self, id: NodeId, at: usize, sibling: NodeId) -> TreeResult<()> {
        let len = self.children(id).len();
        if at > len {
            return Err(TreeError::OffsetOutOfBounds {
                node: id,
                offset: at,
                len,
            });
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;
        self.insert_child(parent, index + 1, sibling)?;
        let moving: Vec<NodeId> = self.children(id)[at..].to_vec();
        if let Err(err) = self.move_children(&moving, sibling) {
            let moved: Vec<NodeId> = self.children(sibling).to_vec();
            self.restore_children(&moved, id, at);
            let _ = self.detach(sibling);
            return Err(err);
        }
        Ok(())
    }

    /// Undo `split_element_into`: move the sibling's children back and detach it
    pub fn join_element(&mut self, id: NodeId, sibling: NodeId) -> TreeResult<()> {
        let keep = self.children(id).len();
        let moving: Vec<NodeId> = self.children(sibling).to_vec();
        if let Err(err) = self.move_children(&moving, id) {
            let moved: Vec<NodeId> = self.children(id)[keep..].to_vec();
            self.restore_children(&moved, sibling, 0);
            return Err(err);
        }
        if let Err(err) = self.detach(sibling) {
            self.restore_children(&moving, sibling, 0);
            return Err(err);
        }
        Ok(())
    }

    // Appends `nodes` to `target` in order, stopping at the first failure
    fn move_children(&mut self, nodes: &[NodeId], target: NodeId) -> TreeResult<()> {
        for &child in nodes {
            if self.parent(child) == Some(target) {
                continue;
            }
            let parent = self.parent(child);
            let index = self.detach(child)?;
            if let Err(err) = self.append_child(target, child) {
                if let Some(parent) = parent {
                    let _ = self.insert_child(parent, index, child);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    // Puts `nodes` back into `target` from child index `start` on, in order
    fn restore_children(&mut self, nodes: &[NodeId], target: NodeId, start: usize) {
        for (i, &child) in nodes.iter().enumerate() {
            if self.detach(child).is_ok() {
                let _ = self.insert_child(target, start + i, child);
            }
        }
    }

    /// Markup rendering of a node and its subtree
    pub fn markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    /// Markup rendering of a node's children only
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_markup(child, &mut out);
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => escape_into(text, out),
            Some(NodeKind::Element(element)) => {
                out.push('<');
                out.push_str(element.tag.name());
                for (name, value) in &element.attrs {
                    out.push_str(&format!(" {}=\"", name));
                    escape_into(value, out);
                    out.push('"');
                }
                if !element.style.is_empty() {
                    let style = element
                        .style
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join("; ");
                    out.push_str(" style=\"");
                    escape_into(&style, out);
                    out.push('"');
                }
                out.push('>');
                if element.tag.is_void() {
                    return;
                }
                for &child in self.children(id) {
                    self.write_markup(child, out);
                }
                out.push_str("</");
                out.push_str(element.tag.name());
                out.push('>');
            }
            None => {}
        }
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner_markup(self.root))
    }
}

/// Byte index of the `offset`-th character (clamped to the end)
pub fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            PLACEHOLDER => out.push_str("&#8203;"),
            _ => out.push(ch),
        }
    }
}
