// Positions and ranges over the document tree

use std::cmp::Ordering;

use super::document_tree::{DocumentTree, NodeId, NodeKind, Tag, TreeError, TreeResult};

/// A boundary point: a node and an offset into it.
/// Text nodes count characters, elements count children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Position { node, offset }
    }

    /// Point right before `node` in its parent
    pub fn before(tree: &DocumentTree, node: NodeId) -> Option<Self> {
        Some(Position::new(tree.parent(node)?, tree.index_in_parent(node)?))
    }

    /// Point right after `node` in its parent
    pub fn after(tree: &DocumentTree, node: NodeId) -> Option<Self> {
        Some(Position::new(
            tree.parent(node)?,
            tree.index_in_parent(node)? + 1,
        ))
    }

    /// Check that the node is attached and the offset is in bounds
    pub fn validate(&self, tree: &DocumentTree) -> TreeResult<()> {
        if !tree.exists(self.node) {
            return Err(TreeError::NodeNotFound(self.node));
        }
        if !tree.is_connected(self.node) {
            return Err(TreeError::Detached(self.node));
        }
        let len = tree.node_len(self.node);
        if self.offset > len {
            return Err(TreeError::OffsetOutOfBounds {
                node: self.node,
                offset: self.offset,
                len,
            });
        }
        Ok(())
    }

    pub fn compare(&self, tree: &DocumentTree, other: &Position) -> Option<Ordering> {
        tree.compare_points((self.node, self.offset), (other.node, other.offset))
    }
}

/// An anchor/focus pair. The anchor is where the selection started, so the
/// focus may come first in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub anchor: Position,
    pub focus: Position,
}

impl Range {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Range { anchor, focus }
    }

    /// A collapsed range (caret)
    pub fn caret(at: Position) -> Self {
        Range::new(at, at)
    }

    /// Range spanning everything inside `node`
    pub fn select_contents(tree: &DocumentTree, node: NodeId) -> Self {
        Range::new(
            Position::new(node, 0),
            Position::new(node, tree.node_len(node)),
        )
    }

    /// Range spanning `node` itself
    pub fn select_node(tree: &DocumentTree, node: NodeId) -> Option<Self> {
        Some(Range::new(
            Position::before(tree, node)?,
            Position::after(tree, node)?,
        ))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn validate(&self, tree: &DocumentTree) -> TreeResult<()> {
        self.anchor.validate(tree)?;
        self.focus.validate(tree)
    }

    /// Start and end in document order
    pub fn ordered(&self, tree: &DocumentTree) -> TreeResult<(Position, Position)> {
        match self.anchor.compare(tree, &self.focus) {
            Some(Ordering::Greater) => Ok((self.focus, self.anchor)),
            Some(_) => Ok((self.anchor, self.focus)),
            None => {
                self.validate(tree)?;
                Err(TreeError::Detached(self.anchor.node))
            }
        }
    }

    pub fn start(&self, tree: &DocumentTree) -> TreeResult<Position> {
        Ok(self.ordered(tree)?.0)
    }

    pub fn end(&self, tree: &DocumentTree) -> TreeResult<Position> {
        Ok(self.ordered(tree)?.1)
    }

    /// Caret at the end of this range
    pub fn collapse_to_end(&self, tree: &DocumentTree) -> TreeResult<Self> {
        Ok(Range::caret(self.end(tree)?))
    }

    /// Lowest node containing both boundaries
    pub fn common_ancestor(&self, tree: &DocumentTree) -> Option<NodeId> {
        tree.common_ancestor(self.anchor.node, self.focus.node)
    }

    /// Text covered by the range. Line breaks and boundaries between block
    /// elements read as "\n"; detached or invalid ranges read as empty.
    pub fn text_content(&self, tree: &DocumentTree) -> String {
        let Ok((start, end)) = self.ordered(tree) else {
            return String::new();
        };
        if start == end {
            return String::new();
        }
        let Some(ancestor) = self.common_ancestor(tree) else {
            return String::new();
        };

        let mut out = String::new();
        for node in tree.descendants(ancestor) {
            match tree.kind(node) {
                Some(NodeKind::Text(text)) => {
                    let len = text.chars().count();
                    let lo = if node == start.node {
                        start.offset
                    } else if before_or_at(tree, &start, &Position::new(node, 0)) {
                        0
                    } else {
                        continue;
                    };
                    let hi = if node == end.node {
                        end.offset
                    } else if before_or_at(tree, &Position::new(node, len), &end) {
                        len
                    } else {
                        continue;
                    };
                    if lo < hi {
                        out.extend(text.chars().skip(lo).take(hi - lo));
                    }
                }
                Some(NodeKind::Element(element)) => {
                    let (Some(before), Some(after)) =
                        (Position::before(tree, node), Position::after(tree, node))
                    else {
                        continue;
                    };
                    if element.tag == Tag::LineBreak {
                        if before_or_at(tree, &start, &before) && before_or_at(tree, &after, &end) {
                            out.push('\n');
                        }
                    } else if element.tag.is_block()
                        && !out.is_empty()
                        && !out.ends_with('\n')
                        && before_or_at(tree, &start, &before)
                        && before_or_at(tree, &before, &end)
                    {
                        out.push('\n');
                    }
                }
                None => {}
            }
        }
        out
    }
}

fn before_or_at(tree: &DocumentTree, a: &Position, b: &Position) -> bool {
    matches!(a.compare(tree, b), Some(Ordering::Less | Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DocumentTree, NodeId) {
        DocumentTree::from_plain_text("Hello world\n\nSecond line")
    }

    fn first_text(tree: &DocumentTree, editable: NodeId, block: usize) -> NodeId {
        tree.child(tree.child(editable, block).unwrap(), 0).unwrap()
    }

    #[test]
    fn test_collapsed_and_ordering() {
        let (tree, editable) = sample();
        let text = first_text(&tree, editable, 0);
        let caret = Range::caret(Position::new(text, 3));
        assert!(caret.is_collapsed());
        assert_eq!(caret.text_content(&tree), "");

        let backward = Range::new(Position::new(text, 8), Position::new(text, 2));
        assert!(!backward.is_collapsed());
        let (start, end) = backward.ordered(&tree).unwrap();
        assert_eq!(start.offset, 2);
        assert_eq!(end.offset, 8);
        assert_eq!(backward.text_content(&tree), "llo wo");
    }

    #[test]
    fn test_text_content_across_blocks() {
        let (tree, editable) = sample();
        let first = first_text(&tree, editable, 0);
        let second = first_text(&tree, editable, 1);
        let range = Range::new(Position::new(first, 6), Position::new(second, 6));
        assert_eq!(range.text_content(&tree), "world\nSecond");
    }

    #[test]
    fn test_text_content_includes_line_breaks() {
        let (tree, editable) = DocumentTree::from_plain_text("a\nb");
        let p = tree.child(editable, 0).unwrap();
        let range = Range::select_contents(&tree, p);
        assert_eq!(range.text_content(&tree), "a\nb");
    }

    #[test]
    fn test_validate_detects_detached_and_out_of_bounds() {
        let (mut tree, editable) = sample();
        let text = first_text(&tree, editable, 0);
        assert!(Range::caret(Position::new(text, 11)).validate(&tree).is_ok());
        assert!(matches!(
            Range::caret(Position::new(text, 12)).validate(&tree),
            Err(TreeError::OffsetOutOfBounds { .. })
        ));

        let p = tree.child(editable, 0).unwrap();
        tree.detach(p).unwrap();
        assert_eq!(
            Range::caret(Position::new(text, 0)).validate(&tree),
            Err(TreeError::Detached(text))
        );
    }

    #[test]
    fn test_select_node() {
        let (tree, editable) = sample();
        let p = tree.child(editable, 1).unwrap();
        let range = Range::select_node(&tree, p).unwrap();
        assert_eq!(range.anchor, Position::new(editable, 1));
        assert_eq!(range.focus, Position::new(editable, 2));
        assert_eq!(range.text_content(&tree), "Second line");
    }
}
