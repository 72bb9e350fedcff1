// Editable surface
// The host side of the engine: owns the live tree, the live selection and
// the geometry used to anchor floating UI.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use super::document_tree::{DocumentTree, NodeId, NodeKind, Tag, TreeError};
use super::range::{Position, Range};

/// Errors reported by the host when reading or setting the live selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("live selection refers to a removed or changed node: {0}")]
    Stale(#[source] TreeError),
    #[error("host rejected the selection: {0}")]
    Rejected(#[source] TreeError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// The host surface the engine edits.
///
/// The live selection is volatile: focus changes elsewhere in the host may
/// clear it, and tree mutations may leave it pointing at removed nodes.
/// Only the selection model reads and writes it.
pub trait Surface {
    fn tree(&self) -> &DocumentTree;

    fn tree_mut(&mut self) -> &mut DocumentTree;

    /// The element whose subtree the user edits
    fn editable_root(&self) -> NodeId;

    /// The current live selection, if any
    fn live_selection(&self) -> Result<Option<Range>, SurfaceError>;

    /// Replace the live selection; `None` clears it
    fn set_live_selection(&mut self, range: Option<Range>) -> Result<(), SurfaceError>;

    /// One rectangle per rendered line fragment of the range, in order
    fn client_rects(&self, range: &Range) -> Vec<Rect>;

    /// Rendered bounds of a node, `None` when it has no box
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;
}

/// Grid metrics for the in-memory layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    pub char_width: f32,
    pub line_height: f32,
    pub media_width: f32,
    pub media_height: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        LayoutMetrics {
            char_width: 8.0,
            line_height: 16.0,
            media_width: 64.0,
            media_height: 48.0,
        }
    }
}

/// A surface that keeps the tree in memory and lays text out on a
/// monospace grid without wrapping
pub struct MemorySurface {
    tree: DocumentTree,
    editable: NodeId,
    selection: Option<Range>,
    metrics: LayoutMetrics,
}

impl MemorySurface {
    pub fn new(tree: DocumentTree, editable: NodeId) -> Self {
        MemorySurface {
            tree,
            editable,
            selection: None,
            metrics: LayoutMetrics::default(),
        }
    }

    /// Surface over paragraphs built from plain text
    pub fn from_plain_text(text: &str) -> Self {
        let (tree, editable) = DocumentTree::from_plain_text(text);
        Self::new(tree, editable)
    }

    pub fn with_metrics(mut self, metrics: LayoutMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    /// Range between two character offsets of the editable text
    pub fn range_at_chars(&self, anchor: usize, focus: usize) -> Option<Range> {
        let (a_node, a_off) = self.tree.point_at_char(self.editable, anchor)?;
        let (f_node, f_off) = self.tree.point_at_char(self.editable, focus)?;
        Some(Range::new(
            Position::new(a_node, a_off),
            Position::new(f_node, f_off),
        ))
    }

    /// Select between two character offsets, as a user drag would
    pub fn select_chars(&mut self, anchor: usize, focus: usize) -> Option<Range> {
        let range = self.range_at_chars(anchor, focus)?;
        self.selection = Some(range);
        Some(range)
    }

    /// Markup of the editable content
    pub fn markup(&self) -> String {
        self.tree.inner_markup(self.editable)
    }

    /// Plain text of the editable content
    pub fn text(&self) -> String {
        self.tree.text_content(self.editable)
    }

    fn layout(&self) -> Layout {
        let mut layout = Layout::new(self.metrics);
        layout.visit(&self.tree, self.tree.root());
        layout
    }
}

impl Surface for MemorySurface {
    fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    fn editable_root(&self) -> NodeId {
        self.editable
    }

    fn live_selection(&self) -> Result<Option<Range>, SurfaceError> {
        match self.selection {
            Some(range) => {
                range.validate(&self.tree).map_err(SurfaceError::Stale)?;
                Ok(Some(range))
            }
            None => Ok(None),
        }
    }

    fn set_live_selection(&mut self, range: Option<Range>) -> Result<(), SurfaceError> {
        if let Some(range) = &range {
            range.validate(&self.tree).map_err(SurfaceError::Rejected)?;
        }
        self.selection = range;
        Ok(())
    }

    fn client_rects(&self, range: &Range) -> Vec<Rect> {
        let Ok((start, end)) = range.ordered(&self.tree) else {
            return Vec::new();
        };
        if start == end {
            return Vec::new();
        }
        let layout = self.layout();
        let mut lines: Vec<Rect> = Vec::new();
        for item in &layout.items {
            let (before, after) = match item.owner {
                Owner::Char { node, offset } => {
                    (Position::new(node, offset), Position::new(node, offset + 1))
                }
                Owner::Media(node) => {
                    let (Some(before), Some(after)) = (
                        Position::before(&self.tree, node),
                        Position::after(&self.tree, node),
                    ) else {
                        continue;
                    };
                    (before, after)
                }
            };
            let inside = matches!(
                start.compare(&self.tree, &before),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ) && matches!(
                after.compare(&self.tree, &end),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            );
            if !inside {
                continue;
            }
            match lines.last_mut() {
                Some(last) if last.y == item.rect.y => *last = last.union(&item.rect),
                _ => lines.push(item.rect),
            }
        }
        lines
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.tree.is_connected(node) {
            return None;
        }
        let layout = self.layout();
        layout
            .items
            .iter()
            .filter(|item| {
                let owner = match item.owner {
                    Owner::Char { node, .. } | Owner::Media(node) => node,
                };
                self.tree.contains(node, owner)
            })
            .map(|item| item.rect)
            .reduce(|a, b| a.union(&b))
    }
}

#[derive(Debug, Clone, Copy)]
enum Owner {
    Char { node: NodeId, offset: usize },
    Media(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct Item {
    owner: Owner,
    rect: Rect,
}

struct Layout {
    metrics: LayoutMetrics,
    x: f32,
    y: f32,
    items: Vec<Item>,
    // characters per node already placed, for multi-char graphemes
    offsets: HashMap<NodeId, usize>,
}

impl Layout {
    fn new(metrics: LayoutMetrics) -> Self {
        Layout {
            metrics,
            x: 0.0,
            y: 0.0,
            items: Vec::new(),
            offsets: HashMap::new(),
        }
    }

    fn newline(&mut self) {
        self.x = 0.0;
        self.y += self.metrics.line_height;
    }

    fn break_block(&mut self) {
        if self.x > 0.0 {
            self.newline();
        }
    }

    fn visit(&mut self, tree: &DocumentTree, node: NodeId) {
        match tree.kind(node) {
            Some(NodeKind::Text(text)) => self.place_text(node, text),
            Some(NodeKind::Element(element)) => match element.tag {
                Tag::LineBreak => self.newline(),
                Tag::Image => {
                    let rect = Rect {
                        x: self.x,
                        y: self.y,
                        width: self.metrics.media_width,
                        height: self.metrics.media_height,
                    };
                    self.items.push(Item {
                        owner: Owner::Media(node),
                        rect,
                    });
                    self.x += self.metrics.media_width;
                }
                ref tag if tag.is_block() => {
                    self.break_block();
                    for &child in tree.children(node) {
                        self.visit(tree, child);
                    }
                    self.break_block();
                }
                _ => {
                    for &child in tree.children(node) {
                        self.visit(tree, child);
                    }
                }
            },
            None => {}
        }
    }

    fn place_text(&mut self, node: NodeId, text: &str) {
        for grapheme in text.graphemes(true) {
            let offset = *self.offsets.get(&node).unwrap_or(&0);
            let chars = grapheme.chars().count();
            self.offsets.insert(node, offset + chars);
            if grapheme == "\n" || grapheme == "\r\n" {
                self.newline();
                continue;
            }
            let width = if is_zero_width(grapheme) {
                0.0
            } else {
                self.metrics.char_width
            };
            for i in 0..chars {
                // later chars of a cluster share its box with no width
                let rect = Rect {
                    x: if i == 0 { self.x } else { self.x + width },
                    y: self.y,
                    width: if i == 0 { width } else { 0.0 },
                    height: self.metrics.line_height,
                };
                self.items.push(Item {
                    owner: Owner::Char {
                        node,
                        offset: offset + i,
                    },
                    rect,
                });
            }
            self.x += width;
        }
    }
}

fn is_zero_width(grapheme: &str) -> bool {
    grapheme
        .chars()
        .all(|c| matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
}
