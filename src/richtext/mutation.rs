// Document mutation engine
// Structural edits over an explicit range: wrap in a styled element, turn
// lines into a list, align a block, insert an image or a link. Each edit
// either commits completely or is rolled back.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::document_tree::{DocumentTree, NodeId, PLACEHOLDER, Tag, TreeError, TreeResult};
use super::range::{Position, Range};
use super::splice::Splice;

/// Result of an editing operation
pub type EditResult<T = ()> = Result<T, EditError>;

/// Errors that can occur during editing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Nothing meaningful is selected; callers treat this as a no-op
    #[error("no selection")]
    NoSelection,
    /// The saved selection points at nodes that are gone
    #[error("selection no longer matches the document")]
    StaleSelection,
    #[error("not an absolute http(s) URL: {0:?}")]
    InvalidLink(String),
    /// The tree rejected a mutation; the edit was rolled back
    #[error("edit rolled back: {0}")]
    Mutation(#[from] TreeError),
}

/// What to do when a wrap is requested with nothing selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptySelection {
    /// Insert a wrapper holding a zero-width placeholder
    Placeholder,
    /// Refuse the edit
    Reject,
}

/// A requested wrap: the element to create and the styles to put on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatting {
    pub tag: Tag,
    pub styles: BTreeMap<String, String>,
    pub empty: EmptySelection,
}

impl Formatting {
    pub fn new(tag: Tag) -> Self {
        Formatting {
            tag,
            styles: BTreeMap::new(),
            empty: EmptySelection::Placeholder,
        }
    }

    pub fn with_style(mut self, property: &str, value: impl Into<String>) -> Self {
        self.styles.insert(property.to_string(), value.into());
        self
    }

    /// Refuse to apply to an empty selection
    pub fn require_text(mut self) -> Self {
        self.empty = EmptySelection::Reject;
        self
    }

    pub fn bold() -> Self {
        Self::new(Tag::Strong)
    }

    pub fn italic() -> Self {
        Self::new(Tag::Emphasis)
    }

    pub fn underline() -> Self {
        Self::new(Tag::Underline)
    }

    pub fn strikethrough() -> Self {
        Self::new(Tag::Strike)
    }

    pub fn heading(level: u8) -> Self {
        Self::new(Tag::heading(level)).require_text()
    }

    pub fn paragraph() -> Self {
        Self::new(Tag::Paragraph).require_text()
    }

    pub fn font_size(px: u32) -> Self {
        Self::new(Tag::Span)
            .with_style("font-size", format!("{}px", px))
            .require_text()
    }

    pub fn color(color: &str) -> Self {
        Self::new(Tag::Span)
            .with_style("color", color)
            .require_text()
    }
}

/// Horizontal alignment of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            "justify" => Ok(Alignment::Justify),
            other => Err(format!("unknown alignment '{}'", other)),
        }
    }
}

/// How malformed link targets are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPolicy {
    /// Reject anything that is not an absolute http(s) URL
    #[default]
    Strict,
    /// Prepend `https://` to targets without a scheme before validating
    Lenient,
}

/// Styles put on newly created list containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListStyle {
    pub indent: String,
    pub margin: String,
}

impl Default for ListStyle {
    fn default() -> Self {
        ListStyle {
            indent: "20px".to_string(),
            margin: "8px 0".to_string(),
        }
    }
}

/// A committed edit: the new selection, the node it created and the steps
/// needed to undo or replay it
#[derive(Debug, Clone)]
pub struct Applied {
    pub range: Range,
    pub node: NodeId,
    pub splice: Splice,
}

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*(?::\d{1,5})?(?:[/?#][^\s]*)?$")
        .expect("URL pattern is valid")
});

static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("scheme pattern is valid"));

/// Check a link target against the policy, returning the href to use
pub fn validate_link(href: &str, policy: LinkPolicy) -> EditResult<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return Err(EditError::InvalidLink(href.to_string()));
    }
    let candidate = match policy {
        LinkPolicy::Lenient if !SCHEME_PATTERN.is_match(trimmed) => format!("https://{}", trimmed),
        _ => trimmed.to_string(),
    };
    if URL_PATTERN.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(EditError::InvalidLink(href.to_string()))
    }
}

// Runs `edit` against a fresh splice, rolling back whatever it managed to do
// if it fails
fn transact<F>(tree: &mut DocumentTree, what: &str, edit: F) -> EditResult<Applied>
where
    F: FnOnce(&mut DocumentTree, &mut Splice) -> TreeResult<(Range, NodeId)>,
{
    let mut splice = Splice::new();
    match edit(tree, &mut splice) {
        Ok((range, node)) => Ok(Applied {
            range,
            node,
            splice,
        }),
        Err(err) => {
            warn!(operation = what, error = %err, "edit failed, rolling back");
            splice.rollback(tree);
            Err(EditError::Mutation(err))
        }
    }
}

fn check_range(tree: &DocumentTree, range: &Range) -> EditResult<()> {
    range
        .validate(tree)
        .map_err(|_| EditError::StaleSelection)
}

// Remove the range's contents and put `node` where they were
fn replace_contents(
    tree: &mut DocumentTree,
    splice: &mut Splice,
    range: &Range,
    node: NodeId,
) -> TreeResult<(NodeId, usize)> {
    let (parent, start, end) = splice.isolate(tree, range)?;
    for _ in start..end {
        let child = tree
            .child(parent, start)
            .ok_or(TreeError::OffsetOutOfBounds {
                node: parent,
                offset: start,
                len: tree.node_len(parent),
            })?;
        splice.remove(tree, child)?;
    }
    splice.insert(tree, parent, start, node)?;
    Ok((parent, start))
}

/// Replace the range's contents with a `formatting.tag` element holding the
/// selected text, styled with `formatting.styles`. The new selection spans
/// the wrapper's text.
pub fn wrap_selection(
    tree: &mut DocumentTree,
    range: &Range,
    formatting: &Formatting,
) -> EditResult<Applied> {
    check_range(tree, range)?;
    let text = range.text_content(tree);
    if text.is_empty() && formatting.empty == EmptySelection::Reject {
        return Err(EditError::NoSelection);
    }

    let wrapper = tree.create_element(formatting.tag.clone());
    for (property, value) in &formatting.styles {
        tree.set_style(wrapper, property, Some(value.as_str()))?;
    }
    let content = if text.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        text
    };
    let inner = tree.create_text(content);
    tree.append_child(wrapper, inner)?;

    transact(tree, "wrap", |tree, splice| {
        replace_contents(tree, splice, range, wrapper)?;
        Ok((Range::select_contents(tree, inner), wrapper))
    })
}

/// Replace the range with a list holding one item per non-blank line of the
/// selected text. The caret ends up at the end of the last item.
pub fn listify(
    tree: &mut DocumentTree,
    range: &Range,
    ordered: bool,
    style: &ListStyle,
) -> EditResult<Applied> {
    check_range(tree, range)?;
    let text = range.text_content(tree);
    let lines: Vec<String> = if text.is_empty() {
        vec![PLACEHOLDER.to_string()]
    } else {
        text.split('\n')
            .map(|line| line.trim_end_matches('\r').trim())
            .filter(|line| !is_blank(line))
            .map(str::to_string)
            .collect()
    };
    if lines.is_empty() {
        return Err(EditError::NoSelection);
    }

    let list = tree.create_element(if ordered {
        Tag::OrderedList
    } else {
        Tag::UnorderedList
    });
    tree.set_style(list, "padding-left", Some(style.indent.as_str()))?;
    tree.set_style(list, "margin", Some(style.margin.as_str()))?;
    let mut last_text = None;
    for line in lines {
        let item = tree.create_element(Tag::ListItem);
        let text = tree.create_text(line);
        tree.append_child(item, text)?;
        tree.append_child(list, item)?;
        last_text = Some(text);
    }
    let last_text = last_text.ok_or(EditError::NoSelection)?;

    transact(tree, "listify", |tree, splice| {
        replace_contents(tree, splice, range, list)?;
        let end = Position::new(last_text, tree.node_len(last_text));
        Ok((Range::caret(end), list))
    })
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c.is_whitespace() || c == PLACEHOLDER)
}

/// Align the block holding the range. Known blocks get `text-align` set
/// directly; inline content and images are moved into a new aligned `div`.
/// `editable` is never restyled itself.
pub fn align(
    tree: &mut DocumentTree,
    range: &Range,
    alignment: Alignment,
    editable: NodeId,
) -> EditResult<Applied> {
    check_range(tree, range)?;
    let value = alignment.as_str();

    if let Some(media) = selected_media(tree, range) {
        return transact(tree, "align", |tree, splice| {
            let wrapper = tree.create_element(Tag::Div);
            tree.set_style(wrapper, "text-align", Some(value))?;
            let parent = tree.parent(media).ok_or(TreeError::Detached(media))?;
            let index = tree
                .index_in_parent(media)
                .ok_or(TreeError::Detached(media))?;
            splice.remove(tree, media)?;
            splice.insert(tree, wrapper, 0, media)?;
            splice.insert(tree, parent, index, wrapper)?;
            let range = Range::select_node(tree, wrapper).ok_or(TreeError::Detached(wrapper))?;
            Ok((range, wrapper))
        });
    }

    let mut target = range
        .common_ancestor(tree)
        .ok_or(EditError::StaleSelection)?;
    if tree.is_text(target) {
        target = tree.parent(target).ok_or(EditError::StaleSelection)?;
    }
    let is_block = matches!(
        tree.tag(target),
        Some(Tag::Paragraph | Tag::Heading(_) | Tag::ListItem | Tag::BlockQuote | Tag::Div)
    );

    if is_block && target != editable {
        return transact(tree, "align", |tree, splice| {
            splice.set_style(tree, target, "text-align", Some(value))?;
            Ok((*range, target))
        });
    }

    transact(tree, "align", |tree, splice| {
        let wrapper = tree.create_element(Tag::Div);
        tree.set_style(wrapper, "text-align", Some(value))?;
        surround_contents(tree, splice, range, wrapper)?;
        Ok((Range::select_contents(tree, wrapper), wrapper))
    })
}

/// Move the nodes covered by `range` into the detached `wrapper` and put the
/// wrapper where they were. An empty run leaves a placeholder in the wrapper
/// so it stays addressable. Returns how many nodes were moved.
pub(crate) fn surround_contents(
    tree: &mut DocumentTree,
    splice: &mut Splice,
    range: &Range,
    wrapper: NodeId,
) -> TreeResult<usize> {
    let (parent, start, end) = splice.isolate(tree, range)?;
    let moving: Vec<NodeId> = tree.children(parent)[start..end].to_vec();
    for (i, &node) in moving.iter().enumerate() {
        splice.remove(tree, node)?;
        splice.insert(tree, wrapper, i, node)?;
    }
    if moving.is_empty() {
        let placeholder = tree.create_text(PLACEHOLDER.to_string());
        tree.append_child(wrapper, placeholder)?;
    }
    splice.insert(tree, parent, start, wrapper)?;
    Ok(moving.len())
}

// The media element a range selects on its own, if any
fn selected_media(tree: &DocumentTree, range: &Range) -> Option<NodeId> {
    let (start, end) = range.ordered(tree).ok()?;
    let candidate = if start.node == end.node && end.offset == start.offset + 1 {
        tree.child(start.node, start.offset)?
    } else if tree.tag(start.node).is_some_and(Tag::is_media) {
        start.node
    } else {
        let ancestor = range.common_ancestor(tree)?;
        if tree.tag(ancestor).is_some_and(Tag::is_media) {
            ancestor
        } else {
            return None;
        }
    };
    tree.tag(candidate)
        .is_some_and(Tag::is_media)
        .then_some(candidate)
}

/// Replace the range's contents with an image and put the caret after it
pub fn insert_media(tree: &mut DocumentTree, range: &Range, src: &str) -> EditResult<Applied> {
    check_range(tree, range)?;
    if src.trim().is_empty() {
        return Err(EditError::NoSelection);
    }
    let image = tree.create_element(Tag::Image);
    tree.set_attr(image, "src", Some(src.trim()))?;

    transact(tree, "insert media", |tree, splice| {
        let (parent, index) = replace_contents(tree, splice, range, image)?;
        Ok((Range::caret(Position::new(parent, index + 1)), image))
    })
}

/// Replace the range's contents with a link around the selected text (or
/// the href itself when nothing is selected) and put the caret after it.
/// Invalid targets are rejected before the tree is touched.
pub fn insert_link(
    tree: &mut DocumentTree,
    range: &Range,
    href: &str,
    policy: LinkPolicy,
) -> EditResult<Applied> {
    let href = validate_link(href, policy)?;
    check_range(tree, range)?;
    let text = range.text_content(tree);
    let label = if text.is_empty() { href.clone() } else { text };

    let anchor = tree.create_element(Tag::Anchor);
    tree.set_attr(anchor, "href", Some(href.as_str()))?;
    let inner = tree.create_text(label);
    tree.append_child(anchor, inner)?;

    transact(tree, "insert link", |tree, splice| {
        let (parent, index) = replace_contents(tree, splice, range, anchor)?;
        Ok((Range::caret(Position::new(parent, index + 1)), anchor))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(text: &str) -> (DocumentTree, NodeId) {
        DocumentTree::from_plain_text(text)
    }

    fn chars(tree: &DocumentTree, editable: NodeId, a: usize, b: usize) -> Range {
        let (an, ao) = tree.point_at_char(editable, a).unwrap();
        let (fnode, fo) = tree.point_at_char(editable, b).unwrap();
        Range::new(Position::new(an, ao), Position::new(fnode, fo))
    }

    #[test]
    fn test_wrap_selection_bold() {
        let (mut tree, editable) = setup("Hello world");
        let range = chars(&tree, editable, 6, 11);
        let applied = wrap_selection(&mut tree, &range, &Formatting::bold()).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>Hello <strong>world</strong></p>"
        );
        assert_eq!(applied.range.text_content(&tree), "world");
        assert_eq!(tree.tag(applied.node), Some(&Tag::Strong));
    }

    #[test]
    fn test_wrap_selection_applies_styles() {
        let (mut tree, editable) = setup("Hello world");
        let range = chars(&tree, editable, 0, 5);
        wrap_selection(&mut tree, &range, &Formatting::font_size(18)).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p><span style=\"font-size: 18px\">Hello</span> world</p>"
        );
    }

    #[test]
    fn test_wrap_collapsed_inserts_placeholder() {
        let (mut tree, editable) = setup("Hello");
        let range = chars(&tree, editable, 2, 2);
        let applied = wrap_selection(&mut tree, &range, &Formatting::bold()).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>He<strong>&#8203;</strong>llo</p>"
        );
        let inner = tree.child(applied.node, 0).unwrap();
        assert_eq!(tree.text(inner), Some("\u{200B}"));
        assert!(tree.contains(applied.node, applied.range.anchor.node));
        assert!(tree.contains(applied.node, applied.range.focus.node));
    }

    #[test]
    fn test_wrap_collapsed_rejected_when_text_required() {
        let (mut tree, editable) = setup("Hello");
        let range = chars(&tree, editable, 2, 2);
        assert_eq!(
            wrap_selection(&mut tree, &range, &Formatting::heading(1)).unwrap_err(),
            EditError::NoSelection
        );
        assert_eq!(tree.inner_markup(editable), "<p>Hello</p>");
    }

    #[test]
    fn test_wrap_rolls_back_on_failure() {
        let (mut tree, editable) = setup("Hello brave world\n\nSecond");
        let before = tree.text_content(editable);
        let range = chars(&tree, editable, 6, 20);
        // let the boundary splits through, fail while removing the blocks
        tree.fail_after(14);
        let err = wrap_selection(&mut tree, &range, &Formatting::italic()).unwrap_err();
        assert!(matches!(err, EditError::Mutation(_)));
        assert_eq!(tree.text_content(editable), before);
        assert_eq!(
            tree.inner_markup(editable),
            "<p>Hello brave world</p><p>Second</p>"
        );
    }

    const SWEEP_TEXT: &str = "Hello brave world\nline two\n\nSecond para here";

    // Fails the n-th tree mutation for n = 0, 1, ... until the edit gets
    // through. Every failed attempt must leave the markup exactly as it was.
    fn assert_rolls_back_at_every_step<P, E>(prepare: P, edit: E)
    where
        P: Fn() -> (DocumentTree, NodeId),
        E: Fn(&mut DocumentTree, NodeId) -> EditResult<Applied>,
    {
        for n in 0..200 {
            let (mut tree, editable) = prepare();
            let before = tree.inner_markup(editable);
            tree.fail_after(n);
            match edit(&mut tree, editable) {
                Ok(_) => {
                    assert!(n > 0, "edit never touched the tree");
                    return;
                }
                Err(err) => {
                    assert_eq!(err, EditError::Mutation(TreeError::Injected), "fault at {}", n);
                    assert_eq!(tree.inner_markup(editable), before, "fault at {}", n);
                }
            }
        }
        panic!("edit did not complete within 200 mutations");
    }

    fn sweep_document() -> (DocumentTree, NodeId) {
        setup(SWEEP_TEXT)
    }

    fn document_with_image() -> (DocumentTree, NodeId) {
        let (mut tree, editable) = setup(SWEEP_TEXT);
        let range = chars(&tree, editable, 6, 11);
        insert_media(&mut tree, &range, "cat.png").unwrap();
        (tree, editable)
    }

    #[test]
    fn test_wrap_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(sweep_document, |tree, editable| {
            let range = chars(tree, editable, 3, 30);
            wrap_selection(tree, &range, &Formatting::italic())
        });
    }

    #[test]
    fn test_listify_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(sweep_document, |tree, editable| {
            let range = chars(tree, editable, 3, 30);
            listify(tree, &range, true, &ListStyle::default())
        });
    }

    #[test]
    fn test_align_block_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(sweep_document, |tree, editable| {
            let range = chars(tree, editable, 0, 5);
            align(tree, &range, Alignment::Center, editable)
        });
    }

    #[test]
    fn test_align_inline_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(sweep_document, |tree, editable| {
            let range = chars(tree, editable, 3, 30);
            align(tree, &range, Alignment::Right, editable)
        });
    }

    #[test]
    fn test_align_media_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(document_with_image, |tree, editable| {
            let image = tree
                .descendants(editable)
                .into_iter()
                .find(|&node| tree.tag(node) == Some(&Tag::Image))
                .unwrap();
            let range = Range::select_node(tree, image).unwrap();
            align(tree, &range, Alignment::Center, editable)
        });
    }

    #[test]
    fn test_insert_media_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(sweep_document, |tree, editable| {
            let range = chars(tree, editable, 3, 30);
            insert_media(tree, &range, "cat.png")
        });
    }

    #[test]
    fn test_insert_link_is_atomic_at_every_step() {
        assert_rolls_back_at_every_step(sweep_document, |tree, editable| {
            let range = chars(tree, editable, 3, 30);
            insert_link(tree, &range, "https://docs.rs", LinkPolicy::Strict)
        });
    }

    #[test]
    fn test_wrap_stale_range() {
        let (mut tree, editable) = setup("Hello");
        let range = chars(&tree, editable, 0, 3);
        let p = tree.child(editable, 0).unwrap();
        tree.detach(p).unwrap();
        assert_eq!(
            wrap_selection(&mut tree, &range, &Formatting::bold()).unwrap_err(),
            EditError::StaleSelection
        );
    }

    #[test]
    fn test_listify_drops_blank_lines() {
        let mut tree = DocumentTree::new();
        let editable = tree.create_element(Tag::Div);
        let root = tree.root();
        tree.append_child(root, editable).unwrap();
        let text = tree.create_text("a\n\nb\nc");
        tree.append_child(editable, text).unwrap();

        let range = Range::select_contents(&tree, text);
        let applied = listify(&mut tree, &range, false, &ListStyle::default()).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<ul style=\"margin: 8px 0; padding-left: 20px\"><li>a</li><li>b</li><li>c</li></ul>"
        );
        assert_eq!(tree.children(applied.node).len(), 3);
        let last_item = tree.child(applied.node, 2).unwrap();
        let last_text = tree.child(last_item, 0).unwrap();
        assert!(applied.range.is_collapsed());
        assert_eq!(applied.range.anchor, Position::new(last_text, 1));
    }

    #[test]
    fn test_listify_collapsed_creates_single_item() {
        let (mut tree, editable) = setup("ab");
        let range = chars(&tree, editable, 1, 1);
        let applied = listify(&mut tree, &range, true, &ListStyle::default()).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>a<ol style=\"margin: 8px 0; padding-left: 20px\"><li>&#8203;</li></ol>b</p>"
        );
        let item = tree.child(applied.node, 0).unwrap();
        assert!(tree.contains(item, applied.range.anchor.node));
    }

    #[test]
    fn test_listify_whitespace_only_selection_is_noop() {
        let (mut tree, editable) = setup("a   b");
        let range = chars(&tree, editable, 1, 4);
        assert_eq!(
            listify(&mut tree, &range, false, &ListStyle::default()).unwrap_err(),
            EditError::NoSelection
        );
        assert_eq!(tree.inner_markup(editable), "<p>a   b</p>");
    }

    #[test]
    fn test_align_sets_style_on_block() {
        let (mut tree, editable) = setup("Hello");
        let range = chars(&tree, editable, 1, 3);
        let applied = align(&mut tree, &range, Alignment::Center, editable).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p style=\"text-align: center\">Hello</p>"
        );
        assert_eq!(applied.range, range);

        applied.splice.revert(&mut tree).unwrap();
        assert_eq!(tree.inner_markup(editable), "<p>Hello</p>");
    }

    #[test]
    fn test_align_wraps_inline_content() {
        let (mut tree, editable) = setup("Hello world");
        let range = chars(&tree, editable, 0, 5);
        let bold = wrap_selection(&mut tree, &range, &Formatting::bold()).unwrap();
        let applied = align(&mut tree, &bold.range, Alignment::Right, editable).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p><strong><div style=\"text-align: right\">Hello</div></strong> world</p>"
        );
        assert_eq!(applied.range.text_content(&tree), "Hello");
    }

    #[test]
    fn test_align_never_restyles_editable_root() {
        let mut tree = DocumentTree::new();
        let editable = tree.create_element(Tag::Div);
        let root = tree.root();
        tree.append_child(root, editable).unwrap();
        let text = tree.create_text("loose text");
        tree.append_child(editable, text).unwrap();

        let range = Range::new(Position::new(text, 0), Position::new(text, 5));
        align(&mut tree, &range, Alignment::Center, editable).unwrap();
        assert_eq!(tree.style(editable, "text-align"), None);
        assert_eq!(
            tree.inner_markup(editable),
            "<div style=\"text-align: center\">loose</div> text"
        );
    }

    #[test]
    fn test_align_wraps_media_individually() {
        let (mut tree, editable) = setup("ab");
        let range = chars(&tree, editable, 1, 1);
        let image = insert_media(&mut tree, &range, "cat.png").unwrap();
        let selected = Range::select_node(&tree, image.node).unwrap();

        let applied = align(&mut tree, &selected, Alignment::Center, editable).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>a<div style=\"text-align: center\"><img src=\"cat.png\"></div>b</p>"
        );
        assert_eq!(tree.tag(applied.node), Some(&Tag::Div));

        applied.splice.revert(&mut tree).unwrap();
        assert_eq!(tree.inner_markup(editable), "<p>a<img src=\"cat.png\">b</p>");
    }

    #[test]
    fn test_insert_media_moves_caret_after() {
        let (mut tree, editable) = setup("Hello world");
        let range = chars(&tree, editable, 5, 11);
        let applied = insert_media(&mut tree, &range, "https://example.com/a.png").unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>Hello<img src=\"https://example.com/a.png\"></p>"
        );
        assert_eq!(
            applied.range,
            Range::caret(Position::after(&tree, applied.node).unwrap())
        );
    }

    #[test]
    fn test_insert_link_wraps_selected_text() {
        let (mut tree, editable) = setup("see docs here");
        let range = chars(&tree, editable, 4, 8);
        let applied =
            insert_link(&mut tree, &range, "https://docs.rs", LinkPolicy::Strict).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>see <a href=\"https://docs.rs\">docs</a> here</p>"
        );
        assert!(applied.range.is_collapsed());
        assert_eq!(applied.range.anchor, Position::after(&tree, applied.node).unwrap());
    }

    #[test]
    fn test_insert_link_strict_rejects_without_mutation() {
        let (mut tree, editable) = setup("see docs");
        let before = tree.inner_markup(editable);
        let range = chars(&tree, editable, 4, 8);
        assert_eq!(
            insert_link(&mut tree, &range, "not-a-url", LinkPolicy::Strict).unwrap_err(),
            EditError::InvalidLink("not-a-url".to_string())
        );
        assert_eq!(tree.inner_markup(editable), before);
    }

    #[test]
    fn test_insert_link_lenient_prepends_scheme() {
        let (mut tree, editable) = setup("see docs");
        let range = chars(&tree, editable, 4, 8);
        insert_link(&mut tree, &range, "docs.rs/regex", LinkPolicy::Lenient).unwrap();
        assert_eq!(
            tree.inner_markup(editable),
            "<p>see <a href=\"https://docs.rs/regex\">docs</a></p>"
        );
    }

    #[test]
    fn test_validate_link() {
        assert!(validate_link("http://example.com", LinkPolicy::Strict).is_ok());
        assert!(validate_link("https://example.com:8080/a?b=c#d", LinkPolicy::Strict).is_ok());
        assert!(validate_link("ftp://example.com", LinkPolicy::Strict).is_err());
        assert!(validate_link("example.com", LinkPolicy::Strict).is_err());
        assert!(validate_link("https://", LinkPolicy::Strict).is_err());
        assert!(validate_link("", LinkPolicy::Lenient).is_err());
        assert!(validate_link("ftp://example.com", LinkPolicy::Lenient).is_err());
        assert_eq!(
            validate_link("  example.com ", LinkPolicy::Lenient).unwrap(),
            "https://example.com"
        );
    }
}
