// Caret coordinates
// Where to anchor a popup for the current selection.

use tracing::{trace, warn};

use super::document_tree::{PLACEHOLDER, Tag};
use super::range::Range;
use super::splice::Splice;
use super::surface::{Point, Surface};

/// Screen point for the end of `range`.
///
/// A non-collapsed range anchors at the right edge of its last line
/// fragment. Otherwise a zero-width marker is put at the caret, measured,
/// and taken out again; the tree is left exactly as it was. Returns `None`
/// when the range is stale or nothing can be measured.
pub fn locate<S: Surface + ?Sized>(surface: &mut S, range: &Range) -> Option<Point> {
    if range.validate(surface.tree()).is_err() {
        return None;
    }

    if !range.is_collapsed()
        && let Some(last) = surface.client_rects(range).last()
    {
        return Some(Point {
            x: last.right(),
            y: last.y,
        });
    }

    let caret = range.collapse_to_end(surface.tree()).ok()?;
    measure_marker(surface, &caret)
}

fn measure_marker<S: Surface + ?Sized>(surface: &mut S, caret: &Range) -> Option<Point> {
    let tree = surface.tree_mut();
    let marker = tree.create_element(Tag::Span);
    let text = tree.create_text(PLACEHOLDER.to_string());
    tree.append_child(marker, text).ok()?;

    let mut splice = Splice::new();
    let placed = splice
        .isolate(tree, caret)
        .and_then(|(parent, start, _)| splice.insert(tree, parent, start, marker));
    if let Err(err) = placed {
        trace!(error = %err, "could not place caret marker");
        splice.rollback(tree);
        let _ = tree.release(marker);
        return None;
    }

    let rect = surface.bounding_rect(marker);
    let tree = surface.tree_mut();
    match splice.revert(tree) {
        Ok(()) => splice.release(tree),
        Err(err) => warn!(error = %err, "could not remove caret marker"),
    }
    rect.map(|rect| Point {
        x: rect.x,
        y: rect.y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::surface::MemorySurface;

    #[test]
    fn test_locate_uses_last_line_of_selection() {
        let mut surface = MemorySurface::from_plain_text("Hello world\n\nSecond line");
        let range = surface.range_at_chars(6, 17).unwrap();
        // "Second" sits on the second row, six cells wide
        assert_eq!(
            locate(&mut surface, &range),
            Some(Point { x: 48.0, y: 16.0 })
        );
    }

    #[test]
    fn test_locate_collapsed_leaves_tree_untouched() {
        let mut surface = MemorySurface::from_plain_text("Hello world");
        let before = surface.markup();
        let caret = surface.range_at_chars(3, 3).unwrap();
        assert_eq!(
            locate(&mut surface, &caret),
            Some(Point { x: 24.0, y: 0.0 })
        );
        assert_eq!(surface.markup(), before);
        assert!(caret.validate(surface.tree()).is_ok());
        assert_eq!(surface.text(), "Hello world");
    }

    #[test]
    fn test_repeated_locate_does_not_grow_tree() {
        let mut surface = MemorySurface::from_plain_text("Hello world");
        let caret = surface.range_at_chars(3, 3).unwrap();
        locate(&mut surface, &caret).unwrap();
        let slots = surface.tree().arena_len();

        for _ in 0..50 {
            assert_eq!(
                locate(&mut surface, &caret),
                Some(Point { x: 24.0, y: 0.0 })
            );
        }
        assert_eq!(surface.tree().arena_len(), slots);
        assert!(caret.validate(surface.tree()).is_ok());
    }

    #[test]
    fn test_locate_stale_range() {
        let mut surface = MemorySurface::from_plain_text("Hello");
        let range = surface.range_at_chars(0, 2).unwrap();
        let editable = surface.editable_root();
        let p = surface.tree().child(editable, 0).unwrap();
        surface.tree_mut().detach(p).unwrap();
        assert_eq!(locate(&mut surface, &range), None);
    }
}
