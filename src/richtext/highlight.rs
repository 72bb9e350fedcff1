// Selection highlight
// While a popup has focus the host stops painting the selection, so the
// selected content is wrapped in a tinted marker until focus comes back.

use tracing::{debug, warn};

use super::document_tree::{NodeId, Tag};
use super::mutation::surround_contents;
use super::range::Range;
use super::selection::SelectionModel;
use super::splice::Splice;
use super::surface::Surface;

pub const DEFAULT_HIGHLIGHT_CLASS: &str = "text-selection-highlight";
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#d0d0d3";

#[derive(Debug)]
struct Marker {
    node: NodeId,
    splice: Splice,
}

/// Owns the single highlight marker in the document
#[derive(Debug)]
pub struct Highlighter {
    class: String,
    color: String,
    marker: Option<Marker>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_HIGHLIGHT_CLASS, DEFAULT_HIGHLIGHT_COLOR)
    }
}

impl Highlighter {
    pub fn new(class: impl Into<String>, color: impl Into<String>) -> Self {
        Highlighter {
            class: class.into(),
            color: color.into(),
            marker: None,
        }
    }

    /// The marker element currently in the document
    pub fn marker(&self) -> Option<NodeId> {
        self.marker.as_ref().map(|marker| marker.node)
    }

    pub fn is_active(&self) -> bool {
        self.marker.is_some()
    }

    /// Wrap the saved selection in a marker. Any previous marker is removed
    /// first, so there is never more than one. Nothing is wrapped when the
    /// selection is missing, stale or holds only whitespace.
    pub fn apply<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        selection: &mut SelectionModel,
    ) -> Option<NodeId> {
        self.remove(surface, selection);

        if !selection.restore(surface) {
            return None;
        }
        let range = selection.current(surface)?;
        if range.text_content(surface.tree()).trim().is_empty() {
            return None;
        }

        let tree = surface.tree_mut();
        let span = tree.create_element(Tag::Span);
        let styled = tree
            .set_attr(span, "class", Some(self.class.as_str()))
            .and_then(|_| tree.set_style(span, "background-color", Some(self.color.as_str())));
        if let Err(err) = styled {
            warn!(error = %err, "could not build highlight marker");
            let _ = tree.release(span);
            return None;
        }

        let mut splice = Splice::new();
        if let Err(err) = surround_contents(tree, &mut splice, &range, span) {
            warn!(error = %err, "could not highlight selection");
            splice.rollback(tree);
            let _ = tree.release(span);
            return None;
        }
        debug!(marker = %span, "selection highlighted");
        self.marker = Some(Marker { node: span, splice });
        Some(span)
    }

    /// Take the marker out, leaving its content where it was. Returns
    /// whether a marker was removed. The saved and the live selection are
    /// moved off the nodes the marker split, so a selection made while the
    /// marker was shown still holds afterwards.
    pub fn remove<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        selection: &mut SelectionModel,
    ) -> bool {
        let Some(marker) = self.marker.take() else {
            return false;
        };
        if !surface.tree().is_connected(marker.node) {
            debug!(marker = %marker.node, "highlight marker already gone");
            return false;
        }

        let saved = selection.saved();
        let live = surface.live_selection().ok().flatten();
        let mut points: Vec<_> = saved
            .iter()
            .chain(live.iter())
            .flat_map(|range| [range.anchor, range.focus])
            .collect();

        let tree = surface.tree_mut();
        match marker.splice.revert_tracking(tree, &mut points) {
            Ok(()) => {
                marker.splice.release(tree);
                let mut carried = points.chunks(2).map(|pair| Range::new(pair[0], pair[1]));
                if saved.is_some()
                    && let Some(range) = carried.next()
                {
                    selection.relocate(range);
                }
                if live.is_some()
                    && let Some(range) = carried.next()
                    && let Err(err) = surface.set_live_selection(Some(range))
                {
                    debug!(error = %err, "could not carry live selection over highlight removal");
                }
            }
            Err(err) => {
                // the content moved since it was wrapped; flatten to plain text
                warn!(error = %err, "could not unwrap highlight, flattening");
                let text = tree.text_content(marker.node);
                let replacement = tree.create_text(text);
                if let Err(err) = tree.replace(marker.node, replacement) {
                    warn!(error = %err, "could not remove highlight marker");
                    return false;
                }
            }
        }
        true
    }
}

/// A step of handing focus back to the editable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    RemoveMarker,
    RestoreSelection,
}

/// Focus release after a popup closes. The marker must be gone before the
/// selection is restored, and a host may need to let a frame pass between
/// the two; each call to `step` runs exactly one of them, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRelease {
    next: Option<ReleaseStep>,
    restored: bool,
}

impl Default for FocusRelease {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusRelease {
    pub fn new() -> Self {
        FocusRelease {
            next: Some(ReleaseStep::RemoveMarker),
            restored: false,
        }
    }

    /// The step the next call to `step` will run
    pub fn pending(&self) -> Option<ReleaseStep> {
        self.next
    }

    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }

    /// Whether the selection came back
    pub fn restored(&self) -> bool {
        self.restored
    }

    /// Run the pending step and return it
    pub fn step<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        highlighter: &mut Highlighter,
        selection: &mut SelectionModel,
    ) -> Option<ReleaseStep> {
        let step = self.next?;
        match step {
            ReleaseStep::RemoveMarker => {
                highlighter.remove(surface, selection);
                self.next = Some(ReleaseStep::RestoreSelection);
            }
            ReleaseStep::RestoreSelection => {
                self.restored = selection.restore(surface);
                self.next = None;
            }
        }
        Some(step)
    }

    /// Run all remaining steps back to back
    pub fn finish<S: Surface + ?Sized>(
        mut self,
        surface: &mut S,
        highlighter: &mut Highlighter,
        selection: &mut SelectionModel,
    ) -> bool {
        while self.step(surface, highlighter, selection).is_some() {}
        self.restored
    }
}
