// Selection model
// Keeps an owned copy of the user's last selection inside the editable
// surface so it survives focus moving to popups and buttons.

use tracing::debug;

use super::range::Range;
use super::surface::Surface;

/// Saved-selection slot. The only component that touches the host's live
/// selection; everything else works on explicit `Range` values.
#[derive(Debug, Default, Clone)]
pub struct SelectionModel {
    saved: Option<Range>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The saved selection, if any
    pub fn saved(&self) -> Option<Range> {
        self.saved
    }

    /// Copy the live selection into the slot. Leaves the slot untouched and
    /// returns false when there is no live selection.
    pub fn save<S: Surface + ?Sized>(&mut self, surface: &S) -> bool {
        match surface.live_selection() {
            Ok(Some(range)) => {
                self.saved = Some(range);
                true
            }
            Ok(None) => false,
            Err(err) => {
                debug!(error = %err, "could not save selection");
                false
            }
        }
    }

    /// Re-apply the saved selection as the live selection. The slot is kept,
    /// so restoring again without intervening edits yields the same range.
    pub fn restore<S: Surface + ?Sized>(&self, surface: &mut S) -> bool {
        let Some(range) = self.saved else {
            return false;
        };
        match surface.set_live_selection(Some(range)) {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "could not restore selection");
                false
            }
        }
    }

    /// Make `range` the live selection and remember it
    pub fn select<S: Surface + ?Sized>(&mut self, surface: &mut S, range: Range) -> bool {
        match surface.set_live_selection(Some(range)) {
            Ok(()) => {
                self.saved = Some(range);
                true
            }
            Err(err) => {
                debug!(error = %err, "could not select range");
                false
            }
        }
    }

    /// Swap in the saved range re-expressed after a structural change that
    /// kept its content in place
    pub fn relocate(&mut self, range: Range) {
        if self.saved.is_some() {
            self.saved = Some(range);
        }
    }

    /// Host notification that the live selection changed. Saves it when the
    /// anchor lies inside the editable subtree and ignores it otherwise.
    pub fn observe_selection_change<S: Surface + ?Sized>(&mut self, surface: &S) -> bool {
        let Ok(Some(range)) = surface.live_selection() else {
            return false;
        };
        if !surface
            .tree()
            .contains(surface.editable_root(), range.anchor.node)
        {
            return false;
        }
        self.save(surface)
    }

    /// Saved selection if it still resolves against the current tree
    pub fn current<S: Surface + ?Sized>(&self, surface: &S) -> Option<Range> {
        self.saved
            .filter(|range| range.validate(surface.tree()).is_ok())
    }
}
