// Editor session
// Toolbar-facing glue: resolves the target range from the saved selection,
// runs commands through the history and puts the resulting selection back
// on the surface.

use tracing::{debug, warn};

use crate::config::EditorConfig;

use super::caret;
use super::command::Command;
use super::document_tree::NodeId;
use super::highlight::{FocusRelease, Highlighter, ReleaseStep};
use super::history::History;
use super::mutation::{Alignment, EditError, EditResult, Formatting};
use super::range::Range;
use super::selection::SelectionModel;
use super::surface::{Point, Surface};

/// Identifies one pending asynchronous media insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaTicket(u64);

/// Outcome of loading media before it is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLoad {
    Loaded,
    Failed,
}

#[derive(Debug)]
struct PendingMedia {
    ticket: MediaTicket,
    src: String,
    target: Range,
}

pub struct RichTextEditor<S: Surface> {
    surface: S,
    selection: SelectionModel,
    history: History,
    highlighter: Highlighter,
    config: EditorConfig,
    font_size: u32,
    media: Option<PendingMedia>,
    next_ticket: u64,
}

impl<S: Surface> RichTextEditor<S> {
    pub fn new(surface: S, config: EditorConfig) -> Self {
        RichTextEditor {
            surface,
            selection: SelectionModel::new(),
            history: History::with_limit(config.history_limit),
            highlighter: Highlighter::new(
                config.highlight_class.clone(),
                config.highlight_color.clone(),
            ),
            font_size: config.font_size.clamp(config.font_size.default),
            config,
            media: None,
            next_ticket: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Size the size buttons step from
    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    /// Host notification that the live selection moved
    pub fn selection_changed(&mut self) -> bool {
        self.selection.observe_selection_change(&self.surface)
    }

    // The range a toolbar action applies to
    fn target_range(&mut self) -> EditResult<Range> {
        self.highlighter.remove(&mut self.surface, &mut self.selection);
        self.selection.observe_selection_change(&self.surface);
        if self.selection.restore(&mut self.surface)
            && let Some(range) = self.selection.current(&self.surface)
        {
            return Ok(range);
        }
        if self.selection.saved().is_some() {
            Err(EditError::StaleSelection)
        } else {
            Err(EditError::NoSelection)
        }
    }

    fn run(&mut self, command: Command) -> EditResult<Range> {
        let name = command.name();
        match self.history.execute(command, self.surface.tree_mut()) {
            Ok(range) => {
                self.selection.select(&mut self.surface, range);
                Ok(range)
            }
            Err(err) => {
                debug!(command = name, error = %err, "command not applied");
                self.selection.restore(&mut self.surface);
                Err(err)
            }
        }
    }

    pub fn format(&mut self, formatting: Formatting) -> EditResult<Range> {
        let target = self.target_range()?;
        self.run(Command::wrap(target, formatting))
    }

    pub fn bold(&mut self) -> EditResult<Range> {
        self.format(Formatting::bold())
    }

    pub fn italic(&mut self) -> EditResult<Range> {
        self.format(Formatting::italic())
    }

    pub fn underline(&mut self) -> EditResult<Range> {
        self.format(Formatting::underline())
    }

    pub fn strikethrough(&mut self) -> EditResult<Range> {
        self.format(Formatting::strikethrough())
    }

    pub fn heading(&mut self, level: u8) -> EditResult<Range> {
        self.format(Formatting::heading(level))
    }

    pub fn paragraph(&mut self) -> EditResult<Range> {
        self.format(Formatting::paragraph())
    }

    pub fn color(&mut self, color: &str) -> EditResult<Range> {
        self.format(Formatting::color(color))
    }

    /// Apply an explicit font size, clamped to the configured bounds
    pub fn set_font_size(&mut self, px: u32) -> EditResult<Range> {
        self.font_size = self.config.font_size.clamp(px);
        self.format(Formatting::font_size(self.font_size))
    }

    pub fn increase_font_size(&mut self) -> EditResult<Range> {
        self.set_font_size(self.config.font_size.bigger(self.font_size))
    }

    pub fn decrease_font_size(&mut self) -> EditResult<Range> {
        self.set_font_size(self.config.font_size.smaller(self.font_size))
    }

    pub fn list(&mut self, ordered: bool) -> EditResult<Range> {
        let target = self.target_range()?;
        let style = self.config.list_style();
        self.run(Command::list(target, ordered, style))
    }

    pub fn align(&mut self, alignment: Alignment) -> EditResult<Range> {
        let target = self.target_range()?;
        let editable = self.surface.editable_root();
        self.run(Command::align(target, alignment, editable))
    }

    pub fn insert_link(&mut self, href: &str) -> EditResult<Range> {
        let target = self.target_range()?;
        self.run(Command::insert_link(target, href, self.config.link_policy))
    }

    /// Insert an image right away
    pub fn insert_image(&mut self, src: &str) -> EditResult<Range> {
        let target = self.target_range()?;
        self.run(Command::insert_media(target, src))
    }

    /// Returns the restored selection, or None if there was nothing to undo
    pub fn undo(&mut self) -> EditResult<Option<Range>> {
        self.highlighter.remove(&mut self.surface, &mut self.selection);
        let range = self.history.undo(self.surface.tree_mut())?;
        if let Some(range) = range {
            self.selection.select(&mut self.surface, range);
        }
        Ok(range)
    }

    /// Returns the new selection, or None if there was nothing to redo
    pub fn redo(&mut self) -> EditResult<Option<Range>> {
        self.highlighter.remove(&mut self.surface, &mut self.selection);
        let range = self.history.redo(self.surface.tree_mut())?;
        if let Some(range) = range {
            self.selection.select(&mut self.surface, range);
        }
        Ok(range)
    }

    /// Where to anchor a popup for the current selection
    pub fn caret_anchor(&mut self) -> Option<Point> {
        self.selection.observe_selection_change(&self.surface);
        let range = self.selection.current(&self.surface)?;
        caret::locate(&mut self.surface, &range)
    }

    /// A popup took focus: remember the selection and keep it visible
    pub fn popup_opened(&mut self) -> Option<NodeId> {
        self.selection.observe_selection_change(&self.surface);
        self.highlighter.apply(&mut self.surface, &mut self.selection)
    }

    /// Start handing focus back; drive it with `step_focus_release`
    pub fn begin_focus_release(&self) -> FocusRelease {
        FocusRelease::new()
    }

    pub fn step_focus_release(&mut self, release: &mut FocusRelease) -> Option<ReleaseStep> {
        release.step(&mut self.surface, &mut self.highlighter, &mut self.selection)
    }

    /// A popup closed: drop the marker, then restore the selection.
    /// Any media insert still loading is abandoned.
    pub fn popup_closed(&mut self) -> bool {
        self.cancel_media();
        FocusRelease::new().finish(
            &mut self.surface,
            &mut self.highlighter,
            &mut self.selection,
        )
    }

    /// Capture the target for an image that still has to load. The tree is
    /// not touched until `resolve_media` reports it loaded.
    pub fn begin_media_insert(&mut self, src: &str) -> EditResult<MediaTicket> {
        let target = self.target_range()?;
        let ticket = MediaTicket(self.next_ticket);
        self.next_ticket += 1;
        if let Some(previous) = self.media.replace(PendingMedia {
            ticket,
            src: src.to_string(),
            target,
        }) {
            debug!(src = %previous.src, "replacing pending media insert");
        }
        Ok(ticket)
    }

    /// Finish a media insert. Results for cancelled or superseded tickets
    /// are ignored.
    pub fn resolve_media(
        &mut self,
        ticket: MediaTicket,
        load: MediaLoad,
    ) -> EditResult<Option<Range>> {
        let Some(pending) = self.media.take_if(|pending| pending.ticket == ticket) else {
            debug!(?ticket, "ignoring late media result");
            return Ok(None);
        };
        match load {
            MediaLoad::Failed => {
                warn!(src = %pending.src, "media failed to load, nothing inserted");
                Ok(None)
            }
            MediaLoad::Loaded => {
                self.highlighter.remove(&mut self.surface, &mut self.selection);
                self.run(Command::insert_media(pending.target, pending.src))
                    .map(Some)
            }
        }
    }

    pub fn cancel_media(&mut self) {
        if let Some(pending) = self.media.take() {
            debug!(src = %pending.src, "media insert cancelled");
        }
    }

    pub fn has_pending_media(&self) -> bool {
        self.media.is_some()
    }
}
