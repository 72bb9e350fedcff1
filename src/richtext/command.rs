// Undoable editing commands
// Each command remembers the range it targeted. The first execute runs the
// edit; afterwards the recorded splice is reverted and replayed as is.

use super::document_tree::{DocumentTree, NodeId};
use super::mutation::{
    self, Alignment, Applied, EditError, EditResult, Formatting, LinkPolicy, ListStyle,
};
use super::range::Range;

/// What an insert command puts into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    Media { src: String },
    Link { href: String, policy: LinkPolicy },
}

#[derive(Debug, Clone)]
pub enum Command {
    Wrap {
        target: Range,
        formatting: Formatting,
        applied: Option<Applied>,
    },
    List {
        target: Range,
        ordered: bool,
        style: ListStyle,
        applied: Option<Applied>,
    },
    Align {
        target: Range,
        alignment: Alignment,
        editable: NodeId,
        applied: Option<Applied>,
    },
    Insert {
        target: Range,
        insertion: Insertion,
        applied: Option<Applied>,
    },
}

impl Command {
    pub fn wrap(target: Range, formatting: Formatting) -> Self {
        Command::Wrap {
            target,
            formatting,
            applied: None,
        }
    }

    pub fn list(target: Range, ordered: bool, style: ListStyle) -> Self {
        Command::List {
            target,
            ordered,
            style,
            applied: None,
        }
    }

    pub fn align(target: Range, alignment: Alignment, editable: NodeId) -> Self {
        Command::Align {
            target,
            alignment,
            editable,
            applied: None,
        }
    }

    pub fn insert_media(target: Range, src: impl Into<String>) -> Self {
        Command::Insert {
            target,
            insertion: Insertion::Media { src: src.into() },
            applied: None,
        }
    }

    pub fn insert_link(target: Range, href: impl Into<String>, policy: LinkPolicy) -> Self {
        Command::Insert {
            target,
            insertion: Insertion::Link {
                href: href.into(),
                policy,
            },
            applied: None,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Wrap { .. } => "wrap",
            Command::List { .. } => "list",
            Command::Align { .. } => "align",
            Command::Insert {
                insertion: Insertion::Media { .. },
                ..
            } => "insert media",
            Command::Insert {
                insertion: Insertion::Link { .. },
                ..
            } => "insert link",
        }
    }

    /// The range the command was created for
    pub fn target(&self) -> Range {
        match self {
            Command::Wrap { target, .. }
            | Command::List { target, .. }
            | Command::Align { target, .. }
            | Command::Insert { target, .. } => *target,
        }
    }

    /// Whether the command has run at least once
    pub fn is_applied(&self) -> bool {
        self.applied().is_some()
    }

    fn applied(&self) -> Option<&Applied> {
        match self {
            Command::Wrap { applied, .. }
            | Command::List { applied, .. }
            | Command::Align { applied, .. }
            | Command::Insert { applied, .. } => applied.as_ref(),
        }
    }

    /// Run the edit, or replay it if it already ran. Returns the selection
    /// the document should show afterwards.
    pub fn execute(&mut self, tree: &mut DocumentTree) -> EditResult<Range> {
        if let Some(applied) = self.applied() {
            applied.splice.apply(tree)?;
            return Ok(applied.range);
        }

        let (applied, slot) = match self {
            Command::Wrap {
                target,
                formatting,
                applied,
            } => (mutation::wrap_selection(tree, target, formatting)?, applied),
            Command::List {
                target,
                ordered,
                style,
                applied,
            } => (mutation::listify(tree, target, *ordered, style)?, applied),
            Command::Align {
                target,
                alignment,
                editable,
                applied,
            } => (mutation::align(tree, target, *alignment, *editable)?, applied),
            Command::Insert {
                target,
                insertion,
                applied,
            } => {
                let done = match insertion {
                    Insertion::Media { src } => mutation::insert_media(tree, target, src)?,
                    Insertion::Link { href, policy } => {
                        mutation::insert_link(tree, target, href, *policy)?
                    }
                };
                (done, applied)
            }
        };
        let range = applied.range;
        *slot = Some(applied);
        Ok(range)
    }

    /// Put the document back the way it was before the command ran and
    /// return the range it originally targeted
    pub fn undo(&self, tree: &mut DocumentTree) -> EditResult<Range> {
        let applied = self.applied().ok_or(EditError::NoSelection)?;
        applied.splice.revert(tree)?;
        Ok(self.target())
    }
}
