use tracing::{debug, warn};

use super::command::Command;
use super::document_tree::DocumentTree;
use super::mutation::EditResult;
use super::range::Range;

pub const MAX_HISTORY_SIZE: usize = 100;

/// Undo and redo stacks of executed commands
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(MAX_HISTORY_SIZE)
    }

    pub fn with_limit(limit: usize) -> Self {
        History {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Run a command and record it.
    /// A successful command clears any redo history; a failed one leaves
    /// both stacks alone.
    pub fn execute(&mut self, mut command: Command, tree: &mut DocumentTree) -> EditResult<Range> {
        let range = command.execute(tree)?;
        debug!(command = command.name(), "executed");
        self.undo_stack.push(command);

        // Limit history size
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
        Ok(range)
    }

    /// Undo the most recent command.
    /// Returns the range to select, or None if there is nothing to undo
    pub fn undo(&mut self, tree: &mut DocumentTree) -> EditResult<Option<Range>> {
        let Some(command) = self.undo_stack.pop() else {
            return Ok(None);
        };
        match command.undo(tree) {
            Ok(range) => {
                debug!(command = command.name(), "undone");
                self.redo_stack.push(command);
                Ok(Some(range))
            }
            Err(err) => {
                warn!(command = command.name(), error = %err, "undo failed");
                self.undo_stack.push(command);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone command.
    /// Returns the range to select, or None if there is nothing to redo
    pub fn redo(&mut self, tree: &mut DocumentTree) -> EditResult<Option<Range>> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(None);
        };
        match command.execute(tree) {
            Ok(range) => {
                debug!(command = command.name(), "redone");
                self.undo_stack.push(command);
                Ok(Some(range))
            }
            Err(err) => {
                warn!(command = command.name(), error = %err, "redo failed");
                self.redo_stack.push(command);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::document_tree::NodeId;
    use crate::richtext::mutation::{Alignment, EditError, Formatting, ListStyle};
    use crate::richtext::range::Position;

    fn chars(tree: &DocumentTree, editable: NodeId, a: usize, b: usize) -> Range {
        let (an, ao) = tree.point_at_char(editable, a).unwrap();
        let (fnode, fo) = tree.point_at_char(editable, b).unwrap();
        Range::new(Position::new(an, ao), Position::new(fnode, fo))
    }

    #[test]
    fn test_undo_redo_sequence() {
        let (mut tree, editable) = DocumentTree::from_plain_text("Hello brave world");
        let mut history = History::new();
        let original = tree.inner_markup(editable);

        let bold = chars(&tree, editable, 0, 5);
        history
            .execute(Command::wrap(bold, Formatting::bold()), &mut tree)
            .unwrap();
        let after_bold = tree.inner_markup(editable);

        let centered = chars(&tree, editable, 6, 11);
        history
            .execute(Command::align(centered, Alignment::Center, editable), &mut tree)
            .unwrap();
        let after_align = tree.inner_markup(editable);
        assert_eq!(history.undo_len(), 2);

        history.undo(&mut tree).unwrap();
        assert_eq!(tree.inner_markup(editable), after_bold);
        history.undo(&mut tree).unwrap();
        assert_eq!(tree.inner_markup(editable), original);
        assert_eq!(history.undo(&mut tree), Ok(None));

        history.redo(&mut tree).unwrap();
        assert_eq!(tree.inner_markup(editable), after_bold);
        history.redo(&mut tree).unwrap();
        assert_eq!(tree.inner_markup(editable), after_align);
        assert_eq!(history.redo(&mut tree), Ok(None));
    }

    #[test]
    fn test_new_command_clears_redo() {
        let (mut tree, editable) = DocumentTree::from_plain_text("Hello world");
        let mut history = History::new();

        let range = chars(&tree, editable, 0, 5);
        history
            .execute(Command::wrap(range, Formatting::italic()), &mut tree)
            .unwrap();
        history.undo(&mut tree).unwrap();
        assert!(history.can_redo());

        let range = chars(&tree, editable, 6, 11);
        history
            .execute(Command::list(range, false, ListStyle::default()), &mut tree)
            .unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.redo(&mut tree), Ok(None));
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_failed_command_is_not_recorded() {
        let (mut tree, editable) = DocumentTree::from_plain_text("Hello");
        let mut history = History::new();
        let caret = chars(&tree, editable, 2, 2);
        let err = history
            .execute(Command::wrap(caret, Formatting::heading(2)), &mut tree)
            .unwrap_err();
        assert_eq!(err, EditError::NoSelection);
        assert!(!history.can_undo());
        assert_eq!(tree.inner_markup(editable), "<p>Hello</p>");
    }

    #[test]
    fn test_history_size_limit() {
        let (mut tree, editable) = DocumentTree::from_plain_text("abcdef");
        let mut history = History::with_limit(3);
        for _ in 0..5 {
            let p = tree.child(editable, 0).unwrap();
            let range = Range::select_contents(&tree, p);
            history
                .execute(Command::align(range, Alignment::Right, editable), &mut tree)
                .unwrap();
        }
        assert_eq!(history.undo_len(), 3);
        history.clear();
        assert!(!history.can_undo());
    }
}
