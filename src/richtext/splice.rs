// Splice
// A recorded structural edit. Every step is applied as it is recorded, so a
// failure part way can be rolled back, and a finished splice can be reverted
// and replayed with the same node identities (undo/redo).

use tracing::warn;

use super::document_tree::{DocumentTree, NodeId, TreeError, TreeResult};
use super::range::{Position, Range};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    SplitText {
        node: NodeId,
        at: usize,
        sibling: NodeId,
    },
    SplitElement {
        node: NodeId,
        at: usize,
        sibling: NodeId,
    },
    Remove {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    Insert {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    Style {
        node: NodeId,
        property: String,
        before: Option<String>,
        after: Option<String>,
    },
}

impl Step {
    fn apply(&self, tree: &mut DocumentTree) -> TreeResult<()> {
        match self {
            Step::SplitText { node, at, sibling } => tree.split_text_into(*node, *at, *sibling),
            Step::SplitElement { node, at, sibling } => {
                tree.split_element_into(*node, *at, *sibling)
            }
            Step::Remove {
                parent,
                index,
                node,
            } => {
                if tree.parent(*node) != Some(*parent) || tree.index_in_parent(*node) != Some(*index)
                {
                    return Err(TreeError::Detached(*node));
                }
                tree.detach(*node).map(|_| ())
            }
            Step::Insert {
                parent,
                index,
                node,
            } => tree.insert_child(*parent, *index, *node),
            Step::Style {
                node,
                property,
                after,
                ..
            } => tree
                .set_style(*node, property, after.as_deref())
                .map(|_| ()),
        }
    }

    fn revert(&self, tree: &mut DocumentTree) -> TreeResult<()> {
        match self {
            Step::SplitText { node, sibling, .. } => tree.join_text(*node, *sibling),
            Step::SplitElement { node, sibling, .. } => tree.join_element(*node, *sibling),
            Step::Remove {
                parent,
                index,
                node,
            } => tree.insert_child(*parent, *index, *node),
            Step::Insert { parent, node, .. } => {
                if tree.parent(*node) != Some(*parent) {
                    return Err(TreeError::Detached(*node));
                }
                tree.detach(*node).map(|_| ())
            }
            Step::Style {
                node,
                property,
                before,
                ..
            } => tree
                .set_style(*node, property, before.as_deref())
                .map(|_| ()),
        }
    }
}

/// Journal of the steps making up one edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Splice {
    steps: Vec<Step>,
}

impl Splice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    fn record(&mut self, tree: &mut DocumentTree, step: Step) -> TreeResult<()> {
        step.apply(tree)?;
        self.steps.push(step);
        Ok(())
    }

    /// Split a text node at a character offset; returns the new right half
    pub fn split_text(&mut self, tree: &mut DocumentTree, node: NodeId, at: usize) -> TreeResult<NodeId> {
        let sibling = tree.create_text("");
        self.record(tree, Step::SplitText { node, at, sibling })?;
        Ok(sibling)
    }

    /// Split an element at a child index; returns the new right half
    pub fn split_element(
        &mut self,
        tree: &mut DocumentTree,
        node: NodeId,
        at: usize,
    ) -> TreeResult<NodeId> {
        let sibling = tree.clone_shell(node)?;
        self.record(tree, Step::SplitElement { node, at, sibling })?;
        Ok(sibling)
    }

    /// Detach an attached node
    pub fn remove(&mut self, tree: &mut DocumentTree, node: NodeId) -> TreeResult<()> {
        let parent = tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = tree.index_in_parent(node).ok_or(TreeError::Detached(node))?;
        self.record(
            tree,
            Step::Remove {
                parent,
                index,
                node,
            },
        )
    }

    /// Attach a detached node
    pub fn insert(
        &mut self,
        tree: &mut DocumentTree,
        parent: NodeId,
        index: usize,
        node: NodeId,
    ) -> TreeResult<()> {
        self.record(
            tree,
            Step::Insert {
                parent,
                index,
                node,
            },
        )
    }

    /// Set or clear a style property on an attached element
    pub fn set_style(
        &mut self,
        tree: &mut DocumentTree,
        node: NodeId,
        property: &str,
        value: Option<&str>,
    ) -> TreeResult<()> {
        let before = tree.style(node, property).map(str::to_string);
        self.record(
            tree,
            Step::Style {
                node,
                property: property.to_string(),
                before,
                after: value.map(str::to_string),
            },
        )
    }

    /// Replay every step. On failure, steps replayed so far are reverted.
    pub fn apply(&self, tree: &mut DocumentTree) -> TreeResult<()> {
        for (i, step) in self.steps.iter().enumerate() {
            if let Err(err) = step.apply(tree) {
                revert_steps(&self.steps[..i], tree);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Undo every step in reverse. On failure, steps undone so far are
    /// re-applied so the tree stays in its post-edit shape.
    pub fn revert(&self, tree: &mut DocumentTree) -> TreeResult<()> {
        self.revert_tracking(tree, &mut [])
    }

    /// Like `revert`, but carries `points` along so they address the same
    /// content once the split nodes are joined again. The points are left
    /// as they were when the revert fails.
    pub fn revert_tracking(
        &self,
        tree: &mut DocumentTree,
        points: &mut [Position],
    ) -> TreeResult<()> {
        let mut anchors: Vec<Anchor> = points.iter().map(|&p| Anchor::pin(tree, p)).collect();
        for (i, step) in self.steps.iter().enumerate().rev() {
            for anchor in anchors.iter_mut() {
                *anchor = self.carry(tree, step, *anchor);
            }
            if let Err(err) = step.revert(tree) {
                for done in &self.steps[i + 1..] {
                    if let Err(replay) = done.apply(tree) {
                        warn!(error = %replay, "could not replay step after failed revert");
                    }
                }
                return Err(err);
            }
        }
        for (point, anchor) in points.iter_mut().zip(anchors) {
            if let Some(resolved) = anchor.resolve(tree) {
                *point = resolved;
            }
        }
        Ok(())
    }

    // Where `anchor` belongs once `step` is undone
    fn carry(&self, tree: &DocumentTree, step: &Step, anchor: Anchor) -> Anchor {
        match *step {
            Step::SplitText { node, sibling, .. } => {
                let head = tree.node_len(node);
                match anchor {
                    Anchor::Text(n, offset) if n == sibling => Anchor::Text(node, head + offset),
                    Anchor::Before(n) if n == sibling => Anchor::Text(node, head),
                    Anchor::After(n) if n == sibling => {
                        Anchor::Text(node, head + tree.node_len(sibling))
                    }
                    other => other,
                }
            }
            Step::SplitElement { node, sibling, .. } => match anchor {
                Anchor::Before(n) if n == sibling => match tree.children(sibling).first() {
                    Some(&first) => Anchor::Before(first),
                    None => Anchor::end_of(tree, node),
                },
                Anchor::After(n) if n == sibling => match tree.children(sibling).last() {
                    Some(&last) => Anchor::After(last),
                    None => Anchor::end_of(tree, node),
                },
                Anchor::Inside(n) if n == sibling => Anchor::end_of(tree, node),
                other => other,
            },
            // a node this splice created leaves the tree for good
            Step::Insert { node, .. } if !self.reinserts(node) => {
                let first = tree.children(node).first().copied();
                let last = tree.children(node).last().copied();
                match anchor {
                    Anchor::Before(n) if n == node => match first.filter(|&c| self.reinserts(c)) {
                        Some(first) => Anchor::Before(first),
                        None => Anchor::gap(tree, node),
                    },
                    Anchor::After(n) if n == node => match last.filter(|&c| self.reinserts(c)) {
                        Some(last) => Anchor::After(last),
                        None => Anchor::gap(tree, node),
                    },
                    other if self.carried_off(tree, node, other.node()) => Anchor::gap(tree, node),
                    other => other,
                }
            }
            _ => anchor,
        }
    }

    // Whether reverting puts `node` back where it was taken from
    fn reinserts(&self, node: NodeId) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, Step::Remove { node: removed, .. } if *removed == node))
    }

    // Whether `node` leaves the tree together with the created node `leaving`
    fn carried_off(&self, tree: &DocumentTree, leaving: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current != leaving {
            if self.reinserts(current) {
                return false;
            }
            match tree.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        true
    }

    /// Discard a partially applied splice, restoring the tree
    pub fn rollback(self, tree: &mut DocumentTree) {
        if revert_steps(&self.steps, tree) {
            self.release(tree);
        }
    }

    /// Give the nodes this splice created back to the arena once it has been
    /// reverted for good. Nodes that are still attached are kept.
    pub fn release(self, tree: &mut DocumentTree) {
        for step in &self.steps {
            let created = match *step {
                Step::SplitText { sibling, .. } | Step::SplitElement { sibling, .. } => sibling,
                Step::Insert { node, .. } if !self.reinserts(node) => node,
                _ => continue,
            };
            if tree.exists(created) && tree.parent(created).is_none() {
                let _ = tree.release(created);
            }
        }
    }

    /// Split boundaries until the range covers a contiguous run of children
    /// of one element. Returns `(parent, start, end)` of that run.
    pub fn isolate(
        &mut self,
        tree: &mut DocumentTree,
        range: &Range,
    ) -> TreeResult<(NodeId, usize, usize)> {
        let (mut start, mut end) = range.ordered(tree)?;

        // text boundaries first, end before start
        if tree.is_text(end.node) {
            let (lifted, split) = self.lift_text(tree, end)?;
            if let Some((node, at, sibling)) = split {
                start = shift_after_split(tree, start, node, at, sibling);
            }
            end = lifted;
        }
        if tree.is_text(start.node) {
            let (lifted, split) = self.lift_text(tree, start)?;
            if let Some((node, at, sibling)) = split {
                end = shift_after_split(tree, end, node, at, sibling);
            }
            start = lifted;
        }

        let ancestor = tree
            .common_ancestor(start.node, end.node)
            .ok_or(TreeError::Detached(start.node))?;

        while end.node != ancestor {
            let (lifted, split) = self.lift_element(tree, end)?;
            if let Some((node, at, sibling)) = split {
                start = shift_after_split(tree, start, node, at, sibling);
            }
            end = lifted;
        }
        while start.node != ancestor {
            let (lifted, split) = self.lift_element(tree, start)?;
            if let Some((node, at, sibling)) = split {
                end = shift_after_split(tree, end, node, at, sibling);
            }
            start = lifted;
        }

        Ok((ancestor, start.offset, end.offset.max(start.offset)))
    }

    // Turn a point inside a text node into a point in its parent
    fn lift_text(
        &mut self,
        tree: &mut DocumentTree,
        at: Position,
    ) -> TreeResult<(Position, Option<(NodeId, usize, NodeId)>)> {
        let len = tree.node_len(at.node);
        let before = Position::before(tree, at.node).ok_or(TreeError::Detached(at.node))?;
        if at.offset == 0 {
            return Ok((before, None));
        }
        let after = Position::new(before.node, before.offset + 1);
        if at.offset >= len {
            return Ok((after, None));
        }
        let sibling = self.split_text(tree, at.node, at.offset)?;
        Ok((after, Some((at.node, at.offset, sibling))))
    }

    // Turn a point inside an element into a point in its parent
    fn lift_element(
        &mut self,
        tree: &mut DocumentTree,
        at: Position,
    ) -> TreeResult<(Position, Option<(NodeId, usize, NodeId)>)> {
        let len = tree.node_len(at.node);
        let before = Position::before(tree, at.node).ok_or(TreeError::Detached(at.node))?;
        if at.offset == 0 {
            return Ok((before, None));
        }
        let after = Position::new(before.node, before.offset + 1);
        if at.offset >= len {
            return Ok((after, None));
        }
        let sibling = self.split_element(tree, at.node, at.offset)?;
        Ok((after, Some((at.node, at.offset, sibling))))
    }
}

// A boundary point tied to a node rather than a child index, so it follows
// the node while its siblings come and go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Text(NodeId, usize),
    Before(NodeId),
    After(NodeId),
    Inside(NodeId),
}

impl Anchor {
    fn pin(tree: &DocumentTree, point: Position) -> Self {
        if tree.is_text(point.node) {
            return Anchor::Text(point.node, point.offset);
        }
        let children = tree.children(point.node);
        match children.get(point.offset) {
            Some(&child) => Anchor::Before(child),
            None if point.offset > 0 => match children.last() {
                Some(&last) => Anchor::After(last),
                None => Anchor::Inside(point.node),
            },
            None => Anchor::Inside(point.node),
        }
    }

    fn node(self) -> NodeId {
        match self {
            Anchor::Text(node, _)
            | Anchor::Before(node)
            | Anchor::After(node)
            | Anchor::Inside(node) => node,
        }
    }

    fn end_of(tree: &DocumentTree, element: NodeId) -> Self {
        match tree.children(element).last() {
            Some(&last) => Anchor::After(last),
            None => Anchor::Inside(element),
        }
    }

    // The spot `node` leaves behind in its parent
    fn gap(tree: &DocumentTree, node: NodeId) -> Self {
        let (Some(parent), Some(index)) = (tree.parent(node), tree.index_in_parent(node)) else {
            return Anchor::Inside(node);
        };
        let siblings = tree.children(parent);
        if index > 0 {
            Anchor::After(siblings[index - 1])
        } else if let Some(&next) = siblings.get(index + 1) {
            Anchor::Before(next)
        } else {
            Anchor::Inside(parent)
        }
    }

    fn resolve(self, tree: &DocumentTree) -> Option<Position> {
        match self {
            Anchor::Text(node, offset) => Some(Position::new(node, offset)),
            Anchor::Before(node) => Position::before(tree, node),
            Anchor::After(node) => Position::after(tree, node),
            Anchor::Inside(node) => Some(Position::new(node, 0)),
        }
    }
}

// Reverts in reverse order, carrying on past failures. Returns whether
// every step went back cleanly.
fn revert_steps(steps: &[Step], tree: &mut DocumentTree) -> bool {
    let mut clean = true;
    for step in steps.iter().rev() {
        if let Err(err) = step.revert(tree) {
            warn!(error = %err, ?step, "could not revert step");
            clean = false;
        }
    }
    clean
}

// Re-express `point` after `node` was split at `at` into `node` + `sibling`
fn shift_after_split(
    tree: &DocumentTree,
    point: Position,
    node: NodeId,
    at: usize,
    sibling: NodeId,
) -> Position {
    if point.node == node && point.offset >= at {
        return Position::new(sibling, point.offset - at);
    }
    if let Some(parent) = tree.parent(sibling)
        && point.node == parent
        && let Some(index) = tree.index_in_parent(sibling)
        && point.offset >= index
    {
        return Position::new(parent, point.offset + 1);
    }
    point
}
