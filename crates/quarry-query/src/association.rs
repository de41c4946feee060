//! Bidirectional association bookkeeping without object cycles.
//!
//! A many-to-one association (`Member.team`) and its inverse collection
//! (`Team.members`) are kept as two directional maps. [`AssociationIndex::link`]
//! is the only mutator, so both directions always agree.

use std::collections::HashMap;

/// Forward (`child -> parent`) and inverse (`parent -> [children]`) maps.
#[derive(Debug, Default, Clone)]
pub struct AssociationIndex {
    parent_of: HashMap<i64, i64>,
    children_of: HashMap<i64, Vec<i64>>,
}

impl AssociationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `child` at `parent` (or detach it with `None`).
    ///
    /// Children keep the order in which they were linked.
    pub fn link(&mut self, child: i64, parent: Option<i64>) {
        if let Some(previous) = self.parent_of.remove(&child) {
            if let Some(children) = self.children_of.get_mut(&previous) {
                children.retain(|c| *c != child);
                if children.is_empty() {
                    self.children_of.remove(&previous);
                }
            }
        }

        if let Some(parent) = parent {
            self.parent_of.insert(child, parent);
            self.children_of.entry(parent).or_default().push(child);
        }
    }

    pub fn parent_of(&self, child: i64) -> Option<i64> {
        self.parent_of.get(&child).copied()
    }

    pub fn children_of(&self, parent: i64) -> &[i64] {
        self.children_of
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.parent_of.clear();
        self.children_of.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.parent_of.is_empty()
    }
}
