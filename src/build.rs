//! Flattening a widget tree into the chain, and rebuilding parts of it.

use std::fmt::Debug;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::callback::MutationCallback;
use crate::chain::SegmentChain;
use crate::element::{Element, ElementFlags};
use crate::error::ListError;
use crate::index::{IndexRange, SequenceIndex};
use crate::tree::WidgetTree;

/// What a `rebuild_subtree` call changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Elements removed, the node's own element included when it went away.
    pub removed: usize,
    /// Elements inserted.
    pub built: usize,
    /// Leading children whose subtrees were left in place.
    pub kept_children: usize,
}

impl RebuildOutcome {
    /// True when the rebuild touched no structure.
    pub fn is_unchanged(&self) -> bool {
        return self.removed == 0 && self.built == 0;
    }
}

impl<N: Copy + Eq + Debug> SegmentChain<N> {
    /// Replaces the chain's content with the pre-order flattening of `root`.
    ///
    /// Returns the root's index, or `INVALID` when the root is not present.
    pub fn build_from<T>(&mut self, tree: &mut T, root: N) -> SequenceIndex
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        self.clear();
        if !tree.should_be_present(root) {
            return SequenceIndex::INVALID;
        }
        let (index, _) = self.build_node(
            tree,
            SequenceIndex::INVALID,
            SequenceIndex::INVALID,
            root,
            false,
            &mut (),
        );
        debug!(
            elements = self.len(),
            segments = self.segment_count(),
            generation = self.generation(),
            "built chain"
        );
        return index;
    }

    /// Brings the element of `node` and its children in line with the tree.
    pub fn rebuild_subtree<T>(
        &mut self,
        tree: &mut T,
        node: N,
        callback: &mut dyn MutationCallback<N>,
    ) -> Result<RebuildOutcome, ListError>
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let index = self.resolve(tree, node)?;
        let mut outcome = RebuildOutcome::default();

        if !tree.should_be_present(node) {
            let range = self.subtree_range(index);
            outcome.removed = self.remove_range(tree, range, callback);
            trace!(?node, removed = outcome.removed, "rebuild removed node");
            return Ok(outcome);
        }

        let collapsed = self.ancestors_collapsed(index);
        self.refresh_element(tree, index, node, collapsed);

        if !tree.should_recurse_into(node) {
            let leaf = self.element(index).leaf_most;
            if leaf != index {
                if let Some(first) = self.next_index(index) {
                    outcome.removed = self.remove_range(tree, IndexRange::new(first, leaf), callback);
                }
            }
            return Ok(outcome);
        }

        let old = self.children_of(index);
        let new = Self::present_children(&*tree, node);
        let kept = old
            .iter()
            .zip(new.iter())
            .take_while(|&(&element, &child)| self.element(element).node == Some(child))
            .count();
        outcome.kept_children = kept;

        if kept < old.len() {
            let leaf = self.element(index).leaf_most;
            outcome.removed = self.remove_range(tree, IndexRange::new(old[kept], leaf), callback);
        }
        if kept == new.len() {
            if !outcome.is_unchanged() {
                trace!(?node, removed = outcome.removed, "rebuild dropped children");
            }
            return Ok(outcome);
        }

        let after = self.element(index).leaf_most;
        let collapsed = collapsed || self.element(index).visibility.is_collapsed();
        let before = self.len();
        let mut last = after;
        let mut first_built = SequenceIndex::INVALID;
        for &child in &new[kept..] {
            let (child_index, child_leaf) = self.build_node(tree, last, index, child, collapsed, callback);
            if !first_built.is_valid() {
                first_built = child_index;
            }
            last = child_leaf;
        }
        outcome.built = self.len() - before;

        let mut cursor = first_built;
        while cursor.is_valid() {
            self.element_mut(cursor).flags |= ElementFlags::DEBUG_REBUILT;
            if cursor == last {
                break;
            }
            cursor = self.next_index(cursor).unwrap_or(SequenceIndex::INVALID);
        }

        let mut ancestor = index;
        while ancestor.is_valid() && self.element(ancestor).leaf_most == after {
            self.element_mut(ancestor).leaf_most = last;
            ancestor = self.element(ancestor).parent;
        }

        trace!(
            ?node,
            kept,
            removed = outcome.removed,
            built = outcome.built,
            "rebuilt subtree"
        );
        callback.built(self, IndexRange::new(first_built, last));
        return Ok(outcome);
    }

    /// Re-reads a node's visibility, volatility and attribute flag.
    pub fn refresh_node<T>(&mut self, tree: &mut T, node: N) -> Result<SequenceIndex, ListError>
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let index = self.resolve(tree, node)?;
        let collapsed = self.ancestors_collapsed(index);
        self.refresh_element(tree, index, node, collapsed);
        return Ok(index);
    }

    /// Whether any ancestor of `index` is collapsed.
    pub fn ancestors_collapsed(&self, index: SequenceIndex) -> bool {
        let mut ancestor = self.element(index).parent;
        while ancestor.is_valid() {
            let element = self.element(ancestor);
            if element.visibility.is_collapsed() {
                return true;
            }
            ancestor = element.parent;
        }
        return false;
    }

    fn present_children<T>(tree: &T, node: N) -> SmallVec<[N; 16]>
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        return tree
            .children(node)
            .iter()
            .copied()
            .filter(|&child| tree.should_be_present(child))
            .collect();
    }

    /// Inserts `node` and its subtree right after `after`.
    ///
    /// Returns the new element and the last element of its subtree.
    fn build_node<T>(
        &mut self,
        tree: &mut T,
        after: SequenceIndex,
        parent: SequenceIndex,
        node: N,
        collapsed: bool,
        callback: &mut dyn MutationCallback<N>,
    ) -> (SequenceIndex, SequenceIndex)
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let index = self.insert_after(tree, after, parent, node, callback);
        self.refresh_element(tree, index, node, collapsed);

        let mut leaf = index;
        if tree.should_recurse_into(node) {
            let children = Self::present_children(&*tree, node);
            let collapsed = collapsed || self.element(index).visibility.is_collapsed();
            for child in children {
                let (_, child_leaf) = self.build_node(tree, leaf, index, child, collapsed, callback);
                leaf = child_leaf;
            }
            self.element_mut(index).leaf_most = leaf;
        }
        return (index, leaf);
    }

    /// Places a fresh element directly after `after`, or at the end of an
    /// empty chain.
    fn insert_after<T>(
        &mut self,
        tree: &mut T,
        after: SequenceIndex,
        parent: SequenceIndex,
        node: N,
        callback: &mut dyn MutationCallback<N>,
    ) -> SequenceIndex
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let segment = if !after.is_valid() {
            self.append_segment(tree, callback)
        } else {
            if self.seg(after.segment).last_offset() != Some(after.offset) {
                self.cut_at(tree, after, callback);
            }
            let id = after.segment;
            if !self.seg(id).is_full(self.config.segment_capacity) {
                id
            } else if self.last_segment() == Some(id) {
                self.append_segment(tree, callback)
            } else {
                self.insert_segment_after(tree, id, callback)
            }
        };
        let index = self
            .seg_mut(segment)
            .push_with(segment, |index| Element::new(index, parent, node));
        self.len += 1;
        self.stats.built_elements += 1;
        return index;
    }

    /// Copies node state into the element and hands the node its handle.
    fn refresh_element<T>(&mut self, tree: &mut T, index: SequenceIndex, node: N, collapsed: bool)
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let has_attributes = tree.has_dynamic_attributes(node);
        if has_attributes {
            tree.evaluate_attributes(node, collapsed);
        }
        let visibility = tree.visibility(node);
        let volatile = tree.is_volatile(node);

        let element = self.element_mut(index);
        element.visibility = visibility;
        element.flags.set(ElementFlags::VOLATILE, volatile);
        element.flags.set(ElementFlags::HAS_ATTRIBUTES, has_attributes);
        let segment = self.seg_mut(index.segment);
        if has_attributes {
            segment.add_attribute(index.offset);
        } else {
            segment.remove_attribute(index.offset);
        }
        self.issue_handle(tree, index);
    }
}
