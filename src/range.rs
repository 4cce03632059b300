//! Removing ranges and cutting segments.

use std::fmt::Debug;

use smallvec::SmallVec;
use tracing::trace;

use crate::callback::MutationCallback;
use crate::chain::SegmentChain;
use crate::element::ElementFlags;
use crate::index::{IndexRange, OrderKey, ReIndexMap, SegmentId, SequenceIndex};
use crate::tree::WidgetTree;

impl<N: Copy + Eq + Debug> SegmentChain<N> {
    /// Removes a subtree, or a run of sibling subtrees, and withdraws the
    /// handles of every node in it. Returns the number of elements removed.
    pub fn remove_range<T>(
        &mut self,
        tree: &mut T,
        range: IndexRange,
        callback: &mut dyn MutationCallback<N>,
    ) -> usize
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        assert!(range.is_valid(), "cannot remove invalid range {range}");
        assert!(
            self.key(range.min) <= self.key(range.max),
            "range {range} is reversed"
        );
        let parent = self.element(range.min).parent;
        if parent.is_valid() {
            let parent_leaf = self.element(parent).leaf_most;
            assert!(
                self.key(range.max) <= self.key(parent_leaf),
                "range {range} escapes its parent {parent}"
            );
        }

        callback.pre_remove(self, range);

        let segment = self.seg(range.max.segment);
        let tail = segment.len() - 1 - range.max.offset as usize;
        let covered_from = if range.min.segment == range.max.segment {
            range.min.offset
        } else {
            segment.logical_start
        };
        if tail > 0
            && (tail < self.config.cut_threshold as usize || covered_from != segment.logical_start)
        {
            self.cut_at(tree, range.max, callback);
        }

        // Ancestors ending inside the range now end right before it.
        let (min_key, max_key) = (self.key(range.min), self.key(range.max));
        let before = self.prev_index(range.min).unwrap_or(SequenceIndex::INVALID);
        let mut ancestor = parent;
        while ancestor.is_valid() {
            let leaf_key = self.key(self.element(ancestor).leaf_most);
            if leaf_key < min_key || leaf_key > max_key {
                break;
            }
            self.element_mut(ancestor).leaf_most = before;
            ancestor = self.element(ancestor).parent;
        }

        let mut removed = 0;
        let mut id = range.min.segment;
        loop {
            let segment = self.seg(id);
            let next = segment.next;
            let last = id == range.max.segment;
            let lo = if id == range.min.segment {
                range.min.offset
            } else {
                segment.logical_start
            };
            let hi = if last {
                range.max.offset
            } else {
                match segment.last_offset() {
                    Some(offset) => offset,
                    None => panic!("empty segment {id} linked into the chain"),
                }
            };
            removed += self.clear_slots(tree, id, lo, hi);

            let segment = self.seg_mut(id);
            let from_start = lo == segment.logical_start;
            let to_end = hi as usize + 1 == segment.len();
            match (from_start, to_end) {
                (true, true) => {
                    segment.logical_start = segment.len() as u16;
                    self.remove_segment(id);
                }
                (true, false) => segment.logical_start = hi + 1,
                (false, true) => {
                    segment.elements.truncate(lo as usize);
                    self.retire_tail(tree, id);
                }
                (false, false) => panic!("removing {range} would leave a hole in segment {id}"),
            }

            if last {
                break;
            }
            id = match next {
                Some(next) => next,
                None => panic!("range {range} runs past the end of the chain"),
            };
        }

        self.len -= removed;
        self.stats.removed_elements += removed as u64;
        trace!(%range, removed, "removed range");
        return removed;
    }

    fn clear_slots<T>(&mut self, tree: &mut T, id: SegmentId, lo: u16, hi: u16) -> usize
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let segment = self.seg_mut(id);
        for offset in lo..=hi {
            if let Some(node) = segment.elements[offset as usize].clear() {
                tree.set_handle(node, None);
            }
        }
        segment.purge_attributes(lo, hi);
        return (hi - lo) as usize + 1;
    }

    /// Moves everything after `index` in its segment into a new segment
    /// spliced right behind it.
    ///
    /// Returns `None` when `index` already ends its segment.
    pub fn cut_at<T>(
        &mut self,
        tree: &mut T,
        index: SequenceIndex,
        callback: &mut dyn MutationCallback<N>,
    ) -> Option<ReIndexMap>
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        assert!(self.get(index).is_some(), "cannot cut at {index}: no live element");
        let last = self.seg(index.segment).last_offset()?;
        if index.offset == last {
            return None;
        }

        let new = self.insert_segment_after(tree, index.segment, callback);
        let map = ReIndexMap {
            old: IndexRange::new(
                SequenceIndex::new(index.segment, index.offset + 1),
                SequenceIndex::new(index.segment, last),
            ),
            new_base: SequenceIndex::new(new, 0),
        };

        let source = self.seg_mut(index.segment);
        let split = source.attribute_slot(map.old.min.offset);
        let attributes: Vec<u16> = source
            .attributes
            .drain(split..)
            .map(|offset| offset - map.old.min.offset)
            .collect();
        let moved: Vec<_> = source.elements.drain(map.old.min.offset as usize..).collect();
        self.retire_tail(tree, index.segment);

        let target = self.seg_mut(new);
        target.attributes = attributes;
        for mut element in moved {
            element.index = map.translate(element.index);
            element.parent = map.translate(element.parent);
            element.leaf_most = map.translate(element.leaf_most);
            element.flags |= ElementFlags::DEBUG_MOVED;
            target.elements.push(element);
        }

        // Moved subtrees that continue past the new segment, and moved
        // elements whose ancestors stay behind.
        let mut reach: Option<OrderKey> = None;
        let mut outer: SmallVec<[SequenceIndex; 8]> = SmallVec::new();
        for element in self.seg(new).elements() {
            if element.leaf_most.segment != new {
                let key = self.key(element.leaf_most);
                reach = Some(reach.map_or(key, |reach| reach.max(key)));
            }
            if element.parent.is_valid() && element.parent.segment != new {
                outer.push(element.parent);
            }
        }

        if let Some(reach) = reach {
            let mut cursor = self.next_index(SequenceIndex::new(new, map.len() as u16 - 1));
            while let Some(index) = cursor {
                if self.key(index) > reach {
                    break;
                }
                let element = self.element_mut(index);
                element.parent = map.translate(element.parent);
                cursor = self.next_index(index);
            }
        }

        for mut ancestor in outer {
            while ancestor.is_valid() {
                let element = self.element_mut(ancestor);
                if !map.contains(element.leaf_most) {
                    break;
                }
                element.leaf_most = map.translate(element.leaf_most);
                ancestor = element.parent;
            }
        }

        for offset in 0..map.len() as u16 {
            self.issue_handle(tree, SequenceIndex::new(new, offset));
        }
        self.stats.cuts += 1;
        trace!(at = %index, moved = map.len(), segment = new, "cut segment");
        callback.re_indexed(self, &map);
        return Some(map);
    }
}
