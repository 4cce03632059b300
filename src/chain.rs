//! The segment chain: an arena of segments linked in sequence order.
//!
//! Segments are addressed by stable `u16` ids and never move once allocated;
//! splicing only rewrites `prev`/`next`. Each segment carries a rank, and
//! ranks strictly increase along the chain, so an element's `OrderKey` is
//! just its segment's rank with the offset appended.
//!
//! Keeping ranks increasing under splices is the list-labeling problem. A
//! splice takes the midpoint between its neighbours; when there is no room,
//! `rebalance_ranks` grows a window forward from the new segment until the
//! span it covers is sparse enough, then spreads the window evenly over it:
//!
//! ```text
//!   rank:   100   101   [new]   102   140          600
//!   window:             +-----+-----+----+
//!   after:  100   [130] [160] [190] [220]  ...   600
//! ```
//!
//! Windows that reach the tail are spaced by `rank_padding`; if that would
//! pass the ceiling, everything is relabeled at once.

use std::cmp::Ordering;
use std::fmt::Debug;

use smallvec::SmallVec;
use tracing::{debug, error, warn};

use crate::callback::MutationCallback;
use crate::config::ListConfig;
use crate::element::{Element, NodeHandle};
use crate::error::{CapacityError, ConfigError, ListError};
use crate::index::{IndexRange, OrderKey, SegmentId, SequenceIndex};
use crate::segment::Segment;
use crate::tree::WidgetTree;

/// Counters describing the work a chain has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub segments_allocated: u64,
    pub cuts: u64,
    /// Segments whose rank was reassigned, global relabels included.
    pub relabeled_segments: u64,
    pub global_relabels: u64,
    pub built_elements: u64,
    pub removed_elements: u64,
}

/// A flattened pre-order sequence stored as a linked chain of segments.
#[derive(Clone, Debug)]
pub struct SegmentChain<N> {
    pub(crate) config: ListConfig,
    pub(crate) segments: Vec<Option<Segment<N>>>,
    free: Vec<SegmentId>,
    /// Per segment id. Bumped whenever an offset of that id may next hold a
    /// different node, so handles naming the old occupant stop matching.
    epochs: Vec<u32>,
    first: Option<SegmentId>,
    last: Option<SegmentId>,
    live_segments: usize,
    pub(crate) len: usize,
    pub(crate) generation: u32,
    pub(crate) stats: ChainStats,
    pub(crate) capacity_error: Option<CapacityError>,
}

/// Minimum average rank gap a window of `n` segments must leave.
#[inline]
fn required_gap(n: i64) -> i64 {
    return 2 + n / 2;
}

impl<N: Copy + Eq + Debug> Default for SegmentChain<N> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<N: Copy + Eq + Debug> SegmentChain<N> {
    /// An empty chain with the default configuration.
    pub fn new() -> SegmentChain<N> {
        return Self::from_config(ListConfig::default());
    }

    /// An empty chain, rejecting configurations that cannot work.
    pub fn with_config(config: ListConfig) -> Result<SegmentChain<N>, ConfigError> {
        config.validate()?;
        return Ok(Self::from_config(config));
    }

    fn from_config(config: ListConfig) -> SegmentChain<N> {
        return SegmentChain {
            config,
            segments: Vec::new(),
            free: Vec::new(),
            epochs: Vec::new(),
            first: None,
            last: None,
            live_segments: 0,
            len: 0,
            generation: 0,
            stats: ChainStats::default(),
            capacity_error: None,
        };
    }

    pub fn config(&self) -> &ListConfig {
        return &self.config;
    }

    /// Bumped by every `clear`; handles from older generations are stale.
    pub fn generation(&self) -> u32 {
        return self.generation;
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        return self.len;
    }

    pub fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    /// Number of linked segments.
    pub fn segment_count(&self) -> usize {
        return self.live_segments;
    }

    pub fn stats(&self) -> &ChainStats {
        return &self.stats;
    }

    /// Returns and clears the last degraded-mode signal.
    pub fn take_capacity_error(&mut self) -> Option<CapacityError> {
        return self.capacity_error.take();
    }

    pub fn first_segment(&self) -> Option<SegmentId> {
        return self.first;
    }

    pub fn last_segment(&self) -> Option<SegmentId> {
        return self.last;
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment<N>> {
        return self.segments.get(id as usize)?.as_ref();
    }

    pub(crate) fn seg(&self, id: SegmentId) -> &Segment<N> {
        match self.segment(id) {
            Some(segment) => return segment,
            None => panic!("segment {id} is not allocated"),
        }
    }

    pub(crate) fn seg_mut(&mut self, id: SegmentId) -> &mut Segment<N> {
        match self.segments.get_mut(id as usize) {
            Some(Some(segment)) => return segment,
            _ => panic!("segment {id} is not allocated"),
        }
    }

    /// Segments in chain order.
    pub fn segments(&self) -> Segments<'_, N> {
        return Segments {
            chain: self,
            next: self.first,
        };
    }

    /// Live elements in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Element<N>> + '_ {
        return self.segments().flat_map(|(_, segment)| segment.elements().iter());
    }

    pub fn get(&self, index: SequenceIndex) -> Option<&Element<N>> {
        if !index.is_valid() {
            return None;
        }
        return self.segment(index.segment)?.get(index.offset);
    }

    pub(crate) fn element(&self, index: SequenceIndex) -> &Element<N> {
        match self.get(index) {
            Some(element) => return element,
            None => panic!("no live element at {index}"),
        }
    }

    pub(crate) fn element_mut(&mut self, index: SequenceIndex) -> &mut Element<N> {
        match self.seg_mut(index.segment).get_mut(index.offset) {
            Some(element) => return element,
            None => panic!("no live element at {index}"),
        }
    }

    pub fn order_key(&self, index: SequenceIndex) -> Option<OrderKey> {
        let _ = self.get(index)?;
        return Some(self.seg(index.segment).key_of(index.offset));
    }

    pub(crate) fn key(&self, index: SequenceIndex) -> OrderKey {
        match self.order_key(index) {
            Some(key) => return key,
            None => panic!("no live element at {index}"),
        }
    }

    /// Sequence order of two live elements.
    pub fn compare(&self, a: SequenceIndex, b: SequenceIndex) -> Ordering {
        return self.key(a).cmp(&self.key(b));
    }

    /// Whether the live element at `index` lies inside `range`.
    pub fn range_contains(&self, range: IndexRange, index: SequenceIndex) -> bool {
        let (Some(key), Some(min), Some(max)) = (
            self.order_key(index),
            self.order_key(range.min),
            self.order_key(range.max),
        ) else {
            return false;
        };
        return min <= key && key <= max;
    }

    pub fn first_index(&self) -> Option<SequenceIndex> {
        for (id, segment) in self.segments() {
            if !segment.is_empty() {
                return Some(SequenceIndex::new(id, segment.logical_start));
            }
        }
        return None;
    }

    pub fn last_index(&self) -> Option<SequenceIndex> {
        let mut cursor = self.last;
        while let Some(id) = cursor {
            let segment = self.seg(id);
            if let Some(offset) = segment.last_offset() {
                return Some(SequenceIndex::new(id, offset));
            }
            cursor = segment.prev;
        }
        return None;
    }

    /// The element after `index` in sequence order.
    pub fn next_index(&self, index: SequenceIndex) -> Option<SequenceIndex> {
        let segment = self.segment(index.segment)?;
        if (index.offset as usize) + 1 < segment.len() {
            return Some(SequenceIndex::new(index.segment, index.offset + 1));
        }
        let mut cursor = segment.next;
        while let Some(id) = cursor {
            let segment = self.seg(id);
            if !segment.is_empty() {
                return Some(SequenceIndex::new(id, segment.logical_start));
            }
            cursor = segment.next;
        }
        return None;
    }

    /// The element before `index` in sequence order.
    pub fn prev_index(&self, index: SequenceIndex) -> Option<SequenceIndex> {
        let segment = self.segment(index.segment)?;
        if index.offset > segment.logical_start {
            return Some(SequenceIndex::new(index.segment, index.offset - 1));
        }
        let mut cursor = segment.prev;
        while let Some(id) = cursor {
            let segment = self.seg(id);
            if let Some(offset) = segment.last_offset() {
                return Some(SequenceIndex::new(id, offset));
            }
            cursor = segment.prev;
        }
        return None;
    }

    /// The whole subtree rooted at `index`.
    pub fn subtree_range(&self, index: SequenceIndex) -> IndexRange {
        return IndexRange::new(index, self.element(index).leaf_most);
    }

    /// Direct children of `index`, found by hopping over each child's subtree.
    pub fn children_of(&self, index: SequenceIndex) -> SmallVec<[SequenceIndex; 8]> {
        let mut children = SmallVec::new();
        let leaf = self.element(index).leaf_most;
        if leaf == index {
            return children;
        }
        let mut cursor = self.next_index(index);
        while let Some(child) = cursor {
            children.push(child);
            let child_leaf = self.element(child).leaf_most;
            if child_leaf == leaf {
                break;
            }
            cursor = self.next_index(child_leaf);
        }
        return children;
    }

    // =========================================================================
    // Handles
    // =========================================================================

    /// Slot epoch of segment `id`; unknown ids report 0.
    #[inline]
    pub fn epoch(&self, id: SegmentId) -> u32 {
        return self.epochs.get(id as usize).copied().unwrap_or(0);
    }

    pub fn handle_for(&self, index: SequenceIndex) -> NodeHandle {
        return NodeHandle {
            index,
            order: self.key(index),
            generation: self.generation,
            epoch: self.epoch(index.segment),
        };
    }

    /// Whether `handle` was issued by this generation, its slot has not been
    /// retired since, and the slot is live.
    pub fn is_current(&self, handle: &NodeHandle) -> bool {
        return handle.generation == self.generation
            && handle.epoch == self.epoch(handle.index.segment)
            && self.get(handle.index).is_some();
    }

    /// Finds `node` through its handle.
    pub fn resolve<T>(&self, tree: &T, node: N) -> Result<SequenceIndex, ListError>
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let handle = tree.handle(node).ok_or(ListError::NotInList)?;
        if handle.generation != self.generation {
            return Err(ListError::StaleHandle {
                handle: handle.generation,
                current: self.generation,
            });
        }
        if handle.epoch != self.epoch(handle.index.segment) {
            return Err(ListError::RetiredSlot { index: handle.index });
        }
        match self.get(handle.index) {
            Some(element) if element.node == Some(node) => return Ok(handle.index),
            other => panic!(
                "handle of {node:?} points at {} which holds {:?}",
                handle.index,
                other.and_then(|e| e.node)
            ),
        }
    }

    pub(crate) fn issue_handle<T>(&self, tree: &mut T, index: SequenceIndex)
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        if let Some(node) = self.element(index).node {
            tree.set_handle(node, Some(self.handle_for(index)));
        }
    }

    fn reissue_segment_handles<T>(&self, tree: &mut T, id: SegmentId)
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let segment = self.seg(id);
        let epoch = self.epoch(id);
        for element in segment.elements() {
            if let Some(node) = element.node {
                let handle = NodeHandle {
                    index: element.index,
                    order: segment.key_of(element.index.offset),
                    generation: self.generation,
                    epoch,
                };
                tree.set_handle(node, Some(handle));
            }
        }
    }

    // =========================================================================
    // Segment allocation and linking
    // =========================================================================

    /// Marks the end of segment `id` as dropped: offsets past its current
    /// length will be handed out again, so every handle into the segment is
    /// re-issued under a new epoch.
    pub(crate) fn retire_tail<T>(&mut self, tree: &mut T, id: SegmentId)
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        self.bump_epoch(id);
        self.reissue_segment_handles(tree, id);
    }

    fn bump_epoch(&mut self, id: SegmentId) {
        let epoch = &mut self.epochs[id as usize];
        *epoch = epoch.wrapping_add(1);
    }

    /// Drops every segment and bumps the generation.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.free.clear();
        self.epochs.clear();
        self.first = None;
        self.last = None;
        self.live_segments = 0;
        self.len = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    fn allocate_segment(&mut self, rank: u32) -> Result<SegmentId, CapacityError> {
        let segment = Segment::new(rank, self.config.segment_capacity);
        let id = if let Some(id) = self.free.pop() {
            self.segments[id as usize] = Some(segment);
            id
        } else {
            if self.segments.len() >= self.config.max_segments as usize {
                return Err(CapacityError::SegmentIdsExhausted {
                    limit: self.config.max_segments as usize,
                });
            }
            self.segments.push(Some(segment));
            self.epochs.push(0);
            (self.segments.len() - 1) as SegmentId
        };
        self.live_segments += 1;
        self.stats.segments_allocated += 1;
        return Ok(id);
    }

    fn try_push_back<T>(
        &mut self,
        tree: &mut T,
        callback: &mut dyn MutationCallback<N>,
    ) -> Result<SegmentId, CapacityError>
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let wanted = match self.last {
            Some(last) => self.seg(last).rank as u64 + self.config.rank_padding as u64,
            None => 0,
        };
        let overflow = wanted >= self.config.rank_ceiling as u64;
        let rank = if overflow { self.config.rank_ceiling - 1 } else { wanted as u32 };
        let id = self.allocate_segment(rank)?;

        self.seg_mut(id).prev = self.last;
        match self.last {
            Some(last) => self.seg_mut(last).next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);

        if overflow {
            self.rebalance_ranks(tree, id, callback);
        }
        return Ok(id);
    }

    /// Returns the last segment if it has room, else a new trailing one.
    ///
    /// Out of segment ids, the full last segment is returned anyway and the
    /// failure is recorded (`take_capacity_error`).
    pub fn append_segment<T>(
        &mut self,
        tree: &mut T,
        callback: &mut dyn MutationCallback<N>,
    ) -> SegmentId
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        if let Some(last) = self.last {
            if !self.seg(last).is_full(self.config.segment_capacity) {
                return last;
            }
        }
        match self.try_push_back(tree, callback) {
            Ok(id) => return id,
            Err(err) => {
                let Some(last) = self.last else {
                    panic!("empty chain could not allocate a segment: {err}");
                };
                error!(%err, segment = last, "reusing last segment past its capacity");
                self.capacity_error = Some(err);
                return last;
            }
        }
    }

    /// Splices a new empty segment right after `id`.
    ///
    /// Panics when segment ids are exhausted: a splice has no fallback.
    pub fn insert_segment_after<T>(
        &mut self,
        tree: &mut T,
        id: SegmentId,
        callback: &mut dyn MutationCallback<N>,
    ) -> SegmentId
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let Some(next) = self.seg(id).next else {
            match self.try_push_back(tree, callback) {
                Ok(new) => return new,
                Err(err) => panic!("cannot splice a segment after {id}: {err}"),
            }
        };

        let lo = self.seg(id).rank;
        let hi = self.seg(next).rank;
        let fits = hi.saturating_sub(lo) >= 2;
        let rank = if fits { lo + (hi - lo) / 2 } else { lo };
        let new = match self.allocate_segment(rank) {
            Ok(new) => new,
            Err(err) => panic!("cannot splice a segment after {id}: {err}"),
        };

        let segment = self.seg_mut(new);
        segment.prev = Some(id);
        segment.next = Some(next);
        self.seg_mut(id).next = Some(new);
        self.seg_mut(next).prev = Some(new);

        if !fits {
            self.rebalance_ranks(tree, new, callback);
        }
        return new;
    }

    /// Unlinks and frees an empty segment.
    pub fn remove_segment(&mut self, id: SegmentId) {
        let segment = self.seg(id);
        assert!(
            segment.is_empty(),
            "segment {id} still holds {} live elements",
            segment.live_len()
        );
        let (prev, next) = (segment.prev, segment.next);
        match prev {
            Some(prev) => self.seg_mut(prev).next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => self.seg_mut(next).prev = prev,
            None => self.last = prev,
        }
        self.segments[id as usize] = None;
        self.bump_epoch(id);
        self.free.push(id);
        self.live_segments -= 1;
    }

    // =========================================================================
    // Rank maintenance
    // =========================================================================

    /// Reassigns ranks starting at `start` until the chain has room again.
    ///
    /// Returns the number of segments relabeled.
    pub fn rebalance_ranks<T>(
        &mut self,
        tree: &mut T,
        start: SegmentId,
        callback: &mut dyn MutationCallback<N>,
    ) -> usize
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let padding = self.config.rank_padding as i64;
        let ceiling = self.config.rank_ceiling as i64;
        let lower = match self.seg(start).prev {
            Some(prev) => self.seg(prev).rank as i64,
            None => -1,
        };

        let mut window: SmallVec<[SegmentId; 16]> = SmallVec::new();
        let mut cursor = start;
        loop {
            window.push(cursor);
            let n = window.len() as i64;
            match self.seg(cursor).next {
                Some(next) => {
                    let upper = self.seg(next).rank as i64;
                    let span = upper - lower;
                    if span >= (n + 1) * required_gap(n) {
                        self.assign_ranks(
                            tree,
                            &window,
                            |k| (lower + (k as i64 + 1) * span / (n + 1)) as u32,
                            callback,
                        );
                        return window.len();
                    }
                    cursor = next;
                }
                None => {
                    if lower + n * padding < ceiling {
                        self.assign_ranks(
                            tree,
                            &window,
                            |k| (lower + (k as i64 + 1) * padding) as u32,
                            callback,
                        );
                        return window.len();
                    }
                    return self.relabel_all(tree, callback);
                }
            }
        }
    }

    /// Spaces every segment evenly over the lower half of the rank budget.
    fn relabel_all<T>(&mut self, tree: &mut T, callback: &mut dyn MutationCallback<N>) -> usize
    where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let count = self.live_segments;
        let ceiling = self.config.rank_ceiling as usize;
        let spacing = (ceiling / (2 * count.max(1))).min(self.config.rank_padding as usize);
        let spacing = if spacing == 0 {
            let err = CapacityError::RankSpaceExhausted {
                segments: count,
                ceiling: self.config.rank_ceiling,
            };
            warn!(%err, "segment ranks exceed the ceiling");
            self.capacity_error = Some(err);
            1
        } else {
            spacing
        };
        debug!(segments = count, spacing, "relabeling all segment ranks");

        let window: Vec<SegmentId> = self.segments().map(|(id, _)| id).collect();
        self.stats.global_relabels += 1;
        self.assign_ranks(
            tree,
            &window,
            |k| (k * spacing).min(u32::MAX as usize) as u32,
            callback,
        );
        return count;
    }

    fn assign_ranks<T>(
        &mut self,
        tree: &mut T,
        window: &[SegmentId],
        rank_of: impl Fn(usize) -> u32,
        callback: &mut dyn MutationCallback<N>,
    ) where
        T: WidgetTree<Node = N> + ?Sized,
    {
        let range = self.window_range(window);
        if let Some(range) = range {
            callback.pre_resort(self, range);
        }
        for (k, &id) in window.iter().enumerate() {
            self.seg_mut(id).rank = rank_of(k);
        }
        self.stats.relabeled_segments += window.len() as u64;
        for &id in window {
            self.reissue_segment_handles(tree, id);
        }
        if range.is_some() {
            callback.post_resort(self);
        }
    }

    /// Live elements covered by a run of consecutive segments.
    fn window_range(&self, window: &[SegmentId]) -> Option<IndexRange> {
        let min = window.iter().find_map(|&id| {
            let segment = self.seg(id);
            (!segment.is_empty()).then(|| SequenceIndex::new(id, segment.logical_start))
        })?;
        let max = window.iter().rev().find_map(|&id| {
            let offset = self.seg(id).last_offset()?;
            Some(SequenceIndex::new(id, offset))
        })?;
        return Some(IndexRange::new(min, max));
    }
}

/// Iterator over `(id, segment)` in chain order.
pub struct Segments<'a, N> {
    chain: &'a SegmentChain<N>,
    next: Option<SegmentId>,
}

impl<'a, N> Iterator for Segments<'a, N> {
    type Item = (SegmentId, &'a Segment<N>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let segment = self.chain.segments.get(id as usize)?.as_ref()?;
        self.next = segment.next;
        return Some((id, segment));
    }
}
