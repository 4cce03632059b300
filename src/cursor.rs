//! A cursor over attribute-flagged elements that survives structural edits.
//!
//! Attribute evaluation walks the flagged elements in sequence order, and
//! evaluating one may rebuild parts of the tree. The cursor is therefore a
//! `MutationCallback`: pass it to every edit made while it is live and it
//! keeps its place.
//!
//! # Deferred seeks
//!
//! An edit that invalidates the cursor's position doesn't move the cursor
//! right away, because the chain is still mid-edit. It records a target
//! instead, and the next `resolve` or `next` settles on the first flagged
//! element at or after it.
//!
//! ```text
//!   flagged:   B       D       F
//!   cursor:    ^
//!   remove [B..D]   -> seek to the element after D
//!   next()          -> F
//! ```
//!
//! Everything at or before the cursor counts as visited, and so does
//! freshly built content that would have been visited next.

use std::fmt::Debug;

use crate::callback::MutationCallback;
use crate::chain::SegmentChain;
use crate::index::{IndexRange, OrderKey, ReIndexMap, SequenceIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Seek {
    /// First flagged element of the chain.
    Start,
    /// First flagged element at or after the index.
    At(SequenceIndex),
    /// Nothing left.
    End,
}

/// Walks the elements that carry `HAS_ATTRIBUTES`.
#[derive(Clone, Debug)]
pub struct AttributeCursor {
    current: SequenceIndex,
    key: OrderKey,
    /// Position of `current` in its segment's attribute index. A hint only.
    slot: usize,
    pending: Option<Seek>,
}

impl Default for AttributeCursor {
    fn default() -> Self {
        return Self::new();
    }
}

impl AttributeCursor {
    /// A cursor whose first `next` lands on the first flagged element.
    pub fn new() -> AttributeCursor {
        return AttributeCursor {
            current: SequenceIndex::INVALID,
            key: OrderKey::default(),
            slot: 0,
            pending: Some(Seek::Start),
        };
    }

    /// A cursor that will settle on the first flagged element at or after `index`.
    pub fn starting_at(index: SequenceIndex) -> AttributeCursor {
        return AttributeCursor {
            pending: Some(Seek::At(index)),
            ..AttributeCursor::new()
        };
    }

    /// The settled position, if any.
    #[inline]
    pub fn current(&self) -> Option<SequenceIndex> {
        if self.pending.is_some() || !self.current.is_valid() {
            return None;
        }
        return Some(self.current);
    }

    /// Order key of the settled position, as of the last resort.
    #[inline]
    pub fn order_key(&self) -> Option<OrderKey> {
        return self.current().map(|_| self.key);
    }

    #[inline]
    pub fn has_pending_seek(&self) -> bool {
        return self.pending.is_some();
    }

    /// Resolves a pending seek, otherwise advances. Returns the new position.
    pub fn next<N: Copy + Eq + Debug>(&mut self, chain: &SegmentChain<N>) -> Option<SequenceIndex> {
        if self.pending.is_some() {
            return self.resolve(chain);
        }
        return self.advance(chain);
    }

    /// Settles a pending seek. Without one, returns the current position.
    pub fn resolve<N: Copy + Eq + Debug>(&mut self, chain: &SegmentChain<N>) -> Option<SequenceIndex> {
        let Some(seek) = self.pending.take() else {
            return self.current();
        };
        let found = match seek {
            Seek::Start => chain
                .first_index()
                .and_then(|first| Self::find_from(chain, first)),
            Seek::At(target) => Self::find_from(chain, target),
            Seek::End => None,
        };
        return self.settle(chain, found);
    }

    /// Moves to the next flagged element. No-op while a seek is pending.
    pub fn advance<N: Copy + Eq + Debug>(&mut self, chain: &SegmentChain<N>) -> Option<SequenceIndex> {
        if self.pending.is_some() || !self.current.is_valid() {
            return None;
        }
        let found = self.following(chain);
        return self.settle(chain, found);
    }

    fn settle<N: Copy + Eq + Debug>(
        &mut self,
        chain: &SegmentChain<N>,
        found: Option<(SequenceIndex, usize)>,
    ) -> Option<SequenceIndex> {
        match found {
            Some((index, slot)) => {
                self.current = index;
                self.slot = slot;
                self.key = chain.key(index);
                return Some(index);
            }
            None => {
                self.current = SequenceIndex::INVALID;
                self.slot = 0;
                return None;
            }
        }
    }

    /// The flagged element after the current one, with its slot.
    fn following<N: Copy + Eq + Debug>(&self, chain: &SegmentChain<N>) -> Option<(SequenceIndex, usize)> {
        let segment = chain.seg(self.current.segment);
        let attributes = segment.attributes();
        let slot = if attributes.get(self.slot) == Some(&self.current.offset) {
            self.slot + 1
        } else {
            // The hint went stale, or the current element lost its flag.
            let slot = segment.attribute_slot(self.current.offset);
            if attributes.get(slot) == Some(&self.current.offset) { slot + 1 } else { slot }
        };
        if let Some(&offset) = attributes.get(slot) {
            return Some((SequenceIndex::new(self.current.segment, offset), slot));
        }
        let mut cursor = segment.next();
        while let Some(id) = cursor {
            let segment = chain.seg(id);
            if let Some(&offset) = segment.attributes().first() {
                return Some((SequenceIndex::new(id, offset), 0));
            }
            cursor = segment.next();
        }
        return None;
    }

    /// First flagged element at or after `index`, with its slot.
    fn find_from<N: Copy + Eq + Debug>(
        chain: &SegmentChain<N>,
        index: SequenceIndex,
    ) -> Option<(SequenceIndex, usize)> {
        let mut id = index.segment;
        let mut from = index.offset;
        loop {
            let segment = chain.segment(id)?;
            let slot = segment.attribute_slot(from);
            if let Some(&offset) = segment.attributes().get(slot) {
                return Some((SequenceIndex::new(id, offset), slot));
            }
            id = segment.next()?;
            from = 0;
        }
    }

    fn seek_past<N: Copy + Eq + Debug>(&mut self, chain: &SegmentChain<N>, range: IndexRange) {
        self.pending = Some(match chain.next_index(range.max) {
            Some(next) => Seek::At(next),
            None => Seek::End,
        });
    }
}

impl<N: Copy + Eq + Debug> MutationCallback<N> for AttributeCursor {
    fn pre_remove(&mut self, chain: &SegmentChain<N>, range: IndexRange) {
        let position = match self.pending {
            Some(Seek::At(target)) => target,
            Some(_) => return,
            None => self.current,
        };
        if position.is_valid() && chain.range_contains(range, position) {
            self.seek_past(chain, range);
        }
    }

    fn built(&mut self, chain: &SegmentChain<N>, range: IndexRange) {
        if self.pending.is_some() || !self.current.is_valid() {
            return;
        }
        if let Some((next, _)) = self.following(chain) {
            if chain.range_contains(range, next) {
                self.seek_past(chain, range);
            }
        }
    }

    fn re_indexed(&mut self, chain: &SegmentChain<N>, map: &ReIndexMap) {
        match &mut self.pending {
            Some(Seek::At(target)) => *target = map.translate(*target),
            Some(_) => {}
            None => {
                if map.contains(self.current) {
                    self.current = map.translate(self.current);
                    self.slot = 0;
                    if let Some(key) = chain.order_key(self.current) {
                        self.key = key;
                    }
                }
            }
        }
    }

    fn post_resort(&mut self, chain: &SegmentChain<N>) {
        if self.pending.is_none() {
            if let Some(key) = chain.order_key(self.current) {
                self.key = key;
            }
        }
    }
}
