//! Addresses into the flattened sequence.
//!
//! A `SequenceIndex` names a slot: which segment, and where inside it. It says
//! nothing about order. Segment ids are handed out in allocation order and
//! recycled, so two indexes are only comparable through their `OrderKey`,
//! which the chain derives from the owning segment's rank.

use std::fmt;

/// Identifier of a segment in the chain's arena.
pub type SegmentId = u16;

/// Number of low bits of an `OrderKey` reserved for the in-segment offset.
pub const OFFSET_BITS: u32 = 10;

/// Largest number of slots a segment may address without its offsets
/// spilling into the rank bits of the packed key.
pub const MAX_SEGMENT_CAPACITY: u16 = 1 << OFFSET_BITS;

/// Address of one element: `(segment, offset)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SequenceIndex {
    pub segment: SegmentId,
    pub offset: u16,
}

impl SequenceIndex {
    /// Reserved "no element" address.
    pub const INVALID: SequenceIndex = SequenceIndex {
        segment: u16::MAX,
        offset: u16::MAX,
    };

    pub const fn new(segment: SegmentId, offset: u16) -> SequenceIndex {
        return SequenceIndex { segment, offset };
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        return self.segment != u16::MAX;
    }
}

impl Default for SequenceIndex {
    fn default() -> Self {
        return SequenceIndex::INVALID;
    }
}

impl fmt::Display for SequenceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "[invalid]");
        }
        return write!(f, "[{}:{}]", self.segment, self.offset);
    }
}

/// Sequence-order label of an element.
///
/// Packs the segment rank into the high bits and the offset into the low
/// `OFFSET_BITS`, so plain integer comparison reproduces sequence order as
/// long as segment ranks strictly increase along the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OrderKey {
    pub rank: u32,
}

impl OrderKey {
    pub const fn new(segment_rank: u32, offset: u16) -> OrderKey {
        return OrderKey {
            rank: (segment_rank << OFFSET_BITS).wrapping_add(offset as u32),
        };
    }

    /// Rank of the segment this key was derived from.
    #[inline]
    pub const fn segment_rank(&self) -> u32 {
        return self.rank >> OFFSET_BITS;
    }

    #[inline]
    pub const fn offset(&self) -> u16 {
        return (self.rank & ((1 << OFFSET_BITS) - 1)) as u16;
    }

    /// The packed form handed to callers for sorting.
    #[inline]
    pub const fn packed(&self) -> u32 {
        return self.rank;
    }
}

/// An inclusive `[min, max]` range of sequence indexes.
///
/// Containment has to be asked of the chain (see
/// `SegmentChain::range_contains`), since raw indexes are unordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub min: SequenceIndex,
    pub max: SequenceIndex,
}

impl IndexRange {
    pub const fn new(min: SequenceIndex, max: SequenceIndex) -> IndexRange {
        return IndexRange { min, max };
    }

    pub const fn single(index: SequenceIndex) -> IndexRange {
        return IndexRange { min: index, max: index };
    }

    pub const fn is_valid(&self) -> bool {
        return self.min.is_valid() && self.max.is_valid();
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}..={}", self.min, self.max);
    }
}

/// Translation produced by a segment cut: every index inside `old` (which
/// always lies in one segment) moved to `new_base` plus its distance from
/// `old.min`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReIndexMap {
    pub old: IndexRange,
    pub new_base: SequenceIndex,
}

impl ReIndexMap {
    #[inline]
    pub fn contains(&self, index: SequenceIndex) -> bool {
        return index.segment == self.old.min.segment
            && index.offset >= self.old.min.offset
            && index.offset <= self.old.max.offset;
    }

    /// Maps `index` through the cut, leaving indexes outside `old` untouched.
    #[inline]
    pub fn translate(&self, index: SequenceIndex) -> SequenceIndex {
        if !self.contains(index) {
            return index;
        }
        return SequenceIndex {
            segment: self.new_base.segment,
            offset: self.new_base.offset + (index.offset - self.old.min.offset),
        };
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        return (self.old.max.offset - self.old.min.offset) as usize + 1;
    }

    pub fn is_empty(&self) -> bool {
        return !self.old.is_valid() || self.old.max.offset < self.old.min.offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_index() {
        assert!(!SequenceIndex::INVALID.is_valid());
        assert!(SequenceIndex::new(0, 0).is_valid());
        assert_eq!(SequenceIndex::default(), SequenceIndex::INVALID);
        assert_eq!(format!("{}", SequenceIndex::new(3, 7)), "[3:7]");
    }

    #[test]
    fn key_packs_rank_above_offset() {
        let key = OrderKey::new(5, 1023);
        assert_eq!(key.segment_rank(), 5);
        assert_eq!(key.offset(), 1023);
        assert!(key < OrderKey::new(6, 0));
        assert!(OrderKey::new(6, 0) < OrderKey::new(6, 1));
    }

    #[test]
    fn key_fits_ceiling() {
        let key = OrderKey::new((1 << 22) - 1, MAX_SEGMENT_CAPACITY - 1);
        assert_eq!(key.packed(), u32::MAX);
    }

    #[test]
    fn reindex_translates_only_moved_slots() {
        let map = ReIndexMap {
            old: IndexRange::new(SequenceIndex::new(2, 10), SequenceIndex::new(2, 19)),
            new_base: SequenceIndex::new(7, 0),
        };
        assert_eq!(map.len(), 10);
        assert_eq!(map.translate(SequenceIndex::new(2, 10)), SequenceIndex::new(7, 0));
        assert_eq!(map.translate(SequenceIndex::new(2, 19)), SequenceIndex::new(7, 9));
        assert_eq!(map.translate(SequenceIndex::new(2, 9)), SequenceIndex::new(2, 9));
        assert_eq!(map.translate(SequenceIndex::new(3, 12)), SequenceIndex::new(3, 12));
        assert_eq!(map.translate(SequenceIndex::INVALID), SequenceIndex::INVALID);
    }

    #[test]
    fn reindex_over_invalid_range_is_empty() {
        let map = ReIndexMap {
            old: IndexRange::new(SequenceIndex::INVALID, SequenceIndex::INVALID),
            new_base: SequenceIndex::new(1, 0),
        };
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        let reversed = ReIndexMap {
            old: IndexRange::new(SequenceIndex::new(2, 5), SequenceIndex::new(2, 4)),
            new_base: SequenceIndex::new(1, 0),
        };
        assert!(reversed.is_empty());
        assert!(!ReIndexMap {
            old: IndexRange::new(SequenceIndex::new(2, 4), SequenceIndex::new(2, 4)),
            new_base: SequenceIndex::new(1, 0),
        }
        .is_empty());
    }
}
