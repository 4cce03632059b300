//! Segments: the contiguous blocks the sequence is stored in.
//!
//! A segment only ever grows at its end. Removal either truncates the end or
//! advances `logical_start` over a prefix, leaving cleared husks below it, so
//! no element is ever moved within a segment and every live element keeps
//! its offset until a cut moves it to another segment.

use crate::element::Element;
use crate::index::{OrderKey, SegmentId, SequenceIndex};

/// A run of the flattened sequence.
#[derive(Clone, Debug)]
pub struct Segment<N> {
    pub(crate) elements: Vec<Element<N>>,
    pub(crate) logical_start: u16,
    pub(crate) prev: Option<SegmentId>,
    pub(crate) next: Option<SegmentId>,
    pub(crate) rank: u32,
    /// Sorted offsets of live elements flagged `HAS_ATTRIBUTES`.
    pub(crate) attributes: Vec<u16>,
}

impl<N: Copy> Segment<N> {
    pub(crate) fn new(rank: u32, capacity: u16) -> Segment<N> {
        return Segment {
            elements: Vec::with_capacity(capacity as usize),
            logical_start: 0,
            prev: None,
            next: None,
            rank,
            attributes: Vec::new(),
        };
    }

    /// Number of slots, husks included. Offsets of new elements start here.
    #[inline]
    pub fn len(&self) -> usize {
        return self.elements.len();
    }

    /// Number of live elements.
    #[inline]
    pub fn live_len(&self) -> usize {
        return self.elements.len() - self.logical_start as usize;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.logical_start as usize == self.elements.len();
    }

    #[inline]
    pub(crate) fn is_full(&self, capacity: u16) -> bool {
        return self.elements.len() >= capacity as usize;
    }

    #[inline]
    pub fn logical_start(&self) -> u16 {
        return self.logical_start;
    }

    #[inline]
    pub fn rank(&self) -> u32 {
        return self.rank;
    }

    #[inline]
    pub fn prev(&self) -> Option<SegmentId> {
        return self.prev;
    }

    #[inline]
    pub fn next(&self) -> Option<SegmentId> {
        return self.next;
    }

    /// Offsets of attribute-flagged elements, ascending.
    #[inline]
    pub fn attributes(&self) -> &[u16] {
        return &self.attributes;
    }

    /// Offset of the last live element.
    #[inline]
    pub fn last_offset(&self) -> Option<u16> {
        if self.is_empty() {
            return None;
        }
        return Some((self.elements.len() - 1) as u16);
    }

    #[inline]
    pub fn key_of(&self, offset: u16) -> OrderKey {
        return OrderKey::new(self.rank, offset);
    }

    /// Live element at `offset`.
    #[inline]
    pub fn get(&self, offset: u16) -> Option<&Element<N>> {
        if offset < self.logical_start {
            return None;
        }
        return self.elements.get(offset as usize);
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, offset: u16) -> Option<&mut Element<N>> {
        if offset < self.logical_start {
            return None;
        }
        return self.elements.get_mut(offset as usize);
    }

    /// Live elements in order.
    pub fn elements(&self) -> &[Element<N>] {
        return &self.elements[self.logical_start as usize..];
    }

    /// Appends an element built by `make` from its new index.
    pub(crate) fn push_with(
        &mut self,
        id: SegmentId,
        make: impl FnOnce(SequenceIndex) -> Element<N>,
    ) -> SequenceIndex {
        assert!(
            self.elements.len() < u16::MAX as usize,
            "segment {id} cannot address another element"
        );
        let index = SequenceIndex::new(id, self.elements.len() as u16);
        self.elements.push(make(index));
        return index;
    }

    pub(crate) fn add_attribute(&mut self, offset: u16) {
        if let Err(pos) = self.attributes.binary_search(&offset) {
            self.attributes.insert(pos, offset);
        }
    }

    pub(crate) fn remove_attribute(&mut self, offset: u16) {
        if let Ok(pos) = self.attributes.binary_search(&offset) {
            self.attributes.remove(pos);
        }
    }

    /// Drops attribute entries with offsets in `lo..=hi`.
    pub(crate) fn purge_attributes(&mut self, lo: u16, hi: u16) {
        let start = self.attributes.partition_point(|&o| o < lo);
        let end = self.attributes.partition_point(|&o| o <= hi);
        self.attributes.drain(start..end);
    }

    /// Position in the attribute index of the first offset `>= offset`.
    #[inline]
    pub fn attribute_slot(&self, offset: u16) -> usize {
        return self.attributes.partition_point(|&o| o < offset);
    }
}
