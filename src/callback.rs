//! Observers of structural edits.

use crate::chain::SegmentChain;
use crate::index::{IndexRange, ReIndexMap};

/// Notified around every structural operation of a `SegmentChain`.
///
/// The observer is passed explicitly into each operation, so exactly one is
/// active at a time. Every hook sees the chain in a consistent state:
/// `pre_*` hooks before the change, the others after it.
pub trait MutationCallback<N> {
    /// `range` is about to be removed. Its elements are still readable.
    fn pre_remove(&mut self, chain: &SegmentChain<N>, range: IndexRange) {
        let _ = (chain, range);
    }

    /// `range` was just inserted by a rebuild.
    fn built(&mut self, chain: &SegmentChain<N>, range: IndexRange) {
        let _ = (chain, range);
    }

    /// A cut moved `map.old` to `map.new_base`.
    fn re_indexed(&mut self, chain: &SegmentChain<N>, map: &ReIndexMap) {
        let _ = (chain, map);
    }

    /// Segments covering `range` are about to get new ranks, changing the
    /// order keys of their elements (never their relative order).
    fn pre_resort(&mut self, chain: &SegmentChain<N>, range: IndexRange) {
        let _ = (chain, range);
    }

    /// Ranks were reassigned; cached order keys must be re-read.
    fn post_resort(&mut self, chain: &SegmentChain<N>) {
        let _ = chain;
    }
}

/// The null observer.
impl<N> MutationCallback<N> for () {}

/// Records every notification; useful to assert on what an edit reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationLog {
    pub events: Vec<MutationEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationEvent {
    PreRemove(IndexRange),
    Built(IndexRange),
    ReIndexed(ReIndexMap),
    PreResort(IndexRange),
    PostResort,
}

impl MutationLog {
    pub fn new() -> MutationLog {
        return MutationLog::default();
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn count(&self, matches: impl Fn(&MutationEvent) -> bool) -> usize {
        return self.events.iter().filter(|e| matches(e)).count();
    }
}

impl<N> MutationCallback<N> for MutationLog {
    fn pre_remove(&mut self, _chain: &SegmentChain<N>, range: IndexRange) {
        self.events.push(MutationEvent::PreRemove(range));
    }

    fn built(&mut self, _chain: &SegmentChain<N>, range: IndexRange) {
        self.events.push(MutationEvent::Built(range));
    }

    fn re_indexed(&mut self, _chain: &SegmentChain<N>, map: &ReIndexMap) {
        self.events.push(MutationEvent::ReIndexed(*map));
    }

    fn pre_resort(&mut self, _chain: &SegmentChain<N>, range: IndexRange) {
        self.events.push(MutationEvent::PreResort(range));
    }

    fn post_resort(&mut self, _chain: &SegmentChain<N>) {
        self.events.push(MutationEvent::PostResort);
    }
}
