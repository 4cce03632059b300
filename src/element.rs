//! Per-node records stored in the chain.

use bitflags::bitflags;

use crate::index::{OrderKey, SequenceIndex};

bitflags! {
    /// State bits of an element.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ElementFlags: u8 {
        /// The node asks to be updated every tick.
        const VOLATILE = 1 << 0;
        /// The node has attributes that must be evaluated in sequence order.
        /// Mirrored by an entry in the segment's attribute index.
        const HAS_ATTRIBUTES = 1 << 1;
        /// Debug: inserted by an incremental rebuild rather than a full build.
        const DEBUG_REBUILT = 1 << 6;
        /// Debug: moved to another segment by a cut.
        const DEBUG_MOVED = 1 << 7;
    }
}

impl ElementFlags {
    /// Bits that describe the node rather than the element's history.
    pub const STATE: ElementFlags = ElementFlags::VOLATILE.union(ElementFlags::HAS_ATTRIBUTES);
}

/// Visibility as reported by a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Takes no space and is not painted; descendants are evaluated as collapsed.
    Collapsed,
    /// Takes space but is not painted.
    Hidden,
    /// Painted, but neither the node nor its children can be hit.
    HitTestInvisible,
    /// Painted; the node cannot be hit but its children can.
    SelfHitTestInvisible,
}

impl Visibility {
    #[inline]
    pub fn is_collapsed(&self) -> bool {
        return *self == Visibility::Collapsed;
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        return !matches!(self, Visibility::Collapsed | Visibility::Hidden);
    }
}

/// Handle given to a tree node so it can find itself in the sequence.
///
/// Only trust it while `SegmentChain::is_current` says so: `generation`
/// must match the chain's and `epoch` the slot epoch of its segment.
/// Structural edits re-issue the handles of the nodes they move, so a
/// current handle always names the node's slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub index: SequenceIndex,
    pub order: OrderKey,
    pub generation: u32,
    /// Slot epoch of `index.segment` when the handle was issued.
    pub epoch: u32,
}

/// One slot of the flattened sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element<N> {
    pub(crate) index: SequenceIndex,
    pub(crate) parent: SequenceIndex,
    pub(crate) leaf_most: SequenceIndex,
    pub(crate) node: Option<N>,
    pub(crate) visibility: Visibility,
    pub(crate) flags: ElementFlags,
}

impl<N: Copy> Element<N> {
    pub(crate) fn new(index: SequenceIndex, parent: SequenceIndex, node: N) -> Element<N> {
        return Element {
            index,
            parent,
            leaf_most: index,
            node: Some(node),
            visibility: Visibility::Visible,
            flags: ElementFlags::empty(),
        };
    }

    /// Turns the slot into a husk, returning the node it referenced.
    pub(crate) fn clear(&mut self) -> Option<N> {
        self.parent = SequenceIndex::INVALID;
        self.leaf_most = SequenceIndex::INVALID;
        self.visibility = Visibility::Visible;
        self.flags = ElementFlags::empty();
        return self.node.take();
    }

    /// Own address.
    #[inline]
    pub fn index(&self) -> SequenceIndex {
        return self.index;
    }

    /// Address of the parent element, `INVALID` for the root.
    #[inline]
    pub fn parent(&self) -> SequenceIndex {
        return self.parent;
    }

    /// Address of the last element of this element's subtree.
    #[inline]
    pub fn leaf_most(&self) -> SequenceIndex {
        return self.leaf_most;
    }

    #[inline]
    pub fn node(&self) -> Option<N> {
        return self.node;
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        return self.visibility;
    }

    #[inline]
    pub fn flags(&self) -> ElementFlags {
        return self.flags;
    }

    #[inline]
    pub fn is_volatile(&self) -> bool {
        return self.flags.contains(ElementFlags::VOLATILE);
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        return self.flags.contains(ElementFlags::HAS_ATTRIBUTES);
    }

    /// True when the element has no descendants.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        return self.leaf_most == self.index;
    }
}
