//! Error types.
//!
//! Only conditions a caller can act on are errors. Broken invariants inside
//! the chain panic instead, because every later traversal would read
//! corrupted links.

use thiserror::Error;

use crate::index::SequenceIndex;

/// The chain ran out of address space and kept going in degraded mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    /// No segment id was left; the last segment was reused past its capacity.
    #[error("segment id space exhausted ({limit} segments)")]
    SegmentIdsExhausted { limit: usize },

    /// Ranks could not be spaced below the ceiling; some exceed it.
    #[error("rank space exhausted: {segments} segments under a ceiling of {ceiling}")]
    RankSpaceExhausted { segments: usize, ceiling: u32 },
}

/// A `ListConfig` that cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("segment capacity {capacity} must be in 1..={max}")]
    SegmentCapacity { capacity: u16, max: u16 },

    #[error("rank ceiling {ceiling} must be in 1..={max}")]
    RankCeiling { ceiling: u32, max: u32 },

    #[error("rank padding {padding} must be at least 2 and below the ceiling {ceiling}")]
    RankPadding { padding: u32, ceiling: u32 },

    #[error("max segments {0} must be in 1..65535")]
    MaxSegments(u16),
}

/// Recoverable failures of the public operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The node carries no handle into this chain.
    #[error("node is not in the list")]
    NotInList,

    /// The node's handle was issued by an earlier build of the chain.
    #[error("stale handle: issued at generation {handle}, chain is at {current}")]
    StaleHandle { handle: u32, current: u32 },

    /// The slot the handle names was removed after the handle was issued.
    #[error("handle names retired slot {index}")]
    RetiredSlot { index: SequenceIndex },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
