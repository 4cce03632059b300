//! Tunables for a segment chain.

use crate::error::ConfigError;
use crate::index::MAX_SEGMENT_CAPACITY;

/// Largest segment rank that still packs into a `u32` order key.
pub const MAX_RANK_CEILING: u32 = 1 << 22;

/// Configuration of a `SegmentChain`.
///
/// The defaults suit a widget hierarchy of a few thousand to a few hundred
/// thousand nodes. `cut_threshold` is a heuristic: any value keeps the chain
/// correct, it only trades moved elements against freed segments.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ListConfig {
    /// Preferred number of elements per segment.
    pub segment_capacity: u16,
    /// Rank distance between a segment appended at the tail and its predecessor.
    pub rank_padding: u32,
    /// Exclusive upper bound for segment ranks.
    pub rank_ceiling: u32,
    /// Tails shorter than this are moved out of a segment before a range
    /// removal, so the covered part can be freed whole.
    pub cut_threshold: u16,
    /// Number of segment ids the arena may hand out.
    pub max_segments: u16,
}

impl Default for ListConfig {
    fn default() -> Self {
        return ListConfig {
            segment_capacity: 1023,
            rank_padding: 1024,
            rank_ceiling: MAX_RANK_CEILING,
            cut_threshold: 32,
            max_segments: u16::MAX - 1,
        };
    }
}

impl ListConfig {
    pub fn with_segment_capacity(mut self, capacity: u16) -> Self {
        self.segment_capacity = capacity;
        return self;
    }

    pub fn with_rank_padding(mut self, padding: u32) -> Self {
        self.rank_padding = padding;
        return self;
    }

    pub fn with_rank_ceiling(mut self, ceiling: u32) -> Self {
        self.rank_ceiling = ceiling;
        return self;
    }

    pub fn with_cut_threshold(mut self, threshold: u16) -> Self {
        self.cut_threshold = threshold;
        return self;
    }

    pub fn with_max_segments(mut self, max: u16) -> Self {
        self.max_segments = max;
        return self;
    }

    /// Checks that the values are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_capacity == 0 || self.segment_capacity > MAX_SEGMENT_CAPACITY {
            return Err(ConfigError::SegmentCapacity {
                capacity: self.segment_capacity,
                max: MAX_SEGMENT_CAPACITY,
            });
        }
        if self.rank_ceiling == 0 || self.rank_ceiling > MAX_RANK_CEILING {
            return Err(ConfigError::RankCeiling {
                ceiling: self.rank_ceiling,
                max: MAX_RANK_CEILING,
            });
        }
        if self.rank_padding < 2 || self.rank_padding >= self.rank_ceiling {
            return Err(ConfigError::RankPadding {
                padding: self.rank_padding,
                ceiling: self.rank_ceiling,
            });
        }
        if self.max_segments == 0 || self.max_segments == u16::MAX {
            return Err(ConfigError::MaxSegments(self.max_segments));
        }
        return Ok(());
    }
}
