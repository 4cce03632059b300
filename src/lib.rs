//! Widget Index - an order-maintenance index over a flattened widget tree.
//!
//! A widget hierarchy is stored in pre-order as a chain of segments. Every
//! element knows its parent and the last element of its subtree, so a
//! subtree is one contiguous range, and every element has an `OrderKey` that
//! compares like its position in the sequence. Subtrees can be removed and
//! rebuilt in place without renumbering the rest of the sequence.
//!
//! # Quick Start
//!
//! ```
//! use widget_index::{AttributeCursor, NodeHandle, SegmentChain, Visibility, WidgetTree};
//!
//! struct Tree {
//!     children: Vec<Vec<usize>>,
//!     handles: Vec<Option<NodeHandle>>,
//! }
//!
//! impl WidgetTree for Tree {
//!     type Node = usize;
//!     fn children(&self, node: usize) -> &[usize] { &self.children[node] }
//!     fn should_recurse_into(&self, _: usize) -> bool { true }
//!     fn has_dynamic_attributes(&self, node: usize) -> bool { node == 2 }
//!     fn evaluate_attributes(&mut self, _: usize, _: bool) {}
//!     fn visibility(&self, _: usize) -> Visibility { Visibility::Visible }
//!     fn is_volatile(&self, _: usize) -> bool { false }
//!     fn handle(&self, node: usize) -> Option<NodeHandle> { self.handles[node] }
//!     fn set_handle(&mut self, node: usize, handle: Option<NodeHandle>) {
//!         self.handles[node] = handle;
//!     }
//! }
//!
//! // 0 -> [1 -> [2], 3]
//! let mut tree = Tree {
//!     children: vec![vec![1, 3], vec![2], vec![], vec![]],
//!     handles: vec![None; 4],
//! };
//! let mut chain = SegmentChain::new();
//! chain.build_from(&mut tree, 0);
//! assert_eq!(chain.len(), 4);
//!
//! let two = chain.resolve(&tree, 2).unwrap();
//! let three = chain.resolve(&tree, 3).unwrap();
//! assert!(chain.compare(two, three).is_lt());
//!
//! let mut cursor = AttributeCursor::new();
//! assert_eq!(cursor.next(&chain), Some(two));
//! assert_eq!(cursor.next(&chain), None);
//! ```

pub mod callback;
pub mod chain;
pub mod config;
pub mod cursor;
pub mod element;
pub mod error;
pub mod index;
pub mod segment;
pub mod tree;

mod build;
mod range;

#[cfg(test)]
mod testing;

pub use build::RebuildOutcome;
pub use callback::{MutationCallback, MutationEvent, MutationLog};
pub use chain::{ChainStats, SegmentChain, Segments};
pub use config::{ListConfig, MAX_RANK_CEILING};
pub use cursor::AttributeCursor;
pub use element::{Element, ElementFlags, NodeHandle, Visibility};
pub use error::{CapacityError, ConfigError, ListError};
pub use index::{IndexRange, OrderKey, ReIndexMap, SegmentId, SequenceIndex, MAX_SEGMENT_CAPACITY, OFFSET_BITS};
pub use segment::Segment;
pub use tree::WidgetTree;
