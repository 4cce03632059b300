//! Full-walk invariant checks.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use thiserror::Error;
use widget_index::{ElementFlags, OrderKey, SegmentChain, SegmentId, SequenceIndex, WidgetTree};

/// The first broken invariant found by a check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("segment {segment}: prev link is {found:?}, expected {expected:?}")]
    BrokenLink {
        segment: SegmentId,
        expected: Option<SegmentId>,
        found: Option<SegmentId>,
    },

    #[error("chain ends at {found:?} but last is {expected:?}")]
    WrongLast {
        expected: Option<SegmentId>,
        found: Option<SegmentId>,
    },

    #[error("segment {segment} has no live elements")]
    EmptySegment { segment: SegmentId },

    #[error("segment {segment} rank {rank} does not exceed {previous}")]
    RankOrder {
        segment: SegmentId,
        rank: u32,
        previous: u32,
    },

    #[error("key of {index} does not exceed its predecessor")]
    KeyOrder { index: SequenceIndex },

    #[error("element stored at {stored} believes it is {claimed}")]
    SelfIndex {
        stored: SequenceIndex,
        claimed: SequenceIndex,
    },

    #[error("live element at {index} holds no node")]
    NoNode { index: SequenceIndex },

    #[error("attribute index of segment {segment}: {reason}")]
    AttributeIndex { segment: SegmentId, reason: String },

    #[error("counted {found} elements, chain reports {reported}")]
    Count { reported: usize, found: usize },

    #[error("{found} elements in the chain, {expected} present in the tree")]
    Length { expected: usize, found: usize },

    #[error("position {position}: expected {expected}, found {found}")]
    Order {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("position {position}: parent is {found:?}, expected {expected:?}")]
    Parent {
        position: usize,
        expected: Option<usize>,
        found: Option<usize>,
    },

    #[error("position {position}: leaf is {found:?}, expected {expected}")]
    Leaf {
        position: usize,
        expected: usize,
        found: Option<usize>,
    },

    #[error("handle of {node}: {reason}")]
    Handle { node: String, reason: String },

    #[error("chains diverge at position {position}: {reason}")]
    Diverged { position: usize, reason: String },
}

/// Where each live element sits in sequence order.
pub fn positions<N: Copy + Eq + Debug>(chain: &SegmentChain<N>) -> FxHashMap<SequenceIndex, usize> {
    return chain
        .iter()
        .enumerate()
        .map(|(position, element)| (element.index(), position))
        .collect();
}

struct Expected<N> {
    node: N,
    parent: Option<usize>,
    end: usize,
}

fn expected<T: WidgetTree + ?Sized>(tree: &T, root: Option<T::Node>) -> Vec<Expected<T::Node>> {
    let mut out = vec![];
    if let Some(root) = root {
        if tree.should_be_present(root) {
            walk(tree, root, None, &mut out);
        }
    }
    return out;
}

fn walk<T: WidgetTree + ?Sized>(
    tree: &T,
    node: T::Node,
    parent: Option<usize>,
    out: &mut Vec<Expected<T::Node>>,
) {
    let position = out.len();
    out.push(Expected {
        node,
        parent,
        end: position,
    });
    if tree.should_recurse_into(node) {
        for &child in tree.children(node) {
            if tree.should_be_present(child) {
                walk(tree, child, Some(position), out);
            }
        }
    }
    out[position].end = out.len() - 1;
}

/// Checks the chain's own invariants: links, ranks, keys, addresses and
/// attribute indexes.
pub fn verify_structure<N: Copy + Eq + Debug>(chain: &SegmentChain<N>) -> Result<(), Violation> {
    let mut previous: Option<(SegmentId, u32)> = None;
    let mut last_key: Option<OrderKey> = None;
    let mut count = 0;

    for (id, segment) in chain.segments() {
        let expected_prev = previous.map(|(id, _)| id);
        if segment.prev() != expected_prev {
            return Err(Violation::BrokenLink {
                segment: id,
                expected: expected_prev,
                found: segment.prev(),
            });
        }
        if previous.is_none() && chain.first_segment() != Some(id) {
            return Err(Violation::BrokenLink {
                segment: id,
                expected: chain.first_segment(),
                found: Some(id),
            });
        }
        if let Some((_, rank)) = previous {
            if segment.rank() <= rank {
                return Err(Violation::RankOrder {
                    segment: id,
                    rank: segment.rank(),
                    previous: rank,
                });
            }
        }
        if segment.is_empty() {
            return Err(Violation::EmptySegment { segment: id });
        }

        for (i, element) in segment.elements().iter().enumerate() {
            let stored = SequenceIndex::new(id, segment.logical_start() + i as u16);
            if element.index() != stored {
                return Err(Violation::SelfIndex {
                    stored,
                    claimed: element.index(),
                });
            }
            if element.node().is_none() {
                return Err(Violation::NoNode { index: stored });
            }
            let key = segment.key_of(stored.offset);
            if last_key.is_some_and(|last| last >= key) {
                return Err(Violation::KeyOrder { index: stored });
            }
            last_key = Some(key);

            let indexed = segment.attributes().binary_search(&stored.offset).is_ok();
            if element.has_attributes() != indexed {
                return Err(Violation::AttributeIndex {
                    segment: id,
                    reason: format!(
                        "offset {} flagged {} but indexed {}",
                        stored.offset,
                        element.has_attributes(),
                        indexed
                    ),
                });
            }
        }

        let attributes = segment.attributes();
        if attributes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Violation::AttributeIndex {
                segment: id,
                reason: format!("unsorted {attributes:?}"),
            });
        }
        if let Some(&offset) = attributes.iter().find(|&&o| segment.get(o).is_none()) {
            return Err(Violation::AttributeIndex {
                segment: id,
                reason: format!("offset {offset} is not live"),
            });
        }

        count += segment.live_len();
        previous = Some((id, segment.rank()));
    }

    let found_last = previous.map(|(id, _)| id);
    if found_last != chain.last_segment() {
        return Err(Violation::WrongLast {
            expected: chain.last_segment(),
            found: found_last,
        });
    }
    if count != chain.len() {
        return Err(Violation::Count {
            reported: chain.len(),
            found: count,
        });
    }
    return Ok(());
}

/// Checks the chain against the tree it was built from: structure, then
/// pre-order, parent edges, leaf pointers and handles.
pub fn verify<T>(chain: &SegmentChain<T::Node>, tree: &T, root: Option<T::Node>) -> Result<(), Violation>
where
    T: WidgetTree + ?Sized,
{
    verify_structure(chain)?;

    let expected = expected(tree, root);
    if expected.len() != chain.len() {
        return Err(Violation::Length {
            expected: expected.len(),
            found: chain.len(),
        });
    }
    let positions = positions(chain);

    for (position, (element, want)) in chain.iter().zip(expected.iter()).enumerate() {
        let node = element.node();
        if node != Some(want.node) {
            return Err(Violation::Order {
                position,
                expected: format!("{:?}", want.node),
                found: format!("{node:?}"),
            });
        }

        let parent = positions.get(&element.parent()).copied();
        if parent != want.parent {
            return Err(Violation::Parent {
                position,
                expected: want.parent,
                found: parent,
            });
        }

        let leaf = positions.get(&element.leaf_most()).copied();
        if leaf != Some(want.end) {
            return Err(Violation::Leaf {
                position,
                expected: want.end,
                found: leaf,
            });
        }

        let handle_error = |reason: String| Violation::Handle {
            node: format!("{:?}", want.node),
            reason,
        };
        let Some(handle) = tree.handle(want.node) else {
            return Err(handle_error("missing".to_string()));
        };
        if handle.index != element.index() {
            return Err(handle_error(format!("points at {}, element is at {}", handle.index, element.index())));
        }
        if Some(handle.order) != chain.order_key(element.index()) {
            return Err(handle_error(format!("order {:?} is out of date", handle.order)));
        }
        if handle.generation != chain.generation() {
            return Err(handle_error(format!("generation {} is stale", handle.generation)));
        }
        if handle.epoch != chain.epoch(element.index().segment) {
            return Err(handle_error(format!("epoch {} is retired", handle.epoch)));
        }
    }
    return Ok(());
}

/// Compares two chains position by position, ignoring addresses and ranks.
pub fn compare<N: Copy + Eq + Debug>(a: &SegmentChain<N>, b: &SegmentChain<N>) -> Result<(), Violation> {
    if a.len() != b.len() {
        return Err(Violation::Diverged {
            position: a.len().min(b.len()),
            reason: format!("lengths {} and {}", a.len(), b.len()),
        });
    }
    let (pa, pb) = (positions(a), positions(b));
    for (position, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diverged = |reason: String| Violation::Diverged { position, reason };
        if x.node() != y.node() {
            return Err(diverged(format!("nodes {:?} and {:?}", x.node(), y.node())));
        }
        let (parent_x, parent_y) = (pa.get(&x.parent()), pb.get(&y.parent()));
        if parent_x != parent_y {
            return Err(diverged(format!("parents {parent_x:?} and {parent_y:?}")));
        }
        let (leaf_x, leaf_y) = (pa.get(&x.leaf_most()), pb.get(&y.leaf_most()));
        if leaf_x != leaf_y {
            return Err(diverged(format!("leaves {leaf_x:?} and {leaf_y:?}")));
        }
        let (flags_x, flags_y) = (x.flags() & ElementFlags::STATE, y.flags() & ElementFlags::STATE);
        if flags_x != flags_y {
            return Err(diverged(format!("flags {flags_x:?} and {flags_y:?}")));
        }
        if x.visibility() != y.visibility() {
            return Err(diverged(format!("visibility {:?} and {:?}", x.visibility(), y.visibility())));
        }
    }
    return Ok(());
}

/// Digest of the chain's shape: nodes, parent and leaf positions, state
/// flags and visibility. Addresses and ranks don't contribute, so two
/// chains that `compare` equal share a fingerprint.
pub fn fingerprint<N: Copy + Eq + Debug + Hash>(chain: &SegmentChain<N>) -> blake3::Hash {
    let positions = positions(chain);
    let position_of = |index: SequenceIndex| -> u64 {
        return positions.get(&index).map_or(u64::MAX, |&p| p as u64);
    };
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(chain.len() as u64).to_le_bytes());
    for element in chain.iter() {
        let mut node = FxHasher::default();
        element.node().hash(&mut node);
        hasher.update(&node.finish().to_le_bytes());
        hasher.update(&position_of(element.parent()).to_le_bytes());
        hasher.update(&position_of(element.leaf_most()).to_le_bytes());
        hasher.update(&[(element.flags() & ElementFlags::STATE).bits(), element.visibility() as u8]);
    }
    return hasher.finalize();
}
