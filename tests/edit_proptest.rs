//! Property-based tests: random edits, each followed by the matching
//! incremental update, must leave the chain equal to a fresh build.

use proptest::prelude::*;
use widget_index::{AttributeCursor, ListConfig, SegmentChain, Visibility, WidgetTree};
use widget_index_verify::{NodeId, TestTree, compare, fingerprint, verify};

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug)]
enum Edit {
    AddChild { pick: f64, position: f64, attributes: bool },
    Detach { pick: f64 },
    SetPresent { pick: f64, present: bool },
    SetRecurse { pick: f64, recurse: bool },
    Move { pick: f64, position: f64 },
    SetAttributes { pick: f64, attributes: bool },
    SetVisibility { pick: f64, collapsed: bool },
    Rebuild { pick: f64 },
}

fn arbitrary_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        4 => (0.0..1.0f64, 0.0..=1.0f64, any::<bool>())
            .prop_map(|(pick, position, attributes)| Edit::AddChild { pick, position, attributes }),
        1 => (0.0..1.0f64).prop_map(|pick| Edit::Detach { pick }),
        1 => (0.0..1.0f64, any::<bool>()).prop_map(|(pick, present)| Edit::SetPresent { pick, present }),
        1 => (0.0..1.0f64, any::<bool>()).prop_map(|(pick, recurse)| Edit::SetRecurse { pick, recurse }),
        1 => (0.0..1.0f64, 0.0..=1.0f64).prop_map(|(pick, position)| Edit::Move { pick, position }),
        1 => (0.0..1.0f64, any::<bool>())
            .prop_map(|(pick, attributes)| Edit::SetAttributes { pick, attributes }),
        1 => (0.0..1.0f64, any::<bool>())
            .prop_map(|(pick, collapsed)| Edit::SetVisibility { pick, collapsed }),
        1 => (0.0..1.0f64).prop_map(|pick| Edit::Rebuild { pick }),
    ]
}

fn arbitrary_config() -> impl Strategy<Value = ListConfig> {
    (2u16..12, 0u16..6, prop::bool::ANY).prop_map(|(capacity, threshold, tight)| {
        let config = ListConfig::default()
            .with_segment_capacity(capacity)
            .with_cut_threshold(threshold);
        if tight {
            // Few ranks, so splices relabel often.
            return config.with_rank_ceiling(1 << 12).with_rank_padding(4);
        }
        return config;
    })
}

fn pick(nodes: &[NodeId], fraction: f64) -> NodeId {
    let at = ((fraction * nodes.len() as f64) as usize).min(nodes.len() - 1);
    return nodes[at];
}

fn in_chain(chain: &SegmentChain<NodeId>, tree: &TestTree, node: NodeId) -> bool {
    return chain.resolve(tree, node).is_ok();
}

/// Rebuilds `node` if the chain holds it; otherwise the edit is invisible.
fn rebuild(chain: &mut SegmentChain<NodeId>, tree: &mut TestTree, node: Option<NodeId>) {
    if let Some(node) = node {
        if in_chain(chain, tree, node) {
            chain.rebuild_subtree(tree, node, &mut ()).unwrap();
        }
    }
}

fn apply(chain: &mut SegmentChain<NodeId>, tree: &mut TestTree, root: NodeId, edit: &Edit) {
    let attached = tree.descendants(root);
    let others: Vec<NodeId> = attached.iter().copied().filter(|&n| n != root).collect();
    match *edit {
        Edit::AddChild { pick: p, position, attributes } => {
            let parent = pick(&attached, p);
            let at = (position * tree.children(parent).len() as f64) as usize;
            let child = tree.insert_child(parent, at);
            tree.node_mut(child).attributes = attributes;
            rebuild(chain, tree, Some(parent));
        }
        Edit::Detach { pick: p } => {
            if others.is_empty() {
                return;
            }
            let node = pick(&others, p);
            let parent = tree.node(node).parent;
            tree.detach(node);
            rebuild(chain, tree, parent);
        }
        Edit::SetPresent { pick: p, present } => {
            if others.is_empty() {
                return;
            }
            let node = pick(&others, p);
            tree.node_mut(node).present = present;
            if present {
                let parent = tree.node(node).parent;
                rebuild(chain, tree, parent);
            } else {
                rebuild(chain, tree, Some(node));
            }
        }
        Edit::SetRecurse { pick: p, recurse } => {
            let node = pick(&attached, p);
            tree.node_mut(node).recurse = recurse;
            rebuild(chain, tree, Some(node));
        }
        Edit::Move { pick: p, position } => {
            if others.is_empty() {
                return;
            }
            let node = pick(&others, p);
            let parent = tree.node(node).parent;
            let siblings = parent.map_or(0, |parent| tree.children(parent).len());
            tree.move_child(node, (position * siblings as f64) as usize);
            rebuild(chain, tree, parent);
        }
        Edit::SetAttributes { pick: p, attributes } => {
            let node = pick(&attached, p);
            tree.node_mut(node).attributes = attributes;
            if in_chain(chain, tree, node) {
                chain.refresh_node(tree, node).unwrap();
            }
        }
        Edit::SetVisibility { pick: p, collapsed } => {
            let node = pick(&attached, p);
            tree.node_mut(node).visibility = if collapsed {
                Visibility::Collapsed
            } else {
                Visibility::Visible
            };
            if in_chain(chain, tree, node) {
                chain.refresh_node(tree, node).unwrap();
            }
        }
        Edit::Rebuild { pick: p } => {
            let node = pick(&attached, p);
            if in_chain(chain, tree, node) {
                let before = fingerprint(chain);
                let outcome = chain.rebuild_subtree(tree, node, &mut ()).unwrap();
                assert!(outcome.is_unchanged());
                assert_eq!(fingerprint(chain), before);
            }
        }
    }
}

fn seeded(width: usize, depth: usize, flag_every: u32) -> (TestTree, NodeId) {
    let (mut tree, root) = TestTree::uniform(width, depth);
    for node in tree.ids().collect::<Vec<_>>() {
        tree.node_mut(node).attributes = node.0 % flag_every == 1;
    }
    return (tree, root);
}

fn flagged_after(chain: &SegmentChain<NodeId>, from: Option<usize>) -> Vec<NodeId> {
    return chain
        .iter()
        .enumerate()
        .filter(|(position, element)| element.has_attributes() && from.is_none_or(|from| *position > from))
        .map(|(_, element)| element.node().unwrap())
        .collect();
}

// =============================================================================
// Edit sequences
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn edits_match_fresh_build(
        config in arbitrary_config(),
        width in 1usize..4,
        depth in 0usize..3,
        edits in prop::collection::vec(arbitrary_edit(), 1..40),
    ) {
        let (mut tree, root) = seeded(width, depth, 3);
        let mut chain = SegmentChain::with_config(config.clone()).unwrap();
        chain.build_from(&mut tree, root);

        for edit in &edits {
            apply(&mut chain, &mut tree, root, edit);
            if let Err(violation) = verify(&chain, &tree, Some(root)) {
                prop_assert!(false, "{violation} after {edit:?}");
            }
        }

        let mut fresh_tree = tree.clone();
        let mut fresh = SegmentChain::with_config(config).unwrap();
        fresh.build_from(&mut fresh_tree, root);
        prop_assert_eq!(compare(&chain, &fresh), Ok(()));
        prop_assert_eq!(fingerprint(&chain), fingerprint(&fresh));
        prop_assert_eq!(chain.take_capacity_error(), None);
    }

    #[test]
    fn cursor_walks_every_flag_once(
        config in arbitrary_config(),
        width in 1usize..6,
        depth in 1usize..4,
        flag_every in 1u32..5,
    ) {
        let (mut tree, root) = seeded(width, depth, flag_every);
        let mut chain = SegmentChain::with_config(config).unwrap();
        chain.build_from(&mut tree, root);

        let mut cursor = AttributeCursor::new();
        let mut seen = vec![];
        while let Some(index) = cursor.next(&chain) {
            seen.push(chain.get(index).unwrap().node().unwrap());
        }
        prop_assert_eq!(seen, flagged_after(&chain, None));
    }
}

// =============================================================================
// Cursor safety
// =============================================================================

#[derive(Clone, Debug)]
enum Tail {
    Remove { pick: f64 },
    Cut { pick: f64 },
    Relabel { pick: f64 },
}

fn arbitrary_tail() -> impl Strategy<Value = Tail> {
    prop_oneof![
        (0.0..1.0f64).prop_map(|pick| Tail::Remove { pick }),
        (0.0..1.0f64).prop_map(|pick| Tail::Cut { pick }),
        (0.0..1.0f64).prop_map(|pick| Tail::Relabel { pick }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(150))]

    #[test]
    fn cursor_resumes_after_edits_behind_it(
        config in arbitrary_config(),
        width in 2usize..5,
        depth in 1usize..4,
        skip in 0usize..6,
        tail in prop::collection::vec(arbitrary_tail(), 1..12),
    ) {
        let (mut tree, root) = seeded(width, depth, 2);
        let mut chain = SegmentChain::with_config(config).unwrap();
        chain.build_from(&mut tree, root);

        let mut cursor = AttributeCursor::new();
        let mut at = None;
        for _ in 0..=skip {
            match cursor.next(&chain) {
                Some(index) => at = Some(index),
                None => break,
            }
        }
        let Some(at) = at else {
            return Ok(());
        };
        let current = chain.get(at).unwrap().node().unwrap();

        for op in &tail {
            let positions: Vec<_> = chain.iter().map(|e| e.index()).collect();
            let here = positions.iter().position(|&i| chain.get(i).unwrap().node() == Some(current)).unwrap();
            let behind = &positions[here + 1..];
            if behind.is_empty() {
                break;
            }
            match *op {
                Tail::Remove { pick: p } => {
                    let at = ((p * behind.len() as f64) as usize).min(behind.len() - 1);
                    let node = chain.get(behind[at]).unwrap().node().unwrap();
                    // Ancestors of the cursor's element would take it along.
                    let ancestor = tree.descendants(node).contains(&current);
                    if !ancestor {
                        tree.node_mut(node).present = false;
                        chain.rebuild_subtree(&mut tree, node, &mut cursor).unwrap();
                    }
                }
                Tail::Cut { pick: p } => {
                    let at = ((p * positions.len() as f64) as usize).min(positions.len() - 1);
                    chain.cut_at(&mut tree, positions[at], &mut cursor);
                }
                Tail::Relabel { pick: p } => {
                    let segments: Vec<_> = chain.segments().map(|(id, _)| id).collect();
                    let at = ((p * segments.len() as f64) as usize).min(segments.len() - 1);
                    chain.rebalance_ranks(&mut tree, segments[at], &mut cursor);
                }
            }
        }
        verify(&chain, &tree, Some(root)).unwrap();

        let index = chain.resolve(&tree, current).unwrap();
        prop_assert_eq!(cursor.current(), Some(index));
        prop_assert_eq!(cursor.order_key(), chain.order_key(index));
        let position = chain.iter().position(|e| e.index() == index);

        let mut rest = vec![];
        while let Some(index) = cursor.next(&chain) {
            rest.push(chain.get(index).unwrap().node().unwrap());
        }
        prop_assert_eq!(rest, flagged_after(&chain, position));
    }
}
