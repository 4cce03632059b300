//! The contract a caller-owned widget tree implements.

use std::fmt::Debug;

use crate::element::{NodeHandle, Visibility};

/// A widget hierarchy the chain can flatten.
///
/// Nodes are named by a cheap copyable id. The chain never owns a node; it
/// only stores the id and hands the node a `NodeHandle` through
/// `set_handle`. Withdrawn handles are reported as `None`.
pub trait WidgetTree {
    type Node: Copy + Eq + Debug;

    /// Children in paint order.
    fn children(&self, node: Self::Node) -> &[Self::Node];

    /// Whether the node gets an element at all.
    fn should_be_present(&self, node: Self::Node) -> bool {
        let _ = node;
        return true;
    }

    /// False for nodes that manage a nested sequence of their own; their
    /// children are then left out of this one.
    fn should_recurse_into(&self, node: Self::Node) -> bool;

    fn has_dynamic_attributes(&self, node: Self::Node) -> bool;

    /// Evaluates the node's dynamic attributes. `collapsed` is true when an
    /// ancestor is collapsed, in which case only the attributes that can
    /// change visibility need evaluating.
    fn evaluate_attributes(&mut self, node: Self::Node, collapsed: bool);

    fn visibility(&self, node: Self::Node) -> Visibility;

    fn is_volatile(&self, node: Self::Node) -> bool;

    fn handle(&self, node: Self::Node) -> Option<NodeHandle>;

    fn set_handle(&mut self, node: Self::Node, handle: Option<NodeHandle>);
}
