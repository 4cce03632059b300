//! Minimal in-crate tree for unit tests.

use crate::element::{NodeHandle, Visibility};
use crate::tree::WidgetTree;

#[derive(Clone, Debug)]
pub(crate) struct ToyNode {
    pub children: Vec<u32>,
    pub present: bool,
    pub recurse: bool,
    pub attributes: bool,
    pub visibility: Visibility,
    pub volatile: bool,
    pub handle: Option<NodeHandle>,
}

impl Default for ToyNode {
    fn default() -> Self {
        return ToyNode {
            children: Vec::new(),
            present: true,
            recurse: true,
            attributes: false,
            visibility: Visibility::Visible,
            volatile: false,
            handle: None,
        };
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ToyTree {
    pub nodes: Vec<ToyNode>,
    /// `(node, collapsed)` for every attribute evaluation, in call order.
    pub evaluated: Vec<(u32, bool)>,
}

impl ToyTree {
    pub fn new() -> ToyTree {
        return ToyTree::default();
    }

    /// Adds a node, appending it to `parent`'s children.
    pub fn add(&mut self, parent: Option<u32>) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(ToyNode::default());
        if let Some(parent) = parent {
            self.nodes[parent as usize].children.push(id);
        }
        return id;
    }

    /// Root `0` with `children` leaf children.
    pub fn wide(children: usize) -> ToyTree {
        let mut tree = ToyTree::new();
        let root = tree.add(None);
        for _ in 0..children {
            tree.add(Some(root));
        }
        return tree;
    }

    pub fn node_mut(&mut self, node: u32) -> &mut ToyNode {
        return &mut self.nodes[node as usize];
    }

    /// Nodes the chain should hold, in pre-order.
    pub fn preorder(&self, root: u32) -> Vec<u32> {
        let mut out = Vec::new();
        self.preorder_into(root, &mut out);
        return out;
    }

    fn preorder_into(&self, node: u32, out: &mut Vec<u32>) {
        let data = &self.nodes[node as usize];
        if !data.present {
            return;
        }
        out.push(node);
        if data.recurse {
            for &child in &data.children {
                self.preorder_into(child, out);
            }
        }
    }
}

impl WidgetTree for ToyTree {
    type Node = u32;

    fn children(&self, node: u32) -> &[u32] {
        return &self.nodes[node as usize].children;
    }

    fn should_be_present(&self, node: u32) -> bool {
        return self.nodes[node as usize].present;
    }

    fn should_recurse_into(&self, node: u32) -> bool {
        return self.nodes[node as usize].recurse;
    }

    fn has_dynamic_attributes(&self, node: u32) -> bool {
        return self.nodes[node as usize].attributes;
    }

    fn evaluate_attributes(&mut self, node: u32, collapsed: bool) {
        self.evaluated.push((node, collapsed));
    }

    fn visibility(&self, node: u32) -> Visibility {
        return self.nodes[node as usize].visibility;
    }

    fn is_volatile(&self, node: u32) -> bool {
        return self.nodes[node as usize].volatile;
    }

    fn handle(&self, node: u32) -> Option<NodeHandle> {
        return self.nodes[node as usize].handle;
    }

    fn set_handle(&mut self, node: u32, handle: Option<NodeHandle>) {
        self.nodes[node as usize].handle = handle;
    }
}
