//! A reference widget tree for tests and benchmarks.

use widget_index::{NodeHandle, Visibility, WidgetTree};

/// Identifier of a node in a `TestTree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug)]
pub struct TestNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub present: bool,
    pub recurse: bool,
    pub attributes: bool,
    pub visibility: Visibility,
    pub volatile: bool,
    pub handle: Option<NodeHandle>,
}

impl TestNode {
    fn new(parent: Option<NodeId>) -> TestNode {
        return TestNode {
            parent,
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

/// Arena tree. Node `0` is the root once `root()` has been called.
#[derive(Clone, Debug, Default)]
pub struct TestTree {
    nodes: Vec<TestNode>,
    evaluations: Vec<(NodeId, bool)>,
}

impl TestTree {
    pub fn new() -> TestTree {
        return TestTree::default();
    }

    /// Creates a detached node, usually the root.
    pub fn root(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TestNode::new(None));
        return id;
    }

    /// Appends a new child to `parent`.
    pub fn add_child(&mut self, parent: NodeId) -> NodeId {
        let at = self.nodes[parent.0 as usize].children.len();
        return self.insert_child(parent, at);
    }

    /// Inserts a new child at `position` among `parent`'s children.
    pub fn insert_child(&mut self, parent: NodeId, position: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TestNode::new(Some(parent)));
        self.nodes[parent.0 as usize].children.insert(position, id);
        return id;
    }

    /// Detaches `child` from its parent. The node keeps its handle.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0 as usize].parent.take() {
            self.nodes[parent.0 as usize].children.retain(|&c| c != child);
        }
    }

    /// Moves `child` to `position` among its siblings.
    pub fn move_child(&mut self, child: NodeId, position: usize) {
        let Some(parent) = self.nodes[child.0 as usize].parent else {
            return;
        };
        let children = &mut self.nodes[parent.0 as usize].children;
        children.retain(|&c| c != child);
        let position = position.min(children.len());
        children.insert(position, child);
    }

    pub fn node(&self, id: NodeId) -> &TestNode {
        return &self.nodes[id.0 as usize];
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TestNode {
        return &mut self.nodes[id.0 as usize];
    }

    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        return (0..self.nodes.len() as u32).map(NodeId);
    }

    /// `(node, collapsed)` per attribute evaluation, in call order.
    pub fn evaluations(&self) -> &[(NodeId, bool)] {
        return &self.evaluations;
    }

    pub fn clear_evaluations(&mut self) {
        self.evaluations.clear();
    }

    /// Nodes attached under `root`, including absent and hidden ones.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.node(node).children.iter().rev());
        }
        return out;
    }

    /// A root with `width` children per node, `depth` levels deep.
    pub fn uniform(width: usize, depth: usize) -> (TestTree, NodeId) {
        let mut tree = TestTree::new();
        let root = tree.root();
        let mut level = vec![root];
        for _ in 0..depth {
            let mut next = vec![];
            for &parent in &level {
                for _ in 0..width {
                    next.push(tree.add_child(parent));
                }
            }
            level = next;
        }
        return (tree, root);
    }
}

impl WidgetTree for TestTree {
    type Node = NodeId;

    fn children(&self, node: NodeId) -> &[NodeId] {
        return &self.node(node).children;
    }

    fn should_be_present(&self, node: NodeId) -> bool {
        return self.node(node).present;
    }

    fn should_recurse_into(&self, node: NodeId) -> bool {
        return self.node(node).recurse;
    }

    fn has_dynamic_attributes(&self, node: NodeId) -> bool {
        return self.node(node).attributes;
    }

    fn evaluate_attributes(&mut self, node: NodeId, collapsed: bool) {
        self.evaluations.push((node, collapsed));
    }

    fn visibility(&self, node: NodeId) -> Visibility {
        return self.node(node).visibility;
    }

    fn is_volatile(&self, node: NodeId) -> bool {
        return self.node(node).volatile;
    }

    fn handle(&self, node: NodeId) -> Option<NodeHandle> {
        return self.node(node).handle;
    }

    fn set_handle(&mut self, node: NodeId, handle: Option<NodeHandle>) {
        self.node_mut(node).handle = handle;
    }
}
