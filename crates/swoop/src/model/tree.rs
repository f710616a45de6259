use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

/// Strictly binary tree stored in an arena.
///
/// Every node is owned by the arena; parents and children refer to each
/// other by [`NodeId`]. Structural changes are reported to the observer `O`
/// so that per-node components can be kept in sync.
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self {
        Tree { map: NodeMap::new(), data }
    }

    /// Creates a detached leaf.
    pub fn mk_leaf(&mut self) -> NodeId {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        id
    }

    /// Creates a split owning `first` and `second`, which become its children.
    ///
    /// The children's parent links are overwritten; it is up to the caller to
    /// fix up whatever slot previously held them.
    #[track_caller]
    pub fn mk_split(&mut self, first: NodeId, second: NodeId) -> NodeId {
        debug_assert_ne!(first, second);
        let id = self.map.map.insert(Node {
            parent: None,
            children: Some([first, second]),
        });
        self.map[first].parent = Some(id);
        self.map[second].parent = Some(id);
        self.data.added_to_forest(&self.map, id);
        id
    }
}

/// Map that holds the structure of the tree.
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap {
        NodeMap { map: SlotMap::default() }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[cfg(test)]
    pub fn contains(&self, node: NodeId) -> bool {
        self.map.contains_key(node)
    }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.map[index]
    }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.map[index]
    }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

impl NodeId {
    #[track_caller]
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map[self].parent
    }

    /// Both children, or `None` for a leaf.
    #[track_caller]
    pub fn children(self, map: &NodeMap) -> Option<[NodeId; 2]> {
        map[self].children
    }

    #[track_caller]
    pub fn child(self, index: usize, map: &NodeMap) -> Option<NodeId> {
        map[self].children.and_then(|c| c.get(index).copied())
    }

    #[track_caller]
    pub fn is_leaf(self, map: &NodeMap) -> bool {
        map[self].children.is_none()
    }

    /// Which slot of its parent this node occupies.
    #[track_caller]
    pub fn child_index(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.children(map)?.iter().position(|&c| c == self)
    }

    #[track_caller]
    pub fn sibling(self, map: &NodeMap) -> Option<NodeId> {
        let index = self.child_index(map)?;
        self.parent(map)?.child(1 - index, map)
    }

    /// Pre-order traversal, first child before second.
    pub fn descendants(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            if let Some([first, second]) = map[node].children {
                stack.push(second);
                stack.push(first);
            }
            Some(node)
        })
    }

    /// All leaves under this node, in left-to-right order.
    pub fn leaves(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(map).filter(move |&n| n.is_leaf(map))
    }

    pub fn count_leaves(self, map: &NodeMap) -> usize {
        self.leaves(map).count()
    }

    /// Puts `child` into slot `index` and points it back at `self`.
    ///
    /// The node previously in that slot keeps its stale parent link; callers
    /// detach or reattach it themselves.
    #[track_caller]
    pub fn set_child(self, index: usize, child: NodeId, map: &mut NodeMap) {
        debug_assert_ne!(self, child);
        let children = map[self].children.as_mut().expect("cannot set a child of a leaf");
        children[index] = child;
        map[child].parent = Some(self);
    }

    /// Exchanges the two children of a split.
    #[track_caller]
    pub fn swap_children(self, map: &mut NodeMap) {
        if let Some(children) = map[self].children.as_mut() {
            children.swap(0, 1);
        }
    }

    pub fn clear_parent(self, map: &mut NodeMap) {
        map[self].parent = None;
    }

    /// Frees this node alone. Its children, if any, are left in place and
    /// must already have been re-homed.
    #[track_caller]
    pub fn discard(self, tree: &mut Tree<impl Observer>) {
        tree.map.map.remove(self).expect("node was already discarded");
        tree.data.removed_from_forest(&tree.map, self);
    }
}

#[derive(Clone, Default, PartialEq, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Option<[NodeId; 2]>,
}

pub trait Observer {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

#[cfg(test)]
#[derive(Clone, Copy)]
pub struct NoopObserver;
#[cfg(test)]
impl Observer for NoopObserver {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
    fn removed_from_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
}
#[cfg(test)]
pub const NOOP: NoopObserver = NoopObserver;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// A tree with the following structure:
    /// ```text
    ///        root
    ///       /    \
    ///      a      s
    ///            / \
    ///           b   c
    /// ```
    struct TestTree {
        tree: Tree<NoopObserver>,
        root: NodeId,
        a: NodeId,
        s: NodeId,
        b: NodeId,
        c: NodeId,
    }

    impl TestTree {
        #[rustfmt::skip]
        fn new() -> Self {
            let mut tree = Tree::with_observer(NOOP);
            let a = tree.mk_leaf();
            let b = tree.mk_leaf();
            let c = tree.mk_leaf();
            let s = tree.mk_split(b, c);
            let root = tree.mk_split(a, s);
            TestTree { tree, root, a, s, b, c }
        }

        #[track_caller]
        fn assert_consistent(&self) {
            for node in self.root.descendants(&self.tree.map) {
                if let Some(index) = node.child_index(&self.tree.map) {
                    let parent = node.parent(&self.tree.map).unwrap();
                    assert_eq!(parent.child(index, &self.tree.map), Some(node));
                }
                if let Some(children) = node.children(&self.tree.map) {
                    for child in children {
                        assert_eq!(child.parent(&self.tree.map), Some(node));
                    }
                }
            }
        }
    }

    #[test]
    fn structure() {
        let t = TestTree::new();
        let map = &t.tree.map;
        assert_eq!(t.root.children(map), Some([t.a, t.s]));
        assert_eq!(t.s.children(map), Some([t.b, t.c]));
        assert!(t.a.is_leaf(map));
        assert!(!t.s.is_leaf(map));
        assert_eq!(t.root.parent(map), None);
        assert_eq!(t.b.parent(map), Some(t.s));
        t.assert_consistent();
    }

    #[test]
    fn child_index_and_sibling() {
        let t = TestTree::new();
        let map = &t.tree.map;
        assert_eq!(t.a.child_index(map), Some(0));
        assert_eq!(t.s.child_index(map), Some(1));
        assert_eq!(t.c.child_index(map), Some(1));
        assert_eq!(t.root.child_index(map), None);
        assert_eq!(t.a.sibling(map), Some(t.s));
        assert_eq!(t.c.sibling(map), Some(t.b));
        assert_eq!(t.root.sibling(map), None);
        assert_eq!(t.a.child(0, map), None);
        assert_eq!(t.root.child(2, map), None);
    }

    #[test]
    fn traversal_order() {
        let t = TestTree::new();
        let map = &t.tree.map;
        assert_eq!(
            t.root.descendants(map).collect::<Vec<_>>(),
            [t.root, t.a, t.s, t.b, t.c]
        );
        assert_eq!(t.root.leaves(map).collect::<Vec<_>>(), [t.a, t.b, t.c]);
        assert_eq!(t.root.count_leaves(map), 3);
        assert_eq!(t.s.count_leaves(map), 2);
        assert_eq!(t.a.count_leaves(map), 1);
    }

    #[test]
    fn set_child_updates_parent() {
        let mut t = TestTree::new();
        let d = t.tree.mk_leaf();
        t.s.set_child(0, d, &mut t.tree.map);
        assert_eq!(t.s.children(&t.tree.map), Some([d, t.c]));
        assert_eq!(d.parent(&t.tree.map), Some(t.s));
        t.b.discard(&mut t.tree);
        t.assert_consistent();
    }

    #[test]
    fn swap_children() {
        let mut t = TestTree::new();
        t.s.swap_children(&mut t.tree.map);
        assert_eq!(t.s.children(&t.tree.map), Some([t.c, t.b]));
        assert_eq!(t.c.child_index(&t.tree.map), Some(0));
        t.a.swap_children(&mut t.tree.map);
        assert!(t.a.is_leaf(&t.tree.map));
        t.assert_consistent();
    }

    #[test]
    fn collapse_split() {
        let mut t = TestTree::new();
        // Remove `b`: its sibling `c` takes the place of `s`.
        let index = t.s.child_index(&t.tree.map).unwrap();
        t.root.set_child(index, t.c, &mut t.tree.map);
        t.b.discard(&mut t.tree);
        t.s.discard(&mut t.tree);
        assert_eq!(t.root.children(&t.tree.map), Some([t.a, t.c]));
        assert_eq!(t.tree.map.len(), 3);
        assert!(!t.tree.map.contains(t.s));
        t.assert_consistent();
    }
}
