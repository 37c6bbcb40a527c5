//! Depth-first traversal driver for expression trees.
//!
//! The driver walks every root and invokes the visitor at three points per
//! node: before its children ([`TreeVisitor::preorder`]), after each child's
//! subtree has been fully walked ([`TreeVisitor::inorder`]) and after all
//! children ([`TreeVisitor::postorder`]).
//!
//! Child ids are read from their slots when the walk reaches them, so a
//! visitor that rewrites slots of nodes it has already seen is observed by
//! the rest of the walk. Roots are read by position for the same reason.

use cranelift_entity::SecondaryMap;

use crate::refs::NodeRef;
use crate::tree::ExprTree;

/// Controls how shared nodes are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalPolicy {
    /// Visit each node at most once; later references only get the
    /// parent's `inorder` call.
    #[default]
    Once,
    /// Walk a shared node's subtree again for every reference.
    All,
}

/// Callbacks invoked by [`traverse`].
pub trait TreeVisitor {
    fn preorder(&mut self, _tree: &mut ExprTree, _node: NodeRef) {}

    /// Called once per child slot of `node`, after the subtree of child
    /// `index` has been walked.
    fn inorder(&mut self, _tree: &mut ExprTree, _node: NodeRef, _index: usize) {}

    fn postorder(&mut self, _tree: &mut ExprTree, _node: NodeRef) {}
}

struct Walker {
    policy: TraversalPolicy,
    visits: SecondaryMap<NodeRef, u32>,
}

impl Walker {
    fn walk(&mut self, tree: &mut ExprTree, visitor: &mut dyn TreeVisitor, node: NodeRef) {
        if self.policy == TraversalPolicy::Once && self.visits[node] > 0 {
            return;
        }
        self.visits[node] += 1;

        visitor.preorder(tree, node);
        let nchild = tree.num_children(node);
        for index in 0..nchild {
            let child = tree.child(node, index);
            self.walk(tree, visitor, child);
            visitor.inorder(tree, node, index);
        }
        visitor.postorder(tree, node);
    }
}

/// Walk all roots of `tree` depth-first.
pub fn traverse(tree: &mut ExprTree, visitor: &mut dyn TreeVisitor, policy: TraversalPolicy) {
    let mut walker = Walker {
        policy,
        visits: SecondaryMap::with_capacity(tree.len()),
    };
    let mut i = 0;
    while i < tree.roots().len() {
        let root = tree.roots()[i];
        walker.walk(tree, visitor, root);
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Pre(NodeRef),
        In(NodeRef, usize),
        Post(NodeRef),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl TreeVisitor for Recorder {
        fn preorder(&mut self, _tree: &mut ExprTree, node: NodeRef) {
            self.events.push(Event::Pre(node));
        }

        fn inorder(&mut self, _tree: &mut ExprTree, node: NodeRef, index: usize) {
            self.events.push(Event::In(node, index));
        }

        fn postorder(&mut self, _tree: &mut ExprTree, node: NodeRef) {
            self.events.push(Event::Post(node));
        }
    }

    #[test]
    fn callbacks_follow_protocol_order() {
        let mut tree = ExprTree::new();
        let base = ops::local(&mut tree);
        let val = ops::load(&mut tree, base, 8);
        tree.add_root(val);

        let mut rec = Recorder::default();
        traverse(&mut tree, &mut rec, TraversalPolicy::Once);

        assert_eq!(
            rec.events,
            vec![
                Event::Pre(val),
                Event::Pre(base),
                Event::Post(base),
                Event::In(val, 0),
                Event::Post(val),
            ]
        );
    }

    #[test]
    fn once_policy_skips_shared_subtrees() {
        let mut tree = ExprTree::new();
        let base = ops::local(&mut tree);
        let val = ops::load(&mut tree, base, 8);
        let sum = ops::add(&mut tree, val, val);
        tree.add_root(sum);

        let mut rec = Recorder::default();
        traverse(&mut tree, &mut rec, TraversalPolicy::Once);

        let posts = rec
            .events
            .iter()
            .filter(|e| matches!(e, Event::Post(n) if *n == val))
            .count();
        assert_eq!(posts, 1);
        // Both slots of `sum` still get their inorder call.
        assert!(rec.events.contains(&Event::In(sum, 0)));
        assert!(rec.events.contains(&Event::In(sum, 1)));
    }

    #[test]
    fn all_policy_revisits_shared_subtrees() {
        let mut tree = ExprTree::new();
        let base = ops::local(&mut tree);
        let val = ops::load(&mut tree, base, 8);
        let sum = ops::add(&mut tree, val, val);
        tree.add_root(sum);

        let mut rec = Recorder::default();
        traverse(&mut tree, &mut rec, TraversalPolicy::All);

        let posts = rec
            .events
            .iter()
            .filter(|e| matches!(e, Event::Post(n) if *n == val))
            .count();
        assert_eq!(posts, 2);
    }

    #[test]
    fn variadic_children_are_walked_in_order() {
        let mut tree = ExprTree::new();
        let a = ops::local(&mut tree);
        let b = ops::tc(&mut tree);
        let block = ops::r#do(&mut tree, &[a, b]);
        tree.add_root(block);

        let mut rec = Recorder::default();
        traverse(&mut tree, &mut rec, TraversalPolicy::Once);

        let posts: Vec<_> = rec
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Post(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(posts, vec![a, b, block]);
    }
}
