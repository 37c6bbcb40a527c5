//! ExprTree: the flat, array-encoded expression graph.
//!
//! All node records live in a single `i64` operand array. A record starts
//! with the opcode tag, followed by an optional child-count header (variadic
//! opcodes only), the child node ids and finally the immediate arguments.
//! Node ids are positions in this array, so ids only ever grow as nodes are
//! appended.

use cranelift_entity::{EntityRef, SecondaryMap};
use smallvec::SmallVec;

use crate::opcode::{Arity, OpInfo, Opcode};
use crate::refs::{NodeRef, SlotRef};
use crate::validation::{self, ValidationResult};

/// Per-node metadata derived from the record's tag.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeInfo {
    pub op_info: Option<&'static OpInfo>,
}

/// Typed view of a node record, for matching on operand shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprOp {
    Const { value: i64, size: i64 },
    Load { addr: NodeRef, size: i64 },
    Store { addr: NodeRef, value: NodeRef, size: i64 },
    Addr { base: NodeRef, offset: i64 },
    Index { base: NodeRef, index: NodeRef, scale: i64 },
    Copy { value: NodeRef },
    Other(Opcode),
}

/// Flat expression tree with its root list.
#[derive(Clone, Debug, Default)]
pub struct ExprTree {
    nodes: Vec<i64>,
    info: SecondaryMap<NodeRef, NodeInfo>,
    roots: Vec<NodeRef>,
}

impl ExprTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree with room for `slots` operand slots.
    pub fn with_capacity(slots: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(slots),
            info: SecondaryMap::with_capacity(slots),
            roots: Vec::new(),
        }
    }

    /// Build a tree from a raw operand array and root list.
    ///
    /// The array is scanned record by record and validated; see
    /// [`validation::validate_topological`].
    pub fn from_raw(nodes: Vec<i64>, roots: Vec<NodeRef>) -> ValidationResult<Self> {
        let starts = validation::scan_records(&nodes)?;
        let mut tree = Self {
            info: SecondaryMap::with_capacity(nodes.len()),
            nodes,
            roots,
        };
        for node in starts {
            tree.refresh_info(node);
        }
        validation::validate_topological(&tree)?;
        Ok(tree)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Append a node record and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the number of children or immediates does not match the
    /// opcode's shape, or if a child does not name an existing record.
    pub fn push_node(&mut self, opcode: Opcode, children: &[NodeRef], args: &[i64]) -> NodeRef {
        let info = opcode.info();
        if let Arity::Fixed(n) = info.arity {
            assert_eq!(
                children.len(),
                n as usize,
                "push_node: `{opcode}` takes {n} children, got {}",
                children.len()
            );
        }
        assert_eq!(
            args.len(),
            info.nargs as usize,
            "push_node: `{opcode}` takes {} immediates, got {}",
            info.nargs,
            args.len()
        );
        for &child in children {
            assert!(
                self.info[child].op_info.is_some(),
                "push_node: child {child} is not a node record"
            );
        }

        let node = NodeRef::new(self.nodes.len());
        self.nodes.push(opcode.tag());
        if info.is_variadic() {
            self.nodes.push(children.len() as i64);
        }
        self.nodes
            .extend(children.iter().map(|child| child.to_slot_value()));
        self.nodes.extend_from_slice(args);
        self.refresh_info(node);
        node
    }

    pub fn add_root(&mut self, node: NodeRef) {
        self.roots.push(node);
    }

    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    /// Map every root through `resolve`.
    pub fn resolve_roots(&mut self, mut resolve: impl FnMut(NodeRef) -> NodeRef) {
        for root in &mut self.roots {
            *root = resolve(*root);
        }
    }

    /// Recompute the metadata of `node` from its tag slot.
    ///
    /// # Panics
    ///
    /// Panics if the tag slot does not hold a known opcode.
    pub fn refresh_info(&mut self, node: NodeRef) {
        let tag = self.nodes[node.index()];
        let opcode = Opcode::from_tag(tag)
            .unwrap_or_else(|| panic!("refresh_info: {node} has unknown opcode tag {tag}"));
        self.info[node].op_info = Some(opcode.info());
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of operand slots in the flat array.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The raw operand array.
    pub fn as_slice(&self) -> &[i64] {
        &self.nodes
    }

    pub fn info(&self, node: NodeRef) -> NodeInfo {
        self.info[node]
    }

    /// # Panics
    ///
    /// Panics if `node` does not start a record.
    pub fn op_info(&self, node: NodeRef) -> &'static OpInfo {
        self.info[node]
            .op_info
            .unwrap_or_else(|| panic!("op_info: {node} is not a node record"))
    }

    pub fn opcode(&self, node: NodeRef) -> Opcode {
        let tag = self.nodes[node.index()];
        Opcode::from_tag(tag)
            .unwrap_or_else(|| panic!("opcode: {node} has unknown opcode tag {tag}"))
    }

    pub fn num_children(&self, node: NodeRef) -> usize {
        match self.op_info(node).arity {
            Arity::Fixed(n) => n as usize,
            Arity::Variadic => self.nodes[node.index() + 1] as usize,
        }
    }

    /// Slot holding the first child of `node`.
    pub fn first_child_slot(&self, node: NodeRef) -> SlotRef {
        node.tag_slot().offset(1 + self.op_info(node).header_len())
    }

    /// Slot holding the `index`-th child of `node`.
    pub fn child_slot(&self, node: NodeRef, index: usize) -> SlotRef {
        assert!(
            index < self.num_children(node),
            "child_slot: {node} has no child #{index}"
        );
        self.first_child_slot(node).offset(index)
    }

    pub fn child(&self, node: NodeRef, index: usize) -> NodeRef {
        self.slot_node(self.child_slot(node, index))
    }

    pub fn children(&self, node: NodeRef) -> SmallVec<[NodeRef; 4]> {
        (0..self.num_children(node))
            .map(|i| self.child(node, i))
            .collect()
    }

    /// Immediate arguments of `node`.
    pub fn args(&self, node: NodeRef) -> &[i64] {
        let start = self.first_child_slot(node).index() + self.num_children(node);
        let end = start + self.op_info(node).nargs as usize;
        &self.nodes[start..end]
    }

    pub fn arg(&self, node: NodeRef, index: usize) -> i64 {
        self.args(node)[index]
    }

    /// Total number of slots the record of `node` occupies.
    pub fn record_len(&self, node: NodeRef) -> usize {
        let info = self.op_info(node);
        1 + info.header_len() + self.num_children(node) + info.nargs as usize
    }

    pub fn slot(&self, slot: SlotRef) -> i64 {
        self.nodes[slot.index()]
    }

    /// Read a child reference out of an operand slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot value is not a valid node id.
    pub fn slot_node(&self, slot: SlotRef) -> NodeRef {
        let value = self.nodes[slot.index()];
        NodeRef::from_slot_value(value)
            .unwrap_or_else(|| panic!("slot_node: {slot} holds {value}, not a node id"))
    }

    /// Overwrite a child slot with a node reference.
    ///
    /// **Warning**: this bypasses any reference tracking kept by a running
    /// pass; the optimizer is the only intended caller.
    pub fn set_slot_node(&mut self, slot: SlotRef, node: NodeRef) {
        self.nodes[slot.index()] = node.to_slot_value();
    }

    /// Decode `node` into its typed operand shape.
    pub fn view(&self, node: NodeRef) -> ExprOp {
        match self.opcode(node) {
            Opcode::Const => ExprOp::Const {
                value: self.arg(node, 0),
                size: self.arg(node, 1),
            },
            Opcode::Load => ExprOp::Load {
                addr: self.child(node, 0),
                size: self.arg(node, 0),
            },
            Opcode::Store => ExprOp::Store {
                addr: self.child(node, 0),
                value: self.child(node, 1),
                size: self.arg(node, 0),
            },
            Opcode::Addr => ExprOp::Addr {
                base: self.child(node, 0),
                offset: self.arg(node, 0),
            },
            Opcode::Idx => ExprOp::Index {
                base: self.child(node, 0),
                index: self.child(node, 1),
                scale: self.arg(node, 0),
            },
            Opcode::Copy => ExprOp::Copy {
                value: self.child(node, 0),
            },
            other => ExprOp::Other(other),
        }
    }

    /// Iterate over every record in array order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        let mut pos = 0;
        std::iter::from_fn(move || {
            if pos >= self.nodes.len() {
                return None;
            }
            let node = NodeRef::new(pos);
            pos += self.record_len(node);
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn push_node_lays_out_records() {
        let mut tree = ExprTree::new();
        let local = ops::local(&mut tree);
        let addr = ops::addr(&mut tree, local, 16);
        let load = ops::load(&mut tree, addr, 8);

        assert_eq!(local.index(), 0);
        assert_eq!(addr.index(), 1);
        assert_eq!(load.index(), 4);
        assert_eq!(
            tree.as_slice(),
            &[
                Opcode::Local.tag(),
                Opcode::Addr.tag(),
                0,
                16,
                Opcode::Load.tag(),
                1,
                8
            ]
        );
        assert_eq!(tree.child(load, 0), addr);
        assert_eq!(tree.args(addr), &[16]);
    }

    #[test]
    fn variadic_children_start_after_header() {
        let mut tree = ExprTree::new();
        let a = ops::local(&mut tree);
        let b = ops::stack(&mut tree);
        let block = ops::r#do(&mut tree, &[a, b]);

        assert_eq!(tree.num_children(block), 2);
        assert_eq!(tree.first_child_slot(block), block.tag_slot().offset(2));
        assert_eq!(tree.children(block).as_slice(), &[a, b]);
        assert_eq!(tree.record_len(block), 4);
    }

    #[test]
    fn view_decodes_index_shape() {
        let mut tree = ExprTree::new();
        let base = ops::local(&mut tree);
        let idx = ops::r#const(&mut tree, 4, 8);
        let node = ops::idx(&mut tree, base, idx, 8);

        assert_eq!(
            tree.view(node),
            ExprOp::Index {
                base,
                index: idx,
                scale: 8
            }
        );
        assert_eq!(tree.view(idx), ExprOp::Const { value: 4, size: 8 });
        assert_eq!(tree.view(base), ExprOp::Other(Opcode::Local));
    }

    #[test]
    fn iter_nodes_visits_each_record() {
        let mut tree = ExprTree::new();
        let a = ops::local(&mut tree);
        let c = ops::r#const(&mut tree, 1, 8);
        let sum = ops::add(&mut tree, a, c);
        let block = ops::r#do(&mut tree, &[sum]);

        let nodes: Vec<_> = tree.iter_nodes().collect();
        assert_eq!(nodes, vec![a, c, sum, block]);
    }

    #[test]
    fn from_raw_rebuilds_metadata() {
        let raw = vec![Opcode::Tc.tag(), Opcode::Load.tag(), 0, 8];
        let tree = ExprTree::from_raw(raw, vec![NodeRef::new(1)]).unwrap();

        assert_eq!(tree.opcode(NodeRef::new(1)), Opcode::Load);
        assert_eq!(tree.op_info(NodeRef::new(0)).name, "tc");
        assert_eq!(tree.roots(), &[NodeRef::new(1)]);
    }

    #[test]
    #[should_panic(expected = "takes 2 children")]
    fn push_node_rejects_wrong_arity() {
        let mut tree = ExprTree::new();
        let a = ops::local(&mut tree);
        tree.push_node(Opcode::Add, &[a], &[]);
    }
}
