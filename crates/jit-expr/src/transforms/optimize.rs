//! In-place expression tree optimizer.
//!
//! Runs as a single [`traverse`] pass with the `Once` policy and applies two
//! local rewrites while the tree is being walked:
//!
//! - **Load deduplication**: a `load` reached from a second consumer is
//!   wrapped in a `copy`, so the load executes once and every consumer reads
//!   the copied value.
//! - **Constant-index folding**: `idx(base, const(k), scale)` becomes
//!   `addr(base, k * scale)`.
//!
//! Every child slot the walk passes is recorded in an edge arena, chained
//! per child. Replacing a node walks its chain and rewrites each recorded
//! slot, including slots of ancestors that were visited earlier, then splices
//! the chain onto the replacement's. Slots that still hold a replaced node
//! when the walk reaches them are resolved through the replacement table.

use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{PrimaryMap, SecondaryMap};
use tracing::{debug, info, trace};

use crate::opcode::Opcode;
use crate::ops;
use crate::refs::{EdgeRef, NodeRef, SlotRef};
use crate::traverse::{TraversalPolicy, TreeVisitor, traverse};
use crate::tree::{ExprOp, ExprTree};

/// Configuration for the tree optimizer.
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    /// Fold `idx` nodes with a constant index into `addr`. Default: true.
    pub fold_const_index: bool,
    /// Wrap loads with more than one consumer in `copy`. Default: true.
    pub dedup_loads: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            fold_const_index: true,
            dedup_loads: true,
        }
    }
}

/// Result of running the tree optimizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeResult {
    /// Distinct node substitutions performed.
    pub replaced: usize,
    /// Slots rewritten because they still held an already replaced node
    /// when the walk reached them.
    pub propagated: usize,
    /// `idx` nodes folded into `addr`.
    pub folded: usize,
    /// Loads wrapped in `copy`.
    pub deduplicated: usize,
}

impl OptimizeResult {
    pub fn changed(&self) -> bool {
        self.replaced > 0
    }
}

/// Optimize a tree in place using the default configuration.
pub fn optimize(tree: &mut ExprTree) -> OptimizeResult {
    optimize_with_config(tree, OptimizeConfig::default())
}

/// Optimize a tree in place with a custom configuration.
pub fn optimize_with_config(tree: &mut ExprTree, config: OptimizeConfig) -> OptimizeResult {
    let mut optimizer = Optimizer::new(tree, config);
    traverse(tree, &mut optimizer, TraversalPolicy::Once);
    tree.resolve_roots(|root| optimizer.resolve(root));

    let result = optimizer.result;
    info!(
        replaced = result.replaced,
        propagated = result.propagated,
        folded = result.folded,
        deduplicated = result.deduplicated,
        "expression tree optimized"
    );
    result
}

/// A recorded child slot: `slot` inside `parent` holds the child whose chain
/// this edge belongs to.
#[derive(Clone, Copy, Debug)]
struct Edge {
    parent: NodeRef,
    slot: SlotRef,
    next: PackedOption<EdgeRef>,
}

/// Head of a node's referrer chain and its length.
#[derive(Clone, Copy, Debug, Default)]
struct RefInfo {
    head: PackedOption<EdgeRef>,
    count: u32,
}

struct Optimizer {
    config: OptimizeConfig,
    edges: PrimaryMap<EdgeRef, Edge>,
    refs: SecondaryMap<NodeRef, RefInfo>,
    replacements: SecondaryMap<NodeRef, PackedOption<NodeRef>>,
    result: OptimizeResult,
}

impl Optimizer {
    fn new(tree: &ExprTree, config: OptimizeConfig) -> Self {
        Self {
            config,
            edges: PrimaryMap::with_capacity(tree.len()),
            refs: SecondaryMap::with_capacity(tree.len()),
            replacements: SecondaryMap::with_capacity(tree.len()),
            result: OptimizeResult::default(),
        }
    }

    /// Record that `slot` inside `parent` holds `child`.
    fn register(&mut self, parent: NodeRef, slot: SlotRef, child: NodeRef) {
        let edge = self.edges.push(Edge {
            parent,
            slot,
            next: self.refs[child].head,
        });
        let info = &mut self.refs[child];
        info.head = edge.into();
        info.count += 1;
        trace!(%parent, %slot, %child, %edge, "registered edge");
    }

    /// Make `replacement` take over every recorded reference to `node`.
    fn replace(&mut self, tree: &mut ExprTree, node: NodeRef, replacement: NodeRef) {
        debug!(%node, %replacement, opcode = %tree.opcode(replacement), "replacing node");

        let moved = std::mem::take(&mut self.refs[node]);
        let mut tail = None;
        let mut cursor = moved.head.expand();
        while let Some(edge) = cursor {
            let Edge { parent, slot, next } = self.edges[edge];
            trace!(%parent, %slot, "rewriting referrer slot");
            tree.set_slot_node(slot, replacement);
            tail = Some(edge);
            cursor = next.expand();
        }

        if let Some(tail) = tail {
            let target = &mut self.refs[replacement];
            self.edges[tail].next = target.head;
            target.head = moved.head;
        }
        self.refs[replacement].count += moved.count;

        self.replacements[node] = replacement.into();
        self.result.replaced += 1;
        tree.refresh_info(replacement);
    }

    /// Follow the replacement table from `node` to its final replacement.
    fn resolve(&self, mut node: NodeRef) -> NodeRef {
        while let Some(next) = self.replacements[node].expand() {
            node = next;
        }
        node
    }

    fn is_replaced(&self, node: NodeRef) -> bool {
        self.replacements[node].is_some()
    }

    fn dedup_load(&mut self, tree: &mut ExprTree, child: NodeRef) {
        if !self.config.dedup_loads
            || tree.opcode(child) != Opcode::Load
            || self.is_replaced(child)
            || self.refs[child].count == 0
        {
            return;
        }
        debug!(
            load = %child,
            consumers = self.refs[child].count,
            "wrapping shared load in copy"
        );
        let copy = ops::copy(tree, child);
        self.replace(tree, child, copy);
        let slot = tree.child_slot(copy, 0);
        self.register(copy, slot, child);
        self.result.deduplicated += 1;
    }

    fn fold_const_index(&mut self, tree: &mut ExprTree, node: NodeRef) {
        let ExprOp::Index { base, index, scale } = tree.view(node) else {
            return;
        };
        let ExprOp::Const { value, .. } = tree.view(index) else {
            return;
        };
        let Some(offset) = value.checked_mul(scale) else {
            debug!(%node, value, scale, "constant index offset overflows, not folding");
            return;
        };
        debug!(%node, %base, %index, scale, offset, "folding constant index");

        let addr = ops::addr(tree, base, offset);
        self.replace(tree, node, addr);
        let slot = tree.child_slot(addr, 0);
        self.register(addr, slot, base);
        self.result.folded += 1;
    }

    #[cfg(test)]
    fn referrers(&self, node: NodeRef) -> Vec<(NodeRef, SlotRef)> {
        let mut out = Vec::new();
        let mut cursor = self.refs[node].head.expand();
        while let Some(edge) = cursor {
            let data = self.edges[edge];
            out.push((data.parent, data.slot));
            cursor = data.next.expand();
        }
        out
    }
}

impl TreeVisitor for Optimizer {
    fn inorder(&mut self, tree: &mut ExprTree, node: NodeRef, index: usize) {
        let slot = tree.child_slot(node, index);
        let mut child = tree.slot_node(slot);

        self.dedup_load(tree, child);

        if self.is_replaced(child) {
            let replacement = self.resolve(child);
            debug!(parent = %node, %child, %replacement, "propagating replacement");
            tree.set_slot_node(slot, replacement);
            self.result.propagated += 1;
            child = replacement;
        }

        self.register(node, slot, child);
    }

    fn postorder(&mut self, tree: &mut ExprTree, node: NodeRef) {
        if self.config.fold_const_index {
            self.fold_const_index(tree, node);
        }
    }
}
