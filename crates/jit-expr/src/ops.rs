//! Shape constructors for expression tree nodes.
//!
//! Each function appends one record to the tree and returns its id. These
//! are the fragment-synthesis entry points: the optimizer uses [`copy`] and
//! [`addr`] to materialize replacement nodes, tests use the rest.

use crate::opcode::Opcode;
use crate::refs::NodeRef;
use crate::tree::ExprTree;

pub fn local(tree: &mut ExprTree) -> NodeRef {
    tree.push_node(Opcode::Local, &[], &[])
}

pub fn stack(tree: &mut ExprTree) -> NodeRef {
    tree.push_node(Opcode::Stack, &[], &[])
}

pub fn tc(tree: &mut ExprTree) -> NodeRef {
    tree.push_node(Opcode::Tc, &[], &[])
}

pub fn r#const(tree: &mut ExprTree, value: i64, size: i64) -> NodeRef {
    tree.push_node(Opcode::Const, &[], &[value, size])
}

pub fn load(tree: &mut ExprTree, addr: NodeRef, size: i64) -> NodeRef {
    tree.push_node(Opcode::Load, &[addr], &[size])
}

pub fn store(tree: &mut ExprTree, addr: NodeRef, value: NodeRef, size: i64) -> NodeRef {
    tree.push_node(Opcode::Store, &[addr, value], &[size])
}

/// `addr(base, offset)`: a fixed offset from `base`.
pub fn addr(tree: &mut ExprTree, base: NodeRef, offset: i64) -> NodeRef {
    tree.push_node(Opcode::Addr, &[base], &[offset])
}

/// `idx(base, index, scale)`: `base + index * scale`.
pub fn idx(tree: &mut ExprTree, base: NodeRef, index: NodeRef, scale: i64) -> NodeRef {
    tree.push_node(Opcode::Idx, &[base, index], &[scale])
}

/// `copy(value)`: materialize `value` once so that its result can be reused.
pub fn copy(tree: &mut ExprTree, value: NodeRef) -> NodeRef {
    tree.push_node(Opcode::Copy, &[value], &[])
}

pub fn add(tree: &mut ExprTree, lhs: NodeRef, rhs: NodeRef) -> NodeRef {
    tree.push_node(Opcode::Add, &[lhs, rhs], &[])
}

pub fn mul(tree: &mut ExprTree, lhs: NodeRef, rhs: NodeRef) -> NodeRef {
    tree.push_node(Opcode::Mul, &[lhs, rhs], &[])
}

pub fn r#do(tree: &mut ExprTree, body: &[NodeRef]) -> NodeRef {
    tree.push_node(Opcode::Do, body, &[])
}

pub fn discard(tree: &mut ExprTree, value: NodeRef) -> NodeRef {
    tree.push_node(Opcode::Discard, &[value], &[])
}
