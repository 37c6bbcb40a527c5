//! Structural validation for expression trees.
//!
//! Trees produced by [`ExprTree::push_node`] are well formed by
//! construction. Raw operand arrays (see [`ExprTree::from_raw`]) and trees
//! that went through an in-place pass are checked here:
//!
//! 1. **Record scan**: every record decodes to a known opcode and fits in
//!    the array.
//! 2. **References**: every child slot and every root names the start of a
//!    record.
//! 3. **Ordering** (builder output only): every child record starts before
//!    its parent, which rules out cycles.

use cranelift_entity::{EntityRef, EntitySet};
use derive_more::{Display, Error};

use crate::opcode::{Arity, Opcode};
use crate::refs::NodeRef;
use crate::tree::ExprTree;

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
#[display("invalid expression tree at slot {slot}: {kind}")]
pub struct ValidationError {
    pub slot: usize,
    pub kind: ValidationErrorKind,
}

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[display("unknown opcode tag {_0}")]
    UnknownOpcode(i64),

    #[display("negative child count {_0}")]
    BadChildCount(i64),

    #[display("record needs {needed} slots but only {available} remain")]
    TruncatedRecord { needed: usize, available: usize },

    #[display("child reference {_0} does not name a node record")]
    DanglingChild(i64),

    #[display("child {child} does not precede its parent {parent}")]
    ForwardChild { parent: NodeRef, child: NodeRef },

    #[display("root {_0} does not name a node record")]
    BadRoot(NodeRef),
}

impl ValidationError {
    fn new(slot: usize, kind: ValidationErrorKind) -> Self {
        Self { slot, kind }
    }
}

/// Split a raw operand array into records, returning the start of each.
pub fn scan_records(nodes: &[i64]) -> ValidationResult<Vec<NodeRef>> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while pos < nodes.len() {
        let tag = nodes[pos];
        let opcode = Opcode::from_tag(tag)
            .ok_or_else(|| ValidationError::new(pos, ValidationErrorKind::UnknownOpcode(tag)))?;
        let info = opcode.info();
        let nchild = match info.arity {
            Arity::Fixed(n) => n as usize,
            Arity::Variadic => {
                let count = *nodes.get(pos + 1).ok_or_else(|| {
                    ValidationError::new(
                        pos,
                        ValidationErrorKind::TruncatedRecord {
                            needed: 2,
                            available: nodes.len() - pos,
                        },
                    )
                })?;
                usize::try_from(count).map_err(|_| {
                    ValidationError::new(pos + 1, ValidationErrorKind::BadChildCount(count))
                })?
            }
        };
        let needed = 1 + info.header_len() + nchild + info.nargs as usize;
        let available = nodes.len() - pos;
        if needed > available {
            return Err(ValidationError::new(
                pos,
                ValidationErrorKind::TruncatedRecord { needed, available },
            ));
        }
        starts.push(NodeRef::new(pos));
        pos += needed;
    }
    Ok(starts)
}

/// Check that every child slot and root names a node record.
pub fn validate_tree(tree: &ExprTree) -> ValidationResult<()> {
    let starts = record_set(tree)?;
    for node in tree.iter_nodes() {
        for i in 0..tree.num_children(node) {
            let slot = tree.child_slot(node, i);
            let value = tree.slot(slot);
            match NodeRef::from_slot_value(value) {
                Some(child) if starts.contains(child) => {}
                _ => {
                    return Err(ValidationError::new(
                        slot.index(),
                        ValidationErrorKind::DanglingChild(value),
                    ));
                }
            }
        }
    }
    for &root in tree.roots() {
        if !starts.contains(root) {
            return Err(ValidationError::new(
                root.index(),
                ValidationErrorKind::BadRoot(root),
            ));
        }
    }
    Ok(())
}

/// Check that every child record starts before its parent.
///
/// Holds for builder output; an optimized tree may reference nodes that
/// were appended after their referrers.
pub fn validate_topological(tree: &ExprTree) -> ValidationResult<()> {
    validate_tree(tree)?;
    for node in tree.iter_nodes() {
        for i in 0..tree.num_children(node) {
            let child = tree.child(node, i);
            if child >= node {
                return Err(ValidationError::new(
                    tree.child_slot(node, i).index(),
                    ValidationErrorKind::ForwardChild {
                        parent: node,
                        child,
                    },
                ));
            }
        }
    }
    Ok(())
}

fn record_set(tree: &ExprTree) -> ValidationResult<EntitySet<NodeRef>> {
    let mut set = EntitySet::new();
    for node in scan_records(tree.as_slice())? {
        set.insert(node);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn accepts_builder_output() {
        let mut tree = ExprTree::new();
        let base = ops::local(&mut tree);
        let val = ops::load(&mut tree, base, 8);
        let block = ops::r#do(&mut tree, &[val]);
        tree.add_root(block);

        assert_eq!(validate_topological(&tree), Ok(()));
    }

    #[test]
    fn rejects_unknown_tag() {
        let err = scan_records(&[Opcode::Local.tag(), 999]).unwrap_err();
        assert_eq!(err.slot, 1);
        assert_eq!(err.kind, ValidationErrorKind::UnknownOpcode(999));
    }

    #[test]
    fn rejects_truncated_record() {
        let err = scan_records(&[Opcode::Const.tag(), 4]).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationErrorKind::TruncatedRecord {
                needed: 3,
                available: 2
            }
        );
    }

    #[test]
    fn rejects_negative_variadic_count() {
        let err = scan_records(&[Opcode::Do.tag(), -3]).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::BadChildCount(-3));
    }

    #[test]
    fn rejects_child_pointing_into_a_record() {
        // `load` points at slot 2, which is the immediate of the `const`.
        let raw = vec![Opcode::Const.tag(), 1, 8, Opcode::Load.tag(), 2, 8];
        let err = ExprTree::from_raw(raw, vec![]).unwrap_err();
        assert_eq!(err.slot, 4);
        assert_eq!(err.kind, ValidationErrorKind::DanglingChild(2));
    }

    #[test]
    fn rejects_forward_child() {
        let raw = vec![Opcode::Load.tag(), 3, 8, Opcode::Tc.tag()];
        let err = ExprTree::from_raw(raw, vec![]).unwrap_err();
        assert!(matches!(
            err.kind,
            ValidationErrorKind::ForwardChild { .. }
        ));
    }

    #[test]
    fn rejects_bad_root() {
        let raw = vec![Opcode::Tc.tag()];
        let err = ExprTree::from_raw(raw, vec![NodeRef::new(5)]).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::BadRoot(NodeRef::new(5)));
        assert_eq!(
            err.to_string(),
            "invalid expression tree at slot 5: root n5 does not name a node record"
        );
    }
}
