//! Flat JIT expression trees.
//!
//! An [`ExprTree`] stores every node record in one operand array; node ids
//! are positions in that array. This crate provides the opcode table, the
//! tree and its shape constructors, a depth-first traversal driver, a text
//! format, structural validation and the in-place tree optimizer.

pub mod opcode;
pub mod ops;
pub mod parser;
pub mod printer;
pub mod refs;
pub mod transforms;
pub mod traverse;
pub mod tree;
pub mod validation;

pub use opcode::{Arity, OpInfo, Opcode};
pub use parser::{ParseError, parse_tree};
pub use printer::print_tree;
pub use refs::{EdgeRef, NodeRef, SlotRef};
pub use transforms::{OptimizeConfig, OptimizeResult, optimize, optimize_with_config};
pub use traverse::{TraversalPolicy, TreeVisitor, traverse};
pub use tree::{ExprOp, ExprTree, NodeInfo};
pub use validation::{ValidationError, ValidationErrorKind, ValidationResult};
