//! Text format printer for expression trees.
//!
//! Prints every node reachable from the roots, children before parents,
//! followed by one `root` line per root:
//!
//! ```text
//! %0 = local
//! %11 = addr %0 32
//! %8 = load %11 8
//! root %8
//! ```
//!
//! Nodes are named by their array position, so the output parses back
//! with [`crate::parser::parse_tree`].

use std::fmt::{self, Write};

use cranelift_entity::{EntityRef, EntitySet};

use crate::refs::NodeRef;
use crate::tree::ExprTree;

/// Print `tree` in the text format.
pub fn print_tree(tree: &ExprTree) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_tree(tree, &mut out);
    out
}

fn write_tree(tree: &ExprTree, f: &mut impl Write) -> fmt::Result {
    let mut printed = EntitySet::new();
    for &root in tree.roots() {
        write_node(tree, f, &mut printed, root)?;
    }
    for &root in tree.roots() {
        writeln!(f, "root %{}", root.index())?;
    }
    Ok(())
}

fn write_node(
    tree: &ExprTree,
    f: &mut impl Write,
    printed: &mut EntitySet<NodeRef>,
    node: NodeRef,
) -> fmt::Result {
    if printed.contains(node) {
        return Ok(());
    }
    printed.insert(node);

    let children = tree.children(node);
    for &child in &children {
        write_node(tree, f, printed, child)?;
    }

    write!(f, "%{} = {}", node.index(), tree.opcode(node))?;
    for child in children {
        write!(f, " %{}", child.index())?;
    }
    for arg in tree.args(node) {
        write!(f, " {arg}")?;
    }
    writeln!(f)
}
