//! Entity references for the flat expression tree.
//!
//! Each ref type is a thin `u32` wrapper so that node ids, operand slot
//! addresses and reference-chain edges live in distinct index spaces.

use cranelift_entity::entity_impl;

/// Position of a node record in the flat operand array.
///
/// A `NodeRef` always points at the opcode tag that starts a record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "n");

/// Position of a single operand slot in the flat operand array.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef(u32);
entity_impl!(SlotRef, "s");

/// Reference to a recorded parent-to-child edge in the optimizer's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeRef(u32);
entity_impl!(EdgeRef, "e");

impl NodeRef {
    /// The slot holding this node's opcode tag.
    pub fn tag_slot(self) -> SlotRef {
        SlotRef(self.0)
    }

    /// Decode a node reference stored in an operand slot.
    ///
    /// Returns `None` for negative values and values outside the `u32` range.
    pub fn from_slot_value(value: i64) -> Option<NodeRef> {
        u32::try_from(value).ok().map(NodeRef)
    }

    /// Encode this node reference as an operand slot value.
    pub fn to_slot_value(self) -> i64 {
        i64::from(self.0)
    }
}

impl SlotRef {
    /// The slot `n` positions after this one.
    pub fn offset(self, n: usize) -> SlotRef {
        let n = u32::try_from(n).expect("slot offset exceeds u32 range");
        SlotRef(self.0 + n)
    }
}
