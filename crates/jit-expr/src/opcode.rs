//! Opcode table for expression tree nodes.
//!
//! Every opcode is declared once in the `expr_ops!` invocation below, which
//! generates the closed [`Opcode`] enum together with its [`OpInfo`] table.
//! The info table decides the record layout of a node:
//!
//! ```text
//! [tag, (count if variadic), child ids..., immediate args...]
//! ```

use std::fmt;

/// Number of child operands an opcode takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many children.
    Fixed(u8),
    /// Any number of children; the record carries the count in a header
    /// slot directly after the tag.
    Variadic,
}

/// Static shape information for an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    pub name: &'static str,
    pub arity: Arity,
    /// Number of immediate arguments following the children.
    pub nargs: u8,
}

impl OpInfo {
    pub fn is_variadic(&self) -> bool {
        matches!(self.arity, Arity::Variadic)
    }

    /// Number of header slots between the tag and the first child.
    pub fn header_len(&self) -> usize {
        if self.is_variadic() { 1 } else { 0 }
    }
}

const fn arity(nchild: i8) -> Arity {
    if nchild < 0 {
        Arity::Variadic
    } else {
        Arity::Fixed(nchild as u8)
    }
}

macro_rules! expr_ops {
    ($($variant:ident => $name:literal, $nchild:literal, $nargs:literal;)*) => {
        /// Expression tree opcode.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// All opcodes, in tag order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];
        }

        static OP_INFO: &[OpInfo] = &[
            $(OpInfo { name: $name, arity: arity($nchild), nargs: $nargs },)*
        ];
    };
}

expr_ops! {
    // leaf references into the interpreter state
    Local => "local", 0, 0;
    Stack => "stack", 0, 0;
    Tc => "tc", 0, 0;
    Cu => "cu", 0, 0;
    Frame => "frame", 0, 0;

    // memory
    Load => "load", 1, 1;
    Store => "store", 2, 1;
    Const => "const", 0, 2;
    Addr => "addr", 1, 1;
    Idx => "idx", 2, 1;
    Copy => "copy", 1, 0;

    // arithmetic
    Add => "add", 2, 0;
    Sub => "sub", 2, 0;
    Mul => "mul", 2, 0;
    And => "and", 2, 0;
    Or => "or", 2, 0;
    Xor => "xor", 2, 0;
    Not => "not", 1, 0;

    // comparison
    Lt => "lt", 2, 0;
    Le => "le", 2, 0;
    Eq => "eq", 2, 0;
    Ne => "ne", 2, 0;
    Ge => "ge", 2, 0;
    Gt => "gt", 2, 0;
    Nz => "nz", 1, 0;
    Zr => "zr", 1, 0;
    Flagval => "flagval", 1, 0;

    // control
    Do => "do", -1, 0;
    Dov => "dov", -1, 0;
    When => "when", 2, 0;
    If => "if", 3, 0;
    Ifv => "ifv", 3, 0;
    All => "all", -1, 0;
    Any => "any", -1, 0;
    Label => "label", 0, 1;
    Branch => "branch", 1, 0;
    Mark => "mark", 1, 0;
    Discard => "discard", 1, 0;
    Guard => "guard", 1, 2;

    // calls
    Call => "call", 2, 1;
    Callv => "callv", 2, 0;
    Arglist => "arglist", -1, 0;
    Carg => "carg", 1, 1;
}

impl Opcode {
    /// Shape information for this opcode.
    pub fn info(self) -> &'static OpInfo {
        &OP_INFO[self as usize]
    }

    /// The value stored in a record's tag slot.
    pub fn tag(self) -> i64 {
        self as i64
    }

    pub fn from_tag(tag: i64) -> Option<Opcode> {
        usize::try_from(tag)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Look up an opcode by its textual name.
    pub fn from_name(name: &str) -> Option<Opcode> {
        Self::ALL.iter().copied().find(|op| op.info().name == name)
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
