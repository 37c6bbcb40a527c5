//! Expression tree text format parser.
//!
//! Parses the line-oriented format produced by [`crate::printer`]:
//!
//! ```text
//! # comments run to the end of the line
//! %base = local
//! %four = const 4 8
//! %elem = idx %base %four 8
//! %val  = load %elem 8
//! root %val
//! ```
//!
//! Each node statement names an opcode, then its child references, then
//! its immediates. Children must be defined on an earlier line.
//!
//! # Two-stage parsing
//!
//! 1. **Raw parse**: winnow combinators parse one line into a `RawStmt`.
//! 2. **Tree build**: `TreeBuilder` checks names and shapes and appends the
//!    record to the tree.

use std::collections::HashMap;

use derive_more::{Display, Error};
use smallvec::SmallVec;
use winnow::ascii::{self, space0, space1};
use winnow::combinator::{alt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::opcode::{Arity, Opcode};
use crate::refs::NodeRef;
use crate::tree::ExprTree;

// ============================================================================
// Error type
// ============================================================================

/// Parse error for the expression tree text format.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
#[display("parse error at line {line}: {message}")]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

// ============================================================================
// Raw statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum RawStmt<'a> {
    Node {
        name: &'a str,
        opcode: &'a str,
        operands: Vec<RawOperand<'a>>,
    },
    Root(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawOperand<'a> {
    Ref(&'a str),
    Imm(i64),
}

// ============================================================================
// Winnow parsers
// ============================================================================

/// Parse an identifier: [a-zA-Z_][a-zA-Z0-9_]*
fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Parse a node reference: %name or %number
fn node_ref<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded(
        '%',
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
    .parse_next(input)
}

fn immediate(input: &mut &str) -> ModalResult<i64> {
    ascii::dec_int(input)
}

fn operand<'a>(input: &mut &'a str) -> ModalResult<RawOperand<'a>> {
    alt((node_ref.map(RawOperand::Ref), immediate.map(RawOperand::Imm))).parse_next(input)
}

/// `%name = opcode operand*`
fn node_stmt<'a>(input: &mut &'a str) -> ModalResult<RawStmt<'a>> {
    let name = node_ref.parse_next(input)?;
    (space0, '=', space0).parse_next(input)?;
    let opcode = ident.parse_next(input)?;
    let operands = repeat(0.., preceded(space1, operand)).parse_next(input)?;
    space0.parse_next(input)?;
    Ok(RawStmt::Node {
        name,
        opcode,
        operands,
    })
}

/// `root %name`
fn root_stmt<'a>(input: &mut &'a str) -> ModalResult<RawStmt<'a>> {
    preceded(("root", space1), node_ref)
        .map(RawStmt::Root)
        .parse_next(input)
}

fn statement<'a>(input: &mut &'a str) -> ModalResult<RawStmt<'a>> {
    alt((root_stmt, node_stmt)).parse_next(input)
}

// ============================================================================
// TreeBuilder (Raw -> ExprTree)
// ============================================================================

struct TreeBuilder<'a> {
    tree: ExprTree,
    names: HashMap<&'a str, NodeRef>,
    line: usize,
}

impl<'a> TreeBuilder<'a> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn lookup(&self, name: &str) -> Result<NodeRef, ParseError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| self.error(format!("undefined node `%{name}`")))
    }

    fn build_stmt(&mut self, stmt: RawStmt<'a>) -> Result<(), ParseError> {
        match stmt {
            RawStmt::Root(name) => {
                let node = self.lookup(name)?;
                self.tree.add_root(node);
            }
            RawStmt::Node {
                name,
                opcode,
                operands,
            } => {
                if self.names.contains_key(name) {
                    return Err(self.error(format!("node `%{name}` is defined twice")));
                }
                let opcode = Opcode::from_name(opcode)
                    .ok_or_else(|| self.error(format!("unknown opcode `{opcode}`")))?;
                let node = self.build_node(opcode, &operands)?;
                self.names.insert(name, node);
            }
        }
        Ok(())
    }

    fn build_node(
        &mut self,
        opcode: Opcode,
        operands: &[RawOperand<'_>],
    ) -> Result<NodeRef, ParseError> {
        let mut children: SmallVec<[NodeRef; 4]> = SmallVec::new();
        let mut args: SmallVec<[i64; 4]> = SmallVec::new();
        for operand in operands {
            match *operand {
                RawOperand::Ref(name) => {
                    if !args.is_empty() {
                        return Err(self.error(format!(
                            "`{opcode}`: child `%{name}` follows an immediate"
                        )));
                    }
                    children.push(self.lookup(name)?);
                }
                RawOperand::Imm(value) => args.push(value),
            }
        }

        let info = opcode.info();
        if let Arity::Fixed(n) = info.arity
            && children.len() != n as usize
        {
            return Err(self.error(format!(
                "`{opcode}` takes {n} children, got {}",
                children.len()
            )));
        }
        if args.len() != info.nargs as usize {
            return Err(self.error(format!(
                "`{opcode}` takes {} immediates, got {}",
                info.nargs,
                args.len()
            )));
        }
        Ok(self.tree.push_node(opcode, &children, &args))
    }
}

/// Parse the text format into a tree.
pub fn parse_tree(source: &str) -> Result<ExprTree, ParseError> {
    let mut builder = TreeBuilder {
        tree: ExprTree::new(),
        names: HashMap::new(),
        line: 0,
    };
    for (idx, line) in source.lines().enumerate() {
        builder.line = idx + 1;
        let text = line.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let stmt = statement.parse(text).map_err(|e| {
            builder.error(format!(
                "unexpected input at column {}: `{}`",
                e.offset() + 1,
                text
            ))
        })?;
        builder.build_stmt(stmt)?;
    }
    Ok(builder.tree)
}
