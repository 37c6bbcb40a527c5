//! Text-to-text optimization pipeline.
//!
//! ```text
//! source text
//!     │
//!     ▼
//! parse_tree ─► ExprTree
//!     │
//!     ▼
//! validate_topological ─► builder-ordered tree
//!     │
//!     ▼
//! optimize_with_config ─► ExprTree (rewritten in place), OptimizeResult
//!     │
//!     ▼
//! validate_tree ─► every slot and root still names a record
//!     │
//!     ▼
//! print_tree ─► source text
//! ```

use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use jit_expr::validation::{validate_topological, validate_tree};
use jit_expr::{
    ExprTree, OptimizeConfig, OptimizeResult, ParseError, ValidationError, optimize_with_config,
    parse_tree, print_tree,
};
use tracing::debug;

#[derive(Debug, Display, Error, From)]
pub enum PipelineError {
    #[display("cannot read {}: {source}", path.display())]
    #[from(skip)]
    Io { path: PathBuf, source: io::Error },

    #[display("{_0}")]
    Parse(ParseError),

    #[display("{_0}")]
    Validation(ValidationError),
}

/// Printed tree plus the optimizer's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub text: String,
    pub result: OptimizeResult,
}

fn load(source: &str) -> Result<ExprTree, PipelineError> {
    let tree = parse_tree(source)?;
    validate_topological(&tree)?;
    debug!(slots = tree.len(), roots = tree.roots().len(), "parsed expression tree");
    Ok(tree)
}

fn read(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse, optimize and print `source`.
pub fn optimize_source(
    source: &str,
    config: &OptimizeConfig,
) -> Result<PipelineOutput, PipelineError> {
    let mut tree = load(source)?;
    let result = optimize_with_config(&mut tree, config.clone());
    validate_tree(&tree)?;
    Ok(PipelineOutput {
        text: print_tree(&tree),
        result,
    })
}

pub fn optimize_file(
    path: &Path,
    config: &OptimizeConfig,
) -> Result<PipelineOutput, PipelineError> {
    optimize_source(&read(path)?, config)
}

/// Parse and re-print `source` without optimizing, renaming every node by
/// its position.
pub fn format_source(source: &str) -> Result<String, PipelineError> {
    Ok(print_tree(&load(source)?))
}

pub fn format_file(path: &Path) -> Result<String, PipelineError> {
    format_source(&read(path)?)
}
