//! Driver for the flat expression tree optimizer.
//!
//! The heavy lifting lives in the `jit-expr` crate; this crate wires the text
//! format, validation and the optimizer into a single [`pipeline`].

pub mod pipeline;

pub use pipeline::{
    PipelineError, PipelineOutput, format_file, format_source, optimize_file, optimize_source,
};
