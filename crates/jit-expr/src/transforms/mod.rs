//! In-place transformation passes over expression trees.

pub mod optimize;

pub use optimize::{OptimizeConfig, OptimizeResult, optimize, optimize_with_config};
