//! Command-line interface for the expression tree optimizer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jit_expr::OptimizeConfig;

#[derive(Parser)]
#[command(name = "jitopt")]
#[command(about = "Optimize flat JIT expression trees", long_about = None)]
pub struct Cli {
    /// Log every rewrite (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Optimize a tree and print the result
    Optimize {
        /// Tree in text format
        file: PathBuf,

        /// Do not fold constant indexes into addresses
        #[arg(long)]
        no_fold: bool,

        /// Do not wrap shared loads in copies
        #[arg(long)]
        no_dedup: bool,

        /// Print rewrite counters to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Parse a tree and print it back with positional names
    Print {
        /// Tree in text format
        file: PathBuf,
    },
}

pub fn optimize_config(no_fold: bool, no_dedup: bool) -> OptimizeConfig {
    OptimizeConfig {
        fold_const_index: !no_fold,
        dedup_loads: !no_dedup,
    }
}
