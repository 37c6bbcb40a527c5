//! `jitopt` entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use jitopt::pipeline::{PipelineError, format_file, optimize_file};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<(), PipelineError> {
    match command {
        Command::Optimize {
            file,
            no_fold,
            no_dedup,
            stats,
        } => {
            let config = cli::optimize_config(no_fold, no_dedup);
            let output = optimize_file(&file, &config)?;
            print!("{}", output.text);
            if stats {
                let r = &output.result;
                eprintln!(
                    "replaced: {}, propagated: {}, folded: {}, deduplicated: {}",
                    r.replaced, r.propagated, r.folded, r.deduplicated
                );
            }
        }
        Command::Print { file } => {
            print!("{}", format_file(&file)?);
        }
    }
    Ok(())
}
