use anyhow::Result;
use clap::Parser;

mod args;

use args::{Cli, Commands};
use cli::commands::run::RunOptions;
use cli::commands::{disassemble, helpers, run, verify};
use cli::logging::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Run {
            path,
            args,
            config,
            data,
            arity,
            void,
            json,
        } => run::run_file(&RunOptions {
            path,
            args,
            config,
            data,
            arity,
            void,
            json,
        }),
        Commands::Verify { path, config } => verify::verify_file(&path, config.as_deref()),
        Commands::Disassemble { path } => disassemble::disassemble_file(&path),
        Commands::Helpers { config, json } => helpers::helpers_command(config.as_deref(), json),
    }
}
