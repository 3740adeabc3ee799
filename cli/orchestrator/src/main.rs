//! Triplegate CLI
//!
//! Entry point of the `triplegate` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

use std::process::ExitCode;

use clap::Parser;
use cli::{generate, init_config, Cli, Commands, Result};
use config::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("triplegate: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            let mut config = Config::load(cli.config.as_deref())?;
            args.apply(&mut config);
            let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
            logging::init(level, config.logging.file.as_deref())?;

            let report = generate(&config)?;
            println!("{report}");
            for path in &report.written {
                println!("  {}", path.display());
            }
        }
        Commands::InitConfig { path } => {
            let path = init_config(path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
