mod resolve;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;

#[derive(Parser, Debug)]
#[command(name = "depsat", author, version, about = "Resolve package dependency scenarios", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a scenario file and print the resulting operations
    Resolve(resolve::ResolveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Resolve(args) => resolve::execute(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::from(resolve::EXIT_CONFIGURATION)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
