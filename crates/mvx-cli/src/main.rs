//! MVX CLI
//!
//! Command-line interface for model records

use clap::{ArgAction, Parser, Subcommand};
use mvx_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "mvx")]
#[command(about = "MVX - Inspect and render hierarchical model records", long_about = None)]
struct Cli {
    /// Log kernel operations to stderr (-vv for trace records)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a sample model record
    Seed(commands::seed::SeedArgs),
    /// Print the item tree of a record
    Inspect(commands::inspect::InspectArgs),
    /// Print a record through a projection
    Render(commands::render::RenderArgs),
}

fn main() {
    let cli = Cli::parse();
    init(Profile::from_verbosity(cli.verbose));

    let result = match cli.command {
        Commands::Seed(args) => commands::seed::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Render(args) => commands::render::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
