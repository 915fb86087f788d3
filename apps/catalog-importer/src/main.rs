//! catalog-importer CLI

use catalog_importer::commands;
use catalog_importer::error::CliResult;
use catalog_importer::logging::{filter_for, init_logging};
use clap::{Parser, Subcommand};

/// Import catalog entries into a remote catalog
#[derive(Parser)]
#[command(name = "catalog-importer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync catalog types and entries from the configured sources
    Sync(commands::sync::SyncArgs),

    /// Validate an importer config file
    Validate(commands::validate::ValidateArgs),

    /// Print the records produced by each configured source
    Source(commands::source::SourceArgs),

    /// Generate a config importing local files into one catalog type
    Import(commands::import::ImportArgs),

    /// List the types attributes can reference
    Types(commands::types::TypesArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&filter_for(&cli.log_level, cli.debug), cli.log_json);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Source(args) => commands::source::execute(args).await,
        Commands::Import(args) => commands::import::execute(args).await,
        Commands::Types(args) => commands::types::execute(args).await,
    }
}
