use anyhow::Result;
use clap::{Parser, Subcommand};
use indexer::{run_build, BuildArgs};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a word-position index and run prefix queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a directory of .txt files, then optionally write it and run queries
    Build(BuildArgs),
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => {
            let outcome = run_build(&args)?;
            tracing::info!(
                files = outcome.files,
                words = outcome.index.len(),
                "done"
            );
            Ok(())
        }
    }
}
