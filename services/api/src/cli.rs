use crate::report::{run_rubric, run_search, RubricArgs, SearchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use pronexus::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ProNexus",
    about = "Run executive searches and serve the search API from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a search to completion and print the ranked shortlist
    Search(SearchArgs),
    /// Describe the scoring rubric for a role
    Rubric(RubricArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed for the synthetic candidate generator
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Serve candidates from a CSV export instead of the synthetic generator
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Search(args) => run_search(args).await,
        Command::Rubric(args) => run_rubric(args),
    }
}
