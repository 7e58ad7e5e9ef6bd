#![forbid(unsafe_code)]

//! `fl`: command-line surface for the factline fact ledger.

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use factline_core::{Ledger, LedgerConfig};
use output::OutputMode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "factline: append-only fact ledger with conflict arbitration",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Path to the ledger database.
    #[arg(long, global = true, env = "FACTLINE_DB", default_value = "factline.sqlite3")]
    db: PathBuf,

    /// Path to the config file.
    #[arg(long, global = true, env = "FACTLINE_CONFIG", default_value = "factline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize a ledger database",
        after_help = "EXAMPLES:\n    fl init\n    fl init --with-config"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        about = "Submit a candidate fact value through arbitration",
        after_help = "EXAMPLES:\n    fl submit --deal deal-1 --key financial.arr --value 500000 \\\n        --source document_extraction --confidence 70 --by parser-v2"
    )]
    Submit(cmd::submit::SubmitArgs),

    #[command(
        about = "Show resolved current facts for a deal",
        after_help = "EXAMPLES:\n    fl facts --deal deal-1\n    fl facts --deal deal-1 --category financial --history --json"
    )]
    Facts(cmd::facts::FactsArgs),

    #[command(
        about = "List pending reviews for a deal",
        after_help = "EXAMPLES:\n    fl reviews --deal deal-1"
    )]
    Reviews(cmd::reviews::ReviewsArgs),

    #[command(
        about = "Close a pending review",
        after_help = "EXAMPLES:\n    fl resolve --review 12 --decision accept-new --reason \"newer doc\" --by analyst-1\n    fl resolve --review 12 --decision override --value 510000 --reason \"founder call\" --by analyst-1"
    )]
    Resolve(cmd::resolve::ResolveArgs),

    #[command(
        about = "Show the raw event history for one fact key",
        after_help = "EXAMPLES:\n    fl log --deal deal-1 --key financial.arr"
    )]
    Log(cmd::log::LogArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = cli.output_mode();
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::render_error(output, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => cmd::init::run(args, &cli.db, output),
        Commands::Submit(args) => {
            let mut ledger = open_ledger(cli)?;
            cmd::submit::run(args, &mut ledger, output)
        }
        Commands::Facts(args) => {
            let ledger = open_ledger(cli)?;
            cmd::facts::run(args, &ledger, output)
        }
        Commands::Reviews(args) => {
            let ledger = open_ledger(cli)?;
            cmd::reviews::run(args, &ledger, output)
        }
        Commands::Resolve(args) => {
            let mut ledger = open_ledger(cli)?;
            cmd::resolve::run(args, &mut ledger, output)
        }
        Commands::Log(args) => {
            let ledger = open_ledger(cli)?;
            cmd::log::run(args, &ledger, output)
        }
    }
}

fn open_ledger(cli: &Cli) -> anyhow::Result<Ledger> {
    let config = LedgerConfig::load(&cli.config)?;
    tracing::debug!(db = %cli.db.display(), config = %cli.config.display(), "opening ledger");
    Ledger::open(&cli.db, config)
}
