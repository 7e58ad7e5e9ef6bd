//! `fl init`: create the ledger database and a default config file.

use clap::Args;
use std::path::Path;

use factline_core::{Ledger, LedgerConfig};

use crate::output::{OutputMode, render_success};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Also write a default factline.toml next to the database.
    #[arg(long)]
    pub with_config: bool,
}

pub fn run(args: &InitArgs, db_path: &Path, output: OutputMode) -> anyhow::Result<()> {
    drop(Ledger::open(db_path, LedgerConfig::default())?);

    if args.with_config {
        let config_path = db_path.with_file_name("factline.toml");
        if !config_path.exists() {
            std::fs::write(&config_path, LedgerConfig::default().to_toml_string()?)?;
        }
    }

    render_success(output, &format!("Initialized ledger at {}", db_path.display()))
}
