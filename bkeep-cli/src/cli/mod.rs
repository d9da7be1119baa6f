//! Command-line interface

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::import::ImportCommands;

#[derive(Parser)]
#[command(name = "bkeep")]
#[command(about = "Import a chart of accounts into BKeep from a spreadsheet or a template")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/bkeep/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the account fields a file can be mapped to
    Fields,

    /// List chart-of-accounts templates
    Templates {
        /// Template type filter
        #[arg(long = "type", default_value = "chart_of_accounts")]
        template_type: String,

        /// Include inactive templates
        #[arg(long)]
        all: bool,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Download the sample import spreadsheet
    Sample {
        /// Where to write the file
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Import accounts
    #[command(subcommand)]
    Import(ImportCommands),
}
