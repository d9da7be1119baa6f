//! `bkeep import` subcommands

pub mod handler;

use std::path::PathBuf;

use clap::{Args, Subcommand};

pub use handler::handle_import_command;

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import accounts from an Excel (.xlsx, .xls) or CSV file
    File(ImportFileArgs),

    /// Create accounts from a predefined template
    Template {
        /// Template id (see `bkeep templates`)
        id: String,

        /// Apply without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Follow the progress of a queued import
    Status {
        /// Import job id
        id: String,
    },
}

#[derive(Args)]
pub struct ImportFileArgs {
    /// Spreadsheet or CSV to import
    pub path: PathBuf,

    /// Declared media type, for files without a recognised extension
    #[arg(long, value_name = "MIME")]
    pub content_type: Option<String>,

    /// The first row is data, not column names
    #[arg(long)]
    pub no_header: bool,

    /// Map a field to a column, e.g. --map accountName="Name"
    #[arg(long = "map", value_name = "FIELD=COLUMN", value_parser = parse_mapping)]
    pub mappings: Vec<(String, String)>,

    /// Leave out a data row (1-based, repeatable)
    #[arg(long, value_name = "ROW")]
    pub exclude: Vec<usize>,

    /// Prompt for mappings and rows to import
    #[arg(short, long)]
    pub interactive: bool,

    /// Import without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Return once a queued import is accepted instead of waiting for it
    #[arg(long)]
    pub no_wait: bool,
}

fn parse_mapping(s: &str) -> Result<(String, String), String> {
    let (field, column) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=COLUMN, got '{}'", s))?;
    let field = field.trim();
    let column = column.trim();
    if field.is_empty() || column.is_empty() {
        return Err(format!("expected FIELD=COLUMN, got '{}'", s));
    }
    Ok((field.to_string(), column.to_string()))
}
