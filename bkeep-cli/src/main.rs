use anyhow::Result;
use clap::Parser;
use colored::*;

mod api;
mod cli;
mod config;
mod import;
mod notify;
mod resource;

use cli::commands::{AppContext, fields, import::handle_import_command, sample, templates};
use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        log::debug!("Command failed: {:?}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins; otherwise warn, raised by -v/-vv
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Using API at {}", config.api.base_url);
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Fields => fields::handle_fields_command(&ctx).await,
        Commands::Templates {
            template_type,
            all,
            page,
            limit,
        } => templates::handle_templates_command(&ctx, template_type, all, page, limit).await,
        Commands::Sample { output, force } => {
            sample::handle_sample_command(&ctx, &output, force).await
        }
        Commands::Import(command) => handle_import_command(&ctx, command).await,
    }
}
