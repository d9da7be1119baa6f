use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use super::AppContext;
use crate::api::ImportApi;

pub async fn handle_sample_command(ctx: &AppContext, output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let bytes = ctx
        .client
        .download_sample()
        .await
        .context("Failed to download sample file")?;

    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!("Wrote {} bytes to {}", bytes.len(), output.display());
    println!(
        "{} Sample file saved to {}",
        "✓".green().bold(),
        output.display().to_string().cyan()
    );
    Ok(())
}
