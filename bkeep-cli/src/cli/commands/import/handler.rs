//! Import command handlers, driving the wizard from the terminal

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect, Select};

use super::{ImportCommands, ImportFileArgs};
use crate::api::ImportApi;
use crate::cli::commands::{AppContext, account_count, is_interactive};
use crate::cli::output::{Table, print_preview_summary, print_results, print_step};
use crate::import::mapping::missing_required;
use crate::import::materialize::account_id;
use crate::import::orchestrator::results_from_progress;
use crate::import::{
    ImportMethod, ImportStep, ImportWizard, PollOutcome, ReviewRow, SelectedFile,
    spawn_progress_poll,
};
use crate::notify::TerminalNotifier;

const REVIEW_PREVIEW_ROWS: usize = 20;

pub async fn handle_import_command(ctx: &AppContext, command: ImportCommands) -> Result<()> {
    match command {
        ImportCommands::File(args) => handle_file_import(ctx, args).await,
        ImportCommands::Template { id, yes } => handle_template_import(ctx, id, yes).await,
        ImportCommands::Status { id } => handle_status(ctx, id).await,
    }
}

fn new_wizard(ctx: &AppContext) -> ImportWizard {
    ImportWizard::new(
        ctx.client.clone(),
        Arc::new(TerminalNotifier),
        ctx.config.import.clone(),
    )
}

async fn handle_file_import(ctx: &AppContext, args: ImportFileArgs) -> Result<()> {
    let interactive = args.interactive && is_interactive();
    if args.interactive && !interactive {
        log::warn!("--interactive ignored: not attached to a terminal");
    }

    let mut wizard = new_wizard(ctx);
    wizard.load_fields().await;
    wizard.set_method(ImportMethod::File);
    wizard.set_has_header_row(!args.no_header);

    // Step 1
    print_step(ImportStep::Source.number(), ImportStep::Source.label());
    let mut file = SelectedFile::new(&args.path);
    if let Some(media_type) = &args.content_type {
        file = file.with_media_type(media_type);
    }
    wizard.select_file(file).await?;
    println!(
        "  {} ({} rows, {} columns)",
        args.path.display().to_string().cyan(),
        wizard.store().raw_file_data().len(),
        wizard.store().file_headers().len()
    );
    wizard.next().await?;

    // Step 2
    print_step(ImportStep::Mapping.number(), ImportStep::Mapping.label());
    for (field, column) in &args.mappings {
        if !wizard.fields().iter().any(|f| &f.key == field) {
            anyhow::bail!("Unknown field '{}' (see `bkeep fields`)", field);
        }
        if !wizard.store().file_headers().iter().any(|h| h == column) {
            anyhow::bail!("Column '{}' not found in {}", column, args.path.display());
        }
        wizard.map_field(field, column);
    }
    if interactive {
        prompt_mappings(&mut wizard)?;
    }
    print_mappings(&wizard);

    if !wizard.can_proceed() {
        let missing: Vec<String> = missing_required(wizard.fields(), wizard.store().field_mappings())
            .iter()
            .map(|f| f.key.clone())
            .collect();
        anyhow::bail!(
            "Required fields are not mapped: {}. Use --map FIELD=COLUMN{}",
            missing.join(", "),
            if args.no_header {
                " (not possible without a header row)"
            } else {
                ""
            }
        );
    }
    wizard.next().await?;

    // Step 3
    print_step(ImportStep::Review.number(), ImportStep::Review.label());
    let total = wizard.store().parsed_accounts().len();
    for row in &args.exclude {
        if *row == 0 || *row > total {
            anyhow::bail!("--exclude {}: the file has {} data rows", row, total);
        }
        let id = account_id(row - 1);
        if wizard.store().is_selected(&id) {
            wizard.toggle_account(&id);
        }
    }
    if interactive {
        prompt_selection(&mut wizard)?;
    }
    print_review(&wizard, wizard.review_rows());

    let selected = wizard.store().selected_account_ids().len();
    if selected == 0 {
        println!(
            "  {}",
            "No rows selected: the whole file will be imported".yellow()
        );
    }
    if !confirm(
        &format!("Import {} of {} accounts?", if selected == 0 { total } else { selected }, total),
        args.yes,
    )? {
        println!("Import cancelled");
        return Ok(());
    }

    submit_and_finish(ctx, &mut wizard, args.no_wait).await
}

async fn handle_template_import(ctx: &AppContext, id: String, yes: bool) -> Result<()> {
    let mut wizard = new_wizard(ctx);
    wizard.set_method(ImportMethod::Template);
    wizard.select_template(Some(id.clone()));

    print_step(ImportStep::Source.number(), ImportStep::Source.label());
    println!("  Template {}", id.cyan());
    wizard.next().await?;

    print_step(ImportStep::Review.number(), ImportStep::Review.label());
    match wizard.preview_summary() {
        Some(summary) => print_preview_summary(summary),
        None => anyhow::bail!("Could not load a preview for template '{}'", id),
    }
    print_review(&wizard, wizard.review_rows());

    if !confirm("Apply this template?", yes)? {
        println!("Import cancelled");
        return Ok(());
    }

    submit_and_finish(ctx, &mut wizard, false).await
}

async fn submit_and_finish(ctx: &AppContext, wizard: &mut ImportWizard, no_wait: bool) -> Result<()> {
    print_step(ImportStep::Complete.number(), ImportStep::Complete.label());
    wizard.next().await?;

    if wizard.step() != ImportStep::Complete {
        anyhow::bail!("Import did not complete");
    }

    if wizard.store().import_results().is_none() {
        let Some(import_id) = wizard.store().import_id().map(str::to_string) else {
            anyhow::bail!("Import finished without results");
        };
        println!("  Queued as {}", import_id.cyan());

        if no_wait {
            println!("  Follow it with {}", format!("bkeep import status {}", import_id).cyan());
            return Ok(());
        }

        if let Some(handle) = wizard.poll_handle() {
            watch_progress(handle.subscribe());
        }
        println!("  Waiting for the import to finish...");
    }

    if let Some(results) = wizard.wait_for_completion().await? {
        print_results(results);
    }

    print_account_count(ctx).await;
    Ok(())
}

async fn handle_status(ctx: &AppContext, id: String) -> Result<()> {
    let api: Arc<dyn ImportApi> = ctx.client.clone();
    let mut handle = spawn_progress_poll(api, id.clone(), ctx.config.import.poll_interval());
    watch_progress(handle.subscribe());

    match handle.outcome().await {
        Some(PollOutcome::Finished(progress)) => {
            print_results(&results_from_progress(&progress));
            if let Err(e) = ctx.client.refetch_accounts().await {
                log::warn!("Failed to refresh accounts: {:#}", e);
            }
            print_account_count(ctx).await;
            Ok(())
        }
        Some(PollOutcome::Failed(message)) => {
            anyhow::bail!("Failed to check progress of import {}: {}", id, message)
        }
        None => Ok(()),
    }
}

/// Print each progress change until the sender goes away
fn watch_progress(mut rx: tokio::sync::watch::Receiver<Option<crate::api::ImportProgress>>) {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let Some(progress) = rx.borrow_and_update().clone() else {
                continue;
            };
            println!(
                "  {} {}/{} rows ({} failed)",
                progress.status.label().dimmed(),
                progress.successful_rows,
                progress.total_rows,
                progress.failed_rows
            );
        }
    });
}

async fn print_account_count(ctx: &AppContext) {
    match ctx.client.accounts().await {
        Ok(accounts) => {
            if let Some(n) = account_count(&accounts) {
                println!("Chart of accounts now has {} accounts", n.to_string().bold());
            }
        }
        Err(e) => log::warn!("Failed to load accounts: {:#}", e),
    }
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes || !is_interactive() {
        return Ok(true);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact()
        .context("Failed to read confirmation")
}

/// Offer every header for each field; pre-select the current mapping
fn prompt_mappings(wizard: &mut ImportWizard) -> Result<()> {
    let headers: Vec<String> = wizard.store().file_headers().to_vec();
    if headers.is_empty() {
        return Ok(());
    }

    let mut choices = vec!["(not mapped)".to_string()];
    choices.extend(headers.iter().cloned());

    let fields = wizard.fields().to_vec();
    let theme = ColorfulTheme::default();
    for field in fields {
        let current = wizard
            .store()
            .field_mappings()
            .get(&field.key)
            .and_then(|col| headers.iter().position(|h| h == col))
            .map(|i| i + 1)
            .unwrap_or(0);

        let prompt = if field.required {
            format!("{} (required)", field.label)
        } else {
            field.label.clone()
        };
        let choice = Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(&choices)
            .default(current)
            .interact()
            .context("Failed to read mapping")?;

        if choice > 0 {
            wizard.map_field(&field.key, &headers[choice - 1]);
        } else if current > 0 {
            wizard.map_field(&field.key, "");
        }
    }
    Ok(())
}

/// One line per data row, showing every column of the original file
fn prompt_selection(wizard: &mut ImportWizard) -> Result<()> {
    let accounts = wizard.store().parsed_accounts();
    let ids: Vec<String> = accounts.iter().map(|a| a.id.clone()).collect();
    let items: Vec<String> = accounts
        .iter()
        .map(|account| {
            account
                .raw_data
                .iter()
                .map(|(_, value)| value.to_string())
                .filter(|v| !v.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect();
    let defaults: Vec<bool> = ids.iter().map(|id| wizard.store().is_selected(id)).collect();

    let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Accounts to import (space toggles)")
        .items(&items)
        .defaults(&defaults)
        .interact()
        .context("Failed to read selection")?;

    wizard.deselect_all();
    for i in chosen {
        wizard.toggle_account(&ids[i]);
    }
    Ok(())
}

fn print_mappings(wizard: &ImportWizard) {
    let mut table = Table::new(["Field", "Column", ""]);
    for field in wizard.fields() {
        let column = wizard
            .store()
            .field_mappings()
            .get(&field.key)
            .cloned()
            .unwrap_or_default();
        let note = if field.required && column.is_empty() {
            "required".red().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![field.label.clone(), column, note]);
    }
    table.print();
}

fn print_review(wizard: &ImportWizard, rows: Vec<ReviewRow>) {
    if rows.is_empty() {
        println!("  {}", "Nothing to review".yellow());
        return;
    }

    let fields: Vec<_> = wizard
        .fields()
        .iter()
        .filter(|f| rows.iter().any(|r| !r.value(&f.key).is_empty()))
        .cloned()
        .collect();

    let mut headers = vec![String::new()];
    headers.extend(fields.iter().map(|f| f.label.clone()));
    let mut table = Table::new(headers);

    for row in rows.iter().take(REVIEW_PREVIEW_ROWS) {
        let marker = if !row.selectable {
            " "
        } else if wizard.store().is_selected(&row.id) {
            "✓"
        } else {
            "✗"
        };
        let mut cells = vec![marker.to_string()];
        cells.extend(fields.iter().map(|f| row.value(&f.key).to_string()));
        table.add_row(cells);
    }
    table.print();

    if rows.len() > REVIEW_PREVIEW_ROWS {
        println!("  ... and {} more", rows.len() - REVIEW_PREVIEW_ROWS);
    }
}
