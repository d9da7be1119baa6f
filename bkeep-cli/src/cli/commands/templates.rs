use anyhow::{Context, Result};
use colored::*;

use super::AppContext;
use crate::api::{ImportApi, TemplateFilter};
use crate::cli::output::Table;

pub async fn handle_templates_command(
    ctx: &AppContext,
    template_type: String,
    all: bool,
    page: u32,
    limit: u32,
) -> Result<()> {
    let filter = TemplateFilter {
        template_type: Some(template_type),
        is_active: if all { None } else { Some(true) },
        page,
        limit,
        ..Default::default()
    };

    let templates = ctx
        .client
        .list_templates(&filter)
        .await
        .context("Failed to list templates")?;

    if templates.is_empty() {
        println!("{}", "No templates found".yellow());
        return Ok(());
    }

    let mut table = Table::new(["Id", "Name", "Description"]);
    for template in templates {
        table.add_row(vec![
            template.id,
            template.name,
            template.description.unwrap_or_default(),
        ]);
    }
    table.print();
    println!();
    println!("Apply one with {}", "bkeep import template <ID>".cyan());
    Ok(())
}
