use anyhow::Result;
use colored::*;

use super::AppContext;
use crate::api::ImportApi;
use crate::cli::output::Table;
use crate::import::mapping::default_import_fields;

pub async fn handle_fields_command(ctx: &AppContext) -> Result<()> {
    let fields = match ctx.client.fetch_import_fields().await {
        Ok(fields) if !fields.is_empty() => fields,
        Ok(_) => {
            log::warn!("Server returned no import fields");
            println!("{}", "Server returned no fields; showing the built-in set".yellow());
            default_import_fields()
        }
        Err(e) => {
            log::warn!("Failed to load import fields: {:#}", e);
            println!("{}", "Could not reach the server; showing the built-in set".yellow());
            default_import_fields()
        }
    };

    let mut table = Table::new(["Key", "Label", "Required", "Format"]);
    for field in &fields {
        table.add_row(vec![
            field.key.clone(),
            field.label.clone(),
            if field.required { "yes".into() } else { String::new() },
            field.format_hint.clone().unwrap_or_default(),
        ]);
    }
    table.print();
    Ok(())
}
