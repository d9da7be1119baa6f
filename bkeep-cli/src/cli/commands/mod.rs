//! Command handlers

pub mod fields;
pub mod import;
pub mod sample;
pub mod templates;

use std::sync::Arc;

use anyhow::Result;
use is_terminal::IsTerminal;
use serde_json::Value;

use crate::api::BkeepClient;
use crate::config::Config;

/// What every handler needs: loaded config and a client built from it
pub struct AppContext {
    pub config: Config,
    pub client: Arc<BkeepClient>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(BkeepClient::new(&config.api)?);
        Ok(Self { config, client })
    }
}

/// Prompts only make sense with a person on both ends
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Number of accounts in an accounts-list payload (bare array or paginated object)
pub fn account_count(accounts: &Value) -> Option<usize> {
    match accounts {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => ["accounts", "items", "data"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(account_count)
            .or_else(|| map.get("total").and_then(Value::as_u64).map(|n| n as usize)),
        _ => None,
    }
}
