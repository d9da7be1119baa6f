//! BKeep REST API module
//!
//! Typed access to the chart-of-accounts endpoints the import wizard uses,
//! plus the query cache that imports invalidate.

pub mod cache;
pub mod client;
pub mod models;

pub use cache::ACCOUNTS_KEY;
pub use client::{BkeepClient, ImportApi};
pub use models::{ImportProgress, TemplateFilter};
