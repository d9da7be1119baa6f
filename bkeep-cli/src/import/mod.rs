//! Chart-of-accounts import wizard
//!
//! Host-agnostic core: file parsing, column mapping, row review, selective
//! re-encoding and submission with progress polling. A host (the CLI, or
//! anything else) drives it through [`ImportWizard`].

pub mod cell;
pub mod error;
pub mod mapping;
pub mod materialize;
pub mod orchestrator;
pub mod parser;
pub mod preview;
pub mod progress;
pub mod reencode;
pub mod state;
pub mod wizard;

#[cfg(test)]
pub mod testing;

pub use preview::ReviewRow;
pub use progress::{PollOutcome, spawn_progress_poll};
pub use state::{ImportMethod, ImportResults, ImportStep, ResultStatus, SelectedFile};
pub use wizard::ImportWizard;
