//! Append-only CT log
//!
//! Entries, the store that owns them, and file-based seeding.

pub mod bootstrap;
pub mod entry;
pub mod store;

pub use bootstrap::{bootstrap_from_file, load_bootstrap_file, parse_bootstrap, replay, BootstrapRecord};
pub use entry::{DomainLog, EntrySummary, LogEntry, LogSnapshot, RootSummary};
pub use store::{CtLogStore, LogView};
