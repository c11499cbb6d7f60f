//! Seeding the log from a JSON Lines file
//!
//! Each non-blank line is one `{"domain": ..., "certificate": ...}` record,
//! appended in file order. The log lives in memory only, so this is how a
//! restarted service gets its known-good certificates back.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::certificate::CertificateInput;
use crate::error::{CtError, Result};
use crate::log::store::CtLogStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRecord {
    pub domain: String,
    pub certificate: CertificateInput,
}

/// Parse JSON Lines text into records. Errors carry the 1-based line number.
pub fn parse_bootstrap(contents: &str) -> Result<Vec<BootstrapRecord>> {
    let mut records = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let record: BootstrapRecord = serde_json::from_str(line).map_err(|e| {
            CtError::BootstrapError(format!("line {}: {}", number + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_bootstrap_file(path: impl AsRef<Path>) -> Result<Vec<BootstrapRecord>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CtError::BootstrapError(format!("{}: {}", path.display(), e)))?;
    parse_bootstrap(&contents)
}

/// Append every record in order, returning the number appended. Stops at the
/// first record the log rejects.
pub async fn replay(store: &CtLogStore, records: &[BootstrapRecord]) -> Result<u64> {
    for (position, record) in records.iter().enumerate() {
        store
            .append(&record.domain, &record.certificate)
            .await
            .map_err(|e| {
                CtError::BootstrapError(format!(
                    "record {} ({}): {}",
                    position + 1,
                    record.domain,
                    e
                ))
            })?;
    }
    Ok(records.len() as u64)
}

pub async fn bootstrap_from_file(store: &CtLogStore, path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let records = load_bootstrap_file(path)?;
    let appended = replay(store, &records).await?;
    let snapshot = store.snapshot().await;
    info!(
        "Bootstrapped {} entries from {}, tree size {}",
        appended,
        path.display(),
        snapshot.size
    );
    Ok(appended)
}
