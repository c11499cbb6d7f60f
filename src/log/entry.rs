//! CT Log Entry
//!
//! One appended certificate observation. Entries are immutable once created and
//! are only ever produced by `CtLogStore::append`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::Fingerprint;
use crate::merkle::{hash_leaf, MerkleHash};
use crate::sct::Sct;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Position in the global append order, equal to the Merkle leaf index
    pub index: u64,
    pub domain: String,
    pub fingerprint: Fingerprint,
    pub issued_at: DateTime<Utc>,
    pub sct: Sct,
}

impl LogEntry {
    pub fn leaf_hash(&self) -> MerkleHash {
        hash_leaf(self.fingerprint.as_bytes())
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            index: self.index,
            fingerprint: self.fingerprint.display_form(),
            issued_at: self.issued_at,
            sct: self.sct.clone(),
        }
    }

    /// Human-readable one-liner for logs
    pub fn describe(&self) -> String {
        format!(
            "#{} {} {} at {}",
            self.index,
            self.domain,
            self.fingerprint.display_form(),
            self.issued_at.to_rfc3339()
        )
    }
}

/// Public view of an entry as listed per domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub index: u64,
    pub fingerprint: String,
    pub issued_at: DateTime<Utc>,
    pub sct: Sct,
}

/// All entries recorded for one domain, in append order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLog {
    pub domain: String,
    pub entries: Vec<EntrySummary>,
}

/// Root and size captured together under one read of the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub root: Option<MerkleHash>,
    pub size: u64,
}

/// Introspection summary of the whole log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSummary {
    pub root: Option<MerkleHash>,
    pub entry_count: u64,
    pub domain_count: usize,
}
