//! CT Log Store
//!
//! Owns the entry sequence, the Merkle log derived from it, and the per-domain
//! indexes. All state sits behind one `RwLock`: appends hold the write lock for
//! the whole fingerprint-to-SCT step, and readers work from a `LogView` so a
//! request sees one consistent `(root, size)` from start to finish.

use chrono::{SubsecRound, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::certificate::{self, CertificateInput, Fingerprint};
use crate::domain::resolve_domain;
use crate::error::{CtError, Result};
use crate::log::entry::{DomainLog, EntrySummary, LogEntry, LogSnapshot, RootSummary};
use crate::merkle::{InclusionProof, MerkleHash, MerkleLog};
use crate::sct::{LogId, SctIssuer, SctVerifier};

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<LogEntry>,
    tree: MerkleLog,
    by_domain: BTreeMap<String, Vec<u64>>,
    latest: HashMap<(String, Fingerprint), u64>,
}

impl LogState {
    fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            root: self.tree.root(),
            size: self.tree.size(),
        }
    }
}

/// Shared handle to the log. Cloning shares the same underlying state.
#[derive(Debug, Clone)]
pub struct CtLogStore {
    state: Arc<RwLock<LogState>>,
    issuer: SctIssuer,
    verifier: SctVerifier,
}

impl CtLogStore {
    pub fn new(issuer: SctIssuer) -> Self {
        let verifier = issuer.verifier();
        Self {
            state: Arc::new(RwLock::new(LogState::default())),
            issuer,
            verifier,
        }
    }

    pub fn log_id(&self) -> LogId {
        self.issuer.log_id()
    }

    /// Record a certificate observed for `domain`. This is the only path that
    /// mutates the log.
    pub async fn append(&self, domain: &str, certificate: &CertificateInput) -> Result<LogEntry> {
        let domain = resolve_domain(domain)?;
        let fingerprint = certificate::fingerprint(certificate)?;

        let mut state = self.state.write().await;

        let index = state.entries.len() as u64;
        if state.tree.size() != index {
            return Err(CtError::invariant(format!(
                "tree has {} leaves but log has {} entries",
                state.tree.size(),
                index
            )));
        }

        // SCT timestamps carry millisecond precision
        let issued_at = Utc::now().trunc_subsecs(3);
        let sct = self.issuer.issue_at(&domain, &fingerprint, issued_at)?;

        let (leaf_index, root) = state.tree.append(&fingerprint);
        debug_assert_eq!(leaf_index, index);

        let entry = LogEntry {
            index,
            domain: domain.clone(),
            fingerprint: fingerprint.clone(),
            issued_at,
            sct,
        };

        state.entries.push(entry.clone());
        state.by_domain.entry(domain.clone()).or_default().push(index);
        state.latest.insert((domain, fingerprint), index);

        info!("Appended CT entry {}, root {}", entry.describe(), root);
        Ok(entry)
    }

    /// Read-locked view for multi-step queries
    pub async fn view(&self) -> LogView<'_> {
        LogView {
            state: self.state.read().await,
            verifier: &self.verifier,
        }
    }

    /// Most recent entry for `(domain, fingerprint)`, exact match only
    pub async fn lookup_latest(&self, domain: &str, fingerprint: &Fingerprint) -> Option<LogEntry> {
        self.view().await.lookup_latest(domain, fingerprint).cloned()
    }

    pub async fn snapshot(&self) -> LogSnapshot {
        self.view().await.snapshot()
    }

    pub async fn prove_inclusion(&self, index: u64) -> Result<InclusionProof> {
        self.view().await.prove_inclusion(index)
    }

    pub async fn current_root(&self) -> RootSummary {
        self.view().await.root_summary()
    }

    pub async fn list_domain(&self, domain: &str) -> Vec<EntrySummary> {
        self.view().await.list_domain(domain)
    }

    pub async fn list_all(&self) -> Vec<DomainLog> {
        self.view().await.list_all()
    }

    pub async fn len(&self) -> u64 {
        self.view().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Re-derive the tree and indexes from the entry sequence and compare them
    /// with the maintained state.
    pub async fn check_integrity(&self) -> Result<LogSnapshot> {
        self.view().await.check_integrity()
    }

    /// Drop every entry. Only test harnesses and bootstrap call this.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let dropped = state.entries.len();
        *state = LogState::default();
        warn!("CT log reset, {} entries dropped", dropped);
    }
}

/// Consistent read access to the log. Holds the read lock until dropped, so
/// appends wait rather than interleave with a half-finished query.
pub struct LogView<'a> {
    state: RwLockReadGuard<'a, LogState>,
    verifier: &'a SctVerifier,
}

impl<'a> LogView<'a> {
    pub fn snapshot(&self) -> LogSnapshot {
        self.state.snapshot()
    }

    pub fn len(&self) -> u64 {
        self.state.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn entry(&self, index: u64) -> Option<&LogEntry> {
        self.state.entries.get(index as usize)
    }

    pub fn lookup_latest(&self, domain: &str, fingerprint: &Fingerprint) -> Option<&LogEntry> {
        let domain = resolve_domain(domain).ok()?;
        let index = *self.state.latest.get(&(domain, fingerprint.clone()))?;
        self.entry(index)
    }

    /// Most recent matching entry among the first `tree_size` entries
    pub fn lookup_latest_within(
        &self,
        domain: &str,
        fingerprint: &Fingerprint,
        tree_size: u64,
    ) -> Option<&LogEntry> {
        let domain = resolve_domain(domain).ok()?;
        self.state
            .by_domain
            .get(&domain)?
            .iter()
            .rev()
            .filter(|index| **index < tree_size)
            .filter_map(|index| self.entry(*index))
            .find(|entry| &entry.fingerprint == fingerprint)
    }

    pub fn prove_inclusion(&self, index: u64) -> Result<InclusionProof> {
        self.state.tree.prove_inclusion(index)
    }

    pub fn prove_inclusion_at(&self, index: u64, tree_size: u64) -> Result<InclusionProof> {
        self.state.tree.prove_inclusion_at(index, tree_size)
    }

    pub fn root_at(&self, size: u64) -> Result<MerkleHash> {
        self.state.tree.root_at(size)
    }

    pub fn verify_sct(&self, entry: &LogEntry) -> bool {
        self.verifier
            .verify(&entry.sct, &entry.domain, &entry.fingerprint, &self.verifier.log_id())
    }

    pub fn domain_count(&self) -> usize {
        self.state.by_domain.len()
    }

    pub fn root_summary(&self) -> RootSummary {
        RootSummary {
            root: self.state.tree.root(),
            entry_count: self.len(),
            domain_count: self.domain_count(),
        }
    }

    pub fn list_domain(&self, domain: &str) -> Vec<EntrySummary> {
        let Ok(domain) = resolve_domain(domain) else {
            return Vec::new();
        };
        self.state
            .by_domain
            .get(&domain)
            .map(|indexes| self.summaries(indexes))
            .unwrap_or_default()
    }

    pub fn list_all(&self) -> Vec<DomainLog> {
        self.state
            .by_domain
            .iter()
            .map(|(domain, indexes)| DomainLog {
                domain: domain.clone(),
                entries: self.summaries(indexes),
            })
            .collect()
    }

    fn summaries(&self, indexes: &[u64]) -> Vec<EntrySummary> {
        indexes
            .iter()
            .filter_map(|i| self.entry(*i))
            .map(LogEntry::summary)
            .collect()
    }

    pub fn check_integrity(&self) -> Result<LogSnapshot> {
        let state = &*self.state;
        let snapshot = state.snapshot();

        let rebuilt = MerkleLog::from_fingerprints(state.entries.iter().map(|e| &e.fingerprint));
        if rebuilt.size() != snapshot.size || rebuilt.root() != snapshot.root {
            return Err(CtError::invariant(format!(
                "rebuilt tree (size {}, root {:?}) disagrees with maintained tree (size {}, root {:?})",
                rebuilt.size(),
                rebuilt.root(),
                snapshot.size,
                snapshot.root
            )));
        }

        for (position, entry) in state.entries.iter().enumerate() {
            if entry.index != position as u64 {
                return Err(CtError::invariant(format!(
                    "entry at position {} claims index {}",
                    position, entry.index
                )));
            }
            if !self.verify_sct(entry) {
                return Err(CtError::invariant(format!(
                    "stored SCT for entry {} does not verify",
                    entry.index
                )));
            }
        }

        let indexed: usize = state.by_domain.values().map(Vec::len).sum();
        if indexed != state.entries.len() {
            return Err(CtError::invariant(format!(
                "domain index holds {} positions for {} entries",
                indexed,
                state.entries.len()
            )));
        }

        for ((domain, fingerprint), index) in &state.latest {
            match self.entry(*index) {
                Some(entry) if &entry.domain == domain && &entry.fingerprint == fingerprint => {}
                _ => {
                    return Err(CtError::invariant(format!(
                        "lookup index for {} points at mismatched entry {}",
                        domain, index
                    )))
                }
            }
        }

        debug!("CT log integrity verified: {} entries", snapshot.size);
        Ok(snapshot)
    }
}
