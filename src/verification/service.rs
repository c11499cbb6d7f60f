//! Verification service
//!
//! Turns a `(domain, observed certificate)` query into a verdict. Every query
//! ends in a `VerificationReport`; failures become ERROR reports instead of
//! propagating to the caller.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::certificate::{self, Fingerprint};
use crate::domain::resolve_domain;
use crate::error::{CtError, Result};
use crate::fetch::{fetch_with_timeout, CertificateFetcher};
use crate::log::CtLogStore;
use crate::merkle::{check_inclusion, hash_leaf, MerkleHash};
use crate::verification::report::{
    FailureKind, Verdict, VerificationReport, VerificationRequest,
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone)]
pub struct VerificationService {
    store: CtLogStore,
    fetcher: Option<Arc<dyn CertificateFetcher>>,
    fetch_timeout: Duration,
}

impl VerificationService {
    pub fn new(store: CtLogStore) -> Self {
        Self {
            store,
            fetcher: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Consult `fetcher` when a request carries neither fingerprint nor
    /// certificate. Calls are bounded by the fetch timeout.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn CertificateFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn store(&self) -> &CtLogStore {
        &self.store
    }

    /// Verify against the log's own current root
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationReport {
        self.run(request, None).await
    }

    /// Verify against a root the caller obtained elsewhere, such as one this
    /// log published at `tree_size`. The proof is built at that size, so an
    /// honest earlier root still verifies after later appends.
    pub async fn verify_against_root(
        &self,
        request: &VerificationRequest,
        trusted_root: MerkleHash,
        tree_size: u64,
    ) -> VerificationReport {
        self.run(request, Some((trusted_root, tree_size))).await
    }

    async fn run(
        &self,
        request: &VerificationRequest,
        trusted: Option<(MerkleHash, u64)>,
    ) -> VerificationReport {
        let report = match resolve_domain(&request.domain) {
            Err(e) => VerificationReport::error(request.domain.trim(), None, &e),
            Ok(domain) => match self.observed_fingerprint(&domain, request).await {
                Err(e) => VerificationReport::error(domain, None, &e),
                Ok(fingerprint) => self.check_log(&domain, &fingerprint, trusted).await,
            },
        };
        log_outcome(&report);
        report
    }

    /// Explicit fingerprint, then certificate, then the fetcher
    async fn observed_fingerprint(
        &self,
        domain: &str,
        request: &VerificationRequest,
    ) -> Result<Fingerprint> {
        if let Some(fp) = request.fingerprint.as_deref().filter(|s| !s.trim().is_empty()) {
            return Fingerprint::parse(fp);
        }
        if let Some(cert) = &request.certificate {
            return certificate::fingerprint(cert);
        }
        match &self.fetcher {
            Some(fetcher) => {
                let cert = fetch_with_timeout(fetcher.as_ref(), domain, self.fetch_timeout).await?;
                certificate::fingerprint(&cert)
            }
            None => Err(CtError::FingerprintUnavailable(format!(
                "no fingerprint or certificate supplied for {}",
                domain
            ))),
        }
    }

    /// Everything below runs under one read view, so the root, size, proof and
    /// entry all come from the same log state.
    async fn check_log(
        &self,
        domain: &str,
        fingerprint: &Fingerprint,
        trusted: Option<(MerkleHash, u64)>,
    ) -> VerificationReport {
        let view = self.store.view().await;
        let snapshot = view.snapshot();
        let observed = fingerprint.display_form();

        let (entry, root, tree_size) = match trusted {
            None => {
                let Some(entry) = view.lookup_latest(domain, fingerprint) else {
                    return VerificationReport::not_found(
                        domain,
                        observed,
                        snapshot.root,
                        snapshot.size,
                    );
                };
                let Some(root) = snapshot.root else {
                    let err = CtError::invariant(format!(
                        "entry {} found but the tree has no root",
                        entry.index
                    ));
                    return VerificationReport::error(domain, Some(observed), &err);
                };
                (entry, root, snapshot.size)
            }
            Some((_, size)) if size > snapshot.size => {
                let err = CtError::InvalidTreeSize(format!(
                    "tree size {} exceeds log size {}",
                    size, snapshot.size
                ));
                return VerificationReport::error(domain, Some(observed), &err);
            }
            Some((root, size)) => match view.lookup_latest_within(domain, fingerprint, size) {
                Some(entry) => (entry, root, size),
                None if view.lookup_latest(domain, fingerprint).is_some() => {
                    let err = CtError::InvalidTreeSize(format!(
                        "tree of size {} predates the entry for {}",
                        size, domain
                    ));
                    return VerificationReport::error(domain, Some(observed), &err);
                }
                None => {
                    return VerificationReport::not_found(domain, observed, Some(root), size);
                }
            },
        };

        let proof = match view.prove_inclusion_at(entry.index, tree_size) {
            Ok(proof) => proof,
            Err(e) => return VerificationReport::error(domain, Some(observed), &e),
        };

        let proof_valid = if proof.leaf_hash != hash_leaf(fingerprint.as_bytes()) {
            warn!("Proof leaf for {} does not match observed fingerprint", domain);
            false
        } else {
            match check_inclusion(&proof, &root) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Inclusion check for {} failed: {}", domain, e);
                    false
                }
            }
        };
        let sct_valid = view.verify_sct(entry);

        let (verdict, message) = match (proof_valid, sct_valid) {
            (true, true) => (
                Verdict::Valid,
                format!(
                    "Certificate for {} is logged at index {} under root {}",
                    domain, entry.index, root
                ),
            ),
            (false, true) => (
                Verdict::Tampered,
                format!("Inclusion proof for {} does not match root {}", domain, root),
            ),
            (true, false) => (
                Verdict::Tampered,
                format!("SCT for {} failed verification", domain),
            ),
            (false, false) => (
                Verdict::Tampered,
                format!("Inclusion proof and SCT for {} both failed verification", domain),
            ),
        };

        VerificationReport {
            domain: domain.to_string(),
            verdict,
            fingerprint: Some(observed),
            root: Some(root),
            tree_size,
            proof_valid,
            sct_valid,
            issued_at: Some(entry.issued_at),
            leaf_index: Some(entry.index),
            proof: Some(proof),
            sct: Some(entry.sct.clone()),
            mitm_status: verdict.mitm_status(),
            message,
            failure: None,
        }
    }
}

fn log_outcome(report: &VerificationReport) {
    match report.verdict {
        Verdict::Valid => info!("CT check {}: VALID at tree size {}", report.domain, report.tree_size),
        Verdict::NotFound => warn!("CT check {}: NOT_FOUND. {}", report.domain, report.message),
        Verdict::Tampered => error!(
            "CT check {}: TAMPERED, attack suspected. {}",
            report.domain, report.message
        ),
        Verdict::Error => match report.failure.as_ref().map(|f| f.kind) {
            Some(FailureKind::Internal) => error!(
                "CT check {}: ERROR, service bug. {}",
                report.domain, report.message
            ),
            _ => warn!("CT check {}: ERROR. {}", report.domain, report.message),
        },
    }
}
