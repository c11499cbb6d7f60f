//! Certificate fetching
//!
//! When a caller supplies neither a fingerprint nor a certificate, the
//! verification service can ask a `CertificateFetcher` for the certificate the
//! domain is currently presenting. Fetching is pluggable so tests and embedders
//! can supply their own transport.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::certificate::CertificateInput;
use crate::error::{CtError, Result};

#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    /// Certificate currently served for `domain`
    async fn fetch(&self, domain: &str) -> Result<CertificateInput>;
}

/// Run `fetcher` under a deadline
pub async fn fetch_with_timeout(
    fetcher: &dyn CertificateFetcher,
    domain: &str,
    timeout: Duration,
) -> Result<CertificateInput> {
    debug!("Fetching certificate for {} (timeout {:?})", domain, timeout);
    match tokio::time::timeout(timeout, fetcher.fetch(domain)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Certificate fetch for {} timed out", domain);
            Err(CtError::FetchTimeout {
                domain: domain.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Fetcher backed by a fixed domain-to-certificate table
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    certificates: HashMap<String, CertificateInput>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: &str, certificate: CertificateInput) -> Self {
        self.certificates.insert(domain.to_ascii_lowercase(), certificate);
        self
    }
}

#[async_trait]
impl CertificateFetcher for StaticFetcher {
    async fn fetch(&self, domain: &str) -> Result<CertificateInput> {
        self.certificates
            .get(domain)
            .cloned()
            .ok_or_else(|| CtError::FetchFailed(format!("no certificate known for {}", domain)))
    }
}
