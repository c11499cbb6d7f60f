//! Signed certificate timestamps
//!
//! The signature tag is HMAC-SHA-256 under the log's secret over a
//! length-prefixed encoding of `(version, log_id, timestamp, domain, fingerprint)`.
//! Anyone can read an SCT; only the log can mint or check one.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::certificate::Fingerprint;
use crate::error::{CtError, Result};
use crate::sct::key::{LogId, LogKey};

type HmacSha256 = Hmac<Sha256>;

/// Only version understood by this log
pub const SCT_VERSION_V1: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sct {
    pub version: u8,
    pub log_id: LogId,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Hex HMAC tag
    pub signature: String,
}

impl Sct {
    /// Base64 of the SCT's JSON form
    pub fn encode(&self) -> Result<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CtError::VerificationError(format!("SCT is not base64: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CtError::VerificationError(format!("SCT is not valid JSON: {}", e)))
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Bytes covered by the signature tag
fn signed_payload(
    version: u8,
    log_id: &LogId,
    timestamp: u64,
    domain: &str,
    fingerprint: &Fingerprint,
) -> Result<Vec<u8>> {
    let domain_len = u16::try_from(domain.len())
        .map_err(|_| CtError::InvalidDomain(format!("domain too long: {} bytes", domain.len())))?;

    let mut payload = Vec::with_capacity(1 + 32 + 8 + 2 + domain.len() + 32);
    payload.push(version);
    payload.extend_from_slice(log_id.as_bytes());
    payload.extend_from_slice(&timestamp.to_be_bytes());
    payload.extend_from_slice(&domain_len.to_be_bytes());
    payload.extend_from_slice(domain.as_bytes());
    payload.extend_from_slice(fingerprint.as_bytes());
    Ok(payload)
}

fn compute_tag(key: &LogKey, payload: &[u8]) -> Result<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key.expose())
        .map_err(|e| CtError::ConfigError(format!("invalid log secret: {}", e)))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().into())
}

/// Mints SCTs for newly appended entries
#[derive(Debug, Clone)]
pub struct SctIssuer {
    key: Arc<LogKey>,
    log_id: LogId,
}

impl SctIssuer {
    pub fn new(key: LogKey, log_name: &str) -> Self {
        Self {
            key: Arc::new(key),
            log_id: LogId::from_name(log_name),
        }
    }

    pub fn log_id(&self) -> LogId {
        self.log_id
    }

    /// Issue an SCT stamped with the current time
    pub fn issue(&self, domain: &str, fingerprint: &Fingerprint) -> Result<Sct> {
        self.issue_at(domain, fingerprint, Utc::now())
    }

    /// Issue an SCT stamped with `issued_at`
    pub fn issue_at(
        &self,
        domain: &str,
        fingerprint: &Fingerprint,
        issued_at: DateTime<Utc>,
    ) -> Result<Sct> {
        let timestamp = u64::try_from(issued_at.timestamp_millis()).map_err(|_| {
            CtError::VerificationError(format!("timestamp before epoch: {}", issued_at))
        })?;
        let payload = signed_payload(SCT_VERSION_V1, &self.log_id, timestamp, domain, fingerprint)?;
        let tag = compute_tag(&self.key, &payload)?;

        debug!("Issued SCT for {} at {}", domain, timestamp);
        Ok(Sct {
            version: SCT_VERSION_V1,
            log_id: self.log_id,
            timestamp,
            signature: hex::encode(tag),
        })
    }

    /// Verifier sharing this issuer's secret
    pub fn verifier(&self) -> SctVerifier {
        SctVerifier {
            key: Arc::clone(&self.key),
            log_id: self.log_id,
        }
    }
}

/// Re-checks SCTs on lookup. Every failure path returns `false`.
#[derive(Debug, Clone)]
pub struct SctVerifier {
    key: Arc<LogKey>,
    log_id: LogId,
}

impl SctVerifier {
    pub fn new(key: LogKey, log_name: &str) -> Self {
        Self {
            key: Arc::new(key),
            log_id: LogId::from_name(log_name),
        }
    }

    pub fn log_id(&self) -> LogId {
        self.log_id
    }

    pub fn verify(&self, sct: &Sct, domain: &str, fingerprint: &Fingerprint, log_id: &LogId) -> bool {
        match self.check(sct, domain, fingerprint, log_id) {
            Ok(()) => true,
            Err(e) => {
                warn!("SCT rejected for {}: {}", domain, e);
                false
            }
        }
    }

    /// Verify an SCT in its base64 wire form
    pub fn verify_encoded(
        &self,
        encoded: &str,
        domain: &str,
        fingerprint: &Fingerprint,
        log_id: &LogId,
    ) -> bool {
        match Sct::decode(encoded) {
            Ok(sct) => self.verify(&sct, domain, fingerprint, log_id),
            Err(e) => {
                warn!("Malformed SCT for {}: {}", domain, e);
                false
            }
        }
    }

    fn check(&self, sct: &Sct, domain: &str, fingerprint: &Fingerprint, log_id: &LogId) -> Result<()> {
        if sct.version != SCT_VERSION_V1 {
            return Err(CtError::VerificationError(format!(
                "unsupported SCT version {}",
                sct.version
            )));
        }
        if &sct.log_id != log_id || log_id != &self.log_id {
            return Err(CtError::VerificationError(format!(
                "SCT log id {} does not match log {}",
                sct.log_id, self.log_id
            )));
        }

        let provided = hex::decode(&sct.signature)
            .map_err(|e| CtError::VerificationError(format!("signature is not hex: {}", e)))?;
        let payload = signed_payload(sct.version, &sct.log_id, sct.timestamp, domain, fingerprint)?;
        let expected = compute_tag(&self.key, &payload)?;

        if provided.len() != expected.len() || !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            return Err(CtError::VerificationError("signature mismatch".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    fn issuer() -> SctIssuer {
        SctIssuer::new(LogKey::from_bytes([42u8; 32]), "test-log")
    }

    fn fp(tag: &str) -> Fingerprint {
        Fingerprint::of_der(tag.as_bytes())
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let sct = issuer.issue("a.example", &fp("a")).unwrap();
        assert_eq!(sct.version, SCT_VERSION_V1);
        assert_eq!(sct.signature.len(), 64);
        assert!(issuer
            .verifier()
            .verify(&sct, "a.example", &fp("a"), &issuer.log_id()));
    }

    #[test]
    fn test_binding_covers_every_field() {
        let issuer = issuer();
        let verifier = issuer.verifier();
        let log_id = issuer.log_id();
        let sct = issuer.issue("a.example", &fp("a")).unwrap();

        assert!(!verifier.verify(&sct, "b.example", &fp("a"), &log_id));
        assert!(!verifier.verify(&sct, "a.example", &fp("b"), &log_id));
        assert!(!verifier.verify(&sct, "a.example", &fp("a"), &LogId::from_name("other")));

        let mut shifted = sct.clone();
        shifted.timestamp += 1;
        assert!(!verifier.verify(&shifted, "a.example", &fp("a"), &log_id));

        let mut future = sct.clone();
        future.version = 1;
        assert!(!verifier.verify(&future, "a.example", &fp("a"), &log_id));
    }

    #[test]
    fn test_other_key_rejects() {
        let sct = issuer().issue("a.example", &fp("a")).unwrap();
        let stranger = SctVerifier::new(LogKey::from_bytes([1u8; 32]), "test-log");
        assert!(!stranger.verify(&sct, "a.example", &fp("a"), &stranger.log_id()));
    }

    #[test]
    fn test_public_hash_forgery_rejected() {
        // The forgeable construction: hash of public fields only
        let issuer = issuer();
        let forged = Sct {
            version: SCT_VERSION_V1,
            log_id: issuer.log_id(),
            timestamp: 1_700_000_000_000,
            signature: hex::encode(sha2::Sha256::digest(
                format!("a.example{}", fp("a")).as_bytes(),
            )),
        };
        assert!(!issuer
            .verifier()
            .verify(&forged, "a.example", &fp("a"), &issuer.log_id()));
    }

    #[test]
    fn test_malformed_signature_fails_closed() {
        let issuer = issuer();
        let mut sct = issuer.issue("a.example", &fp("a")).unwrap();
        sct.signature = "not hex".to_string();
        assert!(!issuer
            .verifier()
            .verify(&sct, "a.example", &fp("a"), &issuer.log_id()));

        sct.signature = "abcd".to_string();
        assert!(!issuer
            .verifier()
            .verify(&sct, "a.example", &fp("a"), &issuer.log_id()));
    }

    #[test]
    fn test_encoded_form() {
        let issuer = issuer();
        let verifier = issuer.verifier();
        let sct = issuer.issue("a.example", &fp("a")).unwrap();
        let encoded = sct.encode().unwrap();

        assert_eq!(Sct::decode(&encoded).unwrap(), sct);
        assert!(verifier.verify_encoded(&encoded, "a.example", &fp("a"), &issuer.log_id()));
        assert!(!verifier.verify_encoded("%%%", "a.example", &fp("a"), &issuer.log_id()));
        assert!(!verifier.verify_encoded(
            &STANDARD.encode(b"{\"version\":0}"),
            "a.example",
            &fp("a"),
            &issuer.log_id()
        ));
    }

    #[test]
    fn test_issued_at_matches_timestamp() {
        let when = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let sct = issuer().issue_at("a.example", &fp("a"), when).unwrap();
        assert_eq!(sct.timestamp, 1_700_000_000_123);
        assert_eq!(sct.issued_at(), Some(when));
    }
}
