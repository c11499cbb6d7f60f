//! Verification requests and reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::CertificateInput;
use crate::error::CtError;
use crate::merkle::{InclusionProof, MerkleHash};
use crate::sct::Sct;

/// Terminal state of one verification request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Valid,
    NotFound,
    Tampered,
    Error,
}

impl Verdict {
    pub fn mitm_status(self) -> MitmStatus {
        match self {
            Self::Valid => MitmStatus::Safe,
            Self::NotFound => MitmStatus::Suspicious,
            Self::Tampered => MitmStatus::Danger,
            Self::Error => MitmStatus::Unknown,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Valid => "VALID",
            Self::NotFound => "NOT_FOUND",
            Self::Tampered => "TAMPERED",
            Self::Error => "ERROR",
        };
        write!(f, "{}", label)
    }
}

/// Interception risk shown to end users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MitmStatus {
    Safe,
    Suspicious,
    Danger,
    Unknown,
}

/// Which side of the boundary an ERROR came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Bad domain, certificate, or fingerprint from the caller
    Input,
    /// The external certificate fetcher failed or timed out
    Fetch,
    /// The log broke one of its own invariants
    Internal,
}

impl FailureKind {
    pub fn of(err: &CtError) -> Self {
        if err.is_internal() {
            Self::Internal
        } else if err.is_fetch() {
            Self::Fetch
        } else {
            Self::Input
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&CtError> for Failure {
    fn from(err: &CtError) -> Self {
        Self {
            kind: FailureKind::of(err),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub domain: String,
    pub verdict: Verdict,
    /// Observed fingerprint in `SHA256:<hex>` form, when one was obtained
    pub fingerprint: Option<String>,
    /// Root the proof was checked against
    pub root: Option<MerkleHash>,
    pub tree_size: u64,
    pub proof_valid: bool,
    pub sct_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<InclusionProof>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sct: Option<Sct>,
    pub mitm_status: MitmStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl VerificationReport {
    /// ERROR report for a request that failed before or outside the log
    pub fn error(domain: impl Into<String>, fingerprint: Option<String>, err: &CtError) -> Self {
        Self {
            domain: domain.into(),
            verdict: Verdict::Error,
            fingerprint,
            root: None,
            tree_size: 0,
            proof_valid: false,
            sct_valid: false,
            issued_at: None,
            leaf_index: None,
            proof: None,
            sct: None,
            mitm_status: MitmStatus::Unknown,
            message: err.to_string(),
            failure: Some(Failure::from(err)),
        }
    }

    pub fn not_found(
        domain: impl Into<String>,
        fingerprint: String,
        root: Option<MerkleHash>,
        tree_size: u64,
    ) -> Self {
        let domain = domain.into();
        let message = format!(
            "No log entry for {} with fingerprint {}; the certificate may be new or unlogged",
            domain, fingerprint
        );
        Self {
            domain,
            verdict: Verdict::NotFound,
            fingerprint: Some(fingerprint),
            root,
            tree_size,
            proof_valid: false,
            sct_valid: false,
            issued_at: None,
            leaf_index: None,
            proof: None,
            sct: None,
            mitm_status: MitmStatus::Suspicious,
            message,
            failure: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }

    pub fn is_internal_failure(&self) -> bool {
        matches!(
            self.failure,
            Some(Failure {
                kind: FailureKind::Internal,
                ..
            })
        )
    }
}

/// One verification query. The observed certificate is identified by an
/// explicit fingerprint, a certificate, or neither (left to the fetcher).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateInput>,
}

impl VerificationRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_certificate(mut self, certificate: CertificateInput) -> Self {
        self.certificate = Some(certificate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_names() {
        assert_eq!(serde_json::to_value(Verdict::NotFound).unwrap(), "NOT_FOUND");
        assert_eq!(serde_json::to_value(Verdict::Valid).unwrap(), "VALID");
        assert_eq!(Verdict::Tampered.to_string(), "TAMPERED");
        assert_eq!(Verdict::Tampered.mitm_status(), MitmStatus::Danger);
        assert_eq!(serde_json::to_value(MitmStatus::Suspicious).unwrap(), "suspicious");
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            FailureKind::of(&CtError::FingerprintUnavailable("x".into())),
            FailureKind::Input
        );
        assert_eq!(
            FailureKind::of(&CtError::FetchFailed("x".into())),
            FailureKind::Fetch
        );
        assert_eq!(
            FailureKind::of(&CtError::invariant("x")),
            FailureKind::Internal
        );
    }

    #[test]
    fn test_error_report_shape() {
        let report = VerificationReport::error("a.example", None, &CtError::invariant("leaf count"));
        assert_eq!(report.verdict, Verdict::Error);
        assert!(report.is_internal_failure());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mitmStatus"], "unknown");
        assert_eq!(json["failure"]["kind"], "internal");
        assert_eq!(json["proofValid"], false);
        assert!(json.get("issuedAt").is_none());
    }

    #[test]
    fn test_request_json() {
        let request: VerificationRequest =
            serde_json::from_str(r#"{"domain":"a.example","certificate":"YQ=="}"#).unwrap();
        assert_eq!(request.fingerprint, None);
        assert_eq!(request.certificate, Some(CertificateInput::Encoded("YQ==".to_string())));
    }
}
