use thiserror::Error;

impl From<serde_json::Error> for CtError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidCertificateFormat(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for CtError {
    fn from(err: std::io::Error) -> Self {
        Self::BootstrapError(format!("I/O error: {}", err))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CtError {
    #[error("Invalid certificate format: {0}")]
    InvalidCertificateFormat(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Leaf index {index} out of range for tree size {size}")]
    IndexOutOfRange { index: u64, size: u64 },

    #[error("Invalid tree size: {0}")]
    InvalidTreeSize(String),

    #[error("Fingerprint unavailable: {0}")]
    FingerprintUnavailable(String),

    #[error("Certificate fetch for {domain} timed out after {timeout_ms} ms")]
    FetchTimeout { domain: String, timeout_ms: u64 },

    #[error("Certificate fetch failed: {0}")]
    FetchFailed(String),

    #[error("Verification error: {0}")]
    VerificationError(String),

    #[error("Log invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bootstrap error: {0}")]
    BootstrapError(String),
}

pub type Result<T> = std::result::Result<T, CtError>;

impl CtError {
    /// Errors that indicate a bug in the log itself rather than bad input or a
    /// suspicious certificate.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::VerificationError(_) | Self::InvariantViolation(_)
        )
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::FetchTimeout { .. } | Self::FetchFailed(_))
    }

    pub fn out_of_range(index: u64, size: u64) -> Self {
        Self::IndexOutOfRange { index, size }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
