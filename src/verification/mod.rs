//! Certificate verification against the log
//!
//! A query resolves the domain, obtains the observed fingerprint, looks up the
//! latest matching entry and checks its inclusion proof and SCT. The outcome is
//! one of VALID, NOT_FOUND, TAMPERED or ERROR.

pub mod report;
pub mod service;

pub use report::{
    Failure, FailureKind, MitmStatus, Verdict, VerificationReport, VerificationRequest,
};
pub use service::{VerificationService, DEFAULT_FETCH_TIMEOUT};
