//! Signed Certificate Timestamps
//!
//! Issuance at append time and re-verification at lookup time, keyed by a
//! secret held only by the log.

pub mod key;
pub mod signed;

pub use key::{LogId, LogKey, LOG_KEY_SIZE};
pub use signed::{Sct, SctIssuer, SctVerifier, SCT_VERSION_V1};
