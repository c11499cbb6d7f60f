//! Certificate fingerprinting
//!
//! Canonicalizes accepted certificate representations into SHA-256 fingerprints.

pub mod fingerprint;
pub mod input;

pub use fingerprint::{Fingerprint, FINGERPRINT_PREFIX, FINGERPRINT_SIZE};
pub use input::{fingerprint, CertificateDescriptor, CertificateInput};
