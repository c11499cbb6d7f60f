#![allow(dead_code)]

use ct_service::certificate::{CertificateInput, Fingerprint};
use ct_service::log::CtLogStore;
use ct_service::sct::{LogKey, SctIssuer};
use ct_service::verification::VerificationService;

/// Store with a fixed key so runs are reproducible
pub fn test_store() -> CtLogStore {
    CtLogStore::new(SctIssuer::new(LogKey::from_bytes([7u8; 32]), "integration-test-log"))
}

pub fn test_service() -> VerificationService {
    VerificationService::new(test_store())
}

/// Stand-in DER bytes for a certificate labelled `tag`
pub fn test_der(tag: &str) -> Vec<u8> {
    let mut der = vec![0x30, 0x82];
    der.extend_from_slice(format!("test certificate {}", tag).as_bytes());
    der
}

pub fn test_cert(tag: &str) -> CertificateInput {
    CertificateInput::from_der(test_der(tag))
}

pub fn test_fingerprint(tag: &str) -> Fingerprint {
    Fingerprint::of_der(&test_der(tag))
}
