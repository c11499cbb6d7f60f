//! Accepted certificate representations
//!
//! A certificate reaches the log either as encoded bytes (base64 DER or PEM
//! text) or as a structured descriptor, such as the object a browser debugging
//! API hands back. Every form is reduced to the leaf certificate's DER bytes
//! before hashing, so the same certificate always yields the same fingerprint.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::certificate::fingerprint::Fingerprint;
use crate::error::{CtError, Result};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// A certificate as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CertificateInput {
    /// Base64 DER or PEM text
    Encoded(String),
    /// Raw DER bytes
    Der(Vec<u8>),
    /// Structured certificate description
    Descriptor(CertificateDescriptor),
}

/// Structured certificate description.
///
/// Identity comes from the first populated of `der`, `pem`, `chain[0]`, then a
/// precomputed `fingerprint`. The remaining fields are informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub der: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pem: Option<String>,
    /// Base64 DER chain, leaf first
    #[serde(default, alias = "tableNames", skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

impl CertificateInput {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self::Der(der.into())
    }

    pub fn from_base64(der: &[u8]) -> Self {
        Self::Encoded(STANDARD.encode(der))
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Encoded(s) if s.contains(PEM_BEGIN) => "pem",
            Self::Encoded(_) => "base64",
            Self::Der(_) => "der",
            Self::Descriptor(_) => "descriptor",
        }
    }
}

/// Canonical fingerprint of a certificate in any accepted form
pub fn fingerprint(cert: &CertificateInput) -> Result<Fingerprint> {
    let fp = match cert {
        CertificateInput::Encoded(text) => Fingerprint::of_der(&decode_text(text)?),
        CertificateInput::Der(der) => {
            if der.is_empty() {
                return Err(CtError::InvalidCertificateFormat(
                    "empty DER certificate".to_string(),
                ));
            }
            Fingerprint::of_der(der)
        }
        CertificateInput::Descriptor(descriptor) => descriptor_fingerprint(descriptor)?,
    };
    debug!("Fingerprinted {} certificate: {}", cert.kind(), fp);
    Ok(fp)
}

fn descriptor_fingerprint(descriptor: &CertificateDescriptor) -> Result<Fingerprint> {
    if let Some(der) = &descriptor.der {
        return Ok(Fingerprint::of_der(&decode_base64(der)?));
    }
    if let Some(pem) = &descriptor.pem {
        return Ok(Fingerprint::of_der(&decode_pem(pem)?));
    }
    if let Some(leaf) = descriptor.chain.first() {
        return Ok(Fingerprint::of_der(&decode_base64(leaf)?));
    }
    if let Some(fp) = &descriptor.fingerprint {
        return Fingerprint::parse(fp).map_err(|e| {
            CtError::InvalidCertificateFormat(format!("descriptor fingerprint: {}", e))
        });
    }
    Err(CtError::InvalidCertificateFormat(
        "descriptor carries no der, pem, chain or fingerprint".to_string(),
    ))
}

fn decode_text(text: &str) -> Result<Vec<u8>> {
    if text.contains(PEM_BEGIN) {
        decode_pem(text)
    } else {
        decode_base64(text)
    }
}

/// Decode the first certificate block of a PEM document
fn decode_pem(pem: &str) -> Result<Vec<u8>> {
    let start = pem
        .find(PEM_BEGIN)
        .ok_or_else(|| CtError::InvalidCertificateFormat("missing PEM header".to_string()))?
        + PEM_BEGIN.len();
    let end = pem[start..]
        .find(PEM_END)
        .ok_or_else(|| CtError::InvalidCertificateFormat("missing PEM footer".to_string()))?
        + start;
    decode_base64(&pem[start..end])
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(CtError::InvalidCertificateFormat(
            "empty certificate encoding".to_string(),
        ));
    }
    let der = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CtError::InvalidCertificateFormat(format!("invalid base64: {}", e)))?;
    if der.is_empty() {
        return Err(CtError::InvalidCertificateFormat(
            "certificate decodes to zero bytes".to_string(),
        ));
    }
    Ok(der)
}
