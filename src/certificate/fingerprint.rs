//! Certificate fingerprints
//!
//! A fingerprint is the SHA-256 digest of a certificate's DER encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CtError, Result};

/// Fingerprint length in bytes
pub const FINGERPRINT_SIZE: usize = 32;

/// Display prefix used by browsers and the original web UI
pub const FINGERPRINT_PREFIX: &str = "SHA256:";

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Fingerprint of DER-encoded certificate bytes
    pub fn of_der(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    pub const fn from_bytes(bytes: [u8; FINGERPRINT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex fingerprint. Accepts an optional `SHA256:` prefix, `:`
    /// separators, surrounding whitespace and either case.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let body = match trimmed.get(..FINGERPRINT_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(FINGERPRINT_PREFIX) => {
                &trimmed[FINGERPRINT_PREFIX.len()..]
            }
            _ => trimmed,
        };
        let cleaned: String = body.chars().filter(|c| *c != ':').collect();

        if cleaned.is_empty() {
            return Err(CtError::InvalidFingerprint("empty fingerprint".to_string()));
        }

        let bytes = hex::decode(&cleaned)
            .map_err(|e| CtError::InvalidFingerprint(format!("not hex: {}", e)))?;
        let bytes: [u8; FINGERPRINT_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            CtError::InvalidFingerprint(format!(
                "expected {} bytes, got {}",
                FINGERPRINT_SIZE,
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// `SHA256:<hex>` form shown to users
    pub fn display_form(&self) -> String {
        format!("{}{}", FINGERPRINT_PREFIX, self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = CtError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_der_is_sha256() {
        let fp = Fingerprint::of_der(b"abc");
        assert_eq!(
            fp.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_accepts_display_variants() {
        let fp = Fingerprint::of_der(b"abc");
        let hex = fp.to_hex();

        assert_eq!(Fingerprint::parse(&hex).unwrap(), fp);
        assert_eq!(Fingerprint::parse(&hex.to_uppercase()).unwrap(), fp);
        assert_eq!(Fingerprint::parse(&fp.display_form()).unwrap(), fp);
        assert_eq!(Fingerprint::parse(&format!("sha256:{}", hex)).unwrap(), fp);

        let colon_separated = fp
            .as_bytes()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":");
        assert_eq!(Fingerprint::parse(&colon_separated).unwrap(), fp);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            Fingerprint::parse(""),
            Err(CtError::InvalidFingerprint(_))
        ));
        assert!(Fingerprint::parse("deadbeef").is_err());
        assert!(Fingerprint::parse("not-a-fingerprint").is_err());
        assert!(Fingerprint::parse(&"ab".repeat(33)).is_err());
    }
}
