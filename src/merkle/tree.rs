//! Merkle tree hashing
//!
//! RFC 6962 hashing with domain separation: leaves are hashed as
//! `SHA256(0x00 || data)` and interior nodes as `SHA256(0x01 || left || right)`,
//! so a leaf can never be reinterpreted as an interior node.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CtError;

/// Prefix for leaf nodes
pub const LEAF_HASH_PREFIX: u8 = 0x00;

/// Prefix for interior nodes
pub const NODE_HASH_PREFIX: u8 = 0x01;

/// Hash size in bytes (SHA-256)
pub const HASH_SIZE: usize = 32;

/// A node hash in the log's Merkle tree
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MerkleHash([u8; HASH_SIZE]);

impl MerkleHash {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CtError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CtError::VerificationError(format!("invalid hash hex: {}", e)))?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            CtError::VerificationError(format!("hash must be {} bytes, got {}", HASH_SIZE, v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleHash({})", self.to_hex())
    }
}

impl FromStr for MerkleHash {
    type Err = CtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for MerkleHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MerkleHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash a leaf: SHA256(0x00 || data)
pub fn hash_leaf(data: &[u8]) -> MerkleHash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_HASH_PREFIX]);
    hasher.update(data);
    MerkleHash(hasher.finalize().into())
}

/// Hash two children: SHA256(0x01 || left || right)
pub fn hash_children(left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_HASH_PREFIX]);
    hasher.update(left.0);
    hasher.update(right.0);
    MerkleHash(hasher.finalize().into())
}

/// Reference root over a slice of leaf hashes, pairing each level left to right
/// and promoting an unpaired trailing node unchanged.
///
/// This is the slow full-rebuild form; `MerkleLog` must always agree with it.
pub fn compute_root(leaves: &[MerkleHash]) -> Option<MerkleHash> {
    if leaves.is_empty() {
        return None;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_children(left, right),
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }
    level.pop()
}
