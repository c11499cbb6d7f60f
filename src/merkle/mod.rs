//! Merkle Log
//!
//! Append-only RFC 6962 hash tree over certificate fingerprints, with
//! inclusion proof generation and verification.

pub mod log;
pub mod proof;
pub mod tree;

pub use log::MerkleLog;
pub use proof::{check_inclusion, expected_path, verify_inclusion, InclusionProof, ProofStep, Side};
pub use tree::{hash_children, hash_leaf, MerkleHash, HASH_SIZE};
