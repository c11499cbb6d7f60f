//! Inclusion proofs
//!
//! A proof lists the sibling hashes from a leaf up to the root, each tagged with
//! the side the sibling sits on. Verification folds the leaf hash with every
//! sibling in order and compares against a root captured for the same tree size.

use serde::{Deserialize, Serialize};

use crate::error::{CtError, Result};
use crate::merkle::tree::{hash_children, MerkleHash};

/// Which side of the running hash a sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: MerkleHash,
    pub side: Side,
}

/// Proof that a leaf is part of the tree of `tree_size` leaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    pub leaf_index: u64,
    pub leaf_hash: MerkleHash,
    pub siblings: Vec<ProofStep>,
    pub tree_size: u64,
}

impl InclusionProof {
    /// Root implied by folding the path, without checking its shape
    pub fn implied_root(&self) -> MerkleHash {
        self.siblings
            .iter()
            .fold(self.leaf_hash, |acc, step| match step.side {
                Side::Left => hash_children(&step.hash, &acc),
                Side::Right => hash_children(&acc, &step.hash),
            })
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Inclusion proof: leaf {} of {}, {} hashes",
            self.leaf_index,
            self.tree_size,
            self.siblings.len()
        )
    }
}

/// Sibling sides along the path from `leaf_index` to the root of a tree with
/// `tree_size` leaves.
///
/// At each level a node whose sibling would fall past the end of the level is
/// promoted without hashing, so rightmost leaves of unbalanced trees get
/// shorter paths.
pub fn expected_path(leaf_index: u64, tree_size: u64) -> Vec<Side> {
    let mut sides = Vec::new();
    let mut index = leaf_index;
    let mut width = tree_size;

    while width > 1 {
        if (index ^ 1) < width {
            sides.push(if index % 2 == 0 { Side::Right } else { Side::Left });
        }
        index /= 2;
        width = (width + 1) / 2;
    }

    sides
}

/// Verify a proof against a root, reporting which check failed
pub fn check_inclusion(proof: &InclusionProof, root: &MerkleHash) -> Result<()> {
    if proof.tree_size == 0 {
        return Err(CtError::VerificationError(
            "tree size cannot be zero".to_string(),
        ));
    }

    if proof.leaf_index >= proof.tree_size {
        return Err(CtError::VerificationError(format!(
            "leaf index {} >= tree size {}",
            proof.leaf_index, proof.tree_size
        )));
    }

    let expected = expected_path(proof.leaf_index, proof.tree_size);
    if proof.siblings.len() != expected.len() {
        return Err(CtError::VerificationError(format!(
            "expected {} proof hashes for leaf {} in tree of size {}, got {}",
            expected.len(),
            proof.leaf_index,
            proof.tree_size,
            proof.siblings.len()
        )));
    }

    if let Some(level) = proof
        .siblings
        .iter()
        .zip(&expected)
        .position(|(step, side)| step.side != *side)
    {
        return Err(CtError::VerificationError(format!(
            "sibling at level {} is on the wrong side",
            level
        )));
    }

    let computed = proof.implied_root();
    if &computed != root {
        return Err(CtError::VerificationError(format!(
            "root mismatch: expected {}, computed {}",
            root, computed
        )));
    }

    Ok(())
}

/// Verify a proof against a root
pub fn verify_inclusion(proof: &InclusionProof, root: &MerkleHash) -> bool {
    check_inclusion(proof, root).is_ok()
}
