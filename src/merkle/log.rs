//! Append-only Merkle log
//!
//! Nodes live in a flat arena indexed by `(level, position)`. Only complete
//! subtrees are stored: `levels[k][j]` covers leaves `[j * 2^k, (j + 1) * 2^k)`.
//! Once written a stored node never changes, which is what keeps proofs issued
//! at an earlier size verifiable against the root captured at that size.

use tracing::debug;

use crate::certificate::Fingerprint;
use crate::error::{CtError, Result};
use crate::merkle::proof::{InclusionProof, ProofStep, Side};
use crate::merkle::tree::{hash_children, hash_leaf, MerkleHash};

#[derive(Debug, Clone, Default)]
pub struct MerkleLog {
    levels: Vec<Vec<MerkleHash>>,
    root: Option<MerkleHash>,
}

impl MerkleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay an ordered fingerprint sequence into a fresh log
    pub fn from_fingerprints<'a, I>(fingerprints: I) -> Self
    where
        I: IntoIterator<Item = &'a Fingerprint>,
    {
        let mut log = Self::new();
        for fingerprint in fingerprints {
            log.append(fingerprint);
        }
        log
    }

    /// Number of leaves
    pub fn size(&self) -> u64 {
        self.levels.first().map_or(0, |leaves| leaves.len() as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Current root, `None` while the log is empty
    pub fn root(&self) -> Option<MerkleHash> {
        self.root
    }

    /// Append one fingerprint, returning its leaf index and the new root
    pub fn append(&mut self, fingerprint: &Fingerprint) -> (u64, MerkleHash) {
        self.append_leaf(hash_leaf(fingerprint.as_bytes()))
    }

    /// Append a precomputed leaf hash.
    ///
    /// Touches one node per level the new leaf completes, plus the frontier
    /// fold for the root, so the cost is O(log N).
    pub fn append_leaf(&mut self, leaf: MerkleHash) -> (u64, MerkleHash) {
        let index = self.size();

        let mut node = leaf;
        let mut position = index;
        let mut level = 0usize;
        loop {
            if self.levels.len() == level {
                self.levels.push(Vec::new());
            }
            self.levels[level].push(node);

            // A left child waits for its sibling
            if position % 2 == 0 {
                break;
            }
            let left = self.levels[level][(position - 1) as usize];
            node = hash_children(&left, &node);
            position /= 2;
            level += 1;
        }

        let root = self.frontier_root(index + 1);
        self.root = Some(root);

        debug!("Appended leaf {} to Merkle log, root {}", index, root);
        (index, root)
    }

    /// Leaf hash at `index`
    pub fn leaf_hash(&self, index: u64) -> Result<MerkleHash> {
        self.levels
            .first()
            .and_then(|leaves| leaves.get(index as usize))
            .copied()
            .ok_or_else(|| CtError::out_of_range(index, self.size()))
    }

    /// Root of the tree formed by the first `size` leaves
    pub fn root_at(&self, size: u64) -> Result<MerkleHash> {
        if size == 0 || size > self.size() {
            return Err(CtError::VerificationError(format!(
                "cannot compute root at size {} for log of size {}",
                size,
                self.size()
            )));
        }
        Ok(self.frontier_root(size))
    }

    /// Inclusion proof for leaf `index` against the current root
    pub fn prove_inclusion(&self, index: u64) -> Result<InclusionProof> {
        self.prove_inclusion_at(index, self.size())
    }

    /// Inclusion proof for leaf `index` against the root at `tree_size`
    pub fn prove_inclusion_at(&self, index: u64, tree_size: u64) -> Result<InclusionProof> {
        if tree_size > self.size() {
            return Err(CtError::VerificationError(format!(
                "tree size {} exceeds log size {}",
                tree_size,
                self.size()
            )));
        }
        if index >= tree_size {
            return Err(CtError::out_of_range(index, tree_size));
        }

        let leaf_hash = self.leaf_hash(index)?;
        let mut siblings = Vec::new();
        let mut position = index;
        let mut width = tree_size;
        let mut level = 0u32;

        while width > 1 {
            let sibling = position ^ 1;
            if sibling < width {
                let side = if position % 2 == 0 { Side::Right } else { Side::Left };
                let hash = self.node_at(level, sibling, tree_size)?;
                siblings.push(ProofStep { hash, side });
            }
            position /= 2;
            width = (width + 1) / 2;
            level += 1;
        }

        Ok(InclusionProof {
            leaf_index: index,
            leaf_hash,
            siblings,
            tree_size,
        })
    }

    /// Node at `(level, position)` of the tree of `tree_size` leaves. The
    /// rightmost node of a level may cover a partial range; its hash is folded
    /// from the complete subtrees inside that range.
    fn node_at(&self, level: u32, position: u64, tree_size: u64) -> Result<MerkleHash> {
        let start = position << level;
        let end = (start + (1u64 << level)).min(tree_size);
        if end - start == 1u64 << level {
            return self.stored(level, position);
        }
        self.range_root(start, end)
    }

    /// Hash over leaves `[start, end)` where `start` is aligned to a power of two
    /// at least as large as the range.
    fn range_root(&self, start: u64, end: u64) -> Result<MerkleHash> {
        let mut subtrees = Vec::new();
        let mut cursor = start;
        let len = end - start;
        for level in (0..u64::BITS).rev() {
            if len & (1u64 << level) != 0 {
                subtrees.push(self.stored(level, cursor >> level)?);
                cursor += 1u64 << level;
            }
        }

        let mut iter = subtrees.into_iter().rev();
        let last = iter
            .next()
            .ok_or_else(|| CtError::invariant("empty range in Merkle log"))?;
        Ok(iter.fold(last, |acc, left| hash_children(&left, &acc)))
    }

    /// Fold the complete subtrees named by the set bits of `size`, smallest
    /// first. Every subtree is guaranteed present for `1 <= size <= self.size()`.
    fn frontier_root(&self, size: u64) -> MerkleHash {
        let mut root: Option<MerkleHash> = None;
        let mut covered = size;
        for level in 0..u64::BITS {
            let bit = 1u64 << level;
            if size & bit == 0 {
                continue;
            }
            covered -= bit;
            let subtree = self.levels[level as usize][(covered >> level) as usize];
            root = Some(match root {
                Some(right) => hash_children(&subtree, &right),
                None => subtree,
            });
        }
        // `size >= 1` always sets at least one bit
        root.unwrap_or_else(|| hash_leaf(&[]))
    }

    fn stored(&self, level: u32, position: u64) -> Result<MerkleHash> {
        self.levels
            .get(level as usize)
            .and_then(|nodes| nodes.get(position as usize))
            .copied()
            .ok_or_else(|| {
                CtError::invariant(format!(
                    "missing Merkle node at level {} position {}",
                    level, position
                ))
            })
    }
}
