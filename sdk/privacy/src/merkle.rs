//! Merkle Tree for Deposit Commitments
//!
//! Fixed-depth, append-only binary tree. Leaves sit at height 0 in insertion
//! order; every internal node is `H(left, right)`. Empty slots take the zero
//! value of their height:
//!
//! ```text
//! zero[0]   = 0
//! zero[k+1] = H(zero[k], zero[k])
//!
//!                    Root
//!                   /    \
//!                 H01    H2z          z  = zero[0]
//!                /  \   /   \         H2z = H(C2, z)
//!               C0  C1 C2    z
//! ```
//!
//! Only non-empty nodes are stored, one left-aligned layer per height, so a
//! tree holding `n` leaves keeps about `2n` nodes regardless of depth.

use ark_bn254::Fr;
use thiserror::Error;

use crate::hasher::Hasher;

/// Deepest supported tree (2^32 leaves)
pub const MAX_DEPTH: usize = 32;

/// Default depth, matching the deployed withdraw circuit
pub const TREE_DEPTH: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("invalid tree depth {depth}: must be between 1 and {max}")]
    InvalidDepth { depth: usize, max: usize },

    #[error("tree capacity exceeded: depth {depth} holds {capacity} leaves, got {requested}")]
    TreeCapacityExceeded {
        depth: usize,
        capacity: u64,
        requested: u64,
    },

    #[error("leaf not found in tree")]
    LeafNotFound,

    #[error("leaf is ambiguous: it occurs at positions {first} and {second}")]
    AmbiguousLeaf { first: u64, second: u64 },
}

/// Inclusion proof for a single leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipProof {
    /// Root the path folds to
    pub root: Fr,
    /// Sibling hashes from leaf level to just below the root
    pub path_elements: Vec<Fr>,
    /// Direction per level (true = the node on the path is the left child)
    pub path_indices: Vec<bool>,
    /// Position of the leaf
    pub leaf_index: u64,
}

impl MembershipProof {
    /// Rehash the path from `leaf` upward.
    pub fn compute_root<H: Hasher>(&self, leaf: &Fr, hasher: &H) -> Fr {
        fold_path(hasher, leaf, &self.path_elements, &self.path_indices)
    }

    /// Check that `leaf` folds to this proof's root.
    pub fn verify<H: Hasher>(&self, leaf: &Fr, hasher: &H) -> bool {
        self.path_elements.len() == self.path_indices.len()
            && self.compute_root(leaf, hasher) == self.root
    }
}

/// Fold a leaf through a sibling path.
pub fn fold_path<H: Hasher>(hasher: &H, leaf: &Fr, siblings: &[Fr], is_left: &[bool]) -> Fr {
    siblings
        .iter()
        .zip(is_left.iter())
        .fold(*leaf, |current, (sibling, left)| {
            if *left {
                hasher.hash2(&current, sibling)
            } else {
                hasher.hash2(sibling, &current)
            }
        })
}

/// Append-only Merkle tree
#[derive(Debug, Clone)]
pub struct MerkleTree<H> {
    depth: usize,
    hasher: H,
    /// zeros[k] is the root of an empty subtree of height k
    zeros: Vec<Fr>,
    /// layers[k] holds the non-empty nodes of height k, left-aligned
    layers: Vec<Vec<Fr>>,
}

impl<H: Hasher> MerkleTree<H> {
    /// Create an empty tree
    pub fn new(depth: usize, hasher: H) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidDepth {
                depth,
                max: MAX_DEPTH,
            });
        }

        let mut zeros = Vec::with_capacity(depth + 1);
        let mut zero = Fr::from(0u64);
        zeros.push(zero);
        for _ in 0..depth {
            zero = hasher.hash2(&zero, &zero);
            zeros.push(zero);
        }

        Ok(Self {
            depth,
            hasher,
            zeros,
            layers: vec![Vec::new(); depth + 1],
        })
    }

    /// Build a tree from a full leaf sequence in one pass.
    pub fn build(depth: usize, hasher: H, leaves: &[Fr]) -> Result<Self, TreeError> {
        let mut tree = Self::new(depth, hasher)?;
        tree.ensure_capacity(leaves.len() as u64)?;

        tree.layers[0] = leaves.to_vec();
        for level in 0..depth {
            let zero = tree.zeros[level];
            let parents: Vec<Fr> = tree.layers[level]
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).unwrap_or(&zero);
                    tree.hasher.hash2(&pair[0], right)
                })
                .collect();
            tree.layers[level + 1] = parents;
        }

        Ok(tree)
    }

    /// Append a leaf and update its path to the root. Returns the leaf position.
    pub fn append(&mut self, leaf: Fr) -> Result<u64, TreeError> {
        let index = self.len();
        self.ensure_capacity(index + 1)?;

        self.layers[0].push(leaf);
        let mut position = index as usize;

        for level in 0..self.depth {
            let left_position = position & !1;
            let left = self.layers[level][left_position];
            let right = self.layers[level]
                .get(left_position + 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            let parent = self.hasher.hash2(&left, &right);

            position >>= 1;
            let upper = &mut self.layers[level + 1];
            if position < upper.len() {
                upper[position] = parent;
            } else {
                upper.push(parent);
            }
        }

        Ok(index)
    }

    /// Current root
    pub fn root(&self) -> Fr {
        self.layers[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum number of leaves (2^depth)
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Number of leaves inserted so far
    pub fn len(&self) -> u64 {
        self.layers[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Leaves in insertion order
    pub fn leaves(&self) -> &[Fr] {
        &self.layers[0]
    }

    /// Leaf at a position
    pub fn leaf(&self, index: u64) -> Option<Fr> {
        self.layers[0].get(index as usize).copied()
    }

    /// Empty-subtree root at a height
    pub fn zero(&self, level: usize) -> Option<Fr> {
        self.zeros.get(level).copied()
    }

    /// Position of a leaf value. Values that occur more than once are rejected.
    pub fn position_of(&self, leaf: &Fr) -> Result<u64, TreeError> {
        let mut matches = self
            .layers[0]
            .iter()
            .enumerate()
            .filter(|(_, value)| *value == leaf)
            .map(|(index, _)| index as u64);

        let first = matches.next().ok_or(TreeError::LeafNotFound)?;
        match matches.next() {
            Some(second) => Err(TreeError::AmbiguousLeaf { first, second }),
            None => Ok(first),
        }
    }

    /// Membership proof for a leaf value.
    pub fn prove_membership(&self, leaf: &Fr) -> Result<MembershipProof, TreeError> {
        let index = self.position_of(leaf)?;
        self.path(index).ok_or(TreeError::LeafNotFound)
    }

    /// Membership proof for a leaf position.
    pub fn path(&self, index: u64) -> Option<MembershipProof> {
        if index >= self.len() {
            return None;
        }

        let mut path_elements = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut position = index as usize;

        for level in 0..self.depth {
            let sibling = self.layers[level]
                .get(position ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);

            path_elements.push(sibling);
            path_indices.push(position & 1 == 0);
            position >>= 1;
        }

        Some(MembershipProof {
            root: self.root(),
            path_elements,
            path_indices,
            leaf_index: index,
        })
    }

    fn ensure_capacity(&self, requested: u64) -> Result<(), TreeError> {
        if requested > self.capacity() {
            return Err(TreeError::TreeCapacityExceeded {
                depth: self.depth,
                capacity: self.capacity(),
                requested,
            });
        }
        Ok(())
    }
}
