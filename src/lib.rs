//! Binary Merkle tree over an ordered set of opaque data items.
//!
//! ```
//! use merkle::{Tree, verify_proof};
//!
//! let tree = Tree::new(["Foo", "Bar", "Baz"]).unwrap();
//! let proof = tree.generate_proof(b"Bar").unwrap();
//! assert!(verify_proof(tree.root(), b"Bar", &proof));
//! ```
//!
//! Trees are built once and never modified. Verification only needs the root,
//! the leaf data and the [`Proof`], so it works against roots recorded earlier
//! without the tree that produced them.

pub mod error;
pub mod hash;
pub mod hashtree;

pub use error::{Error, Result};
pub use hash::{Blake2b256, Blake3, Digest, HashProvider, Keccak256, Sha256};
pub use hashtree::proof::{Proof, generate_proof, generate_proof_with, generate_root, generate_root_with};
pub use hashtree::verify::{verify_proof, verify_proof_with};
pub use hashtree::{Tree, TreeBuilder};

/// SplitMix64 mixing function, used to derive reproducible pseudo-random data items.
pub fn splitmix64(x: u64) -> u64 {
  let mut z = x.wrapping_add(0x9e3779b97f4a7c15);
  z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
  z ^ (z >> 31)
}
