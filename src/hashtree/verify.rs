use log::trace;

use crate::error::{Error, Result};
use crate::hash::{Blake2b256, HashProvider};
use crate::hashtree::proof::{MAX_PROOF_HEIGHT, Proof};

/// Verifies `proof` for `leaf` against `root` with the default hash provider and no salt.
///
/// Only the root is needed, so proofs can be checked against historical roots
/// without rebuilding their trees. A malformed proof is reported as `false`.
pub fn verify_proof(root: &[u8], leaf: &[u8], proof: &Proof) -> bool {
  verify_proof_with(root, leaf, proof, &Blake2b256, None).unwrap_or(false)
}

/// Verifies `proof` for `leaf` against `root` with the given hash provider and salt.
///
/// Returns `Ok(false)` for a well-formed proof that does not lead to `root`, and
/// [`Error::InvalidProof`] when the proof cannot belong to any tree built with
/// `hasher`: too many levels, an index beyond the leaf layer the proof spans, or
/// a sibling or root whose length differs from the provider's digest length.
pub fn verify_proof_with<H: HashProvider>(
  root: &[u8],
  leaf: &[u8],
  proof: &Proof,
  hasher: &H,
  salt: Option<&[u8]>,
) -> Result<bool> {
  check_structure(root, proof, hasher)?;

  let mut current = hasher.hash_leaf(leaf, salt);
  let mut index = proof.index();
  for sibling in proof.hashes() {
    current =
      if index % 2 == 0 { hasher.hash_branch(&current, sibling) } else { hasher.hash_branch(sibling, &current) };
    index >>= 1;
  }

  let verified = current.as_slice() == root;
  trace!("proof for leaf {} verified: {verified}", proof.index());
  Ok(verified)
}

fn check_structure<H: HashProvider>(root: &[u8], proof: &Proof, hasher: &H) -> Result<()> {
  let height = proof.hashes().len();
  if height > MAX_PROOF_HEIGHT {
    return Err(Error::InvalidProof(format!("{height} sibling hashes exceed the maximum of {MAX_PROOF_HEIGHT}")));
  }
  if proof.index() >> height != 0 {
    return Err(Error::InvalidProof(format!(
      "index {} is out of range for a proof of {height} levels",
      proof.index()
    )));
  }
  let len = hasher.output_len();
  if let Some(level) = proof.hashes().iter().position(|hash| hash.len() != len) {
    return Err(Error::InvalidProof(format!(
      "sibling at level {level} is {} bytes, expected {len}",
      proof.hashes()[level].len()
    )));
  }
  if root.len() != len {
    return Err(Error::InvalidProof(format!("root is {} bytes, expected {len}", root.len())));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::hash::Sha256;
  use crate::hashtree::Tree;

  fn tree() -> Tree {
    Tree::new(["Foo", "Bar", "Baz", "Qux", "Quux"]).unwrap()
  }

  #[test]
  fn test_verify_matches() {
    let tree = tree();
    for (i, item) in tree.data().iter().enumerate() {
      let proof = tree.generate_proof(item).unwrap();
      assert_eq!(i as u64, proof.index());
      assert!(verify_proof(tree.root(), item, &proof));
      assert!(verify_proof_with(tree.root(), item, &proof, &Blake2b256, None).unwrap());
    }
  }

  #[test]
  fn test_mismatch_is_not_an_error() {
    let tree = tree();
    let proof = tree.generate_proof(b"Baz").unwrap();
    assert!(!verify_proof_with(tree.root(), b"Qux", &proof, &Blake2b256, None).unwrap());
    assert!(!verify_proof_with(tree.root(), b"Baz", &proof, &Blake2b256, Some(b"salt".as_slice())).unwrap());
    assert!(!verify_proof_with(tree.root(), b"Baz", &proof, &Sha256, None).unwrap());

    // a wrong but in-range index still hashes the path
    let moved = Proof::new(proof.index() ^ 1, proof.hashes().to_vec());
    assert!(!verify_proof_with(tree.root(), b"Baz", &moved, &Blake2b256, None).unwrap());
  }

  #[test]
  fn test_index_out_of_range() {
    let tree = tree();
    let proof = tree.generate_proof(b"Foo").unwrap();
    assert_eq!(3, proof.hashes().len());
    let proof = Proof::new(8, proof.hashes().to_vec());
    assert!(matches!(verify_proof_with(tree.root(), b"Foo", &proof, &Blake2b256, None), Err(Error::InvalidProof(_))));
    assert!(!verify_proof(tree.root(), b"Foo", &proof));

    let proof = Proof::new(u64::MAX, vec![]);
    assert!(!verify_proof(tree.root(), b"Foo", &proof));
  }

  #[test]
  fn test_wrong_lengths() {
    let tree = tree();
    let proof = tree.generate_proof(b"Qux").unwrap();

    let mut hashes = proof.hashes().to_vec();
    hashes[1].pop();
    let short = Proof::new(proof.index(), hashes);
    assert!(matches!(verify_proof_with(tree.root(), b"Qux", &short, &Blake2b256, None), Err(Error::InvalidProof(_))));

    let mut hashes = proof.hashes().to_vec();
    hashes.truncate(2);
    let truncated = Proof::new(proof.index(), hashes);
    assert!(!verify_proof(tree.root(), b"Qux", &truncated));

    assert!(matches!(
      verify_proof_with(&tree.root()[..16], b"Qux", &proof, &Blake2b256, None),
      Err(Error::InvalidProof(_))
    ));
    assert!(!verify_proof(&[], b"Qux", &proof));
  }

  #[test]
  fn test_too_many_levels() {
    let proof = Proof::new(0, vec![vec![0u8; 32]; MAX_PROOF_HEIGHT + 1]);
    assert!(matches!(verify_proof_with(&[0u8; 32], b"Foo", &proof, &Blake2b256, None), Err(Error::InvalidProof(_))));
    assert!(!verify_proof(&[0u8; 32], b"Foo", &proof));
  }
}
