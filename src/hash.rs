//! Hash providers used to build and verify trees.
//!
//! A [`HashProvider`] is the only place a concrete hash algorithm enters the
//! crate. Tree construction, proof generation and verification are generic over
//! it, so swapping BLAKE2b for another algorithm does not touch any tree logic.

use blake2::Blake2b;
use blake2::digest::consts::U32;
use sha2::Digest as _;

/// Raw digest bytes. The length is fixed per provider, see [`HashProvider::output_len`].
pub type Digest = Vec<u8>;

/// One-way hashing capability.
///
/// Implementations must be deterministic and stateless: the same input always
/// yields the same digest of exactly `output_len()` bytes.
pub trait HashProvider: Send + Sync {
  /// Digest length in bytes.
  fn output_len(&self) -> usize;

  /// Hash of the concatenation of `parts`.
  fn hash_parts(&self, parts: &[&[u8]]) -> Digest;

  fn hash(&self, data: &[u8]) -> Digest {
    self.hash_parts(&[data])
  }

  /// Leaf hash: `H(data || salt)` when salted, `H(data)` otherwise.
  fn hash_leaf(&self, data: &[u8], salt: Option<&[u8]>) -> Digest {
    match salt {
      Some(salt) => self.hash_parts(&[data, salt]),
      None => self.hash(data),
    }
  }

  /// Branch hash `H(left || right)`. Salt never applies above the leaf level.
  fn hash_branch(&self, left: &[u8], right: &[u8]) -> Digest {
    self.hash_parts(&[left, right])
  }

  /// Value of the padding slots that fill the leaf layer up to a power of two.
  fn placeholder(&self) -> Digest {
    vec![0u8; self.output_len()]
  }
}

impl<H: HashProvider + ?Sized> HashProvider for &H {
  fn output_len(&self) -> usize {
    (**self).output_len()
  }

  fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
    (**self).hash_parts(parts)
  }
}

/// BLAKE2b with a 32-byte output. This is the default provider.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Blake2b256;

impl HashProvider for Blake2b256 {
  fn output_len(&self) -> usize {
    32
  }

  fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
    let mut hasher = Blake2b::<U32>::new();
    for part in parts {
      hasher.update(part);
    }
    hasher.finalize().to_vec()
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Blake3;

impl HashProvider for Blake3 {
  fn output_len(&self) -> usize {
    blake3::OUT_LEN
  }

  fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
      hasher.update(part);
    }
    hasher.finalize().as_bytes().to_vec()
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sha256;

impl HashProvider for Sha256 {
  fn output_len(&self) -> usize {
    32
  }

  fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
    let mut hasher = sha2::Sha256::new();
    for part in parts {
      hasher.update(part);
    }
    hasher.finalize().to_vec()
  }
}

/// Legacy Keccak-256 with the pre-FIPS-202 padding, as used by Ethereum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keccak256;

impl HashProvider for Keccak256 {
  fn output_len(&self) -> usize {
    32
  }

  fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
    let mut hasher = sha3::Keccak256::new();
    for part in parts {
      hasher.update(part);
    }
    hasher.finalize().to_vec()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn providers() -> Vec<Box<dyn HashProvider>> {
    vec![Box::new(Blake2b256), Box::new(Blake3), Box::new(Sha256), Box::new(Keccak256)]
  }

  #[test]
  fn test_output_len() {
    for h in providers() {
      assert_eq!(h.output_len(), h.hash(b"").len());
      assert_eq!(h.output_len(), h.hash(b"Foo").len());
      assert_eq!(h.output_len(), h.placeholder().len());
      assert!(h.placeholder().iter().all(|b| *b == 0));
    }
  }

  #[test]
  fn test_parts_are_concatenated() {
    for h in providers() {
      assert_eq!(h.hash(b"FooBar"), h.hash_parts(&[b"Foo", b"Bar"]));
      assert_eq!(h.hash(b"FooBar"), h.hash_parts(&[b"F", b"", b"ooBa", b"r"]));
      assert_eq!(h.hash(b"Foosalt"), h.hash_leaf(b"Foo", Some(b"salt".as_slice())));
      assert_eq!(h.hash(b"Foo"), h.hash_leaf(b"Foo", None));
      assert_ne!(h.hash_branch(b"Foo", b"Bar"), h.hash_branch(b"Bar", b"Foo"));
    }
  }

  #[test]
  fn test_known_digests() {
    // BLAKE2b-256("Foo") is the root of a single-leaf tree over "Foo"
    assert_eq!(
      "7b506db718d5cce819ca4d33d2348065a5408cc89aa8b3f7ac70a0c186a2c81f",
      hex::encode(Blake2b256.hash(b"Foo"))
    );
    assert_eq!("af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262", hex::encode(Blake3.hash(b"")));
    assert_eq!(
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
      hex::encode(Sha256.hash(b""))
    );
    assert_eq!(
      "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
      hex::encode(Keccak256.hash(b""))
    );
  }

  #[test]
  fn test_reference_provider() {
    let h = &Blake3;
    assert_eq!(Blake3.hash(b"Foo"), h.hash(b"Foo"));
    assert_eq!(Blake3.output_len(), h.output_len());
  }
}
