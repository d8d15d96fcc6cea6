use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};

use crate::error::{Error, Result};
use crate::hash::{Blake2b256, Digest, HashProvider};
use crate::hashtree::{DEFAULT_PARALLEL_THRESHOLD, Tree, hash_leaves, next_level};

/// Upper bound on the number of sibling hashes accepted when decoding, one per bit of the index.
pub const MAX_PROOF_HEIGHT: usize = 63;

/// Upper bound on the digest length accepted when decoding.
pub const MAX_DIGEST_LEN: usize = 1024;

/// Membership proof: the sibling hashes from the leaf up to the root, and the leaf index.
///
/// The proof carries nothing from the tree besides these values and can be
/// verified against any recorded root with [`verify_proof`](super::verify::verify_proof).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
  index: u64,
  hashes: Vec<Digest>,
}

impl Proof {
  pub fn new(index: u64, hashes: Vec<Digest>) -> Self {
    Proof { index, hashes }
  }

  /// Leaf position in the padded leaf layer.
  pub fn index(&self) -> u64 {
    self.index
  }

  /// Sibling hashes, bottom-to-top.
  pub fn hashes(&self) -> &[Digest] {
    &self.hashes
  }

  /// Bytes held by the index and the sibling hashes.
  pub fn size(&self) -> usize {
    size_of::<u64>() + self.hashes.iter().map(Vec::len).sum::<usize>()
  }

  /// Writes the binary form: index (u64), hash count (u32), digest length (u32), then the hashes.
  ///
  /// Proofs that [`Proof::read`] would reject are refused with [`Error::InvalidProof`].
  pub fn write<W: Write>(&self, w: &mut W) -> Result<usize> {
    let count = self.hashes.len();
    let digest_len = self.hashes.first().map(Vec::len).unwrap_or(0);
    if self.hashes.iter().any(|h| h.len() != digest_len) {
      return Err(Error::InvalidProof("sibling hashes differ in length".to_string()));
    }
    check_header(count, digest_len)?;

    w.write_u64::<LittleEndian>(self.index)?;
    w.write_u32::<LittleEndian>(count as u32)?;
    w.write_u32::<LittleEndian>(digest_len as u32)?;
    for hash in self.hashes.iter() {
      w.write_all(hash)?;
    }
    Ok(8 + 4 + 4 + count * digest_len)
  }

  pub fn read<R: Read>(r: &mut R) -> Result<Self> {
    let index = r.read_u64::<LittleEndian>()?;
    let count = r.read_u32::<LittleEndian>()? as usize;
    let digest_len = r.read_u32::<LittleEndian>()? as usize;
    check_header(count, digest_len)?;

    let mut hashes = Vec::with_capacity(count);
    for _ in 0..count {
      let mut hash = vec![0u8; digest_len];
      r.read_exact(&mut hash)?;
      hashes.push(hash);
    }
    Ok(Proof { index, hashes })
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(16 + self.hashes.iter().map(Vec::len).sum::<usize>());
    self.write(&mut buffer)?;
    Ok(buffer)
  }

  /// Decodes a proof from exactly the bytes produced by [`Proof::to_bytes`].
  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    let mut cursor = Cursor::new(bytes);
    let proof = Self::read(&mut cursor)?;
    if cursor.position() != bytes.len() as u64 {
      return Err(Error::InvalidProof(format!("{} trailing bytes", bytes.len() as u64 - cursor.position())));
    }
    Ok(proof)
  }
}

/// Header bounds shared by `write` and `read`.
fn check_header(count: usize, digest_len: usize) -> Result<()> {
  if count > MAX_PROOF_HEIGHT {
    return Err(Error::InvalidProof(format!("{count} sibling hashes exceed the maximum of {MAX_PROOF_HEIGHT}")));
  }
  if digest_len > MAX_DIGEST_LEN || (count > 0 && digest_len == 0) {
    return Err(Error::InvalidProof(format!("unsupported digest length {digest_len}")));
  }
  Ok(())
}

impl<H: HashProvider> Tree<H> {
  /// Proof for the first data item equal to `item`.
  pub fn generate_proof(&self, item: &[u8]) -> Result<Proof> {
    let index = self.index_of(item).ok_or(Error::DataNotFound)?;
    self.generate_proof_at(index)
  }

  /// Proof for the `index`-th data item.
  pub fn generate_proof_at(&self, index: usize) -> Result<Proof> {
    if index >= self.data.len() {
      return Err(Error::IndexOutOfRange { index: index as u64, len: self.data.len() as u64 });
    }
    let mut hashes = Vec::with_capacity(self.height());
    let mut i = self.branch_len + index;
    while i > 1 {
      hashes.push(self.nodes[i ^ 1].clone());
      i /= 2;
    }
    trace!("proof generated for leaf {index}: {} hashes", hashes.len());
    Ok(Proof::new(index as u64, hashes))
  }
}

/// Merkle root of `items` with the default hash provider and no salt, without keeping a tree.
pub fn generate_root<T: AsRef<[u8]> + Sync>(items: &[T]) -> Result<Digest> {
  generate_root_with(items, &Blake2b256, None)
}

pub fn generate_root_with<T, H>(items: &[T], hasher: &H, salt: Option<&[u8]>) -> Result<Digest>
where
  T: AsRef<[u8]> + Sync,
  H: HashProvider,
{
  if items.is_empty() {
    return Err(Error::EmptyInput);
  }
  let branch_len = items.len().next_power_of_two();
  let mut level = hash_leaves(items, hasher, salt, branch_len, DEFAULT_PARALLEL_THRESHOLD);
  while level.len() > 1 {
    level = next_level(&level, hasher, DEFAULT_PARALLEL_THRESHOLD);
  }
  level.pop().ok_or(Error::EmptyInput)
}

/// Proof for `items[index]` with the default hash provider and no salt, without keeping a tree.
///
/// Only one level of the tree is held in memory at a time.
pub fn generate_proof<T: AsRef<[u8]> + Sync>(items: &[T], index: usize) -> Result<Proof> {
  generate_proof_with(items, index, &Blake2b256, None)
}

pub fn generate_proof_with<T, H>(items: &[T], index: usize, hasher: &H, salt: Option<&[u8]>) -> Result<Proof>
where
  T: AsRef<[u8]> + Sync,
  H: HashProvider,
{
  if items.is_empty() {
    return Err(Error::EmptyInput);
  }
  if index >= items.len() {
    return Err(Error::IndexOutOfRange { index: index as u64, len: items.len() as u64 });
  }
  let branch_len = items.len().next_power_of_two();
  let mut hashes = Vec::with_capacity(branch_len.trailing_zeros() as usize);
  let mut level = hash_leaves(items, hasher, salt, branch_len, DEFAULT_PARALLEL_THRESHOLD);
  let mut i = index;
  while level.len() > 1 {
    hashes.push(level[i ^ 1].clone());
    level = next_level(&level, hasher, DEFAULT_PARALLEL_THRESHOLD);
    i /= 2;
  }
  Ok(Proof::new(index as u64, hashes))
}
