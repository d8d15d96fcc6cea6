use log::debug;
use rayon::prelude::*;
use std::fmt::{self, Display};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::hash::{Blake2b256, Digest, HashProvider};

pub mod proof;
pub mod verify;

/// Level width from which leaf and branch hashing is spread over the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1024;

/// Immutable binary hash tree over an ordered set of data items.
///
/// Nodes are kept in a single array laid out breadth-first as a complete binary
/// tree:
///
/// - node `1` is the root; slot `0` is unused
/// - node `i` has children `2i` and `2i + 1`, its sibling is `i ^ 1`
/// - the leaf layer starts at `branch_len`, the smallest power of two not
///   less than the number of data items
///
/// When the number of items is not a power of two, the remaining leaf slots hold
/// the provider's [placeholder](HashProvider::placeholder) digest (all zero bytes).
/// The same padding applies to the stateless [`generate_root`](proof::generate_root)
/// and [`generate_proof`](proof::generate_proof), so every path yields the same root.
#[derive(Debug, Clone)]
pub struct Tree<H = Blake2b256> {
  salt: Option<Vec<u8>>,
  hasher: H,
  data: Vec<Vec<u8>>,
  nodes: Vec<Digest>,
  branch_len: usize,
}

impl Tree<Blake2b256> {
  /// Build a tree with the default hash provider and no salt.
  pub fn new<I, T>(items: I) -> Result<Self>
  where
    I: IntoIterator<Item = T>,
    T: Into<Vec<u8>>,
  {
    TreeBuilder::new().build(items)
  }

  pub fn builder() -> TreeBuilder<Blake2b256> {
    TreeBuilder::new()
  }
}

impl<H: HashProvider> Tree<H> {
  /// Build a tree with an explicit hash provider and optional salt.
  pub fn with<I, T>(items: I, hasher: H, salt: Option<&[u8]>) -> Result<Self>
  where
    I: IntoIterator<Item = T>,
    T: Into<Vec<u8>>,
  {
    let builder = TreeBuilder::new().hasher(hasher);
    match salt {
      Some(salt) => builder.salt(salt).build(items),
      None => builder.build(items),
    }
  }

  /// Merkle root of the tree.
  pub fn root(&self) -> &[u8] {
    &self.nodes[1]
  }

  /// Number of data items (leaves without padding).
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// Width of the padded leaf layer.
  pub fn branch_len(&self) -> usize {
    self.branch_len
  }

  /// Number of levels above the leaves, equal to the length of every proof of this tree.
  pub fn height(&self) -> usize {
    self.branch_len.trailing_zeros() as usize
  }

  pub fn salt(&self) -> Option<&[u8]> {
    self.salt.as_deref()
  }

  pub fn hasher(&self) -> &H {
    &self.hasher
  }

  pub fn data(&self) -> &[Vec<u8>] {
    &self.data
  }

  /// Leaf digest of the `index`-th data item.
  pub fn leaf(&self, index: usize) -> Option<&[u8]> {
    if index < self.data.len() { Some(&self.nodes[self.branch_len + index]) } else { None }
  }

  /// Node by its breadth-first position, `1` being the root.
  pub fn node(&self, i: usize) -> Option<&[u8]> {
    if i > 0 && i < self.nodes.len() { Some(&self.nodes[i]) } else { None }
  }

  /// Position of the first item equal to `item`.
  pub fn index_of(&self, item: &[u8]) -> Option<usize> {
    self.data.iter().position(|data| data.as_slice() == item)
  }
}

impl<H: HashProvider> Display for Tree<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&hex::encode(self.root()))
  }
}

/// Configures and builds a [`Tree`].
#[derive(Debug, Clone)]
pub struct TreeBuilder<H = Blake2b256> {
  hasher: H,
  salt: Option<Vec<u8>>,
  parallel_threshold: usize,
}

impl TreeBuilder<Blake2b256> {
  pub fn new() -> Self {
    TreeBuilder { hasher: Blake2b256, salt: None, parallel_threshold: DEFAULT_PARALLEL_THRESHOLD }
  }
}

impl Default for TreeBuilder<Blake2b256> {
  fn default() -> Self {
    Self::new()
  }
}

impl<H: HashProvider> TreeBuilder<H> {
  /// Replace the hash provider.
  pub fn hasher<H2: HashProvider>(self, hasher: H2) -> TreeBuilder<H2> {
    TreeBuilder { hasher, salt: self.salt, parallel_threshold: self.parallel_threshold }
  }

  /// Salt appended to every data item before leaf hashing.
  pub fn salt<S: Into<Vec<u8>>>(mut self, salt: S) -> Self {
    self.salt = Some(salt.into());
    self
  }

  /// Minimum level width hashed in parallel. `usize::MAX` keeps construction on the calling thread.
  pub fn parallel_threshold(mut self, threshold: usize) -> Self {
    self.parallel_threshold = threshold.max(1);
    self
  }

  pub fn build<I, T>(self, items: I) -> Result<Tree<H>>
  where
    I: IntoIterator<Item = T>,
    T: Into<Vec<u8>>,
  {
    let data = items.into_iter().map(Into::into).collect::<Vec<Vec<u8>>>();
    if data.is_empty() {
      return Err(Error::EmptyInput);
    }

    let start = Instant::now();
    let TreeBuilder { hasher, salt, parallel_threshold } = self;
    let branch_len = data.len().next_power_of_two();

    let mut nodes = Vec::with_capacity(2 * branch_len);
    nodes.resize(branch_len, Digest::new());
    nodes.extend(hash_leaves(&data, &hasher, salt.as_deref(), branch_len, parallel_threshold));

    // level by level, the parents [w, 2w) of the children [2w, 4w)
    let mut width = branch_len / 2;
    while width > 0 {
      let (upper, lower) = nodes.split_at_mut(2 * width);
      hash_level(&lower[..2 * width], &mut upper[width..], &hasher, parallel_threshold);
      width /= 2;
    }

    debug!(
      "built tree: {} items, branch width {}, salted={}, {:?}",
      data.len(),
      branch_len,
      salt.is_some(),
      start.elapsed()
    );
    Ok(Tree { salt, hasher, data, nodes, branch_len })
  }
}

/// Leaf layer of width `branch_len`, padded with placeholders.
pub(crate) fn hash_leaves<T, H>(
  items: &[T],
  hasher: &H,
  salt: Option<&[u8]>,
  branch_len: usize,
  parallel_threshold: usize,
) -> Vec<Digest>
where
  T: AsRef<[u8]> + Sync,
  H: HashProvider,
{
  debug_assert!(branch_len >= items.len());
  let mut leaves = if items.len() >= parallel_threshold {
    items.par_iter().map(|item| hasher.hash_leaf(item.as_ref(), salt)).collect::<Vec<_>>()
  } else {
    items.iter().map(|item| hasher.hash_leaf(item.as_ref(), salt)).collect::<Vec<_>>()
  };
  leaves.resize(branch_len, hasher.placeholder());
  leaves
}

/// Fill `parents` with the pairwise hashes of `children`.
pub(crate) fn hash_level<H: HashProvider>(
  children: &[Digest],
  parents: &mut [Digest],
  hasher: &H,
  parallel_threshold: usize,
) {
  debug_assert_eq!(children.len(), 2 * parents.len());
  if parents.len() >= parallel_threshold {
    parents
      .par_iter_mut()
      .zip(children.par_chunks(2))
      .for_each(|(parent, pair)| *parent = hasher.hash_branch(&pair[0], &pair[1]));
  } else {
    for (parent, pair) in parents.iter_mut().zip(children.chunks(2)) {
      *parent = hasher.hash_branch(&pair[0], &pair[1]);
    }
  }
}

/// The level above `level`, which must have an even width.
pub(crate) fn next_level<H: HashProvider>(level: &[Digest], hasher: &H, parallel_threshold: usize) -> Vec<Digest> {
  let mut parents = vec![Digest::new(); level.len() / 2];
  hash_level(level, &mut parents, hasher, parallel_threshold);
  parents
}
