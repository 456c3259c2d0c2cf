use std::{
  collections::hash_map::DefaultHasher,
  hash::{Hash, Hasher},
};

use serde::Serialize;

/// A single entry in a node's ledger.
///
/// Blocks are immutable once constructed: mining never mutates an
/// in-flight candidate in place, it builds a fresh one every attempt
/// (see [`crate::ledger::Ledger::mine`]) and only seals it by
/// assigning `block_hash` once. There is deliberately no forward link
/// on this type; the per-node chain index lives on [`crate::ledger::Ledger`]
/// so that a single genesis block can be shared, unmodified, across
/// every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
  pub block_id: u64,
  pub data: String,
  pub nonce: u64,
  pub timestamp: u64,
  pub previous_hash: Option<u64>,
  pub block_hash: Option<u64>,
}

impl Block {
  /// Constructs the shared genesis block. Its hash is assigned
  /// immediately; genesis never goes through mining.
  pub fn genesis(data: impl Into<String>) -> Self {
    let mut block = Self {
      block_id: 0,
      data: data.into(),
      nonce: 0,
      timestamp: 0,
      previous_hash: None,
      block_hash: None,
    };
    let hash = block.compute_hash();
    block.block_hash = Some(hash);
    block
  }

  /// Builds an unsealed block. Used both by the mining inner loop
  /// (candidate construction) and by the centralized path
  /// ([`crate::ledger::Ledger::process_txn`], which never assigns
  /// `previous_hash`).
  pub fn unsealed(
    block_id: u64,
    data: String,
    nonce: u64,
    timestamp: u64,
    previous_hash: Option<u64>,
  ) -> Self {
    Self {
      block_id,
      data,
      nonce,
      timestamp,
      previous_hash,
      block_hash: None,
    }
  }

  /// The digest this block would have if sealed right now. Uniform
  /// enough modulo 600 for the PoW gate; deterministic given the
  /// tuple (id, data, nonce, timestamp) since [`DefaultHasher`] uses
  /// fixed SipHash keys.
  pub fn compute_hash(&self) -> u64 {
    let mut hasher = DefaultHasher::new();
    self.block_id.hash(&mut hasher);
    self.data.hash(&mut hasher);
    self.nonce.hash(&mut hasher);
    self.timestamp.hash(&mut hasher);
    hasher.finish()
  }

  /// Seals the block with the given digest. Callers are expected to
  /// have already verified `hash == self.compute_hash()`.
  pub fn sealed(mut self, hash: u64) -> Self {
    self.block_hash = Some(hash);
    self
  }

  /// `true` if `block_hash` was computed with a digest divisible by
  /// 600, i.e. this block would pass the PoW gate.
  pub fn satisfies_pow(&self) -> bool {
    matches!(self.block_hash, Some(h) if h % 600 == 0)
  }
}

impl std::fmt::Display for Block {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{} ({:?})", self.block_id, self.data)
  }
}
