use std::sync::Arc;

use crate::{block::Block, ledger::Ledger};

/// A peer in the simulated network: nothing more than an opaque id
/// and a ledger. There is no key material here; node identity is
/// purely the `id` (Non-goal: real cryptographic signatures).
pub struct Node {
  pub id: usize,
  pub ledger: Ledger,
}

impl Node {
  pub fn new(id: usize, genesis: Arc<Block>) -> Self {
    Self {
      id,
      ledger: Ledger::new(genesis),
    }
  }
}
