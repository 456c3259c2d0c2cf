//! A single validator, chosen uniformly at random once per run, mints
//! every block; everyone else only ever consumes blocks (§4.8).

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand::SeedableRng;

use crate::block::Block;
use crate::bus::Message;

use super::{NetworkCore, ProtocolBehavior};

pub struct ProofOfStakeBehavior {
  validator_id: usize,
}

impl ProofOfStakeBehavior {
  /// Picks the validator uniformly from `[0, node_count)` using its
  /// own seed, independent of the latency/congestion RNG stream
  /// (§5: "a fixed seed ... for PoS validator selection").
  pub fn new(node_count: usize, seed: u64) -> Self {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    Self {
      validator_id: rng.gen_range(0..node_count),
    }
  }

  pub fn validator_id(&self) -> usize {
    self.validator_id
  }
}

impl ProtocolBehavior for ProofOfStakeBehavior {
  fn add_transaction(&mut self, core: &mut NetworkCore, payload: String, sender: usize) {
    if sender == self.validator_id {
      core.local_echo(self.validator_id, Message::Transaction(payload), sender);
    } else {
      core.wire_send(sender, self.validator_id, Message::Transaction(payload));
    }
  }

  fn ingest_block(&mut self, core: &mut NetworkCore, dest: usize, block: Block) {
    core.nodes[dest].ledger.add_block(block);
  }

  fn ingest_transaction(
    &mut self,
    core: &mut NetworkCore,
    dest: usize,
    payload: String,
    _sender: usize,
  ) {
    debug_assert_eq!(dest, self.validator_id, "only the validator ever sees a transaction");
    core.nodes[dest].ledger.enqueue_pending(payload);
  }

  fn after_deliver(&mut self, core: &mut NetworkCore) {
    if let Some((block, work)) = core.nodes[self.validator_id].ledger.mine_pos(core.time) {
      core.num_computations += work;
      core.broadcast(self.validator_id, Message::Block(block));
    }
  }

  fn label(&self) -> &'static str {
    "pos"
  }
}
