//! Every node mines independently; whichever node first finds a nonce
//! whose hash is divisible by 600 broadcasts the sealed block (§4.7).

use crate::block::Block;
use crate::bus::Message;

use super::{NetworkCore, ProtocolBehavior};

#[derive(Default)]
pub struct ProofOfWorkBehavior;

impl ProofOfWorkBehavior {
  pub fn new() -> Self {
    Self
  }
}

impl ProtocolBehavior for ProofOfWorkBehavior {
  fn add_transaction(&mut self, core: &mut NetworkCore, payload: String, sender: usize) {
    for dest in 0..core.node_count() {
      if dest == sender {
        core.local_echo(dest, Message::Transaction(payload.clone()), sender);
      } else {
        core.wire_send(sender, dest, Message::Transaction(payload.clone()));
      }
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
    core.nodes[dest].ledger.enqueue_pending(payload);
  }

  fn after_deliver(&mut self, core: &mut NetworkCore) {
    for id in 0..core.node_count() {
      if let Some((block, work)) = core.nodes[id].ledger.mine(core.time) {
        core.num_computations += work;
        core.broadcast(id, Message::Block(block));
      }
    }
  }

  fn label(&self) -> &'static str {
    "pow"
  }
}
