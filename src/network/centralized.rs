//! Single trusted server: every transaction routes to node 0, which
//! mints a block immediately (no hash gate) and broadcasts it.

use crate::block::Block;

use super::{NetworkCore, ProtocolBehavior};
use crate::bus::Message;

/// Node `0` is the designated server, fixed at construction (§4.6).
pub struct CentralizedBehavior {
  server_id: usize,
}

impl CentralizedBehavior {
  pub fn new() -> Self {
    Self { server_id: 0 }
  }
}

impl Default for CentralizedBehavior {
  fn default() -> Self {
    Self::new()
  }
}

impl ProtocolBehavior for CentralizedBehavior {
  fn add_transaction(&mut self, core: &mut NetworkCore, payload: String, sender: usize) {
    // Unlike PoW/PoS, the reference never special-cases `sender ==
    // server_id` here: a server-originated transaction still incurs
    // a real (if likely small) sampled delay to itself.
    core.wire_send(sender, self.server_id, Message::Transaction(payload));
  }

  fn ingest_block(&mut self, core: &mut NetworkCore, dest: usize, block: Block) {
    core.nodes[dest].ledger.add_block_centralized(block);
  }

  fn ingest_transaction(
    &mut self,
    core: &mut NetworkCore,
    dest: usize,
    payload: String,
    _sender: usize,
  ) {
    debug_assert_eq!(dest, self.server_id, "only the server ever sees a transaction");
    let block = core.nodes[dest].ledger.process_txn(payload, core.time);
    core.nodes[dest].ledger.add_block_centralized(block.clone());
    core.broadcast(dest, Message::Block(block));
  }

  fn after_deliver(&mut self, _core: &mut NetworkCore) {
    // The server mints on receipt (step 4); there is no separate
    // per-tick proposal step for this protocol.
  }

  fn label(&self) -> &'static str {
    "centralized"
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{block::Block as B, latency::{LatencyModel, Topology}, node::Node, schedule::Schedule};

  fn core() -> NetworkCore {
    let genesis = Arc::new(B::genesis("genesis block"));
    let nodes = (0..3).map(|id| Node::new(id, genesis.clone())).collect();
    let latency = LatencyModel::new(Topology::Equidistant, 3, 1).unwrap();
    NetworkCore::new(nodes, latency, Schedule::default(), None)
  }

  #[test]
  fn server_mints_on_receipt_and_never_gates_on_pow() {
    let mut core = core();
    let mut behavior = CentralizedBehavior::new();
    behavior.ingest_transaction(&mut core, 0, "a".into(), 1);
    assert_eq!(core.nodes[0].ledger.head().data, "a");
    assert!(!core.nodes[0].ledger.head().satisfies_pow());
  }

  #[test]
  fn broadcast_reaches_every_other_node_eventually() {
    let mut core = core();
    let mut behavior = CentralizedBehavior::new();
    behavior.ingest_transaction(&mut core, 0, "a".into(), 0);
    // The block was enqueued for nodes 1 and 2 at some future tick.
    let block = core.nodes[0].ledger.head().as_ref().clone();
    for dest in 1..3 {
      behavior.ingest_block(&mut core, dest, block.clone());
      assert_eq!(core.nodes[dest].ledger.head().data, "a");
    }
  }
}
