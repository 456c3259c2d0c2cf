//! The tick loop shared by all three protocol variants, plus the
//! [`ProtocolBehavior`] seam that keeps them from needing a deep
//! inheritance hierarchy.
//!
//! [`NetworkCore`] owns everything a tick touches that isn't protocol
//! logic: the nodes, the clock, the message bus, the latency sampler,
//! the schedule and the timing tables. A [`Network<B>`] pairs that
//! state with one `B: ProtocolBehavior` and drives the six-step tick
//! (§4.5): observe & stamp, check termination, inject, deliver, work,
//! advance.

pub mod centralized;
pub mod pos;
pub mod pow;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::{
  block::Block,
  bus::{Message, MessageBus},
  latency::LatencyModel,
  node::Node,
  observer::{consensus_index, majority_index, stamp_latency},
  results::{Metrics, Results, RunOutput, TxRecord},
  schedule::Schedule,
};

/// Everything a tick step needs that isn't specific to one protocol.
pub struct NetworkCore {
  pub(crate) nodes: Vec<Node>,
  pub(crate) time: u64,
  latency: LatencyModel,
  bus: MessageBus,
  schedule: Schedule,
  latencies: BTreeMap<u64, TxRecord>,
  consensus_times: BTreeMap<u64, TxRecord>,
  transaction_num: u64,
  num_computations: u64,
  packets_sent: u64,
  last_block_id: u64,
  max_ticks: Option<u64>,
}

impl NetworkCore {
  pub fn new(
    nodes: Vec<Node>,
    latency: LatencyModel,
    schedule: Schedule,
    max_ticks: Option<u64>,
  ) -> Self {
    let bus = MessageBus::new(nodes.len());
    let last_block_id = schedule.total_entries();
    Self {
      nodes,
      time: 0,
      latency,
      bus,
      schedule,
      latencies: BTreeMap::new(),
      consensus_times: BTreeMap::new(),
      transaction_num: 0,
      num_computations: 0,
      packets_sent: 0,
      last_block_id,
      max_ticks,
    }
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// A full wire send: samples latency and congestion, counts a
  /// packet. Used whenever the destination isn't guaranteed to be the
  /// sender itself, including the centralized server delivering to
  /// itself, which the reference never special-cases (§4.6).
  pub(crate) fn wire_send(&mut self, sender: usize, dest: usize, item: Message) {
    let latency = self.latency.sample(sender, dest);
    let congestion = self.bus.additional_delay(sender, dest, self.latency.rng());
    let delay = latency + congestion;
    self.bus.enqueue(dest, self.time + delay, item, sender);
    self.packets_sent += 1;
  }

  /// Delivers to `dest` at the current tick with no delay, no
  /// congestion and no packet count: PoW/PoS echoing a transaction
  /// straight back to its own sender (§4.3, §4.7, §4.8).
  pub(crate) fn local_echo(&mut self, dest: usize, item: Message, sender: usize) {
    self.bus.enqueue(dest, self.time, item, sender);
  }

  /// Sends `item` to every node other than `sender`. Matches the
  /// reference's `broadcast_block`: it still draws from the congestion
  /// sampler for the `in_transit` side effect, but only the sampled
  /// latency (not the congestion draw) counts toward delivery delay.
  pub(crate) fn broadcast(&mut self, sender: usize, item: Message) {
    for dest in 0..self.node_count() {
      if dest != sender {
        let latency = self.latency.sample(sender, dest);
        let _congestion = self.bus.additional_delay(sender, dest, self.latency.rng());
        self.bus.enqueue(dest, self.time + latency, item.clone(), sender);
        self.packets_sent += 1;
      }
    }
  }

  fn finish(&self) -> RunOutput {
    let metrics = Metrics {
      num_computations: self.num_computations,
      num_packets: self.packets_sent,
    };
    RunOutput {
      majority: Results {
        transactions: self.latencies.clone(),
        metrics,
      },
      consensus: Results {
        transactions: self.consensus_times.clone(),
        metrics,
      },
    }
  }
}

/// What a single tick produced.
///
/// `Finished` is only returned once the whole run has converged (or
/// hit its safety bound); [`Network::tick`] never ends a run early on
/// its own for any other reason.
pub enum TickOutcome {
  Running,
  Finished(RunOutput),
}

/// A per-protocol hook set over a shared [`NetworkCore`]. Implemented
/// once per protocol variant (centralized / PoW / PoS) instead of
/// threading a protocol enum through the tick skeleton.
pub trait ProtocolBehavior {
  /// Step 3 (inject): route a freshly scheduled `payload` from `sender`.
  fn add_transaction(&mut self, core: &mut NetworkCore, payload: String, sender: usize);

  /// Step 4 (deliver, BLOCK half): `block` arrived at `dest`.
  fn ingest_block(&mut self, core: &mut NetworkCore, dest: usize, block: Block);

  /// Step 4 (deliver, TRANSACTION half): `payload` arrived at `dest`
  /// from `sender`.
  fn ingest_transaction(
    &mut self,
    core: &mut NetworkCore,
    dest: usize,
    payload: String,
    sender: usize,
  );

  /// Step 5 (work): mining or proposal, run once per tick after every
  /// node has processed its inbox.
  fn after_deliver(&mut self, core: &mut NetworkCore);

  /// Name used only for diagnostics.
  fn label(&self) -> &'static str;
}

/// Pairs a [`NetworkCore`] with the behavior that decides what its
/// transactions, blocks and per-tick work actually do.
pub struct Network<B: ProtocolBehavior> {
  core: NetworkCore,
  behavior: B,
}

impl<B: ProtocolBehavior> Network<B> {
  pub fn new(core: NetworkCore, behavior: B) -> Self {
    Self { core, behavior }
  }

  pub fn core(&self) -> &NetworkCore {
    &self.core
  }

  /// Runs ticks until the run converges or the safety bound (if any)
  /// is reached.
  pub fn run(&mut self) -> RunOutput {
    loop {
      if let TickOutcome::Finished(output) = self.tick() {
        return output;
      }
    }
  }

  /// One pass of the six-step tick (§4.5).
  pub fn tick(&mut self) -> TickOutcome {
    let Self { core, behavior } = self;

    // 1. Observe & stamp.
    let majority = majority_index(&core.nodes);
    let consensus = consensus_index(&core.nodes);
    stamp_latency(&mut core.latencies, majority, core.time);
    stamp_latency(&mut core.consensus_times, consensus, core.time);

    // 2. Termination check.
    if consensus == core.last_block_id {
      info!(tick = core.time, protocol = behavior.label(), "converged");
      return TickOutcome::Finished(core.finish());
    }
    if let Some(max) = core.max_ticks {
      if core.time >= max {
        warn!(
          tick = core.time,
          protocol = behavior.label(),
          "hit the safety tick bound before consensus finished"
        );
        return TickOutcome::Finished(core.finish());
      }
    }

    // 3. Inject.
    let due: Vec<(usize, String)> = core
      .schedule
      .at(core.time)
      .map(<[(usize, String)]>::to_vec)
      .unwrap_or_default();
    for (origin, payload) in due {
      core.transaction_num += 1;
      let seq = core.transaction_num;
      core.latencies.insert(seq, TxRecord::new(core.time));
      core.consensus_times.insert(seq, TxRecord::new(core.time));
      debug!(tick = core.time, seq, origin, "injecting transaction");
      behavior.add_transaction(core, payload, origin);
    }

    // 4. Deliver: block items before transaction items, blocks sorted
    // by ascending block_id (§4.5 tie-breaks, P8).
    for dest in 0..core.node_count() {
      let items = core.bus.drain(dest, core.time);
      if items.is_empty() {
        continue;
      }
      let mut blocks: Vec<(Block, usize)> = Vec::new();
      let mut txns: Vec<(String, usize)> = Vec::new();
      for (message, sender) in items {
        core.bus.remove_from_transit(sender, dest);
        match message {
          Message::Block(block) => blocks.push((block, sender)),
          Message::Transaction(payload) => txns.push((payload, sender)),
        }
      }
      blocks.sort_by_key(|(block, _)| block.block_id);
      for (block, _sender) in blocks {
        behavior.ingest_block(core, dest, block);
      }
      for (payload, sender) in txns {
        behavior.ingest_transaction(core, dest, payload, sender);
      }
    }

    // 5. Work.
    behavior.after_deliver(core);

    // 6. Advance time.
    core.time += 1;
    TickOutcome::Running
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    block::Block,
    latency::Topology,
    network::{centralized::CentralizedBehavior, pos::ProofOfStakeBehavior, pow::ProofOfWorkBehavior},
  };

  fn nodes(n: usize) -> Vec<Node> {
    let genesis = Arc::new(Block::genesis("genesis block"));
    (0..n).map(|id| Node::new(id, genesis.clone())).collect()
  }

  fn core(n: usize, schedule: Schedule) -> NetworkCore {
    let latency = LatencyModel::new(Topology::Equidistant, n, 7).unwrap();
    NetworkCore::new(nodes(n), latency, schedule, Some(100_000))
  }

  fn core_wide_area(n: usize, schedule: Schedule) -> NetworkCore {
    let latency = LatencyModel::new(Topology::WideArea, n, 7).unwrap();
    NetworkCore::new(nodes(n), latency, schedule, Some(100_000))
  }

  fn schedule_of(entries: &[(u64, usize, &str)]) -> Schedule {
    let mut map: BTreeMap<u64, Vec<(usize, String)>> = BTreeMap::new();
    for (tick, origin, payload) in entries {
      map.entry(*tick).or_default().push((*origin, payload.to_string()));
    }
    Schedule::new(map)
  }

  #[test]
  fn centralized_converges_and_orders_the_chain() {
    let schedule = schedule_of(&[(2, 0, "a"), (5, 1, "b"), (8, 2, "c")]);
    let mut network = Network::new(core(3, schedule), CentralizedBehavior::new());
    let output = network.run();

    let chain_data: Vec<String> = network
      .core()
      .nodes
      .iter()
      .map(|n| n.ledger.head().data.clone())
      .collect();
    assert!(chain_data.iter().all(|d| d == "c"));
    assert_eq!(output.majority.transactions.len(), 3);
    assert_eq!(output.majority.metrics.num_computations, 0);
  }

  #[test]
  fn proof_of_work_eventually_seals_and_converges() {
    let schedule = schedule_of(&[(0, 0, "x")]);
    let mut network = Network::new(core(5, schedule), ProofOfWorkBehavior::new());
    let output = network.run();
    for node in &network.core().nodes {
      assert_eq!(node.ledger.head().data, "x");
    }
    assert!(output.consensus.metrics.num_computations > 0);
  }

  #[test]
  fn proof_of_stake_validator_mints_every_transaction() {
    // §8 scenario 3: PoS over 4 nodes on the wide-area topology.
    let schedule = schedule_of(&[(0, 0, "p"), (1, 0, "q")]);
    let behavior = ProofOfStakeBehavior::new(4, 99);
    let mut network = Network::new(core_wide_area(4, schedule), behavior);
    let output = network.run();
    assert_eq!(output.majority.metrics.num_computations, 2);
    for node in &network.core().nodes {
      assert_eq!(node.ledger.block_at(2).map(|b| b.data.as_str()), Some("q"));
    }
  }

  #[test]
  fn proof_of_work_duplicate_race_lands_exactly_once() {
    // Same payload scheduled from two different origins at the same
    // tick (§8 scenario 4). `last_block_id` counts both flattened
    // schedule entries even though only one block is ever mined for
    // "dup" (see the `last_block_id` open question in DESIGN.md), so
    // this never naturally converges. Drive ticks directly and stop
    // once the one block has landed.
    let schedule = schedule_of(&[(0, 0, "dup"), (0, 1, "dup")]);
    let mut network = Network::new(core(3, schedule), ProofOfWorkBehavior::new());
    for _ in 0..5_000 {
      if network.core().nodes.iter().all(|n| n.ledger.head().block_id == 1) {
        break;
      }
      network.tick();
    }
    for node in &network.core().nodes {
      assert_eq!(node.ledger.head().data, "dup");
      assert_eq!(node.ledger.head().block_id, 1);
    }
  }
}
