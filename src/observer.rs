//! Computes which blocks have reached majority or full agreement
//! across all nodes, and stamps transaction latencies once they have.

use std::collections::BTreeMap;

use crate::{node::Node, results::TxRecord};

/// The highest `block_id` a strict majority (`ceil(n/2)`) of nodes
/// agree on. A parallel walk from genesis: at each depth, count how
/// many ledgers still have a block there; stop as soon as that count
/// drops below the majority threshold. Contiguity of ids along a
/// linear chain (L2) is what makes "has a block at depth d" a stable
/// notion to walk over.
pub fn majority_index(nodes: &[Node]) -> u64 {
  let majority = (nodes.len() + 1) / 2;
  let mut last_majority_depth = 0u64;
  let mut depth = 0u64;
  loop {
    let next_depth = depth + 1;
    let have_successor = nodes
      .iter()
      .filter(|n| n.ledger.block_at(next_depth).is_some())
      .count();
    if have_successor < majority {
      return last_majority_depth;
    }
    last_majority_depth = next_depth;
    depth = next_depth;
  }
}

/// The highest `block_id` present on *every* node.
pub fn consensus_index(nodes: &[Node]) -> u64 {
  let mut depth = 0u64;
  loop {
    let next_depth = depth + 1;
    let all_have_successor = nodes.iter().all(|n| n.ledger.block_at(next_depth).is_some());
    if !all_have_successor {
      return depth;
    }
    depth = next_depth;
  }
}

/// Fills in `LATENCY` for every sequence index up to and including
/// `observed_index` that doesn't have one yet. Correct because the
/// k-th scheduled transaction becomes the k-th block: the schedule
/// order is ground truth.
pub fn stamp_latency(
  table: &mut BTreeMap<u64, TxRecord>,
  observed_index: u64,
  now: u64,
) {
  for seq in 1..=observed_index {
    if let Some(record) = table.get_mut(&seq) {
      if record.latency.is_none() {
        record.latency = Some(now - record.start);
      }
    }
  }
}
