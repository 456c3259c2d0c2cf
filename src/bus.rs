//! Per-node, time-indexed inboxes and the congestion model that
//! perturbs delivery delay on top of whatever the [`crate::latency`]
//! sampler drew.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use crate::{block::Block, latency::poisson_sample};

/// What's in an inbox slot. The variant doubles as the BLOCK vs
/// TRANSACTION `kind` discriminator, so matching on it is the
/// partition step in §4.5.
#[derive(Debug, Clone)]
pub enum Message {
  Block(Block),
  Transaction(String),
}

/// Per-node, per-tick mailbox plus the sender-receiver congestion
/// gauge described in §4.3.
#[derive(Default)]
pub struct MessageBus {
  inbox: HashMap<usize, BTreeMap<u64, Vec<(Message, usize)>>>,
  in_transit: HashMap<(usize, usize), u64>,
}

impl MessageBus {
  pub fn new(node_count: usize) -> Self {
    let mut inbox = HashMap::with_capacity(node_count);
    for id in 0..node_count {
      inbox.insert(id, BTreeMap::new());
    }
    Self {
      inbox,
      in_transit: HashMap::new(),
    }
  }

  /// Places `item` into `dest`'s mailbox for delivery at `at_tick`.
  /// Items enqueued at the same tick are kept in insertion order.
  pub fn enqueue(
    &mut self,
    dest: usize,
    at_tick: u64,
    item: Message,
    sender: usize,
  ) {
    self
      .inbox
      .entry(dest)
      .or_default()
      .entry(at_tick)
      .or_default()
      .push((item, sender));
  }

  /// Removes and returns everything scheduled for `dest` at `tick`.
  pub fn drain(&mut self, dest: usize, tick: u64) -> Vec<(Message, usize)> {
    self
      .inbox
      .get_mut(&dest)
      .and_then(|slots| slots.remove(&tick))
      .unwrap_or_default()
  }

  /// The congestion component of delivery delay, per §4.3: the first
  /// observed message between a pair costs nothing and seeds the
  /// gauge at 1; every subsequent one (before the gauge drains back
  /// down) draws from `Poisson(2^c)` where `c` is the gauge's value
  /// *before* this call increments it.
  pub fn additional_delay(
    &mut self,
    sender: usize,
    receiver: usize,
    rng: &mut impl Rng,
  ) -> u64 {
    if sender == receiver {
      return 0;
    }
    match self.in_transit.get(&(sender, receiver)).copied() {
      Some(count) => {
        self.in_transit.insert((sender, receiver), count + 1);
        poisson_sample(rng, 2f64.powi(count as i32))
      }
      None => {
        self.in_transit.insert((sender, receiver), 1);
        0
      }
    }
  }

  /// Called when a message between this pair is consumed out of an
  /// inbox (not when its delivery tick merely arrives).
  pub fn remove_from_transit(&mut self, sender: usize, receiver: usize) {
    if sender == receiver {
      return;
    }
    if let Some(count) = self.in_transit.get_mut(&(sender, receiver)) {
      if *count > 0 {
        *count -= 1;
      }
    }
  }
}
