//! The external schedule input: a mapping from tick to the list of
//! transactions injected at that tick. Reading it off disk is a thin,
//! explicitly out-of-scope-but-convenient wrapper around `serde_json`;
//! the simulation engine itself only ever consumes an already parsed
//! [`Schedule`].

use std::{collections::BTreeMap, path::Path};

use crate::error::ScheduleError;

/// `tick -> [(origin_node_id, payload), ...]`.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
  entries: BTreeMap<u64, Vec<(usize, String)>>,
}

impl Schedule {
  pub fn new(entries: BTreeMap<u64, Vec<(usize, String)>>) -> Self {
    Self { entries }
  }

  pub fn at(&self, tick: u64) -> Option<&[(usize, String)]> {
    self.entries.get(&tick).map(Vec::as_slice)
  }

  /// Flattened (tick, entry) count across the whole schedule. Used
  /// as `last_block_id` (see DESIGN.md's Open Question decisions for
  /// why this is the flattened count rather than the reference's
  /// `len(schedule)`, the distinct-tick count).
  pub fn total_entries(&self) -> u64 {
    self.entries.values().map(|v| v.len() as u64).sum()
  }

  /// Validates that every origin id is a real node. Duplicate payloads
  /// across the schedule are not rejected here: they're a valid input
  /// (§8 scenario 4, the PoW duplicate race) that each ledger's
  /// `seen_data` guard resolves at runtime, not a load-time error.
  pub fn validate(&self, node_count: usize) -> Result<(), ScheduleError> {
    for (&tick, txns) in &self.entries {
      for (node, _payload) in txns {
        if *node >= node_count {
          return Err(ScheduleError::OriginOutOfRange {
            tick,
            node: *node,
            node_count,
          });
        }
      }
    }
    Ok(())
  }

  pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ScheduleError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse_json(&raw)
  }

  pub fn parse_json(raw: &str) -> Result<Self, ScheduleError> {
    let parsed: BTreeMap<String, Vec<(usize, String)>> = serde_json::from_str(raw)?;
    let mut entries = BTreeMap::new();
    for (tick_str, txns) in parsed {
      let tick: u64 = tick_str
        .parse()
        .map_err(|_| ScheduleError::Malformed(
          serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("schedule key {tick_str:?} is not a tick number"),
          )),
        ))?;
      entries.insert(tick, txns);
    }
    Ok(Self::new(entries))
  }
}
