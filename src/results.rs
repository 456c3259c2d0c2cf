//! Output shape consumed by the (out-of-scope) plotting collaborator.
//!
//! The reference's `gen_graphs.py` computes an average latency as
//! `sum(...) / (len(j) - 1)`, which only makes sense if the results
//! map carries one reserved non-transaction entry alongside the N
//! transaction records. This module keeps that shape: serializing a
//! [`Results`] produces a JSON object with keys `"1".."N"` for each
//! transaction sequence number plus exactly one `"metrics"` key.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// One transaction's timing record. `latency` is `None` until the
/// relevant agreement level (majority or full consensus) has been
/// observed for its block.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TxRecord {
  pub start: u64,
  #[serde(rename = "LATENCY", skip_serializing_if = "Option::is_none")]
  pub latency: Option<u64>,
}

impl TxRecord {
  pub fn new(start: u64) -> Self {
    Self {
      start,
      latency: None,
    }
  }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Metrics {
  pub num_computations: u64,
  pub num_packets: u64,
}

/// A completed or safety-bound-truncated run's timing tables plus
/// aggregate metrics.
#[derive(Debug, Clone)]
pub struct Results {
  pub transactions: BTreeMap<u64, TxRecord>,
  pub metrics: Metrics,
}

/// The two tables a completed run reports: latency to majority
/// agreement and latency to full consensus (§6: "a second mapping of
/// identical shape may be emitted for consensus times"). Both share
/// the same `metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
  pub majority: Results,
  pub consensus: Results,
}

impl Serialize for Results {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(self.transactions.len() + 1))?;
    for (seq, record) in &self.transactions {
      map.serialize_entry(&seq.to_string(), record)?;
    }
    map.serialize_entry("metrics", &self.metrics)?;
    map.end()
  }
}
