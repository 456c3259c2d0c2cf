//! Command-line surface. Out of scope for the simulation engine
//! itself (§6), but resolving it into a [`SimConfig`] the engine
//! actually consumes lives here rather than in `main.rs`.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::{error::ConfigError, latency::Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
  Centralized,
  ProofOfWork,
  ProofOfStake,
}

impl FromStr for Protocol {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "c" => Ok(Protocol::Centralized),
      "pow" => Ok(Protocol::ProofOfWork),
      "pos" => Ok(Protocol::ProofOfStake),
      other => Err(ConfigError::UnknownProtocol(other.to_string())),
    }
  }
}

#[derive(Debug, Parser)]
#[clap(version, about = "Discrete-event simulator of blockchain consensus protocols")]
pub struct CliOpts {
  #[clap(long = "type", help = "protocol to simulate: pow, pos, c")]
  pub protocol: String,

  #[clap(short, long, help = "number of nodes in the simulated network")]
  pub nodes: usize,

  #[clap(short, long, help = "path to the transaction schedule (JSON)")]
  pub schedule: PathBuf,

  #[clap(
    long = "topo",
    default_value = "equidistant",
    help = "network topology: equidistant, wide-area"
  )]
  pub topology: String,

  #[clap(long, help = "tag used only for log output, not consumed by the engine")]
  pub name: Option<String>,

  #[clap(long, default_value_t = 1, help = "PRNG seed for latency/congestion/validator selection")]
  pub seed: u64,

  #[clap(
    long = "max-ticks",
    help = "safety bound: halt and report as-is if consensus hasn't converged by this tick"
  )]
  pub max_ticks: Option<u64>,

  #[clap(
    short,
    long,
    parse(from_occurrences),
    help = "use verbose output (-vv very verbose output)"
  )]
  pub verbose: u64,
}

/// A [`CliOpts`] resolved into the concrete values the engine needs,
/// with every discriminator already validated.
pub struct SimConfig {
  pub protocol: Protocol,
  pub node_count: usize,
  pub schedule_path: PathBuf,
  pub topology: Topology,
  pub seed: u64,
  pub max_ticks: Option<u64>,
}

impl CliOpts {
  pub fn resolve(&self) -> Result<SimConfig, ConfigError> {
    if self.nodes == 0 {
      return Err(ConfigError::ZeroNodes);
    }
    Ok(SimConfig {
      protocol: self.protocol.parse()?,
      node_count: self.nodes,
      schedule_path: self.schedule.clone(),
      topology: self.topology.parse()?,
      seed: self.seed,
      max_ticks: self.max_ticks,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_protocol_is_a_config_error() {
    assert!(matches!(
      "xyz".parse::<Protocol>(),
      Err(ConfigError::UnknownProtocol(_))
    ));
  }

  #[test]
  fn zero_nodes_is_rejected_before_anything_else_resolves() {
    let opts = CliOpts {
      protocol: "c".into(),
      nodes: 0,
      schedule: PathBuf::from("schedule.json"),
      topology: "equidistant".into(),
      name: None,
      seed: 1,
      max_ticks: None,
      verbose: 0,
    };
    assert!(matches!(opts.resolve(), Err(ConfigError::ZeroNodes)));
  }
}
