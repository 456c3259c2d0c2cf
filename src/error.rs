use thiserror::Error;

/// Fails fast, before the tick loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("protocol discriminator must be one of pow, pos, c, got {0:?}")]
  UnknownProtocol(String),

  #[error("topology discriminator must be one of equidistant, wide-area, got {0:?}")]
  UnknownTopology(String),

  #[error("node count must be at least 1")]
  ZeroNodes,

  #[error("wide-area topology requires the node count to be divisible by 4, got {0}")]
  WideAreaNotDivisible(usize),
}

/// Surfaced while parsing or replaying a [`crate::schedule::Schedule`].
#[derive(Debug, Error)]
pub enum ScheduleError {
  #[error("schedule entry at tick {tick} references node {node}, but only {node_count} nodes exist")]
  OriginOutOfRange {
    tick: u64,
    node: usize,
    node_count: usize,
  },

  #[error("failed to parse schedule file: {0}")]
  Malformed(#[from] serde_json::Error),

  #[error("failed to read schedule file {path:?}: {source}")]
  Io {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },
}
