use std::sync::Arc;

use clap::Parser;
use consensus_sim::{
  block::Block,
  cli::{CliOpts, Protocol, SimConfig},
  latency::LatencyModel,
  network::{
    centralized::CentralizedBehavior, pos::ProofOfStakeBehavior, pow::ProofOfWorkBehavior,
    Network, NetworkCore,
  },
  node::Node,
  results::RunOutput,
  schedule::Schedule,
};
use tracing::{info, Level};

fn init_logging(verbosity: u64) {
  let level = match verbosity {
    0 => Level::INFO,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  };
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_target(false)
    .init();
}

fn build_core(config: &SimConfig) -> anyhow::Result<NetworkCore> {
  let schedule = Schedule::load_json(&config.schedule_path)?;
  schedule.validate(config.node_count)?;

  let genesis = Arc::new(Block::genesis("genesis block"));
  let nodes: Vec<Node> = (0..config.node_count)
    .map(|id| Node::new(id, genesis.clone()))
    .collect();
  let latency = LatencyModel::new(config.topology, config.node_count, config.seed)?;

  Ok(NetworkCore::new(nodes, latency, schedule, config.max_ticks))
}

fn run(config: SimConfig) -> anyhow::Result<RunOutput> {
  let core = build_core(&config)?;
  let output = match config.protocol {
    Protocol::Centralized => Network::new(core, CentralizedBehavior::new()).run(),
    Protocol::ProofOfWork => Network::new(core, ProofOfWorkBehavior::new()).run(),
    Protocol::ProofOfStake => {
      Network::new(core, ProofOfStakeBehavior::new(config.node_count, config.seed)).run()
    }
  };
  Ok(output)
}

fn main() -> anyhow::Result<()> {
  let opts = CliOpts::parse();
  init_logging(opts.verbose);

  let config = opts.resolve()?;
  info!(
    protocol = ?config.protocol,
    nodes = config.node_count,
    "starting run{}",
    opts.name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default()
  );

  let output = run(config)?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
