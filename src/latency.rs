//! Topology presets and the stochastic per-edge latency sampler.
//!
//! Topology selection (`equidistant` vs `wide-area`) is an external
//! input, and the core only ever consumes the resulting `(a, b) -> u64`
//! sampler, but building that sampler from a mean-latency matrix is
//! squarely part of the simulation engine (§4.2), so it lives here
//! rather than behind the CLI boundary.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Poisson};

use crate::error::ConfigError;

const DEFAULT_MEAN_LATENCY: f64 = 500.0;

/// Discriminator consumed from the CLI/config layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
  Equidistant,
  WideArea,
}

impl std::str::FromStr for Topology {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "equidistant" => Ok(Topology::Equidistant),
      "wide-area" => Ok(Topology::WideArea),
      other => Err(ConfigError::UnknownTopology(other.to_string())),
    }
  }
}

/// Builds the mean-latency matrix for a topology over `node_count`
/// nodes. Keyed on the unordered pair `(min(a,b), max(a,b))`.
fn build_matrix(
  topology: Topology,
  node_count: usize,
) -> Result<HashMap<(usize, usize), f64>, ConfigError> {
  let mut matrix = HashMap::new();
  match topology {
    Topology::Equidistant => {
      for a in 0..node_count {
        for b in (a + 1)..node_count {
          matrix.insert((a, b), 200.0);
        }
      }
    }
    Topology::WideArea => {
      if node_count % 4 != 0 {
        return Err(ConfigError::WideAreaNotDivisible(node_count));
      }
      let quarter_size = node_count / 4;
      for a in 0..node_count {
        for b in (a + 1)..node_count {
          let same_quarter = a / quarter_size == b / quarter_size;
          matrix.insert((a, b), if same_quarter { 200.0 } else { 400.0 });
        }
      }
    }
  }
  Ok(matrix)
}

/// Produces an independent Poisson(mean) sample for every call:
/// `latency(a, b)` and `latency(b, a)` read the same matrix entry
/// but are not correlated draws.
pub struct LatencyModel {
  matrix: HashMap<(usize, usize), f64>,
  rng: ChaCha20Rng,
}

impl LatencyModel {
  pub fn new(
    topology: Topology,
    node_count: usize,
    seed: u64,
  ) -> Result<Self, ConfigError> {
    Ok(Self {
      matrix: build_matrix(topology, node_count)?,
      rng: ChaCha20Rng::seed_from_u64(seed),
    })
  }

  fn mean(&self, a: usize, b: usize) -> f64 {
    let key = (a.min(b), a.max(b));
    *self.matrix.get(&key).unwrap_or(&DEFAULT_MEAN_LATENCY)
  }

  /// Draws a tick delay for the edge `(a, b)`. A missing pair (which
  /// includes `a == b`, since the matrix never stores a self-edge)
  /// falls back to the Poisson(500) default (§4.2).
  pub fn sample(&mut self, a: usize, b: usize) -> u64 {
    let mean = self.mean(a, b);
    poisson_sample(&mut self.rng, mean)
  }

  /// Shared congestion sampler, exposed so [`crate::bus::MessageBus`]
  /// can draw from the same RNG stream without owning one itself.
  pub fn rng(&mut self) -> &mut ChaCha20Rng {
    &mut self.rng
  }
}

/// `rand_distr::Poisson` rejects a mean of exactly zero; treat that
/// edge (which only arises for a pathological all-zero matrix) as a
/// guaranteed zero delay rather than panicking mid-simulation.
pub fn poisson_sample(rng: &mut impl Rng, mean: f64) -> u64 {
  if mean <= 0.0 {
    return 0;
  }
  let dist = Poisson::new(mean).expect("validated positive mean");
  dist.sample(rng) as u64
}
