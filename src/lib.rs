//! Discrete-event simulator of blockchain consensus protocols over a
//! synthetic node network: centralized trusted-server, Proof-of-Work,
//! and Proof-of-Stake, compared under configurable node counts and
//! topologies.

pub mod block;
pub mod bus;
pub mod cli;
pub mod error;
pub mod latency;
pub mod ledger;
pub mod network;
pub mod node;
pub mod observer;
pub mod results;
pub mod schedule;
