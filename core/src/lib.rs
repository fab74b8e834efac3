//! RingWatch core — entity-link graph, fraud-ring detection and risk
//! scoring over an in-memory account snapshot.
//!
//! Pipeline: `snapshot` → `link_graph` → `ring_detector` → `risk_scorer`,
//! with `peer_benchmark` alongside and `policy_simulator` consuming the
//! resulting score distribution. `engine` wires the stages together.

pub mod account;
pub mod config;
pub mod engine;
pub mod error;
pub mod link_graph;
pub mod peer_benchmark;
pub mod policy_simulator;
pub mod ring_detector;
pub mod risk_scorer;
pub mod snapshot;
pub mod types;
