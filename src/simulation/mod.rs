//! Simulation Module
//!
//! Primed in-memory cluster for running the engine without a real server.

pub mod cluster;
pub mod prime;

pub use cluster::{LoggedQuery, SimulatedCluster, SimulatedNode, SIMULATED_PORT};
pub use prime::{when, Prime, PrimeBuilder, PrimedResult};
