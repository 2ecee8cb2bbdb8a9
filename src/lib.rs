//! treestat - parallel mean and variance over a power-of-two worker group
//!
//! A dataset held by one coordinating worker is split into equal blocks, one
//! per worker. Each worker reduces its block to a local sum; the sums are
//! combined at the coordinator, and the resulting mean is replicated to every
//! worker with a binary-tree broadcast. The same is then done with sums of
//! squares to obtain the population variance.
//!
//! # Architecture
//!
//! - **Topology**: power-of-two group, tree level arithmetic
//! - **Distributed**: rendezvous message transport and collectives
//! - **Worker**: partitioning and the two-phase statistics computation
//! - **Coordinator**: one thread per worker, join, replication check
//! - **Stats**: local sums, serial reference check

pub mod config;
pub mod coordinator;
pub mod dataset;
pub mod distributed;
pub mod output;
pub mod stats;
pub mod topology;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use stats::Moments;
pub use worker::Worker;

/// Result type used throughout treestat
pub type Result<T> = anyhow::Result<T>;
