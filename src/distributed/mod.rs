//! Collective communication between workers
//!
//! This module implements the message passing a run is built from.
//!
//! # Architecture
//!
//! Workers follow a single-program-multiple-data model: every worker runs the
//! same code and takes part in every collective call.
//!
//! - **Coordinator** (rank 0): owns the dataset, computes every global value
//! - **Workers** (ranks 1..P): receive a partition, contribute local scalars,
//!   receive the replicated results
//!
//! All calls are blocking. There are no timeouts: a worker waiting on a peer
//! that never shows up waits until the group is aborted.
//!
//! # Modules
//!
//! - `protocol`: Message definitions
//! - `mesh`: Rendezvous channel transport, abort signal, traffic counters
//! - `collective`: Block-size broadcast, scatter, sum reduction
//! - `tree`: Binary-tree scalar broadcast

pub mod collective;
pub mod mesh;
pub mod protocol;
pub mod tree;

use thiserror::Error;

pub use collective::{broadcast_block_size, reduce_sum, scatter};
pub use mesh::{AbortSignal, Endpoint, Mesh, TrafficSnapshot, TrafficStats};
pub use protocol::{Message, MessageKind};
pub use tree::TreeBroadcaster;

/// Communication failures
///
/// None of these are retried. Any of them ends the run for the whole group.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommError {
    #[error("rank {rank}: unable to allocate partition buffer of {elements} values")]
    AllocationFailure { rank: usize, elements: usize },

    #[error("rank {rank}: peer {peer} disconnected")]
    PeerDisconnected { rank: usize, peer: usize },

    #[error("rank {rank}: worker group aborted")]
    Aborted { rank: usize },

    #[error("rank {rank}: expected {expected} from rank {peer}, got {got}")]
    UnexpectedMessage {
        rank: usize,
        peer: usize,
        expected: MessageKind,
        got: MessageKind,
    },

    #[error("rank {rank}: received block of {got} values, expected {expected}")]
    BlockSizeMismatch {
        rank: usize,
        expected: usize,
        got: usize,
    },

    #[error("rank {rank}: peer {peer} is outside the group of {size} or is this worker")]
    InvalidPeer { rank: usize, peer: usize, size: usize },

    #[error("rank {rank}: communicator has {comm_size} workers, topology has {topology_size}")]
    TopologyMismatch {
        rank: usize,
        comm_size: usize,
        topology_size: usize,
    },

    #[error("rank {rank}: coordinator-only input missing ({what})")]
    MissingRootInput { rank: usize, what: &'static str },

    #[error("dataset of {len} values does not split evenly across {workers} workers")]
    IndivisibleDataset { len: usize, workers: usize },

    #[error("rank {rank}: refusing to broadcast non-finite value {value}")]
    NonFiniteScalar { rank: usize, value: f64 },

    #[error("rank {rank}: no value held when forwarding at tree level {level}")]
    ValueNotHeld { rank: usize, level: u32 },
}

impl CommError {
    /// True for errors that are a reaction to some other worker failing
    ///
    /// Used to pick the originating failure out of a group that went down
    /// together.
    pub fn is_secondary(&self) -> bool {
        matches!(self, CommError::Aborted { .. } | CommError::PeerDisconnected { .. })
    }
}

/// Point-to-point messaging for one worker
///
/// Implemented by [`Endpoint`]; collective operations are written against this
/// trait so they can run over any transport with blocking rendezvous
/// semantics.
pub trait Communicator {
    /// This worker's rank
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn size(&self) -> usize;

    /// Send `msg` to `to`, blocking until `to` has received it
    fn send(&self, to: usize, msg: Message) -> Result<(), CommError>;

    /// Block until a message from `from` arrives
    fn recv(&self, from: usize) -> Result<Message, CommError>;

    /// Terminate every worker in the group
    fn abort(&self);
}

/// Error for a message of the wrong kind arriving from `peer`
pub(crate) fn unexpected(rank: usize, peer: usize, expected: MessageKind, got: &Message) -> CommError {
    CommError::UnexpectedMessage {
        rank,
        peer,
        expected,
        got: got.kind(),
    }
}
