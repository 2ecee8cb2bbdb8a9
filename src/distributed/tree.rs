//! Binary-tree scalar broadcast
//!
//! Replicates one scalar known only at the coordinator to every worker in
//! `log2(P)` rounds and `P - 1` messages, instead of `P - 1` sequential sends
//! from the coordinator.
//!
//! For a worker of rank `r`, at a level with `step = 2^level`:
//!
//! - `r % (2 * step) == 0`: sender, forwards its copy to `r + step` when that
//!   rank exists
//! - `r % (2 * step) == step`: receiver, blocks until the copy from
//!   `r - step` arrives and replaces its own
//! - otherwise idle
//!
//! Levels are visited widest step first (see [`crate::topology`]), and each
//! worker finishes its role at one level before touching the next. A receiver
//! whose sender never sends blocks for as long as the group is alive; there is
//! no timeout.

use super::protocol::{Message, MessageKind};
use super::{unexpected, CommError, Communicator};
use crate::topology::{LevelRole, ProcessTopology};
use tracing::{debug, trace};

/// Tree broadcast over a fixed topology
#[derive(Debug, Clone, Copy)]
pub struct TreeBroadcaster {
    topology: ProcessTopology,
}

impl TreeBroadcaster {
    pub fn new(topology: ProcessTopology) -> Self {
        Self { topology }
    }

    /// Number of communication rounds one broadcast takes
    pub fn rounds(&self) -> u32 {
        self.topology.levels()
    }

    /// Replicate the coordinator's `value` to every worker
    ///
    /// The coordinator must pass `Some(finite value)`. Any value other
    /// workers pass is ignored and overwritten by the one they receive.
    /// Returns the replicated value, bit-identical on every worker.
    pub fn broadcast<C: Communicator>(&self, comm: &C, value: Option<f64>) -> Result<f64, CommError> {
        let rank = comm.rank();
        if comm.size() != self.topology.size() {
            return Err(CommError::TopologyMismatch {
                rank,
                comm_size: comm.size(),
                topology_size: self.topology.size(),
            });
        }

        let mut current = if self.topology.is_coordinator(rank) {
            let value = value.ok_or(CommError::MissingRootInput { rank, what: "broadcast value" })?;
            if !value.is_finite() {
                return Err(CommError::NonFiniteScalar { rank, value });
            }
            Some(value)
        } else {
            None
        };

        for level in self.topology.broadcast_levels() {
            match self.topology.role_at_level(rank, level) {
                LevelRole::Send { to } => {
                    let held = current.ok_or(CommError::ValueNotHeld { rank, level })?;
                    trace!(rank, level, peer = to, "tree send");
                    comm.send(to, Message::Scalar(held))?;
                }
                LevelRole::Receive { from } => {
                    trace!(rank, level, peer = from, "tree receive");
                    match comm.recv(from)? {
                        Message::Scalar(received) => current = Some(received),
                        other => return Err(unexpected(rank, from, MessageKind::Scalar, &other)),
                    }
                }
                LevelRole::Idle => {}
            }
        }

        let value = current.ok_or(CommError::ValueNotHeld { rank, level: 0 })?;
        debug!(rank, value, "broadcast complete");
        Ok(value)
    }
}
