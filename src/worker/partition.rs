//! Dataset partitioning
//!
//! The coordinator splits the dataset into `P` equal, contiguous blocks and
//! every worker ends up owning exactly one of them. The block length is sent
//! to every worker before any data moves, so each worker can allocate its
//! buffer up front.

use crate::config::cli_convert::partition_bytes;
use crate::dataset::Dataset;
use crate::distributed::{broadcast_block_size, scatter, CommError, Communicator};
use crate::topology::ProcessTopology;
use tracing::debug;

/// One worker's contiguous block of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    rank: usize,
    values: Vec<f32>,
}

impl Partition {
    /// Rank that owns this block; it covers `[rank * len, (rank + 1) * len)`
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Distribute `dataset` across the group
///
/// Only the coordinator passes the dataset. `limit` caps the partition buffer
/// a worker will allocate, in bytes; exceeding it is reported the same way as
/// an allocator refusal.
///
/// On error the caller is expected to abort the group: peers may still be
/// waiting on this worker.
pub fn partition<C: Communicator>(
    comm: &C,
    topology: &ProcessTopology,
    dataset: Option<&Dataset>,
    limit: Option<u64>,
) -> Result<Partition, CommError> {
    let rank = comm.rank();

    let root_block = if topology.is_coordinator(rank) {
        let dataset = dataset.ok_or(CommError::MissingRootInput { rank, what: "dataset" })?;
        let block = topology
            .block_size(dataset.len())
            .ok_or(CommError::IndivisibleDataset { len: dataset.len(), workers: topology.size() })?;
        Some(block)
    } else {
        None
    };

    let block_size = broadcast_block_size(comm, root_block)?;
    let mut buffer = allocate(rank, block_size, limit)?;
    scatter(comm, dataset.map(Dataset::values), block_size, &mut buffer)?;

    debug!(rank, block_size, "partition received");
    Ok(Partition { rank, values: buffer })
}

/// Reserve room for exactly `elements` values without aborting the process
fn allocate(rank: usize, elements: usize, limit: Option<u64>) -> Result<Vec<f32>, CommError> {
    if let Some(limit) = limit {
        if partition_bytes(elements) > limit {
            return Err(CommError::AllocationFailure { rank, elements });
        }
    }

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(elements)
        .map_err(|_| CommError::AllocationFailure { rank, elements })?;
    Ok(buffer)
}
