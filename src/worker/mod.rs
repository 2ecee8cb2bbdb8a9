//! Worker implementation
//!
//! Every worker in the group runs the same [`Worker::run`]. The coordinator
//! (rank 0) additionally owns the dataset and computes each global value
//! before it is broadcast.
//!
//! # Phases
//!
//! 1. Partition the dataset, `N / P` values per worker
//! 2. Local sum, reduced to the global sum at the coordinator
//! 3. Coordinator: `mean = sum / N`
//! 4. Tree broadcast of the mean
//! 5. Local sum of squares over the same partition, reduced at the coordinator
//! 6. Coordinator: `variance = sum_sq / N - mean^2`
//! 7. Tree broadcast of the variance
//!
//! The two reductions are independent collective calls; the second one only
//! starts once every worker holds the mean.
//!
//! # Example
//!
//! ```
//! use treestat::dataset::Dataset;
//! use treestat::distributed::Mesh;
//! use treestat::topology::ProcessTopology;
//! use treestat::worker::Worker;
//!
//! let topology = ProcessTopology::new(1)?;
//! let comm = Mesh::new(&topology).into_endpoints().remove(0);
//! let dataset = Dataset::from_values(vec![1.0, 2.0, 3.0, 4.0])?;
//!
//! let report = Worker::new(comm, topology)?.with_dataset(dataset).run()?;
//! assert_eq!(report.moments.mean, 2.5);
//! assert_eq!(report.moments.variance, 1.25);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod partition;

use crate::dataset::Dataset;
use crate::distributed::{reduce_sum, CommError, Communicator, TreeBroadcaster};
use crate::stats::local::{local_sum, local_sum_of_squares};
use crate::stats::Moments;
use crate::topology::ProcessTopology;
use partition::partition;
use tracing::debug;

/// What one worker ends up with after a successful run
#[derive(Debug)]
pub struct WorkerReport {
    pub rank: usize,
    /// Replicated result, bit-identical across the group
    pub moments: Moments,
    /// Values held by this worker
    pub block_size: usize,
    /// The dataset, handed back by the coordinator only
    pub dataset: Option<Dataset>,
}

/// One member of the worker group
pub struct Worker<C: Communicator> {
    comm: C,
    topology: ProcessTopology,
    broadcaster: TreeBroadcaster,
    dataset: Option<Dataset>,
    partition_limit: Option<u64>,
}

impl<C: Communicator> Worker<C> {
    pub fn new(comm: C, topology: ProcessTopology) -> Result<Self, CommError> {
        if comm.size() != topology.size() {
            return Err(CommError::TopologyMismatch {
                rank: comm.rank(),
                comm_size: comm.size(),
                topology_size: topology.size(),
            });
        }
        Ok(Self {
            comm,
            topology,
            broadcaster: TreeBroadcaster::new(topology),
            dataset: None,
            partition_limit: None,
        })
    }

    /// Give the coordinator its dataset
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Cap the partition buffer this worker may allocate, in bytes
    pub fn with_partition_limit(mut self, limit: Option<u64>) -> Self {
        self.partition_limit = limit;
        self
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// Run both phases to completion
    ///
    /// Any failure aborts the whole group before it is returned, so no peer
    /// is left waiting on this worker.
    pub fn run(self) -> Result<WorkerReport, CommError> {
        let rank = self.rank();
        match self.compute() {
            Ok((moments, block_size)) => {
                debug!(rank, mean = moments.mean, variance = moments.variance, "statistics replicated");
                Ok(WorkerReport {
                    rank,
                    moments,
                    block_size,
                    dataset: self.dataset,
                })
            }
            Err(e) => {
                debug!(rank, error = %e, "worker failed");
                self.comm.abort();
                Err(e)
            }
        }
    }

    fn compute(&self) -> Result<(Moments, usize), CommError> {
        let rank = self.rank();
        let part = partition(&self.comm, &self.topology, self.dataset.as_ref(), self.partition_limit)?;
        let block_size = part.len();
        let count = (block_size * self.topology.size()) as f64;

        // Mean
        let global_sum = reduce_sum(&self.comm, local_sum(part.values()))?;
        let mean = global_sum.map(|sum| Moments::mean_from_sum(count, sum));
        let mean = self.broadcaster.broadcast(&self.comm, mean)?;
        debug!(rank, mean, "mean received");

        // Variance
        let global_sum_sq = reduce_sum(&self.comm, local_sum_of_squares(part.values()))?;
        let variance = global_sum_sq.map(|sum_sq| Moments::variance_from_sum_of_squares(count, sum_sq, mean));
        let variance = self.broadcaster.broadcast(&self.comm, variance)?;

        Ok((Moments::new(mean, variance), block_size))
    }
}
