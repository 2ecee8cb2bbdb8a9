//! Coordinator module
//!
//! Launches one thread per worker, waits for all of them, and checks that
//! every worker ended up with the same result.

use crate::dataset::Dataset;
use crate::distributed::{CommError, Communicator, Mesh, TrafficSnapshot};
use crate::stats::Moments;
use crate::topology::ProcessTopology;
use crate::worker::{Worker, WorkerReport};
use crate::Result;
use anyhow::Context;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of one complete run
#[derive(Debug)]
pub struct RunOutcome {
    pub moments: Moments,
    pub workers: usize,
    pub elements: usize,
    pub block_size: usize,
    pub tree_rounds: u32,
    /// Wall-clock time from launching the workers to the last join
    pub elapsed: Duration,
    pub traffic: TrafficSnapshot,
    /// The dataset, returned by the coordinating worker
    pub dataset: Dataset,
}

/// Runs a worker group over a fixed topology
#[derive(Debug, Clone, Copy)]
pub struct GroupCoordinator {
    topology: ProcessTopology,
    partition_limit: Option<u64>,
}

impl GroupCoordinator {
    pub fn new(topology: ProcessTopology) -> Self {
        Self {
            topology,
            partition_limit: None,
        }
    }

    /// Cap every worker's partition buffer, in bytes
    pub fn with_partition_limit(mut self, limit: Option<u64>) -> Self {
        self.partition_limit = limit;
        self
    }

    /// Compute mean and variance of `dataset` across the group
    pub fn run(&self, dataset: Dataset) -> Result<RunOutcome> {
        let workers = self.topology.size();
        let elements = dataset.len();
        dataset.check_divisible(workers)?;

        let mesh = Mesh::new(&self.topology);
        let abort = mesh.abort_signal();
        let traffic = mesh.traffic();

        let start = Instant::now();
        let mut dataset = Some(dataset);
        let mut handles: Vec<(usize, JoinHandle<std::result::Result<WorkerReport, CommError>>)> =
            Vec::with_capacity(workers);

        for comm in mesh.into_endpoints() {
            let rank = comm.rank();
            let mut worker = Worker::new(comm, self.topology)?.with_partition_limit(self.partition_limit);
            if self.topology.is_coordinator(rank) {
                if let Some(dataset) = dataset.take() {
                    worker = worker.with_dataset(dataset);
                }
            }

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", rank))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => handles.push((rank, handle)),
                Err(e) => {
                    // Workers already running would otherwise wait for this one forever
                    abort.trigger();
                    return Err(e).with_context(|| format!("Failed to spawn worker {}", rank));
                }
            }
        }
        debug!(workers, "worker group launched");

        let mut reports = Vec::with_capacity(workers);
        let mut failures = Vec::new();
        let mut panicked = None;
        for (rank, handle) in handles {
            match handle.join() {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => failures.push(e),
                Err(_) => {
                    abort.trigger();
                    panicked.get_or_insert(rank);
                }
            }
        }
        let elapsed = start.elapsed();

        if let Some(rank) = panicked {
            anyhow::bail!("Worker {} panicked", rank);
        }
        if let Some(cause) = root_cause(failures) {
            return Err(cause).context("Worker group failed");
        }

        let outcome = collect(reports, self.topology, elements, elapsed, traffic.snapshot())?;
        info!(
            workers,
            elements,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "parallel computation complete"
        );
        Ok(outcome)
    }
}

/// Pick the failure that brought the group down
///
/// Workers that were merely aborted or lost a peer report secondary errors;
/// the originating one is preferred when present.
fn root_cause(failures: Vec<CommError>) -> Option<CommError> {
    let mut secondary = None;
    for failure in failures {
        if !failure.is_secondary() {
            return Some(failure);
        }
        secondary.get_or_insert(failure);
    }
    secondary
}

fn collect(
    mut reports: Vec<WorkerReport>,
    topology: ProcessTopology,
    elements: usize,
    elapsed: Duration,
    traffic: TrafficSnapshot,
) -> Result<RunOutcome> {
    reports.sort_by_key(|r| r.rank);
    let root = reports.first().context("No worker reported a result")?;
    let moments = root.moments;
    let block_size = root.block_size;

    if let Some(divergent) = reports.iter().find(|r| !r.moments.bit_identical(&moments)) {
        anyhow::bail!(
            "Worker {} holds mean={} variance={}, coordinator holds mean={} variance={}",
            divergent.rank,
            divergent.moments.mean,
            divergent.moments.variance,
            moments.mean,
            moments.variance
        );
    }

    let dataset = reports
        .iter_mut()
        .find_map(|r| r.dataset.take())
        .context("Coordinator did not return the dataset")?;

    Ok(RunOutcome {
        moments,
        workers: topology.size(),
        elements,
        block_size,
        tree_rounds: topology.levels(),
        elapsed,
        traffic,
        dataset,
    })
}
