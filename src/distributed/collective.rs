//! Coordinator-rooted collectives
//!
//! These are the straightforward linear collectives a run needs besides the
//! tree broadcast: telling every worker the partition length, handing out the
//! partitions, and summing one scalar per worker at the coordinator.

use super::protocol::{Message, MessageKind};
use super::{unexpected, CommError, Communicator};
use crate::topology::COORDINATOR;
use tracing::debug;

/// Propagate the partition length from the coordinator to every worker
///
/// `block_size` must be `Some` at the coordinator; other workers pass `None`
/// and learn the value from the coordinator.
pub fn broadcast_block_size<C: Communicator>(
    comm: &C,
    block_size: Option<usize>,
) -> Result<usize, CommError> {
    let rank = comm.rank();
    if rank == COORDINATOR {
        let block_size = block_size.ok_or(CommError::MissingRootInput { rank, what: "block size" })?;
        for peer in 1..comm.size() {
            comm.send(peer, Message::BlockSize(block_size))?;
        }
        debug!(rank, block_size, "block size sent to all workers");
        Ok(block_size)
    } else {
        match comm.recv(COORDINATOR)? {
            Message::BlockSize(block_size) => Ok(block_size),
            other => Err(unexpected(rank, COORDINATOR, MessageKind::BlockSize, &other)),
        }
    }
}

/// Hand rank `i` the values `[i * block_size, (i + 1) * block_size)` of `data`
///
/// `buffer` is the worker's pre-allocated, empty partition buffer. The
/// coordinator passes the full dataset, other workers pass `None`.
pub fn scatter<C: Communicator>(
    comm: &C,
    data: Option<&[f32]>,
    block_size: usize,
    buffer: &mut Vec<f32>,
) -> Result<(), CommError> {
    let rank = comm.rank();

    if rank == COORDINATOR {
        let data = data.ok_or(CommError::MissingRootInput { rank, what: "dataset" })?;
        if data.len() != block_size * comm.size() {
            return Err(CommError::IndivisibleDataset { len: data.len(), workers: comm.size() });
        }
        for peer in 1..comm.size() {
            let start = peer * block_size;
            comm.send(peer, Message::Block(data[start..start + block_size].to_vec()))?;
        }
        buffer.extend_from_slice(&data[..block_size]);
        debug!(rank, block_size, "partitions delivered");
        return Ok(());
    }

    match comm.recv(COORDINATOR)? {
        Message::Block(values) => {
            if values.len() != block_size {
                return Err(CommError::BlockSizeMismatch {
                    rank,
                    expected: block_size,
                    got: values.len(),
                });
            }
            buffer.extend_from_slice(&values);
            Ok(())
        }
        other => Err(unexpected(rank, COORDINATOR, MessageKind::Block, &other)),
    }
}

/// Sum one scalar per worker at the coordinator
///
/// Returns `Some(total)` at the coordinator and `None` everywhere else; a
/// worker that needs the total has to receive it through a broadcast.
///
/// Contributions are folded in rank order. No worker returns before the
/// coordinator has folded in all of them: each contributor waits for a
/// REDUCE_DONE release.
pub fn reduce_sum<C: Communicator>(comm: &C, local: f64) -> Result<Option<f64>, CommError> {
    let rank = comm.rank();

    if rank != COORDINATOR {
        comm.send(COORDINATOR, Message::Contribution(local))?;
        return match comm.recv(COORDINATOR)? {
            Message::ReduceDone => Ok(None),
            other => Err(unexpected(rank, COORDINATOR, MessageKind::ReduceDone, &other)),
        };
    }

    let mut total = local;
    for peer in 1..comm.size() {
        match comm.recv(peer)? {
            Message::Contribution(value) => total += value,
            other => return Err(unexpected(rank, peer, MessageKind::Contribution, &other)),
        }
    }
    for peer in 1..comm.size() {
        comm.send(peer, Message::ReduceDone)?;
    }
    debug!(rank, total, "reduction complete");
    Ok(Some(total))
}
