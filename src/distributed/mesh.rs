//! In-process rendezvous mesh
//!
//! One zero-capacity crossbeam channel per ordered (sender, receiver) pair.
//! A send returns only once the receiver has taken the message, so every
//! point-to-point exchange is synchronous. Nothing in here times out: a worker
//! blocked on a live peer that never sends stays blocked.
//!
//! The only way out of a blocked call is the group-wide [`AbortSignal`], which
//! plays the role of a job abort: once triggered, every pending and future
//! send/receive on every endpoint fails with [`CommError::Aborted`].

use super::protocol::{Message, MessageKind};
use super::{CommError, Communicator};
use crate::topology::ProcessTopology;
use crossbeam::channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Group-wide abort
///
/// Holds the only sender of a channel nobody ever writes to. Dropping that
/// sender disconnects the channel, which wakes every `select!` waiting on it.
#[derive(Debug)]
pub struct AbortSignal {
    trigger: Mutex<Option<Sender<()>>>,
    watch: Receiver<()>,
    aborted: AtomicBool,
}

impl AbortSignal {
    pub fn new() -> Self {
        let (trigger, watch) = bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            watch,
            aborted: AtomicBool::new(false),
        }
    }

    /// Abort the group. Idempotent.
    pub fn trigger(&self) {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.trigger.lock() {
            Ok(mut guard) => drop(guard.take()),
            // A poisoned lock still guards the sender; take it anyway
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn watch(&self) -> &Receiver<()> {
        &self.watch
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-kind message counters shared by all endpoints of a mesh
#[derive(Debug, Default)]
pub struct TrafficStats {
    block_size: AtomicU64,
    block: AtomicU64,
    contribution: AtomicU64,
    reduce_done: AtomicU64,
    scalar: AtomicU64,
}

impl TrafficStats {
    fn counter(&self, kind: MessageKind) -> &AtomicU64 {
        match kind {
            MessageKind::BlockSize => &self.block_size,
            MessageKind::Block => &self.block,
            MessageKind::Contribution => &self.contribution,
            MessageKind::ReduceDone => &self.reduce_done,
            MessageKind::Scalar => &self.scalar,
        }
    }

    fn record(&self, kind: MessageKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, kind: MessageKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            block_size: self.count(MessageKind::BlockSize),
            block: self.count(MessageKind::Block),
            contribution: self.count(MessageKind::Contribution),
            reduce_done: self.count(MessageKind::ReduceDone),
            scalar: self.count(MessageKind::Scalar),
        }
    }
}

/// Delivered messages by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficSnapshot {
    pub block_size: u64,
    pub block: u64,
    pub contribution: u64,
    pub reduce_done: u64,
    pub scalar: u64,
}

impl TrafficSnapshot {
    pub fn total(&self) -> u64 {
        self.block_size + self.block + self.contribution + self.reduce_done + self.scalar
    }
}

/// One worker's view of the mesh
///
/// Owned by exactly one worker thread. Dropping it disconnects all of this
/// worker's channels, which peers observe as [`CommError::PeerDisconnected`].
#[derive(Debug)]
pub struct Endpoint {
    rank: usize,
    size: usize,
    /// Indexed by destination rank; `None` on the diagonal
    outgoing: Vec<Option<Sender<Message>>>,
    /// Indexed by source rank; `None` on the diagonal
    incoming: Vec<Option<Receiver<Message>>>,
    abort: Arc<AbortSignal>,
    traffic: Arc<TrafficStats>,
}

impl Endpoint {
    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer == self.rank || peer >= self.size {
            return Err(CommError::InvalidPeer {
                rank: self.rank,
                peer,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl Communicator for Endpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, to: usize, msg: Message) -> Result<(), CommError> {
        self.check_peer(to)?;
        if self.abort.is_aborted() {
            return Err(CommError::Aborted { rank: self.rank });
        }
        let tx = self.outgoing[to]
            .as_ref()
            .ok_or(CommError::InvalidPeer { rank: self.rank, peer: to, size: self.size })?;
        let kind = msg.kind();

        crossbeam::channel::select! {
            send(tx, msg) -> res => {
                res.map_err(|_| CommError::PeerDisconnected { rank: self.rank, peer: to })?;
                self.traffic.record(kind);
                Ok(())
            }
            recv(self.abort.watch()) -> _ => Err(CommError::Aborted { rank: self.rank }),
        }
    }

    fn recv(&self, from: usize) -> Result<Message, CommError> {
        self.check_peer(from)?;
        if self.abort.is_aborted() {
            return Err(CommError::Aborted { rank: self.rank });
        }
        let rx = self.incoming[from]
            .as_ref()
            .ok_or(CommError::InvalidPeer { rank: self.rank, peer: from, size: self.size })?;

        crossbeam::channel::select! {
            recv(rx) -> res => res.map_err(|_| CommError::PeerDisconnected { rank: self.rank, peer: from }),
            recv(self.abort.watch()) -> _ => Err(CommError::Aborted { rank: self.rank }),
        }
    }

    fn abort(&self) {
        if !self.abort.is_aborted() {
            debug!(rank = self.rank, "aborting worker group");
        }
        self.abort.trigger();
    }
}

/// Fully connected rendezvous mesh for one worker group
pub struct Mesh {
    endpoints: Vec<Endpoint>,
    abort: Arc<AbortSignal>,
    traffic: Arc<TrafficStats>,
}

impl Mesh {
    pub fn new(topology: &ProcessTopology) -> Self {
        let size = topology.size();
        let abort = Arc::new(AbortSignal::new());
        let traffic = Arc::new(TrafficStats::default());

        let mut outgoing: Vec<Vec<Option<Sender<Message>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut incoming: Vec<Vec<Option<Receiver<Message>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = bounded(0);
                outgoing[src][dst] = Some(tx);
                incoming[dst][src] = Some(rx);
            }
        }

        let endpoints = outgoing
            .into_iter()
            .zip(incoming)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| Endpoint {
                rank,
                size,
                outgoing,
                incoming,
                abort: abort.clone(),
                traffic: traffic.clone(),
            })
            .collect();

        Self { endpoints, abort, traffic }
    }

    pub fn abort_signal(&self) -> Arc<AbortSignal> {
        self.abort.clone()
    }

    pub fn traffic(&self) -> Arc<TrafficStats> {
        self.traffic.clone()
    }

    /// Hand out the endpoints, ordered by rank
    pub fn into_endpoints(self) -> Vec<Endpoint> {
        self.endpoints
    }
}
