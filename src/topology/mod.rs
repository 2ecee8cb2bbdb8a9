//! Worker group topology
//!
//! A topology is the fixed, ordered set of workers taking part in a run. Workers
//! are addressed by rank (`0..size`), rank 0 being the coordinator that owns the
//! dataset and the authoritative reduced values.
//!
//! The tree broadcast relies on the group size being a power of two, so that
//! every level of the tree pairs each sender with exactly one receiver. The bit
//! arithmetic behind that pairing lives here, behind the level queries
//! ([`ProcessTopology::is_sender_at_level`], [`ProcessTopology::peer_at_level`],
//! [`ProcessTopology::role_at_level`]), so the broadcast can be checked against
//! a simulated group with [`TreeSchedule`] without any message transport.
//!
//! # Tree shape for 8 workers
//!
//! ```text
//! level 2 (step 4):  0→4
//! level 1 (step 2):  0→2         4→6
//! level 0 (step 1):  0→1   2→3   4→5   6→7
//! ```
//!
//! Levels run from the widest step down to step 1, so every sender already
//! holds the value when its level comes up and the set of holders doubles on
//! each round. Walking the levels upwards instead would have rank 2 forward to
//! rank 3 at step 1 before rank 2 itself has received anything.

use thiserror::Error;

/// Rank of the coordinating worker
pub const COORDINATOR: usize = 0;

/// Largest supported group size
pub const MAX_WORKERS: usize = 256;

/// Topology construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("invalid topology: {workers} workers requested, need a power of 2 (1, 2, 4, ...) no larger than 256")]
    InvalidTopology { workers: usize },
}

/// What a worker does at one level of the tree broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRole {
    /// Forward the value to `to`
    Send { to: usize },
    /// Block until the value arrives from `from`
    Receive { from: usize },
    /// No communication at this level
    Idle,
}

/// Immutable worker group description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTopology {
    size: usize,
}

impl ProcessTopology {
    /// Build a topology for `workers` workers
    ///
    /// Accepts `1, 2, 4, ..., 256`. Anything else (including zero) is an
    /// [`TopologyError::InvalidTopology`].
    pub fn new(workers: usize) -> Result<Self, TopologyError> {
        if workers == 0 || !workers.is_power_of_two() || workers > MAX_WORKERS {
            return Err(TopologyError::InvalidTopology { workers });
        }
        Ok(Self { size: workers })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tree levels, `log2(size)`
    pub fn levels(&self) -> u32 {
        self.size.trailing_zeros()
    }

    /// Levels in the order the broadcast visits them (widest step first)
    pub fn broadcast_levels(&self) -> impl Iterator<Item = u32> {
        (0..self.levels()).rev()
    }

    /// Iterate over all ranks in order
    pub fn ranks(&self) -> std::ops::Range<usize> {
        0..self.size
    }

    pub fn is_coordinator(&self, rank: usize) -> bool {
        rank == COORDINATOR
    }

    /// Distance between paired workers at `level` (`2^level`)
    #[inline]
    pub fn step(level: u32) -> usize {
        1usize << level
    }

    /// True when `rank` forwards the value at `level`
    ///
    /// Senders at level `i` are exactly the multiples of `2^(i+1)`. Whether the
    /// target actually exists is answered by [`Self::peer_at_level`].
    pub fn is_sender_at_level(&self, rank: usize, level: u32) -> bool {
        let step = Self::step(level);
        rank % (2 * step) == 0
    }

    /// True when `rank` receives the value at `level`
    pub fn is_receiver_at_level(&self, rank: usize, level: u32) -> bool {
        let step = Self::step(level);
        rank % (2 * step) == step
    }

    /// Communication partner of `rank` at `level`, if any
    ///
    /// For a sender this is `rank + step` (when inside the group), for a
    /// receiver `rank - step`. Idle workers have no peer.
    pub fn peer_at_level(&self, rank: usize, level: u32) -> Option<usize> {
        let step = Self::step(level);
        if self.is_sender_at_level(rank, level) {
            let target = rank + step;
            (target < self.size).then_some(target)
        } else if self.is_receiver_at_level(rank, level) {
            Some(rank - step)
        } else {
            None
        }
    }

    /// Full role of `rank` at `level`
    pub fn role_at_level(&self, rank: usize, level: u32) -> LevelRole {
        match self.peer_at_level(rank, level) {
            Some(to) if self.is_sender_at_level(rank, level) => LevelRole::Send { to },
            Some(from) => LevelRole::Receive { from },
            None => LevelRole::Idle,
        }
    }

    /// Equal block length for `total` elements, if it divides evenly
    pub fn block_size(&self, total: usize) -> Option<usize> {
        (total % self.size == 0).then(|| total / self.size)
    }
}

/// Transport-free simulation of the tree broadcast
///
/// Each round is the list of `(sender, receiver)` pairs active at that level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSchedule {
    rounds: Vec<Vec<(usize, usize)>>,
}

impl TreeSchedule {
    pub fn for_topology(topology: &ProcessTopology) -> Self {
        let rounds = topology
            .broadcast_levels()
            .map(|level| {
                topology
                    .ranks()
                    .filter_map(|rank| match topology.role_at_level(rank, level) {
                        LevelRole::Send { to } => Some((rank, to)),
                        _ => None,
                    })
                    .collect()
            })
            .collect();
        Self { rounds }
    }

    pub fn rounds(&self) -> &[Vec<(usize, usize)>] {
        &self.rounds
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn message_count(&self) -> usize {
        self.rounds.iter().map(Vec::len).sum()
    }

    /// Play the schedule on a simulated group
    ///
    /// `initial[0]` is the coordinator's value; other slots hold whatever the
    /// workers start with. Returns the per-rank values after the last round.
    /// Within a round each pair copies from the state at the start of the
    /// round, so the simulation also proves no receiver depends on a value
    /// delivered in the same round.
    pub fn simulate<T: Copy>(&self, initial: &[T]) -> Vec<T> {
        let mut values = initial.to_vec();
        for round in &self.rounds {
            let before = values.clone();
            for &(sender, receiver) in round {
                values[receiver] = before[sender];
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_powers_of_two_up_to_256() {
        for workers in [1, 2, 4, 8, 16, 32, 64, 128, 256] {
            let topology = ProcessTopology::new(workers).unwrap();
            assert_eq!(topology.size(), workers);
        }
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        for workers in [0, 3, 5, 6, 12, 257, 512] {
            assert_eq!(
                ProcessTopology::new(workers),
                Err(TopologyError::InvalidTopology { workers })
            );
        }
    }

    #[test]
    fn test_levels() {
        assert_eq!(ProcessTopology::new(1).unwrap().levels(), 0);
        assert_eq!(ProcessTopology::new(2).unwrap().levels(), 1);
        assert_eq!(ProcessTopology::new(8).unwrap().levels(), 3);
        assert_eq!(ProcessTopology::new(256).unwrap().levels(), 8);
    }

    #[test]
    fn test_roles_for_eight_workers() {
        let topology = ProcessTopology::new(8).unwrap();

        // Level 0: evens send to the next odd rank
        assert_eq!(topology.role_at_level(0, 0), LevelRole::Send { to: 1 });
        assert_eq!(topology.role_at_level(1, 0), LevelRole::Receive { from: 0 });
        assert_eq!(topology.role_at_level(6, 0), LevelRole::Send { to: 7 });

        // Level 1
        assert_eq!(topology.role_at_level(4, 1), LevelRole::Send { to: 6 });
        assert_eq!(topology.role_at_level(2, 1), LevelRole::Receive { from: 0 });
        assert_eq!(topology.role_at_level(3, 1), LevelRole::Idle);

        // Level 2
        assert_eq!(topology.role_at_level(0, 2), LevelRole::Send { to: 4 });
        assert_eq!(topology.role_at_level(4, 2), LevelRole::Receive { from: 0 });
        assert_eq!(topology.role_at_level(2, 2), LevelRole::Idle);
    }

    #[test]
    fn test_sender_and_peer_queries() {
        let topology = ProcessTopology::new(4).unwrap();
        assert!(topology.is_sender_at_level(0, 1));
        assert!(topology.is_sender_at_level(2, 0));
        assert!(!topology.is_sender_at_level(2, 1));
        assert_eq!(topology.peer_at_level(2, 1), Some(0));
        assert_eq!(topology.peer_at_level(1, 1), None);
    }

    #[test]
    fn test_single_worker_has_no_levels() {
        let topology = ProcessTopology::new(1).unwrap();
        let schedule = TreeSchedule::for_topology(&topology);
        assert_eq!(schedule.round_count(), 0);
        assert_eq!(schedule.simulate(&[7.5f64]), vec![7.5]);
    }

    #[test]
    fn test_schedule_round_and_message_counts() {
        for workers in [2usize, 4, 8, 16, 32, 64, 128, 256] {
            let topology = ProcessTopology::new(workers).unwrap();
            let schedule = TreeSchedule::for_topology(&topology);
            assert_eq!(schedule.round_count(), workers.trailing_zeros() as usize);
            assert_eq!(schedule.message_count(), workers - 1);
        }
    }

    #[test]
    fn test_every_worker_receives_exactly_once() {
        let topology = ProcessTopology::new(64).unwrap();
        let schedule = TreeSchedule::for_topology(&topology);

        let mut received = vec![0usize; 64];
        for round in schedule.rounds() {
            for &(_, receiver) in round {
                received[receiver] += 1;
            }
        }
        assert_eq!(received[COORDINATOR], 0);
        assert!(received[1..].iter().all(|&count| count == 1));
    }

    #[test]
    fn test_simulation_replicates_coordinator_value() {
        let topology = ProcessTopology::new(16).unwrap();
        let schedule = TreeSchedule::for_topology(&topology);

        let mut initial = vec![f64::NAN; 16];
        initial[0] = 4.5;
        let values = schedule.simulate(&initial);
        assert!(values.iter().all(|v| v.to_bits() == 4.5f64.to_bits()));
    }

    #[test]
    fn test_holders_double_each_round() {
        let topology = ProcessTopology::new(32).unwrap();
        let mut holding = vec![false; 32];
        holding[0] = true;

        for (round, level) in topology.broadcast_levels().enumerate() {
            for rank in topology.ranks() {
                if let LevelRole::Receive { from } = topology.role_at_level(rank, level) {
                    assert!(holding[from], "rank {} sends before holding", from);
                    holding[rank] = true;
                }
            }
            // Holders are the multiples of the current step
            let step = ProcessTopology::step(level);
            assert_eq!(holding.iter().filter(|&&h| h).count(), 1 << (round + 1));
            for rank in topology.ranks() {
                assert_eq!(holding[rank], rank % step == 0);
            }
        }
    }

    #[test]
    fn test_ascending_level_order_forwards_stale_values() {
        let topology = ProcessTopology::new(4).unwrap();
        let mut values = vec![4.5f64, 0.0, 0.0, 0.0];
        for level in 0..topology.levels() {
            let before = values.clone();
            for rank in topology.ranks() {
                if let LevelRole::Receive { from } = topology.role_at_level(rank, level) {
                    values[rank] = before[from];
                }
            }
        }
        // Rank 3 got rank 2's value before rank 2 was reached
        assert_eq!(values, vec![4.5, 4.5, 4.5, 0.0]);
    }

    #[test]
    fn test_block_size() {
        let topology = ProcessTopology::new(4).unwrap();
        assert_eq!(topology.block_size(8), Some(2));
        assert_eq!(topology.block_size(0), Some(0));
        assert_eq!(topology.block_size(10), None);
    }
}
