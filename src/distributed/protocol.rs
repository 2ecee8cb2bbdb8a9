//! Worker-to-worker message protocol
//!
//! Every message travels over a dedicated channel for its (sender, receiver)
//! pair, so a receive names its source the same way a tagged point-to-point
//! receive does. Payloads are typed; nothing is serialized between workers.
//!
//! # Message Flow
//!
//! ```text
//! Rank 0 (coordinator)                  Rank r (r > 0)
//!     |                                      |
//!     |-------- BLOCK_SIZE(n/p) ------------>|
//!     |-------- BLOCK(values) -------------->|
//!     |                                      |
//!     |<------- CONTRIBUTION(local sum) -----|
//!     |-------- REDUCE_DONE ---------------->|
//!     |                                      |
//!     |======== SCALAR(mean), tree ========>>|
//!     |                                      |
//!     |<------- CONTRIBUTION(local sumsq) ---|
//!     |-------- REDUCE_DONE ---------------->|
//!     |                                      |
//!     |======== SCALAR(variance), tree ====>>|
//! ```
//!
//! SCALAR messages do not all come from rank 0: during the tree broadcast a
//! worker receives from whichever rank is its parent at that level.

use serde::Serialize;
use std::fmt;

/// Message exchanged between two workers
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Partition length, sent by the coordinator before any data moves
    BlockSize(usize),

    /// One worker's contiguous slice of the dataset
    Block(Vec<f32>),

    /// A worker's local scalar for an in-progress reduction
    Contribution(f64),

    /// Coordinator has folded in every contribution
    ///
    /// Releases the contributing worker from the reduction, which makes the
    /// reduction barrier-like.
    ReduceDone,

    /// Tree broadcast payload
    Scalar(f64),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::BlockSize(_) => MessageKind::BlockSize,
            Message::Block(_) => MessageKind::Block,
            Message::Contribution(_) => MessageKind::Contribution,
            Message::ReduceDone => MessageKind::ReduceDone,
            Message::Scalar(_) => MessageKind::Scalar,
        }
    }
}

/// Payload-free message discriminant, used for diagnostics and traffic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    BlockSize,
    Block,
    Contribution,
    ReduceDone,
    Scalar,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::BlockSize,
        MessageKind::Block,
        MessageKind::Contribution,
        MessageKind::ReduceDone,
        MessageKind::Scalar,
    ];
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::BlockSize => "BLOCK_SIZE",
            MessageKind::Block => "BLOCK",
            MessageKind::Contribution => "CONTRIBUTION",
            MessageKind::ReduceDone => "REDUCE_DONE",
            MessageKind::Scalar => "SCALAR",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Message::BlockSize(2).kind(), MessageKind::BlockSize);
        assert_eq!(Message::Block(vec![1.0, 2.0]).kind(), MessageKind::Block);
        assert_eq!(Message::Contribution(3.0).kind(), MessageKind::Contribution);
        assert_eq!(Message::ReduceDone.kind(), MessageKind::ReduceDone);
        assert_eq!(Message::Scalar(4.5).kind(), MessageKind::Scalar);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MessageKind::BlockSize.to_string(), "BLOCK_SIZE");
        assert_eq!(MessageKind::ReduceDone.to_string(), "REDUCE_DONE");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MessageKind::ReduceDone).unwrap();
        assert_eq!(json, "\"reduce_done\"");
    }
}
