#![warn(missing_docs)]

//! This crate implements the two coordination primitives an Aurum cluster needs before it can
//! safely grow or swap live resources: the join handshake run between two nodes forming or
//! extending a cluster, and the cluster-wide latch used to quiesce a resource on every member
//! before replacing it.
//!
//! ### Joining
//! A [`ClusterJoinManager`](crate::join::ClusterJoinManager) runs on both ends of a new
//! connection. Each side walks its registered [`JoinCheck`](crate::join::JoinCheck)s in the same
//! order and the two sides negotiate the outcome of every check over the wire. Any check that does
//! not end in [`Connect`](crate::join::JoinCheckAction::Connect) rejects the connection, and may
//! passivate one of the nodes when continuing to run risks corrupting shared state.
//!
//! ### Latching
//! A service that owns a swappable resource registers a [`LatchSlot`](crate::latch::LatchSlot).
//! Acquiring a latch in [`Cluster`](crate::latch::LatchMode::Cluster) mode acquires the same latch
//! on every member (or on none of them), draining waits for in-flight work to finish everywhere,
//! and unlatching releases every member.
//!
//! ### Logging
//! Every module declares its own [`LogLevel`](crate::testkit::LogLevel) and logs through the
//! [`trace`](crate::trace), [`debug`](crate::debug), [`info`](crate::info), [`warn`](crate::warn),
//! [`error`](crate::error) and [`fatal`](crate::fatal) macros, which forward to `tracing`.

pub mod cluster;
pub mod core;
pub mod join;
pub mod latch;
pub mod testkit;

#[doc(hidden)]
pub use tracing;
