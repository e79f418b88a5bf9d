//! Cluster-wide mutual exclusion and quiescence, used to swap a live resource (a connection pool,
//! say) without losing work.
//!
//! A service owning such a resource implements [`LocalLatch`] and registers a [`LatchSlot`] in
//! its node's [`LatchRegistry`]. Swapping the resource then follows the same steps on every node:
//!
//! 1. [`LatchSlot::acquire_latch`] stops new work. In [`LatchMode::Cluster`] the initiating node
//!    sends a [`LatchTask`] to every other member, and either all of them acquire the latch or
//!    none of them keep it.
//! 2. [`Latch::drain`] waits for in-flight work to finish, and is called repeatedly until it
//!    returns `true`. Members that have drained are not asked again.
//! 3. [`Latch::unlatch`] lets work resume everywhere. Members that don't confirm are reported
//!    through an [`AdminEvent`](crate::cluster::AdminEvent) rather than holding up the caller.
//!
//! Fan-out waits are bounded by [`LatchConfig`](crate::cluster::LatchConfig).

use crate::testkit::LogLevel;

mod error;
mod fan_out;
mod latch;
mod slot;
mod task;

/// Messages below this level are dropped.
pub const LOG_LEVEL: LogLevel = LogLevel::Info;

#[rustfmt::skip]
pub(crate) use {
  fan_out::FanOut,
  latch::LatchContext,
};

#[rustfmt::skip]
pub use {
  error::LatchError,
  latch::Latch,
  latch::LatchMode,
  latch::LocalLatch,
  slot::LatchSlot,
  task::LatchOp,
  task::LatchRegistry,
  task::LatchTask,
};
