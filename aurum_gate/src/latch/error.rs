use crate::cluster::Member;
use itertools::Itertools;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Misuse of a latch, or a cluster latch that could not be acquired everywhere.
#[derive(Debug, Error)]
pub enum LatchError {
  /// The service already holds a different latch, or this latch was acquired twice.
  #[error("{service} is already latched by {latch}")]
  AlreadyAcquired {
    /// Key of the latched service.
    service: String,
    /// The latch already held.
    latch: Uuid,
  },
  /// Drained before local acquisition finished, or joined after it failed.
  #[error("latch {0} has not been acquired")]
  NotAcquired(Uuid),
  /// Only the first unlatch call does anything.
  #[error("latch {0} has already been unlatched")]
  AlreadyUnlatched(Uuid),
  /// The acquisition was rolled back on every member that had acquired it.
  #[error(
    "latch {latch} of {service} was not acquired by: {}",
    failed.iter().join(", ")
  )]
  ClusterAcquireFailed {
    /// Key of the latched service.
    service: String,
    /// The latch that was rolled back.
    latch: Uuid,
    /// Members that refused, or did not answer in time.
    failed: Vec<Arc<Member>>,
  },
  /// A task named a service this node does not know.
  #[error("no latchable service registered as {0}")]
  UnknownService(String),
  /// A drain task arrived for a latch this node does not hold.
  #[error("{service} holds no latch {latch}")]
  NoActiveLatch {
    /// Key of the service the task named.
    service: String,
    /// The latch the task named.
    latch: Uuid,
  },
}
