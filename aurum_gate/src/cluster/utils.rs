use crate::core::Socket;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Bounds on the cluster-wide fan-out performed by a [`Latch`](crate::latch::Latch).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LatchConfig {
  /// How long the initiating node waits for every other member to report that it acquired the
  /// latch. Members that have not answered by then count as failed and the acquisition is rolled
  /// back.
  ///
  /// default: `2 minutes`
  pub acquire_timeout: Duration,
  /// Added to the caller's drain timeout when waiting for remote members to report back, to
  /// account for dispatch latency.
  ///
  /// default: `500 milliseconds`
  pub drain_slack: Duration,
  /// How long the unlatching node waits for the other members to confirm. Unconfirmed members are
  /// reported through an [`AdminEvent`], never retried.
  ///
  /// default: `1 minute`
  pub unlatch_timeout: Duration,
}
impl Default for LatchConfig {
  #[inline]
  fn default() -> Self {
    LatchConfig {
      acquire_timeout: Duration::from_secs(120),
      drain_slack: Duration::from_millis(500),
      unlatch_timeout: Duration::from_secs(60),
    }
  }
}

/// A member of the cluster, as reported by the membership facade.
#[derive(Serialize, Deserialize, Hash, Eq, PartialEq, Clone, Ord, PartialOrd, Debug)]
pub struct Member {
  /// Unique for every time a node joins the cluster.
  pub id: Uuid,
  /// Where the member can be reached.
  pub socket: Socket,
}
impl Member {
  /// A member with a fresh id.
  pub fn new(socket: Socket) -> Self {
    Member {
      id: Uuid::new_v4(),
      socket: socket,
    }
  }
}
impl fmt::Display for Member {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.id, self.socket)
  }
}

/// Administrative notifications raised when something happened that an operator must act on.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub enum AdminEvent {
  /// A join handshake decided this node must stop serving.
  NodePassivated {
    /// Reasons given by both ends of the handshake.
    issues: Vec<String>,
  },
  /// These members never confirmed that they released a latch. They may still be blocking work
  /// on the latched resource and are candidates for passivation.
  UnlatchFailed {
    /// Key of the latched service.
    service: String,
    /// The latch left behind.
    latch: Uuid,
    /// Members that did not confirm.
    members: Vec<Arc<Member>>,
  },
}
impl fmt::Display for AdminEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AdminEvent::NodePassivated { issues } => {
        write!(f, "node passivated: {}", issues.iter().join("; "))
      }
      AdminEvent::UnlatchFailed {
        service,
        latch,
        members,
      } => write!(
        f,
        "latch {} of {} was not released by: {}",
        latch,
        service,
        members.iter().join(", ")
      ),
    }
  }
}
