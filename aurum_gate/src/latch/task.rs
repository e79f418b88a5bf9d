use crate::cluster::RemoteTask;
use crate::latch::{LatchError, LatchMode, LatchSlot, LOG_LEVEL};
use crate::trace;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// What a member is asked to do with its side of a cluster latch.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LatchOp {
  /// Acquire the latch on the receiving member.
  Acquire,
  /// Drain the receiving member only. The reply says whether it is idle.
  Drain {
    /// How long the member may wait for in-flight work.
    timeout: Duration,
    /// Whether in-flight work may be cancelled.
    force: bool,
  },
  /// Release the latch on the receiving member. Always succeeds.
  Unlatch,
}

/// Sent to other members to act on their copy of a cluster latch. The receiving member resolves
/// `service` through its [`LatchRegistry`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LatchTask {
  /// Key the receiving member's [`LatchRegistry`] resolves.
  pub service: String,
  /// Id shared by every member's copy of the latch.
  pub latch: Uuid,
  /// What to do.
  pub op: LatchOp,
}
impl RemoteTask for LatchTask {
  /// Whether the member did what it was asked. Only drains can answer `false`.
  type Reply = bool;
}

/// The latchable services of one node, by key.
#[derive(Default)]
pub struct LatchRegistry {
  slots: RwLock<HashMap<String, Arc<LatchSlot>>>,
}
impl LatchRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces any slot already registered for the same service.
  pub fn register(&self, slot: Arc<LatchSlot>) {
    self.slots.write().unwrap().insert(slot.service().to_string(), slot);
  }

  /// Removes and returns the slot of `service`.
  pub fn deregister(&self, service: &str) -> Option<Arc<LatchSlot>> {
    self.slots.write().unwrap().remove(service)
  }

  /// The slot registered for `service`.
  pub fn get(&self, service: &str) -> Option<Arc<LatchSlot>> {
    self.slots.read().unwrap().get(service).cloned()
  }

  /// Every registered slot, in no particular order.
  pub fn slots(&self) -> Vec<Arc<LatchSlot>> {
    self.slots.read().unwrap().values().cloned().collect()
  }

  /// Executes a task received from another member.
  pub async fn handle(&self, task: LatchTask) -> Result<bool, LatchError> {
    trace!(LOG_LEVEL, format!("handling {:?}", task));
    let slot = self
      .get(&task.service)
      .ok_or_else(|| LatchError::UnknownService(task.service.clone()))?;
    match task.op {
      LatchOp::Acquire => {
        slot.acquire_latch(LatchMode::Cluster, Some(task.latch)).await?;
        Ok(true)
      }
      LatchOp::Drain { timeout, force } => match slot.current() {
        Some(latch) if latch.id() == task.latch => Ok(latch.drain_locally(timeout, force).await),
        _ => Err(LatchError::NoActiveLatch {
          service: task.service,
          latch: task.latch,
        }),
      },
      LatchOp::Unlatch => {
        // Unlatching a latch this member never acquired, or already released, is a no-op.
        if let Some(latch) = slot.current().filter(|l| l.id() == task.latch) {
          latch.unlatch_locally().await;
        }
        Ok(true)
      }
    }
  }
}
