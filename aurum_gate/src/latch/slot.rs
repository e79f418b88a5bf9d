use crate::cluster::{
  ClusterExecutor, ClusterService, EventPublisher, LatchConfig, Member, MemberCallback,
  RemoteError,
};
use crate::latch::{
  Latch, LatchContext, LatchError, LatchMode, LatchOp, LatchTask, LocalLatch, LOG_LEVEL,
};
use crate::{error, info};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Holds the one latch a service may have at a time.
///
/// A slot is empty until [`acquire_latch`](Self::acquire_latch) succeeds, and becomes empty again
/// as soon as that latch is unlatched, whether by this node or by a task from another member.
pub struct LatchSlot {
  ctx: Arc<LatchContext>,
  current: Mutex<Option<Arc<Latch>>>,
}
impl LatchSlot {
  /// An empty slot for `service`. `hooks` does the latching on this node, while `executor` reaches
  /// the other members.
  pub fn new(
    service: String,
    hooks: Arc<dyn LocalLatch>,
    cluster: Arc<dyn ClusterService>,
    executor: Arc<dyn ClusterExecutor<LatchTask>>,
    events: Arc<dyn EventPublisher>,
    config: LatchConfig,
  ) -> Arc<Self> {
    Arc::new(LatchSlot {
      ctx: Arc::new(LatchContext {
        service: service,
        hooks: hooks,
        cluster: cluster,
        executor: executor,
        events: events,
        config: config,
      }),
      current: Mutex::new(None),
    })
  }

  /// Key of the service this slot latches.
  pub fn service(&self) -> &str {
    &self.ctx.service
  }

  /// The active latch, if any.
  pub fn current(&self) -> Option<Arc<Latch>> {
    let mut current = self.current.lock().unwrap();
    if current.as_ref().map_or(false, |l| l.is_unlatched()) {
      *current = None;
    }
    current.clone()
  }

  /// Whether the current latch has been acquired locally.
  pub fn is_latched(&self) -> bool {
    self.current().map_or(false, |l| l.is_acquired())
  }

  /// Latches the service. Pass no id to start a new latch; in [`LatchMode::Cluster`] this node
  /// then acquires it on every other member as well. Pass an id to join a latch another member
  /// started; asking again for the latch already held waits for its acquisition to finish and
  /// returns it, without acquiring twice.
  pub async fn acquire_latch(
    &self,
    mode: LatchMode,
    latch_id: Option<Uuid>,
  ) -> Result<Arc<Latch>, LatchError> {
    let (latch, fresh) = {
      let mut current = self.current.lock().unwrap();
      match current.as_ref().filter(|l| !l.is_unlatched()) {
        Some(existing) if latch_id == Some(existing.id()) => (existing.clone(), false),
        Some(existing) => {
          return Err(LatchError::AlreadyAcquired {
            service: self.ctx.service.clone(),
            latch: existing.id(),
          })
        }
        None => {
          let id = latch_id.unwrap_or_else(Uuid::new_v4);
          let latch = Arc::new(Latch::new(id, mode, latch_id.is_none(), self.ctx.clone()));
          *current = Some(latch.clone());
          (latch, true)
        }
      }
    };
    if fresh {
      latch.acquire().await?;
      return Ok(latch);
    }
    // Already requested: wait for that acquisition rather than hand out a half-acquired latch.
    latch.settled().await;
    if latch.is_acquired() && !latch.is_unlatched() {
      Ok(latch)
    } else {
      Err(LatchError::NotAcquired(latch.id()))
    }
  }

  /// A member joined while this node may hold a cluster latch it initiated. The newcomer is told
  /// to acquire it too, or a later unlatch would leave it out.
  pub fn on_member_added(&self, member: Arc<Member>) {
    let latch = match self.current() {
      Some(l) if l.mode() == LatchMode::Cluster && l.is_initiator() && l.is_acquired() => l,
      _ => return,
    };
    info!(
      LOG_LEVEL,
      format!("latching {} on {} which joined during {}", self.ctx.service, member, latch.id())
    );
    let callback = Arc::new(ReportFailure {
      service: self.ctx.service.clone(),
    });
    self
      .ctx
      .executor
      .submit_to_members(latch.task(LatchOp::Acquire), vec![member], callback);
  }
}

struct ReportFailure {
  service: String,
}
impl MemberCallback<bool> for ReportFailure {
  fn on_success(&self, _: Arc<Member>, _: bool) {}

  fn on_error(&self, member: Arc<Member>, err: RemoteError) {
    error!(
      LOG_LEVEL,
      format!("could not latch {} on joining member {}: {}", self.service, member, err)
    );
  }
}
