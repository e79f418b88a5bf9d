use crate::cluster::{
  AdminEvent, ClusterExecutor, ClusterService, EventPublisher, LatchConfig, Member,
};
use crate::latch::{FanOut, LatchError, LatchOp, LatchTask, LOG_LEVEL};
use crate::{debug, error, info};
use async_trait::async_trait;
use hashbrown::HashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// Whether a latch covers only this node or every member of the cluster.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LatchMode {
  /// Only this node is latched.
  Local,
  /// Every member is latched, and the initiator drains them all.
  Cluster,
}

/// What latching means for one particular service, on one node. Implemented by the service that
/// owns the latched resource.
#[async_trait]
pub trait LocalLatch: Send + Sync {
  /// Stops new work from starting against the resource.
  async fn acquire_locally(&self);

  /// Waits up to `timeout` for in-flight work to finish. With `force`, in-flight work may be
  /// cancelled instead. Returns whether the resource is now idle.
  async fn drain_locally(&self, timeout: Duration, force: bool) -> bool;

  /// Lets work resume.
  async fn unlatch_locally(&self);
}

/// Everything a latch needs from the node it lives on.
pub(crate) struct LatchContext {
  pub service: String,
  pub hooks: Arc<dyn LocalLatch>,
  pub cluster: Arc<dyn ClusterService>,
  pub executor: Arc<dyn ClusterExecutor<LatchTask>>,
  pub events: Arc<dyn EventPublisher>,
  pub config: LatchConfig,
}

/// One acquisition of a service's latch. Obtained from
/// [`LatchSlot::acquire_latch`](crate::latch::LatchSlot::acquire_latch) and unusable once
/// [`unlatch`](Self::unlatch) has been called, on this node or any other.
pub struct Latch {
  id: Uuid,
  mode: LatchMode,
  initiator: bool,
  ctx: Arc<LatchContext>,
  // Serializes local acquire against local unlatch.
  lock: tokio::sync::Mutex<()>,
  acquired: AtomicBool,
  drained_locally: AtomicBool,
  drained: AtomicBool,
  unlatched: AtomicBool,
  unlatch_called: AtomicBool,
  // Set once acquire() has returned, whatever its outcome.
  settled: AtomicBool,
  settle: Notify,
  drained_members: Mutex<HashSet<Uuid>>,
}
impl Latch {
  pub(crate) fn new(id: Uuid, mode: LatchMode, initiator: bool, ctx: Arc<LatchContext>) -> Self {
    Latch {
      id: id,
      mode: mode,
      initiator: initiator,
      ctx: ctx,
      lock: tokio::sync::Mutex::new(()),
      acquired: AtomicBool::new(false),
      drained_locally: AtomicBool::new(false),
      drained: AtomicBool::new(false),
      unlatched: AtomicBool::new(false),
      unlatch_called: AtomicBool::new(false),
      settled: AtomicBool::new(false),
      settle: Notify::new(),
      drained_members: Mutex::new(HashSet::new()),
    }
  }

  /// Identifies the latch on every member holding it.
  pub fn id(&self) -> Uuid {
    self.id
  }

  /// Whether the latch spans the cluster.
  pub fn mode(&self) -> LatchMode {
    self.mode
  }

  /// Key of the latched service.
  pub fn service(&self) -> &str {
    &self.ctx.service
  }

  /// Whether this node created the latch, as opposed to acquiring it on another member's behalf.
  pub fn is_initiator(&self) -> bool {
    self.initiator
  }

  /// Whether local acquisition completed. Stays `true` after unlatching.
  pub fn is_acquired(&self) -> bool {
    self.acquired.load(Ordering::SeqCst)
  }

  /// Whether a drain has succeeded everywhere the latch applies.
  pub fn is_drained(&self) -> bool {
    self.drained.load(Ordering::SeqCst)
  }

  /// Whether the latch has been released on this node.
  pub fn is_unlatched(&self) -> bool {
    self.unlatched.load(Ordering::SeqCst)
  }

  pub(crate) fn task(&self, op: LatchOp) -> LatchTask {
    LatchTask {
      service: self.ctx.service.clone(),
      latch: self.id,
      op: op,
    }
  }

  /// Acquires locally and, if this node initiated a cluster latch, on every other member. If any
  /// member fails to acquire in time, every member that did acquire is unlatched again.
  pub(crate) async fn acquire(&self) -> Result<(), LatchError> {
    let result = self.acquire_everywhere().await;
    self.settled.store(true, Ordering::SeqCst);
    self.settle.notify_waiters();
    result
  }

  /// Waits until [`acquire`](Self::acquire) has returned, successfully or not.
  pub(crate) async fn settled(&self) {
    loop {
      let notified = self.settle.notified();
      if self.settled.load(Ordering::SeqCst) {
        return;
      }
      notified.await;
    }
  }

  async fn acquire_everywhere(&self) -> Result<(), LatchError> {
    {
      let _guard = self.lock.lock().await;
      if self.is_acquired() {
        return Err(LatchError::AlreadyAcquired {
          service: self.ctx.service.clone(),
          latch: self.id,
        });
      }
      self.ctx.hooks.acquire_locally().await;
      self.acquired.store(true, Ordering::SeqCst);
    }
    info!(LOG_LEVEL, format!("{} latched locally by {}", self.ctx.service, self.id));
    if self.mode == LatchMode::Cluster && self.initiator {
      self.acquire_remote().await?;
    }
    Ok(())
  }

  async fn acquire_remote(&self) -> Result<(), LatchError> {
    let members = self.ctx.cluster.remote_members();
    if members.is_empty() {
      return Ok(());
    }
    let fan = FanOut::new(members.len());
    self.ctx.executor.submit_to_members(self.task(LatchOp::Acquire), members.clone(), fan.clone());
    fan.wait(self.ctx.config.acquire_timeout).await;
    let (acquired, failed) = fan.partition(&members);
    if failed.is_empty() {
      info!(LOG_LEVEL, format!("{} latched on {} members", self.ctx.service, members.len()));
      return Ok(());
    }
    error!(
      LOG_LEVEL,
      format!(
        "{} latch {} failed on {}, rolling back",
        self.ctx.service,
        self.id,
        failed.iter().join(", ")
      )
    );
    self.unlatch_locally().await;
    self.unlatch_members(acquired).await;
    Err(LatchError::ClusterAcquireFailed {
      service: self.ctx.service.clone(),
      latch: self.id,
      failed: failed,
    })
  }

  /// Waits for in-flight work against the resource to finish, on this node or on every member.
  /// Returns `false` if anything is still busy when the timeout elapses; callers are expected to
  /// call again. Members that have drained are not asked again.
  pub async fn drain(&self, timeout: Duration) -> Result<bool, LatchError> {
    self.drain_with(timeout, false).await
  }

  /// Like [`drain`](Self::drain), but work still in flight may be cancelled.
  pub async fn force_drain(&self, timeout: Duration) -> Result<bool, LatchError> {
    self.drain_with(timeout, true).await
  }

  async fn drain_with(&self, timeout: Duration, force: bool) -> Result<bool, LatchError> {
    if self.is_drained() {
      return Ok(true);
    }
    if !self.is_acquired() {
      return Err(LatchError::NotAcquired(self.id));
    }
    if self.is_unlatched() {
      return Ok(false);
    }
    let drained = match self.mode {
      LatchMode::Local => self.drain_locally(timeout, force).await,
      LatchMode::Cluster => self.drain_cluster(timeout, force).await,
    };
    if drained {
      self.drained.store(true, Ordering::SeqCst);
    }
    Ok(drained)
  }

  async fn drain_cluster(&self, timeout: Duration, force: bool) -> bool {
    let started = Instant::now();
    let pending = {
      let drained = self.drained_members.lock().unwrap();
      self
        .ctx
        .cluster
        .remote_members()
        .into_iter()
        .filter(|m| !drained.contains(&m.id))
        .collect::<Vec<_>>()
    };
    let fan = FanOut::new(pending.len());
    if !pending.is_empty() {
      let task = self.task(LatchOp::Drain {
        timeout: timeout,
        force: force,
      });
      self.ctx.executor.submit_to_members(task, pending.clone(), fan.clone());
    }
    let local = self.drain_locally(timeout, force).await;
    let budget = (timeout + self.ctx.config.drain_slack).saturating_sub(started.elapsed());
    fan.wait(budget).await;
    let (drained, busy) = fan.partition(&pending);
    self.drained_members.lock().unwrap().extend(drained.iter().map(|m| m.id));
    if !busy.is_empty() {
      debug!(
        LOG_LEVEL,
        format!("{} still draining on {}", self.ctx.service, busy.iter().join(", "))
      );
    }
    local && busy.is_empty()
  }

  /// Drains this node only. The result is remembered once it is `true`.
  pub(crate) async fn drain_locally(&self, timeout: Duration, force: bool) -> bool {
    if self.is_unlatched() {
      return false;
    }
    if self.drained_locally.load(Ordering::SeqCst) {
      return true;
    }
    let drained = self.ctx.hooks.drain_locally(timeout, force).await;
    if drained {
      self.drained_locally.store(true, Ordering::SeqCst);
    }
    drained
  }

  /// Releases the latch, on this node or on every member. Can only be called once. Members that
  /// do not confirm within the unlatch timeout are reported through
  /// [`AdminEvent::UnlatchFailed`], not retried.
  pub async fn unlatch(&self) -> Result<(), LatchError> {
    if self.is_unlatched() || self.unlatch_called.swap(true, Ordering::SeqCst) {
      return Err(LatchError::AlreadyUnlatched(self.id));
    }
    self.unlatch_locally().await;
    if self.mode == LatchMode::Cluster {
      let members = self.ctx.cluster.remote_members();
      let fan = FanOut::new(members.len());
      self.ctx.executor.submit_to_all_members(self.task(LatchOp::Unlatch), fan.clone());
      self.report_unlatched(&fan, members).await;
    }
    Ok(())
  }

  pub(crate) async fn unlatch_locally(&self) {
    if self.is_unlatched() {
      return;
    }
    let _guard = self.lock.lock().await;
    if !self.is_unlatched() {
      self.ctx.hooks.unlatch_locally().await;
      self.unlatched.store(true, Ordering::SeqCst);
      info!(LOG_LEVEL, format!("{} unlatched locally from {}", self.ctx.service, self.id));
    }
  }

  async fn unlatch_members(&self, members: Vec<Arc<Member>>) {
    if members.is_empty() {
      return;
    }
    let fan = FanOut::new(members.len());
    self.ctx.executor.submit_to_members(self.task(LatchOp::Unlatch), members.clone(), fan.clone());
    self.report_unlatched(&fan, members).await;
  }

  async fn report_unlatched(&self, fan: &FanOut, members: Vec<Arc<Member>>) {
    if members.is_empty() {
      return;
    }
    fan.wait(self.ctx.config.unlatch_timeout).await;
    let (_, failed) = fan.partition(&members);
    if !failed.is_empty() {
      let event = AdminEvent::UnlatchFailed {
        service: self.ctx.service.clone(),
        latch: self.id,
        members: failed,
      };
      error!(LOG_LEVEL, event);
      self.ctx.events.publish(event);
    }
  }
}
