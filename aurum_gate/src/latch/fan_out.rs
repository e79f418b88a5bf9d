use crate::cluster::{Member, MemberCallback, RemoteError};
use crate::latch::LOG_LEVEL;
use crate::warn;
use hashbrown::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

/// Collects the replies to one task submitted to several members. A member counts as successful
/// only if it replied `true`.
pub(crate) struct FanOut {
  expected: usize,
  replied: AtomicUsize,
  succeeded: Mutex<HashSet<Uuid>>,
  notify: Notify,
}
impl FanOut {
  pub fn new(expected: usize) -> Arc<Self> {
    Arc::new(FanOut {
      expected: expected,
      replied: AtomicUsize::new(0),
      succeeded: Mutex::new(HashSet::new()),
      notify: Notify::new(),
    })
  }

  /// Waits until every member replied or the timeout elapsed. Returns whether every member
  /// replied; late replies are still recorded after a timeout.
  pub async fn wait(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      let notified = self.notify.notified();
      if self.replied.load(Ordering::SeqCst) >= self.expected {
        return true;
      }
      if timeout_at(deadline, notified).await.is_err() {
        return false;
      }
    }
  }

  pub fn succeeded(&self, member: &Member) -> bool {
    self.succeeded.lock().unwrap().contains(&member.id)
  }

  /// Splits `members` into those that succeeded and those that did not.
  pub fn partition(&self, members: &[Arc<Member>]) -> (Vec<Arc<Member>>, Vec<Arc<Member>>) {
    let succeeded = self.succeeded.lock().unwrap();
    members.iter().cloned().partition(|m| succeeded.contains(&m.id))
  }

  fn record(&self) {
    self.replied.fetch_add(1, Ordering::SeqCst);
    self.notify.notify_waiters();
  }
}
impl MemberCallback<bool> for FanOut {
  fn on_success(&self, member: Arc<Member>, reply: bool) {
    if reply {
      self.succeeded.lock().unwrap().insert(member.id);
    }
    self.record();
  }

  fn on_error(&self, member: Arc<Member>, error: RemoteError) {
    warn!(LOG_LEVEL, format!("latch task failed on {}: {}", member, error));
    self.record();
  }
}
