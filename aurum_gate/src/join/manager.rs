use crate::cluster::{AdminEvent, ClusterService, EventPublisher};
use crate::core::Clock;
use crate::join::{
  ClusterJoinRequest, JoinCheck, JoinCheckAction, JoinCheckResult, JoinError, JoinMode,
  LOG_LEVEL,
};
use crate::{debug, error, warn};
use itertools::Itertools;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::io;
use std::sync::Arc;
use JoinCheckAction::*;

/// Runs the registered [`JoinCheck`]s over a connection attempt and negotiates their outcomes
/// with the peer.
///
/// Both ends of a connection run a manager, one through [`accept`](Self::accept) and the other
/// through [`connect`](Self::connect). The accepting side announces its checks by name; the
/// connecting side answers whether it knows each one. After every check, both sides exchange
/// their result in [`negotiate_outcome`](Self::negotiate_outcome). Nothing survives between
/// handshakes.
pub struct ClusterJoinManager {
  checks: Vec<Arc<dyn JoinCheck>>,
  cluster: Arc<dyn ClusterService>,
  clock: Arc<dyn Clock>,
  events: Arc<dyn EventPublisher>,
}
impl ClusterJoinManager {
  /// Checks run in ascending order. Checks with equal order run in registration order.
  ///
  /// `clock` must measure from the moment this node started; its reading is the uptime compared
  /// when two nodes tie. Managers are cheap to build per connection attempt.
  pub fn new(
    mut checks: Vec<Arc<dyn JoinCheck>>,
    cluster: Arc<dyn ClusterService>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventPublisher>,
  ) -> Self {
    checks.sort_by_key(|c| c.order());
    ClusterJoinManager {
      checks: checks,
      cluster: cluster,
      clock: clock,
      events: events,
    }
  }

  /// Names of the registered checks, in the order they run.
  pub fn check_names(&self) -> Vec<&str> {
    self.checks.iter().map(|c| c.name()).collect()
  }

  /// Handles a connection a peer initiated.
  pub async fn accept(&self, request: &mut ClusterJoinRequest) -> Result<(), JoinError> {
    assert_eq!(request.mode(), JoinMode::Accept, "accept() needs an ACCEPT request");
    self.ensure_accepting()?;

    request.write_int(self.checks.len() as i32).await?;
    for check in &self.checks {
      request.write_utf(check.name()).await?;
      let result = if request.read_bool().await? {
        check.accept(request).await?
      } else {
        debug!(LOG_LEVEL, format!("peer does not know join check {}", check.name()));
        check.on_unknown(request).await?
      };
      self.negotiate_outcome(result, request).await?;
    }
    // The peer may have checks we don't know about.
    self.negotiate_outcome(JoinCheckResult::OK, request).await
  }

  /// Handles a connection this node initiated.
  pub async fn connect(&self, request: &mut ClusterJoinRequest) -> Result<(), JoinError> {
    assert_eq!(request.mode(), JoinMode::Connect, "connect() needs a CONNECT request");
    self.ensure_accepting()?;

    let mut to_be_checked = self.checks.iter().collect::<Vec<_>>();
    let count = request.read_count().await?;
    for _ in 0..count {
      let name = request.read_utf().await?;
      let result = match to_be_checked.iter().position(|c| c.name() == name) {
        Some(i) => {
          let check = to_be_checked.remove(i);
          request.write_bool(true).await?;
          check.connect(request).await?
        }
        None => {
          debug!(LOG_LEVEL, format!("no local join check named {}", name));
          request.write_bool(false).await?;
          JoinCheckResult::OK
        }
      };
      self.negotiate_outcome(result, request).await?;
    }
    for check in to_be_checked {
      let result = check.on_unknown(request).await?;
      if !result.is_ok() {
        // Always fails, so only the first unknown check that objects is reported.
        self.negotiate_outcome(result, request).await?;
      }
    }
    self.negotiate_outcome(JoinCheckResult::OK, request).await
  }

  fn ensure_accepting(&self) -> Result<(), JoinError> {
    if self.cluster.is_accepting_connections() {
      Ok(())
    } else {
      Err(JoinError::NodeConnection(vec![format!(
        "node {} is not accepting cluster connections",
        self.cluster.local_member()
      )]))
    }
  }

  /// Exchanges one round of results with the peer. Returns normally only when both sides
  /// reported [`Connect`]; otherwise carries out whatever passivation the two results resolve to
  /// and refuses the connection.
  pub async fn negotiate_outcome(
    &self,
    local: JoinCheckResult,
    request: &mut ClusterJoinRequest,
  ) -> Result<(), JoinError> {
    let local_action = local.action();
    let mut issues = Vec::new();
    request.write_int(local_action.id()).await?;
    if local_action != Connect {
      request.write_string_list(local.messages()).await?;
      issues.extend(local.messages().iter().cloned());
    }

    let id = request.read_int().await?;
    let remote_action = JoinCheckAction::try_from(id).map_err(|_| {
      io::Error::new(io::ErrorKind::InvalidData, format!("unknown join check action id {}", id))
    })?;
    if remote_action != Connect {
      issues.extend(request.read_string_list().await?);
    }

    if local_action == Connect && remote_action == Connect {
      return Ok(());
    }

    let resolved = resolve(local_action, remote_action);
    debug!(
      LOG_LEVEL,
      format!("local {:?}, remote {:?}: resolved to {:?}", local_action, remote_action, resolved)
    );
    match resolved {
      PassivateAnyNode => self.passivate_any_node(request, &issues).await?,
      PassivateThisNode => self.passivate_node(&issues),
      Connect | Disconnect | PassivateOtherNode => {}
    }
    warn!(
      LOG_LEVEL,
      format!("refusing {:?} connection: {}", request.mode(), issues.iter().join("; "))
    );
    Err(JoinError::NodeConnection(issues))
  }

  /// Both sides agreed one of them must go. Whoever belongs to the smaller cluster, or failing
  /// that has been up for less time, is passivated.
  async fn passivate_any_node(
    &self,
    request: &mut ClusterJoinRequest,
    issues: &[String],
  ) -> io::Result<()> {
    let local = (self.cluster.member_count() as i32, self.clock.nano_time());
    request.write_int(local.0).await?;
    request.write_long(local.1).await?;
    let remote = (request.read_int().await?, request.read_long().await?);
    if loses_tie_break(request.mode(), local, remote) {
      self.passivate_node(issues);
    } else {
      debug!(LOG_LEVEL, format!("peer {:?} loses the tie break against {:?}", remote, local));
    }
    Ok(())
  }

  fn passivate_node(&self, issues: &[String]) {
    error!(LOG_LEVEL, format!("passivating this node: {}", issues.iter().join("; ")));
    self.events.publish(AdminEvent::NodePassivated {
      issues: issues.to_vec(),
    });
  }
}

/// Combines this node's action with the peer's into the action this node carries out.
pub fn resolve(local: JoinCheckAction, remote: JoinCheckAction) -> JoinCheckAction {
  match remote {
    Connect => local,
    Disconnect | PassivateAnyNode => {
      if local.is_passivate() {
        local
      } else {
        remote
      }
    }
    // Both want the other gone: break the tie. Otherwise comply.
    PassivateOtherNode => {
      if local == PassivateOtherNode {
        PassivateAnyNode
      } else {
        PassivateThisNode
      }
    }
    // Both volunteer: break the tie. Otherwise let the peer go.
    PassivateThisNode => {
      if local == PassivateThisNode {
        PassivateAnyNode
      } else {
        PassivateOtherNode
      }
    }
  }
}

/// `(cluster size, uptime)` pairs. On a perfect tie the connecting node loses.
fn loses_tie_break(mode: JoinMode, local: (i32, i64), remote: (i32, i64)) -> bool {
  match local.0.cmp(&remote.0).then(local.1.cmp(&remote.1)) {
    Ordering::Less => true,
    Ordering::Greater => false,
    Ordering::Equal => mode == JoinMode::Connect,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_table() {
    let all = [Connect, Disconnect, PassivateAnyNode, PassivateOtherNode, PassivateThisNode];
    // rows: local, columns: remote
    let table = [
      [Connect, Disconnect, PassivateAnyNode, PassivateThisNode, PassivateOtherNode],
      [Disconnect, Disconnect, PassivateAnyNode, PassivateThisNode, PassivateOtherNode],
      [PassivateAnyNode, PassivateAnyNode, PassivateAnyNode, PassivateThisNode, PassivateOtherNode],
      [PassivateOtherNode, PassivateOtherNode, PassivateOtherNode, PassivateAnyNode, PassivateOtherNode],
      [PassivateThisNode, PassivateThisNode, PassivateThisNode, PassivateThisNode, PassivateAnyNode],
    ];
    for (i, local) in all.iter().enumerate() {
      for (j, remote) in all.iter().enumerate() {
        assert_eq!(
          resolve(*local, *remote),
          table[i][j],
          "resolve({:?}, {:?})",
          local,
          remote
        );
      }
    }
  }

  #[test]
  fn test_tie_break() {
    for mode in [JoinMode::Accept, JoinMode::Connect].iter() {
      assert!(loses_tie_break(*mode, (3, 50_000), (10, 1)));
      assert!(!loses_tie_break(*mode, (10, 1), (3, 50_000)));
      assert!(loses_tie_break(*mode, (4, 5_000), (4, 10_000)));
      assert!(!loses_tie_break(*mode, (4, 10_000), (4, 5_000)));
    }
    // The connecting node loses a perfect tie.
    assert!(loses_tie_break(JoinMode::Connect, (4, 7_000), (4, 7_000)));
    assert!(!loses_tie_break(JoinMode::Accept, (4, 7_000), (4, 7_000)));
  }
}
