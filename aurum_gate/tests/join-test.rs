use async_trait::async_trait;
use aurum_gate::cluster::AdminEvent;
use aurum_gate::core::{Clock, SystemClock};
use aurum_gate::join::{
  BuildHashCheck, ClusterJoinManager, ClusterJoinRequest, DatabaseIdentityCheck, JoinCheck,
  JoinCheckResult, JoinError, JoinMode, PassivateTarget, TimezoneCheck,
};
use aurum_gate::testkit::{LocalCluster, LocalNode, ManualClock, RecordingPublisher};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

struct Side {
  node: Arc<LocalNode>,
  events: Arc<RecordingPublisher>,
  manager: ClusterJoinManager,
  _cluster: LocalCluster,
}

fn side(cluster_size: u16, uptime: i64, checks: Vec<Arc<dyn JoinCheck>>) -> Side {
  let (cluster, nodes) = LocalCluster::with_nodes(6000, cluster_size);
  let clock = Arc::new(ManualClock::new(uptime));
  let events = Arc::new(RecordingPublisher::new());
  let node = nodes[0].clone();
  let manager = ClusterJoinManager::new(checks, node.clone(), clock, events.clone());
  Side {
    node: node,
    events: events,
    manager: manager,
    _cluster: cluster,
  }
}

// Each request is dropped as soon as its side finishes, so a side that bails out early closes
// the connection instead of leaving its peer waiting.
async fn handshake(
  acceptor: &Side,
  connector: &Side,
) -> (Result<(), JoinError>, Result<(), JoinError>) {
  let (a, b) = tokio::io::duplex(64 * 1024);
  let accept = async move {
    let mut request = ClusterJoinRequest::from_stream(JoinMode::Accept, acceptor.node.clone(), a);
    acceptor.manager.accept(&mut request).await
  };
  let connect = async move {
    let mut request =
      ClusterJoinRequest::from_stream(JoinMode::Connect, connector.node.clone(), b);
    connector.manager.connect(&mut request).await
  };
  tokio::join!(accept, connect)
}

fn issues(result: Result<(), JoinError>) -> Vec<String> {
  match result {
    Err(JoinError::NodeConnection(issues)) => issues,
    other => panic!("expected a refused connection, got {:?}", other),
  }
}

/// A check with canned results that counts how often each entry point runs.
struct Scripted {
  name: &'static str,
  order: i32,
  result: JoinCheckResult,
  unknown: JoinCheckResult,
  known_calls: AtomicUsize,
  unknown_calls: AtomicUsize,
}
impl Scripted {
  fn new(name: &'static str, order: i32, result: JoinCheckResult) -> Arc<Self> {
    Self::with_unknown(name, order, result, JoinCheckResult::OK)
  }

  fn with_unknown(
    name: &'static str,
    order: i32,
    result: JoinCheckResult,
    unknown: JoinCheckResult,
  ) -> Arc<Self> {
    Arc::new(Scripted {
      name: name,
      order: order,
      result: result,
      unknown: unknown,
      known_calls: AtomicUsize::new(0),
      unknown_calls: AtomicUsize::new(0),
    })
  }
}
#[async_trait]
impl JoinCheck for Scripted {
  fn name(&self) -> &str {
    self.name
  }

  fn order(&self) -> i32 {
    self.order
  }

  async fn accept(&self, _: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.known_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.result.clone())
  }

  async fn connect(&self, _: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.known_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.result.clone())
  }

  async fn on_unknown(&self, _: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.unknown_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.unknown.clone())
  }
}

fn standard_checks(build: &str, zone: &str) -> Vec<Arc<dyn JoinCheck>> {
  vec![
    Arc::new(TimezoneCheck::new(zone)),
    Arc::new(BuildHashCheck::new(build)),
    Arc::new(DatabaseIdentityCheck::new("db-1", "blue")),
  ]
}

#[tokio::test]
async fn matching_checks_connect_both_sides() {
  let acceptor = side(3, 100, standard_checks("abc123", "UTC"));
  let connector = side(1, 100, standard_checks("abc123", "UTC"));
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  accepted.unwrap();
  connected.unwrap();
  assert!(acceptor.events.events().is_empty());
  assert!(connector.events.events().is_empty());
}

#[tokio::test]
async fn checks_run_in_ascending_order() {
  let acceptor = side(1, 0, standard_checks("abc123", "UTC"));
  assert_eq!(
    acceptor.manager.check_names(),
    vec![BuildHashCheck::NAME, TimezoneCheck::NAME, DatabaseIdentityCheck::NAME]
  );
}

#[tokio::test]
async fn build_mismatch_refuses_both_sides() {
  let acceptor = side(3, 100, standard_checks("abc123", "UTC"));
  let connector = side(1, 100, standard_checks("def456", "UTC"));
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  assert_eq!(
    issues(accepted),
    vec![
      "build abc123 cannot join a cluster with build def456".to_string(),
      "build def456 cannot join a cluster with build abc123".to_string(),
    ]
  );
  assert_eq!(
    issues(connected),
    vec![
      "build def456 cannot join a cluster with build abc123".to_string(),
      "build abc123 cannot join a cluster with build def456".to_string(),
    ]
  );
  assert!(acceptor.events.events().is_empty());
  assert!(connector.events.events().is_empty());
}

#[tokio::test]
async fn first_failing_check_stops_the_handshake() {
  let acceptor = side(1, 0, standard_checks("abc123", "UTC"));
  let connector = side(1, 0, standard_checks("def456", "Europe/Berlin"));
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  // The time zone check never runs.
  assert_eq!(issues(accepted).len(), 2);
  assert!(issues(connected).iter().all(|i| i.starts_with("build")));
}

#[tokio::test]
async fn unavailable_node_refuses_without_negotiating() {
  let acceptor = side(1, 0, standard_checks("abc123", "UTC"));
  let connector = side(1, 0, standard_checks("abc123", "UTC"));
  acceptor.node.set_accepting(false);
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  assert_eq!(issues(accepted).len(), 1);
  // The acceptor hung up before sending anything.
  match connected {
    Err(JoinError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
    other => panic!("expected a transport failure, got {:?}", other),
  }
}

#[tokio::test]
async fn smaller_cluster_is_passivated() {
  for &small_accepts in [true, false].iter() {
    let small = side(3, 50_000, vec![Arc::new(DatabaseIdentityCheck::new("db-1", "blue"))]);
    let large = side(10, 1, vec![Arc::new(DatabaseIdentityCheck::new("db-1", "green"))]);
    let (small_result, large_result) = if small_accepts {
      handshake(&small, &large).await
    } else {
      let (l, s) = handshake(&large, &small).await;
      (s, l)
    };
    let expected = vec!["clusters blue and green both use database db-1".to_string()];
    assert_eq!(issues(small_result)[0], expected[0]);
    assert_eq!(issues(large_result).len(), 2);
    assert_eq!(
      small.events.events(),
      vec![AdminEvent::NodePassivated {
        issues: vec![
          "clusters blue and green both use database db-1".to_string(),
          "clusters green and blue both use database db-1".to_string(),
        ]
      }]
    );
    assert!(large.events.events().is_empty());
  }
}

#[tokio::test]
async fn younger_node_is_passivated() {
  let conflict = || -> Vec<Arc<dyn JoinCheck>> {
    vec![Scripted::new(
      "shared-home",
      0,
      JoinCheckResult::passivate(PassivateTarget::AnyNode, "shared home in use"),
    )]
  };
  let older = side(4, 10_000, conflict());
  let younger = side(4, 5_000, conflict());
  let (older_result, younger_result) = handshake(&younger, &older).await.swap();
  assert!(older_result.is_err());
  assert!(younger_result.is_err());
  assert_eq!(younger.events.passivations().len(), 1);
  assert!(older.events.passivations().is_empty());

  let older = side(4, 10_000, conflict());
  let younger = side(4, 5_000, conflict());
  let _ = handshake(&older, &younger).await;
  assert_eq!(younger.events.passivations().len(), 1);
  assert!(older.events.passivations().is_empty());
}

// Uptime belongs to the node, not to the manager running one handshake.
#[tokio::test]
async fn uptime_is_measured_from_node_start() {
  let (_old_cluster, old_nodes) = LocalCluster::with_nodes(6100, 4);
  let (_young_cluster, young_nodes) = LocalCluster::with_nodes(6200, 4);
  let old_clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
  tokio::time::sleep(Duration::from_millis(50)).await;
  let young_clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
  let old_events = Arc::new(RecordingPublisher::new());
  let young_events = Arc::new(RecordingPublisher::new());

  let conflict = || -> Vec<Arc<dyn JoinCheck>> {
    vec![Scripted::new(
      "shared-home",
      0,
      JoinCheckResult::passivate(PassivateTarget::AnyNode, "shared home in use"),
    )]
  };
  for _ in 0..2 {
    let young = ClusterJoinManager::new(
      conflict(),
      young_nodes[0].clone(),
      young_clock.clone(),
      young_events.clone(),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    let old =
      ClusterJoinManager::new(conflict(), old_nodes[0].clone(), old_clock.clone(), old_events.clone());

    let (a, b) = tokio::io::duplex(4096);
    let (young_node, old_node) = (young_nodes[0].clone(), old_nodes[0].clone());
    let accept = async move {
      let mut request = ClusterJoinRequest::from_stream(JoinMode::Accept, young_node, a);
      young.accept(&mut request).await
    };
    let connect = async move {
      let mut request = ClusterJoinRequest::from_stream(JoinMode::Connect, old_node, b);
      old.connect(&mut request).await
    };
    let (accepted, connected) = tokio::join!(accept, connect);
    assert!(accepted.is_err());
    assert!(connected.is_err());
  }
  assert_eq!(young_events.passivations().len(), 2);
  assert!(old_events.passivations().is_empty());
}

// A perfect tie passivates the node that initiated the connection.
#[tokio::test]
async fn connecting_node_loses_perfect_tie() {
  let conflict = || -> Vec<Arc<dyn JoinCheck>> {
    vec![Scripted::new(
      "shared-home",
      0,
      JoinCheckResult::passivate(PassivateTarget::AnyNode, "shared home in use"),
    )]
  };
  let acceptor = side(4, 7_000, conflict());
  let connector = side(4, 7_000, conflict());
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  assert!(accepted.is_err());
  assert!(connected.is_err());
  assert!(acceptor.events.passivations().is_empty());
  assert_eq!(
    connector.events.passivations(),
    vec![vec!["shared home in use".to_string(), "shared home in use".to_string()]]
  );
}

#[tokio::test]
async fn node_asking_to_leave_is_passivated() {
  let acceptor = side(2, 0, vec![Scripted::new("split-brain", 0, JoinCheckResult::OK)]);
  let connector = side(
    2,
    0,
    vec![Scripted::new(
      "split-brain",
      0,
      JoinCheckResult::passivate(PassivateTarget::ThisNode, "stale cluster id"),
    )],
  );
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  assert_eq!(issues(accepted), vec!["stale cluster id".to_string()]);
  assert_eq!(issues(connected), vec!["stale cluster id".to_string()]);
  assert!(acceptor.events.passivations().is_empty());
  assert_eq!(connector.events.passivations(), vec![vec!["stale cluster id".to_string()]]);
}

#[tokio::test]
async fn node_evicting_its_peer_passivates_the_peer() {
  let acceptor = side(
    2,
    0,
    vec![Scripted::new(
      "split-brain",
      0,
      JoinCheckResult::passivate(PassivateTarget::OtherNode, "peer is stale"),
    )],
  );
  let connector = side(2, 0, vec![Scripted::new("split-brain", 0, JoinCheckResult::OK)]);
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  assert!(accepted.is_err());
  assert!(connected.is_err());
  assert!(acceptor.events.passivations().is_empty());
  assert_eq!(connector.events.passivations().len(), 1);
}

#[tokio::test]
async fn connector_stops_at_first_unknown_check_failure() {
  let first = Scripted::with_unknown(
    "first",
    1,
    JoinCheckResult::OK,
    JoinCheckResult::disconnect("peer lacks first"),
  );
  let second = Scripted::with_unknown(
    "second",
    2,
    JoinCheckResult::OK,
    JoinCheckResult::disconnect("peer lacks second"),
  );
  let acceptor = side(1, 0, vec![]);
  let connector = side(1, 0, vec![second.clone(), first.clone()]);
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  assert_eq!(issues(accepted), vec!["peer lacks first".to_string()]);
  assert_eq!(issues(connected), vec!["peer lacks first".to_string()]);
  assert_eq!(first.unknown_calls.load(Ordering::SeqCst), 1);
  assert_eq!(second.unknown_calls.load(Ordering::SeqCst), 0);
  assert_eq!(first.known_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_checks_run_once_on_the_side_that_has_them() {
  let acceptor_only = Scripted::new("acceptor-only", 0, JoinCheckResult::OK);
  let connector_only = Scripted::new("connector-only", 0, JoinCheckResult::OK);
  let shared_a = Scripted::new("shared", 1, JoinCheckResult::OK);
  let shared_c = Scripted::new("shared", 1, JoinCheckResult::OK);
  let acceptor = side(1, 0, vec![acceptor_only.clone(), shared_a.clone()]);
  let connector = side(1, 0, vec![shared_c.clone(), connector_only.clone()]);
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  accepted.unwrap();
  connected.unwrap();
  assert_eq!(acceptor_only.unknown_calls.load(Ordering::SeqCst), 1);
  assert_eq!(acceptor_only.known_calls.load(Ordering::SeqCst), 0);
  assert_eq!(connector_only.unknown_calls.load(Ordering::SeqCst), 1);
  assert_eq!(connector_only.known_calls.load(Ordering::SeqCst), 0);
  assert_eq!(shared_a.known_calls.load(Ordering::SeqCst), 1);
  assert_eq!(shared_c.known_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn acceptor_refuses_peer_without_build_hash() {
  let acceptor = side(1, 0, vec![Arc::new(BuildHashCheck::new("abc123"))]);
  let connector = side(1, 0, vec![]);
  let (accepted, connected) = handshake(&acceptor, &connector).await;
  let expected =
    vec!["peer does not report its build; build abc123 only joins nodes that do".to_string()];
  assert_eq!(issues(accepted), expected);
  assert_eq!(issues(connected), expected);
}

#[tokio::test]
async fn unknown_action_id_aborts_the_handshake() {
  let connector = side(1, 0, vec![]);
  let (mut peer, stream) = tokio::io::duplex(1024);
  // No checks, then an action id no node defines.
  peer.write_i32(0).await.unwrap();
  peer.write_i32(7).await.unwrap();
  let mut request = ClusterJoinRequest::from_stream(JoinMode::Connect, connector.node.clone(), stream);
  match connector.manager.connect(&mut request).await {
    Err(JoinError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
    other => panic!("expected a framing failure, got {:?}", other),
  }
  assert!(connector.events.events().is_empty());
}

#[tokio::test]
#[should_panic(expected = "accept() needs an ACCEPT request")]
async fn accept_rejects_connect_requests() {
  let acceptor = side(1, 0, vec![]);
  let (a, _b) = tokio::io::duplex(1024);
  let mut request = ClusterJoinRequest::from_stream(JoinMode::Connect, acceptor.node.clone(), a);
  let _ = acceptor.manager.accept(&mut request).await;
}

trait Swap<A> {
  fn swap(self) -> (A, A);
}
impl<A> Swap<A> for (A, A) {
  fn swap(self) -> (A, A) {
    (self.1, self.0)
  }
}
