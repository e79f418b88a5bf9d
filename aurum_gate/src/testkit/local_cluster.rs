use crate::cluster::{
  ClusterExecutor, ClusterService, Member, MemberCallback, RemoteError, RemoteTask,
};
use crate::core::{Host, Socket};
use crate::latch::{LatchRegistry, LatchSlot, LatchTask};
use crate::testkit::{FailureConfig, FailureConfigMap, TaskKind};
use crate::trace;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tokio::time::sleep;

const LOG_LEVEL: crate::testkit::LogLevel = crate::testkit::LogLevel::Trace;
const HOST: Host = Host::IP(IpAddr::V4(Ipv4Addr::LOCALHOST));

struct Shared {
  nodes: RwLock<Vec<(Arc<Member>, Arc<LatchRegistry>)>>,
  fail_map: RwLock<FailureConfigMap>,
}
impl Shared {
  fn registry(&self, member: &Member) -> Option<Arc<LatchRegistry>> {
    let nodes = self.nodes.read().unwrap();
    nodes.iter().find(|(m, _)| m.id == member.id).map(|(_, r)| r.clone())
  }
}

/// An in-process cluster. Every node shares one membership list, and latch tasks are delivered
/// straight to the target node's [`LatchRegistry`] after a round trip through `serde_cbor`.
/// Deliveries misbehave as the [`FailureConfigMap`] says.
pub struct LocalCluster {
  shared: Arc<Shared>,
}
impl LocalCluster {
  /// An empty cluster.
  pub fn new() -> Self {
    LocalCluster {
      shared: Arc::new(Shared {
        nodes: RwLock::new(Vec::new()),
        fail_map: RwLock::new(FailureConfigMap::default()),
      }),
    }
  }

  /// A cluster of `count` nodes listening on consecutive ports starting at `first_port`.
  pub fn with_nodes(first_port: u16, count: u16) -> (Self, Vec<Arc<LocalNode>>) {
    let cluster = Self::new();
    let nodes = (first_port..first_port + count).map(|p| cluster.add_node(p)).collect();
    (cluster, nodes)
  }

  /// Adds a member to the membership list. Nothing is told about it until
  /// [`announce`](Self::announce) is called.
  pub fn add_node(&self, port: u16) -> Arc<LocalNode> {
    let member = Arc::new(Member::new(Socket::new(HOST.clone(), port)));
    let registry = Arc::new(LatchRegistry::new());
    self.shared.nodes.write().unwrap().push((member.clone(), registry));
    Arc::new(LocalNode {
      member: member,
      accepting: AtomicBool::new(true),
      shared: Arc::downgrade(&self.shared),
    })
  }

  /// Tells the latchable services of every other node that `node` joined.
  pub fn announce(&self, node: &LocalNode) {
    let nodes = self.shared.nodes.read().unwrap().clone();
    for (member, registry) in nodes {
      if member.id != node.member.id {
        for slot in registry.slots() {
          slot.on_member_added(node.member.clone());
        }
      }
    }
  }

  /// Drops `node` from the membership list. Tasks sent to it afterwards fail as unreachable.
  pub fn remove_node(&self, node: &LocalNode) {
    self.shared.nodes.write().unwrap().retain(|(m, _)| m.id != node.member.id);
  }

  /// Makes deliveries to one node misbehave.
  pub fn set_node_failures(&self, node: &LocalNode, config: FailureConfig) {
    let mut fail_map = self.shared.fail_map.write().unwrap();
    fail_map.node_wide.insert(node.member.socket.clone(), config);
  }
}
impl Default for LocalCluster {
  fn default() -> Self {
    Self::new()
  }
}

/// One node's view of a [`LocalCluster`]: its membership facade and its task executor.
pub struct LocalNode {
  member: Arc<Member>,
  accepting: AtomicBool,
  shared: Weak<Shared>,
}
impl LocalNode {
  /// The member this node runs as.
  pub fn member(&self) -> &Arc<Member> {
    &self.member
  }

  /// Controls [`ClusterService::is_accepting_connections`].
  pub fn set_accepting(&self, accepting: bool) {
    self.accepting.store(accepting, Ordering::SeqCst);
  }

  /// This node's latchable services, or `None` once the cluster is dropped.
  pub fn registry(&self) -> Option<Arc<LatchRegistry>> {
    self.shared.upgrade().and_then(|s| s.registry(&self.member))
  }

  /// Makes `slot` reachable by latch tasks sent to this node.
  pub fn register(&self, slot: Arc<LatchSlot>) {
    if let Some(registry) = self.registry() {
      registry.register(slot);
    }
  }
}
impl ClusterService for LocalNode {
  fn local_member(&self) -> Arc<Member> {
    self.member.clone()
  }

  fn members(&self) -> Vec<Arc<Member>> {
    match self.shared.upgrade() {
      Some(shared) => shared.nodes.read().unwrap().iter().map(|(m, _)| m.clone()).collect(),
      None => vec![self.member.clone()],
    }
  }

  fn is_accepting_connections(&self) -> bool {
    self.accepting.load(Ordering::SeqCst)
  }
}
impl ClusterExecutor<LatchTask> for LocalNode {
  fn submit_to_members(
    &self,
    task: LatchTask,
    members: Vec<Arc<Member>>,
    callback: Arc<dyn MemberCallback<bool>>,
  ) {
    let shared = match self.shared.upgrade() {
      Some(shared) => shared,
      None => {
        for member in members {
          callback.on_error(member, RemoteError::Unreachable("cluster is gone".to_string()));
        }
        return;
      }
    };
    let bytes = match serde_cbor::to_vec(&task) {
      Ok(bytes) => bytes,
      Err(e) => {
        for member in members {
          callback.on_error(member, RemoteError::Serialization(e.to_string()));
        }
        return;
      }
    };
    for member in members {
      let registry = shared.registry(&member);
      let fail_cfg = shared.fail_map.read().unwrap().get(&member.socket).clone();
      trace!(LOG_LEVEL, format!("{} -> {}: {:?}", self.member.socket, member.socket, task.op));
      tokio::spawn(deliver(member, registry, bytes.clone(), fail_cfg, callback.clone()));
    }
  }

  fn submit_to_all_members(&self, task: LatchTask, callback: Arc<dyn MemberCallback<bool>>) {
    self.submit_to_members(task, self.remote_members(), callback);
  }
}

async fn deliver(
  member: Arc<Member>,
  registry: Option<Arc<LatchRegistry>>,
  bytes: Vec<u8>,
  fail_cfg: FailureConfig,
  callback: Arc<dyn MemberCallback<bool>>,
) {
  if let Some(dur) = fail_cfg.sample_delay() {
    sleep(dur).await;
  }
  if fail_cfg.dropped() {
    return;
  }
  let registry = match registry {
    Some(registry) => registry,
    None => {
      let msg = format!("{} is not a member", member);
      return callback.on_error(member, RemoteError::Unreachable(msg));
    }
  };
  let task = match serde_cbor::from_slice::<LatchTask>(&bytes) {
    Ok(task) => task,
    Err(e) => return callback.on_error(member, RemoteError::Serialization(e.to_string())),
  };
  if fail_cfg.refuse.contains(&TaskKind::from(&task.op)) {
    let msg = format!("{:?} refused by failure config", task.op);
    return callback.on_error(member, RemoteError::Failed(msg));
  }
  let reply = registry
    .handle(task)
    .await
    .map_err(|e| RemoteError::Failed(e.to_string()))
    .and_then(|reply| round_trip::<LatchTask>(&reply));
  match reply {
    Ok(reply) => callback.on_success(member, reply),
    Err(e) => callback.on_error(member, e),
  }
}

fn round_trip<T: RemoteTask>(reply: &T::Reply) -> Result<T::Reply, RemoteError> {
  serde_cbor::to_vec(reply)
    .and_then(|bytes| serde_cbor::from_slice(&bytes))
    .map_err(|e| RemoteError::Serialization(e.to_string()))
}

#[test]
fn test_membership_views() {
  let (cluster, nodes) = LocalCluster::with_nodes(5100, 3);
  let first = &nodes[0];
  assert_eq!(first.member_count(), 3);
  assert!(first.is_local(first.member()));
  assert!(!first.is_local(nodes[1].member()));
  assert_eq!(first.remote_members(), vec![nodes[1].member().clone(), nodes[2].member().clone()]);

  cluster.remove_node(&nodes[1]);
  assert_eq!(first.remote_members(), vec![nodes[2].member().clone()]);
  assert!(nodes[1].registry().is_none());

  drop(cluster);
  assert_eq!(first.members(), vec![first.member().clone()]);
}
