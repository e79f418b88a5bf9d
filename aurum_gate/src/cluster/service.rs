use crate::cluster::{AdminEvent, Member};
use std::sync::Arc;

/// Read-only view of cluster membership, provided by the membership layer.
pub trait ClusterService: Send + Sync {
  /// The member this process runs as.
  fn local_member(&self) -> Arc<Member>;

  /// Every member currently in the cluster, the local one included.
  fn members(&self) -> Vec<Arc<Member>>;

  /// Whether this node currently takes part in join handshakes. A node that is starting up or
  /// shutting down refuses them.
  fn is_accepting_connections(&self) -> bool;

  /// Size of the cluster, the local member included.
  fn member_count(&self) -> usize {
    self.members().len()
  }

  /// Whether `member` is this process.
  fn is_local(&self, member: &Member) -> bool {
    self.local_member().id == member.id
  }

  /// Every member except the local one.
  fn remote_members(&self) -> Vec<Arc<Member>> {
    let local = self.local_member();
    self.members().into_iter().filter(|m| m.id != local.id).collect()
  }
}

/// Delivers [`AdminEvent`]s to whatever the application uses to alert operators.
pub trait EventPublisher: Send + Sync {
  /// Must not block.
  fn publish(&self, event: AdminEvent);
}
