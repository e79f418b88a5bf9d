use crate::join::{ClusterJoinRequest, JoinCheckResult};
use async_trait::async_trait;
use std::io;

/// A named validation run on both ends of every join handshake.
///
/// Both nodes run their checks in ascending [`order`](JoinCheck::order), so the order decides
/// which failure is discovered, and reported, first. When both nodes have a check with the same
/// [`name`](JoinCheck::name), the accepting node runs [`accept`](JoinCheck::accept) and the
/// connecting node runs [`connect`](JoinCheck::connect); the two may exchange data over the
/// request, as long as they read exactly what the other side writes. When only one node has the
/// check, that node runs [`on_unknown`](JoinCheck::on_unknown) without any peer participation.
///
/// Checks must not depend on each other's outcomes.
#[async_trait]
pub trait JoinCheck: Send + Sync {
  /// Identifies the check across versions. Peers match checks by name only.
  fn name(&self) -> &str;

  /// Position in the walk. Checks with lower values run first.
  fn order(&self) -> i32;

  /// Runs on the accepting node when both nodes have the check.
  async fn accept(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult>;

  /// Runs on the connecting node when both nodes have the check.
  async fn connect(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult>;

  /// Decides whether the peer not having this check is itself a reason to refuse the connection.
  async fn on_unknown(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult>;
}
