use crate::cluster::Member;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// A unit of work that can be shipped to another member and executed there.
pub trait RemoteTask: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
  /// What the executing member sends back.
  type Reply: Serialize + DeserializeOwned + Send + 'static;
}

/// Why a member did not produce a reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
  /// The task never reached the member.
  #[error("member unreachable: {0}")]
  Unreachable(String),
  /// The member ran the task and it failed.
  #[error("task failed on member: {0}")]
  Failed(String),
  /// The task or its reply could not be encoded.
  #[error("task serialization failed: {0}")]
  Serialization(String),
}

/// Receives one reply, or one error, per member a task was submitted to. Invoked from whatever
/// task or thread the executor delivers replies on.
pub trait MemberCallback<R>: Send + Sync {
  /// `member` ran the task and answered `reply`.
  fn on_success(&self, member: Arc<Member>, reply: R);
  /// `member` produced no reply.
  fn on_error(&self, member: Arc<Member>, error: RemoteError);
}

struct IgnoreReplies;
impl<R> MemberCallback<R> for IgnoreReplies {
  fn on_success(&self, _: Arc<Member>, _: R) {}
  fn on_error(&self, _: Arc<Member>, _: RemoteError) {}
}

/// Dispatches tasks to cluster members, provided by the transport layer. Submission never blocks;
/// replies arrive through the callback.
pub trait ClusterExecutor<T: RemoteTask>: Send + Sync {
  /// Submits `task` to each of `members`. `callback` is invoked once per member.
  fn submit_to_members(
    &self,
    task: T,
    members: Vec<Arc<Member>>,
    callback: Arc<dyn MemberCallback<T::Reply>>,
  );

  /// Submits to every member except the local one.
  fn submit_to_all_members(&self, task: T, callback: Arc<dyn MemberCallback<T::Reply>>);

  /// Fire and forget.
  fn execute_on_members(&self, task: T, members: Vec<Arc<Member>>) {
    self.submit_to_members(task, members, Arc::new(IgnoreReplies));
  }
}
