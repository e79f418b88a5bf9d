use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::cmp::max;

/// What a join check wants done with the connection. Variants are declared, and ordered, from
/// least to most severe; the discriminant is what goes on the wire.
#[derive(
  Clone,
  Copy,
  Debug,
  Deserialize,
  Eq,
  Hash,
  IntoPrimitive,
  Ord,
  PartialEq,
  PartialOrd,
  Serialize,
  TryFromPrimitive,
)]
#[repr(i32)]
pub enum JoinCheckAction {
  /// The check passed.
  Connect = 0,
  /// Refuse the connection, leaving both nodes running.
  Disconnect = 1,
  /// One of the two nodes must be passivated, and it does not matter which.
  PassivateAnyNode = 2,
  /// The remote node must be passivated.
  PassivateOtherNode = 3,
  /// The local node must be passivated.
  PassivateThisNode = 4,
}
impl JoinCheckAction {
  /// The value sent on the wire.
  pub fn id(self) -> i32 {
    self.into()
  }

  /// Whether the action takes one of the nodes out of service.
  pub fn is_passivate(self) -> bool {
    self.passivate_target().is_some()
  }

  fn passivate_target(self) -> Option<PassivateTarget> {
    match self {
      JoinCheckAction::Connect | JoinCheckAction::Disconnect => None,
      JoinCheckAction::PassivateAnyNode => Some(PassivateTarget::AnyNode),
      JoinCheckAction::PassivateOtherNode => Some(PassivateTarget::OtherNode),
      JoinCheckAction::PassivateThisNode => Some(PassivateTarget::ThisNode),
    }
  }
}

/// Which node a passivating [`JoinCheckResult`] asks to take out of service.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PassivateTarget {
  /// Either node will do; the handshake breaks the tie.
  AnyNode,
  /// The remote node.
  OtherNode,
  /// The node that produced the result.
  ThisNode,
}
impl From<PassivateTarget> for JoinCheckAction {
  fn from(target: PassivateTarget) -> Self {
    match target {
      PassivateTarget::AnyNode => JoinCheckAction::PassivateAnyNode,
      PassivateTarget::OtherNode => JoinCheckAction::PassivateOtherNode,
      PassivateTarget::ThisNode => JoinCheckAction::PassivateThisNode,
    }
  }
}

/// The outcome of one join check on one side of a handshake.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum JoinCheckResult {
  /// The check passed.
  Connect,
  /// Refuse the connection, for the given reasons.
  Disconnect(Vec<String>),
  /// Refuse the connection and take the targeted node out of service, for the given reasons.
  Passivate(PassivateTarget, Vec<String>),
}
impl JoinCheckResult {
  /// Shorthand for a passed check.
  pub const OK: JoinCheckResult = JoinCheckResult::Connect;

  /// Starts a result that may collect several messages.
  pub fn builder() -> JoinCheckResultBuilder {
    JoinCheckResultBuilder::default()
  }

  /// Refuses the connection with a single reason.
  pub fn disconnect<S: Into<String>>(message: S) -> Self {
    JoinCheckResult::Disconnect(vec![message.into()])
  }

  /// Passivates `target` with a single reason.
  pub fn passivate<S: Into<String>>(target: PassivateTarget, message: S) -> Self {
    JoinCheckResult::Passivate(target, vec![message.into()])
  }

  /// The action this result asks for.
  pub fn action(&self) -> JoinCheckAction {
    match self {
      JoinCheckResult::Connect => JoinCheckAction::Connect,
      JoinCheckResult::Disconnect(_) => JoinCheckAction::Disconnect,
      JoinCheckResult::Passivate(target, _) => (*target).into(),
    }
  }

  /// Reasons given for the action. Always empty for [`JoinCheckResult::Connect`].
  pub fn messages(&self) -> &[String] {
    match self {
      JoinCheckResult::Connect => &[],
      JoinCheckResult::Disconnect(messages) => messages,
      JoinCheckResult::Passivate(_, messages) => messages,
    }
  }

  /// Whether the check passed.
  pub fn is_ok(&self) -> bool {
    matches!(self, JoinCheckResult::Connect)
  }
}
impl Default for JoinCheckResult {
  fn default() -> Self {
    JoinCheckResult::OK
  }
}

/// Accumulates messages into a [`JoinCheckResult`]. The action only ever escalates: adding a less
/// severe action than the current one leaves the current one in place.
#[derive(Debug, Default)]
pub struct JoinCheckResultBuilder {
  action: Option<JoinCheckAction>,
  messages: Vec<String>,
}
impl JoinCheckResultBuilder {
  /// Escalates to `action` without adding a message.
  pub fn action(mut self, action: JoinCheckAction) -> Self {
    self.escalate(action);
    self
  }

  /// Escalates to `action` and records why.
  pub fn message<S: Into<String>>(mut self, action: JoinCheckAction, message: S) -> Self {
    self.escalate(action);
    self.messages.push(message.into());
    self
  }

  /// The most severe action seen so far.
  pub fn current(&self) -> JoinCheckAction {
    self.action.unwrap_or(JoinCheckAction::Connect)
  }

  fn escalate(&mut self, action: JoinCheckAction) {
    self.action = Some(max(self.current(), action));
  }

  /// Messages added while the action stayed at [`JoinCheckAction::Connect`] are dropped; they are
  /// never sent to the peer.
  pub fn build(self) -> JoinCheckResult {
    match self.current().passivate_target() {
      Some(target) => JoinCheckResult::Passivate(target, self.messages),
      None if self.current() == JoinCheckAction::Disconnect => {
        JoinCheckResult::Disconnect(self.messages)
      }
      None => JoinCheckResult::Connect,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use JoinCheckAction::*;

  const ALL: [JoinCheckAction; 5] =
    [Connect, Disconnect, PassivateAnyNode, PassivateOtherNode, PassivateThisNode];

  #[test]
  fn test_action_ids_and_severity() {
    for (i, action) in ALL.iter().enumerate() {
      assert_eq!(action.id(), i as i32);
      assert_eq!(JoinCheckAction::try_from(i as i32).unwrap(), *action);
    }
    assert!(JoinCheckAction::try_from(5).is_err());
    assert!(JoinCheckAction::try_from(-1).is_err());
    assert!(ALL.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(
      ALL.iter().filter(|a| a.is_passivate()).copied().collect::<Vec<_>>(),
      vec![PassivateAnyNode, PassivateOtherNode, PassivateThisNode]
    );
  }

  #[test]
  fn test_builder_never_deescalates() {
    for first in ALL.iter() {
      for second in ALL.iter() {
        let result = JoinCheckResult::builder()
          .message(*first, "first")
          .message(*second, "second")
          .build();
        assert_eq!(result.action(), max(*first, *second));
      }
    }
    let result = JoinCheckResult::builder()
      .message(PassivateOtherNode, "split brain")
      .message(Disconnect, "timezone mismatch")
      .action(Connect)
      .build();
    assert_eq!(
      result,
      JoinCheckResult::Passivate(
        PassivateTarget::OtherNode,
        vec!["split brain".to_string(), "timezone mismatch".to_string()]
      )
    );
  }

  #[test]
  fn test_builder_connect_drops_messages() {
    let result = JoinCheckResult::builder().message(Connect, "all good").build();
    assert_eq!(result, JoinCheckResult::OK);
    assert!(result.messages().is_empty());
    assert_eq!(JoinCheckResult::builder().build(), JoinCheckResult::OK);
  }
}
