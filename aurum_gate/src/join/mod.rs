//! The handshake two nodes run before they connect.
//!
//! A connection attempt is represented by a [`ClusterJoinRequest`] on each side. The node that
//! received the connection calls [`ClusterJoinManager::accept`] and the node that initiated it
//! calls [`ClusterJoinManager::connect`]. Every [`JoinCheck`] yields a [`JoinCheckResult`] and the
//! two sides exchange their results after each check.
//!
//! ### Negotiation
//! When either side reports something other than [`JoinCheckAction::Connect`], the two actions
//! are combined by [`resolve`]. A side asked to passivate itself raises an
//! [`AdminEvent::NodePassivated`](crate::cluster::AdminEvent::NodePassivated); when both sides
//! want the other gone, or both volunteer, the node from the smaller cluster goes, then the node
//! with less uptime, then the connecting node. The connection is refused either way.
//!
//! ### Wire format
//! ```text
//! accepting side                         connecting side
//! i32 check count           ---------->
//! per check: utf name       ---------->
//!                           <----------  bool "I have it too"
//!            (check's own exchange, if both have it)
//!            negotiation    <--------->  negotiation
//! final negotiation         <--------->  final negotiation
//!
//! negotiation: i32 action id, then if not CONNECT: i32 count + utf messages
//! tie break:   i32 cluster size, i64 uptime nanos
//! ```

use crate::testkit::LogLevel;

mod action;
mod check;
mod checks;
mod error;
mod manager;
mod request;

/// Messages below this level are dropped.
pub const LOG_LEVEL: LogLevel = LogLevel::Debug;

#[rustfmt::skip]
pub use {
  action::JoinCheckAction,
  action::JoinCheckResult,
  action::JoinCheckResultBuilder,
  action::PassivateTarget,
  check::JoinCheck,
  checks::BuildHashCheck,
  checks::DatabaseIdentityCheck,
  checks::TimezoneCheck,
  error::JoinError,
  manager::ClusterJoinManager,
  manager::resolve,
  request::ClusterJoinRequest,
  request::JoinMode,
};
