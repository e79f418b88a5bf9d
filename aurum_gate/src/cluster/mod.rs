//! The narrow seams between this crate and the rest of an Aurum deployment.
//!
//! Membership, task transport and operator alerting are owned by other layers. This crate only
//! consumes them through the traits defined here: [`ClusterService`] to list members,
//! [`ClusterExecutor`] to run a [`RemoteTask`] on other members and collect per-member replies
//! through a [`MemberCallback`], and [`EventPublisher`] to raise an [`AdminEvent`].
//!
//! [`testkit::LocalCluster`](crate::testkit::LocalCluster) implements all of them in-process.

mod executor;
mod service;
mod utils;

#[rustfmt::skip]
pub use {
  executor::ClusterExecutor,
  executor::MemberCallback,
  executor::RemoteError,
  executor::RemoteTask,
  service::ClusterService,
  service::EventPublisher,
  utils::AdminEvent,
  utils::LatchConfig,
  utils::Member,
};
