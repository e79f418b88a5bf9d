//! Tools for exercising joins and latches without a real cluster: leveled logging, an in-process
//! [`LocalCluster`] whose task deliveries can be made to fail, delay or vanish, a
//! [`RecordingPublisher`] for administrative events, and a [`ManualClock`].

mod events;
mod failure_config;
mod local_cluster;
mod logging;

#[rustfmt::skip]
pub use {
  crate::core::ManualClock,
  events::RecordingPublisher,
  failure_config::FailureConfig,
  failure_config::FailureConfigMap,
  failure_config::TaskKind,
  local_cluster::LocalCluster,
  local_cluster::LocalNode,
  logging::LogLevel,
};
