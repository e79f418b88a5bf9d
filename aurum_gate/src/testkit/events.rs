use crate::cluster::{AdminEvent, EventPublisher};
use std::sync::Mutex;

/// Keeps every published event for later inspection.
#[derive(Default)]
pub struct RecordingPublisher {
  events: Mutex<Vec<AdminEvent>>,
}
impl RecordingPublisher {
  /// A publisher that has seen nothing.
  pub fn new() -> Self {
    Self::default()
  }

  /// Everything published so far, oldest first.
  pub fn events(&self) -> Vec<AdminEvent> {
    self.events.lock().unwrap().clone()
  }

  /// The issues of every [`AdminEvent::NodePassivated`] published so far.
  pub fn passivations(&self) -> Vec<Vec<String>> {
    self
      .events()
      .into_iter()
      .filter_map(|e| match e {
        AdminEvent::NodePassivated { issues } => Some(issues),
        _ => None,
      })
      .collect()
  }
}
impl EventPublisher for RecordingPublisher {
  fn publish(&self, event: AdminEvent) {
    self.events.lock().unwrap().push(event);
  }
}
