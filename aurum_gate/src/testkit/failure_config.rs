use crate::core::Socket;
use crate::latch::LatchOp;
use im::{HashMap, HashSet};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The kind of a [`LatchOp`], without its arguments.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TaskKind {
  /// [`LatchOp::Acquire`]
  Acquire,
  /// [`LatchOp::Drain`]
  Drain,
  /// [`LatchOp::Unlatch`]
  Unlatch,
}
impl From<&LatchOp> for TaskKind {
  fn from(op: &LatchOp) -> Self {
    match op {
      LatchOp::Acquire => TaskKind::Acquire,
      LatchOp::Drain { .. } => TaskKind::Drain,
      LatchOp::Unlatch => TaskKind::Unlatch,
    }
  }
}

/// How deliveries to a member misbehave.
#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct FailureConfig {
  /// Probability that a task is lost in transit. Lost tasks never get a reply.
  pub drop_prob: f64,
  /// Random delivery delay, drawn uniformly between the two bounds.
  pub delay: Option<(Duration, Duration)>,
  /// Tasks of these kinds fail on the member without being executed.
  pub refuse: HashSet<TaskKind>,
}
impl FailureConfig {
  /// Deliveries succeed except for tasks of `kinds`, which fail.
  pub fn refusing<I: IntoIterator<Item = TaskKind>>(kinds: I) -> Self {
    FailureConfig {
      refuse: kinds.into_iter().collect(),
      ..Default::default()
    }
  }

  /// Draws a delay for one delivery, if delays are configured.
  pub fn sample_delay(&self) -> Option<Duration> {
    self.delay.map(|(min, max)| {
      let range = min.as_millis() as u64..=max.as_millis() as u64;
      Duration::from_millis(SmallRng::from_entropy().gen_range(range))
    })
  }

  /// Decides whether one delivery is lost.
  pub fn dropped(&self) -> bool {
    self.drop_prob > 0.0 && rand::random::<f64>() < self.drop_prob
  }
}

/// Failure settings for a whole cluster.
#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct FailureConfigMap {
  /// Applies to members without an entry in `node_wide`.
  pub cluster_wide: FailureConfig,
  /// Per-member overrides.
  pub node_wide: HashMap<Socket, FailureConfig>,
}
impl FailureConfigMap {
  /// The settings for deliveries to the member at `socket`.
  pub fn get(&self, socket: &Socket) -> &FailureConfig {
    self.node_wide.get(socket).unwrap_or(&self.cluster_wide)
  }
}

#[test]
fn test_failure_config_lookup() {
  use crate::core::Host;
  let flaky = Socket::new(Host::DNS("localhost".to_string()), 4001);
  let steady = Socket::new(Host::DNS("localhost".to_string()), 4002);
  let mut map = FailureConfigMap::default();
  map.node_wide.insert(flaky.clone(), FailureConfig::refusing(vec![TaskKind::Unlatch]));
  assert!(map.get(&flaky).refuse.contains(&TaskKind::Unlatch));
  assert!(map.get(&steady).refuse.is_empty());
  assert!(!map.get(&steady).dropped());
  assert_eq!(map.get(&steady).sample_delay(), None);
  let fixed = FailureConfig {
    delay: Some((Duration::from_millis(7), Duration::from_millis(7))),
    ..Default::default()
  };
  assert_eq!(fixed.sample_delay(), Some(Duration::from_millis(7)));
}
