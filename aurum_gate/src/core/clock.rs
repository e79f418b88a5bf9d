use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Monotonic time source whose origin is the moment the node started. A reading is therefore the
/// node's uptime.
pub trait Clock: Send + Sync {
  /// Nanoseconds elapsed since the node started.
  fn nano_time(&self) -> i64;
}

/// Reads the process' monotonic clock, measured from the moment it was created. Create one when
/// the node starts and share it.
pub struct SystemClock {
  origin: Instant,
}
impl SystemClock {
  /// Starts counting now.
  pub fn new() -> Self {
    SystemClock { origin: Instant::now() }
  }
}
impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}
impl Clock for SystemClock {
  fn nano_time(&self) -> i64 {
    self.origin.elapsed().as_nanos() as i64
  }
}

/// A clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
  nanos: AtomicI64,
}
impl ManualClock {
  /// A clock that reads `nanos` until told otherwise.
  pub fn new(nanos: i64) -> Self {
    ManualClock { nanos: AtomicI64::new(nanos) }
  }

  /// Jumps to `nanos`.
  pub fn set(&self, nanos: i64) {
    self.nanos.store(nanos, Ordering::SeqCst);
  }

  /// Moves forward by `nanos`.
  pub fn advance(&self, nanos: i64) {
    self.nanos.fetch_add(nanos, Ordering::SeqCst);
  }
}
impl Clock for ManualClock {
  fn nano_time(&self) -> i64 {
    self.nanos.load(Ordering::SeqCst)
  }
}

#[test]
fn test_manual_clock() {
  let clock = ManualClock::new(5);
  clock.advance(10);
  assert_eq!(clock.nano_time(), 15);
  clock.set(3);
  assert_eq!(clock.nano_time(), 3);
}

#[test]
fn test_system_clock_is_monotonic() {
  let clock = SystemClock::new();
  let first = clock.nano_time();
  std::thread::sleep(std::time::Duration::from_millis(2));
  assert!(clock.nano_time() > first);
  assert!(first >= 0);
}
