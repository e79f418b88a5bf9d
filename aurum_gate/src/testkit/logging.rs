use serde::{Deserialize, Serialize};

/// Severity of a log message. A message is emitted when its level is at or above the level
/// configured for the module logging it.
#[derive(
  Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize,
)]
pub enum LogLevel {
  /// Step-by-step detail, such as every task delivered.
  Trace,
  /// Decisions made along the way.
  Debug,
  /// Lifecycle events, such as a latch being acquired.
  Info,
  /// Something unexpected that was handled.
  Warn,
  /// Something failed and an operator may need to act.
  Error,
  /// Logged through `tracing` at error level.
  Fatal,
  /// Silences a module when used as its configured level.
  Off,
}
impl LogLevel {
  /// The most verbose level.
  pub const MIN: LogLevel = LogLevel::Trace;

  /// Whether a message at this level passes a module configured at `configured`.
  pub fn enabled(self, configured: LogLevel) -> bool {
    self != LogLevel::Off && self >= configured
  }
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
  ($at:ident, $event:ident, $level:expr, $msg:expr) => {
    if $crate::testkit::LogLevel::$at.enabled($level) {
      $crate::tracing::$event!("{}", $msg);
    }
  };
}

/// Logs `$msg` at [`LogLevel::Trace`] if `$level` allows it.
#[macro_export]
macro_rules! trace {
  ($level:expr, $msg:expr) => {
    $crate::log_at!(Trace, trace, $level, $msg)
  };
}

/// Logs `$msg` at [`LogLevel::Debug`] if `$level` allows it.
#[macro_export]
macro_rules! debug {
  ($level:expr, $msg:expr) => {
    $crate::log_at!(Debug, debug, $level, $msg)
  };
}

/// Logs `$msg` at [`LogLevel::Info`] if `$level` allows it.
#[macro_export]
macro_rules! info {
  ($level:expr, $msg:expr) => {
    $crate::log_at!(Info, info, $level, $msg)
  };
}

/// Logs `$msg` at [`LogLevel::Warn`] if `$level` allows it.
#[macro_export]
macro_rules! warn {
  ($level:expr, $msg:expr) => {
    $crate::log_at!(Warn, warn, $level, $msg)
  };
}

/// Logs `$msg` at [`LogLevel::Error`] if `$level` allows it.
#[macro_export]
macro_rules! error {
  ($level:expr, $msg:expr) => {
    $crate::log_at!(Error, error, $level, $msg)
  };
}

/// Logs `$msg` at [`LogLevel::Fatal`] if `$level` allows it. tracing has no level above
/// error, so the event is emitted as an error.
#[macro_export]
macro_rules! fatal {
  ($level:expr, $msg:expr) => {
    $crate::log_at!(Fatal, error, $level, $msg)
  };
}

#[test]
fn test_log_level_filter() {
  assert!(LogLevel::Warn.enabled(LogLevel::Debug));
  assert!(LogLevel::Debug.enabled(LogLevel::Debug));
  assert!(!LogLevel::Trace.enabled(LogLevel::Debug));
  assert!(!LogLevel::Fatal.enabled(LogLevel::Off));
  assert!(!LogLevel::Off.enabled(LogLevel::MIN));
}
