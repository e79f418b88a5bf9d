use crate::join::{ClusterJoinRequest, JoinCheck, JoinCheckResult, PassivateTarget};
use async_trait::async_trait;
use std::io;

/// Refuses to connect nodes running different builds.
pub struct BuildHashCheck {
  hash: String,
}
impl BuildHashCheck {
  /// Registered name of the check.
  pub const NAME: &'static str = "build-hash";

  /// `hash` identifies the build this node runs.
  pub fn new<S: Into<String>>(hash: S) -> Self {
    BuildHashCheck { hash: hash.into() }
  }

  async fn compare(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    let theirs = request.exchange_utf(&self.hash).await?;
    if theirs == self.hash {
      Ok(JoinCheckResult::OK)
    } else {
      Ok(JoinCheckResult::disconnect(format!(
        "build {} cannot join a cluster with build {}",
        self.hash, theirs
      )))
    }
  }
}
#[async_trait]
impl JoinCheck for BuildHashCheck {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn order(&self) -> i32 {
    0
  }

  async fn accept(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.compare(request).await
  }

  async fn connect(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.compare(request).await
  }

  async fn on_unknown(&self, _: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    Ok(JoinCheckResult::disconnect(format!(
      "peer does not report its build; build {} only joins nodes that do",
      self.hash
    )))
  }
}

/// Refuses to connect nodes configured with different time zones.
pub struct TimezoneCheck {
  zone: String,
}
impl TimezoneCheck {
  /// Registered name of the check.
  pub const NAME: &'static str = "timezone";

  /// `zone` is the IANA name of the zone this node runs in.
  pub fn new<S: Into<String>>(zone: S) -> Self {
    TimezoneCheck { zone: zone.into() }
  }

  async fn compare(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    let theirs = request.exchange_utf(&self.zone).await?;
    if theirs == self.zone {
      Ok(JoinCheckResult::OK)
    } else {
      Ok(JoinCheckResult::disconnect(format!(
        "time zone {} does not match the peer's time zone {}",
        self.zone, theirs
      )))
    }
  }
}
#[async_trait]
impl JoinCheck for TimezoneCheck {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn order(&self) -> i32 {
    10
  }

  async fn accept(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.compare(request).await
  }

  async fn connect(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.compare(request).await
  }

  async fn on_unknown(&self, _: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    Ok(JoinCheckResult::OK)
  }
}

/// Detects two clusters sharing one database. Nodes of different clusters writing the same
/// database will corrupt it, so one of them is passivated. Nodes on different databases simply
/// don't belong together.
pub struct DatabaseIdentityCheck {
  database: String,
  cluster_name: String,
}
impl DatabaseIdentityCheck {
  /// Registered name of the check.
  pub const NAME: &'static str = "database-identity";

  /// `database` identifies the store this node writes to, and `cluster_name` the cluster it
  /// belongs to.
  pub fn new<S: Into<String>, T: Into<String>>(database: S, cluster_name: T) -> Self {
    DatabaseIdentityCheck {
      database: database.into(),
      cluster_name: cluster_name.into(),
    }
  }

  async fn compare(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    let database = request.exchange_utf(&self.database).await?;
    let cluster_name = request.exchange_utf(&self.cluster_name).await?;
    let result = if database != self.database {
      JoinCheckResult::disconnect(format!(
        "database {} differs from the peer's database {}",
        self.database, database
      ))
    } else if cluster_name != self.cluster_name {
      JoinCheckResult::passivate(
        PassivateTarget::AnyNode,
        format!(
          "clusters {} and {} both use database {}",
          self.cluster_name, cluster_name, database
        ),
      )
    } else {
      JoinCheckResult::OK
    };
    Ok(result)
  }
}
#[async_trait]
impl JoinCheck for DatabaseIdentityCheck {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn order(&self) -> i32 {
    20
  }

  async fn accept(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.compare(request).await
  }

  async fn connect(&self, request: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    self.compare(request).await
  }

  async fn on_unknown(&self, _: &mut ClusterJoinRequest) -> io::Result<JoinCheckResult> {
    Ok(JoinCheckResult::disconnect(format!(
      "peer does not report its database; cannot verify it is not also using {}",
      self.database
    )))
  }
}
