use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// The DNS name or IP address of the machine hosting a cluster member.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub enum Host {
  /// A name to be resolved.
  DNS(String),
  /// A literal address.
  IP(IpAddr),
}
impl From<String> for Host {
  fn from(s: String) -> Self {
    match IpAddr::from_str(s.as_str()) {
      Ok(ip) => Host::IP(ip),
      Err(_) => Host::DNS(s),
    }
  }
}

/// The address a cluster member accepts join handshakes and remote tasks on.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, Ord, PartialOrd)]
pub struct Socket {
  /// The DNS name or IP address of the machine hosting the member.
  pub host: Host,
  /// The TCP port the member listens on.
  pub port: u16,
}
impl Socket {
  /// The member listening on `port` of `host`.
  pub fn new(host: Host, port: u16) -> Socket {
    Socket { host: host, port: port }
  }
}
impl fmt::Display for Socket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.host {
      Host::DNS(s) => write!(f, "DNS({}):{}", s, self.port),
      Host::IP(ip) => write!(f, "IP({}):{}", ip, self.port),
    }
  }
}
#[test]
fn test_host_from_string() {
  assert_eq!(
    Host::from("127.0.0.1".to_string()),
    Host::IP(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
  );
  assert_eq!(Host::from("node-1.local".to_string()), Host::DNS("node-1.local".to_string()));
}
