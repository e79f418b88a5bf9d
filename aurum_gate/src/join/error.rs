use itertools::Itertools;
use std::io;
use thiserror::Error;

/// Why a join handshake did not end with the two nodes connected.
#[derive(Debug, Error)]
pub enum JoinError {
  /// The connection failed mid-handshake. The handshake is abandoned; retrying is up to the
  /// caller.
  #[error("join handshake transport failure: {0}")]
  Io(#[from] io::Error),
  /// At least one check, on either side, refused the connection.
  #[error("node connection refused: {}", .0.iter().join("; "))]
  NodeConnection(Vec<String>),
}
impl JoinError {
  /// The human readable reasons for a refusal, local ones first.
  pub fn issues(&self) -> &[String] {
    match self {
      JoinError::NodeConnection(issues) => issues,
      JoinError::Io(_) => &[],
    }
  }
}
