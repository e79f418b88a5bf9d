use crate::cluster::ClusterService;
use crate::core::wire;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt};

/// Which end of a connection attempt a node is on.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum JoinMode {
  /// The node received the connection.
  Accept,
  /// The node initiated the connection.
  Connect,
}

type Reader = Box<dyn AsyncRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// One connection attempt, alive for the length of a single handshake. The caller that created
/// it owns the underlying connection and closes it afterwards.
///
/// Every read flushes pending writes first, so neither side can wait on bytes its peer is still
/// holding in a buffer.
pub struct ClusterJoinRequest {
  mode: JoinMode,
  cluster: Arc<dyn ClusterService>,
  input: Reader,
  output: Writer,
}
impl ClusterJoinRequest {
  /// A request reading from `input` and writing to `output`.
  pub fn new<R, W>(mode: JoinMode, cluster: Arc<dyn ClusterService>, input: R, output: W) -> Self
  where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
  {
    ClusterJoinRequest {
      mode: mode,
      cluster: cluster,
      input: Box::new(input),
      output: Box::new(output),
    }
  }

  /// Splits a bidirectional connection into the request's two halves.
  pub fn from_stream<S>(mode: JoinMode, cluster: Arc<dyn ClusterService>, stream: S) -> Self
  where
    S: AsyncRead + AsyncWrite + Send + 'static,
  {
    let (input, output) = split(stream);
    Self::new(mode, cluster, input, output)
  }

  /// Whether this node accepted or initiated the connection.
  pub fn mode(&self) -> JoinMode {
    self.mode
  }

  /// Membership of the cluster this node belongs to.
  pub fn cluster(&self) -> &Arc<dyn ClusterService> {
    &self.cluster
  }

  /// Sends buffered writes. Reads do this on their own.
  pub async fn flush(&mut self) -> io::Result<()> {
    self.output.flush().await
  }

  /// Queues an `i32`.
  pub async fn write_int(&mut self, value: i32) -> io::Result<()> {
    wire::write_int(&mut self.output, value).await
  }

  /// Queues an `i64`.
  pub async fn write_long(&mut self, value: i64) -> io::Result<()> {
    wire::write_long(&mut self.output, value).await
  }

  /// Queues a `bool`.
  pub async fn write_bool(&mut self, value: bool) -> io::Result<()> {
    wire::write_bool(&mut self.output, value).await
  }

  /// Queues a length-prefixed string.
  pub async fn write_utf(&mut self, value: &str) -> io::Result<()> {
    wire::write_utf(&mut self.output, value).await
  }

  /// Queues a counted list of strings.
  pub async fn write_string_list(&mut self, values: &[String]) -> io::Result<()> {
    wire::write_string_list(&mut self.output, values).await
  }

  /// Reads an `i32`.
  pub async fn read_int(&mut self) -> io::Result<i32> {
    self.flush().await?;
    wire::read_int(&mut self.input).await
  }

  /// Reads a non-negative `i32` count.
  pub async fn read_count(&mut self) -> io::Result<usize> {
    self.flush().await?;
    wire::read_count(&mut self.input).await
  }

  /// Reads an `i64`.
  pub async fn read_long(&mut self) -> io::Result<i64> {
    self.flush().await?;
    wire::read_long(&mut self.input).await
  }

  /// Reads a `bool`.
  pub async fn read_bool(&mut self) -> io::Result<bool> {
    self.flush().await?;
    wire::read_bool(&mut self.input).await
  }

  /// Reads a length-prefixed string.
  pub async fn read_utf(&mut self) -> io::Result<String> {
    self.flush().await?;
    wire::read_utf(&mut self.input).await
  }

  /// Reads a counted list of strings.
  pub async fn read_string_list(&mut self) -> io::Result<Vec<String>> {
    self.flush().await?;
    wire::read_string_list(&mut self.input).await
  }

  /// Sends `value` and returns the string the peer sent in the same position. Both sides must call
  /// this at the same point of the handshake.
  pub async fn exchange_utf(&mut self, value: &str) -> io::Result<String> {
    self.write_utf(value).await?;
    self.read_utf().await
  }
}
