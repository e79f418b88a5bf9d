//! Framing primitives shared by both ends of a join handshake.
//!
//! Scalars are big endian. Strings are a `u16` byte length followed by UTF-8 bytes, and string
//! lists are an `i32` count followed by that many strings. Nothing is versioned: both sides must
//! read exactly what the other wrote, and a mismatch surfaces as an [`io::Error`].

use std::convert::TryFrom;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Four bytes.
pub async fn write_int<W: AsyncWrite + Unpin>(out: &mut W, value: i32) -> io::Result<()> {
  out.write_i32(value).await
}

/// Reads what [`write_int`] wrote.
pub async fn read_int<R: AsyncRead + Unpin>(input: &mut R) -> io::Result<i32> {
  input.read_i32().await
}

/// Eight bytes.
pub async fn write_long<W: AsyncWrite + Unpin>(out: &mut W, value: i64) -> io::Result<()> {
  out.write_i64(value).await
}

/// Reads what [`write_long`] wrote.
pub async fn read_long<R: AsyncRead + Unpin>(input: &mut R) -> io::Result<i64> {
  input.read_i64().await
}

/// One byte, `1` for `true`.
pub async fn write_bool<W: AsyncWrite + Unpin>(out: &mut W, value: bool) -> io::Result<()> {
  out.write_u8(value as u8).await
}

/// Any non-zero byte reads as `true`.
pub async fn read_bool<R: AsyncRead + Unpin>(input: &mut R) -> io::Result<bool> {
  Ok(input.read_u8().await? != 0)
}

/// Fails with [`io::ErrorKind::InvalidInput`] when `value` is longer than `u16::MAX` bytes.
pub async fn write_utf<W: AsyncWrite + Unpin>(out: &mut W, value: &str) -> io::Result<()> {
  let len = u16::try_from(value.len()).map_err(|_| {
    io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("{} byte string does not fit a u16 length prefix", value.len()),
    )
  })?;
  out.write_u16(len).await?;
  out.write_all(value.as_bytes()).await
}

/// Fails with [`io::ErrorKind::InvalidData`] on bytes that are not UTF-8.
pub async fn read_utf<R: AsyncRead + Unpin>(input: &mut R) -> io::Result<String> {
  let len = input.read_u16().await? as usize;
  let mut buf = vec![0u8; len];
  input.read_exact(&mut buf).await?;
  String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// An `i32` count, then each string as [`write_utf`] frames it.
pub async fn write_string_list<W: AsyncWrite + Unpin>(
  out: &mut W,
  values: &[String],
) -> io::Result<()> {
  let count = i32::try_from(values.len()).map_err(|_| {
    io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("{} strings do not fit an i32 count", values.len()),
    )
  })?;
  out.write_i32(count).await?;
  for value in values {
    write_utf(out, value).await?;
  }
  Ok(())
}

/// Reads what [`write_string_list`] wrote.
pub async fn read_string_list<R: AsyncRead + Unpin>(input: &mut R) -> io::Result<Vec<String>> {
  let count = read_count(input).await?;
  let mut values = Vec::with_capacity(count.min(64));
  for _ in 0..count {
    values.push(read_utf(input).await?);
  }
  Ok(values)
}

/// Reads an `i32` that must be a non-negative element count.
pub async fn read_count<R: AsyncRead + Unpin>(input: &mut R) -> io::Result<usize> {
  let count = input.read_i32().await?;
  usize::try_from(count).map_err(|_| {
    io::Error::new(io::ErrorKind::InvalidData, format!("negative count on the wire: {}", count))
  })
}
