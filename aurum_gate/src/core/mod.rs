//! Building blocks shared by the join and latch subsystems: member addresses, the monotonic
//! clock facade, and the framing primitives used on join handshakes.

mod clock;
mod remoting;
pub mod wire;

#[rustfmt::skip]
pub use {
  clock::Clock,
  clock::ManualClock,
  clock::SystemClock,
  remoting::Host,
  remoting::Socket,
};
