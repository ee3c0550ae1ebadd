//! Source traits for ECM packets

use crate::Result;
use crate::types::{PacketOrigin, RawPacket};

/// A producer of raw ECM packets.
///
/// Sources never raise: a failed attempt is an expected outcome and resolves to
/// `None`. Choosing what to do when a source yields nothing is the caller's job
/// (see [`Acquisition`](crate::driver::Acquisition)).
#[async_trait::async_trait]
pub trait PacketSource: Send + 'static {
    /// Try to produce one packet.
    ///
    /// Returns:
    /// - `Some(packet)` - A packet is available for this cycle
    /// - `None` - Nothing this cycle (device absent, timeout, bad read)
    ///
    /// Implementations must resolve within a bounded time.
    async fn attempt(&mut self) -> Option<RawPacket>;

    /// What kind of data this source produces.
    fn origin(&self) -> PacketOrigin;
}

/// A transport-level acquisition from the ECM that may fail.
///
/// [`LiveReader`](crate::providers::LiveReader) polls an `Acquire` with a timeout
/// and turns every failure into "no packet".
#[async_trait::async_trait]
pub trait Acquire: Send + 'static {
    /// Request and read one runtime data packet.
    async fn acquire(&mut self) -> Result<RawPacket>;

    /// Human readable description of the link, for logs.
    fn describe(&self) -> String;
}
