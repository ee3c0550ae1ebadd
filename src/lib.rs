//! Field-map driven decoder and real-time streaming for Buell ECM telemetry.
//!
//! An ECM answers a runtime data request with a fixed-layout binary packet.
//! This crate describes that layout as data ([`FieldMap`]), decodes packets into
//! named real values ([`decode`]) and streams a small projection of them to
//! dashboard clients at a fixed cadence ([`driver::StreamingLoop`]). When no ECM
//! answers, plausible synthetic packets take their place so the dashboard keeps
//! moving.
//!
//! # Features
//!
//! - **Data-driven layouts**: the BUEGB layout is built in; others load from YAML
//! - **Live first**: every tick uses the freshest ECM packet, falling back per tick, never sticky
//! - **One decoder**: synthetic packets are encoded through the field map and
//!   decoded exactly like live ones
//! - **Transport agnostic loop**: anything implementing [`FrameSink`] can receive messages
//!
//! ## Example
//!
//! ```rust
//! use ecmwatch::{buegb_field_map, decode, wire::WireMessage};
//!
//! # fn main() -> ecmwatch::Result<()> {
//! let map = buegb_field_map()?;
//!
//! let mut packet = vec![0u8; 107];
//! packet[11..13].copy_from_slice(&1200u16.to_be_bytes()); // RPM
//! packet[30..32].copy_from_slice(&1300u16.to_be_bytes()); // TE, 0.1 C steps from -40
//! packet[28..30].copy_from_slice(&1412u16.to_be_bytes()); // Bat, 0.01 V steps
//!
//! let frame = decode(&packet, &map)?;
//! assert_eq!(frame.get("TE"), Some(90.0));
//!
//! let message = WireMessage::project(&frame);
//! assert_eq!(message.to_text()?, r#"{"RPM":1200,"TE":90.0,"VB":14.12}"#);
//! # Ok(())
//! # }
//! ```

// Core types and error handling
mod decoder;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Acquisition and streaming
pub mod driver;
pub mod provider;
pub mod providers;
pub mod sink;
pub mod wire;

// Layouts, configuration and transport
pub mod config;
pub mod schema;
pub mod server;

// Core exports
pub use decoder::decode;
pub use error::*;
pub use types::*;

// Main API exports
pub use config::{CliOverrides, Config};
pub use driver::{Acquisition, StreamingLoop};
pub use provider::{Acquire, PacketSource};
pub use providers::{LiveReader, LiveSource, SerialLink, SyntheticSource};
pub use schema::{FieldMapSource, buegb_field_map};
pub use server::Server;
pub use sink::{ChannelSink, FrameSink};
