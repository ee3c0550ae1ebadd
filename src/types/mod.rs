//! Core types for ECM packet representation.
//!
//! ## Architecture
//!
//! - [`FieldSpec`] describes one named value: byte offset, [`FieldWidth`] and affine transform
//! - [`FieldMap`] is the immutable, validated, ordered registry of specs
//! - [`RawPacket`] is the byte buffer read from the ECM (or synthesized) each cycle
//! - [`ParsedFrame`] holds the decoded real values for one packet
//!
//! ## Usage Example
//!
//! ```rust
//! use ecmwatch::types::{FieldMap, FieldSpec, RawPacket};
//!
//! let mut builder = FieldMap::builder();
//! builder.register(FieldSpec::new("RPM", 11, 2, 1.0, 0.0).unwrap()).unwrap();
//! let map = builder.build();
//!
//! let mut packet = RawPacket::zeroed(107);
//! packet.as_bytes_mut()[11..13].copy_from_slice(&1200u16.to_be_bytes());
//!
//! let frame = ecmwatch::decode(&packet, &map).unwrap();
//! assert_eq!(frame.get("RPM"), Some(1200.0));
//! ```

mod field_map;
mod field_spec;
mod field_width;
mod packet;

pub use field_map::{FieldMap, FieldMapBuilder};
pub use field_spec::FieldSpec;
pub use field_width::FieldWidth;
pub use packet::{PacketOrigin, ParsedFrame, RawPacket};
