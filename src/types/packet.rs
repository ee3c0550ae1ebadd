//! Packet and decoded frame types

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Raw ECM packet received in one cycle.
///
/// Owned by the cycle that produced it and discarded after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    data: Vec<u8>,
}

impl RawPacket {
    /// Wrap received bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// A zero-filled packet of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    /// Packet contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable packet contents.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for RawPacket {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for RawPacket {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Where the packet for a tick came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOrigin {
    /// Read from the ECM
    Live,
    /// Produced by the synthetic generator
    Synthetic,
}

impl std::fmt::Display for PacketOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketOrigin::Live => f.write_str("live"),
            PacketOrigin::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Named real values decoded from one packet, in field map order.
///
/// Field names borrow from the [`FieldMap`](crate::FieldMap) that produced the
/// frame, so a frame lives no longer than its map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFrame<'m> {
    values: Vec<(&'m str, f64)>,
}

impl<'m> ParsedFrame<'m> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    pub(crate) fn push(&mut self, name: &'m str, value: f64) {
        self.values.push((name, value));
    }

    /// Value of a field, or `None` if it was not decoded.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Value of a field, or `default` if it was not decoded.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| *n == name)
    }

    /// Decoded `(name, value)` pairs in field map order.
    pub fn iter(&self) -> impl Iterator<Item = (&'m str, f64)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for ParsedFrame<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
