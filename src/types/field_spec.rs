//! Field specification: where a named value lives in a packet and how to scale it.

use serde::{Deserialize, Serialize};

use super::FieldWidth;
use crate::{EcmError, Result};

/// Schema entry describing how to extract and scale one named value from a packet.
///
/// `real_value = raw_integer * scale + translate`, where `raw_integer` is the
/// unsigned big-endian integer of `width` bytes starting at `offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpecDef")]
pub struct FieldSpec {
    /// Unique field name (e.g. `RPM`, `TE`, `TabFuel1_Raw`)
    pub name: String,
    /// Byte offset from the start of the packet
    pub offset: usize,
    /// Field width in bytes
    pub width: FieldWidth,
    /// Multiplier applied to the raw integer
    pub scale: f64,
    /// Offset added after scaling
    pub translate: f64,
}

/// Unvalidated wire form used when a field table is loaded from a document.
#[derive(Debug, Deserialize)]
struct FieldSpecDef {
    name: String,
    offset: i64,
    width: i64,
    #[serde(default = "default_scale")]
    scale: f64,
    #[serde(default)]
    translate: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl TryFrom<FieldSpecDef> for FieldSpec {
    type Error = EcmError;

    fn try_from(def: FieldSpecDef) -> Result<Self> {
        FieldSpec::new(def.name, def.offset, def.width, def.scale, def.translate)
    }
}

impl FieldSpec {
    /// Create a validated field spec.
    ///
    /// Rejects an empty name, a negative offset, a width outside `{1, 2, 4}` and
    /// non-finite scale or translate values with [`EcmError::InvalidSpec`].
    pub fn new(
        name: impl Into<String>,
        offset: i64,
        width: i64,
        scale: f64,
        translate: f64,
    ) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(EcmError::invalid_spec(name, "field name is empty"));
        }

        let offset = usize::try_from(offset)
            .map_err(|_| EcmError::invalid_spec(&name, format!("negative offset {}", offset)))?;

        let width = u8::try_from(width)
            .map_err(|_| format!("width must be 1, 2 or 4 bytes, got {}", width))
            .and_then(FieldWidth::try_from)
            .map_err(|reason| EcmError::invalid_spec(&name, reason))?;

        if !scale.is_finite() {
            return Err(EcmError::invalid_spec(&name, format!("scale {} is not finite", scale)));
        }
        if !translate.is_finite() {
            return Err(EcmError::invalid_spec(
                &name,
                format!("translate {} is not finite", translate),
            ));
        }

        Ok(Self { name, offset, width, scale, translate })
    }

    /// One past the last byte this field occupies.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.width.size()
    }

    /// Whether a packet of `len` bytes fully contains this field.
    #[inline]
    pub fn fits(&self, len: usize) -> bool {
        self.end() <= len
    }

    /// Read the raw unsigned integer for this field, or `None` when out of bounds.
    #[inline]
    pub fn read_raw(&self, packet: &[u8]) -> Option<u32> {
        if !self.fits(packet.len()) {
            return None;
        }
        self.width.read_be(&packet[self.offset..])
    }

    /// Apply the affine transform to a raw integer.
    #[inline]
    pub fn apply(&self, raw: u32) -> f64 {
        f64::from(raw) * self.scale + self.translate
    }

    /// Invert the affine transform, rounding and clamping to the width's raw range.
    pub fn raw_for(&self, value: f64) -> u32 {
        if self.scale == 0.0 {
            return 0;
        }
        let raw = ((value - self.translate) / self.scale).round();
        raw.clamp(0.0, f64::from(self.width.max_raw())) as u32
    }

    /// Encode `value` into `packet` at this field's position.
    ///
    /// Fails with [`EcmError::MalformedPacket`] when the packet is too short.
    pub fn encode(&self, value: f64, packet: &mut [u8]) -> Result<()> {
        let len = packet.len();
        let raw = self.raw_for(value);
        packet
            .get_mut(self.offset..)
            .and_then(|tail| self.width.write_be(raw, tail))
            .ok_or_else(|| {
                EcmError::malformed_packet(format!(
                    "field '{}' needs bytes {}..{} but packet has {}",
                    self.name,
                    self.offset,
                    self.end(),
                    len
                ))
            })
    }
}
