//! Field width definitions

use serde::{Deserialize, Serialize};

/// Width in bytes of an unsigned big-endian field within an ECM packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FieldWidth {
    /// Single byte (0..=255)
    One,
    /// Two bytes, big-endian (0..=65535)
    Two,
    /// Four bytes, big-endian (0..=4294967295)
    Four,
}

impl FieldWidth {
    /// Returns the size in bytes of this width.
    pub const fn size(&self) -> usize {
        match self {
            FieldWidth::One => 1,
            FieldWidth::Two => 2,
            FieldWidth::Four => 4,
        }
    }

    /// Largest raw integer representable at this width.
    pub const fn max_raw(&self) -> u32 {
        match self {
            FieldWidth::One => u8::MAX as u32,
            FieldWidth::Two => u16::MAX as u32,
            FieldWidth::Four => u32::MAX,
        }
    }

    /// Read an unsigned big-endian integer of this width from the start of `bytes`.
    ///
    /// Returns `None` when `bytes` is shorter than the width.
    #[inline]
    pub fn read_be(&self, bytes: &[u8]) -> Option<u32> {
        match self {
            FieldWidth::One => bytes.first().map(|b| u32::from(*b)),
            FieldWidth::Two => {
                let b = bytes.get(..2)?;
                Some(u32::from(u16::from_be_bytes([b[0], b[1]])))
            }
            FieldWidth::Four => {
                let b = bytes.get(..4)?;
                Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
        }
    }

    /// Write `raw` as an unsigned big-endian integer of this width into the start of `bytes`.
    ///
    /// `raw` must already be clamped to [`FieldWidth::max_raw`]. Returns `None` when
    /// `bytes` is shorter than the width.
    pub fn write_be(&self, raw: u32, bytes: &mut [u8]) -> Option<()> {
        match self {
            FieldWidth::One => *bytes.first_mut()? = raw as u8,
            FieldWidth::Two => bytes.get_mut(..2)?.copy_from_slice(&(raw as u16).to_be_bytes()),
            FieldWidth::Four => bytes.get_mut(..4)?.copy_from_slice(&raw.to_be_bytes()),
        }
        Some(())
    }
}

impl TryFrom<u8> for FieldWidth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FieldWidth::One),
            2 => Ok(FieldWidth::Two),
            4 => Ok(FieldWidth::Four),
            other => Err(format!("width must be 1, 2 or 4 bytes, got {}", other)),
        }
    }
}

impl From<FieldWidth> for u8 {
    fn from(width: FieldWidth) -> Self {
        width.size() as u8
    }
}
