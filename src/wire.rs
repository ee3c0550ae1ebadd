//! Dashboard wire message
//!
//! Each tick the client receives one JSON object:
//!
//! ```json
//! {"RPM":1200,"TE":90.0,"VB":14.12}
//! ```
//!
//! `RPM` is rounded to an integer, `TE` (engine temperature, degrees C) to one
//! decimal place and `VB` (battery voltage) to two. Fields missing from the
//! decoded frame are sent as 0.

use serde::{Deserialize, Serialize};

use crate::types::ParsedFrame;
use crate::Result;

/// Frame field projected into `RPM`.
pub const RPM_SOURCE: &str = "RPM";
/// Frame field projected into `TE`.
pub const TE_SOURCE: &str = "TE";
/// Frame field projected into `VB`.
pub const VB_SOURCE: &str = "Bat";

/// Value substituted for fields absent from the frame.
pub const MISSING_VALUE: f64 = 0.0;

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// The projected subset pushed to clients each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "RPM")]
    pub rpm: i64,
    #[serde(rename = "TE")]
    pub te: f64,
    #[serde(rename = "VB")]
    pub vb: f64,
}

impl WireMessage {
    /// Project and round the wire fields from a decoded frame.
    pub fn project(frame: &ParsedFrame<'_>) -> Self {
        Self {
            rpm: frame.get_or(RPM_SOURCE, MISSING_VALUE).round() as i64,
            te: round_to(frame.get_or(TE_SOURCE, MISSING_VALUE), 1),
            vb: round_to(frame.get_or(VB_SOURCE, MISSING_VALUE), 2),
        }
    }

    /// Serialize to the JSON text pushed to the sink.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::buegb_field_map;
    use crate::{FieldMap, FieldSpec, decode};

    #[test]
    fn rounding_places() {
        assert_eq!(round_to(5.098, 1), 5.1);
        assert_eq!(round_to(14.126, 2), 14.13);
        assert_eq!(round_to(89.96, 1), 90.0);
        assert_eq!(round_to(-39.94, 1), -39.9);
    }

    #[test]
    fn projects_reference_packet() {
        let map = buegb_field_map().unwrap();
        let mut packet = vec![0u8; 107];
        packet[11..13].copy_from_slice(&1200u16.to_be_bytes());
        packet[30..32].copy_from_slice(&1300u16.to_be_bytes());
        packet[28..30].copy_from_slice(&1412u16.to_be_bytes());

        let frame = decode(&packet, &map).unwrap();
        let msg = WireMessage::project(&frame);
        assert_eq!(msg, WireMessage { rpm: 1200, te: 90.0, vb: 14.12 });
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let map = buegb_field_map().unwrap();
        // Long enough for RPM only
        let mut packet = vec![0u8; 13];
        packet[11..13].copy_from_slice(&950u16.to_be_bytes());

        let frame = decode(&packet, &map).unwrap();
        let msg = WireMessage::project(&frame);
        assert_eq!(msg, WireMessage { rpm: 950, te: 0.0, vb: 0.0 });
    }

    #[test]
    fn serializes_wire_keys() {
        let msg = WireMessage { rpm: 1200, te: 90.0, vb: 14.12 };
        let text = msg.to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["RPM"], 1200);
        assert_eq!(value["TE"], 90.0);
        assert_eq!(value["VB"], 14.12);
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn rpm_rounds_to_nearest() {
        let map = FieldMap::from_specs([FieldSpec::new("RPM", 0, 2, 0.5, 0.0).unwrap()]).unwrap();
        let frame = decode(2401u16.to_be_bytes(), &map).unwrap();
        assert_eq!(WireMessage::project(&frame).rpm, 1201);
    }
}
