//! Field-map driven packet decoder.
//!
//! Decoding walks the [`FieldMap`] in registration order. Fields that do not fit
//! in the received packet are left out of the frame; everything that fits is
//! read as an unsigned big-endian integer and scaled with
//! `raw * scale + translate`.

use tracing::trace;

use crate::types::{FieldMap, ParsedFrame};
use crate::{EcmError, Result};

/// Decode `packet` into named real values using `map`.
///
/// Only an empty packet is an error. A short packet yields a partial frame.
pub fn decode<'m>(packet: impl AsRef<[u8]>, map: &'m FieldMap) -> Result<ParsedFrame<'m>> {
    let data = packet.as_ref();
    if data.is_empty() {
        return Err(EcmError::malformed_packet("packet is empty"));
    }

    let mut frame = ParsedFrame::with_capacity(map.len());
    for spec in map.all() {
        match spec.read_raw(data) {
            Some(raw) => frame.push(&spec.name, spec.apply(raw)),
            None => trace!(field = %spec.name, end = spec.end(), len = data.len(), "Field out of bounds"),
        }
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldSpec;
    use proptest::prelude::*;

    fn small_map() -> FieldMap {
        FieldMap::from_specs([
            FieldSpec::new("Head", 0, 1, 1.0, 0.0).unwrap(),
            FieldSpec::new("Word", 1, 2, 0.5, 10.0).unwrap(),
            FieldSpec::new("Long", 3, 4, 1.0, 0.0).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn empty_packet_is_malformed() {
        let map = small_map();
        assert!(matches!(decode(Vec::<u8>::new(), &map), Err(EcmError::MalformedPacket { .. })));
    }

    #[test]
    fn decodes_all_widths() {
        let map = small_map();
        let packet = [0x05, 0x00, 0x64, 0x00, 0x01, 0x00, 0x00];
        let frame = decode(packet, &map).unwrap();

        assert_eq!(frame.get("Head"), Some(5.0));
        assert_eq!(frame.get("Word"), Some(100.0 * 0.5 + 10.0));
        assert_eq!(frame.get("Long"), Some(65536.0));
    }

    #[test]
    fn short_packet_decodes_partially() {
        let map = small_map();
        let frame = decode([1u8, 2, 3, 4], &map).unwrap();

        assert_eq!(frame.len(), 2);
        assert!(frame.contains("Head"));
        assert!(frame.contains("Word"));
        assert!(!frame.contains("Long"));
    }

    #[test]
    fn output_follows_registration_order() {
        let map = small_map();
        let frame = decode([0u8; 7], &map).unwrap();
        let names: Vec<&str> = frame.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Head", "Word", "Long"]);
    }

    proptest! {
        #[test]
        fn prop_out_of_range_fields_are_absent(
            offset in 0usize..64,
            width in prop::sample::select(vec![1i64, 2, 4]),
            len in 1usize..72
        ) {
            let map = FieldMap::from_specs([
                FieldSpec::new("Sample", offset as i64, width, 1.0, 0.0).unwrap(),
                FieldSpec::new("First", 0, 1, 1.0, 0.0).unwrap(),
            ]).unwrap();
            let packet = vec![0xABu8; len];
            let frame = decode(&packet, &map).unwrap();

            prop_assert_eq!(frame.contains("Sample"), offset + width as usize <= len);
            prop_assert!(frame.contains("First"));
        }

        #[test]
        fn prop_affine_transform_applies(raw in any::<u16>(), scale in -10.0f64..10.0, translate in -100.0f64..100.0) {
            let map = FieldMap::from_specs([
                FieldSpec::new("X", 2, 2, scale, translate).unwrap(),
            ]).unwrap();
            let mut packet = vec![0u8; 4];
            packet[2..4].copy_from_slice(&raw.to_be_bytes());

            let value = decode(&packet, &map).unwrap().get("X").unwrap();
            prop_assert_eq!(value, f64::from(raw) * scale + translate);
        }
    }
}
