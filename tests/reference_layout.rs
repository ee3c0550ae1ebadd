//! Decoding properties of the built-in BUEGB layout, through the public API only.

use ecmwatch::wire::{WireMessage, round_to};
use ecmwatch::{EcmError, FieldMap, buegb_field_map, decode};
use proptest::prelude::*;

const REFERENCE_LEN: usize = 107;

fn map() -> FieldMap {
    buegb_field_map().expect("reference layout is valid")
}

#[test]
fn zero_packet_decodes_to_translates() {
    let map = map();
    let frame = decode(vec![0u8; REFERENCE_LEN], &map).unwrap();

    assert_eq!(frame.len(), map.len());
    for spec in map.all() {
        assert_eq!(frame.get(&spec.name), Some(spec.translate), "field {}", spec.name);
    }
    assert_eq!(frame.get("TE"), Some(-40.0));
}

#[test]
fn reference_values_decode() {
    let map = map();
    let mut packet = vec![0u8; REFERENCE_LEN];
    packet[11..13].copy_from_slice(&1200u16.to_be_bytes());
    packet[30..32].copy_from_slice(&1300u16.to_be_bytes());
    packet[27] = 13;

    let frame = decode(&packet, &map).unwrap();
    assert_eq!(frame.get("RPM"), Some(1200.0));
    assert_eq!(frame.get("TE"), Some(90.0));

    let tpp = frame.get("TPP").unwrap();
    assert!((tpp - 13.0 * 0.392157).abs() < 1e-9);
    assert_eq!(round_to(tpp, 1), 5.1);
}

#[test]
fn aliases_decode_from_the_same_bytes() {
    let map = map();
    let mut packet = vec![0u8; REFERENCE_LEN];
    packet[63] = 0x03;
    packet[64] = 0xE8;

    let frame = decode(&packet, &map).unwrap();
    assert_eq!(frame.get("Unknown-63"), Some(1000.0));
    assert_eq!(frame.get("ABaro"), Some(3.0));

    let names: Vec<&str> = map.aliases_of(63).map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Unknown-63", "ABaro"]);
}

#[test]
fn empty_packet_is_malformed() {
    let map = map();
    assert!(matches!(decode(Vec::<u8>::new(), &map), Err(EcmError::MalformedPacket { .. })));
}

#[test]
fn short_packet_still_reaches_the_client() {
    let map = map();
    let mut packet = vec![0u8; 20];
    packet[11..13].copy_from_slice(&3150u16.to_be_bytes());

    let frame = decode(&packet, &map).unwrap();
    assert_eq!(WireMessage::project(&frame), WireMessage { rpm: 3150, te: 0.0, vb: 0.0 });
}

proptest! {
    #[test]
    fn out_of_range_fields_are_absent(len in 1usize..=REFERENCE_LEN, fill in any::<u8>()) {
        let map = map();
        let frame = decode(vec![fill; len], &map).unwrap();

        for spec in map.all() {
            prop_assert_eq!(frame.contains(&spec.name), spec.offset + spec.width.size() <= len);
        }
    }

    #[test]
    fn decoding_is_deterministic(bytes in prop::collection::vec(any::<u8>(), 1..=REFERENCE_LEN)) {
        let map = map();
        let a = decode(&bytes, &map).unwrap();
        let b = decode(&bytes, &map).unwrap();
        prop_assert_eq!(a, b);
    }
}
