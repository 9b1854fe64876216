//! Integration tests: descriptor-driven encode/decode, tagging modes,
//! optional/default handling, length forms, and the error taxonomy.

use berkit::codec::{Codec, CodecError};
use berkit::registry::DescriptorCache;
use berkit::{Field, Node, PrimitiveKind, TypeDescriptor};
use std::sync::Arc;

fn integer() -> Arc<TypeDescriptor> {
    TypeDescriptor::primitive("Integer", PrimitiveKind::Integer)
}

fn octet_string() -> Arc<TypeDescriptor> {
    TypeDescriptor::primitive("OctetString", PrimitiveKind::OctetString)
}

/// Report ::= SEQUENCE {
///     id      [0] IMPLICIT INTEGER,
///     payload [1] IMPLICIT OCTET STRING,
///     limit   [2] IMPLICIT INTEGER OPTIONAL,
///     enabled [3] IMPLICIT BOOLEAN DEFAULT TRUE
/// }
fn report() -> Arc<TypeDescriptor> {
    TypeDescriptor::sequence(
        "Report",
        vec![
            Field::tagged("id", integer(), 0),
            Field::tagged("payload", octet_string(), 1),
            Field::tagged("limit", integer(), 2).optional(),
            Field::tagged(
                "enabled",
                TypeDescriptor::primitive("Boolean", PrimitiveKind::Boolean),
                3,
            )
            .with_default(Node::boolean(true)),
        ],
    )
}

#[test]
fn sequence_round_trip_with_all_fields() {
    let codec = Codec::new();
    let ty = report();
    let node = Node::sequence([
        ("id", Node::integer(9)),
        ("payload", Node::octet_string(b"abc".to_vec())),
        ("limit", Node::integer(300)),
        ("enabled", Node::boolean(false)),
    ]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    assert_eq!(
        bytes,
        [
            0x30, 0x0F, // SEQUENCE, 15 bytes
            0x80, 0x01, 0x09, // [0] id = 9
            0x81, 0x03, b'a', b'b', b'c', // [1] payload
            0x82, 0x02, 0x01, 0x2C, // [2] limit = 300
            0x83, 0x01, 0x00, // [3] enabled = FALSE
        ]
    );
    let decoded = codec.decode(&ty, &bytes).expect("decode");
    assert_eq!(decoded, node);
}

#[test]
fn optional_absent_omits_tlv_and_decodes_unset() {
    let codec = Codec::new();
    let ty = report();
    let node = Node::sequence([
        ("id", Node::integer(1)),
        ("payload", Node::octet_string(Vec::new())),
        ("enabled", Node::boolean(false)),
    ]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    // No [2] TLV anywhere in the output.
    assert!(!bytes.windows(1).any(|w| w[0] == 0x82));
    let decoded = codec.decode(&ty, &bytes).expect("decode");
    assert!(decoded.as_sequence().unwrap().get("limit").is_none());
}

#[test]
fn default_restored_when_field_absent() {
    let codec = Codec::new();
    let ty = report();
    let node = Node::sequence([
        ("id", Node::integer(1)),
        ("payload", Node::octet_string(b"x".to_vec())),
    ]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    // Unset DEFAULT field is omitted from the encoding...
    assert!(!bytes.contains(&0x83));
    // ...and decode fills it back in.
    let decoded = codec.decode(&ty, &bytes).expect("decode");
    assert_eq!(
        decoded.as_sequence().unwrap().get("enabled"),
        Some(&Node::boolean(true))
    );
}

#[test]
fn required_field_absent_at_encode() {
    let codec = Codec::new();
    let ty = report();
    let node = Node::sequence([("id", Node::integer(1))]);
    let err = codec.encode(&ty, &node).unwrap_err();
    assert!(matches!(err, CodecError::IncompleteValue(_)), "{}", err);
}

#[test]
fn required_field_tag_mismatch_at_decode() {
    let codec = Codec::new();
    let ty = report();
    // SEQUENCE containing only [5], which matches no declared field.
    let bytes = [0x30, 0x03, 0x85, 0x01, 0x00];
    let err = codec.decode(&ty, &bytes).unwrap_err();
    assert!(matches!(err, CodecError::IncompleteValue(_)), "{}", err);
}

#[test]
fn explicit_tag_wraps_universal_tlv() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence(
        "Wrapper",
        vec![Field::tagged("value", integer(), 3).explicit()],
    );
    let node = Node::sequence([("value", Node::integer(5))]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    // [3] constructed wrapping a full INTEGER TLV, one level deeper than
    // the implicit form.
    assert_eq!(bytes, [0x30, 0x05, 0xA3, 0x03, 0x02, 0x01, 0x05]);
    assert_eq!(codec.decode(&ty, &bytes).expect("decode"), node);
}

#[test]
fn untagged_fields_use_universal_tags() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence(
        "Pair",
        vec![
            Field::new("count", integer()),
            Field::new("data", octet_string()).optional(),
        ],
    );
    let node = Node::sequence([
        ("count", Node::integer(2)),
        ("data", Node::octet_string(b"zz".to_vec())),
    ]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    assert_eq!(bytes, [0x30, 0x07, 0x02, 0x01, 0x02, 0x04, 0x02, b'z', b'z']);
    assert_eq!(codec.decode(&ty, &bytes).expect("decode"), node);
}

#[test]
fn sequence_of_integers_preserves_order() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence_of("IntegerList", integer());
    let node = Node::sequence_of(vec![
        Node::integer(1),
        Node::integer(2),
        Node::integer(300),
    ]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    // Three INTEGER TLVs concatenated inside one constructed wrapper.
    assert_eq!(
        bytes,
        [0x30, 0x0A, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x02, 0x02, 0x01, 0x2C]
    );
    let decoded = codec.decode(&ty, &bytes).expect("decode");
    let items = decoded.as_sequence_of().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2].as_i64(), Some(300));
    assert_eq!(decoded, node);
}

#[test]
fn nested_sequences_round_trip() {
    let codec = Codec::new();
    let inner = TypeDescriptor::sequence(
        "Inner",
        vec![
            Field::tagged("a", integer(), 0),
            Field::tagged("b", octet_string(), 1),
        ],
    );
    let outer = TypeDescriptor::sequence(
        "Outer",
        vec![
            Field::tagged("head", integer(), 0),
            Field::tagged("body", inner, 1),
            Field::new("tail", TypeDescriptor::sequence_of("Tail", integer())).optional(),
        ],
    );
    let node = Node::sequence([
        ("head", Node::integer(-1)),
        (
            "body",
            Node::sequence([
                ("a", Node::integer(127)),
                ("b", Node::octet_string(b"ok".to_vec())),
            ]),
        ),
        ("tail", Node::sequence_of(vec![Node::integer(5), Node::integer(6)])),
    ]);
    let bytes = codec.encode(&outer, &node).expect("encode");
    // Implicit tag on a SEQUENCE keeps the constructed bit.
    assert!(bytes.contains(&0xA1));
    assert_eq!(codec.decode(&outer, &bytes).expect("decode"), node);
}

#[test]
fn zero_length_buffer_fails() {
    let codec = Codec::new();
    let err = codec.decode(&report(), &[]).unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput { .. }), "{}", err);
}

#[test]
fn declared_length_past_buffer_end_fails() {
    let codec = Codec::new();
    // SEQUENCE claiming 10 content bytes with only 2 present.
    let bytes = [0x30, 0x0A, 0x80, 0x01];
    let err = codec.decode(&report(), &bytes).unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput { .. }), "{}", err);
}

#[test]
fn trailing_octets_inside_sequence_fail() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence("One", vec![Field::tagged("id", integer(), 0)]);
    // Valid [0] field followed by an unexpected extra TLV.
    let bytes = [0x30, 0x06, 0x80, 0x01, 0x01, 0x80, 0x01, 0x02];
    let err = codec.decode(&ty, &bytes).unwrap_err();
    assert!(matches!(err, CodecError::MalformedTlv(_)), "{}", err);
}

#[test]
fn decode_with_extent_ignores_trailing_bytes() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence_of("IntegerList", integer());
    let node = Node::sequence_of(vec![Node::integer(7)]);
    let mut bytes = codec.encode(&ty, &node).expect("encode");
    let extent = bytes.len();
    bytes.extend_from_slice(&[0xDE, 0xAD]);
    let (decoded, consumed) = codec.decode_with_extent(&ty, &bytes).expect("decode");
    assert_eq!(consumed, extent);
    assert_eq!(decoded, node);
}

#[test]
fn indefinite_length_decodes_like_definite() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence_of("IntegerList", integer());
    // 30 80 | 02 01 01 | 02 01 02 | 00 00
    let indefinite = [0x30, 0x80, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x00, 0x00];
    let (decoded, consumed) = codec.decode_with_extent(&ty, &indefinite).expect("decode");
    assert_eq!(consumed, indefinite.len());
    assert_eq!(
        decoded,
        Node::sequence_of(vec![Node::integer(1), Node::integer(2)])
    );
}

#[test]
fn long_form_length_round_trip() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence(
        "Blob",
        vec![Field::tagged("data", octet_string(), 0)],
    );
    let node = Node::sequence([("data", Node::octet_string(vec![0x55; 200]))]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    // 200-byte content forces long-form lengths on both levels.
    assert_eq!(bytes[1], 0x81);
    assert_eq!(codec.decode(&ty, &bytes).expect("decode"), node);
}

#[test]
fn node_shape_mismatch_at_encode() {
    let codec = Codec::new();
    let err = codec.encode(&report(), &Node::integer(1)).unwrap_err();
    assert!(matches!(err, CodecError::IncompleteValue(_)), "{}", err);

    let err = codec
        .encode(&integer(), &Node::boolean(true))
        .unwrap_err();
    assert!(matches!(err, CodecError::MalformedPrimitive(_)), "{}", err);
}

#[test]
fn nesting_depth_is_bounded() {
    let codec = Codec::new();
    // 100 nested indefinite-length SEQUENCE headers.
    let mut bytes = vec![0x30, 0x80, 0x00, 0x00];
    for _ in 0..100 {
        let mut level = vec![0x30, 0x80];
        level.extend_from_slice(&bytes);
        level.extend_from_slice(&[0x00, 0x00]);
        bytes = level;
    }
    let mut ty = TypeDescriptor::sequence_of("Level0", integer());
    for i in 1..=100 {
        ty = TypeDescriptor::sequence_of(format!("Level{}", i), ty);
    }
    let err = codec.decode(&ty, &bytes).unwrap_err();
    assert!(matches!(err, CodecError::MalformedTlv(_)), "{}", err);
}

#[test]
fn deeply_nested_indefinite_headers_fail_cleanly() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence_of("IntegerList", integer());
    // 200k opening headers and no end-of-contents markers: the extent scan
    // must reject this with an error, not exhaust the stack.
    let mut bytes = Vec::with_capacity(400_000);
    for _ in 0..200_000 {
        bytes.extend_from_slice(&[0x30, 0x80]);
    }
    let err = codec.decode(&ty, &bytes).unwrap_err();
    assert!(matches!(err, CodecError::MalformedTlv(_)), "{}", err);
}

#[test]
fn descriptor_cache_reuses_bindings() {
    let cache = DescriptorCache::new();
    let codec = Codec::new();
    for _ in 0..3 {
        let ty = cache.descriptor_for("Report", report);
        let node = Node::sequence([
            ("id", Node::integer(4)),
            ("payload", Node::octet_string(b"p".to_vec())),
        ]);
        let bytes = codec.encode(&ty, &node).expect("encode");
        let decoded = codec.decode(&ty, &bytes).expect("decode");
        assert_eq!(decoded.as_sequence().unwrap()["id"].as_i64(), Some(4));
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn oid_and_bit_string_fields_round_trip() {
    let codec = Codec::new();
    let ty = TypeDescriptor::sequence(
        "Identity",
        vec![
            Field::new(
                "oid",
                TypeDescriptor::primitive("Oid", PrimitiveKind::ObjectIdentifier),
            ),
            Field::new(
                "flags",
                TypeDescriptor::primitive("Flags", PrimitiveKind::BitString),
            ),
            Field::new("marker", TypeDescriptor::primitive("Null", PrimitiveKind::Null)),
        ],
    );
    let node = Node::sequence([
        ("oid", Node::object_identifier(vec![1, 0, 9506, 2, 1])),
        ("flags", Node::bit_string(6, vec![0b1100_0000])),
        ("marker", Node::null()),
    ]);
    let bytes = codec.encode(&ty, &node).expect("encode");
    assert_eq!(codec.decode(&ty, &bytes).expect("decode"), node);
}
