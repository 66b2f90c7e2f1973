//! Hostile-input handling: corruption must surface as an error, never as a
//! silently wrong value.

use weft_types::{Type, TypeEnv, Value};
use weft_wire::{decode_args, encode_args, limits, write_i64, write_u64, WireError};

fn empty() -> TypeEnv {
    TypeEnv::new()
}

/// Every strict prefix of a valid message must fail to decode.
fn assert_no_prefix_decodes(types: &[Type], values: &[Value]) {
    let bytes = encode_args(&empty(), types, values).unwrap();
    for len in 0..bytes.len() {
        assert!(
            decode_args(&bytes[..len], &empty(), types).is_err(),
            "prefix of {} bytes decoded successfully",
            len
        );
    }
    assert!(decode_args(&bytes, &empty(), types).is_ok());
}

#[test]
fn truncation_never_passes() {
    assert_no_prefix_decodes(&[Type::Nat], &[Value::nat(42u32)]);
    assert_no_prefix_decodes(&[Type::Text], &[Value::text("hi")]);
    assert_no_prefix_decodes(
        &[Type::vector(Type::Nat)],
        &[Value::Vector(vec![Value::nat(1u32), Value::nat(300u32)])],
    );
    assert_no_prefix_decodes(
        &[Type::record([("a", Type::Nat), ("b", Type::Text)]).unwrap()],
        &[Value::record([
            ("a", Value::nat(1u32)),
            ("b", Value::text("x")),
        ])],
    );
}

#[test]
fn trailing_garbage_is_rejected() {
    let mut bytes = encode_args(&empty(), &[Type::Nat], &[Value::nat(1u32)]).unwrap();
    bytes.push(0x00);
    assert!(matches!(
        decode_args(&bytes, &empty(), &[Type::Nat]),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn wrong_magic_is_unsupported_version() {
    let mut bytes = encode_args(&empty(), &[Type::Nat], &[Value::nat(1u32)]).unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        decode_args(&bytes, &empty(), &[Type::Nat]),
        Err(WireError::UnsupportedVersion { .. })
    ));
}

#[test]
fn invalid_bool_byte_is_rejected() {
    let mut bytes = encode_args(&empty(), &[Type::Bool], &[Value::Bool(true)]).unwrap();
    *bytes.last_mut().unwrap() = 2;
    assert!(matches!(
        decode_args(&bytes, &empty(), &[Type::Bool]),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn invalid_option_flag_is_rejected() {
    let ty = Type::option(Type::Nat);
    let mut bytes = encode_args(
        &empty(),
        std::slice::from_ref(&ty),
        &[Value::none()],
    )
    .unwrap();
    *bytes.last_mut().unwrap() = 7;
    assert!(matches!(
        decode_args(&bytes, &empty(), std::slice::from_ref(&ty)),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn invalid_utf8_is_rejected() {
    let mut bytes = encode_args(&empty(), &[Type::Text], &[Value::text("hi")]).unwrap();
    let last = bytes.len() - 2;
    bytes[last] = 0xff;
    assert!(matches!(
        decode_args(&bytes, &empty(), &[Type::Text]),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn variant_tag_out_of_range_is_rejected() {
    let ty = Type::variant([("ok", Type::Null)]).unwrap();
    let mut bytes = encode_args(
        &empty(),
        std::slice::from_ref(&ty),
        &[Value::variant("ok", Value::Null)],
    )
    .unwrap();
    *bytes.last_mut().unwrap() = 5;
    assert!(matches!(
        decode_args(&bytes, &empty(), std::slice::from_ref(&ty)),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn vector_length_overrun_is_rejected() {
    let ty = Type::vector(Type::Nat);
    let mut bytes = encode_args(
        &empty(),
        std::slice::from_ref(&ty),
        &[Value::Vector(vec![Value::nat(1u32)])],
    )
    .unwrap();
    // The element count is the second-to-last byte; claim far more elements
    // than there are bytes left.
    let at = bytes.len() - 2;
    bytes[at] = 0x7f;
    assert!(matches!(
        decode_args(&bytes, &empty(), std::slice::from_ref(&ty)),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn zero_size_element_flood_is_rejected() {
    // vec null: elements cost no bytes, so the count alone must be bounded.
    let mut bytes = b"DIDL".to_vec();
    write_u64(1, &mut bytes);
    write_i64(-19, &mut bytes); // vec
    write_i64(-1, &mut bytes); // null
    write_u64(1, &mut bytes);
    write_i64(0, &mut bytes);
    write_u64(limits::MAX_ZERO_SIZE_ELEMENTS + 1, &mut bytes);
    assert!(matches!(
        decode_args(&bytes, &empty(), &[Type::vector(Type::Null)]),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn unknown_table_opcode_is_malformed() {
    let mut bytes = b"DIDL".to_vec();
    write_u64(1, &mut bytes);
    write_i64(-30, &mut bytes);
    write_u64(0, &mut bytes);
    assert!(matches!(
        decode_args(&bytes, &empty(), &[]),
        Err(WireError::MalformedTable { .. })
    ));
}

#[test]
fn primitive_opcode_as_table_entry_is_malformed() {
    // A table entry must be a composite constructor, not `nat`.
    let mut bytes = b"DIDL".to_vec();
    write_u64(1, &mut bytes);
    write_i64(-3, &mut bytes);
    write_u64(0, &mut bytes);
    assert!(matches!(
        decode_args(&bytes, &empty(), &[]),
        Err(WireError::MalformedTable { .. })
    ));
}

#[test]
fn oversized_table_claim_is_malformed() {
    let mut bytes = b"DIDL".to_vec();
    write_u64(limits::MAX_TABLE_ENTRIES + 1, &mut bytes);
    assert!(matches!(
        decode_args(&bytes, &empty(), &[]),
        Err(WireError::MalformedTable { .. })
    ));
}

#[test]
fn nesting_bomb_hits_the_depth_limit() {
    // rec A = opt A, with a presence chain far past the depth limit.
    let mut env = TypeEnv::new();
    let chain = env.reserve();
    env.define(&chain, Type::option(chain.clone())).unwrap();

    let mut bytes = b"DIDL".to_vec();
    write_u64(1, &mut bytes);
    write_i64(-18, &mut bytes); // opt
    write_i64(0, &mut bytes); // itself
    write_u64(1, &mut bytes);
    write_i64(0, &mut bytes);
    bytes.extend(std::iter::repeat(1u8).take(limits::MAX_VALUE_DEPTH + 10));
    bytes.push(0);
    assert!(matches!(
        decode_args(&bytes, &env, std::slice::from_ref(&chain)),
        Err(WireError::ValueDecode { .. })
    ));
}

#[test]
fn corrupt_bytes_in_skipped_arguments_still_fail() {
    // Receiver expects fewer arguments, but the surplus argument's bytes are
    // still validated.
    let mut bytes = encode_args(
        &empty(),
        &[Type::Nat, Type::Text],
        &[Value::nat(1u32), Value::text("hi")],
    )
    .unwrap();
    let last = bytes.len() - 2;
    bytes[last] = 0xff; // corrupt the skipped text payload
    assert!(decode_args(&bytes, &empty(), &[Type::Nat]).is_err());
}
