// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::testproto::{message, message2, POOL};

use anyhow::Result;
use prost::bytes::Bytes;
use prost_reflect::{DynamicMessage, MapKey, ReflectMessage, Value as FieldValue};
use protoval::{
    from_message, from_reflect_message, implied_type, EnumValue, Error, Number, Type, Value,
};

fn nested(name: &str, count: i32) -> DynamicMessage {
    let mut msg = DynamicMessage::new(message("Assorted.Nested"));
    msg.set_field_by_name("name", FieldValue::String(name.to_string()));
    msg.set_field_by_name("count", FieldValue::I32(count));
    msg
}

fn nested_value(name: &str, count: i32) -> Value {
    Value::object([("count", Value::from(count)), ("name", Value::from(name))])
}

fn number(s: &str) -> Result<Value> {
    Ok(Value::Number(Number::from_str(s)?))
}

/// Encodes and checks that the value conforms to the message's implied type.
fn encode(msg: &DynamicMessage) -> Result<Value> {
    let value = from_message(msg)?;
    assert_eq!(value.ty(), implied_type(&msg.descriptor())?);
    Ok(value)
}

#[test]
fn zero_values() -> Result<()> {
    let value = encode(&DynamicMessage::new(message("Assorted")))?;

    assert_eq!(value["t_bool"], Value::from(false));
    assert_eq!(value["t_string"], Value::from(""));
    assert_eq!(value["t_bytes"], Value::from(""));
    for name in ["t_int32", "t_uint64", "t_sfixed32", "t_float", "t_double"] {
        assert_eq!(value[name], Value::from(0), "{name}");
    }
    assert_eq!(
        value["t_nested"],
        Value::null(Type::object([("count", Type::Number), ("name", Type::String)]))
    );
    Ok(())
}

#[test]
fn scalars_are_exact() -> Result<()> {
    let mut msg = DynamicMessage::new(message("Assorted"));
    msg.set_field_by_name("t_bool", FieldValue::Bool(true));
    msg.set_field_by_name("t_int32", FieldValue::I32(i32::MIN));
    msg.set_field_by_name("t_int64", FieldValue::I64(i64::MIN));
    msg.set_field_by_name("t_uint32", FieldValue::U32(u32::MAX));
    msg.set_field_by_name("t_uint64", FieldValue::U64(u64::MAX));
    msg.set_field_by_name("t_sint64", FieldValue::I64(-5));
    msg.set_field_by_name("t_fixed64", FieldValue::U64(1 << 60));
    msg.set_field_by_name("t_float", FieldValue::F32(0.1));
    msg.set_field_by_name("t_double", FieldValue::F64(-1.5));
    msg.set_field_by_name("t_string", FieldValue::String("héllo".to_string()));
    msg.set_field_by_name("t_nested", FieldValue::Message(nested("n", 7)));

    let value = encode(&msg)?;
    assert_eq!(value["t_bool"], Value::from(true));
    assert_eq!(value["t_int32"], Value::from(i32::MIN));
    assert_eq!(value["t_int64"], number("-9223372036854775808")?);
    assert_eq!(value["t_uint32"], Value::from(u32::MAX));
    assert_eq!(value["t_uint64"], number("18446744073709551615")?);
    assert_eq!(value["t_sint64"], Value::from(-5));
    assert_eq!(value["t_fixed64"], number("1152921504606846976")?);
    assert_eq!(value["t_float"], number("0.100000001490116119384765625")?);
    assert_eq!(value["t_double"], number("-1.5")?);
    assert_eq!(value["t_string"], Value::from("héllo"));
    assert_eq!(value["t_nested"], nested_value("n", 7));
    Ok(())
}

#[test]
fn bytes_are_base64() -> Result<()> {
    let mut msg = DynamicMessage::new(message("Assorted"));
    msg.set_field_by_name(
        "t_bytes",
        FieldValue::Bytes(Bytes::from_static(b"HELLO COMPUTER")),
    );
    assert_eq!(encode(&msg)?["t_bytes"], Value::from("SEVMTE8gQ09NUFVURVI="));
    Ok(())
}

#[test]
fn non_finite_floats() -> Result<()> {
    let mut msg = DynamicMessage::new(message("Assorted"));
    msg.set_field_by_name("t_double", FieldValue::F64(f64::NAN));

    let err = from_message(&msg).expect_err("NaN has no number");
    assert!(matches!(err, Error::OutOfRange { .. }));
    assert_eq!(
        err.to_string(),
        ".t_double: double NaN cannot be represented as number"
    );

    msg.set_field_by_name("t_double", FieldValue::F64(f64::INFINITY));
    let err = from_message(&msg).expect_err("infinity has no number");
    assert_eq!(
        err.to_string(),
        ".t_double: double inf cannot be represented as number"
    );

    msg.set_field_by_name("t_double", FieldValue::F64(f64::NEG_INFINITY));
    let err = from_message(&msg).expect_err("infinity has no number");
    assert!(matches!(err, Error::OutOfRange { .. }));
    assert_eq!(err.path().to_string(), ".t_double");
    Ok(())
}

#[test]
fn presence() -> Result<()> {
    let mut msg = DynamicMessage::new(message("WithOptional"));
    assert_eq!(
        encode(&msg)?,
        Value::object([
            ("t_int64", Value::null(Type::Number)),
            ("t_plain", Value::from("")),
            ("t_string", Value::null(Type::String)),
        ])
    );

    // An explicitly set zero value is distinguishable from an unset field.
    msg.set_field_by_name("t_string", FieldValue::String(String::new()));
    msg.set_field_by_name("t_int64", FieldValue::I64(0));
    assert_eq!(
        encode(&msg)?,
        Value::object([
            ("t_int64", Value::from(0)),
            ("t_plain", Value::from("")),
            ("t_string", Value::from("")),
        ])
    );
    Ok(())
}

#[test]
fn oneof() -> Result<()> {
    let mut msg = DynamicMessage::new(message("WithOneOf"));
    msg.set_field_by_name("b", FieldValue::String("boop".to_string()));
    msg.set_field_by_name("outside", FieldValue::String("hello".to_string()));

    assert_eq!(
        encode(&msg)?,
        Value::object([
            ("a", Value::null(Type::String)),
            ("b", Value::from("boop")),
            ("outside", Value::from("hello")),
        ])
    );

    // Selecting another member clears the previous one.
    msg.set_field_by_name("a", FieldValue::String("beep".to_string()));
    let value = encode(&msg)?;
    assert_eq!(value["a"], Value::from("beep"));
    assert_eq!(value["b"], Value::null(Type::String));
    Ok(())
}

#[test]
fn any_is_not_unpacked() -> Result<()> {
    let any_desc = POOL
        .get_message_by_name("google.protobuf.Any")
        .expect("Any is registered");
    let mut any = DynamicMessage::new(any_desc);
    any.set_field_by_name(
        "type_url",
        FieldValue::String("type.example.com/pkg.Empty".to_string()),
    );
    any.set_field_by_name("value", FieldValue::Bytes(Bytes::new()));

    let mut msg = DynamicMessage::new(message("WithAny"));
    msg.set_field_by_name("t_any", FieldValue::Message(any));

    assert_eq!(
        encode(&msg)?,
        Value::object([(
            "t_any",
            Value::object([
                ("type_url", Value::from("type.example.com/pkg.Empty")),
                ("value", Value::from("")),
            ]),
        )])
    );
    Ok(())
}

#[test]
fn enums() -> Result<()> {
    let mut msg = DynamicMessage::new(message("WithEnum"));
    msg.set_field_by_name("t_enum", FieldValue::EnumNumber(3));
    msg.set_field_by_name(
        "t_letters",
        FieldValue::List(vec![FieldValue::EnumNumber(1), FieldValue::EnumNumber(0)]),
    );

    let value = encode(&msg)?;
    assert_eq!(value["t_enum"], Value::from("d"));
    assert_eq!(value["t_letters"], Value::list(vec![Value::from("B"), Value::from("A")])?);
    Ok(())
}

#[test]
fn undeclared_enum_number() -> Result<()> {
    // t_enum = 99
    let msg = DynamicMessage::decode(message("WithEnum"), &[0x08u8, 99][..])?;
    match from_message(&msg) {
        Err(Error::InvalidEnumValue {
            path,
            enum_name,
            value,
        }) => {
            assert_eq!(path.to_string(), ".t_enum");
            assert_eq!(enum_name, "testproto.WithEnum.Letter");
            assert_eq!(value, EnumValue::Number(99));
        }
        other => panic!("unexpected result {other:?}"),
    }

    // t_letters = [1, 99], packed
    let msg = DynamicMessage::decode(message("WithEnum"), &[0x12u8, 0x02, 0x01, 99][..])?;
    let err = from_message(&msg).expect_err("undeclared enum number");
    assert_eq!(
        err.to_string(),
        ".t_letters[1]: value 99 is not part of the enumeration testproto.WithEnum.Letter"
    );
    Ok(())
}

#[test]
fn maps_and_sets() -> Result<()> {
    let mut msg = DynamicMessage::new(message("WithRepeated"));
    msg.set_field_by_name(
        "t_map_string_bool",
        FieldValue::Map(HashMap::from([
            (MapKey::String("x".to_string()), FieldValue::Bool(true)),
            (MapKey::String("y".to_string()), FieldValue::Bool(false)),
        ])),
    );
    msg.set_field_by_name(
        "t_map_int64_string",
        FieldValue::Map(HashMap::from([
            (MapKey::I64(1), FieldValue::String("one".to_string())),
            (MapKey::I64(-2), FieldValue::String("minus two".to_string())),
        ])),
    );
    msg.set_field_by_name(
        "t_map_bool_nested",
        FieldValue::Map(HashMap::from([(
            MapKey::Bool(true),
            FieldValue::Message(nested("t", 1)),
        )])),
    );

    let value = encode(&msg)?;
    assert_eq!(
        value["t_map_string_bool"],
        Value::map(BTreeMap::from([
            ("x".into(), Value::from(true)),
            ("y".into(), Value::from(false)),
        ]))?
    );

    let entry = |key: Value, value: Value| Value::object([("key", key), ("value", value)]);
    assert_eq!(
        value["t_map_int64_string"],
        Value::set(vec![
            entry(Value::from(1), Value::from("one")),
            entry(Value::from(-2), Value::from("minus two")),
        ])?
    );
    assert_eq!(
        value["t_map_bool_nested"],
        Value::set(vec![entry(Value::from(true), nested_value("t", 1))])?
    );
    Ok(())
}

#[test]
fn lists() -> Result<()> {
    let mut msg = DynamicMessage::new(message("WithRepeated"));
    msg.set_field_by_name(
        "t_strings",
        FieldValue::List(vec![
            FieldValue::String("b".to_string()),
            FieldValue::String("a".to_string()),
            FieldValue::String("b".to_string()),
        ]),
    );
    msg.set_field_by_name(
        "t_nested",
        FieldValue::List(vec![FieldValue::Message(nested("x", 2))]),
    );
    msg.set_field_by_name("t_doubles", FieldValue::List(vec![FieldValue::F64(0.5)]));

    let value = encode(&msg)?;
    // Order and duplicates are kept.
    assert_eq!(
        value["t_strings"],
        Value::list(vec![Value::from("b"), Value::from("a"), Value::from("b")])?
    );
    assert_eq!(value["t_nested"], Value::list(vec![nested_value("x", 2)])?);
    assert_eq!(value["t_doubles"][0], number("0.5")?);
    Ok(())
}

#[test]
fn empty_collections_are_typed() -> Result<()> {
    let empty = encode(&DynamicMessage::new(message("WithRepeated")))?;
    for name in [
        "t_strings",
        "t_nested",
        "t_map_string_bool",
        "t_map_int64_string",
        "t_map_bool_nested",
        "t_doubles",
    ] {
        assert!(empty[name].is_empty()?, "{name}");
    }
    assert_eq!(empty["t_strings"], Value::empty_list(Type::String));
    assert_eq!(empty["t_map_string_bool"], Value::empty_map(Type::Bool));
    assert_eq!(
        empty["t_map_int64_string"],
        Value::empty_set(Type::object([
            ("key", Type::Number),
            ("value", Type::String)
        ]))
    );
    assert_ne!(empty["t_strings"], Value::empty_list(Type::Number));
    Ok(())
}

#[test]
fn proto2_group() -> Result<()> {
    let mut item = DynamicMessage::new(message2("Legacy.Item"));
    item.set_field_by_name("label", FieldValue::String("grouped".to_string()));

    let mut msg = DynamicMessage::new(message2("Legacy"));
    msg.set_field_by_name("item", FieldValue::Message(item));
    msg.set_field_by_name("t_int32", FieldValue::I32(0));

    assert_eq!(
        encode(&msg)?,
        Value::object([
            ("item", Value::object([("label", Value::from("grouped"))])),
            ("t_int32", Value::from(0)),
            ("t_packed", Value::empty_list(Type::Number)),
            ("t_required", Value::null(Type::Bool)),
            ("t_string", Value::null(Type::String)),
        ])
    );
    Ok(())
}

#[test]
fn reflect_message() -> Result<()> {
    let mut msg = DynamicMessage::new(message("WithOneOf"));
    msg.set_field_by_name("outside", FieldValue::String("hello".to_string()));
    assert_eq!(from_reflect_message(&msg)?, from_message(&msg)?);
    Ok(())
}
