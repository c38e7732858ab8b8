// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::testproto::{message, message2};

use anyhow::Result;
use protoval::{implied_type, Error, Type};

fn nested_type() -> Type {
    Type::object([("count", Type::Number), ("name", Type::String)])
}

#[test]
fn scalar_kinds() -> Result<()> {
    let ty = implied_type(&message("Assorted"))?;

    let mut expected = vec![
        ("t_bool", Type::Bool),
        ("t_string", Type::String),
        ("t_bytes", Type::String),
        ("t_nested", nested_type()),
    ];
    for name in [
        "t_int32",
        "t_int64",
        "t_uint32",
        "t_uint64",
        "t_sint32",
        "t_sint64",
        "t_fixed32",
        "t_fixed64",
        "t_sfixed32",
        "t_sfixed64",
        "t_float",
        "t_double",
    ] {
        expected.push((name, Type::Number));
    }

    assert_eq!(ty, Type::object(expected));
    Ok(())
}

#[test]
fn one_attribute_per_field() -> Result<()> {
    for name in ["Assorted", "WithOptional", "WithOneOf", "WithRepeated", "WithEnum"] {
        let desc = message(name);
        let ty = implied_type(&desc)?;
        let attrs = ty.attribute_types().expect("object type");
        assert_eq!(attrs.len(), desc.fields().len(), "{name}");
        for field in desc.fields() {
            assert!(attrs.contains_key(field.name()), "{name}.{}", field.name());
        }
    }
    Ok(())
}

#[test]
fn empty_message() -> Result<()> {
    assert_eq!(implied_type(&message("Empty"))?, Type::empty_object());
    assert_eq!(
        implied_type(&message("Simple"))?,
        Type::object([("foo", Type::empty_object())])
    );
    Ok(())
}

#[test]
fn oneof_members_are_plain_attributes() -> Result<()> {
    assert_eq!(
        implied_type(&message("WithOneOf"))?,
        Type::object([
            ("a", Type::String),
            ("b", Type::String),
            ("outside", Type::String),
        ])
    );
    assert_eq!(
        implied_type(&message("WithOptional"))?,
        Type::object([
            ("t_int64", Type::Number),
            ("t_plain", Type::String),
            ("t_string", Type::String),
        ])
    );
    Ok(())
}

#[test]
fn repeated_and_maps() -> Result<()> {
    let entry = |key: Type, value: Type| Type::object([("key", key), ("value", value)]);
    assert_eq!(
        implied_type(&message("WithRepeated"))?,
        Type::object([
            ("t_strings", Type::list(Type::String)),
            ("t_nested", Type::list(nested_type())),
            ("t_map_string_bool", Type::map(Type::Bool)),
            (
                "t_map_int64_string",
                Type::set(entry(Type::Number, Type::String)),
            ),
            (
                "t_map_bool_nested",
                Type::set(entry(Type::Bool, nested_type())),
            ),
            ("t_doubles", Type::list(Type::Number)),
        ])
    );
    Ok(())
}

#[test]
fn enums_and_any() -> Result<()> {
    assert_eq!(
        implied_type(&message("WithEnum"))?,
        Type::object([
            ("t_enum", Type::String),
            ("t_letters", Type::list(Type::String)),
        ])
    );
    assert_eq!(
        implied_type(&message("WithAny"))?,
        Type::object([(
            "t_any",
            Type::object([("type_url", Type::String), ("value", Type::String)]),
        )])
    );
    Ok(())
}

#[test]
fn proto2_with_group() -> Result<()> {
    assert_eq!(
        implied_type(&message2("Legacy"))?,
        Type::object([
            ("item", Type::object([("label", Type::String)])),
            ("t_int32", Type::Number),
            ("t_packed", Type::list(Type::Number)),
            ("t_required", Type::Bool),
            ("t_string", Type::String),
        ])
    );
    Ok(())
}

#[test]
fn idempotent() -> Result<()> {
    let desc = message("WithRepeated");
    assert_eq!(implied_type(&desc)?, implied_type(&desc)?);
    Ok(())
}

#[test]
fn recursive_message_is_unsupported() {
    match implied_type(&message("Recursive")) {
        Err(Error::UnsupportedKind { path, kind }) => {
            assert_eq!(path.to_string(), ".next");
            assert_eq!(kind, "recursive message testproto.Recursive");
        }
        other => panic!("unexpected result {other:?}"),
    }

    let err = implied_type(&message("Indirect")).expect_err("recursive");
    assert_eq!(err.path().to_string(), ".recursive.next");
    assert_eq!(
        err.to_string(),
        ".recursive.next: no dynamic value equivalent for protobuf recursive message testproto.Recursive"
    );
}
