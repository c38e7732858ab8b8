// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use data_encoding::BASE64;
use prost::bytes::Bytes;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage,
    Value as FieldValue,
};
use tracing::{debug, trace};

use crate::error::{EnumValue, Error};
use crate::implied_type::{kind_name, map_entry_fields};
use crate::number::Number;
use crate::path::Cursor;
use crate::value::Value;
use crate::Rc;

/// Populates a message from a [`Value`].
///
/// The value must be of the type that [`implied_type`](crate::implied_type)
/// returns for the message's descriptor; this is the inverse of
/// [`from_message`](crate::from_message). Every field of the message is
/// written:
///
/// - a null attribute clears the field, which leaves fields without presence
///   tracking at the zero value of their kind;
/// - numbers must fit the field's numeric kind exactly, and integer kinds
///   reject fractions;
/// - `bytes` fields expect standard Base64 text and enum fields expect the
///   name of a declared member.
///
/// Setting one member of a oneof implicitly clears the others, so at most one
/// member of each oneof may be non-null. A value that sets more than one is
/// rejected with [`Error::ConflictingOneof`] rather than picking a winner.
///
/// The message is only modified if the whole conversion succeeds.
pub fn to_message(value: &Value, msg: &mut DynamicMessage) -> Result<(), Error> {
    debug!(message_type = msg.descriptor().full_name(), "populating message from value");
    let mut staged = msg.clone();
    decode_message(value, &mut staged, &Cursor::ROOT)
        .inspect_err(|err| debug!(%err, "value conversion failed"))?;
    *msg = staged;
    Ok(())
}

/// Builds a new message of the given type from a [`Value`].
pub fn new_message(value: &Value, desc: MessageDescriptor) -> Result<DynamicMessage, Error> {
    debug!(message_type = desc.full_name(), "building message from value");
    let mut msg = DynamicMessage::new(desc);
    decode_message(value, &mut msg, &Cursor::ROOT)
        .inspect_err(|err| debug!(%err, "value conversion failed"))?;
    Ok(msg)
}

fn decode_message(value: &Value, msg: &mut DynamicMessage, path: &Cursor<'_>) -> Result<(), Error> {
    let desc = msg.descriptor();
    let attrs = match value {
        Value::Object(attrs) => attrs,
        Value::Unknown(_) => return Err(unknown(path)),
        other => return Err(mismatch("object", other, path)),
    };

    if let Some(name) = attrs.keys().find(|name| desc.get_field_by_name(name).is_none()) {
        return Err(Error::UnexpectedAttribute {
            path: path.to_path(),
            name: name.to_string(),
        });
    }
    check_oneofs(&desc, attrs, path)?;

    for field in desc.fields() {
        let path = path.attr(field.name());
        trace!(%path, "writing field");

        let Some(attr) = attrs.get(field.name()) else {
            return Err(Error::MissingAttribute {
                path: path.to_path(),
                name: field.name().to_string(),
            });
        };
        match attr {
            Value::Unknown(_) => return Err(unknown(&path)),
            // With presence tracking this unsets the field; without it the
            // field goes back to the zero value of its kind.
            Value::Null(_) => msg.clear_field(&field),
            _ => {
                let raw = field_value(attr, &field, &path)?;
                msg.try_set_field(&field, raw).map_err(|err| Error::TypeMismatch {
                    path: path.to_path(),
                    expected: kind_name(&field.kind()),
                    actual: err.to_string(),
                })?;
            }
        }
    }

    Ok(())
}

// The value's shape cannot express "at most one of", so it is checked here
// before anything is written.
fn check_oneofs(
    desc: &MessageDescriptor,
    attrs: &BTreeMap<Rc<str>, Value>,
    path: &Cursor<'_>,
) -> Result<(), Error> {
    for oneof in desc.oneofs() {
        let set: Vec<String> = oneof
            .fields()
            .filter(|f| attrs.get(f.name()).is_some_and(|v| !v.is_null()))
            .map(|f| f.name().to_string())
            .collect();
        if set.len() > 1 {
            return Err(Error::ConflictingOneof {
                path: path.to_path(),
                oneof: oneof.name().to_string(),
                fields: set,
            });
        }
    }
    Ok(())
}

fn field_value(value: &Value, field: &FieldDescriptor, path: &Cursor<'_>) -> Result<FieldValue, Error> {
    if field.is_map() {
        let (key_field, value_field) = map_entry_fields(field, path)?;
        let mut raw_entries = HashMap::new();

        if matches!(key_field.kind(), Kind::String) {
            let Value::Map { entries, .. } = value else {
                return Err(mismatch("map", value, path));
            };
            for (key, item) in entries.iter() {
                let path = path.key(key);
                let raw = field_value(element(item, &path)?, &value_field, &path)?;
                raw_entries.insert(MapKey::String(key.to_string()), raw);
            }
            return Ok(FieldValue::Map(raw_entries));
        }

        let Value::Set { items, .. } = value else {
            return Err(mismatch("set", value, path));
        };
        for item in items.iter() {
            let path = path.element();
            let (key, item) = map_entry(element(item, &path)?, &path)?;

            let key_path = path.attr("key");
            let raw_key = map_key(element(key, &key_path)?, &key_field, &key_path)?;
            let value_path = path.attr("value");
            let raw = field_value(element(item, &value_path)?, &value_field, &value_path)?;

            match raw_entries.entry(raw_key) {
                Entry::Occupied(_) => {
                    return Err(Error::DuplicateMapKey {
                        path: path.to_path(),
                        key: key.to_string(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(raw);
                }
            }
        }
        return Ok(FieldValue::Map(raw_entries));
    }

    if field.is_list() {
        let Value::List { items, .. } = value else {
            return Err(mismatch("list", value, path));
        };
        let raw_items = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = path.index(i);
                kind_value(element(item, &path)?, field, &path)
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(FieldValue::List(raw_items));
    }

    kind_value(value, field, path)
}

fn kind_value(value: &Value, field: &FieldDescriptor, path: &Cursor<'_>) -> Result<FieldValue, Error> {
    match field.kind() {
        Kind::Bool => match value {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            other => Err(mismatch("bool", other, path)),
        },
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            numeric(value, "int32", Number::as_i32, path).map(FieldValue::I32)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            numeric(value, "int64", Number::as_i64, path).map(FieldValue::I64)
        }
        Kind::Uint32 | Kind::Fixed32 => {
            numeric(value, "uint32", Number::as_u32, path).map(FieldValue::U32)
        }
        Kind::Uint64 | Kind::Fixed64 => {
            numeric(value, "uint64", Number::as_u64, path).map(FieldValue::U64)
        }
        Kind::Float => numeric(value, "float", Number::as_f32, path).map(FieldValue::F32),
        Kind::Double => numeric(value, "double", Number::as_f64, path).map(FieldValue::F64),
        Kind::String => Ok(FieldValue::String(string(value, path)?.to_string())),
        Kind::Bytes => BASE64
            .decode(string(value, path)?.as_bytes())
            .map(|bytes| FieldValue::Bytes(Bytes::from(bytes)))
            .map_err(|source| Error::InvalidEncoding {
                path: path.to_path(),
                source,
            }),
        Kind::Enum(desc) => {
            let name = string(value, path)?;
            match desc.get_value_by_name(name) {
                Some(member) => Ok(FieldValue::EnumNumber(member.number())),
                None => Err(Error::InvalidEnumValue {
                    path: path.to_path(),
                    enum_name: desc.full_name().to_string(),
                    value: EnumValue::Name(name.to_string()),
                }),
            }
        }
        Kind::Message(desc) => {
            let mut sub = DynamicMessage::new(desc);
            decode_message(value, &mut sub, path)?;
            Ok(FieldValue::Message(sub))
        }
    }
}

/// Converts a number with `convert`, which returns `None` when the number
/// does not fit the target kind.
fn numeric<T>(
    value: &Value,
    target: &str,
    convert: impl Fn(&Number) -> Option<T>,
    path: &Cursor<'_>,
) -> Result<T, Error> {
    let Value::Number(n) = value else {
        return Err(mismatch("number", value, path));
    };
    convert(n).ok_or_else(|| Error::OutOfRange {
        path: path.to_path(),
        value: n.to_string(),
        target: target.to_string(),
    })
}

fn string<'v>(value: &'v Value, path: &Cursor<'_>) -> Result<&'v str, Error> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(mismatch("string", other, path)),
    }
}

fn map_key(value: &Value, key_field: &FieldDescriptor, path: &Cursor<'_>) -> Result<MapKey, Error> {
    match kind_value(value, key_field, path)? {
        FieldValue::Bool(b) => Ok(MapKey::Bool(b)),
        FieldValue::I32(n) => Ok(MapKey::I32(n)),
        FieldValue::I64(n) => Ok(MapKey::I64(n)),
        FieldValue::U32(n) => Ok(MapKey::U32(n)),
        FieldValue::U64(n) => Ok(MapKey::U64(n)),
        FieldValue::String(s) => Ok(MapKey::String(s)),
        _ => Err(Error::UnsupportedKind {
            path: path.to_path(),
            kind: format!("map key of kind {}", kind_name(&key_field.kind())),
        }),
    }
}

/// The `key` and `value` attributes of an element of a set-shaped map.
fn map_entry<'v>(value: &'v Value, path: &Cursor<'_>) -> Result<(&'v Value, &'v Value), Error> {
    let Value::Object(attrs) = value else {
        return Err(mismatch("object", value, path));
    };
    if let Some(name) = attrs.keys().find(|name| {
        let name: &str = name;
        name != "key" && name != "value"
    }) {
        return Err(Error::UnexpectedAttribute {
            path: path.to_path(),
            name: name.to_string(),
        });
    }
    let attr = |name: &str| {
        attrs.get(name).ok_or_else(|| Error::MissingAttribute {
            path: path.to_path(),
            name: name.to_string(),
        })
    };
    Ok((attr("key")?, attr("value")?))
}

/// Collection elements must be present and known.
fn element<'v>(value: &'v Value, path: &Cursor<'_>) -> Result<&'v Value, Error> {
    match value {
        Value::Null(_) => Err(Error::NullElement {
            path: path.to_path(),
        }),
        Value::Unknown(_) => Err(unknown(path)),
        _ => Ok(value),
    }
}

fn unknown(path: &Cursor<'_>) -> Error {
    Error::UnknownValue {
        path: path.to_path(),
    }
}

fn mismatch(expected: &str, value: &Value, path: &Cursor<'_>) -> Error {
    Error::TypeMismatch {
        path: path.to_path(),
        expected: expected.to_string(),
        actual: match value {
            Value::Null(_) => "null".to_string(),
            Value::Unknown(_) => "unknown value".to_string(),
            other => other.ty().friendly_name(),
        },
    }
}
