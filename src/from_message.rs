// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, BTreeSet};

use data_encoding::BASE64;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, ReflectMessage, Value as FieldValue,
};
use tracing::{debug, trace};

use crate::error::{EnumValue, Error};
use crate::implied_type::{field_type, kind_name, kind_type, map_entry_fields, map_entry_type};
use crate::number::Number;
use crate::path::Cursor;
use crate::value::Value;
use crate::Rc;

/// Converts a message into an equivalent [`Value`], which is always an object.
///
/// The result conforms to the type that [`implied_type`](crate::implied_type)
/// returns for the message's descriptor:
///
/// - fields that track presence and are not set become typed nulls, so the
///   unselected members of a oneof are null;
/// - fields without presence tracking always carry a value, which is the
///   zero value of their kind when they were never set;
/// - `bytes` become the standard Base64 encoding of their content;
/// - enums become the name of the declared member. A stored number with no
///   declared member is an error;
/// - `float` and `double` fields become their exact decimal value. NaN and
///   infinities have none and fail with [`Error::OutOfRange`].
///
/// `google.protobuf.Any` receives no special treatment: it becomes an object
/// with a `type_url` string and a Base64 `value`, and the payload is not
/// decoded.
pub fn from_message(msg: &DynamicMessage) -> Result<Value, Error> {
    debug!(message_type = msg.descriptor().full_name(), "converting message to value");
    message_value(msg, &Cursor::ROOT).inspect_err(|err| debug!(%err, "message conversion failed"))
}

/// Like [`from_message`], for any message type that supports reflection,
/// including generated ones.
pub fn from_reflect_message<M: ReflectMessage>(msg: &M) -> Result<Value, Error> {
    from_message(&msg.transcode_to_dynamic())
}

fn message_value(msg: &DynamicMessage, path: &Cursor<'_>) -> Result<Value, Error> {
    let desc = msg.descriptor();
    let mut attrs = BTreeMap::new();

    for field in desc.fields() {
        let path = path.attr(field.name());
        trace!(%path, "converting field");

        let value = if field.supports_presence() && !msg.has_field(&field) {
            // The type must still be derived so the null is correctly typed.
            Value::Null(field_type(&field, &path)?)
        } else {
            field_value(&msg.get_field(&field), &field, &path)?
        };
        attrs.insert(Rc::from(field.name()), value);
    }

    Ok(Value::Object(Rc::new(attrs)))
}

// Mirrors the branches of `ImpliedTypes::field_type`, since the result must
// always be of the type derived for the field.
fn field_value(raw: &FieldValue, field: &FieldDescriptor, path: &Cursor<'_>) -> Result<Value, Error> {
    if field.is_map() {
        let (key_field, value_field) = map_entry_fields(field, path)?;
        let Some(raw_entries) = raw.as_map() else {
            return Err(unexpected(raw, "map", path));
        };

        if matches!(key_field.kind(), Kind::String) {
            let mut entries = BTreeMap::new();
            for (key, raw_value) in raw_entries {
                let MapKey::String(key) = key else {
                    return Err(unexpected(raw, "map with string keys", path));
                };
                let value = field_value(raw_value, &value_field, &path.key(key))?;
                entries.insert(Rc::from(key.as_str()), value);
            }
            let element = match entries.values().next() {
                Some(v) => v.ty(),
                None => field_type(&value_field, &path.element())?,
            };
            return Ok(Value::map_of(element, entries));
        }

        let mut items = BTreeSet::new();
        for (key, raw_value) in raw_entries {
            // A set element has no index of its own until it is complete.
            let path = path.element();
            let key = field_value(&map_key_value(key), &key_field, &path)?;
            let value = field_value(raw_value, &value_field, &path)?;
            items.insert(Value::object([("key", key), ("value", value)]));
        }
        let element = match items.first() {
            Some(v) => v.ty(),
            None => {
                let path = path.element();
                map_entry_type(
                    field_type(&key_field, &path)?,
                    field_type(&value_field, &path)?,
                )
            }
        };
        return Ok(Value::set_of(element, items));
    }

    if field.is_list() {
        let Some(raw_items) = raw.as_list() else {
            return Err(unexpected(raw, "list", path));
        };
        let items = raw_items
            .iter()
            .enumerate()
            .map(|(i, item)| kind_value(item, field, &path.index(i)))
            .collect::<Result<Vec<_>, _>>()?;
        let element = match items.first() {
            Some(v) => v.ty(),
            None => kind_type(field, &path.element())?,
        };
        return Ok(Value::list_of(element, items));
    }

    kind_value(raw, field, path)
}

fn kind_value(raw: &FieldValue, field: &FieldDescriptor, path: &Cursor<'_>) -> Result<Value, Error> {
    match (field.kind(), raw) {
        (Kind::Bool, FieldValue::Bool(b)) => Ok(Value::Bool(*b)),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, FieldValue::I32(n)) => Ok(Value::from(*n)),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, FieldValue::I64(n)) => Ok(Value::from(*n)),
        (Kind::Uint32 | Kind::Fixed32, FieldValue::U32(n)) => Ok(Value::from(*n)),
        (Kind::Uint64 | Kind::Fixed64, FieldValue::U64(n)) => Ok(Value::from(*n)),
        (Kind::Float, FieldValue::F32(f)) => float_value(Number::from_f32(*f), f, "float", path),
        (Kind::Double, FieldValue::F64(f)) => float_value(Number::from_f64(*f), f, "double", path),
        (Kind::String, FieldValue::String(s)) => Ok(Value::from(s.as_str())),
        // Strings are sequences of characters rather than bytes, so bytes are
        // carried as Base64 to keep them lossless.
        (Kind::Bytes, FieldValue::Bytes(b)) => Ok(Value::from(BASE64.encode(b))),
        (Kind::Enum(desc), FieldValue::EnumNumber(n)) => match desc.get_value(*n) {
            Some(member) => Ok(Value::from(member.name())),
            None => Err(Error::InvalidEnumValue {
                path: path.to_path(),
                enum_name: desc.full_name().to_string(),
                value: EnumValue::Number(*n),
            }),
        },
        (Kind::Message(_), FieldValue::Message(sub)) => message_value(sub, path),
        (kind, raw) => Err(unexpected(raw, &kind_name(&kind), path)),
    }
}

fn float_value(
    number: Option<Number>,
    raw: &dyn std::fmt::Display,
    target: &str,
    path: &Cursor<'_>,
) -> Result<Value, Error> {
    number.map(Value::Number).ok_or_else(|| Error::OutOfRange {
        path: path.to_path(),
        value: format!("{target} {raw}"),
        target: "number".to_string(),
    })
}

fn map_key_value(key: &MapKey) -> FieldValue {
    match key {
        MapKey::Bool(b) => FieldValue::Bool(*b),
        MapKey::I32(n) => FieldValue::I32(*n),
        MapKey::I64(n) => FieldValue::I64(*n),
        MapKey::U32(n) => FieldValue::U32(*n),
        MapKey::U64(n) => FieldValue::U64(*n),
        MapKey::String(s) => FieldValue::String(s.clone()),
    }
}

// The reflection runtime keeps field values consistent with their
// descriptors, so this only fires on a runtime bug.
fn unexpected(raw: &FieldValue, expected: &str, path: &Cursor<'_>) -> Error {
    Error::TypeMismatch {
        path: path.to_path(),
        expected: expected.to_string(),
        actual: format!("{raw:?}"),
    }
}
