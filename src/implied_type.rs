// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use tracing::{debug, trace};

use crate::error::Error;
use crate::path::Cursor;
use crate::types::Type;
use crate::Rc;

/// Returns the [`Type`] corresponding to the given message descriptor.
///
/// The result is always an object type with exactly one attribute per field
/// of the message, named after the field:
///
/// - `bool` becomes `bool`; every numeric kind becomes `number`;
///   `string`, `bytes` and enums become `string`.
/// - message and group fields become the object type of the nested message.
/// - `repeated` fields become lists, except map fields: a map with string
///   keys becomes a `map`, and any other map becomes a `set` of
///   `{key, value}` objects since maps can only be keyed by strings.
///
/// The conversion is lossy. Members of a oneof appear as ordinary attributes,
/// of which only one is non-null by convention, and all numeric kinds are
/// generalized to `number`. Adding a field to a message changes the derived
/// object type, so protobuf's compatibility rules do not carry over to type
/// equality.
///
/// A message that contains itself, directly or through other messages, has no
/// finite type and is reported as [`Error::UnsupportedKind`].
pub fn implied_type(desc: &MessageDescriptor) -> Result<Type, Error> {
    debug!(message_type = desc.full_name(), "deriving implied type");
    ImpliedTypes::default()
        .message_type(desc, &Cursor::ROOT)
        .inspect_err(|err| debug!(%err, "type derivation failed"))
}

/// Type of a single field, taking cardinality and map entries into account.
pub(crate) fn field_type(field: &FieldDescriptor, path: &Cursor<'_>) -> Result<Type, Error> {
    ImpliedTypes::default().field_type(field, path)
}

/// Type of a single element of a field, ignoring its cardinality.
pub(crate) fn kind_type(field: &FieldDescriptor, path: &Cursor<'_>) -> Result<Type, Error> {
    ImpliedTypes::default().kind_type(field, path)
}

pub(crate) fn map_entry_type(key: Type, value: Type) -> Type {
    Type::object([("key", key), ("value", value)])
}

/// Key and value fields of a map field's entry message.
pub(crate) fn map_entry_fields(
    field: &FieldDescriptor,
    path: &Cursor<'_>,
) -> Result<(FieldDescriptor, FieldDescriptor), Error> {
    let Kind::Message(entry) = field.kind() else {
        return Err(unsupported(path, format!("map field of kind {}", kind_name(&field.kind()))));
    };
    let (Some(key), Some(value)) = (entry.get_field(1), entry.get_field(2)) else {
        return Err(unsupported(path, format!("map entry {} without key and value", entry.full_name())));
    };

    match key.kind() {
        Kind::Bool
        | Kind::String
        | Kind::Int32
        | Kind::Int64
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Sint32
        | Kind::Sint64
        | Kind::Fixed32
        | Kind::Fixed64
        | Kind::Sfixed32
        | Kind::Sfixed64 => Ok((key, value)),
        other => Err(unsupported(path, format!("map key of kind {}", kind_name(&other)))),
    }
}

/// Protobuf's own spelling of a kind, with the type name for enums and
/// messages.
pub(crate) fn kind_name(kind: &Kind) -> String {
    match kind {
        Kind::Double => "double".to_string(),
        Kind::Float => "float".to_string(),
        Kind::Int32 => "int32".to_string(),
        Kind::Int64 => "int64".to_string(),
        Kind::Uint32 => "uint32".to_string(),
        Kind::Uint64 => "uint64".to_string(),
        Kind::Sint32 => "sint32".to_string(),
        Kind::Sint64 => "sint64".to_string(),
        Kind::Fixed32 => "fixed32".to_string(),
        Kind::Fixed64 => "fixed64".to_string(),
        Kind::Sfixed32 => "sfixed32".to_string(),
        Kind::Sfixed64 => "sfixed64".to_string(),
        Kind::Bool => "bool".to_string(),
        Kind::String => "string".to_string(),
        Kind::Bytes => "bytes".to_string(),
        Kind::Message(desc) => format!("message {}", desc.full_name()),
        Kind::Enum(desc) => format!("enum {}", desc.full_name()),
    }
}

fn unsupported(path: &Cursor<'_>, kind: String) -> Error {
    Error::UnsupportedKind {
        path: path.to_path(),
        kind,
    }
}

#[derive(Default)]
struct ImpliedTypes {
    // Messages whose type is being derived further up the current walk.
    in_progress: Vec<String>,
}

impl ImpliedTypes {
    fn message_type(&mut self, desc: &MessageDescriptor, path: &Cursor<'_>) -> Result<Type, Error> {
        let full_name = desc.full_name();
        if self.in_progress.iter().any(|name| name == full_name) {
            return Err(unsupported(path, format!("recursive message {full_name}")));
        }

        self.in_progress.push(full_name.to_string());
        let mut attrs = BTreeMap::new();
        for field in desc.fields() {
            let path = path.attr(field.name());
            trace!(%path, "deriving field type");
            let ty = self.field_type(&field, &path)?;
            attrs.insert(Rc::from(field.name()), ty);
        }
        self.in_progress.pop();

        Ok(Type::Object(Rc::new(attrs)))
    }

    fn field_type(&mut self, field: &FieldDescriptor, path: &Cursor<'_>) -> Result<Type, Error> {
        if field.is_map() {
            let (key_field, value_field) = map_entry_fields(field, path)?;
            let element_path = path.element();
            if matches!(key_field.kind(), Kind::String) {
                let value_ty = self.field_type(&value_field, &element_path)?;
                return Ok(Type::map(value_ty));
            }
            let key_ty = self.field_type(&key_field, &element_path)?;
            let value_ty = self.field_type(&value_field, &element_path)?;
            return Ok(Type::set(map_entry_type(key_ty, value_ty)));
        }

        // Determine the base type, ignoring cardinality for now.
        let ty = self.kind_type(field, path)?;
        if field.is_list() {
            Ok(Type::list(ty))
        } else {
            Ok(ty)
        }
    }

    fn kind_type(&mut self, field: &FieldDescriptor, path: &Cursor<'_>) -> Result<Type, Error> {
        Ok(match field.kind() {
            Kind::Bool => Type::Bool,
            Kind::Double
            | Kind::Float
            | Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Fixed32
            | Kind::Fixed64
            | Kind::Sfixed32
            | Kind::Sfixed64 => Type::Number,
            Kind::String | Kind::Bytes | Kind::Enum(_) => Type::String,
            // Groups are messages as far as reflection is concerned.
            Kind::Message(desc) => return self.message_type(&desc, path),
        })
    }
}
