// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use crate::path::Path;

/// The enumeration member that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumValue {
    /// A stored number with no declared name.
    Number(i32),
    /// A supplied name with no declared number.
    Name(String),
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Number(n) => write!(f, "value {n}"),
            EnumValue::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// Errors raised while deriving types or converting between messages and
/// values.
///
/// Every error carries the root-relative path at which the conversion
/// stopped. Conversions abort at the first error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The schema uses a protobuf construct with no dynamic value equivalent.
    #[error("{path}: no dynamic value equivalent for protobuf {kind}")]
    UnsupportedKind { path: Path, kind: String },

    #[error("{path}: {value} is not part of the enumeration {enum_name}")]
    InvalidEnumValue {
        path: Path,
        enum_name: String,
        value: EnumValue,
    },

    /// A number cannot be represented by the target numeric kind.
    #[error("{path}: {value} cannot be represented as {target}")]
    OutOfRange {
        path: Path,
        value: String,
        target: String,
    },

    /// Malformed Base64 payload for a `bytes` field.
    #[error("{path}: invalid base64 payload: {source}")]
    InvalidEncoding {
        path: Path,
        #[source]
        source: data_encoding::DecodeError,
    },

    #[error("{path}: expected {expected}, found {actual}")]
    TypeMismatch {
        path: Path,
        expected: String,
        actual: String,
    },

    #[error("{path}: missing attribute {name:?}")]
    MissingAttribute { path: Path, name: String },

    #[error("{path}: unexpected attribute {name:?}")]
    UnexpectedAttribute { path: Path, name: String },

    #[error("{path}: value must be known")]
    UnknownValue { path: Path },

    /// Protobuf collections cannot hold an absent element.
    #[error("{path}: null is not allowed here")]
    NullElement { path: Path },

    #[error("{path}: only one of {} may be set in oneof {oneof}", .fields.join(", "))]
    ConflictingOneof {
        path: Path,
        oneof: String,
        fields: Vec<String>,
    },

    #[error("{path}: duplicate map key {key}")]
    DuplicateMapKey { path: Path, key: String },
}

impl Error {
    pub fn path(&self) -> &Path {
        match self {
            Error::UnsupportedKind { path, .. }
            | Error::InvalidEnumValue { path, .. }
            | Error::OutOfRange { path, .. }
            | Error::InvalidEncoding { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::MissingAttribute { path, .. }
            | Error::UnexpectedAttribute { path, .. }
            | Error::UnknownValue { path }
            | Error::NullElement { path }
            | Error::ConflictingOneof { path, .. }
            | Error::DuplicateMapKey { path, .. } => path,
        }
    }
}
