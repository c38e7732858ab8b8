// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Rc;

/// The type of a dynamic [`Value`](crate::Value).
///
/// The type algebra is closed: three primitive types and four structural
/// types. Map keys are always strings. There is no union type, so data that
/// is polymorphic in protobuf (oneofs, `Any`) is described by listing every
/// alternative as an ordinary object attribute.
///
/// Types compare structurally. Two object types are equal when they have the
/// same attribute names and the attribute types are pairwise equal;
/// collection types are equal when their element types are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Bool,
    Number,
    String,
    Object(Rc<BTreeMap<Rc<str>, Type>>),
    List(Rc<Type>),
    Map(Rc<Type>),
    Set(Rc<Type>),
}

impl Type {
    pub fn object<K, I>(attrs: I) -> Type
    where
        K: Into<Rc<str>>,
        I: IntoIterator<Item = (K, Type)>,
    {
        Type::Object(Rc::new(
            attrs.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        ))
    }

    pub fn empty_object() -> Type {
        Type::Object(Rc::new(BTreeMap::new()))
    }

    pub fn list(element: Type) -> Type {
        Type::List(Rc::new(element))
    }

    pub fn map(element: Type) -> Type {
        Type::Map(Rc::new(element))
    }

    pub fn set(element: Type) -> Type {
        Type::Set(Rc::new(element))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Bool | Type::Number | Type::String)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Object(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Type::List(_) | Type::Map(_) | Type::Set(_))
    }

    /// Attribute types of an object type.
    pub fn attribute_types(&self) -> Option<&BTreeMap<Rc<str>, Type>> {
        match self {
            Type::Object(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn attribute_type(&self, name: &str) -> Option<&Type> {
        self.attribute_types()?.get(name)
    }

    /// Element type of a list, map or set type.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::List(e) | Type::Map(e) | Type::Set(e) => Some(e),
            _ => None,
        }
    }

    /// A short human-oriented description, used in error messages.
    pub fn friendly_name(&self) -> String {
        match self {
            Type::Bool => "bool".to_string(),
            Type::Number => "number".to_string(),
            Type::String => "string".to_string(),
            Type::Object(_) => "object".to_string(),
            Type::List(e) => format!("list of {}", e.friendly_name()),
            Type::Map(e) => format!("map of {}", e.friendly_name()),
            Type::Set(e) => format!("set of {}", e.friendly_name()),
        }
    }

    /// Parses the JSON type syntax produced by `Serialize`.
    pub fn from_json(json: &serde_json::Value) -> Result<Type> {
        use serde_json::Value as Json;
        match json {
            Json::String(s) => match s.as_str() {
                "bool" => Ok(Type::Bool),
                "number" => Ok(Type::Number),
                "string" => Ok(Type::String),
                other => bail!("unsupported primitive type {other:?}"),
            },
            Json::Array(parts) if parts.len() == 2 => match (&parts[0], &parts[1]) {
                (Json::String(k), element) if k == "list" => Ok(Type::list(Self::from_json(element)?)),
                (Json::String(k), element) if k == "map" => Ok(Type::map(Self::from_json(element)?)),
                (Json::String(k), element) if k == "set" => Ok(Type::set(Self::from_json(element)?)),
                (Json::String(k), Json::Object(attrs)) if k == "object" => {
                    let mut types = BTreeMap::new();
                    for (name, attr) in attrs {
                        types.insert(Rc::from(name.as_str()), Self::from_json(attr)?);
                    }
                    Ok(Type::Object(Rc::new(types)))
                }
                _ => Err(anyhow!("invalid type expression {json}")),
            },
            _ => Err(anyhow!("invalid type expression {json}")),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Type> {
        Self::from_json(&serde_json::from_str(json)?)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Type {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Type::Bool => serializer.serialize_str("bool"),
            Type::Number => serializer.serialize_str("number"),
            Type::String => serializer.serialize_str("string"),
            Type::Object(attrs) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("object")?;
                seq.serialize_element(attrs.as_ref())?;
                seq.end()
            }
            Type::List(e) | Type::Map(e) | Type::Set(e) => {
                let kind = match self {
                    Type::List(_) => "list",
                    Type::Map(_) => "map",
                    _ => "set",
                };
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(kind)?;
                seq.serialize_element(e.as_ref())?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v: serde_json::Value = Deserialize::deserialize(deserializer)?;
        Type::from_json(&v).map_err(|e| serde::de::Error::custom(format!("{e}")))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Number => f.write_str("number"),
            Type::String => f.write_str("string"),
            Type::List(e) => write!(f, "list({e})"),
            Type::Map(e) => write!(f, "map({e})"),
            Type::Set(e) => write!(f, "set({e})"),
            Type::Object(attrs) => {
                f.write_str("object({")?;
                for (i, (name, ty)) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("})")
            }
        }
    }
}
