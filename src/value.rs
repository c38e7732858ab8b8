// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;
use crate::types::Type;
use crate::Rc;

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::ops;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

/// A dynamic value.
///
/// Every value knows its exact [`Type`], including nulls and empty
/// collections: an empty list of strings is a different value from an empty
/// list of numbers, and `null` of `string` differs from `null` of `number`.
///
/// Structural nodes are shared, so cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    /// Absence of a value of the given type.
    Null(Type),

    /// A value of the given type that is not yet known.
    Unknown(Type),

    Bool(bool),
    Number(Number),
    String(Rc<str>),

    Object(Rc<BTreeMap<Rc<str>, Value>>),

    List {
        element: Type,
        items: Rc<Vec<Value>>,
    },

    Map {
        element: Type,
        entries: Rc<BTreeMap<Rc<str>, Value>>,
    },

    Set {
        element: Type,
        items: Rc<BTreeSet<Value>>,
    },
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null(_) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::Number(n) => n.serialize(serializer),
            Value::Object(fields) | Value::Map { entries: fields, .. } => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    map.serialize_entry(k.as_ref(), v)?;
                }
                map.end()
            }
            Value::List { items, .. } => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for v in items.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }

            // display set as an array
            Value::Set { items, .. } => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for v in items.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }

            // display unknown as a special string
            Value::Unknown(_) => serializer.serialize_str("<unknown>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_e) => Err(fmt::Error),
        }
    }
}

impl Value {
    pub fn null(ty: Type) -> Value {
        Value::Null(ty)
    }

    pub fn unknown(ty: Type) -> Value {
        Value::Unknown(ty)
    }

    pub fn object<K, I>(attrs: I) -> Value
    where
        K: Into<Rc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Rc::new(
            attrs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn empty_object() -> Value {
        Value::Object(Rc::new(BTreeMap::new()))
    }

    /// A list whose element type is taken from its items, which must all have
    /// the same type. Use [`Value::empty_list`] when there are no items.
    pub fn list(items: Vec<Value>) -> Result<Value> {
        let element = homogeneous_type(items.iter(), "list")?;
        Ok(Value::list_of(element, items))
    }

    /// A list with an explicit element type. Every item must be of that type.
    pub fn list_of(element: Type, items: Vec<Value>) -> Value {
        debug_assert!(items.iter().all(|v| v.ty() == element));
        Value::List {
            element,
            items: Rc::new(items),
        }
    }

    pub fn empty_list(element: Type) -> Value {
        Value::list_of(element, vec![])
    }

    pub fn map(entries: BTreeMap<Rc<str>, Value>) -> Result<Value> {
        let element = homogeneous_type(entries.values(), "map")?;
        Ok(Value::map_of(element, entries))
    }

    pub fn map_of(element: Type, entries: BTreeMap<Rc<str>, Value>) -> Value {
        debug_assert!(entries.values().all(|v| v.ty() == element));
        Value::Map {
            element,
            entries: Rc::new(entries),
        }
    }

    pub fn empty_map(element: Type) -> Value {
        Value::map_of(element, BTreeMap::new())
    }

    pub fn set(items: Vec<Value>) -> Result<Value> {
        let element = homogeneous_type(items.iter(), "set")?;
        Ok(Value::set_of(element, items.into_iter().collect()))
    }

    pub fn set_of(element: Type, items: BTreeSet<Value>) -> Value {
        debug_assert!(items.iter().all(|v| v.ty() == element));
        Value::Set {
            element,
            items: Rc::new(items),
        }
    }

    pub fn empty_set(element: Type) -> Value {
        Value::set_of(element, BTreeSet::new())
    }

    /// The exact type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Value::Null(ty) | Value::Unknown(ty) => ty.clone(),
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Object(attrs) => Type::object(attrs.iter().map(|(k, v)| (k.clone(), v.ty()))),
            Value::List { element, .. } => Type::list(element.clone()),
            Value::Map { element, .. } => Type::map(element.clone()),
            Value::Set { element, .. } => Type::set(element.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    /// True unless this value itself is unknown. Nested values are not
    /// inspected.
    pub fn is_known(&self) -> bool {
        !self.is_unknown()
    }

    /// Number of attributes, entries or items.
    pub fn len(&self) -> Result<usize> {
        match self {
            Value::Object(attrs) => Ok(attrs.len()),
            Value::List { items, .. } => Ok(items.len()),
            Value::Map { entries, .. } => Ok(entries.len()),
            Value::Set { items, .. } => Ok(items.len()),
            _ => Err(anyhow!("not a collection")),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(anyhow!("not a bool")),
        }
    }

    pub fn as_number(&self) -> Result<&Number> {
        match self {
            Value::Number(n) => Ok(n),
            _ => Err(anyhow!("not a number")),
        }
    }

    pub fn as_string(&self) -> Result<&Rc<str>> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(anyhow!("not a string")),
        }
    }

    pub fn as_object(&self) -> Result<&BTreeMap<Rc<str>, Value>> {
        match self {
            Value::Object(m) => Ok(m),
            _ => Err(anyhow!("not an object")),
        }
    }

    pub fn as_list(&self) -> Result<&Vec<Value>> {
        match self {
            Value::List { items, .. } => Ok(items),
            _ => Err(anyhow!("not a list")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<Rc<str>, Value>> {
        match self {
            Value::Map { entries, .. } => Ok(entries),
            _ => Err(anyhow!("not a map")),
        }
    }

    pub fn as_set(&self) -> Result<&BTreeSet<Value>> {
        match self {
            Value::Set { items, .. } => Ok(items),
            _ => Err(anyhow!("not a set")),
        }
    }

    pub fn get_attr(&self, name: &str) -> Result<&Value> {
        self.as_object()?
            .get(name)
            .ok_or_else(|| anyhow!("object has no attribute {name:?}"))
    }
}

fn homogeneous_type<'a>(mut items: impl Iterator<Item = &'a Value>, what: &str) -> Result<Type> {
    let Some(first) = items.next() else {
        bail!("cannot infer the element type of an empty {what}");
    };
    let element = first.ty();
    for item in items {
        let ty = item.ty();
        if ty != element {
            bail!("inconsistent {what} element types: {element} and {ty}");
        }
    }
    Ok(element)
}

impl Value {
    /// Parses JSON as a value of the given type.
    ///
    /// JSON `null` becomes a typed null, arrays become lists or sets and JSON
    /// objects become maps or objects. Object attributes absent from the JSON
    /// become typed nulls. Numbers are read from their literal text, so
    /// decimal fractions are exact.
    pub fn from_json(json: &serde_json::Value, ty: &Type) -> Result<Value> {
        use serde_json::Value as Json;
        Ok(match (ty, json) {
            (_, Json::Null) => Value::Null(ty.clone()),
            (Type::Bool, Json::Bool(b)) => Value::Bool(*b),
            (Type::Number, Json::Number(n)) => Value::Number(
                Number::from_str(&n.to_string()).map_err(|e| anyhow!("{e}: {n}"))?,
            ),
            (Type::String, Json::String(s)) => Value::from(s.as_str()),
            (Type::List(element), Json::Array(items)) => {
                let items = items
                    .iter()
                    .map(|v| Self::from_json(v, element))
                    .collect::<Result<Vec<_>>>()?;
                Value::list_of(element.as_ref().clone(), items)
            }
            (Type::Set(element), Json::Array(items)) => {
                let items = items
                    .iter()
                    .map(|v| Self::from_json(v, element))
                    .collect::<Result<BTreeSet<_>>>()?;
                Value::set_of(element.as_ref().clone(), items)
            }
            (Type::Map(element), Json::Object(entries)) => {
                let mut map = BTreeMap::new();
                for (k, v) in entries {
                    map.insert(Rc::from(k.as_str()), Self::from_json(v, element)?);
                }
                Value::map_of(element.as_ref().clone(), map)
            }
            (Type::Object(attrs), Json::Object(entries)) => {
                if let Some(extra) = entries.keys().find(|k| !attrs.contains_key(k.as_str())) {
                    bail!("unexpected attribute {extra:?} for {ty}");
                }
                let mut object = BTreeMap::new();
                for (name, attr_ty) in attrs.iter() {
                    let v = match entries.get(&**name) {
                        Some(v) => Self::from_json(v, attr_ty)?,
                        None => Value::Null(attr_ty.clone()),
                    };
                    object.insert(name.clone(), v);
                }
                Value::Object(Rc::new(object))
            }
            _ => bail!("cannot read {json} as {}", ty.friendly_name()),
        })
    }

    pub fn from_json_str(json: &str, ty: &Type) -> Result<Value> {
        Self::from_json(&serde_json::from_str(json)?, ty)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

/// What indexing returns for an absent attribute, key or position. Use
/// [`Value::get_attr`] to tell absence apart from a present null.
const ABSENT: &Value = &Value::Null(Type::Bool);

impl ops::Index<&str> for Value {
    type Output = Value;

    /// Attribute or map entry lookup.
    fn index(&self, key: &str) -> &Self::Output {
        match self {
            Value::Object(m) | Value::Map { entries: m, .. } => m.get(key).unwrap_or(ABSENT),
            _ => ABSENT,
        }
    }
}

impl ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Value::List { items, .. } => items.get(index).unwrap_or(ABSENT),
            _ => ABSENT,
        }
    }
}
