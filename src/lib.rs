// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod error;
mod from_message;
mod implied_type;
mod number;
mod path;
mod to_message;
mod types;
mod value;

#[cfg(feature = "arc")]
pub(crate) use std::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub(crate) use std::rc::Rc;

pub use error::{EnumValue, Error};
pub use from_message::{from_message, from_reflect_message};
pub use implied_type::implied_type;
pub use number::{Number, ParseNumberError};
pub use path::{Path, PathStep};
pub use to_message::{new_message, to_message};
pub use types::Type;
pub use value::Value;

/// Re-export of the protobuf reflection runtime the bridge operates on.
pub use prost_reflect;
