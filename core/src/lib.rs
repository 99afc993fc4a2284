//! Value model and coercion engine for declarative intake schemas.
//!
//! This crate holds the pure half of the intake workspace:
//!
//! - [`Value`] — the dynamic value domain raw input and coerced storage
//!   share, with JSON interop.
//! - [`AttributeType`] / [`TypeOptions`] / [`TypeSpec`] — declared-type tags
//!   and the options that steer each coercion routine, including recursive
//!   specs for composite types.
//! - [`coerce`] and the per-type routines — total functions that normalize
//!   raw input into its declared-type form, degrading malformed input to
//!   [`Value::Nil`] instead of failing.
//! - [`Format`] — precompiled format patterns (email, alphanumeric code,
//!   hex color) exposed as a match capability.
//!
//! Nothing here knows about schemas, instances, or validation; the
//! `intake-form` crate builds those on top.
//!
//! # Example
//!
//! ```
//! use intake_core::{AttributeType, TypeOptions, Value, coerce};
//!
//! let options = TypeOptions::new().element_type(AttributeType::Integer);
//! let coerced = coerce(AttributeType::Array, Value::from("1, 2, x"), &options.split_by(","));
//! assert_eq!(coerced, Value::array([Value::Int(1), Value::Int(2), Value::Nil]));
//! ```

mod coerce;
mod formats;
mod types;
mod value;

pub use coerce::{
    coerce, coerce_array, coerce_boolean, coerce_date, coerce_file, coerce_float, coerce_hash,
    coerce_integer, coerce_phone, coerce_string, coerce_time,
};
pub use formats::Format;
pub use types::{AttributeType, TypeOptions, TypeSpec};
pub use value::{FileUpload, Value};
