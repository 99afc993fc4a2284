//! Declared-type tags and per-type coercion options.
//!
//! An attribute's declared type selects a coercion routine; its
//! [`TypeOptions`] tune that routine. Composite types (`array`, `hash`)
//! carry nested [`TypeSpec`]s describing how to coerce their elements, keys,
//! and values — recursively, so heterogeneous nested collections can be
//! normalized in one pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

/// Supported declared types.
///
/// The set is closed: unknown type tags are unrepresentable, so a schema
/// can never defer a bad tag to first use.
///
/// # Examples
///
/// ```
/// use intake_core::AttributeType;
///
/// assert_eq!(AttributeType::String.to_string(), "string");
/// assert_eq!(AttributeType::Hash.to_string(), "hash");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Boolean,
    Integer,
    Float,
    Array,
    Hash,
    Date,
    Time,
    File,
    Phone,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Integer => "integer",
            AttributeType::Float => "float",
            AttributeType::Array => "array",
            AttributeType::Hash => "hash",
            AttributeType::Date => "date",
            AttributeType::Time => "time",
            AttributeType::File => "file",
            AttributeType::Phone => "phone",
        };
        f.write_str(name)
    }
}

/// How to coerce a nested position (array element, hash key, hash value).
///
/// `PerEntry` resolves the type from the entry itself — useful when a hash
/// holds heterogeneous values keyed by field name. The function receives
/// `(key, value)`; for hash values the key has already been coerced.
#[derive(Clone, PartialEq)]
pub enum TypeSpec {
    /// A bare type, coerced with default options.
    Named(AttributeType),
    /// A type bundled with its own options, applied recursively.
    Bundle(AttributeType, TypeOptions),
    /// Resolve the type per entry from `(key, value)`.
    PerEntry(fn(&Value, &Value) -> AttributeType),
}

impl TypeSpec {
    /// Resolves this spec against a concrete entry, yielding the type and
    /// the options to coerce with.
    pub fn resolve(&self, key: &Value, value: &Value) -> (AttributeType, TypeOptions) {
        match self {
            TypeSpec::Named(ty) => (*ty, TypeOptions::default()),
            TypeSpec::Bundle(ty, options) => (*ty, options.clone()),
            TypeSpec::PerEntry(resolve) => (resolve(key, value), TypeOptions::default()),
        }
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Named(ty) => f.debug_tuple("Named").field(ty).finish(),
            TypeSpec::Bundle(ty, options) => {
                f.debug_tuple("Bundle").field(ty).field(options).finish()
            }
            TypeSpec::PerEntry(_) => f.write_str("PerEntry(..)"),
        }
    }
}

impl From<AttributeType> for TypeSpec {
    fn from(ty: AttributeType) -> Self {
        TypeSpec::Named(ty)
    }
}

/// Options steering a coercion routine.
///
/// Every field is tri-state: unset fields fall back to the per-type default
/// at coercion time, which is what lets a schema's per-type overlay merge
/// under explicitly declared options without clobbering them.
///
/// # Examples
///
/// ```
/// use intake_core::{AttributeType, TypeOptions, Value, coerce};
///
/// let options = TypeOptions::new().strip(false);
/// let coerced = coerce(AttributeType::String, Value::from("  hi  "), &options);
/// assert_eq!(coerced, Value::from("  hi  "));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeOptions {
    allow_nil: Option<bool>,
    nil_when_empty: Option<bool>,
    strip: Option<bool>,
    upcase: Option<bool>,
    split_by: Option<String>,
    element_type: Option<Box<TypeSpec>>,
    key_type: Option<Box<TypeSpec>>,
    value_type: Option<Box<TypeSpec>>,
}

impl TypeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `Nil` as `Nil` instead of coercing it to the type's empty form.
    pub fn allow_nil(mut self, allow: bool) -> Self {
        self.allow_nil = Some(allow);
        self
    }

    /// Collapse the empty string to `Nil` after stringification.
    pub fn nil_when_empty(mut self, collapse: bool) -> Self {
        self.nil_when_empty = Some(collapse);
        self
    }

    /// Trim surrounding whitespace (string coercion; on by default).
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = Some(strip);
        self
    }

    /// Uppercase the result (string coercion; off by default).
    pub fn upcase(mut self, upcase: bool) -> Self {
        self.upcase = Some(upcase);
        self
    }

    /// Split string input on a separator before array coercion, trimming
    /// each piece.
    pub fn split_by(mut self, separator: &str) -> Self {
        self.split_by = Some(separator.to_string());
        self
    }

    /// How to coerce each array element.
    pub fn element_type(mut self, spec: impl Into<TypeSpec>) -> Self {
        self.element_type = Some(Box::new(spec.into()));
        self
    }

    /// How to coerce each hash key.
    pub fn key_type(mut self, spec: impl Into<TypeSpec>) -> Self {
        self.key_type = Some(Box::new(spec.into()));
        self
    }

    /// How to coerce each hash value.
    pub fn value_type(mut self, spec: impl Into<TypeSpec>) -> Self {
        self.value_type = Some(Box::new(spec.into()));
        self
    }

    pub fn allow_nil_or(&self, default: bool) -> bool {
        self.allow_nil.unwrap_or(default)
    }

    pub fn nil_when_empty_or(&self, default: bool) -> bool {
        self.nil_when_empty.unwrap_or(default)
    }

    pub fn strip_or(&self, default: bool) -> bool {
        self.strip.unwrap_or(default)
    }

    pub fn upcase_or(&self, default: bool) -> bool {
        self.upcase.unwrap_or(default)
    }

    pub fn split_separator(&self) -> Option<&str> {
        self.split_by.as_deref()
    }

    pub fn element_spec(&self) -> Option<&TypeSpec> {
        self.element_type.as_deref()
    }

    pub fn key_spec(&self) -> Option<&TypeSpec> {
        self.key_type.as_deref()
    }

    pub fn value_spec(&self) -> Option<&TypeSpec> {
        self.value_type.as_deref()
    }

    /// Layers these options over `defaults`: fields set here win, unset
    /// fields inherit the default overlay's setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_core::TypeOptions;
    ///
    /// let overlay = TypeOptions::new().upcase(true).strip(false);
    /// let explicit = TypeOptions::new().strip(true);
    /// let merged = explicit.merged_over(&overlay);
    /// assert!(merged.strip_or(false));
    /// assert!(merged.upcase_or(false));
    /// ```
    pub fn merged_over(&self, defaults: &TypeOptions) -> TypeOptions {
        TypeOptions {
            allow_nil: self.allow_nil.or(defaults.allow_nil),
            nil_when_empty: self.nil_when_empty.or(defaults.nil_when_empty),
            strip: self.strip.or(defaults.strip),
            upcase: self.upcase.or(defaults.upcase),
            split_by: self.split_by.clone().or_else(|| defaults.split_by.clone()),
            element_type: self
                .element_type
                .clone()
                .or_else(|| defaults.element_type.clone()),
            key_type: self.key_type.clone().or_else(|| defaults.key_type.clone()),
            value_type: self
                .value_type
                .clone()
                .or_else(|| defaults.value_type.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_over_prefers_explicit_fields() {
        let defaults = TypeOptions::new().upcase(true).allow_nil(false);
        let explicit = TypeOptions::new().allow_nil(true);

        let merged = explicit.merged_over(&defaults);
        assert!(merged.allow_nil_or(false));
        assert!(merged.upcase_or(false));
    }

    #[test]
    fn test_type_spec_resolution() {
        let named = TypeSpec::Named(AttributeType::Integer);
        assert_eq!(
            named.resolve(&Value::Nil, &Value::Nil).0,
            AttributeType::Integer
        );

        let per_entry = TypeSpec::PerEntry(|key, _value| {
            if key.stringify() == "id" {
                AttributeType::Integer
            } else {
                AttributeType::String
            }
        });
        let (ty, _) = per_entry.resolve(&Value::from("id"), &Value::from("7"));
        assert_eq!(ty, AttributeType::Integer);
    }

    #[test]
    fn test_attribute_type_serde_names() {
        let json = serde_json::to_string(&AttributeType::Phone).unwrap();
        assert_eq!(json, "\"phone\"");
    }
}
