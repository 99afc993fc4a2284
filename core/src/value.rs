//! Dynamic value model shared by raw input and coerced storage.
//!
//! Raw input arrives as untyped data (query params, JSON bodies, multipart
//! uploads). [`Value`] is the common domain both sides of the coercion
//! pipeline speak: an attribute's raw input is a `Value`, and its coerced,
//! stored form is a `Value` as well.
//!
//! Map entries preserve insertion order and are addressed by *stringified*
//! key, so `{1 => "a"}` and `{"1" => "a"}` answer the same lookups. This
//! mirrors how request parameters blur the line between symbol-ish and
//! string keys.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded file: the client-supplied filename plus the server-side
/// temporary path the body was spooled to.
///
/// # Examples
///
/// ```
/// use intake_core::FileUpload;
///
/// let upload = FileUpload::new("report.csv", "/tmp/upload-1")
///     .with_content_type("text/csv");
/// assert_eq!(upload.media_type_prefix(), Some("text"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    /// Client-supplied filename, as sent in the multipart part.
    pub filename: String,
    /// Path of the spooled temporary file.
    pub tempfile: PathBuf,
    /// Declared media type (e.g. `"image/png"`), if the client sent one.
    pub content_type: Option<String>,
}

impl FileUpload {
    /// Creates an upload from a filename and spooled path.
    pub fn new(filename: &str, tempfile: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.to_string(),
            tempfile: tempfile.into(),
            content_type: None,
        }
    }

    /// Sets the declared media type.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// The part of the media type before the `/` (e.g. `"image"`).
    pub fn media_type_prefix(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .map(|t| t.split('/').next().unwrap_or(t))
    }
}

/// A dynamically typed value.
///
/// `Nil` stands for absence; coercion degrades malformed input to `Nil`
/// rather than failing, so downstream validation (not the coercer) decides
/// whether absence is an error.
///
/// # Examples
///
/// ```
/// use intake_core::Value;
///
/// let v = Value::from("hello");
/// assert_eq!(v.as_str(), Some("hello"));
/// assert!(v.truthy());
/// assert!(Value::Nil.is_nil());
///
/// let map = Value::map([(1, "a"), (2, "b")]);
/// assert_eq!(map.get("1"), Some(&Value::from("a")));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence. Both "never set" and "explicitly set to nothing" store this;
    /// the provided-names set is what tells them apart.
    #[default]
    Nil,
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(Vec<Value>),
    /// Insertion-ordered entries; keys may be any value and are compared by
    /// their stringified form.
    Map(Vec<(Value, Value)>),
    Date(NaiveDate),
    Time(DateTime<Utc>),
    File(FileUpload),
}

impl Value {
    /// Builds an array value from anything convertible to [`Value`].
    pub fn array<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map value, preserving entry order.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_core::Value;
    ///
    /// let v = Value::map([("name", "Sean"), ("email", "sean@example.com")]);
    /// assert_eq!(v.size(), Some(2));
    /// ```
    pub fn map<K: Into<Value>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether this value is `Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Host-style truthiness: everything except `Nil` and `false` is truthy.
    /// Note that `0` and `""` are truthy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Whether the value is "blank": nil, `false`, a whitespace-only string,
    /// or an empty collection.
    pub fn blank(&self) -> bool {
        match self {
            Value::Nil | Value::Bool(false) => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Size of a sized value: characters for strings, elements for arrays,
    /// entries for maps. `None` for everything else.
    pub fn size(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileUpload> {
        match self {
            Value::File(f) => Some(f),
            _ => None,
        }
    }

    /// Map lookup by stringified key.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_core::Value;
    ///
    /// let v = Value::map([(12, "x")]);
    /// assert_eq!(v.get("12"), Some(&Value::from("x")));
    /// assert_eq!(v.get("13"), None);
    /// assert_eq!(Value::Nil.get("12"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.stringify() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Array lookup by position.
    pub fn index(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(i),
            _ => None,
        }
    }

    /// The conventional text form of the value. `Nil` renders as the empty
    /// string; dates render as `YYYY-MM-DD`; times as RFC 3339; files as
    /// their filename; collections as their JSON form.
    pub fn stringify(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.to_rfc3339(),
            Value::File(f) => f.filename.clone(),
            Value::Array(_) | Value::Map(_) => serde_json::Value::from(self).to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<FileUpload> for Value {
    fn from(f: FileUpload) -> Self {
        Value::File(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Nil => serde_json::Value::Null,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.stringify(), serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Date(_) | Value::Time(_) | Value::File(_) => {
                serde_json::Value::String(value.stringify())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        serde_json::Value::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::Int(0).truthy());
        assert!(Value::from("").truthy());
    }

    #[test]
    fn test_blank() {
        assert!(Value::Nil.blank());
        assert!(Value::from("   ").blank());
        assert!(Value::array(Vec::<Value>::new()).blank());
        assert!(!Value::Int(0).blank());
        assert!(!Value::from("x").blank());
    }

    #[test]
    fn test_map_lookup_stringifies_keys() {
        let map = Value::map([(1, "a"), (2, "b")]);
        assert_eq!(map.get("1"), Some(&Value::from("a")));
        assert_eq!(map.get("2"), Some(&Value::from("b")));
        assert_eq!(map.get("3"), None);
    }

    #[test]
    fn test_stringify() {
        assert_eq!(Value::Nil.stringify(), "");
        assert_eq!(Value::Int(42).stringify(), "42");
        assert_eq!(Value::Float(42.5).stringify(), "42.5");
        assert_eq!(Value::Bool(true).stringify(), "true");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(date).stringify(), "2024-03-09");
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::json!({
            "name": "Sean",
            "id": 123,
            "tags": ["a", "b"],
            "archived": false,
            "notes": null,
        });
        let value = Value::from(json.clone());
        assert_eq!(value.get("name"), Some(&Value::from("Sean")));
        assert_eq!(value.get("id"), Some(&Value::Int(123)));
        assert_eq!(value.get("notes"), Some(&Value::Nil));
        assert_eq!(serde_json::Value::from(&value), json);
    }

    #[test]
    fn test_size_counts_chars_not_bytes() {
        assert_eq!(Value::from("héllo").size(), Some(5));
        assert_eq!(Value::array(["a", "b"]).size(), Some(2));
        assert_eq!(Value::Int(5).size(), None);
    }
}
