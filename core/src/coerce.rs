//! Coercion of raw input values into their declared-type form.
//!
//! [`coerce`] dispatches on the declared [`AttributeType`] to a per-type
//! routine. Every routine is total: malformed input degrades to
//! [`Value::Nil`] (or the type's empty form) instead of failing, so bad
//! input surfaces as a validation error downstream rather than a crash
//! here.
//!
//! Composite types recurse: arrays coerce each element through their
//! `element_type` spec, hashes coerce keys and values through `key_type` /
//! `value_type` specs, which may themselves resolve per entry.
//!
//! # Examples
//!
//! ```
//! use intake_core::{AttributeType, TypeOptions, Value, coerce};
//!
//! let options = TypeOptions::default();
//! assert_eq!(
//!     coerce(AttributeType::String, Value::from("  hi  "), &options),
//!     Value::from("hi"),
//! );
//! assert_eq!(
//!     coerce(AttributeType::Integer, Value::from("042"), &options),
//!     Value::Int(42),
//! );
//! assert_eq!(
//!     coerce(AttributeType::Integer, Value::from("4a"), &options),
//!     Value::Nil,
//! );
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::{AttributeType, FileUpload, TypeOptions, TypeSpec, Value};

/// Digit-only integer input. No sign, no separators, no locale forms;
/// leading zeros are tolerated and dropped by the parse.
static INTEGER_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("integer pattern compiles"));

/// Coerces `value` into the canonical form of the declared type.
pub fn coerce(ty: AttributeType, value: Value, options: &TypeOptions) -> Value {
    match ty {
        AttributeType::String => coerce_string(value, options),
        AttributeType::Boolean => coerce_boolean(value, options),
        AttributeType::Integer => coerce_integer(value, options),
        AttributeType::Float => coerce_float(value, options),
        AttributeType::Array => coerce_array(value, options),
        AttributeType::Hash => coerce_hash(value, options),
        AttributeType::Date => coerce_date(value, options),
        AttributeType::Time => coerce_time(value, options),
        AttributeType::File => coerce_file(value, options),
        AttributeType::Phone => coerce_phone(value, options),
    }
}

/// Coerces to a string.
///
/// `allow_nil` (default true) keeps `Nil` as `Nil`; `nil_when_empty`
/// (default false) collapses the empty string to `Nil`; `strip` (default
/// true) trims surrounding whitespace; `upcase` (default false) uppercases.
///
/// # Examples
///
/// ```
/// use intake_core::{TypeOptions, Value, coerce_string};
///
/// let defaults = TypeOptions::default();
/// assert_eq!(coerce_string(Value::from("  hi  "), &defaults), Value::from("hi"));
/// assert_eq!(coerce_string(Value::Nil, &defaults), Value::Nil);
/// assert_eq!(
///     coerce_string(Value::from(""), &TypeOptions::new().nil_when_empty(true)),
///     Value::Nil,
/// );
/// ```
pub fn coerce_string(value: Value, options: &TypeOptions) -> Value {
    if value.is_nil() && options.allow_nil_or(true) {
        return Value::Nil;
    }

    let mut s = value.stringify();
    if s.is_empty() && options.nil_when_empty_or(false) {
        return Value::Nil;
    }
    if options.strip_or(true) {
        s = s.trim().to_string();
    }
    if options.upcase_or(false) {
        s = s.to_uppercase();
    }

    Value::String(s)
}

/// Coerces to a boolean.
///
/// With `allow_nil` (default false), `Nil` and the empty string stay `Nil`.
/// The literal string `"false"` (after trimming) is false; otherwise the
/// result is true for any truthy value whose text form is non-blank.
pub fn coerce_boolean(value: Value, options: &TypeOptions) -> Value {
    if options.allow_nil_or(false) && (value.is_nil() || value.as_str() == Some("")) {
        return Value::Nil;
    }

    let text = value.stringify();
    if text.trim() == "false" {
        return Value::Bool(false);
    }

    Value::Bool(value.truthy() && !text.trim().is_empty())
}

/// Coerces to an integer.
///
/// Accepts digit-only strings (so `"042"` parses as 42); signs and anything
/// non-numeric degrade to `Nil`.
pub fn coerce_integer(value: Value, _options: &TypeOptions) -> Value {
    let text = value.stringify();
    if !INTEGER_FORMAT.is_match(&text) {
        return Value::Nil;
    }
    text.parse::<i64>().map(Value::Int).unwrap_or(Value::Nil)
}

/// Coerces to a float via strict parsing; non-finite results and parse
/// failures degrade to `Nil`.
pub fn coerce_float(value: Value, _options: &TypeOptions) -> Value {
    let parsed = match &value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Value::Float(f),
        _ => Value::Nil,
    }
}

/// Coerces to an array.
///
/// Map input contributes its values in order; string input splits on
/// `split_by` (pieces trimmed) when configured; anything else that is not
/// already a sequence becomes the empty sequence. With an `element_type`
/// spec every element is coerced recursively.
///
/// # Examples
///
/// ```
/// use intake_core::{AttributeType, TypeOptions, Value, coerce_array};
///
/// let keyed = Value::map([(1, "a"), (2, "b")]);
/// assert_eq!(
///     coerce_array(keyed, &TypeOptions::default()),
///     Value::array(["a", "b"]),
/// );
///
/// let csv = Value::from("a, b ,c");
/// let options = TypeOptions::new().split_by(",");
/// assert_eq!(coerce_array(csv, &options), Value::array(["a", "b", "c"]));
///
/// let typed = TypeOptions::new().element_type(AttributeType::Integer);
/// assert_eq!(
///     coerce_array(Value::array(["1", "2"]), &typed),
///     Value::array([1, 2]),
/// );
/// ```
pub fn coerce_array(value: Value, options: &TypeOptions) -> Value {
    if options.allow_nil_or(false) && value.is_nil() {
        return Value::Nil;
    }

    let mut value = value;
    if let Value::Map(entries) = value {
        value = Value::Array(entries.into_iter().map(|(_, v)| v).collect());
    }
    if let Some(separator) = options.split_separator() {
        if let Value::String(s) = &value {
            let pieces: Vec<Value> = s
                .split(separator)
                .map(|piece| Value::String(piece.trim().to_string()))
                .collect();
            value = Value::Array(pieces);
        }
    }

    let Value::Array(items) = value else {
        return Value::Array(Vec::new());
    };

    let Some(spec) = options.element_spec() else {
        return Value::Array(items);
    };
    // Per-entry element specs are rejected at schema declaration; a bare
    // pass-through keeps this routine total anyway.
    if let TypeSpec::PerEntry(_) = spec {
        return Value::Array(items);
    }
    Value::Array(
        items
            .into_iter()
            .map(|element| {
                let (ty, element_options) = spec.resolve(&Value::Nil, &element);
                coerce(ty, element, &element_options)
            })
            .collect(),
    )
}

/// Coerces to a hash, preserving entry order.
///
/// Non-map input becomes the empty map. `key_type` / `value_type` specs
/// coerce each side of every entry; per-entry specs receive `(key, value)`
/// — the key-type resolver sees the raw key, the value-type resolver sees
/// the already-coerced key, so value typing can depend on the final key
/// form.
///
/// # Examples
///
/// ```
/// use intake_core::{AttributeType, TypeOptions, Value, coerce_hash};
///
/// let input = Value::map([("12345", Value::map([("key", "value")]))]);
/// let options = TypeOptions::new()
///     .key_type(AttributeType::Integer)
///     .value_type(intake_core::TypeSpec::Bundle(
///         AttributeType::Hash,
///         TypeOptions::new()
///             .key_type(AttributeType::String)
///             .value_type(AttributeType::String),
///     ));
///
/// let coerced = coerce_hash(input, &options);
/// assert_eq!(
///     coerced,
///     Value::map([(12345, Value::map([("key", "value")]))]),
/// );
/// ```
pub fn coerce_hash(value: Value, options: &TypeOptions) -> Value {
    if options.allow_nil_or(false) && value.is_nil() {
        return Value::Nil;
    }

    let Value::Map(entries) = value else {
        return Value::Map(Vec::new());
    };

    let mut coerced = Vec::with_capacity(entries.len());
    for (key, entry_value) in entries {
        let key = match options.key_spec() {
            Some(spec) => {
                let (ty, key_options) = spec.resolve(&key, &entry_value);
                coerce(ty, key, &key_options)
            }
            None => key,
        };
        let entry_value = match options.value_spec() {
            Some(spec) => {
                let (ty, value_options) = spec.resolve(&key, &entry_value);
                coerce(ty, entry_value, &value_options)
            }
            None => entry_value,
        };
        coerced.push((key, entry_value));
    }

    Value::Map(coerced)
}

/// Coerces to a calendar date via string coercion and a fixed `YYYY-MM-DD`
/// parse; failures degrade to `Nil`.
pub fn coerce_date(value: Value, options: &TypeOptions) -> Value {
    let Value::String(s) = coerce_string(value, options) else {
        return Value::Nil;
    };
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map(Value::Date)
        .unwrap_or(Value::Nil)
}

/// Coerces to a UTC timestamp. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// (read as UTC), or a bare date (midnight UTC); failures degrade to `Nil`.
pub fn coerce_time(value: Value, options: &TypeOptions) -> Value {
    let Value::String(s) = coerce_string(value, options) else {
        return Value::Nil;
    };
    if s.is_empty() {
        return Value::Nil;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(&s) {
        return Value::Time(t.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S") {
        return Value::Time(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Value::Time(naive.and_utc());
        }
    }

    Value::Nil
}

/// Coerces to a file upload.
///
/// Accepts an existing [`FileUpload`] value with a non-empty filename, or a
/// map carrying `filename` and `tempfile` entries (plus an optional `type`
/// media type). Anything else degrades to `Nil`.
pub fn coerce_file(value: Value, _options: &TypeOptions) -> Value {
    match value {
        Value::File(upload) if !upload.filename.is_empty() => Value::File(upload),
        Value::Map(_) => {
            let filename = value
                .get("filename")
                .map(Value::stringify)
                .filter(|name| !name.is_empty());
            let tempfile = value.get("tempfile").and_then(Value::as_str);
            match (filename, tempfile) {
                (Some(filename), Some(tempfile)) => {
                    let mut upload = FileUpload::new(&filename, tempfile);
                    upload.content_type = value
                        .get("type")
                        .map(Value::stringify)
                        .filter(|t| !t.is_empty());
                    Value::File(upload)
                }
                _ => Value::Nil,
            }
        }
        _ => Value::Nil,
    }
}

/// Coerces to an international phone string: string-coerce, uppercase, then
/// drop every character outside `[+0-9A-Z]`.
///
/// # Examples
///
/// ```
/// use intake_core::{TypeOptions, Value, coerce_phone};
///
/// assert_eq!(
///     coerce_phone(Value::from(" +1 (555) 010-9999 ext 2 "), &TypeOptions::default()),
///     Value::from("+15550109999EXT2"),
/// );
/// ```
pub fn coerce_phone(value: Value, options: &TypeOptions) -> Value {
    if value.is_nil() {
        return Value::Nil;
    }
    let Value::String(s) = coerce_string(value, options) else {
        return Value::Nil;
    };
    Value::String(
        s.to_uppercase()
            .chars()
            .filter(|c| matches!(c, '+' | '0'..='9' | 'A'..='Z'))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> TypeOptions {
        TypeOptions::default()
    }

    #[test]
    fn test_string_allow_nil_default() {
        assert_eq!(coerce_string(Value::Nil, &defaults()), Value::Nil);
        assert_eq!(
            coerce_string(Value::Nil, &TypeOptions::new().allow_nil(false)),
            Value::from(""),
        );
    }

    #[test]
    fn test_string_empty_stays_empty_unless_collapsed() {
        assert_eq!(
            coerce_string(Value::from(""), &TypeOptions::new().allow_nil(true)),
            Value::from(""),
        );
        assert_eq!(
            coerce_string(
                Value::from(""),
                &TypeOptions::new().allow_nil(true).nil_when_empty(true),
            ),
            Value::Nil,
        );
    }

    #[test]
    fn test_string_strip_and_upcase() {
        assert_eq!(coerce_string(Value::from(" foo "), &defaults()), Value::from("foo"));
        assert_eq!(
            coerce_string(Value::from(" foo "), &TypeOptions::new().strip(false)),
            Value::from(" foo "),
        );
        assert_eq!(
            coerce_string(Value::from("foo"), &TypeOptions::new().upcase(true)),
            Value::from("FOO"),
        );
    }

    #[test]
    fn test_string_from_non_string_input() {
        assert_eq!(coerce_string(Value::Int(30), &defaults()), Value::from("30"));
        assert_eq!(coerce_string(Value::Bool(true), &defaults()), Value::from("true"));
    }

    #[test]
    fn test_boolean_nil_handling() {
        assert_eq!(coerce_boolean(Value::Nil, &defaults()), Value::Bool(false));
        assert_eq!(
            coerce_boolean(Value::Nil, &TypeOptions::new().allow_nil(true)),
            Value::Nil,
        );
        assert_eq!(
            coerce_boolean(Value::from(""), &TypeOptions::new().allow_nil(true)),
            Value::Nil,
        );
        assert_eq!(
            coerce_boolean(Value::from(""), &TypeOptions::new().allow_nil(false)),
            Value::Bool(false),
        );
    }

    #[test]
    fn test_boolean_literals_and_text() {
        assert_eq!(coerce_boolean(Value::Bool(true), &defaults()), Value::Bool(true));
        assert_eq!(coerce_boolean(Value::Bool(false), &defaults()), Value::Bool(false));
        assert_eq!(coerce_boolean(Value::from("false"), &defaults()), Value::Bool(false));
        assert_eq!(coerce_boolean(Value::from(" false "), &defaults()), Value::Bool(false));
        assert_eq!(coerce_boolean(Value::from("yes"), &defaults()), Value::Bool(true));
        assert_eq!(coerce_boolean(Value::from("   "), &defaults()), Value::Bool(false));
        assert_eq!(coerce_boolean(Value::Int(0), &defaults()), Value::Bool(true));
    }

    #[test]
    fn test_integer_digit_strings_only() {
        assert_eq!(coerce_integer(Value::from("042"), &defaults()), Value::Int(42));
        assert_eq!(coerce_integer(Value::from("0"), &defaults()), Value::Int(0));
        assert_eq!(coerce_integer(Value::Int(7), &defaults()), Value::Int(7));
        assert_eq!(coerce_integer(Value::from("4a"), &defaults()), Value::Nil);
        assert_eq!(coerce_integer(Value::from("-1"), &defaults()), Value::Nil);
        assert_eq!(coerce_integer(Value::from(""), &defaults()), Value::Nil);
        assert_eq!(coerce_integer(Value::Nil, &defaults()), Value::Nil);
    }

    #[test]
    fn test_float_strict_parse() {
        assert_eq!(coerce_float(Value::from("4.25"), &defaults()), Value::Float(4.25));
        assert_eq!(coerce_float(Value::Int(3), &defaults()), Value::Float(3.0));
        assert_eq!(coerce_float(Value::from("4a"), &defaults()), Value::Nil);
        assert_eq!(coerce_float(Value::from("NaN"), &defaults()), Value::Nil);
        assert_eq!(coerce_float(Value::from("inf"), &defaults()), Value::Nil);
        assert_eq!(coerce_float(Value::Bool(true), &defaults()), Value::Nil);
    }

    #[test]
    fn test_array_nil_handling() {
        assert_eq!(coerce_array(Value::Nil, &defaults()), Value::Array(Vec::new()));
        assert_eq!(
            coerce_array(Value::Nil, &TypeOptions::new().allow_nil(true)),
            Value::Nil,
        );
    }

    #[test]
    fn test_array_takes_map_values_in_order() {
        let keyed = Value::map([(1, "a"), (2, "b")]);
        assert_eq!(coerce_array(keyed, &defaults()), Value::array(["a", "b"]));
    }

    #[test]
    fn test_array_split_by_trims_pieces() {
        let options = TypeOptions::new().split_by(",");
        assert_eq!(
            coerce_array(Value::from(" a ,b, c"), &options),
            Value::array(["a", "b", "c"]),
        );
    }

    #[test]
    fn test_array_element_bundle_recurses() {
        let options = TypeOptions::new().element_type(TypeSpec::Bundle(
            AttributeType::Hash,
            TypeOptions::new()
                .key_type(AttributeType::String)
                .value_type(AttributeType::String),
        ));
        let input = Value::map([(12345, Value::map([(1, 2)]))]);
        assert_eq!(
            coerce_array(input, &options),
            Value::array([Value::map([("1", "2")])]),
        );
    }

    #[test]
    fn test_array_bare_element_type_coerces_without_options() {
        let options = TypeOptions::new().element_type(AttributeType::Integer);
        assert_eq!(
            coerce_array(Value::array(["1", "x", "3"]), &options),
            Value::array([Value::Int(1), Value::Nil, Value::Int(3)]),
        );
    }

    #[test]
    fn test_hash_non_map_input_becomes_empty() {
        assert_eq!(coerce_hash(Value::from("nope"), &defaults()), Value::Map(Vec::new()));
        assert_eq!(coerce_hash(Value::Nil, &defaults()), Value::Map(Vec::new()));
        assert_eq!(
            coerce_hash(Value::Nil, &TypeOptions::new().allow_nil(true)),
            Value::Nil,
        );
    }

    #[test]
    fn test_hash_per_entry_value_typing() {
        let options = TypeOptions::new()
            .key_type(AttributeType::String)
            .value_type(TypeSpec::PerEntry(|key, _value| match key.stringify().as_str() {
                "id" => AttributeType::Integer,
                "is_archived" => AttributeType::Boolean,
                "amount" => AttributeType::Float,
                _ => AttributeType::String,
            }));
        let input = Value::map([
            ("id", Value::from("123")),
            ("name", Value::from(" Sean ")),
            ("is_archived", Value::from("false")),
            ("amount", Value::from("9.5")),
        ]);

        let coerced = coerce_hash(input, &options);
        assert_eq!(coerced.get("id"), Some(&Value::Int(123)));
        assert_eq!(coerced.get("name"), Some(&Value::from("Sean")));
        assert_eq!(coerced.get("is_archived"), Some(&Value::Bool(false)));
        assert_eq!(coerced.get("amount"), Some(&Value::Float(9.5)));
    }

    #[test]
    fn test_date_fixed_format() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            coerce_date(Value::from("2024-03-09"), &defaults()),
            Value::Date(expected),
        );
        assert_eq!(coerce_date(Value::from("03/09/2024"), &defaults()), Value::Nil);
        assert_eq!(coerce_date(Value::Nil, &defaults()), Value::Nil);
    }

    #[test]
    fn test_time_accepted_forms() {
        let rfc = coerce_time(Value::from("2024-03-09T12:30:00Z"), &defaults());
        assert!(matches!(rfc, Value::Time(_)));

        let spaced = coerce_time(Value::from("2024-03-09 12:30:00"), &defaults());
        assert_eq!(rfc, spaced);

        let midnight = coerce_time(Value::from("2024-03-09"), &defaults());
        assert_eq!(
            midnight,
            coerce_time(Value::from("2024-03-09T00:00:00Z"), &defaults()),
        );

        assert_eq!(coerce_time(Value::from("not a time"), &defaults()), Value::Nil);
        assert_eq!(coerce_time(Value::Nil, &defaults()), Value::Nil);
    }

    #[test]
    fn test_file_requires_filename_and_tempfile() {
        let ok = Value::map([
            ("filename", Value::from("photo.png")),
            ("tempfile", Value::from("/tmp/upload-7")),
            ("type", Value::from("image/png")),
        ]);
        let coerced = coerce_file(ok, &defaults());
        let upload = coerced.as_file().expect("file upload");
        assert_eq!(upload.filename, "photo.png");
        assert_eq!(upload.media_type_prefix(), Some("image"));

        let missing_name = Value::map([("tempfile", Value::from("/tmp/upload-7"))]);
        assert_eq!(coerce_file(missing_name, &defaults()), Value::Nil);

        let empty_name = Value::map([
            ("filename", Value::from("")),
            ("tempfile", Value::from("/tmp/upload-7")),
        ]);
        assert_eq!(coerce_file(empty_name, &defaults()), Value::Nil);

        assert_eq!(coerce_file(Value::from("photo.png"), &defaults()), Value::Nil);
    }

    #[test]
    fn test_phone_filters_and_upcases() {
        assert_eq!(
            coerce_phone(Value::from("+1 (555) 010-9999"), &defaults()),
            Value::from("+15550109999"),
        );
        assert_eq!(coerce_phone(Value::Nil, &defaults()), Value::Nil);
        assert_eq!(coerce_phone(Value::from(""), &defaults()), Value::from(""));
        assert_eq!(
            coerce_phone(Value::from(""), &TypeOptions::new().nil_when_empty(true)),
            Value::Nil,
        );
    }

    #[test]
    fn test_dispatch_covers_all_types() {
        let options = defaults();
        assert_eq!(coerce(AttributeType::Integer, Value::from("30"), &options), Value::Int(30));
        assert_eq!(
            coerce(AttributeType::Boolean, Value::from("false"), &options),
            Value::Bool(false),
        );
        assert_eq!(
            coerce(AttributeType::Phone, Value::from("555-0100"), &options),
            Value::from("5550100"),
        );
    }
}
