//! Resource-scoped validation over heterogeneous collection attributes,
//! end to end: nested per-entry coercion, scoped validators, and the
//! namespaced error tree.

use std::sync::Arc;

use intake_core::{AttributeType, TypeOptions, TypeSpec, Value};
use intake_form::{AttributeOptions, ErrorToken, FormState, Schema};

fn item_value_type(key: &Value, _value: &Value) -> AttributeType {
    match key.stringify().as_str() {
        "id" => AttributeType::Integer,
        "is_archived" => AttributeType::Boolean,
        "amount" => AttributeType::Float,
        "created_at" => AttributeType::Time,
        _ => AttributeType::String,
    }
}

fn item_spec() -> TypeSpec {
    TypeSpec::Bundle(
        AttributeType::Hash,
        TypeOptions::new()
            .key_type(AttributeType::String)
            .value_type(TypeSpec::PerEntry(item_value_type)),
    )
}

fn line_items_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .attribute(
                "items",
                AttributeOptions::array()
                    .type_options(TypeOptions::new().element_type(item_spec())),
            )
            .attribute(
                "items_hash",
                AttributeOptions::hash().type_options(
                    TypeOptions::new()
                        .key_type(AttributeType::String)
                        .value_type(item_spec()),
                ),
            )
            .build()
            .unwrap(),
    )
}

fn item(name: &str, id: i64) -> Value {
    Value::map([("name", Value::from(name)), ("id", Value::from(id))])
}

fn array_input() -> Value {
    Value::map([(
        "items",
        Value::array([item("Sean", 123), item("Leigh", 456), item("", 789)]),
    )])
}

fn hash_input() -> Value {
    Value::map([(
        "items_hash",
        Value::map([
            ("abc", item("Sean", 123)),
            ("def", item("Leigh", 456)),
            ("ghi", item("", 789)),
        ]),
    )])
}

#[test]
fn per_entry_typing_coerces_nested_items() {
    let input = Value::map([(
        "items",
        Value::array([Value::map([
            ("name", Value::from(" Sean ")),
            ("id", Value::from("123")),
            ("is_archived", Value::from("false")),
            ("amount", Value::from("9.5")),
        ])]),
    )]);
    let state = FormState::new(line_items_schema(), input).unwrap();

    let items = state.get("items");
    let first = items.index(0).unwrap();
    assert_eq!(first.get("name"), Some(&Value::from("Sean")));
    assert_eq!(first.get("id"), Some(&Value::Int(123)));
    assert_eq!(first.get("is_archived"), Some(&Value::Bool(false)));
    assert_eq!(first.get("amount"), Some(&Value::Float(9.5)));
}

#[test]
fn with_resource_scopes_validations_over_a_sequence() {
    let mut state = FormState::new(line_items_schema(), array_input()).unwrap();
    let offset = 3;

    let items = state.get("items").as_array().unwrap().to_vec();
    for (index, item) in items.iter().enumerate() {
        state.with_resource("items", index, offset, |state| {
            state.validate_presence("name", None);
            if item.get("id").and_then(Value::as_int).unwrap_or(0) > 500 {
                state.append_error("id", ErrorToken::IsInvalid);
            }
        });
    }

    assert!(!state.resource_has_errors("items", offset));
    assert!(!state.resource_has_errors("items", offset + 1));
    assert!(state.resource_has_errors("items", offset + 2));

    assert!(!state.resource_attribute_has_errors("items", offset, "name"));
    assert!(!state.resource_attribute_has_errors("items", offset, "id"));
    assert!(!state.resource_attribute_has_errors("items", offset + 1, "name"));
    assert!(!state.resource_attribute_has_errors("items", offset + 1, "id"));
    assert!(state.resource_attribute_has_errors("items", offset + 2, "name"));
    assert!(state.resource_attribute_has_errors("items", offset + 2, "id"));

    // Nothing leaked into the flat tree.
    assert!(!state.errors().any());
    assert!(state.any_errors());
}

#[test]
fn with_each_resource_yields_elements_keys_and_indexes() {
    let mut state = FormState::new(line_items_schema(), array_input()).unwrap();
    let offset = 3;

    let mut received_items = Vec::new();
    let mut received_keys = Vec::new();
    let mut received_indexes = Vec::new();
    state.with_each_resource("items", offset, |state, element, key, index| {
        received_items.push(element.clone());
        received_keys.push(key);
        received_indexes.push(index);

        state.validate_presence("name", None);
        if element.get("id").and_then(Value::as_int).unwrap_or(0) > 500 {
            state.append_error("id", ErrorToken::IsInvalid);
        }
    });

    assert_eq!(
        received_items,
        vec![item("Sean", 123), item("Leigh", 456), item("", 789)],
    );
    assert_eq!(
        received_keys,
        vec![Value::Int(3), Value::Int(4), Value::Int(5)],
    );
    assert_eq!(received_indexes, vec![0, 1, 2]);

    assert!(!state.resource_has_errors("items", offset));
    assert!(!state.resource_has_errors("items", offset + 1));
    assert!(state.resource_has_errors("items", offset + 2));
    assert!(state.resource_attribute_has_errors("items", offset + 2, "name"));
    assert!(state.resource_attribute_has_errors("items", offset + 2, "id"));
}

#[test]
fn with_resource_scopes_validations_over_a_keyed_mapping() {
    let mut state = FormState::new(line_items_schema(), hash_input()).unwrap();

    let entries = state.get("items_hash").as_map().unwrap().to_vec();
    for (key, item) in &entries {
        let key = key.stringify();
        state.with_resource("items_hash", key.as_str(), 0, |state| {
            state.validate_presence("name", None);
            if item.get("id").and_then(Value::as_int).unwrap_or(0) > 500 {
                state.append_error("id", ErrorToken::IsInvalid);
            }
        });
    }

    assert!(!state.resource_has_errors("items_hash", "abc"));
    assert!(!state.resource_has_errors("items_hash", "def"));
    assert!(state.resource_has_errors("items_hash", "ghi"));
    assert!(state.resource_attribute_has_errors("items_hash", "ghi", "name"));
    assert!(state.resource_attribute_has_errors("items_hash", "ghi", "id"));
}

#[test]
fn with_each_resource_over_a_keyed_mapping_keeps_original_keys() {
    let mut state = FormState::new(line_items_schema(), hash_input()).unwrap();

    let mut received_keys = Vec::new();
    let mut received_indexes = Vec::new();
    // A non-zero offset must be ignored for keyed mappings.
    state.with_each_resource("items_hash", 7, |state, element, key, index| {
        received_keys.push(key);
        received_indexes.push(index);

        state.validate_presence("name", None);
        if element.get("id").and_then(Value::as_int).unwrap_or(0) > 500 {
            state.append_error("id", ErrorToken::IsInvalid);
        }
    });

    assert_eq!(
        received_keys,
        vec![Value::from("abc"), Value::from("def"), Value::from("ghi")],
    );
    assert_eq!(received_indexes, vec![0, 1, 2]);

    assert!(!state.resource_has_errors("items_hash", "abc"));
    assert!(!state.resource_has_errors("items_hash", "def"));
    assert!(state.resource_has_errors("items_hash", "ghi"));
}

#[test]
fn append_resource_error_feeds_the_same_queries() {
    let mut state = FormState::new(line_items_schema(), Value::Nil).unwrap();

    assert!(!state.any_resource_errors());
    assert!(!state.any_errors());
    assert!(!state.resource_has_errors("items", 0));

    state.append_resource_error("items", 0, "name", ErrorToken::IsInvalid);

    assert!(state.any_resource_errors());
    assert!(state.any_errors());
    assert!(state.resource_has_errors("items", 0));
    assert!(state.resource_attribute_has_errors("items", 0, "name"));
    assert!(!state.resource_attribute_has_errors("items", 0, "id"));
}
