//! Line-items example: validating elements of a collection attribute.
//!
//! An order form carries a list of heterogeneous line items. Each item is
//! coerced through per-entry typing (ids become integers, amounts become
//! floats), then validated as if it were its own object — errors land in
//! the namespaced resource tree, keyed by item position.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p intake-examples --example line_items
//! ```

use std::sync::{Arc, LazyLock};

use intake_core::{AttributeType, TypeOptions, TypeSpec, Value};
use intake_form::{AttributeOptions, Form, FormError, FormState, Schema, ValidationError};

fn item_value_type(key: &Value, _value: &Value) -> AttributeType {
    match key.stringify().as_str() {
        "id" => AttributeType::Integer,
        "amount" => AttributeType::Float,
        _ => AttributeType::String,
    }
}

static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(
        Schema::builder()
            .attribute(
                "items",
                AttributeOptions::array().type_options(TypeOptions::new().element_type(
                    TypeSpec::Bundle(
                        AttributeType::Hash,
                        TypeOptions::new()
                            .key_type(AttributeType::String)
                            .value_type(TypeSpec::PerEntry(item_value_type)),
                    ),
                )),
            )
            .build()
            .expect("line-items schema is valid"),
    )
});

struct SubmitOrder {
    state: FormState,
}

impl SubmitOrder {
    fn new(input: impl Into<Value>) -> Result<Self, FormError> {
        Ok(Self {
            state: FormState::new(Arc::clone(&SCHEMA), input)?,
        })
    }
}

impl Form for SubmitOrder {
    type Output = usize;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn validate(&mut self) {
        // Positions are reported 1-based to match how the order reads.
        self.state.with_each_resource("items", 1, |state, item, _key, _index| {
            state.validate_presence("name", None);
            let amount = item.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
            if amount <= 0.0 {
                state.append_error("amount", "must_be_positive");
            }
        });
    }

    fn perform(&mut self) -> Result<usize, ValidationError> {
        Ok(self.state.get("items").as_array().map_or(0, |items| items.len()))
    }
}

fn main() {
    let input: Value = serde_json::json!({
        "items": [
            { "name": "widget", "id": "1", "amount": "9.50" },
            { "name": "", "id": "2", "amount": "0" },
        ],
    })
    .into();

    match SubmitOrder::new(input) {
        Ok(mut form) => match form.perform_and_validate() {
            Ok(count) => println!("accepted {count} items"),
            Err(failure) => {
                println!("{failure}");
                println!();
                println!(
                    "second item has errors: {}",
                    form.state().resource_has_errors("items", 2),
                );
            }
        },
        Err(err) => println!("could not construct form: {err}"),
    }
}
