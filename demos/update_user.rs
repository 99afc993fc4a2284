//! Update-user form example.
//!
//! Demonstrates the full lifecycle: declare a schema with a backing
//! record, construct a form from JSON-shaped input, validate, track which
//! attributes actually changed, and perform only when valid.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p intake-examples --example update_user
//! ```

use std::sync::{Arc, LazyLock};

use intake_core::Value;
use intake_form::{
    AttributeOptions, Form, FormError, FormState, LengthRule, RangeRule, Schema, ValidationError,
};

static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(
        Schema::builder()
            .record("user", AttributeOptions::hash())
            .attribute("username", AttributeOptions::string().watch_changes())
            .attribute("percentage", AttributeOptions::integer().watch_changes())
            .attribute("kind", AttributeOptions::string().default("buyer"))
            .build()
            .expect("update-user schema is valid"),
    )
});

const VALID_KINDS: [&str; 2] = ["buyer", "seller"];

struct UpdateUser {
    state: FormState,
}

impl UpdateUser {
    fn new(input: impl Into<Value>) -> Result<Self, FormError> {
        Ok(Self {
            state: FormState::new(Arc::clone(&SCHEMA), input)?,
        })
    }
}

impl Form for UpdateUser {
    type Output = Value;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn validate(&mut self) {
        self.state.validate_presence("username", None);
        self.state
            .validate_length("username", LengthRule::new().min(2).max(64));
        self.state
            .validate_range("percentage", RangeRule::new().min(0.0).max(100.0));
        let kinds: Vec<Value> = VALID_KINDS.iter().map(|k| Value::from(*k)).collect();
        self.state.validate_inclusion("kind", &kinds, None);
    }

    fn perform(&mut self) -> Result<Value, ValidationError> {
        // A real form would persist here; we just hand back the update.
        Ok(Value::map(self.state.provided_attributes()))
    }
}

fn main() {
    // The record a real application would have loaded from storage.
    let stored_user = serde_json::json!({
        "username": "weijie",
        "percentage": 50,
        "kind": "buyer",
    });

    println!("=== Valid update ===");
    let input: Value = serde_json::json!({
        "user": stored_user.clone(),
        "username": "  weijie  ",
        "percentage": "100",
    })
    .into();
    match UpdateUser::new(input) {
        Ok(mut form) => match form.perform_and_validate() {
            Ok(update) => {
                println!("performed with: {}", serde_json::Value::from(update));
                for name in ["username", "percentage"] {
                    println!(
                        "  {name} changed: {}",
                        form.state().changes(name).unwrap_or(false),
                    );
                }
            }
            Err(failure) => println!("unexpected failure: {failure}"),
        },
        Err(err) => println!("could not construct form: {err}"),
    }

    println!();
    println!("=== Invalid update ===");
    let input: Value = serde_json::json!({
        "user": stored_user,
        "username": "w",
        "percentage": "150",
        "kind": "broker",
    })
    .into();
    match UpdateUser::new(input) {
        Ok(mut form) => match form.perform_and_validate() {
            Ok(_) => println!("unexpectedly valid"),
            Err(failure) => {
                println!("{failure}");
            }
        },
        Err(err) => println!("could not construct form: {err}"),
    }
}
