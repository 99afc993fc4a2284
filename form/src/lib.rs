//! Declarative attribute schemas, coercing instance state, and guarded
//! validation for request-like input objects.
//!
//! The crate is organized around three interlocking pieces:
//!
//! - [`Schema`] / [`SchemaBuilder`] — declare named attributes with types,
//!   defaults, and options; conflicts and impossible configurations are
//!   rejected when the schema is built, and schemas branch copy-on-write
//!   for inheritance.
//! - [`FormState`] — one instance of a schema: raw input is matched by
//!   stringified key, coerced through each attribute's compiled write
//!   pipeline, and tracked so "provided nil" and "never set" stay
//!   distinguishable.
//! - [`Form`] — the validation and perform lifecycle: built-in validators
//!   accumulate identifier-valued errors into ordered trees, and
//!   [`Form::perform_and_validate`] runs the user's action only when the
//!   instance is valid, absorbing nested validation failures.
//!
//! Two extensions decorate the core: change tracking
//! ([`extensions::changes`]) recomputes a per-attribute changed flag on
//! every write, and resource scoping ([`extensions::resources`]) points
//! validators at items inside a collection attribute, recording their
//! errors in a separate namespaced tree.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use intake_core::Value;
//! use intake_form::{AttributeOptions, Form, FormState, LengthRule, Schema, ValidationError};
//!
//! struct SignUp {
//!     state: FormState,
//! }
//!
//! impl Form for SignUp {
//!     type Output = Value;
//!
//!     fn state(&self) -> &FormState {
//!         &self.state
//!     }
//!
//!     fn state_mut(&mut self) -> &mut FormState {
//!         &mut self.state
//!     }
//!
//!     fn validate(&mut self) {
//!         self.state.validate_presence("username", None);
//!         self.state.validate_length("username", LengthRule::new().min(2).max(64));
//!         self.state.validate_email_format("email", None);
//!     }
//!
//!     fn perform(&mut self) -> Result<Value, ValidationError> {
//!         Ok(Value::map(self.state.attributes()))
//!     }
//! }
//!
//! let schema = Arc::new(
//!     Schema::builder()
//!         .attribute("username", AttributeOptions::string())
//!         .attribute("email", AttributeOptions::string())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let input = Value::map([("username", " weijie "), ("email", "w@example.com")]);
//! let mut form = SignUp { state: FormState::new(schema, input).unwrap() };
//! let created = form.perform_and_validate().unwrap();
//! assert_eq!(created.get("username"), Some(&Value::from("weijie")));
//! ```

mod errors;
mod schema;
mod state;
mod validate;

pub mod extensions;

pub use errors::{ErrorToken, ErrorTree, FormError, ResourceErrorTree, ValidationError};
pub use extensions::changes::{ChangeContext, ChangePredicate};
pub use extensions::resources::ResourceId;
pub use schema::{
    AttributeDefinition, AttributeOptions, DefaultFn, DefaultValue, ReaderKind, Schema,
    SchemaBuilder, WatchChanges, WriteStep,
};
pub use state::FormState;
pub use validate::{DecimalRule, Form, LengthRule, RangeRule};
