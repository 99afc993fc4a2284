//! Built-in validators and the guarded perform lifecycle.
//!
//! Validators never fail and never short-circuit each other: each one
//! fetches its target through the current-resource accessor (so resource
//! scoping redirects it transparently), checks one property, and appends
//! an identifier to the error tree when the property does not hold. The
//! default identifier is validator-specific and overridable per call.
//!
//! The [`Form`] trait ties it together: `valid()` clears the trees, runs
//! the form's `validate` hook, and checks for errors;
//! [`Form::perform_and_validate`] runs the user's action only when
//! validation passed, absorbing nested validation failures so they surface
//! uniformly from the outer call.

use intake_core::{Format, Value};
use regex::Regex;
use tracing::debug;

use crate::errors::{ErrorToken, ErrorTree, FormError, ResourceErrorTree, ValidationError};
use crate::extensions::resources::ResourceId;
use crate::state::FormState;

/// Bounds for [`FormState::validate_length`]. Both bounds are checked
/// independently, min before max, so contradictory bounds append both
/// identifiers.
#[derive(Debug, Clone, Default)]
pub struct LengthRule {
    min: Option<usize>,
    max: Option<usize>,
    allow_blank: bool,
    min_message: Option<ErrorToken>,
    max_message: Option<ErrorToken>,
}

impl LengthRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Skip the check entirely when the value is blank.
    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    pub fn min_message(mut self, message: impl Into<ErrorToken>) -> Self {
        self.min_message = Some(message.into());
        self
    }

    pub fn max_message(mut self, message: impl Into<ErrorToken>) -> Self {
        self.max_message = Some(message.into());
        self
    }
}

/// Bounds for [`FormState::validate_range`]. Checked independently like
/// [`LengthRule`].
#[derive(Debug, Clone, Default)]
pub struct RangeRule {
    min: Option<f64>,
    max: Option<f64>,
    min_message: Option<ErrorToken>,
    max_message: Option<ErrorToken>,
}

impl RangeRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn min_message(mut self, message: impl Into<ErrorToken>) -> Self {
        self.min_message = Some(message.into());
        self
    }

    pub fn max_message(mut self, message: impl Into<ErrorToken>) -> Self {
        self.max_message = Some(message.into());
        self
    }
}

/// Bounds for [`FormState::validate_decimal_places`]. A bound of zero
/// disables that side of the check.
#[derive(Debug, Clone, Default)]
pub struct DecimalRule {
    min: u32,
    max: u32,
    min_message: Option<ErrorToken>,
    max_message: Option<ErrorToken>,
}

impl DecimalRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: u32) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    pub fn min_message(mut self, message: impl Into<ErrorToken>) -> Self {
        self.min_message = Some(message.into());
        self
    }

    pub fn max_message(mut self, message: impl Into<ErrorToken>) -> Self {
        self.max_message = Some(message.into());
        self
    }
}

impl FormState {
    /// The flat error tree.
    pub fn errors(&self) -> &ErrorTree {
        &self.errors
    }

    /// The resource-scoped error tree.
    pub fn resource_errors(&self) -> &ResourceErrorTree {
        &self.resource_errors
    }

    /// Clears both error trees.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.resource_errors.clear();
    }

    /// Appends an error for an attribute. While a resource scope is
    /// active, the error lands in the resource tree under the active
    /// namespace and identifier instead of the flat tree.
    pub fn append_error(&mut self, attribute: &str, token: impl Into<ErrorToken>) {
        let target = self
            .scope
            .as_ref()
            .map(|scope| (scope.namespace.clone(), scope.error_key()));
        match target {
            Some((namespace, id)) => {
                self.resource_errors
                    .append(&namespace, &id, attribute, token.into());
            }
            None => self.errors.append(Some(attribute), token.into()),
        }
    }

    /// Appends a whole-object error. Always lands in the flat tree.
    pub fn append_base_error(&mut self, token: impl Into<ErrorToken>) {
        self.errors.append(None, token.into());
    }

    /// Whether the attribute has errors in the currently targeted tree.
    pub fn attribute_has_errors(&self, attribute: &str) -> bool {
        match &self.scope {
            Some(scope) => !self
                .resource_errors
                .attribute_errors(&scope.namespace, &scope.error_key(), attribute)
                .is_empty(),
            None => !self.errors.get(attribute).is_empty(),
        }
    }

    /// True if either tree holds any error.
    pub fn any_errors(&self) -> bool {
        self.errors.any() || self.resource_errors.any()
    }

    /// The value a validator should check: the attribute itself, or —
    /// while a resource scope is active — the corresponding field of the
    /// scoped element inside the collection attribute.
    pub fn current_attribute_value(&self, attribute: &str) -> Value {
        match &self.scope {
            None => self.get(attribute),
            Some(scope) => {
                let collection = self.get(&scope.namespace);
                let element = match &scope.id {
                    ResourceId::Index(i) => collection.index(*i).cloned().unwrap_or(Value::Nil),
                    ResourceId::Key(key) => collection.get(key).cloned().unwrap_or(Value::Nil),
                };
                element.get(attribute).cloned().unwrap_or(Value::Nil)
            }
        }
    }

    /// Replaces both trees with a nested failure's trees.
    pub fn absorb(&mut self, failure: &ValidationError) {
        self.errors = failure.errors.clone();
        self.resource_errors = failure.resource_errors.clone();
    }

    /// Snapshots both trees into a failure payload.
    pub fn validation_error(&self) -> ValidationError {
        ValidationError::new(self.errors.clone(), self.resource_errors.clone())
    }

    /// `cant_be_empty` when the value is falsy or blank after string
    /// coercion. Collections pass even when empty.
    pub fn validate_presence(
        &mut self,
        attribute: &str,
        message: impl Into<Option<ErrorToken>>,
    ) {
        let value = self.current_attribute_value(attribute);
        let blank_string = value.as_str().is_some_and(|s| s.trim().is_empty());
        if !value.truthy() || blank_string {
            self.append_error(
                attribute,
                message.into().unwrap_or(ErrorToken::CantBeEmpty),
            );
        }
    }

    /// `is_invalid` when the value is present and its text form does not
    /// match the pattern.
    pub fn validate_format(
        &mut self,
        attribute: &str,
        format: &Regex,
        message: impl Into<Option<ErrorToken>>,
    ) {
        let value = self.current_attribute_value(attribute);
        if !value.truthy() {
            return;
        }
        if !format.is_match(&value.stringify()) {
            self.append_error(attribute, message.into().unwrap_or(ErrorToken::IsInvalid));
        }
    }

    /// [`validate_format`](Self::validate_format) against the email
    /// pattern.
    pub fn validate_email_format(
        &mut self,
        attribute: &str,
        message: impl Into<Option<ErrorToken>>,
    ) {
        self.validate_format(attribute, Format::Email.regex(), message);
    }

    /// [`validate_format`](Self::validate_format) against the alphanumeric
    /// code pattern.
    pub fn validate_code_format(
        &mut self,
        attribute: &str,
        message: impl Into<Option<ErrorToken>>,
    ) {
        self.validate_format(attribute, Format::Code.regex(), message);
    }

    /// [`validate_format`](Self::validate_format) against the hex color
    /// pattern.
    pub fn validate_color_format(
        &mut self,
        attribute: &str,
        message: impl Into<Option<ErrorToken>>,
    ) {
        self.validate_format(attribute, Format::HexColor.regex(), message);
    }

    /// `is_too_short` / `is_too_long` against the size of a sized value.
    /// Both bounds are independent; contradictory bounds append both.
    pub fn validate_length(&mut self, attribute: &str, rule: LengthRule) {
        let value = self.current_attribute_value(attribute);
        if rule.allow_blank && value.blank() {
            return;
        }
        let Some(length) = value.size() else {
            return;
        };

        if let Some(min) = rule.min {
            if length < min {
                self.append_error(
                    attribute,
                    rule.min_message.clone().unwrap_or(ErrorToken::IsTooShort),
                );
            }
        }
        if let Some(max) = rule.max {
            if length > max {
                self.append_error(
                    attribute,
                    rule.max_message.clone().unwrap_or(ErrorToken::IsTooLong),
                );
            }
        }
    }

    /// `isnt_listed` when the value is present and not in the list.
    pub fn validate_inclusion(
        &mut self,
        attribute: &str,
        list: &[Value],
        message: impl Into<Option<ErrorToken>>,
    ) {
        let value = self.current_attribute_value(attribute);
        if value.truthy() && !list.contains(&value) {
            self.append_error(attribute, message.into().unwrap_or(ErrorToken::IsntListed));
        }
    }

    /// Checks each element of a collection value against the list,
    /// stopping at the first non-member — one error, not one per
    /// violation.
    pub fn validate_inclusion_of_each(
        &mut self,
        attribute: &str,
        list: &[Value],
        message: impl Into<Option<ErrorToken>>,
    ) {
        let value = self.current_attribute_value(attribute);
        let elements: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Map(entries) => entries.into_iter().map(|(_, v)| v).collect(),
            _ => return,
        };
        if let Some(element) = elements.iter().find(|element| !list.contains(element)) {
            let token = message.into().unwrap_or_else(|| {
                ErrorToken::Text(format!("{} isn't listed", element.stringify()))
            });
            self.append_error(attribute, token);
        }
    }

    /// `less_than_min` / `greater_than_max` for numeric values. Absent and
    /// non-numeric values are skipped.
    pub fn validate_range(&mut self, attribute: &str, rule: RangeRule) {
        let value = self.current_attribute_value(attribute);
        let Some(number) = value.as_f64() else {
            return;
        };

        if let Some(min) = rule.min {
            if number < min {
                self.append_error(
                    attribute,
                    rule.min_message.clone().unwrap_or(ErrorToken::LessThanMin),
                );
            }
        }
        if let Some(max) = rule.max {
            if number > max {
                self.append_error(
                    attribute,
                    rule.max_message.clone().unwrap_or(ErrorToken::GreaterThanMax),
                );
            }
        }
    }

    /// Bounds the number of digits after the first `.` in the value's text
    /// form. A zero bound disables that side.
    pub fn validate_decimal_places(&mut self, attribute: &str, rule: DecimalRule) {
        let value = self.current_attribute_value(attribute);
        if value.is_nil() {
            return;
        }
        let text = value.stringify();
        let decimal_places = text
            .split_once('.')
            .map_or(0, |(_, fraction)| fraction.chars().count());

        if rule.max > 0 && decimal_places > rule.max as usize {
            self.append_error(
                attribute,
                rule.max_message
                    .clone()
                    .unwrap_or(ErrorToken::TooManyDecimalPlaces),
            );
        }
        if rule.min > 0 && decimal_places < rule.min as usize {
            self.append_error(
                attribute,
                rule.min_message
                    .clone()
                    .unwrap_or(ErrorToken::TooFewDecimalPlaces),
            );
        }
    }

    /// `is_duplicated` when the caller's predicate says the value is not
    /// unique.
    pub fn validate_uniqueness(
        &mut self,
        attribute: &str,
        unique: impl FnOnce(&Value) -> bool,
        message: impl Into<Option<ErrorToken>>,
    ) {
        let value = self.current_attribute_value(attribute);
        if !unique(&value) {
            self.append_error(attribute, message.into().unwrap_or(ErrorToken::IsDuplicated));
        }
    }

    /// `is_invalid` when the value's declared media-type prefix (the text
    /// before `/`) is not in the allowed list.
    pub fn validate_filetype(
        &mut self,
        attribute: &str,
        allowed: &[&str],
        message: impl Into<Option<ErrorToken>>,
    ) {
        let value = self.current_attribute_value(attribute);
        if !value.truthy() {
            return;
        }
        let prefix = match &value {
            Value::File(upload) => upload.media_type_prefix().unwrap_or("").to_string(),
            other => {
                let declared = other.get("type").map(Value::stringify).unwrap_or_default();
                declared.split('/').next().unwrap_or("").to_string()
            }
        };
        if !allowed.contains(&prefix.as_str()) {
            self.append_error(attribute, message.into().unwrap_or(ErrorToken::IsInvalid));
        }
    }
}

/// A validated, guarded action over a [`FormState`].
///
/// Implementors override [`validate`](Form::validate) to call the built-in
/// validators (or append errors directly) and [`perform`](Form::perform)
/// to run the action. Callers use [`valid`](Form::valid) or
/// [`perform_and_validate`](Form::perform_and_validate).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use intake_core::Value;
/// use intake_form::{AttributeOptions, Form, FormState, Schema, ValidationError};
///
/// struct LogIn {
///     state: FormState,
/// }
///
/// impl Form for LogIn {
///     type Output = String;
///
///     fn state(&self) -> &FormState {
///         &self.state
///     }
///
///     fn state_mut(&mut self) -> &mut FormState {
///         &mut self.state
///     }
///
///     fn validate(&mut self) {
///         self.state.validate_presence("username", None);
///         self.state.validate_presence("password", None);
///     }
///
///     fn perform(&mut self) -> Result<String, ValidationError> {
///         Ok(format!("logged in as {}", self.state.get("username").stringify()))
///     }
/// }
///
/// let schema = Arc::new(
///     Schema::builder()
///         .attribute("username", AttributeOptions::string())
///         .attribute("password", AttributeOptions::string())
///         .build()
///         .unwrap(),
/// );
///
/// let input = Value::map([("username", "weijie"), ("password", "hunter2")]);
/// let mut form = LogIn { state: FormState::new(Arc::clone(&schema), input).unwrap() };
/// assert_eq!(form.perform_and_validate().unwrap(), "logged in as weijie");
///
/// let mut form = LogIn { state: FormState::new(schema, Value::Nil).unwrap() };
/// let failure = form.perform_and_validate().unwrap_err();
/// assert!(!failure.errors.get("username").is_empty());
/// ```
pub trait Form {
    /// What a successful `perform` returns.
    type Output;

    fn state(&self) -> &FormState;

    fn state_mut(&mut self) -> &mut FormState;

    /// Validation hook; a no-op by default. Implementations call the
    /// built-in validators against `self.state_mut()`.
    fn validate(&mut self) {}

    /// The guarded action. Returning a [`ValidationError`] (typically from
    /// a nested form's `perform_and_validate`) propagates those errors
    /// into this form's trees.
    fn perform(&mut self) -> Result<Self::Output, ValidationError>;

    /// Clears the error trees, runs [`validate`](Form::validate), and
    /// reports whether any errors were recorded.
    fn valid(&mut self) -> bool {
        self.state_mut().clear_errors();
        self.validate();
        !self.state().any_errors()
    }

    /// Validates, performs when valid, and signals a single
    /// [`ValidationError`] carrying both trees if anything failed —
    /// including failures a nested validated action raised during
    /// `perform`, which are absorbed first.
    fn perform_and_validate(&mut self) -> Result<Self::Output, ValidationError> {
        let mut returned = None;
        if self.valid() {
            match self.perform() {
                Ok(result) => returned = Some(result),
                Err(nested) => {
                    self.state_mut().absorb(&nested);
                    debug!("perform raised a nested validation failure");
                    return Err(self.state().validation_error());
                }
            }
        }

        if self.state().any_errors() {
            debug!("form failed validation");
            return Err(self.state().validation_error());
        }
        match returned {
            Some(result) => Ok(result),
            // Unreachable: no errors implies valid() passed and perform ran.
            None => Err(self.state().validation_error()),
        }
    }
}
