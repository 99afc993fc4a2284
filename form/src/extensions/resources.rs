//! Resource-scoped validation: pointing the built-in validators at items
//! inside a collection attribute, as if each item were its own object.
//!
//! While a scope is active, the current-attribute-value lookup indexes
//! into the named collection attribute and error appends land in the
//! three-level resource tree instead of the flat one. Scopes are acquired
//! through [`FormState::with_resource`], which restores the previous
//! (absent) scope when the callback returns. Nested scopes are not
//! supported: an inner `with_resource` fully replaces the outer scope for
//! its duration, and relying on stacking is outside the contract.

use intake_core::Value;
use tracing::debug;

use crate::errors::ErrorToken;
use crate::state::FormState;

/// Which element of a collection attribute a scope targets: a position in
/// a sequence, or a key of a keyed mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    Index(usize),
    Key(String),
}

impl From<usize> for ResourceId {
    fn from(index: usize) -> Self {
        ResourceId::Index(index)
    }
}

impl From<&str> for ResourceId {
    fn from(key: &str) -> Self {
        ResourceId::Key(key.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(key: String) -> Self {
        ResourceId::Key(key)
    }
}

/// The active scope: namespace (collection attribute name), target
/// element, and the offset applied to positional error keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResourceScope {
    pub(crate) namespace: String,
    pub(crate) id: ResourceId,
    pub(crate) offset: usize,
}

impl ResourceScope {
    /// The stringified identifier errors are recorded under: position plus
    /// offset for sequences, the original key for keyed mappings.
    pub(crate) fn error_key(&self) -> String {
        match &self.id {
            ResourceId::Index(index) => (index + self.offset).to_string(),
            ResourceId::Key(key) => key.clone(),
        }
    }
}

impl FormState {
    /// Runs `f` with validation scoped to one element of the collection
    /// attribute `namespace`: attribute reads resolve against that
    /// element, and error appends land in the resource tree under the
    /// element's identifier (offset applied for positional ids).
    ///
    /// The previous scope is restored when `f` returns. Scopes do not
    /// nest; an inner call replaces the scope for its duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use intake_core::{AttributeType, TypeOptions, Value};
    /// use intake_form::{AttributeOptions, FormState, Schema};
    ///
    /// let schema = Arc::new(
    ///     Schema::builder()
    ///         .attribute(
    ///             "items",
    ///             AttributeOptions::array().type_options(
    ///                 TypeOptions::new().element_type(AttributeType::Hash),
    ///             ),
    ///         )
    ///         .build()
    ///         .unwrap(),
    /// );
    /// let input = Value::map([("items", Value::array([Value::map([("name", "")])]))]);
    /// let mut state = FormState::new(schema, input).unwrap();
    ///
    /// state.with_resource("items", 0, 0, |state| {
    ///     state.validate_presence("name", None);
    /// });
    ///
    /// assert!(state.resource_attribute_has_errors("items", 0, "name"));
    /// assert!(state.errors().get("name").is_empty());
    /// ```
    pub fn with_resource<R>(
        &mut self,
        namespace: &str,
        id: impl Into<ResourceId>,
        offset: usize,
        f: impl FnOnce(&mut FormState) -> R,
    ) -> R {
        let scope = ResourceScope {
            namespace: namespace.to_string(),
            id: id.into(),
            offset,
        };
        debug!(namespace, id = %scope.error_key(), "entering resource scope");
        let previous = self.scope.replace(scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    /// Iterates a collection attribute, scoping each element in turn.
    ///
    /// `f` receives `(state, element, effective_key, positional_index)`.
    /// For sequences the effective key is `positional_index + offset`; for
    /// keyed mappings it is the original key and the offset is ignored.
    /// Non-collection values iterate zero times.
    pub fn with_each_resource<F>(&mut self, namespace: &str, offset: usize, mut f: F)
    where
        F: FnMut(&mut FormState, Value, Value, usize),
    {
        match self.get(namespace) {
            Value::Array(items) => {
                for (index, element) in items.into_iter().enumerate() {
                    let effective_key = Value::Int((index + offset) as i64);
                    self.with_resource(namespace, index, offset, |state| {
                        f(state, element, effective_key, index);
                    });
                }
            }
            Value::Map(entries) => {
                for (index, (key, element)) in entries.into_iter().enumerate() {
                    let id = ResourceId::Key(key.stringify());
                    self.with_resource(namespace, id, 0, |state| {
                        f(state, element, key, index);
                    });
                }
            }
            _ => {}
        }
    }

    /// Appends an error for one attribute of one resource directly,
    /// without an active scope.
    pub fn append_resource_error(
        &mut self,
        namespace: &str,
        id: impl ToString,
        attribute: &str,
        token: impl Into<ErrorToken>,
    ) {
        self.resource_errors
            .append(namespace, &id.to_string(), attribute, token.into());
    }

    /// Whether one resource has errors on any attribute.
    pub fn resource_has_errors(&self, namespace: &str, id: impl ToString) -> bool {
        self.resource_errors.resource_any(namespace, &id.to_string())
    }

    /// Whether one attribute of one resource has errors.
    pub fn resource_attribute_has_errors(
        &self,
        namespace: &str,
        id: impl ToString,
        attribute: &str,
    ) -> bool {
        !self
            .resource_errors
            .attribute_errors(namespace, &id.to_string(), attribute)
            .is_empty()
    }

    /// Whether any resource in any namespace has errors.
    pub fn any_resource_errors(&self) -> bool {
        self.resource_errors.any()
    }
}
