//! Per-instance attribute storage and the write pipeline.
//!
//! A [`FormState`] is one schema-shaped record: current values, the set of
//! names that were explicitly provided, and the error/changed-flag state
//! the validation and change-tracking layers maintain. Every external
//! write runs the attribute's compiled pipeline (coerce → store → track
//! changes); reads never re-coerce and never mutate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use intake_core::{Value, coerce};
use tracing::debug;

use crate::errors::{ErrorTree, FormError, ResourceErrorTree};
use crate::extensions::resources::ResourceScope;
use crate::schema::{AttributeDefinition, DefaultValue, ReaderKind, Schema, WriteStep};

/// One instance of a schema: values, provided-name tracking, and the
/// error state validation accumulates into.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use intake_core::Value;
/// use intake_form::{AttributeOptions, FormState, Schema};
///
/// let schema = Arc::new(
///     Schema::builder()
///         .attribute("email", AttributeOptions::string())
///         .attribute("age", AttributeOptions::integer())
///         .build()
///         .unwrap(),
/// );
///
/// let input = Value::map([("email", " X@Y.com "), ("age", "30")]);
/// let state = FormState::new(schema, input).unwrap();
///
/// assert_eq!(state.get("email"), Value::from("X@Y.com"));
/// assert_eq!(state.get("age"), Value::Int(30));
/// ```
#[derive(Debug, Clone)]
pub struct FormState {
    schema: Arc<Schema>,
    pub(crate) values: Vec<Value>,
    provided: HashSet<String>,
    pub(crate) errors: ErrorTree,
    pub(crate) changed: HashMap<String, bool>,
    pub(crate) resource_errors: ResourceErrorTree,
    pub(crate) scope: Option<ResourceScope>,
}

impl FormState {
    /// Constructs an instance from raw input.
    ///
    /// Non-map input leaves every attribute at its default. Map input is
    /// matched by stringified key against each declared attribute, in
    /// declaration order; present keys mark the attribute as provided.
    ///
    /// # Errors
    ///
    /// [`FormError::RequiredAttribute`] when a required attribute resolves
    /// to nil and no default is configured.
    pub fn new(schema: Arc<Schema>, input: impl Into<Value>) -> Result<Self, FormError> {
        let mut state = Self {
            values: vec![Value::Nil; schema.len()],
            schema,
            provided: HashSet::new(),
            errors: ErrorTree::new(),
            changed: HashMap::new(),
            resource_errors: ResourceErrorTree::new(),
            scope: None,
        };
        state.set_attributes(input)?;
        Ok(state)
    }

    /// Rewrites every declared attribute from raw input — including ones
    /// the input does not mention, which reset to nil (and so read as
    /// their default). Non-map input is a no-op.
    pub fn set_attributes(&mut self, input: impl Into<Value>) -> Result<(), FormError> {
        let input = input.into();
        if input.as_map().is_none() {
            return Ok(());
        }

        let schema = Arc::clone(&self.schema);
        for (index, def) in schema.attributes().iter().enumerate() {
            let mut value = Value::Nil;
            if let Some(raw) = input.get(&def.name) {
                self.provided.insert(def.name.clone());
                value = raw.clone();
            }
            if value.is_nil() && def.required && def.default.is_none() {
                return Err(FormError::RequiredAttribute {
                    name: def.name.clone(),
                });
            }
            self.write(index, value)?;
        }
        debug!(provided = self.provided.len(), "attributes assigned");
        Ok(())
    }

    /// External write: marks the attribute provided, then runs its write
    /// pipeline.
    ///
    /// # Errors
    ///
    /// [`FormError::UnknownAttribute`] for names the schema never
    /// declared.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), FormError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| FormError::UnknownAttribute {
                name: name.to_string(),
            })?;
        self.provided.insert(name.to_string());
        self.write(index, value.into())
    }

    /// Runs the attribute's compiled pipeline in order. Coercion happens
    /// at most once per write; change tracking runs after the store so it
    /// sees the final value.
    fn write(&mut self, index: usize, raw: Value) -> Result<(), FormError> {
        let schema = Arc::clone(&self.schema);
        let def = &schema.attributes()[index];

        let mut value = raw;
        for step in &def.write_steps {
            match step {
                WriteStep::Coerce => {
                    if let Some(ty) = def.ty {
                        value = coerce(ty, value, &def.options);
                    }
                }
                WriteStep::Store => {
                    self.values[index] = std::mem::take(&mut value);
                }
                WriteStep::TrackChanges => {
                    self.track_change(index)?;
                }
            }
        }
        Ok(())
    }

    /// Reads an attribute.
    ///
    /// Generated readers fall back to the configured default when the
    /// stored value is nil — computed defaults are evaluated against the
    /// instance on each read and never stored back. Reader-skipped
    /// attributes read raw storage. Undeclared names read as nil.
    pub fn get(&self, name: &str) -> Value {
        let Some(index) = self.schema.index_of(name) else {
            return Value::Nil;
        };
        let def = &self.schema.attributes()[index];
        let stored = &self.values[index];

        if def.reader == ReaderKind::Skipped {
            return stored.clone();
        }
        if stored.is_nil() {
            if let Some(default) = &def.default {
                return match default {
                    DefaultValue::Literal(value) => value.clone(),
                    DefaultValue::Computed(compute) => compute(self),
                };
            }
        }
        stored.clone()
    }

    /// Boolean predicate reader: the attribute's truthiness.
    pub fn truthy(&self, name: &str) -> bool {
        self.get(name).truthy()
    }

    /// Every non-skipped attribute with its current read value, in
    /// declaration order.
    pub fn attributes(&self) -> Vec<(String, Value)> {
        self.collect(|def| !def.skip)
    }

    /// Every attribute, skipped ones included.
    pub fn all_attributes(&self) -> Vec<(String, Value)> {
        self.collect(|_| true)
    }

    /// Non-skipped attributes that were explicitly provided through some
    /// write path — a provided nil counts, a never-set attribute does not.
    pub fn provided_attributes(&self) -> Vec<(String, Value)> {
        self.collect(|def| !def.skip && self.provided.contains(&def.name))
    }

    fn collect(&self, keep: impl Fn(&AttributeDefinition) -> bool) -> Vec<(String, Value)> {
        self.schema
            .attributes()
            .iter()
            .filter(|def| keep(def))
            .map(|def| (def.name.clone(), self.get(&def.name)))
            .collect()
    }

    /// Whether the attribute was explicitly provided via any write path.
    pub fn attribute_provided(&self, name: &str) -> bool {
        self.provided.contains(name)
    }

    /// The backing record, when the schema declares one; nil otherwise.
    pub fn record(&self) -> Value {
        self.schema
            .record_attribute()
            .map_or(Value::Nil, |name| self.get(name))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
