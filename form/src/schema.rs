//! Attribute declaration, per-type option overlays, and schema inheritance.
//!
//! A [`Schema`] is the compiled, immutable description of a form: an
//! ordered list of attribute definitions plus the per-type default option
//! overlays they were merged with. Schemas are built once (typically into a
//! `static`) through [`SchemaBuilder`], which defers all declaration-time
//! checks to [`SchemaBuilder::build`] — name conflicts, impossible type
//! specs, and change tracking without a comparison basis all fail there,
//! never at first use.
//!
//! Branching a schema with [`Schema::to_builder`] copies its maps at branch
//! time: a subtype's later declarations never leak into the parent, and
//! vice versa.
//!
//! # Examples
//!
//! ```
//! use intake_core::AttributeType;
//! use intake_form::{AttributeOptions, Schema};
//!
//! let schema = Schema::builder()
//!     .attribute("email", AttributeOptions::string())
//!     .attribute("age", AttributeOptions::integer().required())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.len(), 2);
//! assert_eq!(schema.attribute("age").unwrap().ty, Some(AttributeType::Integer));
//! ```

use std::fmt;

use intake_core::{AttributeType, TypeOptions, TypeSpec, Value};

use crate::errors::FormError;
use crate::extensions::changes::ChangePredicate;
use crate::state::FormState;

/// Reader names the engine itself occupies. Declaring an attribute with one
/// of these names shadows engine behavior, so it needs an explicit opt-out.
const RESERVED_READERS: &[&str] = &[
    "record",
    "attributes",
    "all_attributes",
    "provided_attributes",
    "errors",
    "resource_errors",
    "changes",
];

/// A computed default, evaluated against the instance on read.
pub type DefaultFn = fn(&FormState) -> Value;

/// An attribute's default: a literal value, or a computation bound to the
/// instance. Computed defaults are re-evaluated on every read of an unset
/// attribute; neither form is ever stored back.
#[derive(Clone, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    Computed(DefaultFn),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// How an attribute's changed flag is computed after each write.
#[derive(Clone, PartialEq)]
pub enum WatchChanges {
    /// Compare against the declared record's corresponding field.
    AgainstRecord,
    /// Ask a predicate, which may also mark sibling attributes.
    With(ChangePredicate),
}

impl fmt::Debug for WatchChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchChanges::AgainstRecord => f.write_str("AgainstRecord"),
            WatchChanges::With(_) => f.write_str("With(..)"),
        }
    }
}

/// How reads of an attribute behave, decided at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// The engine's generated reader: stored value, falling back to the
    /// default when unset.
    Generated,
    /// No generated reader; the embedding type keeps its own accessor, and
    /// engine reads return raw storage with no default evaluation.
    Skipped,
    /// A generated reader that explicitly replaces a pre-existing one.
    Overridden,
}

/// One step of an attribute's write pipeline, assembled once at build time
/// and executed in order on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    /// Coerce the incoming value to the declared type.
    Coerce,
    /// Store the value on the instance.
    Store,
    /// Recompute the changed flag from the stored value.
    TrackChanges,
}

/// Declaration-time options for one attribute.
///
/// Constructed per declared type ([`AttributeOptions::string`] and
/// friends, or [`AttributeOptions::new`] for an untyped attribute), then
/// refined with the builder methods.
///
/// # Examples
///
/// ```
/// use intake_core::TypeOptions;
/// use intake_form::AttributeOptions;
///
/// let options = AttributeOptions::string()
///     .required()
///     .type_options(TypeOptions::new().upcase(true));
/// ```
#[derive(Debug, Clone)]
pub struct AttributeOptions {
    ty: Option<AttributeType>,
    default: Option<DefaultValue>,
    required: bool,
    skip: bool,
    skip_reader: bool,
    override_reader: bool,
    record: bool,
    watch_changes: Option<WatchChanges>,
    options: TypeOptions,
}

impl AttributeOptions {
    /// An untyped attribute: stored as given, no coercion.
    pub fn new() -> Self {
        Self {
            ty: None,
            default: None,
            required: false,
            skip: false,
            skip_reader: false,
            override_reader: false,
            record: false,
            watch_changes: None,
            options: TypeOptions::default(),
        }
    }

    /// An attribute of the given declared type.
    pub fn typed(ty: AttributeType) -> Self {
        Self {
            ty: Some(ty),
            ..Self::new()
        }
    }

    pub fn string() -> Self {
        Self::typed(AttributeType::String)
    }

    pub fn boolean() -> Self {
        Self::typed(AttributeType::Boolean)
    }

    pub fn integer() -> Self {
        Self::typed(AttributeType::Integer)
    }

    pub fn float() -> Self {
        Self::typed(AttributeType::Float)
    }

    pub fn array() -> Self {
        Self::typed(AttributeType::Array)
    }

    pub fn hash() -> Self {
        Self::typed(AttributeType::Hash)
    }

    pub fn date() -> Self {
        Self::typed(AttributeType::Date)
    }

    pub fn time() -> Self {
        Self::typed(AttributeType::Time)
    }

    pub fn file() -> Self {
        Self::typed(AttributeType::File)
    }

    pub fn phone() -> Self {
        Self::typed(AttributeType::Phone)
    }

    /// Constructing without a value (and without a default) fails.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Exclude from the default `attributes()` enumeration while still
    /// allowing reads and writes.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Keep a pre-existing reader instead of generating one.
    pub fn skip_reader(mut self) -> Self {
        self.skip_reader = true;
        self
    }

    /// Replace a pre-existing reader with the generated one.
    pub fn override_reader(mut self) -> Self {
        self.override_reader = true;
        self
    }

    /// A literal default, returned when the stored value is nil.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// A computed default, evaluated against the instance on each read.
    pub fn default_with(mut self, default: DefaultFn) -> Self {
        self.default = Some(DefaultValue::Computed(default));
        self
    }

    /// Track changes by comparing against the declared record.
    pub fn watch_changes(mut self) -> Self {
        self.watch_changes = Some(WatchChanges::AgainstRecord);
        self
    }

    /// Track changes with a custom predicate over the new value.
    pub fn watch_changes_with(mut self, predicate: ChangePredicate) -> Self {
        self.watch_changes = Some(WatchChanges::With(predicate));
        self
    }

    /// Per-type coercion options; merged over the schema's overlay for the
    /// declared type at build time (explicit fields win).
    pub fn type_options(mut self, options: TypeOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for AttributeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled attribute definition, owned by its schema.
#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    pub name: String,
    pub ty: Option<AttributeType>,
    pub default: Option<DefaultValue>,
    pub required: bool,
    pub skip: bool,
    pub record: bool,
    pub watch_changes: Option<WatchChanges>,
    /// Type options after the overlay merge.
    pub options: TypeOptions,
    pub reader: ReaderKind,
    /// The write pipeline, in execution order.
    pub write_steps: Vec<WriteStep>,
}

impl AttributeDefinition {
    fn to_options(&self) -> AttributeOptions {
        AttributeOptions {
            ty: self.ty,
            default: self.default.clone(),
            required: self.required,
            skip: self.skip,
            skip_reader: self.reader == ReaderKind::Skipped,
            override_reader: self.reader == ReaderKind::Overridden,
            record: self.record,
            watch_changes: self.watch_changes.clone(),
            options: self.options.clone(),
        }
    }
}

/// A compiled, immutable form schema.
#[derive(Debug, Clone)]
pub struct Schema {
    attributes: Vec<AttributeDefinition>,
    default_type_options: Vec<(AttributeType, TypeOptions)>,
    reserved: Vec<String>,
    record_attribute: Option<String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Branches this schema: the returned builder starts from copies of
    /// this schema's declarations and overlays. Changes on either side
    /// after the branch do not propagate to the other.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_form::{AttributeOptions, Schema};
    ///
    /// let parent = Schema::builder()
    ///     .attribute("name", AttributeOptions::string())
    ///     .build()
    ///     .unwrap();
    ///
    /// let child = parent
    ///     .to_builder()
    ///     .attribute("nickname", AttributeOptions::string())
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(parent.len(), 1);
    /// assert_eq!(child.len(), 2);
    /// ```
    pub fn to_builder(&self) -> SchemaBuilder {
        SchemaBuilder {
            attributes: self
                .attributes
                .iter()
                .map(|def| (def.name.clone(), def.to_options()))
                .collect(),
            default_type_options: self.default_type_options.clone(),
            reserved: self.reserved.clone(),
        }
    }

    /// All definitions, in declaration order.
    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    /// Looks up a definition by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|def| def.name == name)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|def| def.name == name)
    }

    /// The attribute the `record` accessor aliases, if one was declared.
    pub fn record_attribute(&self) -> Option<&str> {
        self.record_attribute.as_deref()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Accumulates declarations, then compiles them into a [`Schema`].
///
/// The chain itself never fails; every declaration-time error is reported
/// by [`SchemaBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    attributes: Vec<(String, AttributeOptions)>,
    default_type_options: Vec<(AttributeType, TypeOptions)>,
    reserved: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an attribute. Redeclaring a name replaces its definition in
    /// place, preserving the declaration order of the other attributes.
    pub fn attribute(mut self, name: &str, options: AttributeOptions) -> Self {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = options,
            None => self.attributes.push((name.to_string(), options)),
        }
        self
    }

    /// Declares the form's backing record: a skipped attribute whose reader
    /// the `record()` accessor aliases. Change tracking compares against
    /// it by default.
    pub fn record(self, name: &str, options: AttributeOptions) -> Self {
        let mut options = options.skip();
        options.record = true;
        self.attribute(name, options)
    }

    /// Registers a default option overlay for every attribute of the given
    /// type. Explicitly declared options win over the overlay per field.
    pub fn default_type_options(mut self, ty: AttributeType, options: TypeOptions) -> Self {
        match self.default_type_options.iter_mut().find(|(t, _)| *t == ty) {
            Some((_, existing)) => *existing = options,
            None => self.default_type_options.push((ty, options)),
        }
        self
    }

    /// Marks a reader name as already taken by the embedding type.
    /// Declaring an attribute with that name then requires `skip_reader`
    /// or `override_reader`.
    pub fn reserve(mut self, name: &str) -> Self {
        self.reserved.push(name.to_string());
        self
    }

    /// Compiles the declarations, running every declaration-time check.
    ///
    /// # Errors
    ///
    /// [`FormError::NameConflict`] when an attribute name collides with a
    /// reserved reader and neither opt-out flag is set;
    /// [`FormError::Configuration`] for change tracking without a record
    /// and for type specs that cannot apply.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_form::{AttributeOptions, FormError, Schema};
    ///
    /// let err = Schema::builder()
    ///     .attribute("errors", AttributeOptions::string())
    ///     .build()
    ///     .unwrap_err();
    /// assert!(matches!(err, FormError::NameConflict { .. }));
    ///
    /// let ok = Schema::builder()
    ///     .attribute("errors", AttributeOptions::string().skip_reader())
    ///     .build();
    /// assert!(ok.is_ok());
    /// ```
    pub fn build(self) -> Result<Schema, FormError> {
        let mut compiled = Vec::with_capacity(self.attributes.len());
        let mut record_attribute = None;

        for (name, declared) in &self.attributes {
            let reserved = RESERVED_READERS.contains(&name.as_str())
                || self.reserved.iter().any(|r| r == name);
            if reserved && !declared.skip_reader && !declared.override_reader {
                return Err(FormError::NameConflict { name: name.clone() });
            }

            validate_type_options(name, &declared.options)?;

            if declared.record {
                record_attribute = Some(name.clone());
            }

            let overlay = declared
                .ty
                .and_then(|ty| self.default_type_options.iter().find(|(t, _)| *t == ty))
                .map(|(_, options)| options);
            let options = match overlay {
                Some(overlay) => declared.options.merged_over(overlay),
                None => declared.options.clone(),
            };

            let reader = if declared.skip_reader {
                ReaderKind::Skipped
            } else if declared.override_reader {
                ReaderKind::Overridden
            } else {
                ReaderKind::Generated
            };

            let mut write_steps = Vec::new();
            if declared.ty.is_some() {
                write_steps.push(WriteStep::Coerce);
            }
            write_steps.push(WriteStep::Store);
            if declared.watch_changes.is_some() {
                write_steps.push(WriteStep::TrackChanges);
            }

            compiled.push(AttributeDefinition {
                name: name.clone(),
                ty: declared.ty,
                default: declared.default.clone(),
                required: declared.required,
                skip: declared.skip,
                record: declared.record,
                watch_changes: declared.watch_changes.clone(),
                options,
                reader,
                write_steps,
            });
        }

        if record_attribute.is_none() {
            if let Some(def) = compiled
                .iter()
                .find(|def| def.watch_changes == Some(WatchChanges::AgainstRecord))
            {
                return Err(FormError::Configuration(format!(
                    "`{}` watches changes against a record, but no record attribute is declared. \
                     Try watch_changes_with or declare a record",
                    def.name,
                )));
            }
        }

        Ok(Schema {
            attributes: compiled,
            default_type_options: self.default_type_options,
            reserved: self.reserved,
            record_attribute,
        })
    }
}

fn validate_type_options(name: &str, options: &TypeOptions) -> Result<(), FormError> {
    if let Some(spec) = options.element_spec() {
        match spec {
            TypeSpec::PerEntry(_) => {
                return Err(FormError::Configuration(format!(
                    "`{name}` declares a per-entry element_type; array elements have no key to \
                     resolve against",
                )));
            }
            TypeSpec::Bundle(_, nested) => validate_type_options(name, nested)?,
            TypeSpec::Named(_) => {}
        }
    }
    for spec in [options.key_spec(), options.value_spec()].into_iter().flatten() {
        if let TypeSpec::Bundle(_, nested) = spec {
            validate_type_options(name, nested)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let schema = Schema::builder()
            .attribute("first", AttributeOptions::string())
            .attribute("second", AttributeOptions::string())
            .attribute("first", AttributeOptions::integer())
            .build()
            .unwrap();

        let names: Vec<&str> = schema.attributes().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(schema.attribute("first").unwrap().ty, Some(AttributeType::Integer));
    }

    #[test]
    fn test_reserved_name_conflict() {
        let err = Schema::builder()
            .attribute("attributes", AttributeOptions::string())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            FormError::NameConflict {
                name: "attributes".to_string(),
            },
        );
    }

    #[test]
    fn test_caller_reserved_names() {
        let err = Schema::builder()
            .reserve("existing_method_name")
            .attribute("existing_method_name", AttributeOptions::string())
            .build()
            .unwrap_err();
        assert!(matches!(err, FormError::NameConflict { .. }));

        let skipped = Schema::builder()
            .reserve("existing_method_name")
            .attribute("existing_method_name", AttributeOptions::string().skip_reader())
            .build()
            .unwrap();
        assert_eq!(
            skipped.attribute("existing_method_name").unwrap().reader,
            ReaderKind::Skipped,
        );

        let overridden = Schema::builder()
            .reserve("existing_method_name")
            .attribute("existing_method_name", AttributeOptions::string().override_reader())
            .build()
            .unwrap();
        assert_eq!(
            overridden.attribute("existing_method_name").unwrap().reader,
            ReaderKind::Overridden,
        );
    }

    #[test]
    fn test_overlay_merges_under_declared_options() {
        let schema = Schema::builder()
            .default_type_options(
                AttributeType::String,
                TypeOptions::new().upcase(true).strip(false),
            )
            .attribute(
                "code",
                AttributeOptions::string().type_options(TypeOptions::new().strip(true)),
            )
            .attribute("plain", AttributeOptions::string())
            .attribute("count", AttributeOptions::integer())
            .build()
            .unwrap();

        let code = &schema.attribute("code").unwrap().options;
        assert!(code.strip_or(false));
        assert!(code.upcase_or(false));

        let plain = &schema.attribute("plain").unwrap().options;
        assert!(!plain.strip_or(true));

        let count = &schema.attribute("count").unwrap().options;
        assert!(!count.upcase_or(false));
    }

    #[test]
    fn test_branch_isolation() {
        let parent = Schema::builder()
            .attribute("name", AttributeOptions::string())
            .build()
            .unwrap();

        let child = parent
            .to_builder()
            .attribute("extra", AttributeOptions::integer())
            .build()
            .unwrap();

        assert!(parent.attribute("extra").is_none());
        assert!(child.attribute("name").is_some());
        assert!(child.attribute("extra").is_some());
    }

    #[test]
    fn test_watch_changes_requires_record() {
        let err = Schema::builder()
            .attribute("bar", AttributeOptions::new().watch_changes())
            .build()
            .unwrap_err();
        assert!(matches!(err, FormError::Configuration(_)));

        let ok = Schema::builder()
            .record("foo", AttributeOptions::new())
            .attribute("bar", AttributeOptions::new().watch_changes())
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_per_entry_element_type_rejected() {
        let options = AttributeOptions::array().type_options(
            TypeOptions::new().element_type(TypeSpec::PerEntry(|_, _| AttributeType::String)),
        );
        let err = Schema::builder()
            .attribute("items", options)
            .build()
            .unwrap_err();
        assert!(matches!(err, FormError::Configuration(_)));
    }

    #[test]
    fn test_write_steps_compiled_in_order() {
        let schema = Schema::builder()
            .record("foo", AttributeOptions::new())
            .attribute("bar", AttributeOptions::string().watch_changes())
            .attribute("plain", AttributeOptions::new())
            .build()
            .unwrap();

        assert_eq!(
            schema.attribute("bar").unwrap().write_steps,
            vec![WriteStep::Coerce, WriteStep::Store, WriteStep::TrackChanges],
        );
        assert_eq!(
            schema.attribute("plain").unwrap().write_steps,
            vec![WriteStep::Store],
        );
    }

    #[test]
    fn test_record_attribute_pointer() {
        let schema = Schema::builder()
            .record("user", AttributeOptions::hash())
            .attribute("name", AttributeOptions::string())
            .build()
            .unwrap();

        assert_eq!(schema.record_attribute(), Some("user"));
        let user = schema.attribute("user").unwrap();
        assert!(user.skip);
        assert!(user.record);
    }
}
