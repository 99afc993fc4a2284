//! Error identifiers, error trees, and the failure types they ride in.
//!
//! Validation errors are identifiers, not rendered prose: a validator
//! appends an [`ErrorToken`] under the attribute it targets, and the caller
//! decides how (or whether) to present it. Two trees exist — the flat
//! per-attribute [`ErrorTree`], and the three-level [`ResourceErrorTree`]
//! used when validation is scoped to elements of a collection attribute.
//!
//! Insertion order is preserved everywhere and duplicates are kept; a
//! validator that fires twice is two errors, not one.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

const NO_TOKENS: &[ErrorToken] = &[];

/// A validation error identifier.
///
/// Well-known identifiers get their own variant; anything else travels as
/// [`ErrorToken::Text`]. The `Display` form is the wire identifier.
///
/// # Examples
///
/// ```
/// use intake_form::ErrorToken;
///
/// assert_eq!(ErrorToken::CantBeEmpty.to_string(), "cant_be_empty");
/// assert_eq!(ErrorToken::from("taken").to_string(), "taken");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorToken {
    CantBeEmpty,
    IsInvalid,
    IsTooShort,
    IsTooLong,
    IsntListed,
    LessThanMin,
    GreaterThanMax,
    TooManyDecimalPlaces,
    TooFewDecimalPlaces,
    IsDuplicated,
    /// A caller-supplied identifier.
    Text(String),
}

impl fmt::Display for ErrorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identifier = match self {
            ErrorToken::CantBeEmpty => "cant_be_empty",
            ErrorToken::IsInvalid => "is_invalid",
            ErrorToken::IsTooShort => "is_too_short",
            ErrorToken::IsTooLong => "is_too_long",
            ErrorToken::IsntListed => "isnt_listed",
            ErrorToken::LessThanMin => "less_than_min",
            ErrorToken::GreaterThanMax => "greater_than_max",
            ErrorToken::TooManyDecimalPlaces => "too_many_decimal_places",
            ErrorToken::TooFewDecimalPlaces => "too_few_decimal_places",
            ErrorToken::IsDuplicated => "is_duplicated",
            ErrorToken::Text(s) => s,
        };
        f.write_str(identifier)
    }
}

impl Serialize for ErrorToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<&str> for ErrorToken {
    fn from(s: &str) -> Self {
        ErrorToken::Text(s.to_string())
    }
}

impl From<String> for ErrorToken {
    fn from(s: String) -> Self {
        ErrorToken::Text(s)
    }
}

/// Insertion-ordered mapping from attribute name to accumulated error
/// identifiers. The `None` key holds whole-object errors.
///
/// # Examples
///
/// ```
/// use intake_form::{ErrorToken, ErrorTree};
///
/// let mut tree = ErrorTree::new();
/// assert!(!tree.any());
///
/// tree.append(Some("email"), ErrorToken::IsInvalid);
/// tree.append(Some("email"), ErrorToken::IsTooLong);
/// assert!(tree.any());
/// assert_eq!(tree.get("email"), &[ErrorToken::IsInvalid, ErrorToken::IsTooLong]);
/// assert_eq!(tree.get("name"), &[] as &[ErrorToken]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorTree {
    entries: Vec<(Option<String>, Vec<ErrorToken>)>,
}

impl ErrorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error under an attribute (`None` for whole-object
    /// errors), creating the entry on first touch.
    pub fn append(&mut self, attribute: Option<&str>, token: ErrorToken) {
        let key = attribute.map(str::to_string);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, tokens)) => tokens.push(token),
            None => self.entries.push((key, vec![token])),
        }
    }

    /// The errors recorded for an attribute, in insertion order.
    pub fn get(&self, attribute: &str) -> &[ErrorToken] {
        self.entries
            .iter()
            .find(|(k, _)| k.as_deref() == Some(attribute))
            .map_or(NO_TOKENS, |(_, tokens)| tokens)
    }

    /// The whole-object errors.
    pub fn base(&self) -> &[ErrorToken] {
        self.entries
            .iter()
            .find(|(k, _)| k.is_none())
            .map_or(NO_TOKENS, |(_, tokens)| tokens)
    }

    /// Whether any attribute (or the object itself) has errors. Entries
    /// with empty lists do not count.
    pub fn any(&self) -> bool {
        self.entries.iter().any(|(_, tokens)| !tokens.is_empty())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &[ErrorToken])> {
        self.entries
            .iter()
            .map(|(k, tokens)| (k.as_deref(), tokens.as_slice()))
    }
}

impl Serialize for ErrorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, tokens) in &self.entries {
            map.serialize_entry(key.as_deref().unwrap_or("base"), tokens)?;
        }
        map.end()
    }
}

/// Three-level error tree: namespace → stringified resource id →
/// attribute → ordered identifiers.
///
/// # Examples
///
/// ```
/// use intake_form::{ErrorToken, ResourceErrorTree};
///
/// let mut tree = ResourceErrorTree::new();
/// tree.append("items", "3", "name", ErrorToken::CantBeEmpty);
///
/// assert!(tree.any());
/// assert!(tree.resource_any("items", "3"));
/// assert!(!tree.resource_any("items", "4"));
/// assert_eq!(tree.attribute_errors("items", "3", "name"), &[ErrorToken::CantBeEmpty]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceErrorTree {
    namespaces: Vec<(String, Vec<(String, ErrorTree)>)>,
}

impl ResourceErrorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error for one attribute of one resource, vivifying the
    /// intermediate levels on first touch.
    pub fn append(&mut self, namespace: &str, id: &str, attribute: &str, token: ErrorToken) {
        let ns_index = match self.namespaces.iter().position(|(ns, _)| ns == namespace) {
            Some(i) => i,
            None => {
                self.namespaces.push((namespace.to_string(), Vec::new()));
                self.namespaces.len() - 1
            }
        };
        let resources = &mut self.namespaces[ns_index].1;
        let res_index = match resources.iter().position(|(rid, _)| rid == id) {
            Some(i) => i,
            None => {
                resources.push((id.to_string(), ErrorTree::new()));
                resources.len() - 1
            }
        };
        resources[res_index].1.append(Some(attribute), token);
    }

    /// The per-attribute errors of one resource, if any were recorded.
    pub fn resource(&self, namespace: &str, id: &str) -> Option<&ErrorTree> {
        self.namespaces
            .iter()
            .find(|(ns, _)| ns == namespace)
            .and_then(|(_, resources)| resources.iter().find(|(rid, _)| rid == id))
            .map(|(_, tree)| tree)
    }

    /// The errors recorded for one attribute of one resource.
    pub fn attribute_errors(&self, namespace: &str, id: &str, attribute: &str) -> &[ErrorToken] {
        self.resource(namespace, id)
            .map_or(NO_TOKENS, |tree| tree.get(attribute))
    }

    /// Whether one resource has any errors on any attribute.
    pub fn resource_any(&self, namespace: &str, id: &str) -> bool {
        self.resource(namespace, id).is_some_and(ErrorTree::any)
    }

    /// Whether any resource in any namespace has errors.
    pub fn any(&self) -> bool {
        self.namespaces
            .iter()
            .any(|(_, resources)| resources.iter().any(|(_, tree)| tree.any()))
    }

    pub fn clear(&mut self) {
        self.namespaces.clear();
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, impl Iterator<Item = (&str, &ErrorTree)>)> {
        self.namespaces.iter().map(|(ns, resources)| {
            (
                ns.as_str(),
                resources.iter().map(|(id, tree)| (id.as_str(), tree)),
            )
        })
    }
}

impl Serialize for ResourceErrorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        struct Resources<'a>(&'a [(String, ErrorTree)]);

        impl Serialize for Resources<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (id, tree) in self.0 {
                    map.serialize_entry(id, tree)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(self.namespaces.len()))?;
        for (namespace, resources) in &self.namespaces {
            map.serialize_entry(namespace, &Resources(resources))?;
        }
        map.end()
    }
}

/// Programming-mistake errors: schema declaration problems, construction
/// failures, and misuse of the instance API.
///
/// These are fatal for the operation that raised them; they are never part
/// of a validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// An attribute name collides with an existing reader.
    #[error(
        "`{name}` already has a reader. Use skip_reader to keep the existing one, \
         or override_reader to replace it"
    )]
    NameConflict { name: String },

    /// The schema asks for behavior it cannot support as declared.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required attribute was constructed without a value or default.
    #[error("`{name}` is a required attribute")]
    RequiredAttribute { name: String },

    /// A write targeted a name the schema never declared.
    #[error("`{name}` is not a declared attribute")]
    UnknownAttribute { name: String },

    /// A changed-flag query targeted an unwatched, unmarked attribute.
    #[error("`{name}` is not being watched for changes. Declare it with watch_changes")]
    NotWatchingChanges { name: String },
}

/// The recoverable validation-failure payload: both error trees, carried
/// whole so callers can inspect or render them.
///
/// # Examples
///
/// ```
/// use intake_form::{ErrorToken, ErrorTree, ValidationError};
///
/// let mut errors = ErrorTree::new();
/// errors.append(Some("email"), ErrorToken::IsInvalid);
/// let failure = ValidationError::from_errors(errors);
///
/// assert!(failure.to_string().contains("email: [is_invalid]"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub errors: ErrorTree,
    pub resource_errors: ResourceErrorTree,
}

impl ValidationError {
    pub fn new(errors: ErrorTree, resource_errors: ResourceErrorTree) -> Self {
        Self {
            errors,
            resource_errors,
        }
    }

    /// A failure carrying only flat attribute errors.
    pub fn from_errors(errors: ErrorTree) -> Self {
        Self {
            errors,
            resource_errors: ResourceErrorTree::new(),
        }
    }

    /// Renders one `field: [tokens…]` line per tree entry, flat tree first.
    pub fn stringify_errors(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (attribute, tokens) in self.errors.iter() {
            lines.push(format!(
                "{}: [{}]",
                attribute.unwrap_or("base"),
                join_tokens(tokens),
            ));
        }
        for (namespace, resources) in self.resource_errors.iter() {
            for (id, tree) in resources {
                for (attribute, tokens) in tree.iter() {
                    lines.push(format!(
                        "{}:{}:{}: [{}]",
                        namespace,
                        id,
                        attribute.unwrap_or("base"),
                        join_tokens(tokens),
                    ));
                }
            }
        }
        lines
    }
}

fn join_tokens(tokens: &[ErrorToken]) -> String {
    tokens
        .iter()
        .map(ErrorToken::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "validation failed with errors: {}",
            self.stringify_errors().join("\n"),
        )
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tree_preserves_order_and_duplicates() {
        let mut tree = ErrorTree::new();
        tree.append(Some("name"), ErrorToken::IsTooShort);
        tree.append(Some("name"), ErrorToken::IsTooLong);
        tree.append(Some("name"), ErrorToken::IsTooShort);

        assert_eq!(
            tree.get("name"),
            &[
                ErrorToken::IsTooShort,
                ErrorToken::IsTooLong,
                ErrorToken::IsTooShort,
            ],
        );
    }

    #[test]
    fn test_error_tree_base_errors() {
        let mut tree = ErrorTree::new();
        tree.append(None, ErrorToken::from("invalid_credentials"));
        assert_eq!(tree.base(), &[ErrorToken::from("invalid_credentials")]);
        assert!(tree.any());
    }

    #[test]
    fn test_resource_tree_vivifies_levels() {
        let mut tree = ResourceErrorTree::new();
        assert!(!tree.any());

        tree.append("items", "0", "name", ErrorToken::IsInvalid);
        tree.append("items", "0", "name", ErrorToken::IsTooShort);
        tree.append("items", "1", "id", ErrorToken::IsInvalid);

        assert_eq!(
            tree.attribute_errors("items", "0", "name"),
            &[ErrorToken::IsInvalid, ErrorToken::IsTooShort],
        );
        assert!(tree.resource_any("items", "1"));
        assert!(!tree.resource_any("other", "0"));
    }

    #[test]
    fn test_validation_error_stringifies_both_trees() {
        let mut errors = ErrorTree::new();
        errors.append(Some("whatever"), ErrorToken::from("error_message"));
        let mut resource_errors = ResourceErrorTree::new();
        resource_errors.append("items", "3", "name", ErrorToken::CantBeEmpty);

        let failure = ValidationError::new(errors, resource_errors);
        let message = failure.to_string();
        assert!(message.contains("whatever: [error_message]"));
        assert!(message.contains("items:3:name: [cant_be_empty]"));
    }

    #[test]
    fn test_error_tree_serializes_as_object() {
        let mut tree = ErrorTree::new();
        tree.append(Some("email"), ErrorToken::IsInvalid);
        tree.append(None, ErrorToken::from("nope"));

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["email"][0], "is_invalid");
        assert_eq!(json["base"][0], "nope");
    }
}
