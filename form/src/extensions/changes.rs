//! Change tracking: a per-attribute "did this write change anything"
//! signal, recomputed by the write pipeline after each store.
//!
//! An attribute opts in with `watch_changes` (compare against the declared
//! record's corresponding field) or `watch_changes_with` (a custom
//! predicate over the new value). Predicates run in declaration order
//! during a mass assignment and may imperatively mark sibling attributes
//! through the [`ChangeContext`]; the last writer wins.

use intake_core::Value;

use crate::errors::FormError;
use crate::schema::WatchChanges;
use crate::state::FormState;

/// A custom changed-flag predicate: given the tracking context and the
/// just-stored value, decide whether the attribute changed.
pub type ChangePredicate = fn(&mut ChangeContext<'_>, &Value) -> bool;

/// What a change predicate can see and do: read sibling attributes and the
/// record, and mark other attributes' changed flags.
///
/// Marks recorded here are applied after the predicate returns, in the
/// order they were made.
pub struct ChangeContext<'a> {
    state: &'a FormState,
    marks: Vec<(String, bool)>,
}

impl<'a> ChangeContext<'a> {
    fn new(state: &'a FormState) -> Self {
        Self {
            state,
            marks: Vec::new(),
        }
    }

    /// Reads a sibling attribute through its generated reader.
    pub fn get(&self, name: &str) -> Value {
        self.state.get(name)
    }

    /// The declared record's current value.
    pub fn record(&self) -> Value {
        self.state.record()
    }

    /// Imperatively marks another attribute's changed flag.
    pub fn mark_changed(&mut self, name: &str, changed: bool) {
        self.marks.push((name.to_string(), changed));
    }
}

impl FormState {
    /// The `TrackChanges` write-pipeline step: recomputes the attribute's
    /// changed flag from the value just stored.
    pub(crate) fn track_change(&mut self, index: usize) -> Result<(), FormError> {
        let schema = std::sync::Arc::clone(self.schema());
        let def = &schema.attributes()[index];
        let Some(watch) = &def.watch_changes else {
            return Ok(());
        };
        let new_value = self.values[index].clone();

        let did_change = match watch {
            WatchChanges::With(predicate) => {
                let mut context = ChangeContext::new(self);
                let flag = predicate(&mut context, &new_value);
                let marks = context.marks;
                for (name, mark) in marks {
                    self.changed.insert(name, mark);
                }
                flag
            }
            WatchChanges::AgainstRecord => {
                let record = self.record();
                if record.is_nil() {
                    // No record to compare against yet: any real value is
                    // a change.
                    !new_value.is_nil()
                } else {
                    record.get(&def.name).cloned().unwrap_or(Value::Nil) != new_value
                }
            }
        };

        self.changed.insert(def.name.clone(), did_change);
        Ok(())
    }

    /// The attribute's last-computed changed flag.
    ///
    /// An imperatively marked flag is returned regardless of declaration.
    /// A watched-but-never-written attribute reads as unchanged.
    ///
    /// # Errors
    ///
    /// [`FormError::NotWatchingChanges`] when the attribute neither
    /// watches changes nor was ever marked — a misuse of the query API,
    /// not a validation outcome.
    pub fn changes(&self, name: &str) -> Result<bool, FormError> {
        if let Some(flag) = self.changed.get(name) {
            return Ok(*flag);
        }
        let watched = self
            .schema()
            .attribute(name)
            .and_then(|def| def.watch_changes.as_ref())
            .is_some();
        if watched {
            Ok(false)
        } else {
            Err(FormError::NotWatchingChanges {
                name: name.to_string(),
            })
        }
    }

    /// Imperatively sets an attribute's changed flag. Last writer wins.
    pub fn mark_changed(&mut self, name: &str, changed: bool) {
        self.changed.insert(name.to_string(), changed);
    }
}
