//! Answer storage for a form being filled in.
//!
//! Answers are keyed by [`FieldKey`], which is derived from the field's durable id only. A
//! field's position is deliberately not part of the key, so reordering fields never moves an
//! answer onto a different field.
//!
//! The store is copy-on-write. [`FormValueStore::snapshot`] hands out a shared map that later
//! updates never touch, and [`FormValueStore::revision`] increases on every update, so a
//! presentation layer can detect changes by comparing revisions or snapshot pointers.

use crate::field::{FieldSchema, FieldType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier binding a rendered field to its stored answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn for_field(field: &FieldSchema) -> Self {
        Self(field.id.as_str().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The current answer to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    /// Selected checkbox options in click order, without duplicates.
    Choices(Vec<String>),
}

impl AnswerValue {
    /// The empty answer for a field of the given type.
    pub fn empty_for(field_type: &FieldType) -> Self {
        if field_type.is_multi_valued() {
            AnswerValue::Choices(Vec::new())
        } else {
            AnswerValue::Text(String::new())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            AnswerValue::Choices(_) => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Choices(choices) => Some(choices),
            AnswerValue::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Choices(choices) => choices.is_empty(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_owned())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::Choices(value)
    }
}

pub type Answers = BTreeMap<FieldKey, AnswerValue>;

/// Returns `current` with `option` appended, unless it is already selected.
pub fn with_option_checked(current: Option<&[String]>, option: &str) -> Vec<String> {
    let mut next = current.map(<[String]>::to_vec).unwrap_or_default();
    if !next.iter().any(|selected| selected == option) {
        next.push(option.to_owned());
    }
    next
}

/// Returns `current` with the first occurrence of `option` removed.
pub fn with_option_unchecked(current: Option<&[String]>, option: &str) -> Vec<String> {
    let mut next = current.map(<[String]>::to_vec).unwrap_or_default();
    if let Some(pos) = next.iter().position(|selected| selected == option) {
        next.remove(pos);
    }
    next
}

/// Live mapping from field key to answer.
#[derive(Debug, Clone, Default)]
pub struct FormValueStore {
    entries: Arc<Answers>,
    revision: u64,
}

impl FormValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one empty answer per field, discarding anything stored before.
    pub fn initialize<'a>(&mut self, fields: impl IntoIterator<Item = &'a FieldSchema>) {
        let entries = fields
            .into_iter()
            .map(|field| {
                (
                    FieldKey::for_field(field),
                    AnswerValue::empty_for(field.field_type()),
                )
            })
            .collect();
        self.entries = Arc::new(entries);
        self.revision += 1;
    }

    /// Replaces the answer for `key`, leaving every other entry unchanged.
    ///
    /// Snapshots taken before the call keep their old contents.
    pub fn set_value(&mut self, key: FieldKey, value: impl Into<AnswerValue>) {
        Arc::make_mut(&mut self.entries).insert(key, value.into());
        self.revision += 1;
    }

    /// Adds `option` to a checkbox group's selection.
    pub fn check_option(&mut self, key: &FieldKey, option: &str) {
        let next = with_option_checked(self.choices(key), option);
        self.set_value(key.clone(), next);
    }

    /// Removes `option` from a checkbox group's selection.
    pub fn uncheck_option(&mut self, key: &FieldKey, option: &str) {
        let next = with_option_unchecked(self.choices(key), option);
        self.set_value(key.clone(), next);
    }

    pub fn get(&self, key: &FieldKey) -> Option<&AnswerValue> {
        self.entries.get(key)
    }

    fn choices(&self, key: &FieldKey) -> Option<&[String]> {
        self.get(key).and_then(AnswerValue::as_choices)
    }

    /// Shared, immutable view of the current answers.
    pub fn snapshot(&self) -> Arc<Answers> {
        Arc::clone(&self.entries)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
