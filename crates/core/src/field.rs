//! Field definitions.
//!
//! A field moves through three shapes:
//!
//! - [`FieldDraft`]: raw text the builder is typing into, never validated.
//! - [`FieldDefinition`]: validated content of a field without any identity. This is what is
//!   transmitted to Form-Storage when a form is saved.
//! - [`FieldSchema`]: a definition plus an opaque [`FieldId`]. Builders assign local ids so
//!   fields can be removed; storage assigns durable ids when the form is persisted.

use crate::error::ValidationError;
use crate::validation::{normalise_options, validate_draft};
use intake_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque field identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    /// Allocates a fresh identifier (32 lowercase hex characters).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of control a field is answered with.
///
/// Unrecognised type names are kept as [`FieldType::Other`] so that forms authored by newer
/// builders still load; they render and validate like [`FieldType::Text`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Number,
    Date,
    Tel,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Other(String),
}

impl FieldType {
    /// Types offered by the form builder, in display order.
    pub fn authorable() -> [FieldType; 9] {
        [
            FieldType::Text,
            FieldType::Number,
            FieldType::Email,
            FieldType::Date,
            FieldType::Tel,
            FieldType::Textarea,
            FieldType::Select,
            FieldType::Checkbox,
            FieldType::Radio,
        ]
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "text" => FieldType::Text,
            "email" => FieldType::Email,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "tel" => FieldType::Tel,
            "textarea" => FieldType::Textarea,
            "select" => FieldType::Select,
            "checkbox" => FieldType::Checkbox,
            "radio" => FieldType::Radio,
            other => FieldType::Other(other.to_owned()),
        }
    }

    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Tel => "tel",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Other(name) => name,
        }
    }

    /// Human readable name shown in the builder's type picker.
    pub fn display_name(&self) -> &str {
        match self {
            FieldType::Text => "Text",
            FieldType::Email => "Email",
            FieldType::Number => "Number",
            FieldType::Date => "Date",
            FieldType::Tel => "Phone",
            FieldType::Textarea => "Long Text",
            FieldType::Select => "Dropdown",
            FieldType::Checkbox => "Checkbox",
            FieldType::Radio => "Radio Button",
            FieldType::Other(name) => name,
        }
    }

    /// Whether the field is answered by picking from a list of options.
    pub fn requires_options(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Checkbox | FieldType::Radio
        )
    }

    /// Whether answers are a set of options rather than a single string.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldType::Checkbox)
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        FieldType::parse(&value)
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated content of one field.
///
/// `options` is non-empty with no blank entries when the type requires options, and empty
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldDefinitionRepr")]
pub struct FieldDefinition {
    label: NonEmptyText,
    #[serde(rename = "type")]
    field_type: FieldType,
    required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
}

#[derive(Deserialize)]
struct FieldDefinitionRepr {
    label: String,
    #[serde(rename = "type", default)]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    options: Option<Vec<String>>,
}

impl TryFrom<FieldDefinitionRepr> for FieldDefinition {
    type Error = ValidationError;

    fn try_from(repr: FieldDefinitionRepr) -> Result<Self, Self::Error> {
        let label = NonEmptyText::new(&repr.label).map_err(|_| ValidationError::EmptyLabel)?;
        FieldDefinition::new(
            label,
            repr.field_type,
            repr.required,
            repr.options.unwrap_or_default(),
        )
    }
}

impl FieldDefinition {
    /// Builds a definition from an already split option list.
    ///
    /// Options are trimmed. For option-bearing types an empty list is
    /// [`ValidationError::MissingOptions`] and any blank entry is
    /// [`ValidationError::NoValidOptions`]; other types drop their options.
    pub fn new(
        label: NonEmptyText,
        field_type: FieldType,
        required: bool,
        options: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let options = if field_type.requires_options() {
            normalise_options(options)?
        } else {
            Vec::new()
        };

        Ok(Self {
            label,
            field_type,
            required,
            options,
        })
    }

    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// A field definition with its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: FieldId,
    #[serde(flatten)]
    pub definition: FieldDefinition,
}

impl FieldSchema {
    pub fn new(id: FieldId, definition: FieldDefinition) -> Self {
        Self { id, definition }
    }

    pub fn label(&self) -> &str {
        self.definition.label()
    }

    pub fn field_type(&self) -> &FieldType {
        self.definition.field_type()
    }

    pub fn required(&self) -> bool {
        self.definition.required()
    }

    pub fn options(&self) -> &[String] {
        self.definition.options()
    }
}

/// The field currently being typed into the builder.
///
/// `options` is the raw comma-separated text exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDraft {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: String,
}

impl FieldDraft {
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            field_type,
            ..Self::default()
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Validates the draft into a definition without consuming it.
    pub fn to_definition(&self) -> Result<FieldDefinition, ValidationError> {
        validate_draft(self)
    }
}
