//! Form-level schema types.

use crate::error::ValidationError;
use crate::field::{FieldDefinition, FieldSchema};
use crate::values::FieldKey;
use intake_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Durable form identifier assigned by Form-Storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FormId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for FormId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, ordered collection of fields as assembled by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSchema {
    name: NonEmptyText,
    fields: Vec<FieldSchema>,
}

impl FormSchema {
    /// # Errors
    ///
    /// Returns [`ValidationError::NoFields`] when `fields` is empty.
    pub fn new(name: NonEmptyText, fields: Vec<FieldSchema>) -> Result<Self, ValidationError> {
        if fields.is_empty() {
            return Err(ValidationError::NoFields);
        }
        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// The request body sent to Form-Storage. Builder-local field ids are not transmitted.
    pub fn to_new_form(&self) -> NewForm {
        NewForm {
            form_name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|field| field.definition.clone())
                .collect(),
        }
    }
}

/// Body of a create-form request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewForm {
    pub form_name: NonEmptyText,
    pub fields: Vec<FieldDefinition>,
}

impl NewForm {
    /// Checks the invariants that serde cannot: a persisted form has at least one field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            return Err(ValidationError::NoFields);
        }
        Ok(())
    }
}

/// A form as published by Form-Storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedForm {
    pub id: FormId,
    pub form_name: String,
    pub fields: Vec<FieldSchema>,
}

impl PublishedForm {
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateFieldKey`] when two fields would store their
    /// answers under the same key.
    pub fn new(
        id: FormId,
        form_name: impl Into<String>,
        fields: Vec<FieldSchema>,
    ) -> Result<Self, ValidationError> {
        let mut seen = BTreeSet::new();
        for field in &fields {
            let key = FieldKey::for_field(field);
            if !seen.insert(key.clone()) {
                return Err(ValidationError::DuplicateFieldKey(key));
            }
        }
        Ok(Self {
            id,
            form_name: form_name.into(),
            fields,
        })
    }

    /// Pairs each field with the key its answer is stored under.
    pub fn keyed_fields(&self) -> impl Iterator<Item = (FieldKey, &FieldSchema)> {
        self.fields
            .iter()
            .map(|field| (FieldKey::for_field(field), field))
    }

    pub fn field(&self, key: &FieldKey) -> Option<&FieldSchema> {
        self.keyed_fields()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, field)| field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDraft, FieldId, FieldType};

    fn field(label: &str) -> FieldSchema {
        let def = FieldDraft::new(label, FieldType::Text)
            .to_definition()
            .unwrap();
        FieldSchema::new(FieldId::generate(), def)
    }

    #[test]
    fn test_form_schema_requires_a_field() {
        let err = FormSchema::new(NonEmptyText::new("Intake").unwrap(), vec![]).unwrap_err();
        assert_eq!(err, ValidationError::NoFields);
    }

    #[test]
    fn test_new_form_strips_field_ids() {
        let schema = FormSchema::new(
            NonEmptyText::new("Intake").unwrap(),
            vec![field("Name"), field("Town")],
        )
        .unwrap();

        let body = serde_json::to_value(schema.to_new_form()).unwrap();
        assert_eq!(body["form_name"], "Intake");
        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|f| f.get("id").is_none()));
        assert_eq!(fields[1]["label"], "Town");
    }

    #[test]
    fn test_published_form_rejects_shared_field_key() {
        let name = field("Name");
        let mut twin = field("Contact by");
        twin.id = name.id.clone();

        let err = PublishedForm::new(FormId::from("f1"), "Intake", vec![name.clone(), twin])
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateFieldKey(FieldKey::for_field(&name)));

        let form = PublishedForm::new(FormId::from("f1"), "Intake", vec![name, field("Town")])
            .unwrap();
        assert_eq!(form.keyed_fields().count(), 2);
    }

    #[test]
    fn test_new_form_validate_rejects_empty_field_list() {
        let body: NewForm = serde_json::from_str(r#"{"form_name":"Empty","fields":[]}"#).unwrap();
        assert_eq!(body.validate(), Err(ValidationError::NoFields));
    }
}
