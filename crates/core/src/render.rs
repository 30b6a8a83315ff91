//! Rendering and presence validation.
//!
//! Both are pure functions of a field definition and its current answer. Each field type has
//! one handler; unrecognised types take the text handler.
//!
//! Only presence is enforced here. Format constraints (email syntax, numeric input, dates) are
//! left to the presentation layer's native controls.

use crate::constants::{REQUIRED_MARKER, SELECT_PLACEHOLDER, TEXTAREA_ROWS};
use crate::error::ValidationError;
use crate::field::{FieldSchema, FieldType};
use crate::schema::PublishedForm;
use crate::values::{AnswerValue, FieldKey, FormValueStore};
use serde::Serialize;

/// Everything a presentation layer needs to draw one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderDescriptor {
    pub key: FieldKey,
    pub label: Label,
    pub control: Control,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub text: String,
    pub required: bool,
    /// Id of the control the label is attached to. Groups label the whole group instead.
    pub for_control: Option<String>,
}

impl Label {
    /// Label text with the required marker appended when needed.
    pub fn display(&self) -> String {
        if self.required {
            format!("{} {}", self.text, REQUIRED_MARKER)
        } else {
            self.text.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Email,
    Number,
    Date,
    Tel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub id: String,
    pub value: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    Input {
        id: String,
        input_type: InputType,
        value: String,
        required: bool,
    },
    TextArea {
        id: String,
        value: String,
        rows: u8,
        required: bool,
    },
    Select {
        id: String,
        placeholder: String,
        value: String,
        options: Vec<SelectOption>,
        required: bool,
    },
    RadioGroup {
        name: String,
        options: Vec<Choice>,
        required: bool,
    },
    CheckboxGroup {
        options: Vec<Choice>,
    },
}

impl Control {
    pub fn is_group(&self) -> bool {
        matches!(self, Control::RadioGroup { .. } | Control::CheckboxGroup { .. })
    }
}

fn scalar(answer: Option<&AnswerValue>) -> String {
    answer
        .and_then(AnswerValue::as_text)
        .unwrap_or_default()
        .to_owned()
}

fn option_id(key: &FieldKey, index: usize) -> String {
    format!("{key}_option_{index}")
}

fn input(
    key: &FieldKey,
    input_type: InputType,
    field: &FieldSchema,
    answer: Option<&AnswerValue>,
) -> Control {
    Control::Input {
        id: key.to_string(),
        input_type,
        value: scalar(answer),
        required: field.required(),
    }
}

fn textarea(key: &FieldKey, field: &FieldSchema, answer: Option<&AnswerValue>) -> Control {
    Control::TextArea {
        id: key.to_string(),
        value: scalar(answer),
        rows: TEXTAREA_ROWS,
        required: field.required(),
    }
}

fn select(key: &FieldKey, field: &FieldSchema, answer: Option<&AnswerValue>) -> Control {
    let value = scalar(answer);
    let options = field
        .options()
        .iter()
        .map(|option| SelectOption {
            value: option.clone(),
            selected: *option == value,
        })
        .collect();

    Control::Select {
        id: key.to_string(),
        placeholder: SELECT_PLACEHOLDER.to_owned(),
        value,
        options,
        required: field.required(),
    }
}

fn radio_group(key: &FieldKey, field: &FieldSchema, answer: Option<&AnswerValue>) -> Control {
    let current = answer.and_then(AnswerValue::as_text);
    let options = field
        .options()
        .iter()
        .enumerate()
        .map(|(index, option)| Choice {
            id: option_id(key, index),
            value: option.clone(),
            checked: current == Some(option.as_str()),
        })
        .collect();

    Control::RadioGroup {
        name: key.to_string(),
        options,
        required: field.required(),
    }
}

fn checkbox_group(key: &FieldKey, field: &FieldSchema, answer: Option<&AnswerValue>) -> Control {
    let selected = answer.and_then(AnswerValue::as_choices).unwrap_or_default();
    let options = field
        .options()
        .iter()
        .enumerate()
        .map(|(index, option)| Choice {
            id: option_id(key, index),
            value: option.clone(),
            checked: selected.contains(option),
        })
        .collect();

    Control::CheckboxGroup { options }
}

/// Maps a field and its answer to a render descriptor.
pub fn render_field(field: &FieldSchema, answer: Option<&AnswerValue>) -> RenderDescriptor {
    let key = FieldKey::for_field(field);
    let control = match field.field_type() {
        FieldType::Text | FieldType::Other(_) => input(&key, InputType::Text, field, answer),
        FieldType::Email => input(&key, InputType::Email, field, answer),
        FieldType::Number => input(&key, InputType::Number, field, answer),
        FieldType::Date => input(&key, InputType::Date, field, answer),
        FieldType::Tel => input(&key, InputType::Tel, field, answer),
        FieldType::Textarea => textarea(&key, field, answer),
        FieldType::Select => select(&key, field, answer),
        FieldType::Radio => radio_group(&key, field, answer),
        FieldType::Checkbox => checkbox_group(&key, field, answer),
    };

    let label = Label {
        text: field.label().to_owned(),
        required: field.required(),
        for_control: (!control.is_group()).then(|| key.to_string()),
    };

    RenderDescriptor {
        key,
        label,
        control,
    }
}

/// Renders every field of `form` in order.
pub fn render_form(form: &PublishedForm, store: &FormValueStore) -> Vec<RenderDescriptor> {
    form.keyed_fields()
        .map(|(key, field)| render_field(field, store.get(&key)))
        .collect()
}

/// Whether a field's answer satisfies its presence requirement.
pub fn is_satisfied(field: &FieldSchema, answer: Option<&AnswerValue>) -> bool {
    if !field.required() {
        return true;
    }

    match field.field_type() {
        FieldType::Checkbox => answer
            .and_then(AnswerValue::as_choices)
            .is_some_and(|choices| !choices.is_empty()),
        _ => answer
            .and_then(AnswerValue::as_text)
            .is_some_and(|text| !text.is_empty()),
    }
}

/// Outcome of validating a whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    missing: Vec<FieldKey>,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }

    /// Keys of required fields without an answer, in form order.
    pub fn missing(&self) -> &[FieldKey] {
        &self.missing
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::RequiredFieldsMissing(self.missing))
        }
    }
}

pub fn validate(form: &PublishedForm, store: &FormValueStore) -> Verdict {
    let missing = form
        .keyed_fields()
        .filter(|(key, field)| !is_satisfied(field, store.get(key)))
        .map(|(key, _)| key)
        .collect();
    Verdict { missing }
}
