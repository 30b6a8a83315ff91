//! JSON bodies exchanged with the REST server.
//!
//! Request bodies arrive loosely typed so that policy violations surface as
//! [`ValidationError`]s with their user-facing messages rather than as deserialisation
//! failures. Conversions into the core types run the same checks the builder does.

use chrono::{DateTime, Utc};
use intake_core::storage::{StoredForm, StoredSubmission};
use intake_core::{
    Answers, FieldDefinition, FieldId, FieldSchema, FieldType, FormId, FormSubmission, NewForm,
    NonEmptyText, PublishedForm, UserRecord, ValidationError,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

fn default_field_type() -> String {
    FieldType::default().as_str().to_owned()
}

/// One field as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldDto {
    /// Assigned by storage; absent in create requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldDto {
    pub fn to_definition(&self) -> Result<FieldDefinition, ValidationError> {
        let label = NonEmptyText::new(&self.label).map_err(|_| ValidationError::EmptyLabel)?;
        FieldDefinition::new(
            label,
            FieldType::parse(self.field_type.trim()),
            self.required,
            self.options.clone(),
        )
    }

    /// Pairs the definition with its id. A field without one is keyed by position.
    pub fn to_schema(&self, index: usize) -> Result<FieldSchema, ValidationError> {
        let id = match &self.id {
            Some(id) if !id.trim().is_empty() => FieldId::from(id.trim()),
            _ => FieldId::from(format!("field_{index}").as_str()),
        };
        Ok(FieldSchema::new(id, self.to_definition()?))
    }
}

impl From<&FieldDefinition> for FieldDto {
    fn from(definition: &FieldDefinition) -> Self {
        Self {
            id: None,
            label: definition.label().to_owned(),
            field_type: definition.field_type().as_str().to_owned(),
            required: definition.required(),
            options: definition.options().to_vec(),
        }
    }
}

impl From<&FieldSchema> for FieldDto {
    fn from(field: &FieldSchema) -> Self {
        Self {
            id: Some(field.id.to_string()),
            ..Self::from(&field.definition)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateFormReq {
    pub form_name: String,
    pub fields: Vec<FieldDto>,
}

impl CreateFormReq {
    /// Validates the request the same way the builder validates before saving.
    pub fn to_new_form(&self) -> Result<NewForm, ValidationError> {
        let form_name =
            NonEmptyText::new(&self.form_name).map_err(|_| ValidationError::EmptyFormName)?;
        let fields = self
            .fields
            .iter()
            .map(FieldDto::to_definition)
            .collect::<Result<Vec<_>, _>>()?;
        let form = NewForm { form_name, fields };
        form.validate()?;
        Ok(form)
    }
}

impl From<&NewForm> for CreateFormReq {
    fn from(form: &NewForm) -> Self {
        Self {
            form_name: form.form_name.to_string(),
            fields: form.fields.iter().map(FieldDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateFormRes {
    pub form_id: String,
}

/// The most recently created form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LatestFormRes {
    pub id: String,
    pub form_name: String,
    pub fields: Vec<FieldDto>,
}

impl LatestFormRes {
    /// Rejects forms where two fields end up with the same key, including an explicit id
    /// that matches another field's positional fallback.
    pub fn into_published(self) -> Result<PublishedForm, ValidationError> {
        let fields = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| field.to_schema(index))
            .collect::<Result<Vec<_>, _>>()?;
        PublishedForm::new(FormId::from(self.id), self.form_name, fields)
    }
}

impl From<&PublishedForm> for LatestFormRes {
    fn from(form: &PublishedForm) -> Self {
        Self {
            id: form.id.to_string(),
            form_name: form.form_name.clone(),
            fields: form.fields.iter().map(FieldDto::from).collect(),
        }
    }
}

/// A form fetched by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormRes {
    pub form_name: String,
    pub fields: Vec<FieldDto>,
}

impl From<&StoredForm> for FormRes {
    fn from(form: &StoredForm) -> Self {
        Self {
            form_name: form.form_name.to_string(),
            fields: form.fields.iter().map(FieldDto::from).collect(),
        }
    }
}

/// Entry of the administrative form listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormSummaryRes {
    pub id: String,
    pub form_name: String,
    pub fields: Vec<FieldDto>,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredForm> for FormSummaryRes {
    fn from(form: &StoredForm) -> Self {
        Self {
            id: form.id.to_string(),
            form_name: form.form_name.to_string(),
            fields: form.fields.iter().map(FieldDto::from).collect(),
            created_at: form.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionReq {
    pub form_id: String,
    /// Answers keyed by field id: a string, or an array of strings for checkbox groups.
    #[schema(value_type = Object)]
    pub submission_data: Answers,
    /// Language the answers were given in; they are stored in English.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl SubmissionReq {
    /// The submission without its language; the server resolves `lang` separately.
    pub fn into_submission(self) -> FormSubmission {
        FormSubmission {
            form_id: FormId::from(self.form_id),
            answers: self.submission_data,
            lang: None,
        }
    }
}

impl From<&FormSubmission> for SubmissionReq {
    fn from(submission: &FormSubmission) -> Self {
        Self {
            form_id: submission.form_id.to_string(),
            submission_data: submission.answers.clone(),
            lang: submission.lang.as_ref().map(|lang| lang.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRes {
    pub status: String,
}

impl SubmissionRes {
    pub fn success() -> Self {
        Self {
            status: "success".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredSubmissionRes {
    pub id: u64,
    pub form_id: String,
    #[schema(value_type = Object)]
    pub submission_data: Answers,
    pub submitted_at: DateTime<Utc>,
}

impl From<&StoredSubmission> for StoredSubmissionRes {
    fn from(submission: &StoredSubmission) -> Self {
        Self {
            id: submission.id,
            form_id: submission.form_id.to_string(),
            submission_data: submission.submission_data.clone(),
            submitted_at: submission.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub success: bool,
    /// `admin` or `patient`.
    pub user_type: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub message: String,
}

impl From<&UserRecord> for LoginRes {
    fn from(user: &UserRecord) -> Self {
        Self {
            success: true,
            user_type: user.role.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            message: format!("Welcome back! Logged in as {}.", user.role),
        }
    }
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestQuery {
    /// Preferred language code, e.g. `es`.
    pub lang: Option<String>,
}
