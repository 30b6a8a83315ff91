//! The Form-Storage seam.
//!
//! [`FormStorage`] is the API the builder and respondent workflows consume. The HTTP client
//! crate implements it against the REST server; [`MemoryFormStorage`] implements it in
//! process and backs the REST server itself. Nothing here is durable.

use crate::error::{StorageError, StorageResult};
use crate::field::{FieldId, FieldSchema};
use crate::schema::{FormId, NewForm, PublishedForm};
use crate::values::Answers;
use chrono::{DateTime, Utc};
use intake_types::{LanguageCode, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Answers to one form, as sent to Form-Storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub form_id: FormId,
    #[serde(rename = "submission_data")]
    pub answers: Answers,
    /// Language the answers were given in. `None` means English.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<LanguageCode>,
}

/// Operations offered by Form-Storage.
pub trait FormStorage: Send + Sync {
    /// Persists a new form and returns its durable identifier.
    fn create_form(&self, form: &NewForm) -> impl Future<Output = StorageResult<FormId>> + Send;

    /// Fetches the most recently created form. `Ok(None)` means nothing is published yet.
    fn latest_form(
        &self,
        lang: Option<&LanguageCode>,
    ) -> impl Future<Output = StorageResult<Option<PublishedForm>>> + Send;

    fn create_submission(
        &self,
        submission: &FormSubmission,
    ) -> impl Future<Output = StorageResult<()>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredForm {
    pub id: FormId,
    pub form_name: NonEmptyText,
    pub fields: Vec<FieldSchema>,
    pub created_at: DateTime<Utc>,
}

impl StoredForm {
    /// Field ids are generated per field on insert, so keys never collide here.
    pub fn to_published(&self) -> PublishedForm {
        PublishedForm {
            id: self.id.clone(),
            form_name: self.form_name.to_string(),
            fields: self.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSubmission {
    pub id: u64,
    pub form_id: FormId,
    pub submission_data: Answers,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    forms: Vec<StoredForm>,
    submissions: Vec<StoredSubmission>,
}

/// In-process Form-Storage. Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryFormStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryFormStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))
    }

    /// Stores a form, assigning a durable id to the form and to each of its fields.
    pub fn insert_form(&self, form: NewForm) -> StorageResult<StoredForm> {
        let stored = StoredForm {
            id: FormId::generate(),
            form_name: form.form_name,
            fields: form
                .fields
                .into_iter()
                .map(|definition| FieldSchema::new(FieldId::generate(), definition))
                .collect(),
            created_at: Utc::now(),
        };

        self.write()?.forms.push(stored.clone());
        tracing::info!(
            "stored form {} ({} fields)",
            stored.id,
            stored.fields.len()
        );
        Ok(stored)
    }

    /// The most recently stored form.
    pub fn latest(&self) -> StorageResult<Option<StoredForm>> {
        Ok(self.read()?.forms.last().cloned())
    }

    pub fn get_form(&self, form_id: &FormId) -> StorageResult<Option<StoredForm>> {
        Ok(self
            .read()?
            .forms
            .iter()
            .find(|form| &form.id == form_id)
            .cloned())
    }

    /// Every stored form in creation order.
    pub fn list_forms(&self) -> StorageResult<Vec<StoredForm>> {
        Ok(self.read()?.forms.clone())
    }

    /// # Errors
    ///
    /// Returns [`StorageError::UnknownForm`] if the submission names a form that was never
    /// stored.
    pub fn insert_submission(
        &self,
        submission: FormSubmission,
    ) -> StorageResult<StoredSubmission> {
        let mut inner = self.write()?;
        if !inner.forms.iter().any(|form| form.id == submission.form_id) {
            return Err(StorageError::UnknownForm(submission.form_id));
        }

        let stored = StoredSubmission {
            id: inner.submissions.len() as u64 + 1,
            form_id: submission.form_id,
            submission_data: submission.answers,
            submitted_at: Utc::now(),
        };
        inner.submissions.push(stored.clone());
        tracing::info!("stored submission {} for form {}", stored.id, stored.form_id);
        Ok(stored)
    }

    /// Every submission, newest first.
    pub fn list_submissions(&self) -> StorageResult<Vec<StoredSubmission>> {
        Ok(self.read()?.submissions.iter().rev().cloned().collect())
    }
}

impl FormStorage for MemoryFormStorage {
    async fn create_form(&self, form: &NewForm) -> StorageResult<FormId> {
        form.validate().map_err(|e| StorageError::Rejected {
            status: 400,
            message: e.to_string(),
        })?;
        Ok(self.insert_form(form.clone())?.id)
    }

    /// Returns the form as authored. Translation sits in front of storage, see
    /// [`TranslationCache`](crate::translation::TranslationCache).
    async fn latest_form(
        &self,
        _lang: Option<&LanguageCode>,
    ) -> StorageResult<Option<PublishedForm>> {
        Ok(self.latest()?.map(|form| form.to_published()))
    }

    async fn create_submission(&self, submission: &FormSubmission) -> StorageResult<()> {
        self.insert_submission(submission.clone()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDraft, FieldType};

    fn new_form(name: &str) -> NewForm {
        NewForm {
            form_name: NonEmptyText::new(name).unwrap(),
            fields: vec![FieldDraft::new("Name", FieldType::Text)
                .required(true)
                .to_definition()
                .unwrap()],
        }
    }

    #[tokio::test]
    async fn test_latest_form_is_none_when_empty() {
        let storage = MemoryFormStorage::new();
        assert_eq!(storage.latest_form(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_latest_form_returns_most_recent() {
        let storage = MemoryFormStorage::new();
        storage.create_form(&new_form("First")).await.unwrap();
        storage.create_form(&new_form("Second")).await.unwrap();
        let third = storage.create_form(&new_form("Third")).await.unwrap();

        let latest = storage.latest_form(None).await.unwrap().unwrap();
        assert_eq!(latest.id, third);
        assert_eq!(latest.form_name, "Third");
        assert_eq!(storage.list_forms().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_form_assigns_field_ids() {
        let storage = MemoryFormStorage::new();
        let form_id = storage.create_form(&new_form("Intake")).await.unwrap();
        let stored = storage.get_form(&form_id).unwrap().unwrap();
        assert_eq!(stored.fields.len(), 1);
        assert_eq!(stored.fields[0].id.as_str().len(), 32);
    }

    #[tokio::test]
    async fn test_create_form_rejects_empty_field_list() {
        let storage = MemoryFormStorage::new();
        let mut form = new_form("Empty");
        form.fields.clear();
        let err = storage.create_form(&form).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected { status: 400, .. }));
        assert!(storage.list_forms().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submission_for_unknown_form_is_rejected() {
        let storage = MemoryFormStorage::new();
        let submission = FormSubmission {
            form_id: FormId::from("missing"),
            answers: Answers::new(),
            lang: None,
        };
        let err = storage.create_submission(&submission).await.unwrap_err();
        assert_eq!(err, StorageError::UnknownForm(FormId::from("missing")));
    }

    #[tokio::test]
    async fn test_submissions_listed_newest_first() {
        let storage = MemoryFormStorage::new();
        let form_id = storage.create_form(&new_form("Intake")).await.unwrap();
        for _ in 0..2 {
            storage
                .create_submission(&FormSubmission {
                    form_id: form_id.clone(),
                    answers: Answers::new(),
                    lang: None,
                })
                .await
                .unwrap();
        }

        let ids: Vec<u64> = storage
            .list_submissions()
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, [2, 1]);
    }
}
