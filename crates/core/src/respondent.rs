//! The respondent side: load the latest form, collect answers, submit.

use crate::error::{FormError, FormResult, StorageResult};
use crate::inflight::{Action, InFlight, InFlightTicket};
use crate::render::{self, RenderDescriptor, Verdict};
use crate::schema::PublishedForm;
use crate::storage::{FormStorage, FormSubmission};
use crate::values::{AnswerValue, FieldKey, FormValueStore};
use intake_types::LanguageCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespondentPhase {
    Loading,
    Ready,
    /// Storage has no published form.
    NoForm,
    Failed(String),
    Submitted,
}

/// A validated submission whose storage call has not resolved yet.
#[derive(Debug)]
pub struct PendingSubmit {
    submission: FormSubmission,
    ticket: InFlightTicket,
}

impl PendingSubmit {
    pub fn submission(&self) -> &FormSubmission {
        &self.submission
    }
}

#[derive(Debug)]
pub struct RespondentForm {
    form: Option<PublishedForm>,
    values: FormValueStore,
    phase: RespondentPhase,
    last_error: Option<String>,
    lang: Option<LanguageCode>,
    submitting: InFlight,
}

impl Default for RespondentForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RespondentForm {
    pub fn new() -> Self {
        Self {
            form: None,
            values: FormValueStore::new(),
            phase: RespondentPhase::Loading,
            last_error: None,
            lang: None,
            submitting: InFlight::new(Action::SubmitForm),
        }
    }

    pub fn form(&self) -> Option<&PublishedForm> {
        self.form.as_ref()
    }

    pub fn values(&self) -> &FormValueStore {
        &self.values
    }

    pub fn phase(&self) -> &RespondentPhase {
        &self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Language the loaded form was requested in; submissions carry it.
    pub fn lang(&self) -> Option<&LanguageCode> {
        self.lang.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_busy()
    }

    /// Fetches the latest form from `storage` in `lang` and seeds the value store from it.
    ///
    /// Nothing changes until the fetch resolves.
    pub async fn load<S: FormStorage>(
        &mut self,
        storage: &S,
        lang: Option<&LanguageCode>,
    ) -> FormResult<()> {
        let outcome = storage.latest_form(lang).await;
        self.apply_loaded(outcome)?;
        if self.form.is_some() {
            self.lang = lang.cloned();
        }
        Ok(())
    }

    /// Applies the outcome of a latest-form fetch.
    ///
    /// `Ok(None)` is not an error; the phase becomes [`RespondentPhase::NoForm`]. A failed
    /// fetch keeps an already loaded form and its answers, and only becomes
    /// [`RespondentPhase::Failed`] when there was nothing loaded before.
    pub fn apply_loaded(
        &mut self,
        outcome: StorageResult<Option<PublishedForm>>,
    ) -> FormResult<()> {
        match outcome {
            Ok(Some(form)) => {
                tracing::info!("loaded form {} ({} fields)", form.id, form.fields.len());
                self.values.initialize(&form.fields);
                self.form = Some(form);
                self.last_error = None;
                self.phase = RespondentPhase::Ready;
                Ok(())
            }
            Ok(None) => {
                tracing::info!("no form published yet");
                self.form = None;
                self.values = FormValueStore::new();
                self.last_error = None;
                self.phase = RespondentPhase::NoForm;
                Ok(())
            }
            Err(err) => {
                tracing::error!("failed to load form: {}", err);
                let err = FormError::Load(err);
                self.last_error = Some(err.to_string());
                if self.form.is_none() {
                    self.phase = RespondentPhase::Failed(err.to_string());
                }
                Err(err)
            }
        }
    }

    pub fn set_value(&mut self, key: FieldKey, value: impl Into<AnswerValue>) {
        self.values.set_value(key, value);
    }

    pub fn check_option(&mut self, key: &FieldKey, option: &str) {
        self.values.check_option(key, option);
    }

    pub fn uncheck_option(&mut self, key: &FieldKey, option: &str) {
        self.values.uncheck_option(key, option);
    }

    /// Render descriptors for the loaded form; empty when nothing is loaded.
    pub fn render(&self) -> Vec<RenderDescriptor> {
        match &self.form {
            Some(form) => render::render_form(form, &self.values),
            None => Vec::new(),
        }
    }

    pub fn validate(&self) -> FormResult<Verdict> {
        let form = self.form.as_ref().ok_or(FormError::NoFormLoaded)?;
        Ok(render::validate(form, &self.values))
    }

    /// Validates the answers and claims the submit slot.
    ///
    /// A failing verdict is reported as [`FormError::Validation`] and nothing is sent. Once
    /// a response is submitted, [`RespondentForm::fill_another`] must be called before the
    /// next one.
    pub fn begin_submit(&mut self) -> FormResult<PendingSubmit> {
        let form = self.form.as_ref().ok_or(FormError::NoFormLoaded)?;
        if self.phase == RespondentPhase::Submitted {
            return Err(FormError::AlreadySubmitted);
        }
        if let Err(err) = render::validate(form, &self.values).into_result() {
            tracing::warn!("submission blocked: {}", err);
            self.last_error = Some(err.to_string());
            return Err(err.into());
        }
        let ticket = self.submitting.try_begin()?;

        self.last_error = None;
        Ok(PendingSubmit {
            submission: FormSubmission {
                form_id: form.id.clone(),
                answers: self.values.snapshot().as_ref().clone(),
                lang: self.lang.clone(),
            },
            ticket,
        })
    }

    /// Applies the storage outcome of a pending submission and releases the slot.
    ///
    /// Failure keeps the answers so the respondent can retry.
    pub fn finish_submit(
        &mut self,
        pending: PendingSubmit,
        outcome: StorageResult<()>,
    ) -> FormResult<()> {
        let action = pending.ticket.action();
        let form_id = pending.submission.form_id.clone();
        drop(pending);
        match outcome {
            Ok(()) => {
                tracing::info!(action = %action, "submitted answers for form {}", form_id);
                self.phase = RespondentPhase::Submitted;
                Ok(())
            }
            Err(err) => {
                tracing::error!(action = %action, "failed to submit form {}: {}", form_id, err);
                let err = FormError::Submit(err);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn submit<S: FormStorage>(&mut self, storage: &S) -> FormResult<()> {
        let pending = self.begin_submit()?;
        let outcome = storage.create_submission(pending.submission()).await;
        self.finish_submit(pending, outcome)
    }

    /// Clears the answers and returns to [`RespondentPhase::Ready`] on the same form.
    pub fn fill_another(&mut self) -> FormResult<()> {
        let form = self.form.as_ref().ok_or(FormError::NoFormLoaded)?;
        self.values.initialize(&form.fields);
        self.last_error = None;
        self.phase = RespondentPhase::Ready;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FormBuilder;
    use crate::error::{StorageError, ValidationError};
    use crate::field::{FieldDraft, FieldType};
    use crate::schema::{FormId, NewForm};
    use crate::storage::MemoryFormStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts submissions that actually reach storage.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryFormStorage,
        submissions: AtomicUsize,
    }

    impl FormStorage for CountingStorage {
        async fn create_form(&self, form: &NewForm) -> StorageResult<FormId> {
            self.inner.create_form(form).await
        }

        async fn latest_form(
            &self,
            lang: Option<&LanguageCode>,
        ) -> StorageResult<Option<PublishedForm>> {
            self.inner.latest_form(lang).await
        }

        async fn create_submission(&self, submission: &FormSubmission) -> StorageResult<()> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            self.inner.create_submission(submission).await
        }
    }

    async fn publish_intake(storage: &CountingStorage) {
        let mut builder = FormBuilder::new();
        builder.set_form_name("Intake");
        builder
            .add_field_from(FieldDraft::new("Name", FieldType::Text).required(true))
            .unwrap();
        builder.save(storage).await.unwrap();
    }

    #[tokio::test]
    async fn test_build_fill_and_submit() {
        let storage = CountingStorage::default();
        publish_intake(&storage).await;

        let mut respondent = RespondentForm::new();
        respondent.load(&storage, None).await.unwrap();
        assert_eq!(respondent.phase(), &RespondentPhase::Ready);

        let form = respondent.form().unwrap().clone();
        assert_eq!(form.form_name, "Intake");
        let key = FieldKey::for_field(&form.fields[0]);
        assert_eq!(respondent.values().get(&key), Some(&AnswerValue::from("")));

        respondent.set_value(key.clone(), "Alice");
        respondent.submit(&storage).await.unwrap();
        assert_eq!(respondent.phase(), &RespondentPhase::Submitted);
        assert_eq!(storage.submissions.load(Ordering::SeqCst), 1);

        let stored = storage.inner.list_submissions().unwrap();
        assert_eq!(stored[0].form_id, form.id);
        assert_eq!(
            stored[0].submission_data.get(&key),
            Some(&AnswerValue::from("Alice"))
        );

        respondent.fill_another().unwrap();
        assert_eq!(respondent.phase(), &RespondentPhase::Ready);
        assert_eq!(respondent.values().get(&key), Some(&AnswerValue::from("")));

        let err = respondent.submit(&storage).await.unwrap_err();
        assert!(matches!(
            err,
            FormError::Validation(ValidationError::RequiredFieldsMissing(ref missing))
                if missing == &vec![key.clone()]
        ));
        assert_eq!(storage.submissions.load(Ordering::SeqCst), 1);
        assert!(respondent.last_error().is_some());
        assert!(!respondent.is_submitting());
    }

    #[tokio::test]
    async fn test_load_without_forms_is_no_form() {
        let storage = CountingStorage::default();
        let mut respondent = RespondentForm::new();
        respondent.load(&storage, None).await.unwrap();
        assert_eq!(respondent.phase(), &RespondentPhase::NoForm);
        assert!(respondent.render().is_empty());
        assert!(matches!(
            respondent.validate().unwrap_err(),
            FormError::NoFormLoaded
        ));
    }

    #[test]
    fn test_load_failure_sets_failed_phase() {
        let mut respondent = RespondentForm::new();
        let err = respondent
            .apply_loaded(Err(StorageError::Transport("connection refused".into())))
            .unwrap_err();
        assert!(matches!(err, FormError::Load(_)));
        assert!(matches!(
            respondent.phase(),
            RespondentPhase::Failed(msg) if msg.contains("refused")
        ));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_form_and_answers() {
        let storage = CountingStorage::default();
        publish_intake(&storage).await;
        let mut respondent = RespondentForm::new();
        respondent.load(&storage, None).await.unwrap();
        let key = FieldKey::for_field(&respondent.form().unwrap().fields[0]);
        respondent.set_value(key.clone(), "Alice");

        let err = respondent
            .apply_loaded(Err(StorageError::Transport("down".into())))
            .unwrap_err();
        assert!(matches!(err, FormError::Load(_)));
        assert_eq!(respondent.form().unwrap().form_name, "Intake");
        assert_eq!(respondent.phase(), &RespondentPhase::Ready);
        assert_eq!(respondent.values().get(&key), Some(&AnswerValue::from("Alice")));
        assert_eq!(respondent.render().len(), 1);
        assert!(respondent.last_error().is_some_and(|msg| msg.contains("down")));

        respondent.submit(&storage).await.unwrap();
        assert_eq!(storage.submissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submitted_response_needs_fill_another() {
        let storage = CountingStorage::default();
        publish_intake(&storage).await;
        let mut respondent = RespondentForm::new();
        respondent.load(&storage, None).await.unwrap();
        let key = FieldKey::for_field(&respondent.form().unwrap().fields[0]);
        respondent.set_value(key.clone(), "Alice");
        respondent.submit(&storage).await.unwrap();

        let err = respondent.submit(&storage).await.unwrap_err();
        assert!(matches!(err, FormError::AlreadySubmitted));
        assert_eq!(storage.submissions.load(Ordering::SeqCst), 1);

        respondent.fill_another().unwrap();
        respondent.set_value(key, "Bob");
        respondent.submit(&storage).await.unwrap();
        assert_eq!(storage.submissions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submission_carries_requested_language() {
        let storage = CountingStorage::default();
        publish_intake(&storage).await;
        let es = LanguageCode::parse("es").unwrap();
        let mut respondent = RespondentForm::new();
        respondent.load(&storage, Some(&es)).await.unwrap();
        assert_eq!(respondent.lang(), Some(&es));

        let key = FieldKey::for_field(&respondent.form().unwrap().fields[0]);
        respondent.set_value(key, "Alicia");
        let pending = respondent.begin_submit().unwrap();
        assert_eq!(pending.submission().lang.as_ref(), Some(&es));
    }

    #[tokio::test]
    async fn test_second_submit_refused_while_pending() {
        let storage = CountingStorage::default();
        publish_intake(&storage).await;
        let mut respondent = RespondentForm::new();
        respondent.load(&storage, None).await.unwrap();
        let key = FieldKey::for_field(&respondent.form().unwrap().fields[0]);
        respondent.set_value(key, "Bob");

        let pending = respondent.begin_submit().unwrap();
        assert!(respondent.is_submitting());
        assert!(matches!(
            respondent.begin_submit().unwrap_err(),
            FormError::InFlight(Action::SubmitForm)
        ));

        let err = respondent
            .finish_submit(pending, Err(StorageError::Unavailable("down".into())))
            .unwrap_err();
        assert!(matches!(err, FormError::Submit(_)));
        assert_eq!(respondent.phase(), &RespondentPhase::Ready);
        assert!(!respondent.is_submitting());
        assert!(respondent.begin_submit().is_ok());
    }

    #[tokio::test]
    async fn test_checkbox_answers_render_checked() {
        let storage = CountingStorage::default();
        let mut builder = FormBuilder::new();
        builder.set_form_name("Allergies");
        builder
            .add_field_from(
                FieldDraft::new("Known allergies", FieldType::Checkbox)
                    .required(true)
                    .options("Peanuts, Latex, Penicillin"),
            )
            .unwrap();
        builder.save(&storage).await.unwrap();

        let mut respondent = RespondentForm::new();
        respondent.load(&storage, None).await.unwrap();
        let key = FieldKey::for_field(&respondent.form().unwrap().fields[0]);
        assert!(!respondent.validate().unwrap().is_valid());

        respondent.check_option(&key, "Latex");
        respondent.check_option(&key, "Peanuts");
        respondent.uncheck_option(&key, "Latex");
        assert!(respondent.validate().unwrap().is_valid());

        let descriptors = respondent.render();
        assert_eq!(descriptors.len(), 1);
        assert!(descriptors[0].control.is_group());
        respondent.submit(&storage).await.unwrap();
    }
}
