//! Form authoring state.
//!
//! [`FormBuilder`] holds everything the builder role is editing: the form name, the ordered
//! field list, the draft field being typed, and the last error shown to the user.
//!
//! Saving is split into [`FormBuilder::begin_save`] and [`FormBuilder::finish_save`] so that a
//! presentation layer can release its borrow while the storage call is outstanding. While a
//! save is pending, a second `begin_save` fails with [`FormError::InFlight`].

use crate::error::{FormError, FormResult, StorageResult, ValidationError};
use crate::field::{FieldDraft, FieldId, FieldSchema, FieldType};
use crate::inflight::{Action, InFlight, InFlightTicket};
use crate::schema::{FormId, FormSchema, NewForm};
use crate::storage::FormStorage;
use intake_types::NonEmptyText;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderPhase {
    Editing,
    /// Reported while the save slot is held, so a dropped save returns to the stored phase.
    Saving,
    /// The form was stored; the builder is empty again.
    Saved(FormId),
}

static SAVING: BuilderPhase = BuilderPhase::Saving;

/// A validated save request whose storage call has not resolved yet.
#[derive(Debug)]
pub struct PendingSave {
    form: NewForm,
    ticket: InFlightTicket,
}

impl PendingSave {
    pub fn form(&self) -> &NewForm {
        &self.form
    }
}

#[derive(Debug)]
pub struct FormBuilder {
    form_name: String,
    fields: Vec<FieldSchema>,
    draft: FieldDraft,
    last_error: Option<String>,
    phase: BuilderPhase,
    saving: InFlight,
}

impl Default for FormBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FormBuilder {
    pub fn new() -> Self {
        Self {
            form_name: String::new(),
            fields: Vec::new(),
            draft: FieldDraft::default(),
            last_error: None,
            phase: BuilderPhase::Editing,
            saving: InFlight::new(Action::SaveForm),
        }
    }

    /// Field types the builder offers, in picker order. Use
    /// [`FieldType::display_name`] for their labels.
    pub fn field_types() -> [FieldType; 9] {
        FieldType::authorable()
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    pub fn set_form_name(&mut self, name: impl Into<String>) {
        self.form_name = name.into();
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn draft(&self) -> &FieldDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut FieldDraft {
        &mut self.draft
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn phase(&self) -> &BuilderPhase {
        if self.saving.is_busy() {
            &SAVING
        } else {
            &self.phase
        }
    }

    /// True while a save is outstanding; the save trigger should be disabled.
    pub fn is_saving(&self) -> bool {
        self.saving.is_busy()
    }

    fn reject(&mut self, err: ValidationError) -> FormError {
        tracing::warn!("builder input rejected: {}", err);
        self.last_error = Some(err.to_string());
        FormError::Validation(err)
    }

    /// Validates the current draft and appends it as a new field.
    ///
    /// On success the draft is reset and the last error cleared. On failure only the last
    /// error changes.
    pub fn add_field(&mut self) -> FormResult<FieldId> {
        let definition = match self.draft.to_definition() {
            Ok(definition) => definition,
            Err(err) => return Err(self.reject(err)),
        };

        let id = FieldId::generate();
        self.fields.push(FieldSchema::new(id.clone(), definition));
        self.draft = FieldDraft::default();
        self.last_error = None;
        Ok(id)
    }

    /// Replaces the draft with `draft` and adds it.
    pub fn add_field_from(&mut self, draft: FieldDraft) -> FormResult<FieldId> {
        self.draft = draft;
        self.add_field()
    }

    /// Removes the field with `id`. Unknown ids are ignored.
    pub fn remove_field(&mut self, id: &FieldId) {
        self.fields.retain(|field| &field.id != id);
    }

    /// Swaps the field at `index` with the one above it. No-op at the top.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn move_up(&mut self, index: usize) {
        assert!(index < self.fields.len(), "field index {index} out of range");
        if index == 0 {
            return;
        }
        self.fields.swap(index, index - 1);
    }

    /// Swaps the field at `index` with the one below it. No-op at the bottom.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn move_down(&mut self, index: usize) {
        assert!(index < self.fields.len(), "field index {index} out of range");
        if index + 1 == self.fields.len() {
            return;
        }
        self.fields.swap(index, index + 1);
    }

    /// The schema the builder would save right now.
    pub fn schema(&self) -> Result<FormSchema, ValidationError> {
        let name =
            NonEmptyText::new(&self.form_name).map_err(|_| ValidationError::EmptyFormName)?;
        FormSchema::new(name, self.fields.clone())
    }

    /// Validates the form and claims the save slot.
    ///
    /// # Errors
    ///
    /// - [`FormError::Validation`] when the name is blank or there are no fields
    /// - [`FormError::InFlight`] when a previous save has not finished
    pub fn begin_save(&mut self) -> FormResult<PendingSave> {
        let schema = match self.schema() {
            Ok(schema) => schema,
            Err(err) => return Err(self.reject(err)),
        };
        let ticket = self.saving.try_begin()?;

        self.phase = BuilderPhase::Editing;
        self.last_error = None;
        Ok(PendingSave {
            form: schema.to_new_form(),
            ticket,
        })
    }

    /// Applies the storage outcome of a pending save and releases the save slot.
    ///
    /// Success resets the builder to empty defaults. Failure keeps every field so the user
    /// can retry.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        outcome: StorageResult<FormId>,
    ) -> FormResult<FormId> {
        let action = pending.ticket.action();
        drop(pending);
        match outcome {
            Ok(form_id) => {
                tracing::info!(action = %action, "form {} saved", form_id);
                self.form_name.clear();
                self.fields.clear();
                self.draft = FieldDraft::default();
                self.last_error = None;
                self.phase = BuilderPhase::Saved(form_id.clone());
                Ok(form_id)
            }
            Err(err) => {
                tracing::error!(action = %action, "failed to save form: {}", err);
                let err = FormError::Save(err);
                self.last_error = Some(err.to_string());
                self.phase = BuilderPhase::Editing;
                Err(err)
            }
        }
    }

    /// Validates, sends the form to `storage`, and applies the outcome.
    pub async fn save<S: FormStorage>(&mut self, storage: &S) -> FormResult<FormId> {
        let pending = self.begin_save()?;
        let outcome = storage.create_form(pending.form()).await;
        self.finish_save(pending, outcome)
    }

    /// Leaves the saved confirmation and returns to editing.
    pub fn start_new_form(&mut self) {
        self.phase = BuilderPhase::Editing;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{FormSubmission, MemoryFormStorage};
    use crate::schema::PublishedForm;
    use intake_types::LanguageCode;

    struct FailingStorage;

    impl FormStorage for FailingStorage {
        async fn create_form(&self, _form: &NewForm) -> StorageResult<FormId> {
            Err(StorageError::Transport("connection refused".into()))
        }

        async fn latest_form(
            &self,
            _lang: Option<&LanguageCode>,
        ) -> StorageResult<Option<PublishedForm>> {
            Ok(None)
        }

        async fn create_submission(&self, _submission: &FormSubmission) -> StorageResult<()> {
            Ok(())
        }
    }

    /// Storage whose create call never resolves.
    struct HangingStorage;

    impl FormStorage for HangingStorage {
        async fn create_form(&self, _form: &NewForm) -> StorageResult<FormId> {
            std::future::pending().await
        }

        async fn latest_form(
            &self,
            _lang: Option<&LanguageCode>,
        ) -> StorageResult<Option<PublishedForm>> {
            Ok(None)
        }

        async fn create_submission(&self, _submission: &FormSubmission) -> StorageResult<()> {
            Ok(())
        }
    }

    fn builder_with(labels: &[&str]) -> FormBuilder {
        let mut builder = FormBuilder::new();
        for label in labels {
            builder
                .add_field_from(FieldDraft::new(*label, FieldType::Text))
                .unwrap();
        }
        builder
    }

    fn labels(builder: &FormBuilder) -> Vec<&str> {
        builder.fields().iter().map(FieldSchema::label).collect()
    }

    #[test]
    fn test_add_field_trims_label_and_resets_draft() {
        let mut builder = FormBuilder::new();
        builder.draft_mut().label = "  Name ".into();
        builder.draft_mut().required = true;

        builder.add_field().unwrap();

        assert_eq!(labels(&builder), ["Name"]);
        assert!(builder.fields()[0].required());
        assert_eq!(builder.draft(), &FieldDraft::default());
        assert_eq!(builder.last_error(), None);
    }

    #[test]
    fn test_add_field_failure_keeps_draft_and_sets_error() {
        let mut builder = FormBuilder::new();
        let draft = FieldDraft::new("Colour", FieldType::Select).options(" , ");
        let err = builder.add_field_from(draft.clone()).unwrap_err();

        assert!(matches!(
            err,
            FormError::Validation(ValidationError::NoValidOptions)
        ));
        assert!(builder.fields().is_empty());
        assert_eq!(builder.draft(), &draft);
        assert_eq!(
            builder.last_error(),
            Some("Please provide at least one valid option.")
        );
    }

    #[test]
    fn test_add_field_parses_options_keeping_duplicates() {
        let mut builder = FormBuilder::new();
        builder
            .add_field_from(FieldDraft::new("Pick", FieldType::Checkbox).options("a, b,,a "))
            .unwrap();
        assert_eq!(builder.fields()[0].options(), ["a", "b", "a"]);
    }

    #[test]
    fn test_added_fields_get_unique_ids() {
        let builder = builder_with(&["A", "B", "C"]);
        let mut ids: Vec<&FieldId> = builder.fields().iter().map(|f| &f.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_remove_field_ignores_unknown_id() {
        let mut builder = builder_with(&["A", "B"]);
        let first = builder.fields()[0].id.clone();

        builder.remove_field(&FieldId::from("nope"));
        assert_eq!(labels(&builder), ["A", "B"]);

        builder.remove_field(&first);
        assert_eq!(labels(&builder), ["B"]);
    }

    #[test]
    fn test_move_boundaries_are_noops() {
        let mut builder = builder_with(&["A", "B", "C"]);
        builder.move_up(0);
        builder.move_down(2);
        assert_eq!(labels(&builder), ["A", "B", "C"]);

        builder.move_up(2);
        assert_eq!(labels(&builder), ["A", "C", "B"]);
        builder.move_down(0);
        assert_eq!(labels(&builder), ["C", "A", "B"]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_move_out_of_range_panics() {
        let mut builder = builder_with(&["A"]);
        builder.move_down(3);
    }

    #[test]
    fn test_moves_preserve_field_multiset() {
        let mut builder = builder_with(&["A", "B", "C", "D", "E"]);
        let mut expected: Vec<FieldSchema> = builder.fields().to_vec();
        expected.sort_by(|a, b| a.id.cmp(&b.id));

        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let index = (seed >> 33) as usize % builder.fields().len();
            if seed & 1 == 0 {
                builder.move_up(index);
            } else {
                builder.move_down(index);
            }
        }

        let mut actual: Vec<FieldSchema> = builder.fields().to_vec();
        actual.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_begin_save_requires_name_and_fields() {
        let mut builder = FormBuilder::new();
        builder.set_form_name("   ");
        let err = builder.begin_save().unwrap_err();
        assert!(matches!(
            err,
            FormError::Validation(ValidationError::EmptyFormName)
        ));

        builder.set_form_name("Intake");
        let err = builder.begin_save().unwrap_err();
        assert!(matches!(err, FormError::Validation(ValidationError::NoFields)));
        assert_eq!(builder.last_error(), Some("At least one field is required"));
        assert!(!builder.is_saving());
    }

    #[test]
    fn test_second_save_while_pending_is_refused() {
        let mut builder = builder_with(&["Name"]);
        builder.set_form_name("Intake");

        let pending = builder.begin_save().unwrap();
        assert!(builder.is_saving());
        assert_eq!(builder.phase(), &BuilderPhase::Saving);
        assert!(matches!(
            builder.begin_save().unwrap_err(),
            FormError::InFlight(Action::SaveForm)
        ));

        let form_id = builder
            .finish_save(pending, Ok(FormId::from("form-1")))
            .unwrap();
        assert_eq!(form_id, FormId::from("form-1"));
        assert!(!builder.is_saving());
    }

    #[tokio::test]
    async fn test_save_success_resets_state() {
        let storage = MemoryFormStorage::new();
        let mut builder = builder_with(&["Name", "Town"]);
        builder.set_form_name(" Intake ");
        builder.draft_mut().label = "half typed".into();

        let form_id = builder.save(&storage).await.unwrap();

        assert_eq!(builder.phase(), &BuilderPhase::Saved(form_id.clone()));
        assert_eq!(builder.form_name(), "");
        assert!(builder.fields().is_empty());
        assert_eq!(builder.draft(), &FieldDraft::default());

        let stored = storage.get_form(&form_id).unwrap().unwrap();
        assert_eq!(stored.form_name.as_str(), "Intake");
        let stored_labels: Vec<&str> = stored.fields.iter().map(FieldSchema::label).collect();
        assert_eq!(stored_labels, ["Name", "Town"]);

        builder.start_new_form();
        assert_eq!(builder.phase(), &BuilderPhase::Editing);
    }

    #[tokio::test]
    async fn test_save_failure_preserves_state() {
        let mut builder = builder_with(&["Name"]);
        builder.set_form_name("Intake");
        let before = builder.fields().to_vec();

        let err = builder.save(&FailingStorage).await.unwrap_err();

        assert!(matches!(err, FormError::Save(StorageError::Transport(_))));
        assert_eq!(builder.fields(), before.as_slice());
        assert_eq!(builder.form_name(), "Intake");
        assert_eq!(builder.phase(), &BuilderPhase::Editing);
        assert!(builder
            .last_error()
            .is_some_and(|msg| msg.starts_with("Failed to save form")));
        assert!(!builder.is_saving());
    }

    #[tokio::test]
    async fn test_cancelled_save_returns_to_editing() {
        let mut builder = builder_with(&["Name"]);
        builder.set_form_name("Intake");

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            builder.save(&HangingStorage),
        )
        .await;
        assert!(timed_out.is_err());

        assert_eq!(builder.phase(), &BuilderPhase::Editing);
        assert!(!builder.is_saving());
        assert_eq!(labels(&builder), ["Name"]);

        let form_id = builder.save(&MemoryFormStorage::new()).await.unwrap();
        assert_eq!(builder.phase(), &BuilderPhase::Saved(form_id));
    }

    #[test]
    fn test_field_types_lists_nine_authorable_types() {
        let types = FormBuilder::field_types();
        assert_eq!(types.len(), 9);
        assert_eq!(types[4], FieldType::Tel);
        assert_eq!(types[4].display_name(), "Phone");
        assert!(types.iter().all(|t| !matches!(t, FieldType::Other(_))));
    }
}
