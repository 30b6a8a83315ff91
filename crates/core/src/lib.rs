//! # Intake Core
//!
//! Schema-driven form building, rendering and validation.
//!
//! - [`builder`]: the admin's form authoring state
//! - [`render`]: turning a published form into control descriptors, and presence validation
//! - [`values`]: the respondent's answer store
//! - [`respondent`]: load, answer and submit the latest form
//! - [`access`]: role-based navigation decisions
//! - [`translation`]: forms and answers in the respondent's language
//!
//! **No transport concerns**: HTTP servers and clients live in `api-rest` and `intake-client`.
//! This crate only defines the [`storage::FormStorage`] and [`identity::IdentitySource`] seams
//! they implement.

pub mod access;
pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod identity;
pub mod inflight;
pub mod render;
pub mod respondent;
pub mod schema;
pub mod storage;
pub mod translation;
pub mod validation;
pub mod values;

pub use access::{AccessGate, Navigation, Role, Route, Session};
pub use builder::{BuilderPhase, FormBuilder};
pub use config::IntakeConfig;
pub use error::{
    AuthError, FormError, FormResult, StorageError, StorageResult, TranslationError,
    ValidationError,
};
pub use field::{FieldDefinition, FieldDraft, FieldId, FieldSchema, FieldType};
pub use identity::{IdentitySource, LocalIdentity, SessionSlot, UserDirectory, UserRecord};
pub use inflight::{Action, InFlight};
pub use render::{Control, RenderDescriptor, Verdict};
pub use respondent::{RespondentForm, RespondentPhase};
pub use schema::{FormId, FormSchema, NewForm, PublishedForm};
pub use storage::{FormStorage, FormSubmission, MemoryFormStorage};
pub use translation::{FormTranslator, PassThroughTranslator, TranslationCache};
pub use values::{AnswerValue, Answers, FieldKey, FormValueStore};

pub use intake_types::{LanguageCode, NonEmptyText};
