use crate::inflight::Action;
use crate::schema::FormId;
use crate::values::FieldKey;

/// A user-input policy violation.
///
/// The display text is the message shown inline next to the offending control. Raising one of
/// these never mutates builder or respondent state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field label is required")]
    EmptyLabel,
    #[error("Options are required for select, checkbox, or radio field types.")]
    MissingOptions,
    #[error("Please provide at least one valid option.")]
    NoValidOptions,
    #[error("Form name is required")]
    EmptyFormName,
    #[error("At least one field is required")]
    NoFields,
    #[error("Please complete all required fields ({} missing)", .0.len())]
    RequiredFieldsMissing(Vec<FieldKey>),
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Field key '{0}' is used by more than one field")]
    DuplicateFieldKey(FieldKey),
}

/// Failure talking to the Form-Storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("storage rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("form not found: {0}")]
    UnknownForm(FormId),
}

/// Failure reported by an identity source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("login request failed: {0}")]
    Transport(String),
    #[error("{0} is already in progress")]
    InFlight(Action),
}

/// Failure reported by a form translator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("translation service unavailable: {0}")]
    Unavailable(String),
    #[error("translation does not fit the source text: {0}")]
    Malformed(String),
}

/// Action-level error returned by builder and respondent operations.
///
/// Every variant is recoverable: the state that raised it is left as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to save form: {0}")]
    Save(#[source] StorageError),
    #[error("Failed to submit form: {0}")]
    Submit(#[source] StorageError),
    #[error("Failed to load form: {0}")]
    Load(#[source] StorageError),
    #[error("{0} is already in progress")]
    InFlight(Action),
    #[error("no form is loaded")]
    NoFormLoaded,
    #[error("This response was already submitted")]
    AlreadySubmitted,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to parse YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

impl FormError {
    /// Whether the error came from user input rather than a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(self, FormError::Validation(_))
    }
}

pub type FormResult<T> = std::result::Result<T, FormError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;
