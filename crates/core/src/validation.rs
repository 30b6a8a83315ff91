//! Input validation utilities.
//!
//! This module contains the rules applied to builder input before it becomes part of a form.

use crate::error::ValidationError;
use crate::field::{FieldDefinition, FieldDraft};
use intake_types::NonEmptyText;

/// Splits raw option text on commas, trimming each token and discarding blank ones.
///
/// Duplicates are kept: two options may carry the same text.
pub fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|opt| !opt.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Trims an already split option list.
///
/// # Errors
///
/// - [`ValidationError::MissingOptions`] if the list is empty
/// - [`ValidationError::NoValidOptions`] if any option is blank
pub(crate) fn normalise_options(options: Vec<String>) -> Result<Vec<String>, ValidationError> {
    if options.is_empty() {
        return Err(ValidationError::MissingOptions);
    }

    options
        .into_iter()
        .map(|opt| {
            let trimmed = opt.trim();
            if trimmed.is_empty() {
                Err(ValidationError::NoValidOptions)
            } else {
                Ok(trimmed.to_owned())
            }
        })
        .collect()
}

/// Validates a builder draft.
///
/// Checks run in the order the builder reports them: label, then presence of option text,
/// then whether the option text yields at least one usable option.
pub fn validate_draft(draft: &FieldDraft) -> Result<FieldDefinition, ValidationError> {
    let label = NonEmptyText::new(&draft.label).map_err(|_| ValidationError::EmptyLabel)?;

    let options = if draft.field_type.requires_options() {
        if draft.options.trim().is_empty() {
            return Err(ValidationError::MissingOptions);
        }
        let parsed = parse_options(&draft.options);
        if parsed.is_empty() {
            return Err(ValidationError::NoValidOptions);
        }
        parsed
    } else {
        Vec::new()
    };

    FieldDefinition::new(label, draft.field_type.clone(), draft.required, options)
}
