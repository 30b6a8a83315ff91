//! Translation of published forms and submitted answers.
//!
//! Forms are authored in English. A respondent may ask for the latest form in any configured
//! language: the form name, labels and options are translated on the way out and cached per
//! form and language. Answers given in another language are translated back to English before
//! they are stored.
//!
//! [`FormTranslator`] translates batches of strings and is where an external translation
//! service plugs in. [`PassThroughTranslator`] returns its input unchanged.

use crate::error::TranslationError;
use crate::field::{FieldDefinition, FieldSchema};
use crate::schema::{FormId, PublishedForm};
use crate::values::{AnswerValue, Answers};
use intake_types::{LanguageCode, NonEmptyText};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

pub trait FormTranslator: Send + Sync {
    /// Translates `texts` from `from` into `to`, returning one string per input, in order.
    fn translate(
        &self,
        texts: &[String],
        from: &LanguageCode,
        to: &LanguageCode,
    ) -> impl Future<Output = Result<Vec<String>, TranslationError>> + Send;
}

/// Translator that leaves every string as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughTranslator;

impl FormTranslator for PassThroughTranslator {
    async fn translate(
        &self,
        texts: &[String],
        _from: &LanguageCode,
        _to: &LanguageCode,
    ) -> Result<Vec<String>, TranslationError> {
        Ok(texts.to_vec())
    }
}

/// Form name, then each label followed by its options.
fn form_texts(form: &PublishedForm) -> Vec<String> {
    let mut texts = vec![form.form_name.clone()];
    for field in &form.fields {
        texts.push(field.label().to_owned());
        texts.extend(field.options().iter().cloned());
    }
    texts
}

fn next_text(texts: &mut impl Iterator<Item = String>) -> Result<String, TranslationError> {
    texts
        .next()
        .ok_or_else(|| TranslationError::Malformed("too few strings returned".into()))
}

fn apply_form_texts(
    form: &PublishedForm,
    translated: Vec<String>,
) -> Result<PublishedForm, TranslationError> {
    let mut texts = translated.into_iter();
    let form_name = next_text(&mut texts)?;

    let mut fields = Vec::with_capacity(form.fields.len());
    for field in &form.fields {
        let label = NonEmptyText::new(next_text(&mut texts)?)
            .map_err(|_| TranslationError::Malformed(format!("blank label for {}", field.id)))?;
        let options = field
            .options()
            .iter()
            .map(|_| next_text(&mut texts))
            .collect::<Result<Vec<_>, _>>()?;
        let definition = FieldDefinition::new(
            label,
            field.field_type().clone(),
            field.required(),
            options,
        )
        .map_err(|e| TranslationError::Malformed(e.to_string()))?;
        fields.push(FieldSchema::new(field.id.clone(), definition));
    }

    if texts.next().is_some() {
        return Err(TranslationError::Malformed("too many strings returned".into()));
    }
    Ok(PublishedForm {
        id: form.id.clone(),
        form_name,
        fields,
    })
}

/// Non-blank text answers and every selected choice, in key order.
fn answer_texts(answers: &Answers) -> Vec<String> {
    let mut texts = Vec::new();
    for value in answers.values() {
        match value {
            AnswerValue::Text(text) if !text.trim().is_empty() => texts.push(text.clone()),
            AnswerValue::Text(_) => {}
            AnswerValue::Choices(choices) => texts.extend(choices.iter().cloned()),
        }
    }
    texts
}

fn apply_answer_texts(
    answers: Answers,
    translated: Vec<String>,
) -> Result<Answers, TranslationError> {
    let mut texts = translated.into_iter();
    let mut out = Answers::new();
    for (key, value) in answers {
        let value = match value {
            AnswerValue::Text(text) if !text.trim().is_empty() => {
                AnswerValue::Text(next_text(&mut texts)?)
            }
            AnswerValue::Text(text) => AnswerValue::Text(text),
            AnswerValue::Choices(choices) => AnswerValue::Choices(
                choices
                    .iter()
                    .map(|_| next_text(&mut texts))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        out.insert(key, value);
    }

    if texts.next().is_some() {
        return Err(TranslationError::Malformed("too many strings returned".into()));
    }
    Ok(out)
}

/// A translator plus the forms it has already translated, keyed by form id and language.
#[derive(Debug, Default)]
pub struct TranslationCache<T> {
    translator: T,
    forms: RwLock<HashMap<(FormId, LanguageCode), PublishedForm>>,
}

impl<T: FormTranslator> TranslationCache<T> {
    pub fn new(translator: T) -> Self {
        Self {
            translator,
            forms: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached(&self, form_id: &FormId, lang: &LanguageCode) -> Option<PublishedForm> {
        self.forms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(form_id.clone(), lang.clone()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.forms.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `form` in `lang`. English and `None` return the form untouched.
    ///
    /// # Errors
    ///
    /// Propagates translator failures, and reports [`TranslationError::Malformed`] when
    /// the translation does not line up with the form's text.
    pub async fn localize_form(
        &self,
        form: PublishedForm,
        lang: Option<&LanguageCode>,
    ) -> Result<PublishedForm, TranslationError> {
        let Some(lang) = lang.filter(|lang| !lang.is_english()) else {
            return Ok(form);
        };
        if let Some(hit) = self.cached(&form.id, lang) {
            tracing::debug!("translation cache hit for form {} in '{}'", form.id, lang);
            return Ok(hit);
        }

        let translated = self
            .translator
            .translate(&form_texts(&form), &LanguageCode::english(), lang)
            .await?;
        let localized = apply_form_texts(&form, translated)?;

        self.forms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((form.id.clone(), lang.clone()), localized.clone());
        tracing::info!("cached '{}' translation of form {}", lang, form.id);
        Ok(localized)
    }

    /// Translates `form` into each of `languages` ahead of the first request.
    ///
    /// Failures are logged and skipped; the next request for that language retries.
    pub async fn pre_cache(&self, form: &PublishedForm, languages: &[LanguageCode]) {
        for lang in languages {
            if let Err(e) = self.localize_form(form.clone(), Some(lang)).await {
                tracing::warn!("could not pre-cache form {} in '{}': {}", form.id, lang, e);
            }
        }
    }

    /// Translates answers given in `lang` back to English. Blank answers are left alone.
    pub async fn answers_to_english(
        &self,
        answers: Answers,
        lang: Option<&LanguageCode>,
    ) -> Result<Answers, TranslationError> {
        let Some(lang) = lang.filter(|lang| !lang.is_english()) else {
            return Ok(answers);
        };
        let texts = answer_texts(&answers);
        if texts.is_empty() {
            return Ok(answers);
        }

        let translated = self
            .translator
            .translate(&texts, lang, &LanguageCode::english())
            .await?;
        apply_answer_texts(answers, translated)
    }
}
