//! Runtime configuration.
//!
//! [`IntakeConfig`] is resolved once at process start-up and handed to services behind an
//! `Arc`. Nothing in this crate reads environment variables; binaries collect the raw values
//! and pass them through the helpers below.

use crate::constants::DEFAULT_LANGUAGES;
use crate::error::{FormError, FormResult, ValidationError};
use crate::identity::UserDirectory;
use intake_types::LanguageCode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct IntakeConfig {
    rest_addr: SocketAddr,
    languages: Vec<LanguageCode>,
    users: Arc<UserDirectory>,
}

impl IntakeConfig {
    /// Create a new `IntakeConfig`.
    ///
    /// English is always offered; it is added to `languages` when missing.
    pub fn new(
        rest_addr: &str,
        languages: Vec<LanguageCode>,
        users: UserDirectory,
    ) -> FormResult<Self> {
        let rest_addr = rest_addr.trim().parse::<SocketAddr>().map_err(|e| {
            FormError::Config(format!("invalid REST address '{rest_addr}': {e}"))
        })?;

        let mut offered = vec![LanguageCode::english()];
        for lang in languages {
            if !offered.contains(&lang) {
                offered.push(lang);
            }
        }

        if users.is_empty() {
            tracing::warn!("no user accounts configured; every login will fail");
        }

        Ok(Self {
            rest_addr,
            languages: offered,
            users: Arc::new(users),
        })
    }

    pub fn rest_addr(&self) -> SocketAddr {
        self.rest_addr
    }

    pub fn languages(&self) -> &[LanguageCode] {
        &self.languages
    }

    pub fn users(&self) -> Arc<UserDirectory> {
        Arc::clone(&self.users)
    }

    /// Resolves a requested language against the offered set.
    ///
    /// `None` or a blank value means "no preference".
    pub fn language(
        &self,
        requested: Option<&str>,
    ) -> Result<Option<LanguageCode>, ValidationError> {
        let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let code = LanguageCode::parse(raw)
            .map_err(|_| ValidationError::UnsupportedLanguage(raw.to_owned()))?;
        if !self.languages.contains(&code) {
            return Err(ValidationError::UnsupportedLanguage(raw.to_owned()));
        }
        Ok(Some(code))
    }
}

/// Parse a comma-separated language list.
///
/// If `value` is `None` or empty/whitespace, returns the default languages.
pub fn languages_from_env_value(value: Option<String>) -> FormResult<Vec<LanguageCode>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let raw: Vec<String> = match value {
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        None => DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
    };

    raw.iter()
        .map(|code| {
            LanguageCode::parse(code)
                .map_err(|_| FormError::Config(format!("invalid language code '{code}'")))
        })
        .collect()
}

/// Interpret a boolean-ish environment value. Unset means `false`.
pub fn flag_from_env_value(value: Option<String>) -> bool {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

/// Build the user directory from an optional YAML file plus the optional demo accounts.
///
/// File entries win over demo accounts with the same email.
pub fn resolve_users(users_file: Option<PathBuf>, demo_users: bool) -> FormResult<UserDirectory> {
    let mut directory = if demo_users {
        tracing::info!("seeding demo user accounts");
        UserDirectory::demo()
    } else {
        UserDirectory::default()
    };

    if let Some(path) = users_file {
        directory.merge(UserDirectory::load(&path)?);
    }

    Ok(directory)
}
