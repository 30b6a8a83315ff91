//! Identity sources.
//!
//! An [`IdentitySource`] turns credentials into a [`Session`] and remembers it in a
//! [`SessionSlot`]. The local implementation checks a [`UserDirectory`] loaded at start-up;
//! the client crate provides one that logs in over HTTP.

use crate::access::{Role, Session};
use crate::error::{AuthError, FormError, FormResult};
use crate::inflight::{Action, InFlight};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, RwLock};

pub trait IdentitySource: Send + Sync {
    /// The signed-in session, if any.
    fn current(&self) -> Option<Session>;

    /// Checks the credentials and, on success, stores the resulting session.
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    fn logout(&self);
}

/// Holder of the current session. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Session> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, session: Session) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

/// One configured account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserRecord {
    pub fn new(email: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            email: normalise_email(&email.into()),
            password: password.into(),
            role,
            first_name: None,
            last_name: None,
        }
    }

    pub fn session(&self) -> Session {
        Session::new(self.role, self.email.clone())
    }
}

#[derive(Debug, Deserialize)]
struct UsersFile {
    users: Vec<UserRecord>,
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accounts allowed to sign in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    users: Vec<UserRecord>,
}

impl UserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let mut directory = Self::default();
        for user in users {
            directory.insert(user);
        }
        directory
    }

    /// One admin and one patient account for local use.
    pub fn demo() -> Self {
        let mut admin = UserRecord::new("admin@example.com", "admin123", Role::Admin);
        admin.first_name = Some("Maggie".into());
        let mut patient = UserRecord::new("patient@example.com", "patient123", Role::Patient);
        patient.first_name = Some("Jack".into());
        Self::new([admin, patient])
    }

    /// Parses a YAML document of the form `users: [{email, password, role, ...}]`.
    pub fn from_yaml_str(yaml: &str) -> FormResult<Self> {
        let file: UsersFile = serde_yaml::from_str(yaml).map_err(FormError::YamlDeserialization)?;
        Ok(Self::new(file.users))
    }

    pub fn load(path: &Path) -> FormResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(FormError::ConfigRead)?;
        let directory = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            "loaded {} users from {}",
            directory.len(),
            path.display()
        );
        Ok(directory)
    }

    /// Adds `user`, replacing any account with the same email.
    pub fn insert(&mut self, mut user: UserRecord) {
        user.email = normalise_email(&user.email);
        self.users.retain(|existing| existing.email != user.email);
        self.users.push(user);
    }

    /// Adds every account from `other`; its entries win on email clashes.
    pub fn merge(&mut self, other: UserDirectory) {
        for user in other.users {
            self.insert(user);
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Matches `email` case-insensitively after trimming; the password must match exactly.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<&UserRecord, AuthError> {
        let email = normalise_email(email);
        self.users
            .iter()
            .find(|user| user.email == email && user.password == password)
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// An [`IdentitySource`] that checks a [`UserDirectory`] in process.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    directory: Arc<UserDirectory>,
    slot: SessionSlot,
    logging_in: Arc<InFlight>,
}

impl LocalIdentity {
    pub fn new(directory: Arc<UserDirectory>, slot: SessionSlot) -> Self {
        Self {
            directory,
            slot,
            logging_in: Arc::new(InFlight::new(Action::Login)),
        }
    }

    pub fn is_logging_in(&self) -> bool {
        self.logging_in.is_busy()
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }
}

impl IdentitySource for LocalIdentity {
    fn current(&self) -> Option<Session> {
        self.slot.get()
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _ticket = self.logging_in.try_begin_login()?;
        let user = self.directory.authenticate(email, password).inspect_err(|_| {
            tracing::warn!("failed login attempt");
        })?;
        let session = user.session();
        tracing::info!("{} signed in as {}", session.email, session.role);
        self.slot.set(session.clone());
        Ok(session)
    }

    fn logout(&self) {
        self.slot.clear();
    }
}
