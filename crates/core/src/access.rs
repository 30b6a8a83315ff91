//! Session-based access gate.
//!
//! Every navigation passes through [`AccessGate::decide`] together with the caller's
//! [`Session`]. The gate either renders the requested route or redirects; redirects always
//! replace the current history entry so "back" cannot return into a gated page.

use crate::constants::{ADMIN_HOME_PATH, LOGIN_PATH, PATIENT_HOME_PATH};
use crate::schema::FormId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability class of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Builds forms.
    Admin,
    /// Fills in the latest form.
    Patient,
}

impl Role {
    /// Where a user of this role lands after login or a refused navigation.
    pub fn home(self) -> Route {
        match self {
            Role::Admin => Route::Admin,
            Role::Patient => Route::LatestForm,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: '{0}'")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "patient" => Ok(Role::Patient),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

/// The signed-in caller. Absence of a session means unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Role,
    pub email: String,
}

impl Session {
    pub fn new(role: Role, email: impl Into<String>) -> Self {
        Self {
            role,
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`; carries no role requirement and always redirects somewhere.
    Root,
    Login,
    Admin,
    LatestForm,
    Form(FormId),
}

impl Route {
    /// Parses a path. Anything unrecognised is treated as the root route.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Root,
            LOGIN_PATH => Route::Login,
            ADMIN_HOME_PATH => Route::Admin,
            PATIENT_HOME_PATH => Route::LatestForm,
            other => match other.strip_prefix("/forms/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::Form(FormId::from(id)),
                _ => Route::Root,
            },
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_owned(),
            Route::Login => LOGIN_PATH.to_owned(),
            Route::Admin => ADMIN_HOME_PATH.to_owned(),
            Route::LatestForm => PATIENT_HOME_PATH.to_owned(),
            Route::Form(id) => format!("/forms/{id}"),
        }
    }

    /// `None` for routes without a role constraint.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Root | Route::Login => None,
            Route::Admin => Some(Role::Admin),
            Route::LatestForm | Route::Form(_) => Some(Role::Patient),
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What the presentation layer should do with a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    /// Navigate to `to`, replacing the current history entry when `replace` is set.
    Redirect { to: Route, replace: bool },
}

impl Navigation {
    fn redirect(to: Route) -> Self {
        Navigation::Redirect { to, replace: true }
    }

    /// The route that ends up on screen.
    pub fn destination(&self) -> &Route {
        match self {
            Navigation::Render(route) => route,
            Navigation::Redirect { to, .. } => to,
        }
    }
}

/// Decision table mapping (session, requested route) to a navigation.
///
/// | Session | required role | Outcome |
/// |---|---|---|
/// | absent | any | redirect to login |
/// | role R | none | redirect to R's home |
/// | role R | R | render |
/// | role R | R' != R | redirect to R's home |
///
/// The login page is public and always renders.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn decide(session: Option<&Session>, route: &Route) -> Navigation {
        if route.is_public() {
            return Navigation::Render(route.clone());
        }

        let Some(session) = session else {
            tracing::debug!("no session for {}; redirecting to login", route);
            return Navigation::redirect(Route::Login);
        };

        match route.required_role() {
            Some(required) if required == session.role => Navigation::Render(route.clone()),
            _ => {
                tracing::debug!(
                    "{} session requested {}; redirecting home",
                    session.role,
                    route
                );
                Navigation::redirect(session.role.home())
            }
        }
    }

    pub fn decide_path(session: Option<&Session>, path: &str) -> Navigation {
        Self::decide(session, &Route::parse(path))
    }

    /// Where to go once a session ends.
    pub fn after_logout() -> Navigation {
        Navigation::redirect(Route::Login)
    }

    /// Where to go right after a successful login.
    pub fn after_login(session: &Session) -> Navigation {
        Navigation::Redirect {
            to: session.role.home(),
            replace: false,
        }
    }
}
