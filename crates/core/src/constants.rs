//! Constants used throughout the intake core crate.
//!
//! Route paths, defaults, and presentation constants live here so the server, client and CLI
//! agree on them.

/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";

/// Home route for admins (the form builder dashboard).
pub const ADMIN_HOME_PATH: &str = "/admin";

/// Home route for patients (the latest published form).
pub const PATIENT_HOME_PATH: &str = "/forms/latest";

/// Default bind address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8000";

/// Default base URL used by clients of the REST server.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Languages offered when `INTAKE_LANGUAGES` is not set.
pub const DEFAULT_LANGUAGES: &[&str] = &["en", "es"];

/// Placeholder entry shown first in every dropdown.
pub const SELECT_PLACEHOLDER: &str = "Select an option";

/// Initial visible height of long-text controls.
pub const TEXTAREA_ROWS: u8 = 4;

/// Marker appended to the label of a required field.
pub const REQUIRED_MARKER: &str = "*";
