//! # Intake Client
//!
//! HTTP implementations of the core seams, talking to the REST server:
//! - [`HttpFormStorage`] implements [`intake_core::FormStorage`]
//! - [`RemoteIdentity`] implements [`intake_core::IdentitySource`]

mod identity;
mod storage;

pub use identity::RemoteIdentity;
pub use storage::HttpFormStorage;

use api_shared::ErrorDetail;

/// Joins `base` and `path` without doubling the slash.
fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Best-effort extraction of the server's error message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) => match serde_json::from_str::<ErrorDetail>(&body) {
            Ok(detail) => detail.detail,
            Err(_) if !body.trim().is_empty() => body,
            Err(_) => status.to_string(),
        },
        Err(_) => status.to_string(),
    }
}
