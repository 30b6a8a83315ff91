use crate::{endpoint, error_detail};
use api_shared::{LoginReq, LoginRes};
use intake_core::{Action, AuthError, IdentitySource, InFlight, Role, Session, SessionSlot};
use reqwest::{Client, StatusCode};
use std::sync::Arc;

fn transport(err: reqwest::Error) -> AuthError {
    AuthError::Transport(err.to_string())
}

/// Identity source that signs in through `POST /auth/login`.
#[derive(Debug, Clone)]
pub struct RemoteIdentity {
    client: Client,
    base_url: String,
    slot: SessionSlot,
    logging_in: Arc<InFlight>,
}

impl RemoteIdentity {
    pub fn new(base_url: impl Into<String>, slot: SessionSlot) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            slot,
            logging_in: Arc::new(InFlight::new(Action::Login)),
        }
    }

    /// Whether a login request is outstanding.
    pub fn is_logging_in(&self) -> bool {
        self.logging_in.is_busy()
    }

    /// Sends the credentials and returns the server's full answer without touching the slot.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginRes, AuthError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/auth/login"))
            .json(&LoginReq {
                email: email.to_owned(),
                password: password.to_owned(),
            })
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            status if status.is_success() => response.json().await.map_err(transport),
            _ => Err(AuthError::Transport(error_detail(response).await)),
        }
    }
}

impl IdentitySource for RemoteIdentity {
    fn current(&self) -> Option<Session> {
        self.slot.get()
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _ticket = self.logging_in.try_begin_login()?;
        let res = self.authenticate(email, password).await?;
        let role = res
            .user_type
            .parse::<Role>()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let session = Session::new(role, res.email);
        tracing::info!("{} signed in as {}", session.email, session.role);
        self.slot.set(session.clone());
        Ok(session)
    }

    fn logout(&self) {
        self.slot.clear();
    }
}
