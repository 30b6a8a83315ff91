use crate::{endpoint, error_detail};
use api_shared::{CreateFormReq, CreateFormRes, HealthRes, LatestFormRes, SubmissionReq};
use intake_core::constants::DEFAULT_SERVER_URL;
use intake_core::{
    FormId, FormStorage, FormSubmission, LanguageCode, NewForm, PublishedForm, StorageError,
    StorageResult,
};
use reqwest::{Client, StatusCode};

fn transport(err: reqwest::Error) -> StorageError {
    StorageError::Transport(err.to_string())
}

async fn rejected(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    StorageError::Rejected {
        status,
        message: error_detail(response).await,
    }
}

/// Form-Storage reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFormStorage {
    client: Client,
    base_url: String,
}

impl Default for HttpFormStorage {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl HttpFormStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> StorageResult<HealthRes> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "/health"))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        response.json().await.map_err(transport)
    }
}

impl FormStorage for HttpFormStorage {
    async fn create_form(&self, form: &NewForm) -> StorageResult<FormId> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/forms"))
            .json(&CreateFormReq::from(form))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let created: CreateFormRes = response.json().await.map_err(transport)?;
        tracing::debug!("server stored form {}", created.form_id);
        Ok(FormId::from(created.form_id))
    }

    async fn latest_form(
        &self,
        lang: Option<&LanguageCode>,
    ) -> StorageResult<Option<PublishedForm>> {
        let mut request = self.client.get(endpoint(&self.base_url, "/forms/latest"));
        if let Some(lang) = lang {
            request = request.query(&[("lang", lang.as_str())]);
        }
        let response = request.send().await.map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let latest: LatestFormRes = response.json().await.map_err(transport)?;
                let form = latest
                    .into_published()
                    .map_err(|e| StorageError::Transport(format!("malformed form: {e}")))?;
                Ok(Some(form))
            }
            _ => Err(rejected(response).await),
        }
    }

    async fn create_submission(&self, submission: &FormSubmission) -> StorageResult<()> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/submissions"))
            .json(&SubmissionReq::from(submission))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::UnknownForm(submission.form_id.clone())),
            status if status.is_success() => Ok(()),
            _ => Err(rejected(response).await),
        }
    }
}
