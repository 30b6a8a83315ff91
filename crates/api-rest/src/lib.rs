//! # API REST
//!
//! REST API implementation of Form-Storage and login.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for request and response bodies.

#![warn(rust_2018_idioms)]

use api_shared::{
    CreateFormReq, CreateFormRes, ErrorDetail, FieldDto, FormRes, FormSummaryRes, HealthRes,
    HealthService, LatestFormRes, LatestQuery, LoginReq, LoginRes, StoredSubmissionRes,
    SubmissionReq, SubmissionRes,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use intake_core::config::{flag_from_env_value, languages_from_env_value, resolve_users};
use intake_core::constants::DEFAULT_REST_ADDR;
use intake_core::{
    FormId, FormResult, IntakeConfig, MemoryFormStorage, PassThroughTranslator, StorageError,
    TranslationCache, TranslationError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Translation backend used by the server. Swap the translator here to plug in a service.
pub type Translations = TranslationCache<PassThroughTranslator>;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<IntakeConfig>,
    pub storage: MemoryFormStorage,
    pub translations: Arc<Translations>,
}

impl AppState {
    pub fn new(cfg: Arc<IntakeConfig>) -> Self {
        Self {
            cfg,
            storage: MemoryFormStorage::new(),
            translations: Arc::new(TranslationCache::new(PassThroughTranslator)),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(ErrorDetail::new(detail)))
}

fn storage_failure(err: StorageError) -> ApiError {
    tracing::error!("storage failure: {}", err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn translation_failure(err: TranslationError) -> ApiError {
    tracing::error!("translation failure: {}", err);
    api_error(StatusCode::BAD_GATEWAY, "Translation unavailable")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_form,
        latest_form,
        get_form,
        list_forms,
        create_submission,
        list_submissions,
        login,
    ),
    components(schemas(
        HealthRes,
        FieldDto,
        CreateFormReq,
        CreateFormRes,
        LatestFormRes,
        FormRes,
        FormSummaryRes,
        SubmissionReq,
        SubmissionRes,
        StoredSubmissionRes,
        LoginReq,
        LoginRes,
        ErrorDetail,
    ))
)]
pub struct ApiDoc;

/// Resolve the server configuration from the process environment.
///
/// # Environment Variables
/// - `INTAKE_REST_ADDR`: bind address (default: "0.0.0.0:8000")
/// - `INTAKE_LANGUAGES`: comma separated language codes (default: "en,es")
/// - `INTAKE_USERS_FILE`: optional YAML user directory
/// - `INTAKE_DEMO_USERS`: `true` to seed one demo admin and one demo patient
pub fn config_from_env() -> FormResult<IntakeConfig> {
    let addr = std::env::var("INTAKE_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let languages = languages_from_env_value(std::env::var("INTAKE_LANGUAGES").ok())?;
    let users = resolve_users(
        std::env::var("INTAKE_USERS_FILE").ok().map(PathBuf::from),
        flag_from_env_value(std::env::var("INTAKE_DEMO_USERS").ok()),
    )?;
    IntakeConfig::new(&addr, languages, users)
}

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/forms", get(list_forms).post(create_form))
        .route("/forms/latest", get(latest_form))
        .route("/forms/:form_id", get(get_form))
        .route("/submissions", get(list_submissions).post(create_submission))
        .route("/auth/login", post(login))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `cfg.rest_addr()` and serves until the process is stopped.
pub async fn serve(cfg: Arc<IntakeConfig>) -> anyhow::Result<()> {
    let addr = cfg.rest_addr();
    tracing::info!("-- Starting intake REST API on {}", addr);
    let app = router(AppState::new(cfg));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/forms",
    request_body = CreateFormReq,
    responses(
        (status = 200, description = "Form stored", body = CreateFormRes),
        (status = 400, description = "Form violates schema rules", body = ErrorDetail),
        (status = 500, description = "Internal server error", body = ErrorDetail)
    )
)]
/// Store a new form
///
/// Applies the same rules as the builder: a non-blank name, at least one field, a label on
/// every field, and options on every select, checkbox and radio field. Each stored field is
/// assigned a durable id. The form is then translated into every configured language.
#[axum::debug_handler]
async fn create_form(
    State(state): State<AppState>,
    Json(req): Json<CreateFormReq>,
) -> Result<Json<CreateFormRes>, ApiError> {
    let form = req.to_new_form().map_err(|e| {
        tracing::warn!("rejected form: {}", e);
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    })?;
    let stored = state.storage.insert_form(form).map_err(storage_failure)?;
    state
        .translations
        .pre_cache(&stored.to_published(), state.cfg.languages())
        .await;
    Ok(Json(CreateFormRes {
        form_id: stored.id.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/forms/latest",
    params(LatestQuery),
    responses(
        (status = 200, description = "Most recently created form", body = LatestFormRes),
        (status = 400, description = "Unsupported language", body = ErrorDetail),
        (status = 404, description = "No forms found", body = ErrorDetail),
        (status = 502, description = "Translation unavailable", body = ErrorDetail)
    )
)]
/// Fetch the most recently created form
///
/// With `lang`, the form name, labels and options come back in that language.
#[axum::debug_handler]
async fn latest_form(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<LatestFormRes>, ApiError> {
    let lang = state
        .cfg
        .language(query.lang.as_deref())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let Some(form) = state.storage.latest().map_err(storage_failure)? else {
        return Err(api_error(StatusCode::NOT_FOUND, "No forms found"));
    };
    let form = state
        .translations
        .localize_form(form.to_published(), lang.as_ref())
        .await
        .map_err(translation_failure)?;
    Ok(Json(LatestFormRes::from(&form)))
}

#[utoipa::path(
    get,
    path = "/forms/{form_id}",
    params(("form_id" = String, Path, description = "Form identifier")),
    responses(
        (status = 200, description = "The form", body = FormRes),
        (status = 404, description = "Form not found", body = ErrorDetail)
    )
)]
#[axum::debug_handler]
async fn get_form(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> Result<Json<FormRes>, ApiError> {
    let form_id = FormId::from(form_id);
    match state.storage.get_form(&form_id).map_err(storage_failure)? {
        Some(form) => Ok(Json(FormRes::from(&form))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Form not found")),
    }
}

#[utoipa::path(
    get,
    path = "/forms",
    responses(
        (status = 200, description = "Every stored form", body = [FormSummaryRes])
    )
)]
/// List every stored form in creation order
#[axum::debug_handler]
async fn list_forms(
    State(state): State<AppState>,
) -> Result<Json<Vec<FormSummaryRes>>, ApiError> {
    let forms = state.storage.list_forms().map_err(storage_failure)?;
    Ok(Json(forms.iter().map(FormSummaryRes::from).collect()))
}

#[utoipa::path(
    post,
    path = "/submissions",
    request_body = SubmissionReq,
    responses(
        (status = 200, description = "Submission stored", body = SubmissionRes),
        (status = 400, description = "Unsupported language", body = ErrorDetail),
        (status = 404, description = "Form not found", body = ErrorDetail),
        (status = 502, description = "Translation unavailable", body = ErrorDetail)
    )
)]
/// Store a submission
///
/// Answers given in another language are translated to English first.
#[axum::debug_handler]
async fn create_submission(
    State(state): State<AppState>,
    Json(req): Json<SubmissionReq>,
) -> Result<Json<SubmissionRes>, ApiError> {
    let lang = state
        .cfg
        .language(req.lang.as_deref())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let mut submission = req.into_submission();
    submission.answers = state
        .translations
        .answers_to_english(submission.answers, lang.as_ref())
        .await
        .map_err(translation_failure)?;

    match state.storage.insert_submission(submission) {
        Ok(_) => Ok(Json(SubmissionRes::success())),
        Err(StorageError::UnknownForm(form_id)) => {
            tracing::warn!("submission for unknown form {}", form_id);
            Err(api_error(StatusCode::NOT_FOUND, "Form not found"))
        }
        Err(e) => Err(storage_failure(e)),
    }
}

#[utoipa::path(
    get,
    path = "/submissions",
    responses(
        (status = 200, description = "Submissions, newest first", body = [StoredSubmissionRes])
    )
)]
#[axum::debug_handler]
async fn list_submissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredSubmissionRes>>, ApiError> {
    let submissions = state.storage.list_submissions().map_err(storage_failure)?;
    Ok(Json(
        submissions.iter().map(StoredSubmissionRes::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Signed in", body = LoginRes),
        (status = 401, description = "Invalid email or password", body = ErrorDetail)
    )
)]
/// Check credentials against the configured user directory
///
/// The email is matched case-insensitively after trimming.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let users = state.cfg.users();
    let user = users.authenticate(&req.email, &req.password).map_err(|e| {
        tracing::warn!("failed login attempt");
        api_error(StatusCode::UNAUTHORIZED, e.to_string())
    })?;
    tracing::info!("{} signed in as {}", user.email, user.role);
    Ok(Json(LoginRes::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use intake_core::UserDirectory;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state() -> AppState {
        let cfg = IntakeConfig::new(
            "127.0.0.1:0",
            languages_from_env_value(None).unwrap(),
            UserDirectory::demo(),
        )
        .unwrap();
        AppState::new(Arc::new(cfg))
    }

    fn app() -> Router {
        router(state())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn intake_form() -> Value {
        json!({
            "form_name": "Intake",
            "fields": [
                {"label": "Name", "type": "text", "required": true},
                {"label": "Mood", "type": "radio", "options": ["Good", "Bad"]}
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_latest_form_404_when_empty() {
        let (status, body) = send(&app(), Method::GET, "/forms/latest", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "No forms found"}));
    }

    #[tokio::test]
    async fn test_create_then_fetch_latest_and_by_id() {
        let app = app();
        let (status, created) = send(&app, Method::POST, "/forms", Some(intake_form())).await;
        assert_eq!(status, StatusCode::OK);
        let form_id = created["form_id"].as_str().unwrap().to_owned();

        let (status, latest) = send(&app, Method::GET, "/forms/latest?lang=es", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["id"], form_id.as_str());
        assert_eq!(latest["form_name"], "Intake");
        assert_eq!(latest["fields"][1]["options"], json!(["Good", "Bad"]));
        assert!(latest["fields"][0]["id"].as_str().is_some());

        let (status, by_id) = send(&app, Method::GET, &format!("/forms/{form_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_id["form_name"], "Intake");

        let (status, body) = send(&app, Method::GET, "/forms/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Form not found"}));
    }

    #[tokio::test]
    async fn test_unsupported_language_is_400() {
        let app = app();
        send(&app, Method::POST, "/forms", Some(intake_form())).await;
        let (status, _) = send(&app, Method::GET, "/forms/latest?lang=de", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_form_rejects_invalid_schema() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/forms",
            Some(json!({
                "form_name": "Intake",
                "fields": [{"label": "Pick", "type": "select", "options": []}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            "Options are required for select, checkbox, or radio field types."
        );

        let (status, _) = send(
            &app,
            Method::POST,
            "/forms",
            Some(json!({"form_name": " ", "fields": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, forms) = send(&app, Method::GET, "/forms", None).await;
        assert_eq!(forms, json!([]));
    }

    #[tokio::test]
    async fn test_submissions_round_trip() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/forms", Some(intake_form())).await;
        let form_id = created["form_id"].as_str().unwrap().to_owned();

        for name in ["Alice", "Bob"] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/submissions",
                Some(json!({"form_id": form_id, "submission_data": {"k": name}})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"status": "success"}));
        }

        let (status, list) = send(&app, Method::GET, "/submissions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["submission_data"]["k"], "Bob");
        assert_eq!(list[1]["submission_data"]["k"], "Alice");

        let (status, _) = send(
            &app,
            Method::POST,
            "/submissions",
            Some(json!({"form_id": "missing", "submission_data": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_form_caches_translations() {
        let state = state();
        let translations = Arc::clone(&state.translations);
        let app = router(state);

        let (_, created) = send(&app, Method::POST, "/forms", Some(intake_form())).await;
        let form_id = FormId::from(created["form_id"].as_str().unwrap());
        let es = intake_core::LanguageCode::parse("es").unwrap();
        assert_eq!(translations.len(), 1);
        assert!(translations.cached(&form_id, &es).is_some());

        let (status, latest) = send(&app, Method::GET, "/forms/latest?lang=es", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["form_name"], "Intake");
        assert_eq!(translations.len(), 1);
    }

    #[tokio::test]
    async fn test_submission_language_is_checked() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/forms", Some(intake_form())).await;
        let form_id = created["form_id"].as_str().unwrap().to_owned();

        let (status, body) = send(
            &app,
            Method::POST,
            "/submissions",
            Some(json!({"form_id": form_id, "submission_data": {"k": "Hola"}, "lang": "de"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unsupported language: de");

        let (status, _) = send(
            &app,
            Method::POST,
            "/submissions",
            Some(json!({"form_id": form_id, "submission_data": {"k": "Hola"}, "lang": "es"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, list) = send(&app, Method::GET, "/submissions", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({"email": " ADMIN@example.com ", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user_type"], "admin");
        assert_eq!(body["email"], "admin@example.com");

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({"email": "admin@example.com", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"detail": "Invalid email or password"}));
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let (status, body) = send(&app(), Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/forms/latest"].is_object());
    }
}
