use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the intake application
///
/// Resolves configuration once, then serves the REST API (Form-Storage, login, health and
/// Swagger UI).
///
/// # Environment Variables
/// - `INTAKE_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `INTAKE_LANGUAGES`: languages forms may be requested in (default: "en,es")
/// - `INTAKE_USERS_FILE`: YAML file listing user accounts
/// - `INTAKE_DEMO_USERS`: seed a demo admin and a demo patient when `true`
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake=info".parse()?)
                .add_directive("intake_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(api_rest::config_from_env()?);

    tracing::info!(
        "++ Starting intake on {} (languages: {})",
        cfg.rest_addr(),
        cfg.languages()
            .iter()
            .map(|lang| lang.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    api_rest::serve(cfg).await
}
