use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use intake_client::{HttpFormStorage, RemoteIdentity};
use intake_core::constants::DEFAULT_SERVER_URL;
use intake_core::render::Control;
use intake_core::{
    AccessGate, FieldDraft, FieldKey, FormBuilder, FormError, IdentitySource, LanguageCode,
    Navigation, PublishedForm, RenderDescriptor, RespondentForm, RespondentPhase, Role, Session,
    SessionSlot, ValidationError,
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Form builder and intake CLI")]
struct Cli {
    /// Base URL of the intake REST server
    #[arg(long, global = true, env = "INTAKE_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the server is up
    Health,
    /// Sign in and show where the user lands
    Login {
        email: String,
        password: String,
    },
    /// Show what the access gate does with a path
    Route {
        /// Path to navigate to, e.g. /admin
        path: String,
        /// Role of the signed-in user; omit for no session
        #[arg(long)]
        role: Option<Role>,
    },
    /// Build a form from a YAML file and publish it
    Publish {
        /// YAML file with `name` and a list of `fields`
        file: PathBuf,
    },
    /// Print the latest form
    Show {
        /// Preferred language code
        #[arg(long)]
        lang: Option<String>,
    },
    /// Fill in and submit the latest form
    Answer {
        /// Set a text answer: KEY=VALUE, where KEY is a field id or label
        #[arg(long = "set")]
        set: Vec<String>,
        /// Tick a checkbox option: KEY=OPTION
        #[arg(long = "check")]
        check: Vec<String>,
        /// Preferred language code
        #[arg(long)]
        lang: Option<String>,
    },
}

/// Log filter for this binary's own target.
const LOG_DIRECTIVE: &str = concat!(env!("CARGO_CRATE_NAME"), "=warn");

/// Form definition file read by `intake publish`.
#[derive(Debug, Deserialize)]
struct FormFile {
    name: String,
    fields: Vec<FieldDraft>,
}

fn parse_assignment(raw: &str) -> anyhow::Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))
}

/// Finds a field by id, falling back to a case-insensitive label match.
fn resolve_key(form: &PublishedForm, key: &str) -> anyhow::Result<FieldKey> {
    form.keyed_fields()
        .find(|(k, _)| k.as_str() == key)
        .or_else(|| {
            form.keyed_fields()
                .find(|(_, field)| field.label().eq_ignore_ascii_case(key))
        })
        .map(|(k, _)| k)
        .ok_or_else(|| anyhow!("form '{}' has no field '{key}'", form.form_name))
}

fn parse_lang(lang: Option<String>) -> anyhow::Result<Option<LanguageCode>> {
    lang.map(|l| LanguageCode::parse(&l).with_context(|| format!("invalid language '{l}'")))
        .transpose()
}

fn describe(descriptor: &RenderDescriptor) -> String {
    let label = descriptor.label.display();
    match &descriptor.control {
        Control::Input {
            input_type, value, ..
        } => format!("{label} [{input_type:?}] = {value:?}"),
        Control::TextArea { value, rows, .. } => format!("{label} [{rows} lines] = {value:?}"),
        Control::Select {
            placeholder,
            value,
            options,
            ..
        } => {
            let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
            let shown = if value.is_empty() { placeholder } else { value };
            format!("{label} [one of {}] = {shown}", values.join(" | "))
        }
        Control::RadioGroup { options, .. } | Control::CheckboxGroup { options } => {
            let marks: Vec<String> = options
                .iter()
                .map(|c| format!("({}) {}", if c.checked { "x" } else { " " }, c.value))
                .collect();
            format!("{label}: {}", marks.join("  "))
        }
    }
}

fn print_navigation(navigation: &Navigation) {
    match navigation {
        Navigation::Render(route) => println!("render {route}"),
        Navigation::Redirect { to, replace } => {
            let how = if *replace { " (replace)" } else { "" };
            println!("redirect to {to}{how}");
        }
    }
}

async fn load_latest(
    storage: &HttpFormStorage,
    lang: Option<String>,
) -> anyhow::Result<Option<RespondentForm>> {
    let lang = parse_lang(lang)?;
    let mut respondent = RespondentForm::new();
    respondent.load(storage, lang.as_ref()).await?;
    if respondent.phase() == &RespondentPhase::NoForm {
        tracing::info!("{} has no published form", storage.base_url());
        println!("No form published yet.");
        return Ok(None);
    }
    if let Some(form) = respondent.form() {
        tracing::debug!("loaded form {} from {}", form.id, storage.base_url());
    }
    Ok(Some(respondent))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(LOG_DIRECTIVE.parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let storage = HttpFormStorage::new(cli.server.clone());

    match cli.command {
        Some(Commands::Health) => {
            let res = storage.health().await?;
            println!("{}", res.message);
        }
        Some(Commands::Login { email, password }) => {
            let identity = RemoteIdentity::new(cli.server, SessionSlot::new());
            let session = identity.login(&email, &password).await.inspect_err(|e| {
                tracing::warn!("login for {} failed: {}", email, e);
            })?;
            println!("Signed in as {} ({})", session.email, session.role);
            print_navigation(&AccessGate::after_login(&session));
        }
        Some(Commands::Route { path, role }) => {
            let session = role.map(|role| Session::new(role, "cli"));
            print_navigation(&AccessGate::decide_path(session.as_ref(), &path));
        }
        Some(Commands::Publish { file }) => {
            let yaml = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let form: FormFile =
                serde_yaml::from_str(&yaml).map_err(FormError::YamlDeserialization)?;

            let mut builder = FormBuilder::new();
            builder.set_form_name(form.name);
            for draft in form.fields {
                let label = draft.label.clone();
                builder
                    .add_field_from(draft)
                    .with_context(|| format!("field '{label}'"))?;
            }
            let form_id = builder.save(&storage).await?;
            tracing::info!("published {} to {}", form_id, storage.base_url());
            println!("Published form {form_id}");
        }
        Some(Commands::Show { lang }) => {
            if let Some(respondent) = load_latest(&storage, lang).await? {
                if let Some(form) = respondent.form() {
                    println!("{} ({})", form.form_name, form.id);
                }
                for descriptor in respondent.render() {
                    println!("  {}: {}", descriptor.key, describe(&descriptor));
                }
            }
        }
        Some(Commands::Answer { set, check, lang }) => {
            let Some(mut respondent) = load_latest(&storage, lang).await? else {
                return Ok(());
            };
            let form = respondent
                .form()
                .cloned()
                .ok_or_else(|| anyhow!("no form loaded"))?;

            for raw in &set {
                let (key, value) = parse_assignment(raw)?;
                respondent.set_value(resolve_key(&form, key)?, value);
            }
            for raw in &check {
                let (key, option) = parse_assignment(raw)?;
                respondent.check_option(&resolve_key(&form, key)?, option);
            }

            match respondent.submit(&storage).await {
                Ok(()) => {
                    tracing::info!("submitted answers for form {}", form.id);
                    println!("Form submitted successfully!");
                }
                Err(FormError::Validation(ValidationError::RequiredFieldsMissing(missing))) => {
                    tracing::warn!("{} required fields left blank", missing.len());
                    let labels: Vec<&str> = missing
                        .iter()
                        .filter_map(|key| form.field(key).map(|field| field.label()))
                        .collect();
                    bail!("Please complete all required fields: {}", labels.join(", "));
                }
                Err(e) => return Err(e.into()),
            }
        }
        None => {
            println!("Use 'intake --help' for commands");
        }
    }

    Ok(())
}
