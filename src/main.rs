//! Casework CLI - interactive case intake over stdin.
//!
//! Wires the Postgres store, the OpenAI-backed gateway, reporter and
//! schema compiler into the intake service and drives one conversation
//! per process. The acting user comes from `CASEWORK_USER`.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casework::adapters::ai::{
    LlmSchemaCompiler, LlmValidator, OpenAiConfig, OpenAiProvider, StaticSchemaCompiler,
};
use casework::adapters::memory::InMemorySessionStore;
use casework::adapters::postgres::{apply_schema, PostgresCaseStore};
use casework::adapters::renderer::CliRenderer;
use casework::adapters::report::{LlmReporter, ResendNotifier};
use casework::application::{Command, IntakeService};
use casework::config::AppConfig;
use casework::domain::foundation::UserId;
use casework::domain::intake::IntakeState;
use casework::domain::registry::poultry_registry;
use casework::ports::{AiProvider, Renderer, SchemaCompiler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casework=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let registry = poultry_registry();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    info!("connected to database");

    let provider: Arc<dyn AiProvider> = Arc::new(OpenAiProvider::new(
        OpenAiConfig::new(&config.ai.openai_api_key)
            .with_model(&config.ai.model)
            .with_base_url(&config.ai.base_url),
    )?);

    let statements = if config.ai.llm_schema {
        LlmSchemaCompiler::new(provider.clone())
            .compile(registry)
            .await?
    } else {
        StaticSchemaCompiler.compile(registry).await?
    };
    apply_schema(&pool, &statements).await?;
    info!(tables = statements.len(), "schema applied");

    let service = IntakeService::new(
        registry,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(PostgresCaseStore::new(pool, registry)),
        Arc::new(LlmValidator::new(
            provider.clone(),
            config.ai.gateway_timeout(),
        )),
        Arc::new(LlmReporter::new(provider)),
        Arc::new(ResendNotifier::new(config.email.clone())?),
    );
    let renderer = CliRenderer::new();

    let user = UserId::new(
        std::env::var("CASEWORK_USER").unwrap_or_else(|_| "local-farmer".to_string()),
    )?;
    info!(user = %user, "starting intake conversation");

    run_conversation(&service, &renderer, &user).await?;
    Ok(())
}

/// Reads stdin line by line until the session ends or input closes.
async fn run_conversation(
    service: &IntakeService,
    renderer: &CliRenderer,
    user: &UserId,
) -> Result<(), Box<dyn Error>> {
    let reply = service.handle(user, Command::StartOrResume).await?;
    let mut options = reply.options.clone();
    renderer.show(user, &reply).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let state = service.state_of(user).await;
        let command = match command_for(state, input, &options) {
            Some(command) => command,
            None => {
                println!("{}", HELP);
                continue;
            }
        };

        match service.handle(user, command).await {
            Ok(reply) => {
                options = reply.options.clone();
                renderer.show(user, &reply).await?;
            }
            Err(e) => {
                options.clear();
                println!("{}", e);
            }
        }

        if service.state_of(user).await.is_none() {
            break;
        }
    }
    Ok(())
}

const HELP: &str = "Commands: /submit, /delete, /back, /quit, /help. \
Otherwise type an option number, an option name, or your answer.";

/// Maps raw input plus the conversation state to a service command.
///
/// Numbered input selects from the options of the previous reply, so
/// `2` in a form menu picks the second form.
fn command_for(state: Option<IntakeState>, input: &str, options: &[String]) -> Option<Command> {
    match input {
        "/quit" | "/exit" => return Some(Command::SaveAndQuit),
        "/submit" => return Some(Command::SubmitCase),
        "/delete" => return Some(Command::DeleteCase),
        "/help" => return None,
        _ => {}
    }

    let state = match state {
        Some(state) => state,
        None => return Some(Command::StartOrResume),
    };

    let choice = resolve_option(input, options);
    match state {
        IntakeState::SelectingForm => match input {
            "/back" | "/cancel" => None,
            _ => Some(Command::SelectForm(choice)),
        },
        IntakeState::SelectingQuestion => match input {
            "/back" => Some(Command::BackToForms),
            "/cancel" => None,
            _ => Some(Command::SelectQuestion(choice)),
        },
        IntakeState::EnteringAnswer => match input {
            "/back" | "/cancel" => Some(Command::CancelEntry),
            _ => Some(Command::SubmitAnswer(input.to_string())),
        },
        IntakeState::Confirming | IntakeState::ConfirmingDelete => {
            match input.to_ascii_lowercase().as_str() {
                "y" | "yes" => Some(Command::Confirm),
                "n" | "no" | "/back" | "/cancel" => Some(Command::Cancel),
                _ => None,
            }
        }
        IntakeState::Ended => Some(Command::StartOrResume),
    }
}

/// Turns `3` into the third offered option; anything else passes through.
fn resolve_option(input: &str, options: &[String]) -> String {
    if let Ok(n) = input.parse::<usize>() {
        if n >= 1 && n <= options.len() {
            return options[n - 1].clone();
        }
    }
    input.to_string()
}
