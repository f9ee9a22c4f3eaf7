use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::collections::BTreeMap;
use std::sync::Arc;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use wishbot::api::{run_api_server, ApiState};
use wishbot::cli::{Cli, Commands};
use wishbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use wishcore::core::{init_logger, log_startup_configuration};
use wishcore::{config, create_pool, DbPool, InitDataVerifier, TelegramIdentity};

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before any config Lazy is touched
    let _ = dotenv();

    let cli = Cli::parse_args();

    init_logger(&config::LOG_FILE_PATH)?;

    let port = cli.port.unwrap_or(*config::API_PORT);

    match cli.command {
        Some(Commands::Run) | None => {
            log_startup_configuration();
            run_all(port).await
        }
        Some(Commands::Api) => {
            log_startup_configuration();
            let db_pool = open_database()?;
            run_api_server(port, ApiState::new(db_pool, verifier()?)).await
        }
        Some(Commands::Bot) => {
            log_startup_configuration();
            run_bot(open_database()?).await
        }
        Some(Commands::DevInitData {
            user_id,
            first_name,
            username,
        }) => print_dev_init_data(user_id, first_name, username),
    }
}

fn open_database() -> Result<Arc<DbPool>> {
    let pool = create_pool(&config::DATABASE_PATH)
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;
    Ok(Arc::new(pool))
}

/// The verifier needs the bot token; without it every request would be rejected
fn verifier() -> Result<Arc<InitDataVerifier>> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN environment variable not set");
    }
    Ok(Arc::new(InitDataVerifier::new(&config::BOT_TOKEN)))
}

async fn run_all(port: u16) -> Result<()> {
    let db_pool = open_database()?;
    let state = ApiState::new(db_pool.clone(), verifier()?);

    let api = tokio::spawn(run_api_server(port, state));
    let bot = tokio::spawn(run_bot(db_pool));

    tokio::select! {
        result = api => {
            log::warn!("API server stopped");
            result.context("API server task failed")?
        }
        result = bot => {
            log::warn!("Bot stopped");
            result.context("Bot task failed")?
        }
    }
}

async fn run_bot(db_pool: Arc<DbPool>) -> Result<()> {
    let bot = create_bot()?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to publish bot commands: {}", e);
    }

    let deps = HandlerDeps::new(db_pool, config::WEB_APP_URL.as_str());
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    log::info!("Starting bot in long polling mode");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

fn print_dev_init_data(user_id: i64, first_name: String, username: Option<String>) -> Result<()> {
    let verifier = verifier()?;

    let identity = TelegramIdentity {
        id: user_id,
        username,
        first_name,
        last_name: None,
        language_code: "ru".to_string(),
        is_premium: false,
    };

    let mut fields = BTreeMap::new();
    fields.insert("auth_date".to_string(), chrono::Utc::now().timestamp().to_string());
    fields.insert("user".to_string(), serde_json::to_string(&identity)?);

    println!("{}", verifier.encode_signed(&fields));
    Ok(())
}
