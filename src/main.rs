use dotenvy::dotenv;
use ledger_buddy::{
    bot::{BotData, http},
    config::{database, settings},
    core::{extractor::GeminiExtractor, parser::EntryParser},
    errors::{Error, Result},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings (file, then environment overrides)
    let settings = settings::load_settings()
        .inspect_err(|e| error!("Critical error loading settings: {}", e))?;

    // 4. Initialize database
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Build the parser; the AI fallback is optional
    let parser = if settings.ai_fallback_enabled {
        let api_key = settings.gemini_api_key.clone().ok_or_else(|| Error::Config {
            message: "GEMINI_API_KEY is required when the AI fallback is enabled".to_string(),
        })?;
        info!(model = %settings.gemini_model, "AI fallback enabled");
        EntryParser::with_fallback(Arc::new(GeminiExtractor::new(
            api_key,
            settings.gemini_model.clone(),
        )))
    } else {
        EntryParser::rules_only()
    };

    // 6. Serve the webhook
    let state = Arc::new(BotData::new(db, settings, parser));
    http::start_http_server(state)
        .await
        .inspect_err(|e| error!("HTTP server stopped: {}", e))
}
