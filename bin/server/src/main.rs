use axum::http::HeaderName;
use healthfirst_ai::{
    ExecutionContextRegistry, LlmResponseGenerator, OpenAiCompatibleBackend, ResponseGenerator,
};
use healthfirst_conversation::{ConversationOrchestrator, MessageStore};
use healthfirst_server::{AppState, config::ServerConfig, db::PgMessageStore, router};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        allow_unscoped = config.conversation.allow_unscoped,
        "Loaded configuration"
    );

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.server.max_connections)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let backend = OpenAiCompatibleBackend::new(config.llm.clone())
        .map_err(|report| report.to_string())?;
    let contexts = Arc::new(ExecutionContextRegistry::from_capacity(
        config.conversation.context_capacity,
    ));
    let generator = LlmResponseGenerator::new(backend, contexts)
        .with_sampling(config.llm.temperature, config.llm.max_tokens);

    let owner_header = HeaderName::try_from(config.server.owner_header.as_str())?;
    let orchestrator = ConversationOrchestrator::new(
        Arc::new(PgMessageStore::new(db_pool)) as Arc<dyn MessageStore>,
        Arc::new(generator) as Arc<dyn ResponseGenerator>,
        config.conversation,
    );
    let app = router(Arc::new(AppState::new(orchestrator, owner_header)));

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr).await?;
    tracing::info!("listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
