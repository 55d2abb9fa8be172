use ner_service::config::NerConfig;
use ner_service::services::init_metrics;
use ner_service::startup::Application;
use service_core::observability::{init_tracing, TracingConfig};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize metrics recorder (must be before any metrics are recorded)
    init_metrics();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_tracing(&TracingConfig::from_env("ner-service", &log_level));

    let config = NerConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    tracing::info!(
        knowledge_base = %config.model.knowledge_base_path.display(),
        linker_threshold = config.model.linker_threshold,
        preload = config.model.preload,
        "Starting ner-service"
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_until_stopped().await
}
