//! Application startup and lifecycle management.

use crate::config::{HttpConfig, NerConfig};
use crate::handlers;
use crate::services::pipeline::{PipelineLoader, UmlsPipelineLoader};
use crate::services::ModelLoader;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: NerConfig,
    pub models: Arc<ModelLoader>,
}

impl AppState {
    pub fn new(config: NerConfig, loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            config,
            models: Arc::new(ModelLoader::new(loader)),
        }
    }
}

fn cors_layer(config: &HttpConfig) -> Result<CorsLayer, AppError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin {:?}: {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Build the HTTP router with every route and middleware layer.
pub fn router(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config.http)?;
    let body_limit = state.config.http.max_body_bytes;

    Ok(Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/extract_entities", post(handlers::extract_entities))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the UMLS pipeline described by `config`.
    pub async fn build(config: NerConfig) -> Result<Self, AppError> {
        let loader = Arc::new(UmlsPipelineLoader::new(config.pipeline_config()));
        Self::build_with_loader(config, loader).await
    }

    /// Build the application around any pipeline loader.
    pub async fn build_with_loader(
        config: NerConfig,
        loader: Arc<dyn PipelineLoader>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.clone(), loader);

        if config.model.preload {
            // A failed preload is not fatal; /api/health reports it and the
            // next request tries again.
            if let Err(e) = state.models.get().await {
                tracing::warn!(
                    error = %e,
                    path = %config.model.knowledge_base_path.display(),
                    "Model preload failed"
                );
            }
        }

        let router = router(state)?;

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("NER service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
