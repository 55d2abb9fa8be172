use crate::dtos::HealthResponse;
use crate::services::pipeline::PipelineError;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, http::Uri, Json};
use service_core::error::AppError;

/// Liveness of the model: loads it if needed and makes one call through it.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, AppError> {
    let unavailable = |e: PipelineError| {
        AppError::ServiceUnavailable(format!("Model not properly loaded: {}", e))
    };

    let pipeline = state.models.get().await.map_err(unavailable)?;
    pipeline.health_check().map_err(unavailable)?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        message: "NER service is running and model is loaded".to_string(),
    }))
}

/// Ready once a pipeline is cached. Never triggers a load.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.models.is_loaded().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("No route for {}", uri.path()))
}
