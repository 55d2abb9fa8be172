use crate::dtos::{ExtractRequest, ExtractionResponse};
use crate::services::EntityLinker;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{extract::State, Json};
use service_core::error::AppError;

const EXTRACTION_ERROR: &str = "Error processing text";

/// Recognise and link entities in the posted text.
///
/// Any failure past request validation, including a model that will not
/// load, is reported as a 500 with a fixed message.
pub async fn extract_entities(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ExtractRequest>,
) -> Result<Json<ExtractionResponse>, AppError> {
    let pipeline = state
        .models
        .get()
        .await
        .map_err(|e| AppError::processing(EXTRACTION_ERROR, e))?;

    let response = EntityLinker::new(pipeline)
        .extract_entities(req.text)
        .await
        .map_err(|e| AppError::processing(EXTRACTION_ERROR, e))?;

    Ok(Json(response))
}
