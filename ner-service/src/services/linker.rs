//! Entity extraction: run the pipeline and reshape its output for the API.

use crate::dtos::{AbbreviationResponse, EntityResponse, ExtractionResponse, UmlsEntity};
use crate::services::pipeline::{Document, KnowledgeBase, NlpPipeline, PipelineError};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

pub struct EntityLinker {
    pipeline: Arc<dyn NlpPipeline>,
}

impl EntityLinker {
    pub fn new(pipeline: Arc<dyn NlpPipeline>) -> Self {
        Self { pipeline }
    }

    /// Run the pipeline over `text` on the blocking pool.
    pub async fn extract_entities(
        &self,
        text: String,
    ) -> Result<ExtractionResponse, PipelineError> {
        let start = Instant::now();
        let chars = text.chars().count();
        let pipeline = self.pipeline.clone();

        let task = tokio::task::spawn_blocking(move || {
            let doc = pipeline.process(&text)?;
            Ok::<_, PipelineError>(build_response(pipeline.knowledge_base(), doc))
        });
        let result = task
            .await
            .map_err(|e| PipelineError::Inference(format!("extraction task failed: {}", e)))
            .and_then(|result| result);

        let elapsed = start.elapsed();
        histogram!("ner_extraction_duration_seconds").record(elapsed.as_secs_f64());

        match &result {
            Ok(response) => {
                counter!("ner_extractions_total", "outcome" => "success").increment(1);
                counter!("ner_entities_extracted_total").increment(response.entities.len() as u64);
                tracing::debug!(
                    chars,
                    entities = response.entities.len(),
                    abbreviations = response.abbreviations.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Extracted entities"
                );
            }
            Err(e) => {
                counter!("ner_extractions_total", "outcome" => "failure").increment(1);
                tracing::warn!(chars, error = %e, "Entity extraction failed");
            }
        }

        result
    }
}

/// Resolve every candidate CUI against the knowledge base. Candidates the
/// knowledge base does not know are dropped.
pub fn build_response(kb: &KnowledgeBase, doc: Document) -> ExtractionResponse {
    let entities = doc
        .entities
        .into_iter()
        .map(|mention| EntityResponse {
            umls_entities: mention
                .kb_ents
                .iter()
                .filter_map(|candidate| {
                    let concept = kb.cui_to_entity(&candidate.cui)?;
                    Some(UmlsEntity {
                        canonical_name: concept.canonical_name.clone(),
                        definition: concept.definition.clone(),
                        aliases: concept.aliases.clone(),
                        cui: candidate.cui.clone(),
                        score: candidate.score,
                    })
                })
                .collect(),
            text: mention.text,
        })
        .collect();

    let abbreviations = doc
        .abbreviations
        .into_iter()
        .map(|abbr| AbbreviationResponse {
            short_form: abbr.short_form.text,
            long_form: abbr.long_form.text,
        })
        .collect();

    ExtractionResponse {
        entities,
        abbreviations,
    }
}
