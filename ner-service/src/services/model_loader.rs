//! Process-wide pipeline cache.
//!
//! The first successful load is kept until [`ModelLoader::invalidate`].
//! Concurrent first callers wait for a single load. A failed load is
//! returned to its caller and nothing is cached; the following `get` is a
//! fresh attempt. The cache lock is only write-held for the swap, so
//! [`ModelLoader::is_loaded`] answers while a load is in flight.

use crate::services::pipeline::{NlpPipeline, PipelineError, PipelineLoader};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

pub struct ModelLoader {
    loader: Arc<dyn PipelineLoader>,
    cached: RwLock<Option<Arc<dyn NlpPipeline>>>,
    loading: Mutex<()>,
}

impl ModelLoader {
    pub fn new(loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            loader,
            cached: RwLock::new(None),
            loading: Mutex::new(()),
        }
    }

    /// Return the cached pipeline, loading it on first use.
    pub async fn get(&self) -> Result<Arc<dyn NlpPipeline>, PipelineError> {
        if let Some(pipeline) = self.cached.read().await.as_ref() {
            return Ok(pipeline.clone());
        }

        let _loading = self.loading.lock().await;
        // Another caller may have finished loading while we waited.
        if let Some(pipeline) = self.cached.read().await.as_ref() {
            return Ok(pipeline.clone());
        }

        tracing::info!("Loading NLP pipeline");
        let start = Instant::now();

        match self.loader.load().await {
            Ok(pipeline) => {
                let elapsed = start.elapsed();
                histogram!("ner_model_load_duration_seconds").record(elapsed.as_secs_f64());
                counter!("ner_model_loads_total", "outcome" => "success").increment(1);
                tracing::info!(
                    pipes = ?pipeline.pipe_names(),
                    concepts = pipeline.knowledge_base().len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "NLP pipeline loaded"
                );

                *self.cached.write().await = Some(pipeline.clone());
                Ok(pipeline)
            }
            Err(e) => {
                counter!("ner_model_loads_total", "outcome" => "failure").increment(1);
                let err = match e {
                    PipelineError::Load(_) => e,
                    other => PipelineError::Load(other.to_string()),
                };
                tracing::error!(error = %err, "Failed to load NLP pipeline");
                Err(err)
            }
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.cached.read().await.is_some()
    }

    /// Drop the cached pipeline; the next `get` loads again.
    pub async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            tracing::info!("NLP pipeline cache invalidated");
        }
    }
}
