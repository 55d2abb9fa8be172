//! Mock pipeline implementations for testing.

use super::{
    Concept, Document, KbMatch, KnowledgeBase, Mention, NlpPipeline, PipelineError,
    PipelineLoader,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MOCK_CUI: &str = "C0000001";

/// Reports the whole input as one entity linked to a single test concept.
pub struct MockPipeline {
    enabled: bool,
    kb: KnowledgeBase,
}

impl MockPipeline {
    pub fn new(enabled: bool) -> Self {
        let kb = KnowledgeBase::from_concepts(vec![Concept {
            cui: MOCK_CUI.to_string(),
            canonical_name: "Test Entity".to_string(),
            aliases: vec!["Test Alias 1".to_string(), "Test Alias 2".to_string()],
            types: vec!["T000".to_string()],
            definition: Some("A test entity for unit testing.".to_string()),
        }]);
        Self { enabled, kb }
    }
}

impl NlpPipeline for MockPipeline {
    fn pipe_names(&self) -> Vec<&'static str> {
        vec!["ner", "umls_linker"]
    }

    fn process(&self, text: &str) -> Result<Document, PipelineError> {
        if !self.enabled {
            return Err(PipelineError::Inference(
                "Mock pipeline not enabled".to_string(),
            ));
        }

        let entities = if text.is_empty() {
            Vec::new()
        } else {
            vec![Mention {
                text: text.to_string(),
                start: 0,
                end: text.len(),
                kb_ents: vec![KbMatch {
                    cui: MOCK_CUI.to_string(),
                    score: 0.95,
                }],
            }]
        };

        Ok(Document {
            text: text.to_string(),
            entities,
            abbreviations: Vec::new(),
        })
    }

    fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    fn health_check(&self) -> Result<(), PipelineError> {
        if self.enabled {
            Ok(())
        } else {
            Err(PipelineError::Unavailable(
                "Mock pipeline not enabled".to_string(),
            ))
        }
    }
}

/// Hands out a [`MockPipeline`] and counts how often it was asked to.
pub struct MockPipelineLoader {
    outcome: Result<bool, String>,
    delay: Duration,
    loads: AtomicUsize,
}

impl MockPipelineLoader {
    /// Loads a pipeline built with `MockPipeline::new(enabled)`.
    pub fn new(enabled: bool) -> Self {
        Self {
            outcome: Ok(enabled),
            delay: Duration::from_millis(10),
            loads: AtomicUsize::new(0),
        }
    }

    /// Every load fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            delay: Duration::from_millis(10),
            loads: AtomicUsize::new(0),
        }
    }

    /// Stretch each load to `delay`, like a large knowledge base would.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineLoader for MockPipelineLoader {
    async fn load(&self) -> Result<Arc<dyn NlpPipeline>, PipelineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        // Simulate some loading work
        tokio::time::sleep(self.delay).await;

        match &self.outcome {
            Ok(enabled) => Ok(Arc::new(MockPipeline::new(*enabled))),
            Err(reason) => Err(PipelineError::KnowledgeBase(reason.clone())),
        }
    }
}
