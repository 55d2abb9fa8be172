//! NLP pipeline abstractions and implementations.
//!
//! The service only talks to [`NlpPipeline`]; everything behind it
//! (tokenisation, recognition, abbreviation detection and concept linking)
//! can be swapped out. [`UmlsPipeline`] is the dictionary-backed
//! implementation used in production, [`MockPipeline`] is for tests.

pub mod abbreviation;
pub mod candidate_generator;
pub mod knowledge_base;
pub mod mock;
pub mod tokenizer;
pub mod umls;

pub use knowledge_base::{Concept, KnowledgeBase};
pub use mock::{MockPipeline, MockPipelineLoader};
pub use umls::{UmlsPipeline, UmlsPipelineLoader};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error loading model: {0}")]
    Load(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Pipeline unavailable: {0}")]
    Unavailable(String),
}

/// A contiguous piece of the input text. Offsets are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A candidate concept for a mention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KbMatch {
    pub cui: String,
    pub score: f32,
}

/// A recognised entity mention together with its linked candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mention {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Ordered by descending score.
    pub kb_ents: Vec<KbMatch>,
}

/// A short form and the long form it was defined with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abbreviation {
    pub short_form: TextSpan,
    pub long_form: TextSpan,
}

/// Result of running the pipeline over one text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    pub text: String,
    pub entities: Vec<Mention>,
    pub abbreviations: Vec<Abbreviation>,
}

/// A loaded, ready-to-call NLP pipeline.
///
/// Implementations are shared read-only across requests and must be safe
/// to call concurrently.
pub trait NlpPipeline: Send + Sync {
    /// Names of the components, in execution order.
    fn pipe_names(&self) -> Vec<&'static str>;

    /// Run every component over `text`.
    fn process(&self, text: &str) -> Result<Document, PipelineError>;

    /// Concepts the linker resolves CUIs against.
    fn knowledge_base(&self) -> &KnowledgeBase;

    /// Verify the pipeline can actually be called.
    fn health_check(&self) -> Result<(), PipelineError> {
        self.process("").map(|_| ())
    }
}

/// Builds a pipeline. Called by the model loader, at most once per cache fill.
#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn NlpPipeline>, PipelineError>;
}
