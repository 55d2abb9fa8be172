pub mod entities;
pub mod health;

pub use entities::{
    AbbreviationResponse, EntityResponse, ExtractRequest, ExtractionResponse, UmlsEntity,
    MAX_TEXT_CHARS,
};
pub use health::HealthResponse;
