use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upper bound on the input size, in characters. Keep in sync with the
/// `length` validation on [`ExtractRequest::text`].
pub const MAX_TEXT_CHARS: usize = 100_000;

#[derive(Debug, Deserialize, Validate)]
pub struct ExtractRequest {
    /// May be empty.
    #[validate(length(max = 100000))]
    pub text: String,
}

/// A UMLS concept linked to an entity mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmlsEntity {
    pub canonical_name: String,
    pub definition: Option<String>,
    pub aliases: Vec<String>,
    pub cui: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResponse {
    pub text: String,
    pub umls_entities: Vec<UmlsEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbbreviationResponse {
    pub short_form: String,
    pub long_form: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub entities: Vec<EntityResponse>,
    #[serde(default)]
    pub abbreviations: Vec<AbbreviationResponse>,
}
