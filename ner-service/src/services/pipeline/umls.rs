//! Dictionary-backed biomedical NER with UMLS concept linking.

use super::abbreviation::detect_abbreviations;
use super::candidate_generator::CandidateGenerator;
use super::knowledge_base::KnowledgeBase;
use super::tokenizer::{normalize, tokenize, Token};
use super::{Document, Mention, NlpPipeline, PipelineError, PipelineLoader};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Single-token aliases that are never reported as mentions.
const STOP_WORDS: &[&str] = &[
    "a", "all", "an", "and", "are", "as", "at", "be", "by", "can", "for", "had", "has", "he",
    "her", "his", "in", "is", "it", "may", "no", "not", "of", "on", "or", "she", "the", "to",
    "was", "were", "with",
];

const MIN_MENTION_CHARS: usize = 2;

/// Settings for [`UmlsPipeline`].
#[derive(Debug, Clone)]
pub struct UmlsPipelineConfig {
    /// JSON-lines concept file.
    pub knowledge_base_path: PathBuf,
    /// Minimum similarity for a concept to be linked.
    pub linker_threshold: f32,
    pub max_entities_per_mention: usize,
    /// Link abbreviation mentions through their long form.
    pub resolve_abbreviations: bool,
    /// Longest alias, in tokens, the recogniser will try to match.
    pub max_mention_tokens: usize,
}

impl Default for UmlsPipelineConfig {
    fn default() -> Self {
        Self {
            knowledge_base_path: PathBuf::from("data/umls_sample.jsonl"),
            linker_threshold: 0.7,
            max_entities_per_mention: 5,
            resolve_abbreviations: true,
            max_mention_tokens: 6,
        }
    }
}

pub struct UmlsPipeline {
    kb: KnowledgeBase,
    gazetteer: HashSet<String>,
    longest_alias_tokens: usize,
    generator: CandidateGenerator,
    linker_threshold: f32,
    max_entities_per_mention: usize,
    resolve_abbreviations: bool,
}

impl UmlsPipeline {
    pub fn new(kb: KnowledgeBase, config: &UmlsPipelineConfig) -> Self {
        let mut gazetteer = HashSet::new();
        let mut longest_alias_tokens = 0;

        for concept in kb.concepts() {
            for name in concept.names() {
                let normalized = normalize(name);
                if normalized.is_empty() {
                    continue;
                }
                let tokens = normalized.split(' ').count();
                if tokens > config.max_mention_tokens {
                    continue;
                }
                longest_alias_tokens = longest_alias_tokens.max(tokens);
                gazetteer.insert(normalized);
            }
        }

        let generator = CandidateGenerator::new(&kb);

        Self {
            kb,
            gazetteer,
            longest_alias_tokens,
            generator,
            linker_threshold: config.linker_threshold,
            max_entities_per_mention: config.max_entities_per_mention,
            resolve_abbreviations: config.resolve_abbreviations,
        }
    }

    fn is_reportable(&self, tokens: &[Token<'_>], key: &str) -> bool {
        if tokens.len() > 1 {
            return true;
        }
        key.chars().count() >= MIN_MENTION_CHARS && !STOP_WORDS.contains(&key)
    }

    /// Longest gazetteer match starting at each position, left to right.
    fn recognize(&self, tokens: &[Token<'_>]) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let longest = self.longest_alias_tokens.min(tokens.len() - i);
            let matched = (1..=longest).rev().find(|&n| {
                let window = &tokens[i..i + n];
                let key = window
                    .iter()
                    .map(|t| t.text.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.gazetteer.contains(&key) && self.is_reportable(window, &key)
            });

            match matched {
                Some(n) => {
                    spans.push((tokens[i].start, tokens[i + n - 1].end));
                    i += n;
                }
                None => i += 1,
            }
        }

        spans
    }
}

/// Keep the longest spans first, then earlier ones, dropping any overlap.
/// Returned in text order.
fn resolve_overlaps(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    let mut kept: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.iter().all(|k| span.1 <= k.0 || span.0 >= k.1) {
            kept.push(span);
        }
    }

    kept.sort_by_key(|span| span.0);
    kept
}

impl NlpPipeline for UmlsPipeline {
    fn pipe_names(&self) -> Vec<&'static str> {
        vec!["ner", "abbreviation_detector", "umls_linker"]
    }

    fn process(&self, text: &str) -> Result<Document, PipelineError> {
        let tokens = tokenize(text);
        let abbreviations = detect_abbreviations(text);

        let mut spans = self.recognize(&tokens);
        spans.extend(
            abbreviations
                .iter()
                .map(|abbr| (abbr.short_form.start, abbr.short_form.end)),
        );

        let entities = resolve_overlaps(spans)
            .into_iter()
            .map(|(start, end)| {
                let surface = &text[start..end];
                let link_text = if self.resolve_abbreviations {
                    abbreviations
                        .iter()
                        .find(|abbr| abbr.short_form.start == start && abbr.short_form.end == end)
                        .map(|abbr| abbr.long_form.text.as_str())
                        .unwrap_or(surface)
                } else {
                    surface
                };

                Mention {
                    text: surface.to_string(),
                    start,
                    end,
                    kb_ents: self.generator.generate(
                        link_text,
                        self.linker_threshold,
                        self.max_entities_per_mention,
                    ),
                }
            })
            .collect();

        Ok(Document {
            text: text.to_string(),
            entities,
            abbreviations,
        })
    }

    fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }
}

/// Reads the knowledge base from disk and builds the linker index.
pub struct UmlsPipelineLoader {
    config: UmlsPipelineConfig,
}

impl UmlsPipelineLoader {
    pub fn new(config: UmlsPipelineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PipelineLoader for UmlsPipelineLoader {
    async fn load(&self) -> Result<Arc<dyn NlpPipeline>, PipelineError> {
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            let kb = KnowledgeBase::load(&config.knowledge_base_path)?;
            if kb.is_empty() {
                return Err(PipelineError::KnowledgeBase(format!(
                    "{} contains no concepts",
                    config.knowledge_base_path.display()
                )));
            }
            let pipeline: Arc<dyn NlpPipeline> = Arc::new(UmlsPipeline::new(kb, &config));
            Ok(pipeline)
        })
        .await
        .map_err(|e| PipelineError::Load(format!("loader task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pipeline::Concept;

    fn concept(cui: &str, name: &str, aliases: &[&str]) -> Concept {
        Concept {
            cui: cui.to_string(),
            canonical_name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            types: Vec::new(),
            definition: None,
        }
    }

    fn pipeline() -> UmlsPipeline {
        let kb = KnowledgeBase::from_concepts(vec![
            concept("C0020740", "Ibuprofen", &["Advil"]),
            concept("C0030193", "Pain", &[]),
            concept(
                "C0024117",
                "Chronic Obstructive Airway Disease",
                &["chronic obstructive pulmonary disease"],
            ),
            concept("C0018801", "Heart failure", &[]),
            concept("C0018787", "Heart", &[]),
            concept("C1999999", "Was", &[]),
        ]);
        UmlsPipeline::new(kb, &UmlsPipelineConfig::default())
    }

    #[test]
    fn recognises_and_links_dictionary_terms() {
        let text = "The patient was prescribed ibuprofen for pain relief.";
        let doc = pipeline().process(text).unwrap();

        let mentions: Vec<&str> = doc.entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(mentions, vec!["ibuprofen", "pain"]);

        let ibuprofen = &doc.entities[0];
        assert_eq!(&text[ibuprofen.start..ibuprofen.end], "ibuprofen");
        assert_eq!(ibuprofen.kb_ents[0].cui, "C0020740");
        assert_eq!(doc.entities[1].kb_ents[0].cui, "C0030193");
    }

    #[test]
    fn prefers_the_longest_match() {
        let doc = pipeline().process("Signs of heart failure.").unwrap();
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.entities[0].text, "heart failure");
        assert_eq!(doc.entities[0].kb_ents[0].cui, "C0018801");
    }

    #[test]
    fn stop_word_aliases_are_not_mentions() {
        let doc = pipeline().process("It was fine.").unwrap();
        assert!(doc.entities.is_empty());
    }

    #[test]
    fn abbreviations_are_linked_through_their_long_form() {
        let text = "The patient has chronic obstructive pulmonary disease (COPD). COPD is stable.";
        let doc = pipeline().process(text).unwrap();

        assert_eq!(doc.abbreviations.len(), 2);
        assert_eq!(
            doc.abbreviations[0].long_form.text,
            "chronic obstructive pulmonary disease"
        );

        let copd: Vec<&Mention> = doc.entities.iter().filter(|e| e.text == "COPD").collect();
        assert_eq!(copd.len(), 2);
        assert!(copd.iter().all(|m| m.kb_ents[0].cui == "C0024117"));

        assert!(doc
            .entities
            .iter()
            .any(|e| e.text == "chronic obstructive pulmonary disease"));
    }

    #[test]
    fn abbreviations_without_resolution_link_the_surface_form() {
        let config = UmlsPipelineConfig {
            resolve_abbreviations: false,
            ..UmlsPipelineConfig::default()
        };
        let kb = pipeline().knowledge_base().clone();
        let pipeline = UmlsPipeline::new(kb, &config);

        let doc = pipeline
            .process("chronic obstructive pulmonary disease (COPD)")
            .unwrap();
        let copd = doc.entities.iter().find(|e| e.text == "COPD").unwrap();
        assert!(copd.kb_ents.is_empty());
    }

    #[test]
    fn empty_text_yields_an_empty_document() {
        let doc = pipeline().process("").unwrap();
        assert!(doc.entities.is_empty());
        assert!(doc.abbreviations.is_empty());
    }

    #[test]
    fn overlapping_spans_keep_the_longest() {
        assert_eq!(
            resolve_overlaps(vec![(0, 5), (0, 13), (6, 13), (20, 24)]),
            vec![(0, 13), (20, 24)]
        );
    }

    #[tokio::test]
    async fn loader_reports_missing_knowledge_base() {
        let loader = UmlsPipelineLoader::new(UmlsPipelineConfig {
            knowledge_base_path: PathBuf::from("/nonexistent/kb.jsonl"),
            ..UmlsPipelineConfig::default()
        });

        let err = loader.load().await.err().unwrap();
        assert!(matches!(err, PipelineError::KnowledgeBase(_)));
    }

    #[tokio::test]
    async fn loader_builds_pipeline_from_sample_data() {
        let loader = UmlsPipelineLoader::new(UmlsPipelineConfig {
            knowledge_base_path: PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/data/umls_sample.jsonl"
            )),
            ..UmlsPipelineConfig::default()
        });

        let pipeline = loader.load().await.unwrap();
        assert_eq!(
            pipeline.pipe_names(),
            vec!["ner", "abbreviation_detector", "umls_linker"]
        );
        assert!(pipeline.knowledge_base().cui_to_entity("C0020740").is_some());
        pipeline.health_check().unwrap();
    }
}
