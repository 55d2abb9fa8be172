//! UMLS-style concept store.
//!
//! Concepts are read from JSON lines, one object per line:
//!
//! ```json
//! {"concept_id": "C0020740", "canonical_name": "Ibuprofen", "aliases": ["Advil"], "types": ["T109"], "definition": "..."}
//! ```

use super::PipelineError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Concept {
    #[serde(rename = "concept_id")]
    pub cui: String,
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub definition: Option<String>,
}

impl Concept {
    /// Canonical name followed by the aliases, skipping exact repeats.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(
            self.aliases
                .iter()
                .map(String::as_str)
                .filter(move |alias| *alias != self.canonical_name),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    concepts: Vec<Concept>,
    by_cui: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Build from concepts in order. A repeated CUI keeps its first record.
    pub fn from_concepts(concepts: impl IntoIterator<Item = Concept>) -> Self {
        let mut kb = Self::default();
        for concept in concepts {
            kb.insert(concept);
        }
        kb
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| {
            PipelineError::KnowledgeBase(format!("cannot open {}: {}", path.display(), e))
        })?;
        let kb = Self::from_reader(BufReader::new(file))?;

        tracing::info!(
            path = %path.display(),
            concepts = kb.len(),
            "Loaded knowledge base"
        );

        Ok(kb)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, PipelineError> {
        let mut kb = Self::default();

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| {
                PipelineError::KnowledgeBase(format!("read failed at line {}: {}", line_no, e))
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let concept: Concept = serde_json::from_str(&line).map_err(|e| {
                PipelineError::KnowledgeBase(format!("invalid concept at line {}: {}", line_no, e))
            })?;
            kb.insert(concept);
        }

        Ok(kb)
    }

    fn insert(&mut self, concept: Concept) {
        if self.by_cui.contains_key(&concept.cui) {
            tracing::warn!(cui = %concept.cui, "Duplicate concept ignored");
            return;
        }
        self.by_cui.insert(concept.cui.clone(), self.concepts.len());
        self.concepts.push(concept);
    }

    pub fn cui_to_entity(&self, cui: &str) -> Option<&Concept> {
        self.by_cui.get(cui).map(|&index| &self.concepts[index])
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}
