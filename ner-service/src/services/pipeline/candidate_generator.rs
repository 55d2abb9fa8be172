//! Concept candidate generation by character-trigram TF-IDF similarity.
//!
//! Every alias of every concept is vectorised once at load time; a mention
//! is vectorised the same way and scored against aliases sharing at least
//! one trigram, through an inverted index.

use super::knowledge_base::KnowledgeBase;
use super::tokenizer::normalize;
use super::KbMatch;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

type Trigram = [char; 3];

pub struct CandidateGenerator {
    cuis: Vec<String>,
    /// Concept index of each alias.
    alias_concepts: Vec<usize>,
    idf: HashMap<Trigram, f32>,
    postings: HashMap<Trigram, Vec<(usize, f32)>>,
}

/// Trigrams of each word padded with one space on both sides, with counts.
fn char_trigrams(normalized: &str) -> HashMap<Trigram, u32> {
    let mut counts = HashMap::new();
    for word in normalized.split(' ').filter(|w| !w.is_empty()) {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            *counts.entry([window[0], window[1], window[2]]).or_insert(0) += 1;
        }
    }
    counts
}

fn l2_normalize(weights: &mut [(Trigram, f32)]) {
    let norm = weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in weights.iter_mut() {
            *w /= norm;
        }
    }
}

impl CandidateGenerator {
    pub fn new(kb: &KnowledgeBase) -> Self {
        let mut cuis = Vec::with_capacity(kb.len());
        let mut alias_concepts = Vec::new();
        let mut alias_counts: Vec<HashMap<Trigram, u32>> = Vec::new();

        for (concept_index, concept) in kb.concepts().iter().enumerate() {
            cuis.push(concept.cui.clone());

            let mut seen = HashSet::new();
            for name in concept.names() {
                let normalized = normalize(name);
                if normalized.is_empty() || !seen.insert(normalized.clone()) {
                    continue;
                }
                alias_concepts.push(concept_index);
                alias_counts.push(char_trigrams(&normalized));
            }
        }

        let mut document_frequency: HashMap<Trigram, u32> = HashMap::new();
        for counts in &alias_counts {
            for trigram in counts.keys() {
                *document_frequency.entry(*trigram).or_insert(0) += 1;
            }
        }

        // Smoothed idf: ln((1 + n) / (1 + df)) + 1
        let n = alias_counts.len() as f32;
        let idf: HashMap<Trigram, f32> = document_frequency
            .into_iter()
            .map(|(trigram, df)| (trigram, ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0))
            .collect();

        let mut postings: HashMap<Trigram, Vec<(usize, f32)>> = HashMap::new();
        for (alias_id, counts) in alias_counts.into_iter().enumerate() {
            let mut weights: Vec<(Trigram, f32)> = counts
                .into_iter()
                .map(|(trigram, tf)| (trigram, tf as f32 * idf[&trigram]))
                .collect();
            l2_normalize(&mut weights);
            for (trigram, weight) in weights {
                postings.entry(trigram).or_default().push((alias_id, weight));
            }
        }

        tracing::debug!(
            concepts = cuis.len(),
            aliases = alias_concepts.len(),
            trigrams = postings.len(),
            "Built candidate index"
        );

        Self {
            cuis,
            alias_concepts,
            idf,
            postings,
        }
    }

    #[cfg(test)]
    fn alias_count(&self) -> usize {
        self.alias_concepts.len()
    }

    /// Concepts whose best alias scores at least `threshold` against
    /// `mention`, best first, at most `limit` of them.
    pub fn generate(&self, mention: &str, threshold: f32, limit: usize) -> Vec<KbMatch> {
        if limit == 0 {
            return Vec::new();
        }

        // Trigrams never seen in any alias carry no weight.
        let mut query: Vec<(Trigram, f32)> = char_trigrams(&normalize(mention))
            .into_iter()
            .filter_map(|(trigram, tf)| {
                self.idf
                    .get(&trigram)
                    .map(|idf| (trigram, tf as f32 * idf))
            })
            .collect();
        if query.is_empty() {
            return Vec::new();
        }
        l2_normalize(&mut query);

        let mut alias_scores: HashMap<usize, f32> = HashMap::new();
        for (trigram, query_weight) in &query {
            if let Some(posting) = self.postings.get(trigram) {
                for &(alias_id, alias_weight) in posting {
                    *alias_scores.entry(alias_id).or_insert(0.0) += query_weight * alias_weight;
                }
            }
        }

        let mut concept_scores: HashMap<usize, f32> = HashMap::new();
        for (alias_id, score) in alias_scores {
            let best = concept_scores
                .entry(self.alias_concepts[alias_id])
                .or_insert(0.0);
            *best = best.max(score);
        }

        let mut matches: Vec<KbMatch> = concept_scores
            .into_iter()
            .filter(|&(_, score)| score >= threshold)
            .map(|(concept_index, score)| KbMatch {
                cui: self.cuis[concept_index].clone(),
                score: score.min(1.0),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cui.cmp(&b.cui))
        });
        matches.truncate(limit);
        matches
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

    fn generator() -> CandidateGenerator {
        CandidateGenerator::new(&KnowledgeBase::from_concepts(vec![
            concept("C0020740", "Ibuprofen", &["Advil", "Motrin"]),
            concept("C0030193", "Pain", &["Ache", "Pain NOS"]),
            concept(
                "C0024117",
                "Chronic Obstructive Airway Disease",
                &["chronic obstructive pulmonary disease", "COPD"],
            ),
            concept(
                "C0018802",
                "Congestive heart failure",
                &["CHF", "Heart failure congestive"],
            ),
            concept("C0018801", "Heart failure", &["Cardiac failure"]),
        ]))
    }

    #[test]
    fn exact_alias_scores_one() {
        let matches = generator().generate("ibuprofen", 0.7, 5);
        assert_eq!(matches[0].cui, "C0020740");
        assert!((matches[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn matching_is_case_and_spacing_insensitive() {
        let matches = generator().generate("Chronic  obstructive PULMONARY disease", 0.7, 5);
        assert_eq!(matches[0].cui, "C0024117");
        assert!(matches[0].score > 0.99);
    }

    #[test]
    fn results_are_sorted_and_limited() {
        let generator = generator();
        let matches = generator.generate("heart failure", 0.3, 5);
        assert!(matches.len() >= 2);
        assert_eq!(matches[0].cui, "C0018801");
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));

        let limited = generator.generate("heart failure", 0.3, 1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].cui, "C0018801");
    }

    #[test]
    fn threshold_filters_weak_candidates() {
        let matches = generator().generate("heart failure", 0.99, 5);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cui, "C0018801");
    }

    #[test]
    fn unrelated_text_has_no_candidates() {
        assert!(generator().generate("zzqx", 0.7, 5).is_empty());
        assert!(generator().generate("", 0.7, 5).is_empty());
    }

    #[test]
    fn canonical_names_are_indexed_once_per_concept() {
        // Ibuprofen, Advil, Motrin / Pain, Ache, Pain NOS / 3 / 3 / 2
        assert_eq!(generator().alias_count(), 14);
    }
}
