//! Embedding-based keyphrase extraction from job descriptions

use crate::config::Config;
use crate::error::{Result, ResumeAtsError};
use crate::processing::embeddings::{cosine_similarity, EmbeddingCapability};
use crate::processing::text_processor::TextProcessor;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const MIN_NGRAM: usize = 1;
pub const MAX_NGRAM: usize = 3;
pub const DEFAULT_TOP_N: usize = 15;
pub const DEFAULT_DIVERSITY: f32 = 0.3;

/// A skill phrase with its relevance to the whole job description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePhrase {
    pub text: String,
    pub relevance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionSettings {
    pub min_ngram: usize,
    pub max_ngram: usize,
    pub top_n: usize,
    pub diversity: f32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            min_ngram: MIN_NGRAM,
            max_ngram: MAX_NGRAM,
            top_n: DEFAULT_TOP_N,
            diversity: DEFAULT_DIVERSITY,
        }
    }
}

impl From<&Config> for ExtractionSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_ngram: config.extraction.min_ngram,
            max_ngram: config.extraction.max_ngram,
            top_n: config.extraction.top_n,
            diversity: config.extraction.diversity,
        }
    }
}

pub struct KeyphraseExtractor {
    capability: EmbeddingCapability,
    processor: TextProcessor,
    settings: ExtractionSettings,
}

impl KeyphraseExtractor {
    pub fn new(capability: EmbeddingCapability) -> Self {
        Self::with_settings(capability, ExtractionSettings::default())
    }

    pub fn with_settings(capability: EmbeddingCapability, settings: ExtractionSettings) -> Self {
        Self {
            capability,
            processor: TextProcessor::new(),
            settings,
        }
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    /// Rank the 1..=3 word phrases of `job_description` by how well they
    /// represent the whole text.
    ///
    /// Blank input gives an empty list. An unavailable model gives
    /// `ModelUnavailable` on every call.
    pub fn extract_key_phrases(&self, job_description: &str) -> Result<Vec<CandidatePhrase>> {
        let embedder = self.capability.embedder()?;

        if job_description.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.processor.candidate_ngrams(
            job_description,
            self.settings.min_ngram,
            self.settings.max_ngram,
        );
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let doc_embedding = embedder.embed(job_description)?;
        let candidate_embeddings = embedder.embed_batch(&candidates)?;
        if candidate_embeddings.len() != candidates.len() {
            return Err(ResumeAtsError::Computation(format!(
                "Got {} embeddings for {} candidate phrases",
                candidate_embeddings.len(),
                candidates.len()
            )));
        }

        let relevance = candidate_embeddings
            .iter()
            .map(|e| cosine_similarity(e, &doc_embedding))
            .collect::<Result<Vec<f32>>>()?;

        let mut selected = select_diverse(
            &relevance,
            &candidate_embeddings,
            self.settings.top_n,
            self.settings.diversity,
        )?;
        selected.sort_by(|&a, &b| relevance[b].total_cmp(&relevance[a]).then(a.cmp(&b)));

        debug!(
            "Selected {} of {} candidate phrases",
            selected.len(),
            candidates.len()
        );

        Ok(selected
            .into_iter()
            .map(|i| CandidatePhrase {
                text: candidates[i].clone(),
                relevance: relevance[i],
            })
            .collect())
    }
}

/// Maximal marginal relevance selection.
///
/// Picks the most relevant candidate first, then repeatedly the one with the
/// best `(1 - diversity) * relevance - diversity * max_sim_to_selected`.
/// Ties go to the earliest candidate. Returns indices in selection order.
pub fn select_diverse(
    relevance: &[f32],
    embeddings: &[Vec<f32>],
    top_n: usize,
    diversity: f32,
) -> Result<Vec<usize>> {
    let limit = top_n.min(relevance.len());
    let mut selected: Vec<usize> = Vec::with_capacity(limit);
    if limit == 0 {
        return Ok(selected);
    }

    let mut remaining: Vec<usize> = (0..relevance.len()).collect();
    // closest similarity between each candidate and anything already selected
    let mut redundancy = vec![f32::NEG_INFINITY; relevance.len()];

    while selected.len() < limit {
        let mut best: Option<(usize, f32)> = None;
        for (pos, &idx) in remaining.iter().enumerate() {
            let score = if selected.is_empty() {
                relevance[idx]
            } else {
                (1.0 - diversity) * relevance[idx] - diversity * redundancy[idx]
            };
            let better = match best {
                None => true,
                Some((_, best_score)) => score.total_cmp(&best_score) == Ordering::Greater,
            };
            if better {
                best = Some((pos, score));
            }
        }

        let Some((pos, _)) = best else { break };
        let chosen = remaining.remove(pos);
        selected.push(chosen);

        for &idx in &remaining {
            let sim = cosine_similarity(&embeddings[idx], &embeddings[chosen])?;
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::Embedder;
    use std::sync::Arc;

    /// Bag-of-words over a fixed vocabulary; unknown words are ignored
    struct VocabEmbedder {
        vocab: Vec<&'static str>,
    }

    impl Embedder for VocabEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            let words: Vec<&str> = lower
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect();
            Ok(self
                .vocab
                .iter()
                .map(|v| words.iter().filter(|w| *w == v).count() as f32)
                .collect())
        }
    }

    fn extractor(settings: ExtractionSettings) -> KeyphraseExtractor {
        let embedder = VocabEmbedder {
            vocab: vec!["looking", "python", "developer", "experience", "sql", "cloud", "computing"],
        };
        KeyphraseExtractor::with_settings(EmbeddingCapability::loaded(Arc::new(embedder)), settings)
    }

    const JOB: &str = "Looking for a Python developer with experience in SQL and cloud computing";

    #[test]
    fn test_blank_description_is_empty() {
        let extractor = extractor(ExtractionSettings::default());
        assert!(extractor.extract_key_phrases("").unwrap().is_empty());
        assert!(extractor.extract_key_phrases("   \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_stop_words_only_is_empty() {
        let extractor = extractor(ExtractionSettings::default());
        assert!(extractor.extract_key_phrases("and the of with").unwrap().is_empty());
    }

    #[test]
    fn test_default_cap_and_ordering() {
        let extractor = extractor(ExtractionSettings::default());
        let phrases = extractor.extract_key_phrases(JOB).unwrap();

        assert_eq!(phrases.len(), DEFAULT_TOP_N);
        assert!(phrases.iter().all(|p| (1..=3).contains(&p.text.split(' ').count())));
        assert!(phrases.windows(2).all(|w| w[0].relevance >= w[1].relevance));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = extractor(ExtractionSettings::default());
        let first = extractor.extract_key_phrases(JOB).unwrap();
        let second = extractor.extract_key_phrases(JOB).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_candidates_when_cap_is_large() {
        let extractor = extractor(ExtractionSettings { top_n: 50, ..Default::default() });
        let phrases: Vec<String> = extractor
            .extract_key_phrases(JOB)
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();

        assert_eq!(phrases.len(), 18);
        for expected in ["python", "sql", "cloud computing"] {
            assert!(phrases.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_pure_relevance_prefers_longer_phrases_here() {
        let extractor = extractor(ExtractionSettings { top_n: 5, diversity: 0.0, ..Default::default() });
        let phrases = extractor.extract_key_phrases(JOB).unwrap();

        // every trigram scores 3/sqrt(21) against the seven-word document
        assert!(phrases.iter().all(|p| p.text.split(' ').count() == 3));
        assert_eq!(phrases[0].text, "looking python developer");
    }

    #[test]
    fn test_unavailable_model_reports_condition() {
        let extractor = KeyphraseExtractor::new(EmbeddingCapability::unavailable("not loaded"));
        assert!(!extractor.is_available());
        let err = extractor.extract_key_phrases(JOB).unwrap_err();
        assert!(err.is_model_unavailable());
    }

    #[test]
    fn test_mmr_suppresses_near_duplicates() {
        // 0 and 1 are near-identical, 2 is distinct but slightly less relevant
        let relevance = vec![0.9, 0.89, 0.8];
        let embeddings = vec![vec![1.0, 0.0], vec![0.99, 0.01], vec![0.0, 1.0]];

        let plain = select_diverse(&relevance, &embeddings, 2, 0.0).unwrap();
        assert_eq!(plain, vec![0, 1]);

        let diverse = select_diverse(&relevance, &embeddings, 2, 0.5).unwrap();
        assert_eq!(diverse, vec![0, 2]);
    }

    #[test]
    fn test_mmr_ties_go_to_first() {
        let relevance = vec![0.5, 0.5, 0.5];
        let embeddings = vec![vec![1.0], vec![1.0], vec![1.0]];
        assert_eq!(select_diverse(&relevance, &embeddings, 3, 0.3).unwrap(), vec![0, 1, 2]);
        assert!(select_diverse(&relevance, &embeddings, 0, 0.3).unwrap().is_empty());
    }
}
