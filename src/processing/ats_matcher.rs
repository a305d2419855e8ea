//! ATS (Applicant Tracking System) semantic matching and scoring

use crate::error::{Result, ResumeAtsError};
use crate::processing::embeddings::{cosine_similarity, EmbeddingCapability};
use crate::processing::keyphrase::CandidatePhrase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A phrase counts as covered when its cosine similarity to the resume is
/// strictly greater than this value.
pub const SIMILARITY_THRESHOLD: f32 = 0.4;

/// Which path produced a [`MatchResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored,
    MissingJobDescription,
    ModelUnavailable,
    NoSkillsExtracted,
    ComputationFailed,
}

impl fmt::Display for ScoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreOutcome::Scored => "scored",
            ScoreOutcome::MissingJobDescription => "missing job description",
            ScoreOutcome::ModelUnavailable => "model unavailable",
            ScoreOutcome::NoSkillsExtracted => "no skills extracted",
            ScoreOutcome::ComputationFailed => "computation failed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 0..=100
    pub score: u8,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub feedback: String,
    pub outcome: ScoreOutcome,
}

impl MatchResult {
    fn zero(outcome: ScoreOutcome, feedback: impl Into<String>) -> Self {
        Self {
            score: 0,
            matched_skills: Vec::new(),
            missing_skills: Vec::new(),
            feedback: feedback.into(),
            outcome,
        }
    }

    pub fn missing_job_description() -> Self {
        Self::zero(ScoreOutcome::MissingJobDescription, "Please provide a job description.")
    }

    pub fn model_not_loaded() -> Self {
        Self::zero(ScoreOutcome::ModelUnavailable, "Embedding model not loaded.")
    }

    pub fn model_timed_out(after_secs: f64) -> Self {
        Self::zero(
            ScoreOutcome::ModelUnavailable,
            format!("Embedding model timed out after {:.1}s; model not loaded for this request.", after_secs),
        )
    }

    pub fn no_skills_extracted() -> Self {
        Self::zero(ScoreOutcome::NoSkillsExtracted, "Could not extract skills from the job description.")
    }

    pub fn computation_failed(reason: impl fmt::Display) -> Self {
        Self::zero(ScoreOutcome::ComputationFailed, format!("Scoring failed: {}", reason))
    }

    pub fn total_skills(&self) -> usize {
        self.matched_skills.len() + self.missing_skills.len()
    }
}

/// Per-phrase matching detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseAssessment {
    pub phrase: String,
    pub relevance: f32,
    pub similarity: f32,
    pub matched: bool,
}

pub fn is_match(similarity: f32, threshold: f32) -> bool {
    similarity > threshold
}

/// Floor of the matched percentage; 0 when there is nothing to match
pub fn coverage_score(matched: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (matched.min(total) * 100 / total) as u8
}

pub fn coverage_feedback(matched: usize, total: usize) -> String {
    format!(
        "Your resume covers {} of the {} key skills identified in the job description.",
        matched, total
    )
}

/// Decides per candidate phrase whether the resume covers it
pub struct SemanticMatcher {
    capability: EmbeddingCapability,
    threshold: f32,
}

impl SemanticMatcher {
    pub fn new(capability: EmbeddingCapability) -> Self {
        Self {
            capability,
            threshold: SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Compare every candidate against the resume, keeping rank order
    pub fn assess(&self, resume_text: &str, candidates: &[CandidatePhrase]) -> Result<Vec<PhraseAssessment>> {
        let embedder = self.capability.embedder()?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Nothing to cover the phrases with
        if resume_text.trim().is_empty() {
            return Ok(candidates
                .iter()
                .map(|c| PhraseAssessment {
                    phrase: c.text.clone(),
                    relevance: c.relevance,
                    similarity: 0.0,
                    matched: false,
                })
                .collect());
        }

        let resume_embedding = embedder.embed(resume_text)?;
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let phrase_embeddings = embedder.embed_batch(&texts)?;
        if phrase_embeddings.len() != candidates.len() {
            return Err(ResumeAtsError::Computation(format!(
                "Got {} embeddings for {} skills",
                phrase_embeddings.len(),
                candidates.len()
            )));
        }

        candidates
            .iter()
            .zip(phrase_embeddings.iter())
            .map(|(candidate, embedding)| {
                let similarity = cosine_similarity(embedding, &resume_embedding)?;
                Ok(PhraseAssessment {
                    phrase: candidate.text.clone(),
                    relevance: candidate.relevance,
                    similarity,
                    matched: is_match(similarity, self.threshold),
                })
            })
            .collect()
    }

    /// Partition candidates into matched/missing and score the coverage
    pub fn match_candidates(&self, resume_text: &str, candidates: &[CandidatePhrase]) -> Result<MatchResult> {
        if candidates.is_empty() {
            return Ok(MatchResult::no_skills_extracted());
        }
        let assessments = self.assess(resume_text, candidates)?;
        Ok(summarize(&assessments))
    }
}

/// Build the scored result from per-phrase assessments
pub fn summarize(assessments: &[PhraseAssessment]) -> MatchResult {
    if assessments.is_empty() {
        return MatchResult::no_skills_extracted();
    }

    let (matched, missing): (Vec<&PhraseAssessment>, Vec<&PhraseAssessment>) =
        assessments.iter().partition(|a| a.matched);

    let total = assessments.len();
    MatchResult {
        score: coverage_score(matched.len(), total),
        matched_skills: matched.into_iter().map(|a| a.phrase.clone()).collect(),
        missing_skills: missing.into_iter().map(|a| a.phrase.clone()).collect(),
        feedback: coverage_feedback(assessments.iter().filter(|a| a.matched).count(), total),
        outcome: ScoreOutcome::Scored,
    }
}
