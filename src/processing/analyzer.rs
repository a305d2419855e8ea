//! Scoring engine wiring keyphrase extraction to semantic matching

use crate::config::Config;
use crate::error::{Result, ResumeAtsError};
use crate::processing::ats_matcher::{summarize, MatchResult, PhraseAssessment, SemanticMatcher};
use crate::processing::embeddings::EmbeddingCapability;
use crate::processing::keyphrase::{CandidatePhrase, ExtractionSettings, KeyphraseExtractor};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Full result of one scoring call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsAnalysis {
    pub result: MatchResult,
    pub assessments: Vec<PhraseAssessment>,
    pub processing_time_ms: u64,
}

/// Owns both components and the shared embedding capability
pub struct AtsEngine {
    capability: EmbeddingCapability,
    extractor: KeyphraseExtractor,
    matcher: SemanticMatcher,
}

impl AtsEngine {
    pub fn new(capability: EmbeddingCapability, config: &Config) -> Self {
        let extractor = KeyphraseExtractor::with_settings(capability.clone(), ExtractionSettings::from(config));
        let matcher = SemanticMatcher::new(capability.clone()).with_threshold(config.matching.similarity_threshold);

        Self {
            capability,
            extractor,
            matcher,
        }
    }

    /// Engine with the calibrated defaults
    pub fn with_defaults(capability: EmbeddingCapability) -> Self {
        Self {
            extractor: KeyphraseExtractor::new(capability.clone()),
            matcher: SemanticMatcher::new(capability.clone()),
            capability,
        }
    }

    pub fn capability(&self) -> &EmbeddingCapability {
        &self.capability
    }

    pub fn threshold(&self) -> f32 {
        self.matcher.threshold()
    }

    pub fn extract_key_phrases(&self, job_description: &str) -> Result<Vec<CandidatePhrase>> {
        self.extractor.extract_key_phrases(job_description)
    }

    /// Score a resume against a job description. Never fails: every problem
    /// becomes a zero score with an explanatory message.
    pub fn score_resume(&self, resume_text: &str, job_description: &str) -> MatchResult {
        self.analyze(resume_text, job_description).result
    }

    pub fn analyze(&self, resume_text: &str, job_description: &str) -> AtsAnalysis {
        let start_time = Instant::now();

        let (result, assessments) = match self.run(resume_text, job_description) {
            Ok(assessments) => (summarize(&assessments), assessments),
            Err(ResumeAtsError::EmptyInput(what)) => {
                debug!("Nothing to score: {}", what);
                (self.short_circuit(job_description), Vec::new())
            }
            Err(ResumeAtsError::ModelUnavailable(reason)) => {
                warn!("Scoring skipped, embedding model unavailable: {}", reason);
                (MatchResult::model_not_loaded(), Vec::new())
            }
            Err(e) => {
                warn!("Scoring failed: {}", e);
                (MatchResult::computation_failed(&e), Vec::new())
            }
        };

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "ATS score {} ({}) in {}ms",
            result.score, result.outcome, processing_time_ms
        );

        AtsAnalysis {
            result,
            assessments,
            processing_time_ms,
        }
    }

    /// `EmptyInput` means one of the zero-score short circuits applies
    fn run(&self, resume_text: &str, job_description: &str) -> Result<Vec<PhraseAssessment>> {
        if job_description.trim().is_empty() {
            return Err(ResumeAtsError::EmptyInput("job description is blank".to_string()));
        }
        self.capability.embedder()?;

        let candidates = self.extractor.extract_key_phrases(job_description)?;
        if candidates.is_empty() {
            return Err(ResumeAtsError::EmptyInput(
                "no key phrases in job description".to_string(),
            ));
        }
        debug!("Extracted {} key phrases", candidates.len());

        self.matcher.assess(resume_text, &candidates)
    }

    fn short_circuit(&self, job_description: &str) -> MatchResult {
        if job_description.trim().is_empty() {
            MatchResult::missing_job_description()
        } else {
            MatchResult::no_skills_extracted()
        }
    }

    /// Run [`AtsEngine::analyze`] on the blocking pool, giving up after `timeout`.
    ///
    /// A timeout is reported as the model being unavailable for this call only.
    pub async fn analyze_with_timeout(
        self: Arc<Self>,
        resume_text: String,
        job_description: String,
        timeout: Duration,
    ) -> AtsAnalysis {
        let start_time = Instant::now();
        let engine = Arc::clone(&self);
        let task = tokio::task::spawn_blocking(move || engine.analyze(&resume_text, &job_description));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(join_error)) => {
                warn!("Scoring task failed: {}", join_error);
                AtsAnalysis {
                    result: MatchResult::computation_failed(join_error),
                    assessments: Vec::new(),
                    processing_time_ms: start_time.elapsed().as_millis() as u64,
                }
            }
            Err(_) => {
                warn!("Scoring timed out after {:?}", timeout);
                AtsAnalysis {
                    result: MatchResult::model_timed_out(timeout.as_secs_f64()),
                    assessments: Vec::new(),
                    processing_time_ms: start_time.elapsed().as_millis() as u64,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ats_matcher::ScoreOutcome;
    use crate::processing::embeddings::Embedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let has = |w: &str| if text.to_lowercase().contains(w) { 1.0 } else { 0.0 };
            Ok(vec![has("rust"), has("async"), has("cobol")])
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(ResumeAtsError::Computation("out of memory".to_string()))
        }
    }

    struct SlowEmbedder;

    impl Embedder for SlowEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(vec![1.0])
        }
    }

    fn counting_engine() -> (Arc<CountingEmbedder>, AtsEngine) {
        let embedder = Arc::new(CountingEmbedder { calls: AtomicUsize::new(0) });
        let engine = AtsEngine::with_defaults(EmbeddingCapability::loaded(embedder.clone()));
        (embedder, engine)
    }

    #[test]
    fn test_empty_job_description_short_circuits() {
        let (embedder, engine) = counting_engine();
        for jd in ["", "   "] {
            let result = engine.score_resume("Rust developer", jd);
            assert_eq!(result.score, 0);
            assert_eq!(result.outcome, ScoreOutcome::MissingJobDescription);
            assert!(result.feedback.contains("provide a job description"));
        }
        assert_eq!(embedder.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_empty_job_description_wins_over_missing_model() {
        let engine = AtsEngine::with_defaults(EmbeddingCapability::unavailable("offline"));
        let result = engine.score_resume("anything", "");
        assert_eq!(result.outcome, ScoreOutcome::MissingJobDescription);
    }

    #[test]
    fn test_unavailable_model_always_zero() {
        let engine = AtsEngine::with_defaults(EmbeddingCapability::unavailable("offline"));
        for (resume, jd) in [("Rust", "Rust async engineer"), ("", "COBOL mainframe")] {
            let result = engine.score_resume(resume, jd);
            assert_eq!(result.score, 0);
            assert_eq!(result.outcome, ScoreOutcome::ModelUnavailable);
            assert!(result.feedback.contains("model not loaded"));
        }
    }

    #[test]
    fn test_no_skills_extracted() {
        let (_, engine) = counting_engine();
        let result = engine.score_resume("Rust developer", "and the with of 4");
        assert_eq!(result.score, 0);
        assert_eq!(result.outcome, ScoreOutcome::NoSkillsExtracted);
        assert!(result.feedback.contains("Could not extract skills"));
    }

    #[test]
    fn test_short_circuits_surface_as_empty_input() {
        let (embedder, engine) = counting_engine();

        let blank = engine.run("Rust developer", " \n\t").unwrap_err();
        assert!(matches!(blank, ResumeAtsError::EmptyInput(ref what) if what.contains("job description")));
        assert_eq!(embedder.calls.load(Ordering::Relaxed), 0);

        let no_phrases = engine.run("Rust developer", "and the with of").unwrap_err();
        assert!(matches!(no_phrases, ResumeAtsError::EmptyInput(ref what) if what.contains("key phrases")));

        let unavailable = AtsEngine::with_defaults(EmbeddingCapability::unavailable("offline"));
        assert!(unavailable.run("Rust", "Rust engineer").unwrap_err().is_model_unavailable());
    }

    #[test]
    fn test_computation_failure_is_degraded() {
        let engine = AtsEngine::with_defaults(EmbeddingCapability::loaded(Arc::new(FailingEmbedder)));
        let result = engine.score_resume("Rust", "Rust async engineer");
        assert_eq!(result.score, 0);
        assert_eq!(result.outcome, ScoreOutcome::ComputationFailed);
        assert!(result.feedback.contains("out of memory"));
    }

    #[test]
    fn test_scored_analysis_partitions_candidates() {
        let (_, engine) = counting_engine();
        let jd = "Rust engineer for async services. COBOL migration.";
        let analysis = engine.analyze("Five years of Rust and async networking", jd);
        let candidates = engine.extract_key_phrases(jd).unwrap();

        let result = &analysis.result;
        assert_eq!(result.outcome, ScoreOutcome::Scored);
        assert_eq!(result.total_skills(), candidates.len());
        assert_eq!(analysis.assessments.len(), candidates.len());
        assert!(result.missing_skills.iter().any(|s| s.contains("cobol")));
        assert!(result.matched_skills.contains(&"rust".to_string()));
        assert_eq!(
            result.score as usize,
            100 * result.matched_skills.len() / candidates.len()
        );
    }

    #[test]
    fn test_config_threshold_is_used() {
        let mut config = Config::default();
        config.matching.similarity_threshold = 0.9;
        let engine = AtsEngine::new(EmbeddingCapability::unavailable("offline"), &config);
        assert_eq!(engine.threshold(), 0.9);
    }

    #[tokio::test]
    async fn test_timeout_reports_model_unavailable() {
        let engine = Arc::new(AtsEngine::with_defaults(EmbeddingCapability::loaded(Arc::new(SlowEmbedder))));
        let analysis = engine
            .analyze_with_timeout(
                "Rust".to_string(),
                "Rust engineer".to_string(),
                Duration::from_millis(50),
            )
            .await;

        assert_eq!(analysis.result.score, 0);
        assert_eq!(analysis.result.outcome, ScoreOutcome::ModelUnavailable);
        assert!(analysis.result.feedback.contains("timed out"));
    }

    #[tokio::test]
    async fn test_timeout_passes_through_fast_results() {
        let (_, engine) = counting_engine();
        let analysis = Arc::new(engine)
            .analyze_with_timeout(
                "Rust".to_string(),
                String::new(),
                Duration::from_secs(5),
            )
            .await;
        assert_eq!(analysis.result.outcome, ScoreOutcome::MissingJobDescription);
    }
}
