//! Report structure for ATS scoring results

use crate::processing::analyzer::AtsAnalysis;
use crate::processing::ats_matcher::{MatchResult, PhraseAssessment, ScoreOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a formatter needs to render one scoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub result: MatchResult,

    /// Per-phrase detail in extraction order
    pub assessments: Vec<PhraseAssessment>,

    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,

    /// Version of the scorer used
    pub scorer_version: String,

    /// `None` when no model was loaded
    pub embedding_model: Option<String>,

    pub threshold: f32,
    pub resume_path: String,
    pub job_path: String,
    pub processing_time_ms: u64,
}

/// Coarse rating shown next to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=100 => ScoreBand::Excellent,
            60..=79 => ScoreBand::Good,
            40..=59 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "EXCELLENT",
            ScoreBand::Good => "GOOD",
            ScoreBand::Fair => "FAIR",
            ScoreBand::Poor => "POOR",
        }
    }
}

impl ScoreReport {
    pub fn from_analysis(
        analysis: AtsAnalysis,
        embedding_model: Option<String>,
        threshold: f32,
        resume_path: impl Into<String>,
        job_path: impl Into<String>,
    ) -> Self {
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            scorer_version: env!("CARGO_PKG_VERSION").to_string(),
            embedding_model,
            threshold,
            resume_path: resume_path.into(),
            job_path: job_path.into(),
            processing_time_ms: analysis.processing_time_ms,
        };

        Self {
            result: analysis.result,
            assessments: analysis.assessments,
            metadata,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.result.outcome == ScoreOutcome::Scored
    }

    /// Band for scored reports only; degraded results carry no rating
    pub fn band(&self) -> Option<ScoreBand> {
        self.is_scored().then(|| ScoreBand::from_score(self.result.score))
    }

    /// Missing phrases, most relevant first
    pub fn top_gaps(&self, limit: usize) -> Vec<&PhraseAssessment> {
        let mut gaps: Vec<&PhraseAssessment> = self.assessments.iter().filter(|a| !a.matched).collect();
        gaps.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        gaps.truncate(limit);
        gaps
    }
}
