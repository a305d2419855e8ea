//! Resume ATS scoring library

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{Result, ResumeAtsError};
pub use processing::analyzer::AtsEngine;
pub use processing::ats_matcher::{MatchResult, SIMILARITY_THRESHOLD};
pub use processing::embeddings::{Embedder, EmbeddingCapability};
