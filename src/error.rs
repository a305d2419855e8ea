//! Error handling for resume ATS scoring

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeAtsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

pub type Result<T> = std::result::Result<T, ResumeAtsError>;

/// Model2Vec reports load failures as anyhow errors
impl From<anyhow::Error> for ResumeAtsError {
    fn from(err: anyhow::Error) -> Self {
        ResumeAtsError::ModelLoading(format!("{:#}", err))
    }
}

impl ResumeAtsError {
    /// Whether this error means the embedding capability cannot be used at all
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, ResumeAtsError::ModelUnavailable(_))
    }
}
