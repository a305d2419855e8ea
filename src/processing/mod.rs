//! Keyphrase extraction, embeddings and ATS scoring

pub mod text_processor;
pub mod embeddings;
pub mod embedding_manager;
pub mod keyphrase;
pub mod ats_matcher;
pub mod analyzer;
