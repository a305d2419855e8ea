//! Resume and job description loading
//! Detects the document format and extracts plain text

pub mod file_detector;
pub mod text_extractor;
pub mod manager;
