//! Plain-text extraction from PDF, Markdown and text documents

use crate::error::{Result, ResumeAtsError};
use pulldown_cmark::{Event, Parser, Tag};
use std::path::Path;
use tokio::fs;

pub trait TextExtractor {
    fn extract(&self, path: &Path) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract text from an uploaded PDF held in memory
    pub fn extract_bytes(bytes: &[u8]) -> Result<String> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ResumeAtsError::PdfExtraction(format!("Failed to extract text from PDF: {}", e)))
    }
}

impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).await?;
        Self::extract_bytes(&bytes).map_err(|e| {
            ResumeAtsError::PdfExtraction(format!("{} ('{}')", e, path.display()))
        })
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path).await?)
    }
}

pub struct MarkdownExtractor;

impl MarkdownExtractor {
    /// Keep text and code spans, turning block ends into line breaks
    pub fn markdown_to_text(markdown: &str) -> String {
        let mut text = String::with_capacity(markdown.len());

        for event in Parser::new(markdown) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                Event::End(Tag::Paragraph)
                | Event::End(Tag::Heading(..))
                | Event::End(Tag::Item)
                | Event::End(Tag::CodeBlock(_)) => text.push('\n'),
                _ => {}
            }
        }

        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TextExtractor for MarkdownExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let markdown = fs::read_to_string(path).await?;
        Ok(Self::markdown_to_text(&markdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_text_strips_formatting() {
        let markdown = "# Jane Roe\n\n## Skills\n\n- **Rust** and `tokio`\n- SQL\n\nBuilt [services](https://example.com).";
        let text = MarkdownExtractor::markdown_to_text(markdown);

        assert_eq!(text, "Jane Roe\nSkills\nRust and tokio\nSQL\nBuilt services.");
    }

    #[test]
    fn test_invalid_pdf_bytes() {
        let err = PdfExtractor::extract_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, ResumeAtsError::PdfExtraction(_)));
    }
}
