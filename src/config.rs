//! Configuration management for resume ATS scoring

use crate::error::{Result, ResumeAtsError};
use crate::processing::ats_matcher::SIMILARITY_THRESHOLD;
use crate::processing::keyphrase::{DEFAULT_DIVERSITY, DEFAULT_TOP_N, MAX_NGRAM, MIN_NGRAM};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub processing: ProcessingConfig,
    pub extraction: ExtractionConfig,
    pub matching: MatchingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    pub default_embedding_model: String,
    pub available_models: Vec<AvailableModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub repo_id: String,
    pub size_mb: u64,
    pub dimensions: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Tokens kept per text before mean pooling
    pub max_tokens: usize,
    pub batch_size: usize,
    pub enable_caching: bool,
    /// Most embeddings the cache holds before evicting the least recently used
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub min_ngram: usize,
    pub max_ngram: usize,
    pub top_n: usize,
    /// 0.0 ranks purely by relevance, 1.0 purely by novelty
    pub diversity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub similarity_threshold: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub detailed: bool,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".resume-ats")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                default_embedding_model: "potion-base-8M".to_string(),
                available_models: vec![
                    AvailableModel {
                        name: "potion-base-8M".to_string(),
                        repo_id: "minishlab/potion-base-8M".to_string(),
                        size_mb: 33,
                        dimensions: 256,
                        description: "Small, fast Model2Vec model; the recommended default".to_string(),
                    },
                    AvailableModel {
                        name: "potion-base-32M".to_string(),
                        repo_id: "minishlab/potion-base-32M".to_string(),
                        size_mb: 130,
                        dimensions: 512,
                        description: "Larger Potion model with better phrase similarity".to_string(),
                    },
                    AvailableModel {
                        name: "m2v-base".to_string(),
                        repo_id: "minishlab/M2V_base_output".to_string(),
                        size_mb: 90,
                        dimensions: 256,
                        description: "Legacy Model2Vec base embeddings".to_string(),
                    },
                ],
            },
            processing: ProcessingConfig {
                max_tokens: 512,
                batch_size: 64,
                enable_caching: true,
                cache_capacity: default_cache_capacity(),
            },
            extraction: ExtractionConfig {
                min_ngram: MIN_NGRAM,
                max_ngram: MAX_NGRAM,
                top_n: DEFAULT_TOP_N,
                diversity: DEFAULT_DIVERSITY,
            },
            matching: MatchingConfig {
                similarity_threshold: SIMILARITY_THRESHOLD,
                timeout_secs: 30,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                detailed: false,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ResumeAtsError::Configuration(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ResumeAtsError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-ats")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        let ex = &self.extraction;
        if ex.min_ngram == 0 || ex.min_ngram > ex.max_ngram {
            return Err(ResumeAtsError::Configuration(format!(
                "Invalid n-gram range: {}..={}",
                ex.min_ngram, ex.max_ngram
            )));
        }
        if ex.top_n == 0 {
            return Err(ResumeAtsError::Configuration("extraction.top_n must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&ex.diversity) {
            return Err(ResumeAtsError::Configuration(format!(
                "extraction.diversity must be within 0.0..=1.0, got {}",
                ex.diversity
            )));
        }
        if !(-1.0..=1.0).contains(&self.matching.similarity_threshold) {
            return Err(ResumeAtsError::Configuration(format!(
                "matching.similarity_threshold must be a cosine value, got {}",
                self.matching.similarity_threshold
            )));
        }
        if self.processing.batch_size == 0 {
            return Err(ResumeAtsError::Configuration("processing.batch_size must be at least 1".to_string()));
        }
        if self.processing.enable_caching && self.processing.cache_capacity == 0 {
            return Err(ResumeAtsError::Configuration(
                "processing.cache_capacity must be at least 1 when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn get_model_by_name(&self, name: &str) -> Option<&AvailableModel> {
        self.models.available_models.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_calibrated() {
        let config = Config::default();
        assert_eq!(config.matching.similarity_threshold, 0.4);
        assert_eq!(config.extraction.top_n, 15);
        assert_eq!((config.extraction.min_ngram, config.extraction.max_ngram), (1, 3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_writes_defaults_then_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let second = Config::load_from(&path).unwrap();
        assert_eq!(first.models.default_embedding_model, second.models.default_embedding_model);
        assert_eq!(second.output.format, OutputFormat::Console);
    }

    #[test]
    fn test_invalid_ngram_range_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.extraction.min_ngram = 4;
        config.save_to(&path).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ResumeAtsError::Configuration(_)));
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let mut config = Config::default();
        config.processing.cache_capacity = 0;
        assert!(matches!(config.validate(), Err(ResumeAtsError::Configuration(_))));

        config.processing.enable_caching = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_model_by_name() {
        let config = Config::default();
        let model = config.get_model_by_name("potion-base-8M").unwrap();
        assert_eq!(model.repo_id, "minishlab/potion-base-8M");
        assert!(config.get_model_by_name("nope").is_none());
    }
}
