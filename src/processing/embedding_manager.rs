//! Download and bookkeeping for local Model2Vec embedding models

use crate::config::AvailableModel;
use crate::error::{Result, ResumeAtsError};
use hf_hub::api::tokio::Api;
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Files `StaticModel::from_pretrained` needs in a local model directory
pub const REQUIRED_MODEL_FILES: [&str; 3] = ["tokenizer.json", "model.safetensors", "config.json"];

const OPTIONAL_MODEL_FILES: [&str; 1] = ["README.md"];

pub struct EmbeddingModelManager {
    models_dir: PathBuf,
    catalog: Vec<AvailableModel>,
    downloaded_models: BTreeSet<String>,
}

impl EmbeddingModelManager {
    /// Create the models directory if needed and scan what is already there
    pub async fn new(models_dir: PathBuf, catalog: Vec<AvailableModel>) -> Result<Self> {
        fs::create_dir_all(&models_dir).await.map_err(|e| {
            ResumeAtsError::ModelError(format!("Failed to create models directory: {}", e))
        })?;

        let mut manager = Self {
            models_dir,
            catalog,
            downloaded_models: BTreeSet::new(),
        };
        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    async fn scan_downloaded_models(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(&self.models_dir).await.map_err(|e| {
            ResumeAtsError::ModelError(format!("Failed to scan models directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() && is_valid_model_dir(&entry.path()).await {
                self.downloaded_models.insert(entry.file_name().to_string_lossy().to_string());
            }
        }

        Ok(())
    }

    /// Download a catalog model from the Hugging Face Hub into the models directory
    pub async fn download_model(&mut self, model_id: &str, force: bool) -> Result<PathBuf> {
        let model_id = self
            .resolve_model_id(model_id)
            .ok_or_else(|| ResumeAtsError::ModelNotFound(model_id.to_string()))?;
        let model_dir = self.models_dir.join(&model_id);

        if !force && self.downloaded_models.contains(&model_id) {
            return Ok(model_dir);
        }

        let repo_id = self
            .get_model_info(&model_id)
            .map(|m| m.repo_id.clone())
            .ok_or_else(|| ResumeAtsError::ModelNotFound(model_id.clone()))?;

        info!("Downloading embedding model {} from {}", model_id, repo_id);
        fs::create_dir_all(&model_dir).await?;

        let api = Api::new()
            .map_err(|e| ResumeAtsError::ModelError(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.repo(hf_hub::Repo::model(repo_id));

        for file in REQUIRED_MODEL_FILES.iter().chain(OPTIONAL_MODEL_FILES.iter()) {
            match repo.get(file).await {
                Ok(cached_path) => {
                    fs::copy(&cached_path, model_dir.join(file)).await.map_err(|e| {
                        ResumeAtsError::ModelError(format!("Failed to copy {}: {}", file, e))
                    })?;
                    info!("Downloaded {}", file);
                }
                Err(e) if OPTIONAL_MODEL_FILES.contains(file) => {
                    warn!("Optional file {} not found: {}", file, e);
                }
                Err(e) => {
                    return Err(ResumeAtsError::ModelError(format!(
                        "Failed to download required file {}: {}",
                        file, e
                    )));
                }
            }
        }

        self.downloaded_models.insert(model_id);
        Ok(model_dir)
    }

    pub async fn remove_model(&mut self, model_id: &str) -> Result<bool> {
        let model_id = self.resolve_model_id(model_id).unwrap_or_else(|| model_id.to_string());
        if !self.downloaded_models.remove(&model_id) {
            return Ok(false);
        }
        fs::remove_dir_all(self.models_dir.join(&model_id)).await?;
        Ok(true)
    }

    pub fn get_model_path(&self, model_id: &str) -> Option<PathBuf> {
        self.downloaded_models
            .contains(model_id)
            .then(|| self.models_dir.join(model_id))
    }

    pub fn list_available_models(&self) -> &[AvailableModel] {
        &self.catalog
    }

    pub fn list_downloaded_models(&self) -> Vec<String> {
        self.downloaded_models.iter().cloned().collect()
    }

    pub fn is_model_downloaded(&self, model_id: &str) -> bool {
        self.downloaded_models.contains(model_id)
    }

    pub fn get_model_info(&self, model_id: &str) -> Option<&AvailableModel> {
        self.catalog.iter().find(|m| m.name == model_id)
    }

    /// Accept a catalog name, a repo id or a case-insensitive name
    pub fn resolve_model_id(&self, input: &str) -> Option<String> {
        let input_lower = input.to_lowercase();
        self.catalog
            .iter()
            .find(|m| m.name == input)
            .or_else(|| self.catalog.iter().find(|m| m.repo_id == input))
            .or_else(|| self.catalog.iter().find(|m| m.name.to_lowercase() == input_lower))
            .map(|m| m.name.clone())
    }
}

async fn is_valid_model_dir(path: &Path) -> bool {
    for file in REQUIRED_MODEL_FILES {
        if fs::metadata(path.join(file)).await.is_err() {
            return false;
        }
    }
    true
}
