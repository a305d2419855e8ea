//! Shared text embedding capability backed by Model2Vec

use crate::config::Config;
use crate::error::{Result, ResumeAtsError};
use log::{debug, info, warn};
use model2vec_rs::model::StaticModel;
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Maps text to a fixed-length vector. Must be deterministic and free of
/// per-call mutable state so one instance can serve concurrent callers.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn model_name(&self) -> &str {
        "custom"
    }
}

/// Cosine similarity in [-1, 1]. Zero-magnitude vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(ResumeAtsError::Computation(format!(
            "Embedding dimensions don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let score = dot_product / (norm_a * norm_b);
    if score.is_nan() {
        return Err(ResumeAtsError::Computation("Cosine similarity is NaN".to_string()));
    }
    Ok(score)
}

/// Model2Vec static embedding model
pub struct StaticEmbedder {
    model: StaticModel,
    model_name: String,
    max_tokens: usize,
    batch_size: usize,
}

impl StaticEmbedder {
    pub fn new(model: StaticModel, model_name: impl Into<String>, config: &Config) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            max_tokens: config.processing.max_tokens,
            batch_size: config.processing.batch_size.max(1),
        }
    }

    /// Load a model by catalog name, local path or Hugging Face repo id
    pub fn load(model: &str, config: &Config) -> Result<Self> {
        let start_time = Instant::now();
        let source = Self::resolve_source(model, config);
        info!("Loading Model2Vec embedding model from: {}", source.display());

        let static_model = StaticModel::from_pretrained(&source, None, None, None)?;

        info!("Model loaded successfully in {:.2?}", start_time.elapsed());
        Ok(Self::new(static_model, model, config))
    }

    fn resolve_source(model: &str, config: &Config) -> PathBuf {
        let local_path = config.models_dir().join(model);
        if local_path.exists() {
            return local_path;
        }

        let direct = Path::new(model);
        if direct.exists() {
            return direct.to_path_buf();
        }

        // Not on disk: hand the repo id to the hub loader
        match config.get_model_by_name(model) {
            Some(entry) => PathBuf::from(&entry.repo_id),
            None => PathBuf::from(model),
        }
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // model2vec panics on tokenizer failures instead of returning an error
        catch_unwind(AssertUnwindSafe(|| {
            self.model.encode_with_args(texts, Some(self.max_tokens), self.batch_size)
        }))
        .map_err(|_| ResumeAtsError::Computation("Embedding model panicked while encoding".to_string()))
    }
}

impl Embedder for StaticEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| ResumeAtsError::Computation("Model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.encode(texts)?;
        if embeddings.len() != texts.len() {
            return Err(ResumeAtsError::Computation(format!(
                "Model returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub cache_size: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Memoizes embeddings by exact text, evicting the least recently used
/// entry once `capacity` texts are held
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().map(|c| c.cap().get()).unwrap_or(0)
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache_size = self.cache.lock().map(|c| c.len()).unwrap_or(0);
        CacheStats {
            cache_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, LruCache<String, Vec<f32>>>> {
        self.cache
            .lock()
            .map_err(|_| ResumeAtsError::Computation("Embedding cache lock poisoned".to_string()))
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.lock_cache()?.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        let embedding = self.inner.embed(text)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.lock_cache()?.put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        {
            let mut cache = self.lock_cache()?;
            for (i, text) in texts.iter().enumerate() {
                match cache.get(text) {
                    Some(embedding) => results.push(Some(embedding.clone())),
                    None => {
                        results.push(None);
                        uncached_texts.push(text.clone());
                        uncached_indices.push(i);
                    }
                }
            }
        }

        self.hits.fetch_add(texts.len() - uncached_texts.len(), Ordering::Relaxed);

        if !uncached_texts.is_empty() {
            let embeddings = self.inner.embed_batch(&uncached_texts)?;
            if embeddings.len() != uncached_texts.len() {
                return Err(ResumeAtsError::Computation(format!(
                    "Embedder returned {} embeddings for {} texts",
                    embeddings.len(),
                    uncached_texts.len()
                )));
            }
            self.misses.fetch_add(uncached_texts.len(), Ordering::Relaxed);

            let mut cache = self.lock_cache()?;
            for ((index, text), embedding) in uncached_indices.into_iter().zip(uncached_texts).zip(embeddings) {
                cache.put(text, embedding.clone());
                results[index] = Some(embedding);
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| ResumeAtsError::Computation("Missing embedding in batch".to_string())))
            .collect()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Outcome of loading the embedding model once at startup.
///
/// Cloned into every component that needs embeddings. An unavailable
/// capability stays unavailable; nothing retries the load.
#[derive(Clone)]
pub enum EmbeddingCapability {
    Loaded(Arc<dyn Embedder>),
    Unavailable { reason: String },
}

impl EmbeddingCapability {
    /// Load the configured default model
    pub fn load(config: &Config) -> Self {
        Self::load_model(&config.models.default_embedding_model, config)
    }

    pub fn load_model(model: &str, config: &Config) -> Self {
        match StaticEmbedder::load(model, config) {
            Ok(embedder) => match NonZeroUsize::new(config.processing.cache_capacity) {
                Some(capacity) if config.processing.enable_caching => {
                    debug!("Embedding cache enabled, capacity {}", capacity);
                    Self::Loaded(Arc::new(CachedEmbedder::new(embedder, capacity)))
                }
                _ => Self::Loaded(Arc::new(embedder)),
            },
            Err(e) => {
                warn!("Embedding model '{}' unavailable: {}", model, e);
                Self::Unavailable { reason: e.to_string() }
            }
        }
    }

    pub fn loaded(embedder: Arc<dyn Embedder>) -> Self {
        Self::Loaded(embedder)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn embedder(&self) -> Result<&Arc<dyn Embedder>> {
        match self {
            Self::Loaded(embedder) => Ok(embedder),
            Self::Unavailable { reason } => Err(ResumeAtsError::ModelUnavailable(reason.clone())),
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Loaded(embedder) => Some(embedder.model_name()),
            Self::Unavailable { .. } => None,
        }
    }
}

impl fmt::Debug for EmbeddingCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(embedder) => f.debug_tuple("Loaded").field(&embedder.model_name()).finish(),
            Self::Unavailable { reason } => f.debug_struct("Unavailable").field("reason", reason).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Needed so `Result<Arc<dyn Embedder>, _>::unwrap_err` compiles in tests
    impl fmt::Debug for dyn Embedder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("dyn Embedder")
        }
    }

    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for LengthEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, ResumeAtsError::Computation(_)));
    }

    #[test]
    fn test_cached_embedder_hits() {
        let cached = CachedEmbedder::new(LengthEmbedder { calls: AtomicUsize::new(0) }, NonZeroUsize::new(16).unwrap());

        let first = cached.embed("rust").unwrap();
        let second = cached.embed("rust").unwrap();
        assert_eq!(first, second);

        let batch = cached
            .embed_batch(&["rust".to_string(), "python".to_string(), "rust".to_string()])
            .unwrap();
        assert_eq!(batch[0], vec![4.0, 1.0]);
        assert_eq!(batch[1], vec![6.0, 1.0]);
        assert_eq!(batch[2], vec![4.0, 1.0]);

        let stats = cached.cache_stats();
        assert_eq!(stats.cache_size, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 3);
        assert_eq!(cached.inner.calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_cached_embedder_stays_within_capacity() {
        let capacity = NonZeroUsize::new(8).unwrap();
        let cached = CachedEmbedder::new(LengthEmbedder { calls: AtomicUsize::new(0) }, capacity);

        for i in 0..100 {
            cached.embed(&format!("resume text {}", i)).unwrap();
        }
        let batch: Vec<String> = (0..50).map(|i| format!("phrase {}", i)).collect();
        cached.embed_batch(&batch).unwrap();

        let stats = cached.cache_stats();
        assert_eq!(cached.capacity(), 8);
        assert!(stats.cache_size <= 8);
        assert_eq!(stats.misses, 150);

        // Most recent entries survive, the oldest were evicted
        cached.embed("phrase 49").unwrap();
        cached.embed("resume text 0").unwrap();
        let stats = cached.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 151);
        assert!(stats.cache_size <= 8);
    }

    #[test]
    fn test_unavailable_capability() {
        let capability = EmbeddingCapability::unavailable("no model files");
        assert!(!capability.is_available());
        assert!(capability.model_name().is_none());
        assert!(capability.embedder().unwrap_err().is_model_unavailable());
    }

    #[test]
    fn test_load_missing_local_model_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("broken-model");
        std::fs::create_dir_all(&model_dir).unwrap();

        let mut config = Config::default();
        config.models.models_dir = dir.path().to_path_buf();

        let capability = EmbeddingCapability::load_model("broken-model", &config);
        assert!(!capability.is_available());
    }
}
