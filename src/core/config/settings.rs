use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::errors::ApiError;

/// Typed service configuration, loaded from `rag-arena.toml` when present.
///
/// Every field has a default so a missing or partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub models: ModelSettings,
    pub retrieval: RetrievalSettings,
    pub tracking: TrackingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of the local Ollama daemon.
    pub ollama_url: String,
    /// Models queried when a request does not name a subset.
    pub compare: Vec<String>,
    /// Model used to embed chunks and questions.
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Directory of `.txt` files to ingest when the index is empty.
    pub corpus_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    pub experiment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            models: ModelSettings::default(),
            retrieval: RetrievalSettings::default(),
            tracking: TrackingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            ollama_url: "http://127.0.0.1:11434".to_string(),
            compare: vec![
                "qwen2.5:7b".to_string(),
                "codellama:7b-instruct".to_string(),
                "deepseek-r1:7b".to_string(),
                "phi3:mini".to_string(),
            ],
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            corpus_dir: None,
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            experiment: "rag-api-queries".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the configured TOML file, then applies env
    /// overrides (`OLLAMA_URL`, `RAG_ARENA_CORPUS_DIR`).
    pub fn load(paths: &AppPaths) -> Result<Self, ApiError> {
        let mut settings = if paths.settings_path.exists() {
            let raw = fs::read_to_string(&paths.settings_path).map_err(ApiError::internal)?;
            toml::from_str(&raw).map_err(|err| {
                ApiError::Internal(format!(
                    "Invalid settings file {}: {}",
                    paths.settings_path.display(),
                    err
                ))
            })?
        } else {
            Settings::default()
        };

        if let Ok(url) = env::var("OLLAMA_URL") {
            settings.models.ollama_url = url;
        }
        if let Ok(dir) = env::var("RAG_ARENA_CORPUS_DIR") {
            settings.retrieval.corpus_dir = Some(PathBuf::from(dir));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.retrieval.chunk_size, 500);
        assert_eq!(settings.retrieval.chunk_overlap, 50);
        assert_eq!(settings.models.compare.len(), 4);
        assert_eq!(settings.models.embedding_model, "nomic-embed-text");
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            chunk_size = 800
            "#,
        )
        .expect("partial settings should parse");

        assert_eq!(settings.retrieval.chunk_size, 800);
        assert_eq!(settings.retrieval.chunk_overlap, 50);
        assert_eq!(settings.server.host, "127.0.0.1");
    }
}
