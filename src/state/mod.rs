use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, Settings};
use crate::core::metrics::QueryMetrics;
use crate::llm::{LlmProvider, OllamaProvider};
use crate::rag::{RagEngine, SqliteRagStore};
use crate::tracking::ExperimentTracker;

/// Global application state shared across all routes.
///
/// Created once at startup, read-only thereafter:
/// - configuration and paths
/// - the pre-built retrieval engine (index + embedding provider)
/// - the inference provider
/// - the metrics registry and experiment tracker
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub provider: Arc<dyn LlmProvider>,
    pub rag: RagEngine,
    pub tracker: ExperimentTracker,
    pub metrics: Arc<QueryMetrics>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Resolve paths and load settings.
    /// 2. Open the retrieval index and tracking store.
    /// 3. If the index is empty and a corpus dir is configured, ingest it.
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths)?;

        let provider: Arc<dyn LlmProvider> =
            Arc::new(OllamaProvider::new(settings.models.ollama_url.clone()));

        let store = Arc::new(SqliteRagStore::new(paths.index_db_path.clone()).await?);
        let rag = RagEngine::new(
            store,
            provider.clone(),
            settings.models.embedding_model.clone(),
            &settings.retrieval,
        );

        let existing = rag.chunk_count().await?;
        if existing == 0 {
            if let Some(corpus_dir) = settings.retrieval.corpus_dir.as_deref() {
                if corpus_dir.is_dir() {
                    rag.ingest_dir(corpus_dir).await?;
                } else {
                    tracing::warn!(
                        "Configured corpus dir {} does not exist; index stays empty",
                        corpus_dir.display()
                    );
                }
            }
        }

        let tracker = ExperimentTracker::new(
            paths.tracking_db_path.clone(),
            settings.tracking.experiment.clone(),
        )
        .await?;

        let metrics = Arc::new(QueryMetrics::new());
        let started_at = Utc::now();

        Ok(Arc::new(AppState {
            paths,
            settings,
            provider,
            rag,
            tracker,
            metrics,
            started_at,
        }))
    }
}
