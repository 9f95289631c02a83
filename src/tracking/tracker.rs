use std::path::PathBuf;

use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::compare::ComparisonResults;
use crate::core::errors::ApiError;

/// SQLite-backed experiment tracker.
///
/// Each tracked request becomes one row: a timestamped run name, the request
/// parameters, and per-model plus aggregate metrics as JSON.
#[derive(Clone)]
pub struct ExperimentTracker {
    pool: SqlitePool,
    experiment: String,
}

impl ExperimentTracker {
    pub async fn new(db_path: PathBuf, experiment: String) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let tracker = Self { pool, experiment };
        tracker.init_schema().await?;
        Ok(tracker)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                run_name TEXT NOT NULL,
                experiment TEXT NOT NULL,
                params TEXT NOT NULL,
                metrics TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Persists one run for a finished comparison. Returns the run id.
    pub async fn log_run(
        &self,
        question: &str,
        k: usize,
        parallel: bool,
        results: &ComparisonResults,
        total_time: f64,
    ) -> Result<String, ApiError> {
        let run_id = Uuid::new_v4().to_string();
        let run_name = new_run_name();

        let params = json!({
            "question": question,
            "num_sources": k,
            "num_models": results.len(),
            "parallel_execution": parallel,
        });
        let metrics = build_metrics(results, total_time);

        sqlx::query(
            "INSERT INTO runs (run_id, run_name, experiment, params, metrics)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&run_id)
        .bind(&run_name)
        .bind(&self.experiment)
        .bind(params.to_string())
        .bind(metrics.to_string())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        tracing::info!("Logged run {} ({})", run_name, run_id);
        Ok(run_id)
    }

    /// Fetches a run's params and metrics by id.
    pub async fn get_run(&self, run_id: &str) -> Result<Option<(Value, Value)>, ApiError> {
        let row = sqlx::query("SELECT params, metrics FROM runs WHERE run_id = ?1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let params: String = row.get("params");
        let metrics: String = row.get("metrics");
        let params = serde_json::from_str(&params).map_err(ApiError::internal)?;
        let metrics = serde_json::from_str(&metrics).map_err(ApiError::internal)?;
        Ok(Some((params, metrics)))
    }

    pub async fn run_count(&self) -> Result<usize, ApiError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM runs")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }
}

fn new_run_name() -> String {
    format!("query_{}", Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Metric keys embed the model id; `:` and `.` are not valid there.
fn sanitize_model_id(model: &str) -> String {
    model.replace([':', '.'], "_")
}

fn build_metrics(results: &ComparisonResults, total_time: f64) -> Value {
    let mut metrics = Map::new();
    metrics.insert("total_execution_time".to_string(), json!(total_time));

    let times: Vec<f64> = results
        .iter()
        .filter(|r| r.time > 0.0)
        .map(|r| r.time)
        .collect();
    if !times.is_empty() {
        let sum: f64 = times.iter().sum();
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        metrics.insert(
            "avg_response_time".to_string(),
            json!(sum / times.len() as f64),
        );
        metrics.insert("min_response_time".to_string(), json!(min));
        metrics.insert("max_response_time".to_string(), json!(max));
    }

    for result in results.iter() {
        let key = sanitize_model_id(&result.model);
        metrics.insert(format!("{}_response_time", key), json!(result.time));
        metrics.insert(
            format!("{}_tokens_per_sec", key),
            json!(result.metrics.tokens_per_second),
        );
        metrics.insert(
            format!("{}_word_count", key),
            json!(result.metrics.word_count),
        );
        metrics.insert(
            format!("{}_response_length", key),
            json!(result.metrics.response_length),
        );
    }

    Value::Object(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::ModelResult;

    fn sample_results() -> ComparisonResults {
        ComparisonResults::new(vec![
            ModelResult::from_answer("qwen2.5:7b", "four words right here".to_string(), 2.0, vec![]),
            ModelResult::failure("phi3:mini", "model not found"),
        ])
    }

    #[test]
    fn run_names_are_timestamped() {
        let name = new_run_name();
        assert!(name.starts_with("query_"));
        // query_YYYYmmdd_HHMMSS
        assert_eq!(name.len(), "query_".len() + 15);
    }

    #[test]
    fn model_ids_are_sanitized_for_metric_keys() {
        assert_eq!(sanitize_model_id("qwen2.5:7b"), "qwen2_5_7b");
        assert_eq!(sanitize_model_id("phi3:mini"), "phi3_mini");
    }

    #[test]
    fn metrics_skip_aggregates_over_failed_models() {
        let metrics = build_metrics(&sample_results(), 2.5);
        assert_eq!(metrics["total_execution_time"], json!(2.5));
        // Only the succeeding model contributes to the aggregates.
        assert_eq!(metrics["avg_response_time"], json!(2.0));
        assert_eq!(metrics["min_response_time"], json!(2.0));
        assert_eq!(metrics["max_response_time"], json!(2.0));
        assert_eq!(metrics["qwen2_5_7b_word_count"], json!(4));
        assert_eq!(metrics["phi3_mini_response_time"], json!(0.0));
    }

    #[tokio::test]
    async fn runs_persist_and_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tracker = ExperimentTracker::new(dir.path().join("runs.db"), "test-exp".to_string())
            .await
            .expect("tracker opens");

        let run_id = tracker
            .log_run("What is RAG?", 3, true, &sample_results(), 2.5)
            .await
            .expect("log works");

        assert_eq!(tracker.run_count().await.expect("count works"), 1);

        let (params, metrics) = tracker
            .get_run(&run_id)
            .await
            .expect("get works")
            .expect("run exists");
        assert_eq!(params["question"], json!("What is RAG?"));
        assert_eq!(params["num_models"], json!(2));
        assert_eq!(params["parallel_execution"], json!(true));
        assert_eq!(metrics["total_execution_time"], json!(2.5));
    }
}
