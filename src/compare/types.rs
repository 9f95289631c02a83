use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Derived metrics for one model's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetrics {
    pub response_length: usize,
    pub word_count: usize,
    pub tokens_per_second: f64,
}

/// One model's answer to one question. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: String,
    pub answer: String,
    /// Wall-clock seconds, rounded to 2 decimals. 0 on failure.
    pub time: f64,
    /// Retrieved chunk excerpts, each truncated to 200 characters.
    pub sources: Vec<String>,
    pub metrics: ResultMetrics,
}

impl ModelResult {
    /// Builds a successful result from a raw answer and its elapsed time.
    pub fn from_answer(
        model: impl Into<String>,
        answer: String,
        elapsed_secs: f64,
        sources: Vec<String>,
    ) -> Self {
        let word_count = answer.split_whitespace().count();
        let response_length = answer.chars().count();
        let tokens_per_second = if elapsed_secs > 0.0 {
            round2(word_count as f64 / elapsed_secs)
        } else {
            0.0
        };

        Self {
            model: model.into(),
            answer,
            time: round2(elapsed_secs),
            sources,
            metrics: ResultMetrics {
                response_length,
                word_count,
                tokens_per_second,
            },
        }
    }

    /// Degraded result for a model whose call failed. The batch carries on.
    pub fn failure(model: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self {
            model: model.into(),
            answer: format!("Error: {}", err),
            time: 0.0,
            sources: Vec::new(),
            metrics: ResultMetrics {
                response_length: 0,
                word_count: 0,
                tokens_per_second: 0.0,
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        self.time == 0.0 && self.answer.starts_with("Error:")
    }
}

/// Result set of one comparison batch.
///
/// Holds results in caller model-list order and serializes as a JSON object
/// keyed by model id in exactly that order (serde_json's default map type
/// would re-sort the keys, so serialization is hand-rolled).
#[derive(Debug, Clone)]
pub struct ComparisonResults(Vec<ModelResult>);

impl ComparisonResults {
    pub fn new(results: Vec<ModelResult>) -> Self {
        Self(results)
    }

    pub fn get(&self, model: &str) -> Option<&ModelResult> {
        self.0.iter().find(|r| r.model == model)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelResult> {
        self.0.iter()
    }

    pub fn models(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.model.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ComparisonResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in &self.0 {
            map.serialize_entry(&result.model, result)?;
        }
        map.end()
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
