use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::ApiError;

/// Client for a local Ollama daemon.
///
/// No request timeout is set on chat calls: a stalled model hangs its own
/// caller and nobody else (see the comparison engine's failure policy).
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self.client.get(&url).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self.client.get(&url).send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Failed to list models: {}",
                res.status()
            )));
        }

        let response: TagsResponse = res.json().await.map_err(ApiError::internal)?;

        let models = response
            .models
            .into_iter()
            .map(|m| ProviderModel {
                id: m.name.clone(),
                name: m.name,
            })
            .collect();

        Ok(models)
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        let mut options = serde_json::Map::new();
        if let Some(t) = request.temperature {
            options.insert("temperature".to_string(), json!(t));
        }
        if let Some(n) = request.max_tokens {
            options.insert("num_predict".to_string(), json!(n));
        }
        if !options.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("options".to_string(), Value::Object(options));
            }
        }

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Ollama chat error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        chat_content(&payload)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/api/embed", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Ollama embed error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["embeddings"].as_array() {
            for item in data {
                if let Some(vals) = item.as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        Ok(embeddings)
    }
}

/// A 2xx body without `message.content` is a malformed response, not an
/// empty answer; it must surface as a per-model failure.
fn chat_content(payload: &Value) -> Result<String, ApiError> {
    payload["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::Internal("Ollama chat response missing message.content".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_without_content_is_an_error() {
        let err = chat_content(&json!({"done": true})).expect_err("malformed body must fail");
        assert!(err.to_string().contains("message.content"));

        let err = chat_content(&json!({"message": {"role": "assistant"}}))
            .expect_err("missing content must fail");
        assert!(err.to_string().contains("message.content"));
    }

    #[test]
    fn chat_response_with_content_is_extracted() {
        let payload = json!({"message": {"role": "assistant", "content": "hi there"}});
        assert_eq!(chat_content(&payload).expect("content present"), "hi there");
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let provider = OllamaProvider::new("http://localhost:11434/".to_string());
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    #[ignore]
    async fn live_ollama_roundtrip() {
        use crate::llm::types::ChatMessage;

        let provider = OllamaProvider::new("http://127.0.0.1:11434".to_string());

        let models = provider.list_models().await.expect("daemon reachable");
        let Some(first) = models.first() else {
            return;
        };

        let req = ChatRequest::new(vec![ChatMessage::user("Say hello in one word.")]);
        let answer = provider.chat(req, &first.id).await.expect("chat works");
        assert!(!answer.is_empty());
    }
}
