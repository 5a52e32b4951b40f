//! Inference engine - answers free-form questions through Ollama

use crate::config::InferenceConfig;
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Natural-language answer engine
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Best answer to `question` given `context`
    async fn answer(&self, question: &str, context: &str) -> Result<String, EngineError>;
}

/// Ollama `/api/generate` client
pub struct OllamaEngine {
    base_url: String,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaEngine {
    pub fn new(config: &InferenceConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            http,
        })
    }

    fn map_request_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout(self.timeout)
        } else {
            EngineError::Unavailable(e.to_string())
        }
    }
}

/// Prompt asking for a short answer extracted from the context
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the exam question with the shortest correct answer. \
         Reply with the answer only, no explanation.\n\n\
         Context: {}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}

/// First non-empty line, without surrounding quotes
pub fn extract_answer(raw: &str) -> Option<String> {
    raw.lines()
        .map(|line| line.trim().trim_matches('"').trim())
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    async fn answer(&self, question: &str, context: &str) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(question, context),
            "stream": false
        });

        debug!("Asking {} for an answer", self.model);
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(EngineError::Unavailable(format!(
                "Ollama request failed: {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.map_request_error(e))?;

        extract_answer(&parsed.response)
            .ok_or_else(|| EngineError::Unavailable("empty answer from model".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_question_and_context() {
        let prompt = build_prompt("Who wrote War and Peace?", "Образовательный контекст");
        assert!(prompt.contains("Question: Who wrote War and Peace?"));
        assert!(prompt.contains("Context: Образовательный контекст"));
    }

    #[test]
    fn test_extract_answer() {
        assert_eq!(extract_answer("\n  \"1993\"  \nbecause..."), Some("1993".to_string()));
        assert_eq!(extract_answer("Tolstoy"), Some("Tolstoy".to_string()));
        assert_eq!(extract_answer("  \n \n"), None);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let engine = OllamaEngine::new(&InferenceConfig {
            url: "http://127.0.0.1:11434/".to_string(),
            ..InferenceConfig::default()
        })
        .unwrap();
        assert_eq!(engine.base_url, "http://127.0.0.1:11434");
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_unavailable() {
        let engine = OllamaEngine::new(&InferenceConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..InferenceConfig::default()
        })
        .unwrap();
        let err = engine.answer("q", "c").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Unavailable(_) | EngineError::Timeout(_)
        ));
    }
}
