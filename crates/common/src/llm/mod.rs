//! Model backend abstraction
//!
//! Provides a unified interface over text-completion backends:
//! - Local chat completion endpoint (Ollama-style `/api/chat`)
//! - Cloud generation endpoint (Gemini-style `generateContent`)
//!
//! Both strategies return parsed JSON or a typed failure: backend HTTP
//! status is surfaced verbatim, and a response body that is not valid JSON
//! becomes `AppError::MalformedOutput` instead of an opaque panic.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Options for one completion call
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Model override; falls back to the client's configured model
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Context window requested from the local backend
    pub num_ctx: u32,
    /// Ask the backend for strict JSON output. Disabled automatically when
    /// image attachments are present (multimodal backends reject it).
    pub force_json: bool,
    /// Base64-encoded page images for vision-capable models
    pub images: Vec<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            num_ctx: 8192,
            force_json: true,
            images: Vec::new(),
        }
    }
}

/// Trait for text-completion backends returning structured output
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run a system/user prompt pair and parse the response body as JSON
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<Value>;

    /// Get the backend name for logging
    fn name(&self) -> &str;

    /// Get the default model this client targets
    fn model_name(&self) -> &str;
}

// ============================================================================
// Local chat completion client
// ============================================================================

/// Client for a locally reachable chat completion endpoint
pub struct LocalChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl LocalChatClient {
    pub fn new(base_url: &str, model: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_ms: timeout_secs * 1000,
        })
    }
}

#[async_trait]
impl ModelClient for LocalChatClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<Value> {
        let model = options.model.as_deref().unwrap_or(&self.model);
        let has_images = !options.images.is_empty();

        let messages = vec![
            ChatMessage {
                role: "system",
                content: system,
                images: None,
            },
            ChatMessage {
                role: "user",
                content: user,
                images: if has_images {
                    Some(&options.images)
                } else {
                    None
                },
            },
        ];

        // Strict JSON mode is incompatible with image attachments
        let format = if options.force_json && !has_images {
            Some("json")
        } else {
            None
        };

        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: options.temperature,
                num_ctx: options.num_ctx,
            },
            format,
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ModelTimeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AppError::Model {
                        message: format!("request to {} failed: {}", url, e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 && body.contains("not found") {
                return Err(AppError::Model {
                    message: format!(
                        "model '{}' is not available on the local backend (pull it first)",
                        model
                    ),
                });
            }
            return Err(AppError::Model {
                message: format!("local backend {}: {}", status, body),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| AppError::Model {
            message: format!("unreadable response envelope: {}", e),
        })?;

        let text = chat
            .message
            .map(|m| m.content)
            .unwrap_or_else(|| "{}".to_string());

        serde_json::from_str(&text).map_err(|e| AppError::MalformedOutput {
            message: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Cloud generation client
// ============================================================================

/// Client for a hosted generation endpoint
pub struct CloudClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl CloudClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout_ms: timeout_secs * 1000,
        })
    }
}

#[async_trait]
impl ModelClient for CloudClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<Value> {
        let model = options.model.as_deref().unwrap_or(&self.model);

        // The generation endpoint takes a single user turn
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: format!("{}\n\n{}", system, user),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                response_mime_type: "application/json",
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ModelTimeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AppError::Model {
                        message: format!("cloud request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Model {
                message: format!("cloud backend {}: {}", status, body),
            });
        }

        let generated: GenerateResponse =
            response.json().await.map_err(|e| AppError::Model {
                message: format!("unreadable response envelope: {}", e),
            })?;

        let text = generated
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .unwrap_or_else(|| "{}".to_string());

        serde_json::from_str(&text).map_err(|e| AppError::MalformedOutput {
            message: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        "cloud"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Mock client for tests
// ============================================================================

/// Scripted model client for tests. Pops one queued response per call;
/// an exhausted script yields `MalformedOutput`.
pub struct MockModel {
    responses: Mutex<Vec<Result<Value>>>,
}

impl MockModel {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _options: &CompletionOptions,
    ) -> Result<Value> {
        self.responses
            .lock()
            .expect("mock lock poisoned")
            .pop()
            .unwrap_or_else(|| {
                Err(AppError::MalformedOutput {
                    message: "mock script exhausted".to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Create a model client based on configuration
pub fn create_model_client(provider: &str, config: &LlmConfig) -> Result<Arc<dyn ModelClient>> {
    match provider {
        "local" => Ok(Arc::new(LocalChatClient::new(
            &config.local_base_url,
            config.chat_model.clone(),
            config.timeout_secs,
        )?)),
        "cloud" => {
            let api_key = config
                .cloud_api_key
                .clone()
                .ok_or_else(|| AppError::Configuration {
                    message: "llm.cloud_api_key is not set".to_string(),
                })?;
            Ok(Arc::new(CloudClient::new(
                &config.cloud_base_url,
                api_key,
                config.cloud_model.clone(),
                config.timeout_secs,
            )?))
        }
        other => Err(AppError::Configuration {
            message: format!("unknown model provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "qwen2.5:7b-instruct",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                    images: None,
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                    images: None,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: 0.2,
                num_ctx: 8192,
            },
            format: Some("json"),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "qwen2.5:7b-instruct");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_ctx"], 8192);
        assert_eq!(value["format"], "json");
        // No images key when none are attached
        assert!(value["messages"][1].get("images").is_none());
    }

    #[test]
    fn test_format_omitted_with_images() {
        let images = vec!["aGVsbG8=".to_string()];
        let options = CompletionOptions {
            images,
            ..Default::default()
        };
        let has_images = !options.images.is_empty();
        let format = if options.force_json && !has_images {
            Some("json")
        } else {
            None
        };
        assert!(format.is_none());
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: "sys\n\nusr".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_mock_model_pops_in_order() {
        let mock = MockModel::new(vec![
            Ok(serde_json::json!({"a": 1})),
            Ok(serde_json::json!({"a": 2})),
        ]);
        let opts = CompletionOptions::default();

        let first = mock.complete("s", "u", &opts).await.unwrap();
        assert_eq!(first["a"], 1);
        let second = mock.complete("s", "u", &opts).await.unwrap();
        assert_eq!(second["a"], 2);

        let exhausted = mock.complete("s", "u", &opts).await;
        assert!(matches!(
            exhausted,
            Err(AppError::MalformedOutput { .. })
        ));
    }
}
