use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{Provider, StructuredGenerator, StructuredRequest};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat Completions client for OpenAI and compatible endpoints (DeepSeek, local gateways).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    /// JSON mode does not take a schema, so the schema travels in the system prompt.
    fn system_prompt(request: &StructuredRequest) -> String {
        let schema = serde_json::to_string_pretty(&request.schema.json_schema)
            .unwrap_or_else(|_| request.schema.json_schema.to_string());
        format!(
            "{}\n\n\
Return ONLY a single JSON object ({}). Do not wrap it in markdown. Do not include extra keys.\n\
It must validate against this JSON schema:\n{schema}",
            request.system.trim(),
            request.schema.description
        )
    }

    fn build_request(&self, request: &StructuredRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(request),
                },
                ChatMessage {
                    role: "user",
                    content: request.user.clone(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait::async_trait]
impl StructuredGenerator for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn generate(&self, request: StructuredRequest) -> anyhow::Result<Value> {
        let body = self.build_request(&request);
        let started = std::time::Instant::now();

        let res = self
            .http
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        let raw_response_json = serde_json::from_str::<Value>(&text).ok();
        if !status.is_success() {
            return Err(LlmDiagnosticsError {
                provider: Provider::OpenAI,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let parsed = serde_json::from_str::<ChatResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI response: {text}"))?;

        tracing::debug!(
            schema = request.schema.name,
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis(),
            "OpenAI structured generation finished"
        );

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(LlmDiagnosticsError {
                provider: Provider::OpenAI,
                stage: "choices",
                detail: "response contained no choices".to_string(),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        };

        let content = choice.message.content.unwrap_or_default();
        json::parse_object(&content).map_err(|err| {
            LlmDiagnosticsError {
                provider: Provider::OpenAI,
                stage: "parse",
                detail: format!("finish_reason={:?}: {err:#}", choice.finish_reason),
                raw_output: Some(content.clone()),
                raw_response_json,
            }
            .into()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
