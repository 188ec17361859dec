pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;

use crate::config::Settings;
use serde_json::Value;
use std::sync::Arc;

/// Target shape for one structured generation call.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub json_schema: Value,
}

#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system: String,
    pub user: String,
    pub schema: OutputSchema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            // DeepSeek and other OpenAI-compatible endpoints go through the OpenAI client.
            "openai" | "deepseek" => Ok(Provider::OpenAI),
            other => anyhow::bail!("unknown LLM_PROVIDER {other:?} (expected anthropic or openai)"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }
}

/// Turns a prompt into a JSON value shaped like `request.schema`.
///
/// Implementations only guarantee well-formed JSON; callers validate the contract.
#[async_trait::async_trait]
pub trait StructuredGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, request: StructuredRequest) -> anyhow::Result<Value>;
}

pub fn build_generator(
    settings: &Settings,
    provider: Option<Provider>,
) -> anyhow::Result<Arc<dyn StructuredGenerator>> {
    let provider = match provider {
        Some(p) => p,
        None => match settings.llm_provider.as_deref() {
            Some(s) => Provider::parse(s)?,
            None => Provider::Anthropic,
        },
    };

    Ok(match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
        Provider::OpenAI => Arc::new(openai::OpenAiClient::from_settings(settings)?),
    })
}
