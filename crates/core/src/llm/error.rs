use crate::llm::Provider;
use serde_json::Value;

/// Provider failure with enough raw context to debug a bad generation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("LLM error (provider={provider:?}, stage={stage}): {detail}")]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}
