use crate::llm::error::LlmDiagnosticsError;
use serde::Serialize;
use std::fmt;

/// Workflow stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolution,
    Synthesis,
    Analysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Resolution => "resolution",
            Stage::Synthesis => "synthesis",
            Stage::Analysis => "analysis",
        };
        f.write_str(s)
    }
}

/// Errors that end a run. A query that matches nothing is not one of these.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("dataset schema mismatch: no column for {missing:?} (available: {available:?})")]
    Schema {
        missing: Vec<&'static str>,
        available: Vec<String>,
    },

    #[error("dataset row is unusable: {0}")]
    MalformedRow(String),

    #[error("dataset access failed: {0:#}")]
    Dataset(#[source] anyhow::Error),

    #[error("{stage} generation failed: {source:#}")]
    Generation {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl WorkflowError {
    pub fn generation(stage: Stage, source: anyhow::Error) -> Self {
        Self::Generation { stage, source }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            WorkflowError::Schema { .. } | WorkflowError::MalformedRow(_) => FailureKind::Schema,
            WorkflowError::Dataset(_) => FailureKind::Dataset,
            WorkflowError::Generation { .. } => FailureKind::Generation,
        }
    }

    /// Raw provider output behind a generation failure, when the provider attached it.
    pub fn diagnostics(&self) -> Option<&LlmDiagnosticsError> {
        match self {
            WorkflowError::Generation { source, .. } => source.downcast_ref::<LlmDiagnosticsError>(),
            _ => None,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::Generation { stage, .. } => *stage,
            _ => Stage::Resolution,
        }
    }
}

/// Coarse classification surfaced on terminal failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Schema,
    Dataset,
    Generation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_errors_keep_their_stage() {
        let err = WorkflowError::generation(Stage::Analysis, anyhow::anyhow!("bad json"));
        assert_eq!(err.kind(), FailureKind::Generation);
        assert_eq!(err.stage(), Stage::Analysis);
        assert_eq!(err.to_string(), "analysis generation failed: bad json");
    }

    #[test]
    fn schema_errors_belong_to_resolution() {
        let err = WorkflowError::Schema {
            missing: vec!["nse_code"],
            available: vec!["Name".to_string()],
        };
        assert_eq!(err.kind(), FailureKind::Schema);
        assert_eq!(err.stage(), Stage::Resolution);
        assert!(err.to_string().contains("nse_code"));
        assert!(err.diagnostics().is_none());
    }

    #[test]
    fn exposes_provider_diagnostics() {
        let diag = LlmDiagnosticsError {
            provider: crate::llm::Provider::OpenAI,
            stage: "parse",
            detail: "no JSON object".to_string(),
            raw_output: Some("sorry, I cannot".to_string()),
            raw_response_json: None,
        };
        let err = WorkflowError::generation(Stage::Synthesis, diag.into());
        let found = err.diagnostics().unwrap();
        assert_eq!(found.raw_output.as_deref(), Some("sorry, I cannot"));
    }
}
