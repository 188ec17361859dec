use crate::domain::framework::AnalysisFramework;
use crate::domain::recommendation::Recommendation;
use crate::domain::record::CompanyRecord;
use crate::error::{FailureKind, Stage};
use crate::resolver::MatchStrategy;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Everything a successful run produced, plus the rendered markdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub record: CompanyRecord,
    pub framework: AnalysisFramework,
    pub recommendation: Recommendation,
    pub markdown: String,
}

/// Progress notifications in emission order. Exactly one terminal event ends every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    ResolutionStarted {
        run_id: Uuid,
        query: String,
    },
    Resolved {
        company: String,
        nse_code: String,
        industry: String,
        strategy: MatchStrategy,
    },
    SynthesisStarted {
        industry: String,
    },
    FrameworkReady {
        industry: String,
        degraded: bool,
    },
    AnalysisStarted {
        company: String,
    },
    Report(Box<RunReport>),
    NotFound {
        query: String,
    },
    Failed {
        stage: Stage,
        kind: FailureKind,
        message: String,
    },
}

impl WorkflowEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::Report(_) | WorkflowEvent::NotFound { .. } | WorkflowEvent::Failed { .. }
        )
    }

    /// Human-readable block for this event.
    pub fn message(&self) -> String {
        match self {
            WorkflowEvent::ResolutionStarted { query, .. } => {
                format!("Extracting company data for \"{query}\"...")
            }
            WorkflowEvent::Resolved {
                company,
                nse_code,
                strategy,
                ..
            } => format!(
                "Extracted data for {company} (NSE: {nse_code}, matched by {})",
                strategy.describe()
            ),
            WorkflowEvent::SynthesisStarted { industry } => format!(
                "Generating specialized analysis framework for the {} industry...",
                crate::domain::framework::industry_label(industry)
            ),
            WorkflowEvent::FrameworkReady { degraded, .. } => {
                if *degraded {
                    "Generated analysis framework from generic guidance (industry research unavailable)"
                        .to_string()
                } else {
                    "Generated industry-specific analysis framework".to_string()
                }
            }
            WorkflowEvent::AnalysisStarted { company } => {
                format!("Performing comprehensive stock analysis for {company}...")
            }
            WorkflowEvent::Report(report) => report.markdown.clone(),
            WorkflowEvent::NotFound { query } => format!(
                "Company not found in the dataset: \"{query}\". Try the exact company name or NSE ticker."
            ),
            WorkflowEvent::Failed { stage, message, .. } => {
                format!("Analysis failed during {stage}: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_event_tag() {
        let ev = WorkflowEvent::Failed {
            stage: Stage::Analysis,
            kind: FailureKind::Generation,
            message: "bad confidence".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({
                "event": "failed",
                "stage": "analysis",
                "kind": "generation",
                "message": "bad confidence",
            })
        );
        assert!(ev.is_terminal());
        assert_eq!(ev.message(), "Analysis failed during analysis: bad confidence");
    }

    #[test]
    fn progress_events_are_not_terminal() {
        let ev = WorkflowEvent::Resolved {
            company: "Tata Steel".to_string(),
            nse_code: "TATASTEEL".to_string(),
            industry: "Steel".to_string(),
            strategy: MatchStrategy::ExactName,
        };
        assert!(!ev.is_terminal());
        assert_eq!(
            ev.message(),
            "Extracted data for Tata Steel (NSE: TATASTEEL, matched by exact company name)"
        );
        assert!(!WorkflowEvent::AnalysisStarted {
            company: "Tata Steel".to_string()
        }
        .is_terminal());
    }
}
