//! Runs resolution, framework synthesis and analysis in sequence and reports progress as a
//! stream of [`WorkflowEvent`]s.
//!
//! A run that resolves nothing ends with `NotFound` and never touches the generator or the
//! research client. Any [`WorkflowError`] ends the run with a single `Failed` event.

pub mod events;
pub mod report;

pub use events::{RunReport, WorkflowEvent};

use crate::dataset::CompanyDataset;
use crate::error::WorkflowError;
use crate::llm::StructuredGenerator;
use crate::research::ResearchClient;
use crate::resolver::{Resolver, ResolverConfig};
use crate::stages::{FrameworkSynthesizer, RecommendationConfig, RecommendationEngine, SynthesizerConfig};
use async_stream::stream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    pub resolver: ResolverConfig,
    pub synthesizer: SynthesizerConfig,
    pub recommendation: RecommendationConfig,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    NotFound,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Option<Uuid>,
    pub status: RunStatus,
    pub events: Vec<WorkflowEvent>,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        self.events.iter().find_map(|ev| match ev {
            WorkflowEvent::Report(report) => Some(report.as_ref()),
            _ => None,
        })
    }

    pub fn terminal(&self) -> Option<&WorkflowEvent> {
        self.events.last().filter(|ev| ev.is_terminal())
    }
}

pub struct Workflow {
    resolver: Resolver,
    synthesizer: FrameworkSynthesizer,
    engine: RecommendationEngine,
}

impl Workflow {
    pub fn new(
        resolver: Resolver,
        synthesizer: FrameworkSynthesizer,
        engine: RecommendationEngine,
    ) -> Self {
        Self {
            resolver,
            synthesizer,
            engine,
        }
    }

    /// Wires all three stages over shared collaborators.
    pub fn assemble(
        dataset: Arc<dyn CompanyDataset>,
        generator: Arc<dyn StructuredGenerator>,
        research: Arc<dyn ResearchClient>,
        config: WorkflowConfig,
    ) -> Self {
        Self::new(
            Resolver::new(dataset, config.resolver),
            FrameworkSynthesizer::new(generator.clone(), research.clone(), config.synthesizer),
            RecommendationEngine::new(generator, research, config.recommendation),
        )
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Lazy: nothing runs until the stream is polled. Ends after exactly one terminal event.
    pub fn run(&self, query: impl Into<String>) -> impl Stream<Item = WorkflowEvent> + Send + '_ {
        let query = query.into();
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("workflow_run", %run_id, query = %query);

        stream! {
            yield WorkflowEvent::ResolutionStarted {
                run_id,
                query: query.clone(),
            };

            let resolved = match self.resolver.resolve(&query).instrument(span.clone()).await {
                Ok(Some(resolved)) => resolved,
                Ok(None) => {
                    tracing::info!(parent: &span, "run finished: company not found");
                    yield WorkflowEvent::NotFound { query };
                    return;
                }
                Err(err) => {
                    yield failed(&span, err);
                    return;
                }
            };
            let record = resolved.record;

            yield WorkflowEvent::Resolved {
                company: record.name.clone(),
                nse_code: record.nse_code.clone(),
                industry: record.industry.clone(),
                strategy: resolved.strategy,
            };
            yield WorkflowEvent::SynthesisStarted {
                industry: record.industry.clone(),
            };

            let framework = match self
                .synthesizer
                .synthesize(&record.industry, &record.name)
                .instrument(span.clone())
                .await
            {
                Ok(framework) => framework,
                Err(err) => {
                    yield failed(&span, err);
                    return;
                }
            };

            yield WorkflowEvent::FrameworkReady {
                industry: framework.industry.clone(),
                degraded: framework.degraded,
            };
            yield WorkflowEvent::AnalysisStarted {
                company: record.name.clone(),
            };

            let recommendation = match self
                .engine
                .recommend(&record, &framework)
                .instrument(span.clone())
                .await
            {
                Ok(recommendation) => recommendation,
                Err(err) => {
                    yield failed(&span, err);
                    return;
                }
            };

            let markdown = report::render_report(&record, &framework, &recommendation);
            tracing::info!(
                parent: &span,
                company = %record.name,
                action = %recommendation.action,
                "run finished: report ready"
            );
            yield WorkflowEvent::Report(Box::new(RunReport {
                run_id,
                generated_at: chrono::Utc::now(),
                record,
                framework,
                recommendation,
                markdown,
            }));
        }
    }

    /// Drains [`Workflow::run`].
    pub async fn run_to_end(&self, query: impl Into<String>) -> RunOutcome {
        let events: Vec<WorkflowEvent> = self.run(query).collect().await;

        let run_id = events.iter().find_map(|ev| match ev {
            WorkflowEvent::ResolutionStarted { run_id, .. } => Some(*run_id),
            _ => None,
        });
        let status = match events.last() {
            Some(WorkflowEvent::Report(_)) => RunStatus::Completed,
            Some(WorkflowEvent::NotFound { .. }) => RunStatus::NotFound,
            _ => RunStatus::Failed,
        };
        RunOutcome {
            run_id,
            status,
            events,
        }
    }
}

fn failed(span: &tracing::Span, err: WorkflowError) -> WorkflowEvent {
    let stage = err.stage();
    let kind = err.kind();
    tracing::error!(parent: span, %stage, ?kind, error = %err, "run failed");
    if let Some(diag) = err.diagnostics() {
        tracing::debug!(
            parent: span,
            provider = ?diag.provider,
            llm_stage = diag.stage,
            raw_output = diag.raw_output.as_deref().unwrap_or(""),
            "raw model output for failed generation"
        );
    }
    WorkflowEvent::Failed {
        stage,
        kind,
        message: err.to_string(),
    }
}
