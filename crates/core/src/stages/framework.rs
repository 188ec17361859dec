use crate::domain::contract::LlmAnalysisFramework;
use crate::domain::framework::{industry_label, AnalysisFramework};
use crate::error::{Stage, WorkflowError};
use crate::llm::{OutputSchema, StructuredGenerator, StructuredRequest};
use crate::research::{ResearchClient, ResearchQuery};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SCHEMA_NAME: &str = "emit_framework";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkFocus {
    ValuationMethods,
    IndustryTrends,
    CompetitivePosition,
    RegulatoryEnvironment,
    BusinessCycle,
}

impl FrameworkFocus {
    pub const ALL: [FrameworkFocus; 5] = [
        FrameworkFocus::ValuationMethods,
        FrameworkFocus::IndustryTrends,
        FrameworkFocus::CompetitivePosition,
        FrameworkFocus::RegulatoryEnvironment,
        FrameworkFocus::BusinessCycle,
    ];

    fn research_query(self, industry: &str, company: &str) -> ResearchQuery {
        let (question, scoped_to_company) = match self {
            FrameworkFocus::ValuationMethods => ("valuation methods and key metrics used for", false),
            FrameworkFocus::IndustryTrends => ("current trends and challenges for", false),
            FrameworkFocus::CompetitivePosition => ("competitive position and market share of", true),
            FrameworkFocus::RegulatoryEnvironment => ("regulatory environment and policy changes affecting", false),
            FrameworkFocus::BusinessCycle => ("seasonality and business cycle of", false),
        };
        let query = ResearchQuery::new(question).industry(industry);
        if scoped_to_company {
            query.company(company)
        } else {
            query
        }
    }

    fn directive(self) -> &'static str {
        match self {
            FrameworkFocus::ValuationMethods => {
                "Industry-specific valuation methods and the metrics that matter most"
            }
            FrameworkFocus::IndustryTrends => "Current industry trends and challenges",
            FrameworkFocus::CompetitivePosition => "The company's position within its industry",
            FrameworkFocus::RegulatoryEnvironment => "Regulatory environment and market conditions",
            FrameworkFocus::BusinessCycle => "Seasonal factors and business cycles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Each entry adds one research query and one prompt directive, in order.
    pub focus: Vec<FrameworkFocus>,
    /// Upper bound on research calls per run; 0 disables research.
    pub max_research_queries: usize,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            focus: FrameworkFocus::ALL.to_vec(),
            max_research_queries: 3,
        }
    }
}

pub struct FrameworkSynthesizer {
    generator: Arc<dyn StructuredGenerator>,
    research: Arc<dyn ResearchClient>,
    config: SynthesizerConfig,
}

impl FrameworkSynthesizer {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        research: Arc<dyn ResearchClient>,
        config: SynthesizerConfig,
    ) -> Self {
        Self {
            generator,
            research,
            config,
        }
    }

    pub async fn synthesize(
        &self,
        industry: &str,
        company: &str,
    ) -> Result<AnalysisFramework, WorkflowError> {
        let evidence = self.gather_research(industry, company).await;
        let degraded = evidence.is_empty();
        if degraded {
            tracing::warn!(industry, company, "no usable research; falling back to generic guidance");
        }

        let request = StructuredRequest {
            system: self.system_prompt(),
            user: user_prompt(industry, company, &evidence),
            schema: schema(),
        };

        let value = self
            .generator
            .generate(request)
            .await
            .map_err(|e| WorkflowError::generation(Stage::Synthesis, e))?;

        let framework = serde_json::from_value::<LlmAnalysisFramework>(value)
            .context("framework output does not match schema")
            .and_then(|raw| raw.validate_and_into_framework(industry, company, degraded))
            .map_err(|e| WorkflowError::generation(Stage::Synthesis, e))?;

        tracing::info!(
            industry,
            company,
            degraded = framework.degraded,
            research_blocks = evidence.len(),
            "synthesized analysis framework"
        );
        Ok(framework)
    }

    /// Research failures are logged and skipped; they never fail the stage.
    async fn gather_research(&self, industry: &str, company: &str) -> Vec<(FrameworkFocus, String)> {
        let mut out = Vec::new();
        for focus in self
            .config
            .focus
            .iter()
            .copied()
            .take(self.config.max_research_queries)
        {
            let query = focus.research_query(industry, company);
            match self.research.research(&query).await {
                Ok(findings) if !findings.is_empty() => {
                    out.push((focus, findings.to_prompt_block()));
                }
                Ok(_) => {
                    tracing::debug!(?focus, industry, "research returned nothing usable");
                }
                Err(err) => {
                    tracing::warn!(
                        ?focus,
                        industry,
                        provider = self.research.provider_name(),
                        error = %err,
                        "research unavailable for framework synthesis"
                    );
                }
            }
        }
        out
    }

    fn system_prompt(&self) -> String {
        let mut lines = vec![
            "You are an expert financial analyst and prompt engineer who creates specialized \
             analysis frameworks for equity research."
                .to_string(),
            "Build a framework tailored to the given industry and company. Cover:".to_string(),
        ];
        for focus in &self.config.focus {
            lines.push(format!("- {}", focus.directive()));
        }
        lines.push(
            "Only state facts supported by the research provided. When research is missing, \
             give generic guidance for the industry and say so."
                .to_string(),
        );
        lines.push(
            "The meta_prompt field must be a complete, self-contained set of instructions for \
             an analyst producing a BUY/HOLD/SELL recommendation for this company."
                .to_string(),
        );
        lines.join("\n")
    }
}

fn user_prompt(industry: &str, company: &str, evidence: &[(FrameworkFocus, String)]) -> String {
    let mut out = format!(
        "Industry: {}, Company: {company}\n\n",
        industry_label(industry)
    );
    if evidence.is_empty() {
        out.push_str("Research: none available for this run.");
    } else {
        out.push_str("Research:\n");
        for (focus, block) in evidence {
            out.push_str(&format!("\n## {}\n{block}\n", focus.directive()));
        }
    }
    out
}

fn schema() -> OutputSchema {
    OutputSchema {
        name: SCHEMA_NAME,
        description: "Emit the industry- and company-specific analysis framework",
        json_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "industry_context",
                "company_context",
                "analysis_framework",
                "key_metrics_focus",
                "risk_factors",
                "meta_prompt"
            ],
            "properties": {
                "industry_context": {"type": "string", "description": "Industry-specific context and trends"},
                "company_context": {"type": "string", "description": "Company-specific context and background"},
                "analysis_framework": {"type": "string", "description": "Tailored analysis framework for this industry/company"},
                "key_metrics_focus": {"type": "string", "description": "Most important metrics to focus on for this industry"},
                "risk_factors": {"type": "string", "description": "Industry and company-specific risk factors to consider"},
                "meta_prompt": {"type": "string", "description": "Complete meta prompt for stock analysis"}
            }
        }),
    }
}
