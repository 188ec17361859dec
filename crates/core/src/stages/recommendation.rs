use crate::domain::contract::LlmRecommendation;
use crate::domain::framework::AnalysisFramework;
use crate::domain::recommendation::Recommendation;
use crate::domain::record::{metric_description, CompanyRecord};
use crate::error::{Stage, WorkflowError};
use crate::llm::{OutputSchema, StructuredGenerator, StructuredRequest};
use crate::research::{ResearchClient, ResearchQuery};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const SCHEMA_NAME: &str = "emit_recommendation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationApproach {
    RelativeMultiples,
    EarningsGrowth,
    DividendYield,
    AssetBased,
    QualityOfReturns,
}

impl ValuationApproach {
    fn directive(self) -> &'static str {
        match self {
            ValuationApproach::RelativeMultiples => "relative multiples (P/E, P/B, PEG) against peers",
            ValuationApproach::EarningsGrowth => "earnings and sales growth durability",
            ValuationApproach::DividendYield => "dividend yield and payout sustainability",
            ValuationApproach::AssetBased => "asset-based value (book value, balance sheet strength)",
            ValuationApproach::QualityOfReturns => "quality of returns (ROA, CROIC, margins)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub market: String,
    pub currency: String,
    pub valuation_approaches: Vec<ValuationApproach>,
    /// Search for recent company news before generating.
    pub include_news: bool,
    /// Lists longer than these are truncated after validation.
    pub max_strengths: usize,
    pub max_risks: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            market: "Indian stock markets (NSE/BSE)".to_string(),
            currency: "INR".to_string(),
            valuation_approaches: vec![
                ValuationApproach::RelativeMultiples,
                ValuationApproach::EarningsGrowth,
                ValuationApproach::QualityOfReturns,
            ],
            include_news: true,
            max_strengths: 5,
            max_risks: 5,
        }
    }
}

pub struct RecommendationEngine {
    generator: Arc<dyn StructuredGenerator>,
    research: Arc<dyn ResearchClient>,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        research: Arc<dyn ResearchClient>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            generator,
            research,
            config,
        }
    }

    pub async fn recommend(
        &self,
        record: &CompanyRecord,
        framework: &AnalysisFramework,
    ) -> Result<Recommendation, WorkflowError> {
        let news = if self.config.include_news {
            self.recent_developments(record).await
        } else {
            None
        };

        let request = StructuredRequest {
            system: self.system_prompt(),
            user: analysis_input(record, framework, news.as_deref()),
            schema: schema(),
        };

        let value = self
            .generator
            .generate(request)
            .await
            .map_err(|e| WorkflowError::generation(Stage::Analysis, e))?;

        let mut recommendation = serde_json::from_value::<LlmRecommendation>(value)
            .context("recommendation output does not match schema")
            .and_then(|raw| raw.validate_and_into_recommendation(record.current_price()))
            .map_err(|e| WorkflowError::generation(Stage::Analysis, e))?;

        recommendation.key_strengths.truncate(self.config.max_strengths.max(1));
        recommendation.key_risks.truncate(self.config.max_risks.max(1));

        tracing::info!(
            company = %record.name,
            action = %recommendation.action,
            confidence = recommendation.confidence,
            with_news = news.is_some(),
            "generated recommendation"
        );
        Ok(recommendation)
    }

    async fn recent_developments(&self, record: &CompanyRecord) -> Option<String> {
        let query = ResearchQuery::new("latest news and developments")
            .company(record.name.as_str())
            .industry(record.industry.as_str());
        match self.research.research(&query).await {
            Ok(findings) if !findings.is_empty() => Some(findings.to_prompt_block()),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(
                    company = %record.name,
                    provider = self.research.provider_name(),
                    error = %err,
                    "news research unavailable; continuing without it"
                );
                None
            }
        }
    }

    fn system_prompt(&self) -> String {
        let approaches = self
            .config
            .valuation_approaches
            .iter()
            .map(|a| format!("- {}", a.directive()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a senior equity research analyst with 15+ years of experience in {market}.\n\
Use the provided meta_prompt as your binding analysis framework.\n\
Analyse the structured financial data comprehensively. Metrics listed under unknown_metrics \
are missing from the dataset: treat them as unknown, never as zero or as an average.\n\
Ground the rationale only in the supplied data and the recent developments provided; do not \
invent figures.\n\
Consider these valuation approaches:\n{approaches}\n\
Give a BUY, HOLD or SELL recommendation with a confidence score from 0 to 100 that matches \
the strength of the evidence. Prices are in {currency}; a BUY target must not be below the \
current price and a SELL target must not be above it.\n\
List at most {strengths} key strengths and at most {risks} key risks.",
            market = self.config.market,
            currency = self.config.currency,
            strengths = self.config.max_strengths,
            risks = self.config.max_risks,
        )
    }
}

/// JSON payload handed to the model: framework, record, and the metrics it lacks.
fn analysis_input(
    record: &CompanyRecord,
    framework: &AnalysisFramework,
    news: Option<&str>,
) -> String {
    let mut metrics = Map::new();
    for (key, value) in &record.metrics {
        let entry = match metric_description(key) {
            Some(description) => json!({"value": value, "description": description}),
            None => json!({"value": value}),
        };
        metrics.insert(key.clone(), entry);
    }

    let input = json!({
        "meta_prompt": framework.meta_prompt,
        "company_name": record.name,
        "industry": record.industry,
        "stock_data": {
            "name": record.name,
            "bse_code": record.bse_code,
            "nse_code": record.nse_code,
            "industry": record.industry,
            "metrics": Value::Object(metrics),
        },
        "unknown_metrics": record.missing_known_metrics(),
        "recent_developments": news,
    });

    serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string())
}

fn schema() -> OutputSchema {
    OutputSchema {
        name: SCHEMA_NAME,
        description: "Emit the final BUY/HOLD/SELL recommendation",
        json_schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "recommendation",
                "confidence_score",
                "target_price",
                "time_horizon",
                "key_strengths",
                "key_risks",
                "rationale",
                "alternative_scenarios"
            ],
            "properties": {
                "recommendation": {"type": "string", "enum": ["BUY", "HOLD", "SELL"]},
                "confidence_score": {"type": "number", "minimum": 0, "maximum": 100},
                "target_price": {"type": ["number", "null"], "description": "Target price if applicable"},
                "time_horizon": {"type": "string", "description": "Recommended investment time horizon"},
                "key_strengths": {"type": "array", "items": {"type": "string"}},
                "key_risks": {"type": "array", "items": {"type": "string"}},
                "rationale": {"type": "string", "description": "Detailed rationale for the recommendation"},
                "alternative_scenarios": {"type": "string", "description": "Alternative scenarios and their implications"}
            }
        }),
    }
}
