use crate::domain::framework::{compose_meta_prompt, generic_framework, industry_label, AnalysisFramework};
use crate::domain::recommendation::{Action, Recommendation};
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

/// Framework shape requested from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAnalysisFramework {
    #[serde(default)]
    pub industry_context: String,
    #[serde(default)]
    pub company_context: String,
    #[serde(default)]
    pub analysis_framework: String,
    #[serde(default)]
    pub key_metrics_focus: String,
    #[serde(default)]
    pub risk_factors: String,
    pub meta_prompt: String,
}

/// Recommendation shape requested from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRecommendation {
    pub recommendation: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub time_horizon: String,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub key_risks: Vec<String>,
    pub rationale: String,
    #[serde(default)]
    pub alternative_scenarios: String,
}

impl LlmAnalysisFramework {
    /// Empty sections are backfilled from generic guidance; an empty meta prompt is rejected.
    pub fn validate_and_into_framework(
        self,
        industry: &str,
        company: &str,
        degraded: bool,
    ) -> anyhow::Result<AnalysisFramework> {
        let meta_prompt = self.meta_prompt.trim().to_string();
        ensure!(!meta_prompt.is_empty(), "meta_prompt must be non-empty");

        let generic = generic_framework(industry, company);
        let mut backfilled = false;
        let mut section = |text: String, fallback: String| {
            let text = text.trim().to_string();
            if text.is_empty() {
                backfilled = true;
                fallback
            } else {
                text
            }
        };

        let industry_context = section(self.industry_context, generic.industry_context);
        let company_context = section(self.company_context, generic.company_context);
        let analysis_framework = section(self.analysis_framework, generic.analysis_framework);
        let key_metrics_focus = section(self.key_metrics_focus, generic.key_metrics_focus);
        let risk_factors = section(self.risk_factors, generic.risk_factors);

        // The meta prompt is used verbatim downstream; when sections had to be backfilled,
        // append them so the recommendation stage still sees the full lens.
        let meta_prompt = if backfilled {
            format!(
                "{meta_prompt}\n\n{}",
                compose_meta_prompt(
                    &industry_label(industry),
                    company,
                    &industry_context,
                    &company_context,
                    &analysis_framework,
                    &key_metrics_focus,
                    &risk_factors,
                )
            )
        } else {
            meta_prompt
        };

        Ok(AnalysisFramework {
            industry: industry.to_string(),
            company: company.to_string(),
            industry_context,
            company_context,
            analysis_framework,
            key_metrics_focus,
            risk_factors,
            meta_prompt,
            degraded: degraded || backfilled,
        })
    }
}

impl LlmRecommendation {
    pub fn validate_and_into_recommendation(
        self,
        current_price: Option<f64>,
    ) -> anyhow::Result<Recommendation> {
        let Some(action) = Action::parse(&self.recommendation) else {
            bail!(
                "recommendation must be one of BUY, HOLD, SELL (got {:?})",
                self.recommendation
            );
        };

        let confidence = self.confidence_score;
        ensure!(
            confidence.is_finite() && (0.0..=100.0).contains(&confidence),
            "confidence_score must be between 0 and 100 (got {confidence})"
        );

        if let Some(target) = self.target_price {
            ensure!(
                target.is_finite() && target > 0.0,
                "target_price must be a positive number (got {target})"
            );
            if let Some(price) = current_price {
                match action {
                    Action::Buy => ensure!(
                        target >= price,
                        "BUY with target_price {target} below current price {price}"
                    ),
                    Action::Sell => ensure!(
                        target <= price,
                        "SELL with target_price {target} above current price {price}"
                    ),
                    Action::Hold => {}
                }
            }
        }

        let key_strengths = clean_lines(self.key_strengths);
        let key_risks = clean_lines(self.key_risks);
        ensure!(!key_strengths.is_empty(), "key_strengths must be non-empty");
        ensure!(!key_risks.is_empty(), "key_risks must be non-empty");

        let rationale = self.rationale.trim().to_string();
        ensure!(!rationale.is_empty(), "rationale must be non-empty");

        let time_horizon = self.time_horizon.trim().to_string();
        let time_horizon = if time_horizon.is_empty() {
            "Not specified".to_string()
        } else {
            time_horizon
        };

        Ok(Recommendation {
            action,
            confidence,
            target_price: self.target_price,
            time_horizon,
            key_strengths,
            key_risks,
            rationale,
            alternative_scenarios: self.alternative_scenarios.trim().to_string(),
        })
    }
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
