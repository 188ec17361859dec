use serde::{Deserialize, Serialize};

/// Industry- and company-specific guidance for one run.
///
/// `industry` and `company` are copied from the resolved record, never from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFramework {
    pub industry: String,
    pub company: String,
    pub industry_context: String,
    pub company_context: String,
    pub analysis_framework: String,
    pub key_metrics_focus: String,
    pub risk_factors: String,
    /// Consolidated instructions handed verbatim to the recommendation stage.
    pub meta_prompt: String,
    /// True when research was unavailable and generic guidance filled the gaps.
    pub degraded: bool,
}

/// Guidance used when research produced nothing usable. Deliberately generic: it names the
/// industry and company but asserts nothing about them.
pub fn generic_framework(industry: &str, company: &str) -> AnalysisFramework {
    let industry_label = industry_label(industry);

    let industry_context = format!(
        "No current research was available for the {industry_label} industry. Judge the \
         business against broad sector fundamentals: demand cyclicality, pricing power, \
         capital intensity, competitive intensity and regulatory exposure."
    );
    let company_context = format!(
        "No recent company-specific research was available for {company}. Rely on the \
         reported financial metrics and treat every missing metric as unknown."
    );
    let analysis_framework = "Combine a relative valuation view (P/E, P/B, PEG against \
        typical sector ranges) with quality checks (return ratios, margins, growth \
        consistency) and balance-sheet safety (leverage, promoter pledging)."
        .to_string();
    let key_metrics_focus = "Price to earnings, price to book value, PEG ratio, return on \
        assets, cash return on invested capital, sales and EPS growth, debt to equity, \
        pledged percentage."
        .to_string();
    let risk_factors = "Sector cyclicality, regulatory change, leverage, promoter pledging, \
        earnings volatility, and the absence of fresh research for this run."
        .to_string();

    let meta_prompt = compose_meta_prompt(
        &industry_label,
        company,
        &industry_context,
        &company_context,
        &analysis_framework,
        &key_metrics_focus,
        &risk_factors,
    );

    AnalysisFramework {
        industry: industry.to_string(),
        company: company.to_string(),
        industry_context,
        company_context,
        analysis_framework,
        key_metrics_focus,
        risk_factors,
        meta_prompt,
        degraded: true,
    }
}

pub fn compose_meta_prompt(
    industry: &str,
    company: &str,
    industry_context: &str,
    company_context: &str,
    analysis_framework: &str,
    key_metrics_focus: &str,
    risk_factors: &str,
) -> String {
    format!(
        "You are analysing {company} ({industry}).\n\n\
Industry context:\n{industry_context}\n\n\
Company context:\n{company_context}\n\n\
Analysis framework:\n{analysis_framework}\n\n\
Metrics to emphasise:\n{key_metrics_focus}\n\n\
Risk factors to weigh:\n{risk_factors}"
    )
}

pub(crate) fn industry_label(industry: &str) -> String {
    let trimmed = industry.trim();
    if trimmed.is_empty() {
        "unclassified".to_string()
    } else {
        trimmed.to_string()
    }
}
