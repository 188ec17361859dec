pub mod tavily;

use serde::{Deserialize, Serialize};

/// A research question, optionally scoped to an industry and/or company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub question: String,
    pub industry: Option<String>,
    pub company: Option<String>,
}

impl ResearchQuery {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            industry: None,
            company: None,
        }
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Search text sent to the provider: the question plus its scope.
    pub fn search_text(&self) -> String {
        let mut out = self.question.trim().to_string();
        if let Some(company) = self.company.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!(" {}", company.trim()));
        }
        if let Some(industry) = self.industry.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!(" ({} industry)", industry.trim()));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Free-text findings. No freshness or completeness guarantee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub answer: Option<String>,
    pub sources: Vec<Source>,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        self.answer.as_deref().map_or(true, |a| a.trim().is_empty())
            && self.sources.iter().all(|s| s.snippet.trim().is_empty())
    }

    pub fn to_prompt_block(&self) -> String {
        let mut out = String::new();
        if let Some(answer) = self.answer.as_deref().filter(|a| !a.trim().is_empty()) {
            out.push_str("Summary: ");
            out.push_str(answer.trim());
            out.push('\n');
        }
        for (idx, s) in self
            .sources
            .iter()
            .filter(|s| !s.snippet.trim().is_empty())
            .enumerate()
        {
            out.push_str(&format!(
                "[{}] {} ({})\n{}\n",
                idx + 1,
                s.title.trim(),
                s.url.trim(),
                s.snippet.trim()
            ));
        }
        out.trim_end().to_string()
    }
}

#[async_trait::async_trait]
pub trait ResearchClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn research(&self, query: &ResearchQuery) -> anyhow::Result<Findings>;
}

/// Stand-in used when no research provider is configured. Every call fails, which the
/// stages treat as "research unavailable".
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledResearch;

#[async_trait::async_trait]
impl ResearchClient for DisabledResearch {
    fn provider_name(&self) -> &'static str {
        "disabled"
    }

    async fn research(&self, _query: &ResearchQuery) -> anyhow::Result<Findings> {
        anyhow::bail!("research capability not configured")
    }
}
