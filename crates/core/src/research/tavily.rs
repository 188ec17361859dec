use crate::config::Settings;
use crate::research::{Findings, ResearchClient, ResearchQuery, Source};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESULTS: u32 = 5;
const DEFAULT_SEARCH_DEPTH: &str = "advanced";

#[derive(Debug, Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    search_depth: String,
    max_results: u32,
}

impl TavilyClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_tavily_api_key()?.to_string();
        let base_url =
            std::env::var("TAVILY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let search_depth = std::env::var("TAVILY_SEARCH_DEPTH")
            .ok()
            .filter(|s| matches!(s.as_str(), "basic" | "advanced"))
            .unwrap_or_else(|| DEFAULT_SEARCH_DEPTH.to_string());

        let max_results = std::env::var("TAVILY_MAX_RESULTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| (1..=20).contains(n))
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let timeout_secs = std::env::var("TAVILY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build Tavily http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            search_depth,
            max_results,
        })
    }

    fn url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    fn body<'a>(&'a self, query: &ResearchQuery) -> SearchRequest<'a> {
        SearchRequest {
            query: query.search_text(),
            search_depth: &self.search_depth,
            max_results: self.max_results,
            include_answer: true,
        }
    }
}

#[async_trait::async_trait]
impl ResearchClient for TavilyClient {
    fn provider_name(&self) -> &'static str {
        "tavily"
    }

    async fn research(&self, query: &ResearchQuery) -> Result<Findings> {
        let res = self
            .http
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&self.body(query))
            .send()
            .await
            .context("Tavily request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Tavily response")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .map(|v| v.to_string())
                .unwrap_or(text);
            anyhow::bail!("Tavily HTTP {status}: {detail}");
        }

        let parsed = serde_json::from_str::<SearchResponse>(&text)
            .with_context(|| format!("failed to parse Tavily response: {text}"))?;
        Ok(parsed.into_findings())
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchRequest<'a> {
    query: String,
    search_depth: &'a str,
    max_results: u32,
    include_answer: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchResponse {
    fn into_findings(self) -> Findings {
        Findings {
            answer: self.answer.filter(|a| !a.trim().is_empty()),
            sources: self
                .results
                .into_iter()
                .map(|r| Source {
                    title: r.title,
                    url: r.url,
                    snippet: r.content,
                })
                .collect(),
        }
    }
}
