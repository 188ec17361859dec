pub mod dataset;
pub mod domain;
pub mod error;
pub mod llm;
pub mod research;
pub mod resolver;
pub mod stages;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub mod config {
    use anyhow::Context;

    use crate::dataset::columns::ColumnOverrides;
    use crate::dataset::MatchCase;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub dataset_csv_path: Option<String>,
        pub dataset_table: Option<String>,
        pub dataset_case_insensitive: bool,
        pub column_overrides: ColumnOverrides,
        pub llm_provider: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub openai_api_key: Option<String>,
        pub tavily_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                dataset_csv_path: non_empty_var("DATASET_CSV_PATH"),
                dataset_table: non_empty_var("DATASET_TABLE"),
                dataset_case_insensitive: std::env::var("DATASET_CASE_INSENSITIVE")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
                column_overrides: ColumnOverrides {
                    name: non_empty_var("DATASET_COLUMN_NAME"),
                    bse_code: non_empty_var("DATASET_COLUMN_BSE"),
                    nse_code: non_empty_var("DATASET_COLUMN_NSE"),
                    industry: non_empty_var("DATASET_COLUMN_INDUSTRY"),
                },
                llm_provider: non_empty_var("LLM_PROVIDER"),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                tavily_api_key: non_empty_var("TAVILY_API_KEY"),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_tavily_api_key(&self) -> anyhow::Result<&str> {
            self.tavily_api_key
                .as_deref()
                .context("TAVILY_API_KEY is required")
        }

        pub fn match_case(&self) -> MatchCase {
            if self.dataset_case_insensitive {
                MatchCase::Insensitive
            } else {
                MatchCase::Sensitive
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parse_flag(value: &str) -> bool {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

}
