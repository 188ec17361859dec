pub mod columns;
pub mod csv_file;
pub mod pg;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One dataset row: physical column header -> raw cell text.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCase {
    #[default]
    Sensitive,
    Insensitive,
}

impl MatchCase {
    pub fn contains(self, haystack: &str, needle: &str) -> bool {
        match self {
            MatchCase::Sensitive => haystack.contains(needle),
            MatchCase::Insensitive => haystack.to_lowercase().contains(&needle.to_lowercase()),
        }
    }
}

/// Read access to a tabular company dataset.
///
/// Implementations must be safe for concurrent reads; the workflow never writes.
#[async_trait::async_trait]
pub trait CompanyDataset: Send + Sync {
    fn source_name(&self) -> &str;

    /// Physical column headers in source order.
    async fn columns(&self) -> anyhow::Result<Vec<String>>;

    /// Rows whose `column` cell equals `value` exactly, in source order.
    async fn find_exact(&self, column: &str, value: &str) -> anyhow::Result<Vec<Row>>;

    /// Rows whose `column` cell contains `fragment`, in source order.
    async fn find_containing(
        &self,
        column: &str,
        fragment: &str,
        case: MatchCase,
    ) -> anyhow::Result<Vec<Row>>;
}
