//! Free-text company query -> one dataset record.
//!
//! Strategies run in a fixed order and the first hit wins: exact NSE ticker, exact company
//! name, then substring of the company name. Several substring hits are narrowed to one by
//! [`pick_best`].

use crate::dataset::columns::{ColumnMap, ColumnOverrides};
use crate::dataset::{CompanyDataset, MatchCase, Row};
use crate::domain::record::CompanyRecord;
use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    NseTicker,
    ExactName,
    NameContains,
}

impl MatchStrategy {
    pub fn describe(self) -> &'static str {
        match self {
            MatchStrategy::NseTicker => "NSE ticker",
            MatchStrategy::ExactName => "exact company name",
            MatchStrategy::NameContains => "partial company name",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Case handling of the substring strategy. Exact strategies are always case-sensitive.
    pub case: MatchCase,
    pub overrides: ColumnOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCompany {
    pub record: CompanyRecord,
    pub strategy: MatchStrategy,
    /// Rows the winning strategy matched before narrowing to one.
    pub candidates: usize,
}

#[derive(Clone)]
pub struct Resolver {
    dataset: Arc<dyn CompanyDataset>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(dataset: Arc<dyn CompanyDataset>, config: ResolverConfig) -> Self {
        Self { dataset, config }
    }

    pub fn source_name(&self) -> &str {
        self.dataset.source_name()
    }

    /// Reads the dataset header and maps it; fails on a schema mismatch.
    pub async fn column_map(&self) -> Result<ColumnMap, WorkflowError> {
        let headers = self.dataset.columns().await.map_err(WorkflowError::Dataset)?;
        ColumnMap::detect(&headers, &self.config.overrides)
    }

    /// `Ok(None)` means no strategy matched.
    pub async fn resolve(&self, query: &str) -> Result<Option<ResolvedCompany>, WorkflowError> {
        let columns = self.column_map().await?;

        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("empty query; nothing to resolve");
            return Ok(None);
        }

        let by_ticker = self
            .dataset
            .find_exact(&columns.nse_code, query)
            .await
            .map_err(WorkflowError::Dataset)?;
        if !by_ticker.is_empty() {
            return self
                .finish(&columns, by_ticker, MatchStrategy::NseTicker, query)
                .map(Some);
        }

        let by_name = self
            .dataset
            .find_exact(&columns.name, query)
            .await
            .map_err(WorkflowError::Dataset)?;
        if !by_name.is_empty() {
            return self
                .finish(&columns, by_name, MatchStrategy::ExactName, query)
                .map(Some);
        }

        let by_fragment = self
            .dataset
            .find_containing(&columns.name, query, self.config.case)
            .await
            .map_err(WorkflowError::Dataset)?;
        if !by_fragment.is_empty() {
            return self
                .finish(&columns, by_fragment, MatchStrategy::NameContains, query)
                .map(Some);
        }

        tracing::info!(query, source = self.source_name(), "no company matched query");
        Ok(None)
    }

    fn finish(
        &self,
        columns: &ColumnMap,
        rows: Vec<Row>,
        strategy: MatchStrategy,
        query: &str,
    ) -> Result<ResolvedCompany, WorkflowError> {
        let candidates = rows.len();
        let row = match strategy {
            MatchStrategy::NameContains => pick_best(rows, &columns.name, query, self.config.case),
            _ => {
                if candidates > 1 {
                    tracing::warn!(
                        query,
                        candidates,
                        strategy = ?strategy,
                        "exact match is ambiguous; using first row in source order"
                    );
                }
                rows.into_iter().next()
            }
        };

        let Some(row) = row else {
            return Err(WorkflowError::MalformedRow(
                "matched rows vanished while narrowing".to_string(),
            ));
        };

        let record = CompanyRecord::from_row(&row, columns)?;
        tracing::info!(
            query,
            company = %record.name,
            nse_code = %record.nse_code,
            strategy = ?strategy,
            candidates,
            "resolved company"
        );
        Ok(ResolvedCompany {
            record,
            strategy,
            candidates,
        })
    }
}

/// Narrows substring hits to one row. Names that start with the query win; then the
/// shortest name; then lexical order; then source order.
pub fn pick_best(rows: Vec<Row>, name_column: &str, query: &str, case: MatchCase) -> Option<Row> {
    let normalize = |s: &str| match case {
        MatchCase::Sensitive => s.trim().to_string(),
        MatchCase::Insensitive => s.trim().to_lowercase(),
    };
    let query = normalize(query);

    rows.into_iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            let na = a.get(name_column).map(String::as_str).unwrap_or("").trim();
            let nb = b.get(name_column).map(String::as_str).unwrap_or("").trim();
            let pa = !normalize(na).starts_with(&query);
            let pb = !normalize(nb).starts_with(&query);
            (pa, na.chars().count(), na, ia).cmp(&(pb, nb.chars().count(), nb, ib))
        })
        .map(|(_, row)| row)
}
