use crate::dataset::{CompanyDataset, MatchCase, Row};
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// A CSV export loaded into memory once and scanned in file order.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    source: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl CsvDataset {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open dataset CSV {}", path.display()))?;
        let dataset = Self::from_reader(path.display().to_string(), file)?;
        tracing::info!(
            source = %dataset.source,
            rows = dataset.rows.len(),
            columns = dataset.headers.len(),
            "loaded CSV dataset"
        );
        Ok(dataset)
    }

    pub fn from_reader(source: impl Into<String>, reader: impl Read) -> anyhow::Result<Self> {
        let source = source.into();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read CSV headers from {source}"))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("malformed CSV record {} in {source}", idx + 1))?;
            // Short rows leave trailing cells empty rather than dropping them.
            let row: Row = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
                .collect();
            rows.push(row);
        }

        Ok(Self {
            source,
            headers,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn scan<F>(&self, column: &str, mut pred: F) -> anyhow::Result<Vec<Row>>
    where
        F: FnMut(&str) -> bool,
    {
        anyhow::ensure!(
            self.headers.iter().any(|h| h == column),
            "unknown column {column:?} in {}",
            self.source
        );
        Ok(self
            .rows
            .iter()
            .filter(|row| row.get(column).is_some_and(|cell| pred(cell)))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl CompanyDataset for CsvDataset {
    fn source_name(&self) -> &str {
        &self.source
    }

    async fn columns(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.headers.clone())
    }

    async fn find_exact(&self, column: &str, value: &str) -> anyhow::Result<Vec<Row>> {
        self.scan(column, |cell| cell.trim() == value)
    }

    async fn find_containing(
        &self,
        column: &str,
        fragment: &str,
        case: MatchCase,
    ) -> anyhow::Result<Vec<Row>> {
        self.scan(column, |cell| case.contains(cell, fragment))
    }
}
