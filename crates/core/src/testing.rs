//! Fakes shared by unit tests.

use crate::dataset::csv_file::CsvDataset;
use crate::dataset::{CompanyDataset, MatchCase, Row};
use crate::llm::{Provider, StructuredGenerator, StructuredRequest};
use crate::research::{Findings, ResearchClient, ResearchQuery, Source};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SAMPLE_CSV: &str = "\
Name (Company Name as registered on stock exchanges),BSE Code (Ticker symbol on Bombay Stock Exchange),NSE Code (Ticker symbol on National Stock Exchange of India),Industry (Sector or industry classification of the company),Current Price (Latest market price per share in INR),Price to Earning (Price-to-Earnings ratio),Debt to equity (Total debt divided by shareholders equity),Pledged percentage (Percentage of promoter shares pledged as loan collateral)
Reliance Industries,500325,RELIANCE,Refineries,2950.5,28.4,0.44,0
Angel One,543235,ANGELONE,Stock Broking,2410,17.9,,
Tata Steel,500470,TATASTEEL,Steel,152.3,n/a,1.02,0
";

pub fn sample_dataset() -> CsvDataset {
    CsvDataset::from_reader("sample.csv", SAMPLE_CSV.as_bytes()).expect("sample CSV parses")
}

/// Wraps a dataset and counts lookups per strategy.
pub struct CountingDataset<D> {
    inner: D,
    exact: AtomicUsize,
    containing: AtomicUsize,
}

impl<D> CountingDataset<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            exact: AtomicUsize::new(0),
            containing: AtomicUsize::new(0),
        }
    }

    pub fn exact_calls(&self) -> usize {
        self.exact.load(Ordering::SeqCst)
    }

    pub fn containing_calls(&self) -> usize {
        self.containing.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<D: CompanyDataset> CompanyDataset for CountingDataset<D> {
    fn source_name(&self) -> &str {
        self.inner.source_name()
    }

    async fn columns(&self) -> anyhow::Result<Vec<String>> {
        self.inner.columns().await
    }

    async fn find_exact(&self, column: &str, value: &str) -> anyhow::Result<Vec<Row>> {
        self.exact.fetch_add(1, Ordering::SeqCst);
        self.inner.find_exact(column, value).await
    }

    async fn find_containing(
        &self,
        column: &str,
        fragment: &str,
        case: MatchCase,
    ) -> anyhow::Result<Vec<Row>> {
        self.containing.fetch_add(1, Ordering::SeqCst);
        self.inner.find_containing(column, fragment, case).await
    }
}

/// Dataset whose lookups always fail, for I/O error paths.
pub struct BrokenDataset;

#[async_trait::async_trait]
impl CompanyDataset for BrokenDataset {
    fn source_name(&self) -> &str {
        "broken"
    }

    async fn columns(&self) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("connection refused")
    }

    async fn find_exact(&self, _column: &str, _value: &str) -> anyhow::Result<Vec<Row>> {
        anyhow::bail!("connection refused")
    }

    async fn find_containing(
        &self,
        _column: &str,
        _fragment: &str,
        _case: MatchCase,
    ) -> anyhow::Result<Vec<Row>> {
        anyhow::bail!("connection refused")
    }
}

pub fn framework_json() -> Value {
    json!({
        "industry_context": "Refining margins are recovering after a weak year.",
        "company_context": "Integrated refiner with retail and telecom arms.",
        "analysis_framework": "Sum-of-the-parts with segment multiples.",
        "key_metrics_focus": "GRMs, EV/EBITDA, debt to equity.",
        "risk_factors": "Crude volatility, regulatory windfall taxes.",
        "meta_prompt": "Value each segment separately and weigh refining cyclicality."
    })
}

pub fn recommendation_json(confidence: f64) -> Value {
    json!({
        "recommendation": "BUY",
        "confidence_score": confidence,
        "target_price": 3300.0,
        "time_horizon": "12-18 months",
        "key_strengths": ["Diversified cash flows", "Low leverage"],
        "key_risks": ["Refining downcycle"],
        "rationale": "P/E of 28.4 is in line with peers while leverage is modest at 0.44.",
        "alternative_scenarios": "A sharp crude spike would pressure margins."
    })
}

/// Scripted generator keyed by schema name. Missing scripts fail like a provider error.
pub struct FakeGenerator {
    responses: HashMap<&'static str, anyhow::Result<Value>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<StructuredRequest>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Valid framework and a BUY recommendation with the given confidence.
    pub fn happy(confidence: f64) -> Self {
        Self::new()
            .respond("emit_framework", framework_json())
            .respond("emit_recommendation", recommendation_json(confidence))
    }

    pub fn respond(mut self, schema: &'static str, value: Value) -> Self {
        self.responses.insert(schema, Ok(value));
        self
    }

    pub fn fail(mut self, schema: &'static str, message: &'static str) -> Self {
        self.responses.insert(schema, Err(anyhow::anyhow!(message)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<StructuredRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait::async_trait]
impl StructuredGenerator for FakeGenerator {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, request: StructuredRequest) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let schema = request.schema.name;
        self.requests.lock().expect("requests lock").push(request);
        match self.responses.get(schema) {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
            None => anyhow::bail!("no scripted response for {schema}"),
        }
    }
}

pub struct FakeResearch {
    fail: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<ResearchQuery>>,
}

impl FakeResearch {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<ResearchQuery> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait::async_trait]
impl ResearchClient for FakeResearch {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn research(&self, query: &ResearchQuery) -> anyhow::Result<Findings> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("queries lock")
            .push(query.clone());
        if self.fail {
            anyhow::bail!("search backend unreachable");
        }
        Ok(Findings {
            answer: Some(format!("Findings for: {}", query.question)),
            sources: vec![Source {
                title: "Sector note".to_string(),
                url: "https://example.com/note".to_string(),
                snippet: "Demand steady; margins normalising.".to_string(),
            }],
        })
    }
}
