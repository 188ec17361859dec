//! Mapping from physical dataset headers to their business meaning.
//!
//! Headers in the screener exports look like `NSE Code (Ticker symbol on National Stock
//! Exchange of India)`: a short label followed by a parenthesised description. Column names
//! drift between exports, so identity fields are located by label aliases rather than by
//! exact header text.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};

const NAME_ALIASES: &[&str] = &["name", "company name", "company"];
const BSE_ALIASES: &[&str] = &["bse code", "bse", "bse ticker"];
const NSE_ALIASES: &[&str] = &["nse code", "nse", "nse symbol", "nse ticker"];
const INDUSTRY_ALIASES: &[&str] = &["industry", "industry group", "sector"];

/// Explicit header names that take precedence over alias detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverrides {
    pub name: Option<String>,
    pub bse_code: Option<String>,
    pub nse_code: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricColumn {
    pub header: String,
    pub key: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub name: String,
    pub bse_code: String,
    pub nse_code: String,
    pub industry: String,
    pub metrics: Vec<MetricColumn>,
}

impl ColumnMap {
    pub fn detect(headers: &[String], overrides: &ColumnOverrides) -> Result<Self, WorkflowError> {
        let mut missing = Vec::new();

        let mut pick = |field: &'static str, explicit: &Option<String>, aliases: &[&str]| {
            let found = match explicit {
                Some(header) => headers.iter().find(|h| *h == header).cloned(),
                None => find_by_alias(headers, aliases),
            };
            if found.is_none() {
                missing.push(field);
            }
            found.unwrap_or_default()
        };

        let name = pick("name", &overrides.name, NAME_ALIASES);
        let bse_code = pick("bse_code", &overrides.bse_code, BSE_ALIASES);
        let nse_code = pick("nse_code", &overrides.nse_code, NSE_ALIASES);
        let industry = pick("industry", &overrides.industry, INDUSTRY_ALIASES);

        if !missing.is_empty() {
            return Err(WorkflowError::Schema {
                missing,
                available: headers.to_vec(),
            });
        }

        let identity = [&name, &bse_code, &nse_code, &industry];
        let metrics = headers
            .iter()
            .filter(|h| !identity.contains(h))
            .map(|h| MetricColumn {
                header: h.clone(),
                key: metric_key(label(h)),
                description: description(h).map(str::to_string),
            })
            .filter(|m| !m.key.is_empty())
            .collect();

        Ok(Self {
            name,
            bse_code,
            nse_code,
            industry,
            metrics,
        })
    }

    pub fn metric(&self, key: &str) -> Option<&MetricColumn> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

fn find_by_alias(headers: &[String], aliases: &[&str]) -> Option<String> {
    headers
        .iter()
        .find(|h| {
            let l = label(h).to_ascii_lowercase();
            aliases.contains(&l.as_str())
        })
        .cloned()
}

/// Short label of a header: the text before a trailing `(description)`.
pub fn label(header: &str) -> &str {
    let trimmed = header.trim();
    match trimmed.find(" (") {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim(),
        _ => trimmed,
    }
}

/// The parenthesised description of a header, if any.
pub fn description(header: &str) -> Option<&str> {
    let trimmed = header.trim();
    let idx = trimmed.find(" (")?;
    if !trimmed.ends_with(')') {
        return None;
    }
    let inner = trimmed[idx + 2..trimmed.len() - 1].trim();
    (!inner.is_empty()).then_some(inner)
}

/// `Price to Earning` -> `price_to_earning`, `Div + Earning Yield` -> `div_plus_earning_yield`.
pub fn metric_key(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            // `+` carries meaning in screener labels; other punctuation is a separator.
            if c == '+' {
                out.push_str("plus_");
            }
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screener_headers() -> Vec<String> {
        [
            "Name (Company Name as registered on stock exchanges)",
            "BSE Code (Ticker symbol on Bombay Stock Exchange)",
            "NSE Code (Ticker symbol on National Stock Exchange of India)",
            "Industry (Sector or industry classification of the company)",
            "Current Price (Latest market price per share in INR)",
            "Price to Earning (Price-to-Earnings ratio)",
            "Debt to equity",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn detects_identity_columns_from_labels() {
        let headers = screener_headers();
        let map = ColumnMap::detect(&headers, &ColumnOverrides::default()).unwrap();
        assert_eq!(map.name, headers[0]);
        assert_eq!(map.bse_code, headers[1]);
        assert_eq!(map.nse_code, headers[2]);
        assert_eq!(map.industry, headers[3]);

        let keys: Vec<_> = map.metrics.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["current_price", "price_to_earning", "debt_to_equity"]);
        assert_eq!(
            map.metric("price_to_earning").and_then(|m| m.description.as_deref()),
            Some("Price-to-Earnings ratio")
        );
        assert_eq!(map.metric("debt_to_equity").unwrap().description, None);
    }

    #[test]
    fn plain_headers_are_detected_case_insensitively() {
        let headers: Vec<String> = ["company name", "BSE", "nse symbol", "Sector", "P/E"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let map = ColumnMap::detect(&headers, &ColumnOverrides::default()).unwrap();
        assert_eq!(map.name, "company name");
        assert_eq!(map.industry, "Sector");
        assert_eq!(map.metrics[0].key, "p_e");
    }

    #[test]
    fn missing_columns_are_a_schema_error() {
        let headers: Vec<String> = ["Name", "Industry", "Current Price"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = ColumnMap::detect(&headers, &ColumnOverrides::default()).unwrap_err();
        match err {
            WorkflowError::Schema { missing, available } => {
                assert_eq!(missing, vec!["bse_code", "nse_code"]);
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overrides_win_over_aliases_and_must_exist() {
        let mut headers = screener_headers();
        headers.push("Symbol".to_string());
        let overrides = ColumnOverrides {
            nse_code: Some("Symbol".to_string()),
            ..Default::default()
        };
        let map = ColumnMap::detect(&headers, &overrides).unwrap();
        assert_eq!(map.nse_code, "Symbol");
        // The alias-matched NSE column is now just another metric column.
        assert!(map.metric("nse_code").is_some());

        let bad = ColumnOverrides {
            industry: Some("Segment".to_string()),
            ..Default::default()
        };
        assert!(ColumnMap::detect(&screener_headers(), &bad).is_err());
    }

    #[test]
    fn metric_keys_are_snake_case() {
        assert_eq!(metric_key("Return over 1year"), "return_over_1year");
        assert_eq!(metric_key("Div + Earning Yield"), "div_plus_earning_yield");
        assert_eq!(metric_key("Div+Earning Yield"), "div_plus_earning_yield");
        assert_eq!(metric_key("  PEG  "), "peg");
        assert_eq!(label("Name"), "Name");
        assert_eq!(label("CROIC (Cash Return on Invested Capital)"), "CROIC");
    }
}
