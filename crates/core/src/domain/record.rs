use crate::dataset::columns::ColumnMap;
use crate::dataset::Row;
use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics of the canonical screener export, keyed the way `ColumnMap` keys them.
pub const KNOWN_METRICS: &[(&str, &str)] = &[
    ("current_price", "Latest market price per share in INR"),
    ("price_to_earning", "Price-to-Earnings ratio"),
    ("market_capitalization", "Total market value of outstanding shares in INR"),
    ("earnings_yield", "Annual earnings per share divided by current share price"),
    ("div_plus_earning_yield", "Sum of dividend yield and earnings yield"),
    ("croic", "Cash Return on Invested Capital"),
    ("return_on_assets", "Net income divided by average total assets"),
    ("peg_ratio", "Price/Earnings to Growth ratio"),
    ("npm_last_year", "Net Profit Margin for the most recent fiscal year"),
    (
        "change_in_promoter_holding_3years",
        "Three-year change in percentage points of promoter shareholding",
    ),
    ("sales_growth_3years", "Three-year compound annual growth rate of sales revenue"),
    ("eps_growth_3years", "Three-year compound annual growth rate of earnings per share"),
    ("debt_to_equity", "Total debt divided by shareholders equity"),
    ("dividend_yield", "Annual dividend per share divided by current price"),
    ("dividend_payout_ratio", "Percentage of net income distributed as dividends"),
    ("price_to_book_value", "Market price divided by book value per share"),
    ("pledged_percentage", "Percentage of promoter shares pledged as loan collateral"),
    ("eps_growth_10years", "Ten-year compound annual growth rate of earnings per share"),
    ("return_over_1year", "Total shareholder return including dividends over past 1 year"),
    ("return_over_10years", "Total shareholder return including dividends over past 10 years"),
];

pub fn metric_description(key: &str) -> Option<&'static str> {
    KNOWN_METRICS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, d)| *d)
}

/// One company row. Metrics hold only cells that parsed as finite numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    pub bse_code: String,
    pub nse_code: String,
    pub industry: String,
    pub metrics: BTreeMap<String, f64>,
}

impl CompanyRecord {
    pub fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, WorkflowError> {
        let cell = |header: &str| {
            row.get(header)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let name = cell(&columns.name);
        if name.is_empty() {
            return Err(WorkflowError::MalformedRow(format!(
                "empty {:?} cell",
                columns.name
            )));
        }

        let metrics = columns
            .metrics
            .iter()
            .filter_map(|m| {
                let value = parse_metric(row.get(&m.header)?)?;
                Some((m.key.clone(), value))
            })
            .collect();

        Ok(Self {
            name,
            bse_code: cell(&columns.bse_code),
            nse_code: cell(&columns.nse_code),
            industry: cell(&columns.industry),
            metrics,
        })
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn current_price(&self) -> Option<f64> {
        self.metric("current_price")
    }

    /// Known metrics the row does not carry.
    pub fn missing_known_metrics(&self) -> Vec<&'static str> {
        KNOWN_METRICS
            .iter()
            .map(|(k, _)| *k)
            .filter(|k| !self.metrics.contains_key(*k))
            .collect()
    }
}

/// Parses a screener cell: `1,234.5`, `12.5%`, ` 7 `. Empty or non-numeric cells are absent.
pub fn parse_metric(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::columns::ColumnOverrides;

    fn columns() -> ColumnMap {
        let headers: Vec<String> = [
            "Name (Company Name as registered on stock exchanges)",
            "BSE Code",
            "NSE Code",
            "Industry",
            "Current Price",
            "Price to Earning",
            "PEG Ratio",
            "Debt to equity",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        ColumnMap::detect(&headers, &ColumnOverrides::default()).unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_numeric_cells_and_skips_the_rest() {
        assert_eq!(parse_metric("1,234.5"), Some(1234.5));
        assert_eq!(parse_metric(" 12.5% "), Some(12.5));
        assert_eq!(parse_metric("-3"), Some(-3.0));
        assert_eq!(parse_metric(""), None);
        assert_eq!(parse_metric("n/a"), None);
        assert_eq!(parse_metric("NaN"), None);
        assert_eq!(parse_metric("inf"), None);
    }

    #[test]
    fn builds_record_without_fabricating_metrics() {
        let cols = columns();
        let r = row(&[
            ("Name (Company Name as registered on stock exchanges)", " Reliance Industries "),
            ("BSE Code", "500325"),
            ("NSE Code", "RELIANCE"),
            ("Industry", "Refineries"),
            ("Current Price", "2,950.50"),
            ("Price to Earning", ""),
            ("PEG Ratio", "--"),
        ]);

        let record = CompanyRecord::from_row(&r, &cols).unwrap();
        assert_eq!(record.name, "Reliance Industries");
        assert_eq!(record.nse_code, "RELIANCE");
        assert_eq!(record.current_price(), Some(2950.5));
        assert_eq!(record.metric("price_to_earning"), None);
        assert_eq!(record.metric("peg_ratio"), None);
        assert_eq!(record.metric("debt_to_equity"), None);
        assert_eq!(record.metrics.len(), 1);
        assert!(record.missing_known_metrics().contains(&"price_to_earning"));
        assert!(!record.missing_known_metrics().contains(&"current_price"));
    }

    #[test]
    fn screener_export_covers_every_known_metric() {
        let labels = [
            "Current Price",
            "Price to Earning",
            "Market Capitalization",
            "Earnings yield",
            "Div + Earning Yield",
            "CROIC",
            "Return on assets",
            "PEG Ratio",
            "NPM last year",
            "Change in promoter holding 3Years",
            "Sales growth 3Years",
            "EPS growth 3Years",
            "Debt to equity",
            "Dividend yield",
            "Dividend Payout Ratio",
            "Price to book value",
            "Pledged percentage",
            "EPS growth 10Years",
            "Return over 1year",
            "Return over 10years",
        ];
        let mut headers: Vec<String> = ["Name", "BSE Code", "NSE Code", "Industry"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut cells = vec![
            ("Name".to_string(), "Reliance Industries".to_string()),
            ("BSE Code".to_string(), "500325".to_string()),
            ("NSE Code".to_string(), "RELIANCE".to_string()),
            ("Industry".to_string(), "Refineries".to_string()),
        ];
        for (idx, label) in labels.iter().enumerate() {
            let (key, description) = KNOWN_METRICS[idx];
            let header = format!("{label} ({description})");
            headers.push(header.clone());
            cells.push((header, format!("{}.5", idx + 1)));
            assert_eq!(crate::dataset::columns::metric_key(label), key);
        }

        let cols = ColumnMap::detect(&headers, &ColumnOverrides::default()).unwrap();
        let record = CompanyRecord::from_row(&cells.into_iter().collect(), &cols).unwrap();

        assert_eq!(record.metrics.len(), KNOWN_METRICS.len());
        assert!(record.missing_known_metrics().is_empty());
        assert_eq!(record.metric("div_plus_earning_yield"), Some(5.5));
        assert!(record.metrics.keys().all(|k| metric_description(k).is_some()));
    }

    #[test]
    fn empty_name_is_a_malformed_row() {
        let cols = columns();
        let r = row(&[("NSE Code", "GHOST")]);
        assert!(matches!(
            CompanyRecord::from_row(&r, &cols),
            Err(WorkflowError::MalformedRow(_))
        ));
    }

    #[test]
    fn known_metric_descriptions() {
        assert_eq!(
            metric_description("croic"),
            Some("Cash Return on Invested Capital")
        );
        assert_eq!(metric_description("unknown"), None);
    }
}
