use crate::domain::framework::{industry_label, AnalysisFramework};
use crate::domain::recommendation::Recommendation;
use crate::domain::record::CompanyRecord;
use std::fmt::Write;

/// Markdown report for a finished run. The footer names the industry the framework was built for.
pub fn render_report(
    record: &CompanyRecord,
    framework: &AnalysisFramework,
    recommendation: &Recommendation,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "# Stock Analysis Report: {}", record.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Recommendation: {}", recommendation.action);
    // Shortest exact form, never rounded.
    let _ = writeln!(out, "**Confidence Score:** {}/100", recommendation.confidence);
    let target = recommendation
        .target_price
        .map(|p| format!("₹{p:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    let _ = writeln!(out, "**Target Price:** {target}");
    let _ = writeln!(out, "**Time Horizon:** {}", recommendation.time_horizon);
    if framework.degraded {
        let _ = writeln!(
            out,
            "\n> Industry research was unavailable; the framework relies on generic guidance."
        );
    }

    let _ = writeln!(out, "\n## Key Strengths");
    for s in &recommendation.key_strengths {
        let _ = writeln!(out, "- {s}");
    }

    let _ = writeln!(out, "\n## Key Risks");
    for r in &recommendation.key_risks {
        let _ = writeln!(out, "- {r}");
    }

    let _ = writeln!(out, "\n## Analysis Rationale\n{}", recommendation.rationale);
    let _ = writeln!(
        out,
        "\n## Alternative Scenarios\n{}",
        recommendation.alternative_scenarios
    );

    let _ = writeln!(out, "\n---");
    let _ = write!(
        out,
        "*Analysis completed using industry-specific framework for {} sector*",
        industry_label(&framework.industry)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::framework::generic_framework;
    use crate::domain::recommendation::Action;
    use std::collections::BTreeMap;

    fn record() -> CompanyRecord {
        CompanyRecord {
            name: "Angel One".to_string(),
            bse_code: "543235".to_string(),
            nse_code: "ANGELONE".to_string(),
            industry: "Stock Broking".to_string(),
            metrics: BTreeMap::new(),
        }
    }

    fn recommendation(target_price: Option<f64>) -> Recommendation {
        Recommendation {
            action: Action::Hold,
            confidence: 62.5,
            target_price,
            time_horizon: "6-12 months".to_string(),
            key_strengths: vec!["Market share gains".to_string()],
            key_risks: vec!["F&O regulation".to_string(), "Volume cyclicality".to_string()],
            rationale: "Valuation already prices in growth.".to_string(),
            alternative_scenarios: "Regulatory relief would re-rate the stock.".to_string(),
        }
    }

    #[test]
    fn renders_every_recommendation_field_and_industry_footer() {
        let mut framework = generic_framework("Stock Broking", "Angel One");
        framework.degraded = false;
        let md = render_report(&record(), &framework, &recommendation(Some(2600.0)));

        assert!(md.starts_with("# Stock Analysis Report: Angel One\n"));
        assert!(md.contains("## Recommendation: HOLD"));
        assert!(md.contains("**Confidence Score:** 62.5/100"));
        assert!(md.contains("**Target Price:** ₹2600.00"));
        assert!(md.contains("**Time Horizon:** 6-12 months"));
        assert!(md.contains("- Market share gains"));
        assert!(md.contains("- F&O regulation\n- Volume cyclicality"));
        assert!(md.contains("Valuation already prices in growth."));
        assert!(md.contains("Regulatory relief would re-rate the stock."));
        assert!(!md.contains("generic guidance"));
        assert!(md.ends_with(
            "*Analysis completed using industry-specific framework for Stock Broking sector*"
        ));
    }

    #[test]
    fn confidence_is_shown_as_validated_without_rounding() {
        let framework = generic_framework("Stock Broking", "Angel One");
        for (confidence, shown) in [
            (99.95, "**Confidence Score:** 99.95/100"),
            (0.04, "**Confidence Score:** 0.04/100"),
            (72.25, "**Confidence Score:** 72.25/100"),
            (100.0, "**Confidence Score:** 100/100"),
        ] {
            let mut rec = recommendation(Some(2600.0));
            rec.confidence = confidence;
            let md = render_report(&record(), &framework, &rec);
            assert!(md.contains(shown), "{confidence} rendered as: {md}");
        }
    }

    #[test]
    fn missing_target_and_degraded_framework_are_visible() {
        let framework = generic_framework("", "Angel One");
        let mut rec = recommendation(None);
        rec.confidence = 70.0;
        let md = render_report(&record(), &framework, &rec);
        assert!(md.contains("**Target Price:** N/A"));
        assert!(md.contains("**Confidence Score:** 70/100"));
        assert!(md.contains("generic guidance"));
        assert!(md.ends_with("framework for unclassified sector*"));
    }
}
