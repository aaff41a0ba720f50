//! Valuation export for scripts and spreadsheets.
//!
//! Provides CSV, JSON, and plain text formats.

use crate::valuation::{QuoteStatus, Valuation};

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Csv,
    Json,
}

/// Export a valuation in the specified format.
pub fn export_valuation(valuation: &Valuation, format: ExportFormat) -> String {
    match format {
        ExportFormat::Text => export_text(valuation),
        ExportFormat::Csv => export_csv(valuation),
        ExportFormat::Json => export_json(valuation),
    }
}

/// Export as plain text (screen reader friendly).
fn export_text(valuation: &Valuation) -> String {
    let mut output = String::new();

    output.push_str("PORTFOLIO VALUATION\n");
    output.push_str("===================\n\n");

    for h in &valuation.holdings {
        output.push_str(&format!("Symbol: {}\n", h.symbol));
        output.push_str(&format!("Shares: {}\n", h.shares));
        output.push_str(&format!("Cost Basis: ${:.2}\n", h.purchase_price));
        match h.quote_status {
            QuoteStatus::Live => output.push_str(&format!("Price: ${:.2}\n", h.current_price)),
            QuoteStatus::Missing => output.push_str("Price: unavailable (valued at $0.00)\n"),
        }
        output.push_str(&format!("Market Value: ${:.2}\n", h.market_value));
        output.push_str(&format!("Gain/Loss: {:+.2} ({:+.2}%)\n", h.gain_loss, h.gain_loss_percent));
        output.push('\n');
    }

    output.push_str(&format!("Total Value: ${:.2}\n", valuation.total_value));
    output.push_str(&format!("Total Cost: ${:.2}\n", valuation.total_cost));
    output.push_str(&format!(
        "Total Gain/Loss: {:+.2} ({:+.2}%)\n",
        valuation.total_gain_loss, valuation.total_gain_loss_percent
    ));
    if !valuation.missing_symbols.is_empty() {
        output.push_str(&format!("Missing quotes: {}\n", valuation.missing_symbols.join(", ")));
    }

    output
}

/// Export as CSV, one row per holding plus a TOTAL row.
fn export_csv(valuation: &Valuation) -> String {
    let mut output = String::new();

    output.push_str("Symbol,Shares,CostBasis,Price,MarketValue,CostValue,GainLoss,GainLoss%,Quote\n");

    for h in &valuation.holdings {
        output.push_str(&format!(
            "\"{}\",{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{}\n",
            h.symbol,
            h.shares,
            h.purchase_price,
            h.current_price,
            h.market_value,
            h.cost_value,
            h.gain_loss,
            h.gain_loss_percent,
            match h.quote_status {
                QuoteStatus::Live => "live",
                QuoteStatus::Missing => "missing",
            },
        ));
    }

    output.push_str(&format!(
        "\"TOTAL\",,,,{:.2},{:.2},{:.2},{:.2},\n",
        valuation.total_value,
        valuation.total_cost,
        valuation.total_gain_loss,
        valuation.total_gain_loss_percent,
    ));

    output
}

/// Export as JSON.
fn export_json(valuation: &Valuation) -> String {
    // Valuation is plain numbers and strings; serialization cannot fail.
    let mut output = serde_json::to_string_pretty(valuation).unwrap_or_else(|_| "{}".to_string());
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Holding, Quote, QuoteMap};
    use crate::valuation::valuate;
    use chrono::NaiveDate;

    fn sample() -> Valuation {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let holdings = vec![
            Holding {
                symbol: "AAPL".into(),
                shares: 10.0,
                purchase_price: 100.0,
                purchase_date: date,
            },
            Holding {
                symbol: "GONE".into(),
                shares: 1.0,
                purchase_price: 50.0,
                purchase_date: date,
            },
        ];
        let quotes: QuoteMap = [("AAPL".to_string(), Quote::new("AAPL", 120.0))].into_iter().collect();
        valuate(&holdings, &quotes)
    }

    #[test]
    fn test_export_csv() {
        let csv = export_valuation(&sample(), ExportFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("Symbol,Shares,CostBasis"));
        assert_eq!(lines[1], "\"AAPL\",10,100.00,120.00,1200.00,1000.00,200.00,20.00,live");
        assert!(lines[2].ends_with(",missing"));
        assert!(lines[3].starts_with("\"TOTAL\""));
    }

    #[test]
    fn test_export_json() {
        let json = export_valuation(&sample(), ExportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["totalValue"], 1200.0);
        assert_eq!(value["holdings"][0]["quoteStatus"], "live");
        assert_eq!(value["missingSymbols"][0], "GONE");
    }

    #[test]
    fn test_export_text_mentions_missing_quotes() {
        let text = export_valuation(&sample(), ExportFormat::Text);
        assert!(text.contains("Price: $120.00"));
        assert!(text.contains("Price: unavailable"));
        assert!(text.contains("Missing quotes: GONE"));
    }
}
