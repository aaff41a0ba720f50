//! Portfolio valuation against live quotes.
//!
//! Pure arithmetic, no I/O. A holding with no quote is priced at zero (which
//! reads as a 100% loss) and flagged [`QuoteStatus::Missing`] so callers can
//! tell "no data" apart from "worthless".

use crate::models::{Holding, QuoteMap};
use serde::Serialize;

/// Whether a holding was priced from a live quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Live,
    Missing,
}

/// Valuation of a single holding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub symbol: String,
    pub shares: f64,
    pub purchase_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub cost_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    pub quote_status: QuoteStatus,
}

/// Per-holding and aggregate valuation of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub holdings: Vec<HoldingValuation>,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percent: f64,
    /// Symbols valued at zero because no quote was available
    pub missing_symbols: Vec<String>,
}

impl Valuation {
    pub fn is_complete(&self) -> bool {
        self.missing_symbols.is_empty()
    }
}

/// Value `holdings` against `quotes`.
pub fn valuate(holdings: &[Holding], quotes: &QuoteMap) -> Valuation {
    let mut valuation = Valuation::default();

    for holding in holdings {
        let (current_price, quote_status) = match quotes.get(&holding.symbol) {
            Some(quote) => (quote.price, QuoteStatus::Live),
            None => {
                valuation.missing_symbols.push(holding.symbol.clone());
                (0.0, QuoteStatus::Missing)
            }
        };

        let market_value = holding.current_value(current_price);
        let cost_value = holding.total_cost();

        valuation.total_value += market_value;
        valuation.total_cost += cost_value;
        valuation.holdings.push(HoldingValuation {
            symbol: holding.symbol.clone(),
            shares: holding.shares,
            purchase_price: holding.purchase_price,
            current_price,
            market_value,
            cost_value,
            gain_loss: holding.profit_loss(current_price),
            gain_loss_percent: holding.profit_loss_percent(current_price),
            quote_status,
        });
    }

    valuation.total_gain_loss = valuation.total_value - valuation.total_cost;
    valuation.total_gain_loss_percent = if valuation.total_cost > 0.0 {
        valuation.total_gain_loss / valuation.total_cost * 100.0
    } else {
        0.0
    };

    if !valuation.is_complete() {
        tracing::warn!(missing = ?valuation.missing_symbols, "valuing holdings without quotes at zero");
    }
    valuation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quote;
    use chrono::NaiveDate;

    fn holding(symbol: &str, shares: f64, price: f64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            shares,
            purchase_price: price,
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    fn quotes(prices: &[(&str, f64)]) -> QuoteMap {
        prices
            .iter()
            .map(|(s, p)| (s.to_string(), Quote::new(*s, *p)))
            .collect()
    }

    #[test]
    fn test_two_holdings() {
        let holdings = vec![holding("A", 10.0, 100.0), holding("B", 5.0, 200.0)];
        let v = valuate(&holdings, &quotes(&[("A", 120.0), ("B", 180.0)]));

        assert_eq!(v.holdings[0].gain_loss, 200.0);
        assert_eq!(v.holdings[1].gain_loss, -100.0);
        assert!((v.holdings[0].gain_loss_percent - 20.0).abs() < 1e-9);
        assert!((v.holdings[1].gain_loss_percent + 10.0).abs() < 1e-9);
        assert_eq!(v.total_value, 2100.0);
        assert_eq!(v.total_cost, 2000.0);
        assert_eq!(v.total_gain_loss, 100.0);
        assert!((v.total_gain_loss_percent - 5.0).abs() < 1e-9);
        assert!(v.is_complete());
    }

    #[test]
    fn test_empty_portfolio() {
        let v = valuate(&[], &QuoteMap::new());
        assert_eq!(v.total_value, 0.0);
        assert_eq!(v.total_cost, 0.0);
        assert_eq!(v.total_gain_loss, 0.0);
        assert_eq!(v.total_gain_loss_percent, 0.0);
        assert!(v.holdings.is_empty());
    }

    #[test]
    fn test_missing_quote_is_zero_and_flagged() {
        let holdings = vec![holding("A", 10.0, 100.0), holding("B", 1.0, 50.0)];
        let v = valuate(&holdings, &quotes(&[("A", 100.0)]));

        let b = &v.holdings[1];
        assert_eq!(b.current_price, 0.0);
        assert_eq!(b.quote_status, QuoteStatus::Missing);
        assert_eq!(b.gain_loss_percent, -100.0);
        assert_eq!(v.missing_symbols, vec!["B".to_string()]);
        assert_eq!(v.holdings[0].quote_status, QuoteStatus::Live);
    }

    #[test]
    fn test_zero_cost_holding_has_zero_percent() {
        let v = valuate(&[holding("GIFT", 3.0, 0.0)], &quotes(&[("GIFT", 10.0)]));
        assert_eq!(v.holdings[0].gain_loss, 30.0);
        assert_eq!(v.holdings[0].gain_loss_percent, 0.0);
        assert_eq!(v.total_gain_loss_percent, 0.0);
    }
}
