//! Data models for quotes, price alerts, holdings and the watchlist.

use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Latest quotes keyed by symbol. Absent entries mean "unknown".
pub type QuoteMap = HashMap<String, Quote>;

/// A current market quote for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol (e.g., "AAPL", "BTC-USD")
    pub symbol: String,
    /// Full name of the security, when the source reports one
    #[serde(default)]
    pub name: Option<String>,
    /// Current price
    pub price: f64,
    /// Price change from previous close
    #[serde(default)]
    pub change: f64,
    /// Percentage change from previous close
    #[serde(default)]
    pub change_percent: f64,
    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Quote carrying only a price, stamped now.
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            price,
            change: 0.0,
            change_percent: 0.0,
            timestamp: Utc::now(),
        }
    }
}

/// Trim and uppercase a ticker, rejecting empty input.
pub fn normalize_symbol(symbol: &str) -> Result<String, ValidationError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }
    Ok(symbol.to_ascii_uppercase())
}

/// Which way the price has to cross the target for an alert to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    /// Whether `price` satisfies this direction against `target`.
    pub fn is_crossed(self, price: f64, target: f64) -> bool {
        match self {
            Direction::Above => price >= target,
            Direction::Below => price <= target,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Above => write!(f, "above"),
            Direction::Below => write!(f, "below"),
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            _ => Err(ValidationError::UnknownDirection(s.to_string())),
        }
    }
}

/// A user-defined price threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: String,
    pub symbol: String,
    pub target_price: f64,
    pub direction: Direction,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a [`PriceAlert`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub(crate) symbol: String,
    pub(crate) target_price: f64,
    pub(crate) direction: Direction,
}

impl NewAlert {
    pub fn new(symbol: &str, target_price: f64, direction: Direction) -> Result<Self, ValidationError> {
        let symbol = normalize_symbol(symbol)?;
        if !target_price.is_finite() || target_price <= 0.0 {
            return Err(ValidationError::InvalidPrice(target_price));
        }
        Ok(Self {
            symbol,
            target_price,
            direction,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// One portfolio line item: aggregated shares at a weighted-average cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Ticker symbol
    pub symbol: String,
    /// Number of shares/units held
    pub shares: f64,
    /// Weighted-average cost basis per share
    pub purchase_price: f64,
    /// Date of the original lot
    pub purchase_date: NaiveDate,
}

impl Holding {
    /// Calculate total cost of the holding.
    pub fn total_cost(&self) -> f64 {
        self.shares * self.purchase_price
    }

    /// Calculate current value given current price.
    pub fn current_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    /// Calculate profit/loss given current price.
    pub fn profit_loss(&self, price: f64) -> f64 {
        self.current_value(price) - self.total_cost()
    }

    /// Calculate profit/loss percentage given current price.
    pub fn profit_loss_percent(&self, price: f64) -> f64 {
        let cost = self.total_cost();
        if cost > 0.0 {
            (self.profit_loss(price) / cost) * 100.0
        } else {
            0.0
        }
    }

    /// Fold another lot into this holding at a share-weighted average cost.
    /// The original purchase date is kept.
    pub fn merge(&mut self, lot: &NewHolding) {
        let shares = self.shares + lot.shares;
        self.purchase_price = (self.total_cost() + lot.shares * lot.purchase_price) / shares;
        self.shares = shares;
    }
}

/// Validated input for adding shares to the portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHolding {
    pub(crate) symbol: String,
    pub(crate) shares: f64,
    pub(crate) purchase_price: f64,
    pub(crate) purchase_date: NaiveDate,
}

impl NewHolding {
    pub fn new(
        symbol: &str,
        shares: f64,
        purchase_price: f64,
        purchase_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let symbol = normalize_symbol(symbol)?;
        if !shares.is_finite() || shares <= 0.0 {
            return Err(ValidationError::InvalidShares(shares));
        }
        if !purchase_price.is_finite() || purchase_price < 0.0 {
            return Err(ValidationError::InvalidPrice(purchase_price));
        }
        Ok(Self {
            symbol,
            shares,
            purchase_price,
            purchase_date,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl From<NewHolding> for Holding {
    fn from(lot: NewHolding) -> Self {
        Holding {
            symbol: lot.symbol,
            shares: lot.shares,
            purchase_price: lot.purchase_price,
            purchase_date: lot.purchase_date,
        }
    }
}

/// Ordered holdings plus the time of the last mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub last_updated: DateTime<Utc>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self {
            holdings,
            last_updated: Utc::now(),
        }
    }
}

/// A tracked symbol with optional notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub symbol: String,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(symbol: &str, shares: f64, price: f64) -> NewHolding {
        NewHolding::new(symbol, shares, price, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()).unwrap()
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("above".parse::<Direction>().unwrap(), Direction::Above);
        assert_eq!(" BELOW ".parse::<Direction>().unwrap(), Direction::Below);
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(ValidationError::UnknownDirection(_))
        ));
    }

    #[test]
    fn test_direction_crossing_is_inclusive() {
        assert!(Direction::Above.is_crossed(100.0, 100.0));
        assert!(Direction::Below.is_crossed(100.0, 100.0));
        assert!(!Direction::Above.is_crossed(99.99, 100.0));
        assert!(!Direction::Below.is_crossed(100.01, 100.0));
    }

    #[test]
    fn test_new_alert_validation() {
        let alert = NewAlert::new(" aapl ", 150.0, Direction::Above).unwrap();
        assert_eq!(alert.symbol(), "AAPL");
        assert_eq!(NewAlert::new("", 1.0, Direction::Above), Err(ValidationError::EmptySymbol));
        assert!(matches!(
            NewAlert::new("AAPL", f64::NAN, Direction::Above),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert!(matches!(
            NewAlert::new("AAPL", -5.0, Direction::Below),
            Err(ValidationError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_new_holding_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(matches!(
            NewHolding::new("MSFT", 0.0, 10.0, date),
            Err(ValidationError::InvalidShares(_))
        ));
        assert!(matches!(
            NewHolding::new("MSFT", 1.0, f64::INFINITY, date),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert!(NewHolding::new("MSFT", 1.0, 0.0, date).is_ok());
    }

    #[test]
    fn test_holding_profit_loss() {
        let holding: Holding = lot("AAPL", 10.0, 100.0).into();
        assert_eq!(holding.total_cost(), 1000.0);
        assert_eq!(holding.current_value(120.0), 1200.0);
        assert_eq!(holding.profit_loss(120.0), 200.0);
        assert!((holding.profit_loss_percent(120.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_profit_loss_percent_zero_cost() {
        let holding: Holding = lot("GIFT", 5.0, 0.0).into();
        assert_eq!(holding.profit_loss_percent(10.0), 0.0);
    }

    #[test]
    fn test_merge_weighted_average_keeps_date() {
        let mut holding: Holding = lot("AAPL", 10.0, 100.0).into();
        let later = NewHolding::new("AAPL", 10.0, 200.0, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).unwrap();
        holding.merge(&later);
        assert_eq!(holding.shares, 20.0);
        assert_eq!(holding.purchase_price, 150.0);
        assert_eq!(holding.purchase_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_alert_serializes_camel_case() {
        let alert = PriceAlert {
            id: "abc".to_string(),
            symbol: "TSLA".to_string(),
            target_price: 250.0,
            direction: Direction::Below,
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["targetPrice"], 250.0);
        assert_eq!(json["direction"], "below");
        assert_eq!(json["isActive"], true);
    }
}
