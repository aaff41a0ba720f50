//! Holdings ledger with merge-on-add.

use crate::error::Result;
use crate::models::{Holding, NewHolding, Portfolio};
use crate::store::{keys, Collection, KeyValueStore, Versioned};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

impl Versioned for Portfolio {
    /// Early versions persisted the bare holdings array.
    fn from_legacy(value: Value) -> std::result::Result<Self, serde_json::Error> {
        match value {
            Value::Array(_) => Ok(Portfolio::new(serde_json::from_value(value)?)),
            other => serde_json::from_value(other),
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for holding in &self.holdings {
            if !seen.insert(holding.symbol.as_str()) {
                return Err(format!("duplicate holding for {}", holding.symbol));
            }
            NewHolding::new(
                &holding.symbol,
                holding.shares,
                holding.purchase_price,
                holding.purchase_date,
            )
            .map_err(|e| format!("holding {}: {}", holding.symbol, e))?;
        }
        Ok(())
    }
}

/// What [`PortfolioLedger::add`] did with the lot.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// First lot of a new symbol.
    Inserted(Holding),
    /// Folded into an existing holding.
    Merged(Holding),
}

impl AddOutcome {
    pub fn holding(&self) -> &Holding {
        match self {
            AddOutcome::Inserted(h) | AddOutcome::Merged(h) => h,
        }
    }
}

/// Write-through holdings ledger. At most one holding per symbol.
pub struct PortfolioLedger {
    portfolio: Collection<Portfolio>,
    seed: Vec<Holding>,
}

impl PortfolioLedger {
    /// `seed` is what the ledger holds until something is persisted.
    pub fn new(store: Arc<dyn KeyValueStore>, seed: Vec<Holding>) -> Self {
        Self {
            portfolio: Collection::new(store, keys::PORTFOLIO),
            seed,
        }
    }

    /// Add shares, merging into an existing holding of the same symbol at a
    /// share-weighted average cost.
    pub fn add(&self, lot: NewHolding) -> Result<AddOutcome> {
        let outcome = self.portfolio.update(
            || Portfolio::new(self.seed.clone()),
            |portfolio| {
                let position = portfolio.holdings.iter().position(|h| h.symbol == lot.symbol);
                let outcome = match position {
                    Some(index) => {
                        let existing = &mut portfolio.holdings[index];
                        existing.merge(&lot);
                        AddOutcome::Merged(existing.clone())
                    }
                    None => {
                        let holding = Holding::from(lot);
                        portfolio.holdings.push(holding.clone());
                        AddOutcome::Inserted(holding)
                    }
                };
                portfolio.last_updated = Utc::now();
                outcome
            },
        )?;

        let holding = outcome.holding();
        tracing::info!(
            symbol = %holding.symbol,
            shares = holding.shares,
            cost_basis = holding.purchase_price,
            merged = matches!(outcome, AddOutcome::Merged(_)),
            "holding added"
        );
        Ok(outcome)
    }

    /// Drop every share of `symbol`. Returns `false` if it was not held.
    pub fn remove(&self, symbol: &str) -> Result<bool> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let removed = self.portfolio.update(
            || Portfolio::new(self.seed.clone()),
            |portfolio| {
                let before = portfolio.holdings.len();
                portfolio.holdings.retain(|h| h.symbol != symbol);
                let removed = portfolio.holdings.len() != before;
                if removed {
                    portfolio.last_updated = Utc::now();
                }
                removed
            },
        )?;
        if removed {
            tracing::info!(%symbol, "holding removed");
        }
        Ok(removed)
    }

    pub fn portfolio(&self) -> Result<Portfolio> {
        Ok(self
            .portfolio
            .load()?
            .unwrap_or_else(|| Portfolio::new(self.seed.clone())))
    }

    pub fn list(&self) -> Result<Vec<Holding>> {
        Ok(self.portfolio()?.holdings)
    }

    pub fn symbols(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|h| h.symbol).collect())
    }
}
