//! Tracked symbols with free-text notes.

use crate::error::Result;
use crate::models::{normalize_symbol, WatchlistItem};
use crate::store::{keys, Collection, KeyValueStore, Versioned};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

impl Versioned for Vec<WatchlistItem> {
    fn check(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for item in self {
            normalize_symbol(&item.symbol).map_err(|e| e.to_string())?;
            if !seen.insert(item.symbol.as_str()) {
                return Err(format!("duplicate watchlist entry {}", item.symbol));
            }
        }
        Ok(())
    }
}

pub struct Watchlist {
    items: Collection<Vec<WatchlistItem>>,
}

impl Watchlist {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            items: Collection::new(store, keys::WATCHLIST),
        }
    }

    /// Start tracking `symbol`. Returns `false` if it was already tracked.
    pub fn add(&self, symbol: &str, notes: Option<String>) -> Result<bool> {
        let symbol = normalize_symbol(symbol)?;
        let added = self.items.update(Vec::new, |items| {
            if items.iter().any(|i| i.symbol == symbol) {
                return false;
            }
            items.push(WatchlistItem {
                symbol: symbol.clone(),
                added_at: Utc::now(),
                notes,
            });
            true
        })?;
        if added {
            tracing::info!(%symbol, "symbol added to watchlist");
        }
        Ok(added)
    }

    pub fn remove(&self, symbol: &str) -> Result<bool> {
        let symbol = normalize_symbol(symbol)?;
        Ok(self.items.update(Vec::new, |items| {
            let before = items.len();
            items.retain(|i| i.symbol != symbol);
            items.len() != before
        })?)
    }

    /// Replace the notes on an entry. `None` clears them.
    pub fn set_notes(&self, symbol: &str, notes: Option<String>) -> Result<Option<WatchlistItem>> {
        let symbol = normalize_symbol(symbol)?;
        Ok(self.items.update(Vec::new, |items| {
            items.iter_mut().find(|i| i.symbol == symbol).map(|item| {
                item.notes = notes;
                item.clone()
            })
        })?)
    }

    pub fn list(&self) -> Result<Vec<WatchlistItem>> {
        Ok(self.items.load()?.unwrap_or_default())
    }

    pub fn symbols(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|i| i.symbol).collect())
    }
}
