//! Tickerwatch - price alerts and portfolio valuation for stocks and crypto.
//!
//! Alerts, holdings and the watchlist live in a small key-value store
//! ([`store::FileStore`] on disk or [`store::MemoryStore`]). Quotes come from a
//! [`quotes::QuoteSource`]; the alert monitor evaluates active alerts on a fixed
//! interval and delivers through a [`notify::NotificationSink`].

pub mod alerts;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod notify;
pub mod portfolio;
pub mod quotes;
pub mod scheduler;
pub mod store;
pub mod ui;
pub mod valuation;
pub mod watchlist;

pub use app::{App, AppOptions, Monitoring};
pub use error::{Error, Result};
pub use models::{Direction, Holding, PriceAlert, Quote, QuoteMap, WatchlistItem};
pub use scheduler::CycleOutcome;
pub use valuation::{valuate, Valuation};
