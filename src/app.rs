//! Application wiring: stores, quote source and sink built from config.

use crate::alerts::AlertStore;
use crate::config::Config;
use crate::error::Result;
use crate::models::{Direction, NewAlert, NewHolding, PriceAlert};
use crate::notify::{ConsoleSink, NotificationSink};
use crate::portfolio::{AddOutcome, PortfolioLedger};
use crate::quotes::{fetch_with_timeout, QuoteSource, YahooFinanceClient};
use crate::scheduler::{AlertMonitor, CycleOutcome, MonitorSettings, PeriodicTask, QuoteTicker};
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::valuation::{valuate, Valuation};
use crate::watchlist::Watchlist;
use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub data_dir: Option<PathBuf>,
    pub ephemeral: bool,
    pub timeout: Option<u64>,
    pub bell: bool,
}

/// Running background loops started by [`App::start_monitoring`].
pub struct Monitoring<Q> {
    pub ticker: Arc<QuoteTicker<Arc<Q>>>,
    alert_task: PeriodicTask,
    ticker_task: PeriodicTask,
}

impl<Q> Monitoring<Q> {
    pub async fn stop(self) {
        self.alert_task.stop().await;
        self.ticker_task.stop().await;
    }
}

/// The engine with everything wired up.
///
/// Manual checks and the background loop share one [`AlertMonitor`], so a
/// check issued while a scheduled cycle is in flight is skipped.
pub struct App<Q> {
    pub alerts: Arc<AlertStore>,
    pub ledger: Arc<PortfolioLedger>,
    pub watchlist: Arc<Watchlist>,
    source: Arc<Q>,
    monitor: Arc<AlertMonitor<Arc<Q>, Arc<dyn NotificationSink>>>,
    settings: MonitorSettings,
    ticker_interval: Duration,
}

impl App<YahooFinanceClient> {
    /// Build the app against Yahoo Finance and the configured data directory.
    pub fn from_config(config: &Config, options: &AppOptions) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = if options.ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            let dir = options
                .data_dir
                .clone()
                .or_else(|| config.general.data_dir.clone())
                .or_else(FileStore::default_dir)
                .context("Could not determine a data directory; pass --data-dir")?;
            let store = FileStore::new(dir);
            tracing::debug!(dir = %store.dir().display(), "using file store");
            Arc::new(store)
        };

        let client = YahooFinanceClient::new(options.timeout.unwrap_or(config.general.timeout))
            .context("Failed to create HTTP client")?;
        let sink = ConsoleSink::new(options.bell || config.notifications.bell);

        Self::with_parts(config, store, client, Arc::new(sink))
    }
}

impl<Q: QuoteSource + 'static> App<Q> {
    pub fn with_parts(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        source: Q,
        sink: Arc<dyn NotificationSink>,
    ) -> anyhow::Result<Self> {
        let seed = config.seed_holdings()?;
        let alerts = Arc::new(AlertStore::new(store.clone()));
        let source = Arc::new(source);
        let settings = MonitorSettings {
            interval: config.polling.alert_interval,
            fetch_timeout: config.polling.fetch_timeout,
            notification_ms: config.notifications.duration_ms,
        };
        let monitor = Arc::new(AlertMonitor::new(alerts.clone(), source.clone(), sink, settings));

        Ok(Self {
            alerts,
            ledger: Arc::new(PortfolioLedger::new(store.clone(), seed)),
            watchlist: Arc::new(Watchlist::new(store)),
            source,
            monitor,
            settings,
            ticker_interval: config.polling.ticker_interval,
        })
    }

    pub fn add_alert(&self, symbol: &str, direction: Direction, target_price: f64) -> Result<PriceAlert> {
        self.alerts.add(NewAlert::new(symbol, target_price, direction)?)
    }

    pub fn add_holding(
        &self,
        symbol: &str,
        shares: f64,
        purchase_price: f64,
        purchase_date: NaiveDate,
    ) -> Result<AddOutcome> {
        self.ledger
            .add(NewHolding::new(symbol, shares, purchase_price, purchase_date)?)
    }

    /// Value the current portfolio against fresh quotes.
    pub async fn valuation(&self) -> Result<Valuation> {
        let holdings = self.ledger.list()?;
        if holdings.is_empty() {
            return Ok(valuate(&holdings, &Default::default()));
        }
        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let quotes = fetch_with_timeout(&self.source, &symbols, self.settings.fetch_timeout).await?;
        Ok(valuate(&holdings, &quotes))
    }

    /// Run a single alert evaluation pass now.
    pub async fn check_alerts(&self) -> CycleOutcome {
        self.monitor.run_cycle().await
    }

    /// Start the alert monitor and the quote ticker on their own timers.
    pub fn start_monitoring(&self) -> Monitoring<Q> {
        let ticker = Arc::new(QuoteTicker::new(
            self.source.clone(),
            self.watchlist.clone(),
            self.ledger.clone(),
            self.settings.fetch_timeout,
        ));

        tracing::info!(
            alert_interval = %humantime::format_duration(self.settings.interval),
            ticker_interval = %humantime::format_duration(self.ticker_interval),
            "monitoring started"
        );

        Monitoring {
            alert_task: self.monitor.start(),
            ticker_task: ticker.start(self.ticker_interval),
            ticker,
        }
    }
}
