//! Background polling: the alert monitor and the live-quote ticker.
//!
//! Both run on [`PeriodicTask`], which owns its timer and stops on request.
//! Each loop awaits its own cycle, so cycles of one task never overlap, and a
//! stop request drops the cycle in flight (including its pending fetch).

use crate::alerts::{evaluate, AlertStore};
use crate::models::QuoteMap;
use crate::notify::{NotificationSink, DEFAULT_DURATION_MS};
use crate::portfolio::PortfolioLedger;
use crate::quotes::{fetch_with_timeout, QuoteSource};
use crate::watchlist::Watchlist;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Default alert polling period.
pub const ALERT_INTERVAL: Duration = Duration::from_secs(60);
/// Default display ticker period.
pub const TICKER_INTERVAL: Duration = Duration::from_secs(30);
/// Default bound on a single quote fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A spawned loop that runs a job immediately and then every `period`.
///
/// Dropping the handle without calling [`stop`](Self::stop) also ends the
/// loop, at its next wake-up.
pub struct PeriodicTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(task = name, ?period, "periodic task started");

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = job() => {}
                }
            }

            tracing::debug!(task = name, "periodic task stopped");
        });

        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(task = self.name, error = %e, "periodic task panicked");
        }
    }
}

/// Resets the in-flight flag when a cycle finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then(|| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Alert monitor timing.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub notification_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: ALERT_INTERVAL,
            fetch_timeout: FETCH_TIMEOUT,
            notification_ms: DEFAULT_DURATION_MS,
        }
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A previous cycle was still running.
    Skipped,
    /// Nothing to check; no fetch was made.
    NoActiveAlerts,
    /// The alert store could not be read.
    StoreUnavailable,
    /// The quote fetch failed or timed out.
    FetchFailed,
    /// Quotes were evaluated and `triggered` notifications sent.
    Evaluated { triggered: usize },
}

/// Polls quotes for active alerts and notifies on every alert whose
/// condition holds.
pub struct AlertMonitor<Q, N> {
    alerts: Arc<AlertStore>,
    source: Q,
    sink: N,
    settings: MonitorSettings,
    in_flight: AtomicBool,
}

impl<Q, N> AlertMonitor<Q, N>
where
    Q: QuoteSource + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(alerts: Arc<AlertStore>, source: Q, sink: N, settings: MonitorSettings) -> Self {
        Self {
            alerts,
            source,
            sink,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one fetch-and-evaluate pass.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("previous alert cycle still running, skipping");
            return CycleOutcome::Skipped;
        };

        let symbols: Vec<String> = match self.alerts.active() {
            Ok(active) if active.is_empty() => {
                tracing::debug!("no active alerts");
                return CycleOutcome::NoActiveAlerts;
            }
            Ok(active) => active
                .into_iter()
                .map(|a| a.symbol)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read alerts");
                return CycleOutcome::StoreUnavailable;
            }
        };

        let quotes = match fetch_with_timeout(&self.source, &symbols, self.settings.fetch_timeout).await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(error = %e, symbols = symbols.len(), "alert quote fetch failed");
                return CycleOutcome::FetchFailed;
            }
        };

        // Re-read so alerts toggled or removed during the fetch are honored.
        let active = match self.alerts.active() {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(error = %e, "could not read alerts");
                return CycleOutcome::StoreUnavailable;
            }
        };

        let triggered = evaluate(&active, &quotes);
        for hit in &triggered {
            tracing::info!(
                id = %hit.alert.id,
                symbol = %hit.alert.symbol,
                target = hit.alert.target_price,
                price = hit.price,
                "alert triggered"
            );
            self.sink
                .notify(hit.notification().with_duration(self.settings.notification_ms));
        }

        tracing::debug!(
            checked = active.len(),
            quoted = quotes.len(),
            triggered = triggered.len(),
            "alert cycle complete"
        );
        CycleOutcome::Evaluated {
            triggered: triggered.len(),
        }
    }

    /// Run a cycle now and then every configured interval until stopped.
    pub fn start(self: &Arc<Self>) -> PeriodicTask {
        let monitor = Arc::clone(self);
        PeriodicTask::spawn("alert-monitor", self.settings.interval, move || {
            let monitor = Arc::clone(&monitor);
            async move {
                monitor.run_cycle().await;
            }
        })
    }
}

/// Latest quotes published by the ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSnapshot {
    pub symbols: Vec<String>,
    pub quotes: QuoteMap,
    pub fetched_at: DateTime<Utc>,
}

/// Refreshes quotes for watched and held symbols for display.
pub struct QuoteTicker<Q> {
    source: Q,
    watchlist: Arc<Watchlist>,
    ledger: Arc<PortfolioLedger>,
    fetch_timeout: Duration,
    latest: watch::Sender<Option<TickerSnapshot>>,
}

impl<Q> QuoteTicker<Q>
where
    Q: QuoteSource + 'static,
{
    pub fn new(
        source: Q,
        watchlist: Arc<Watchlist>,
        ledger: Arc<PortfolioLedger>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            watchlist,
            ledger,
            fetch_timeout,
            latest: watch::channel(None).0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TickerSnapshot>> {
        self.latest.subscribe()
    }

    /// Watchlist symbols first, then held symbols not already listed.
    pub fn symbols(&self) -> crate::Result<Vec<String>> {
        let mut symbols = self.watchlist.symbols()?;
        for symbol in self.ledger.symbols()? {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    /// Fetch once and publish. A failure keeps the previous snapshot.
    pub async fn tick(&self) -> bool {
        let symbols = match self.symbols() {
            Ok(symbols) if symbols.is_empty() => return false,
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::warn!(error = %e, "could not read tracked symbols");
                return false;
            }
        };

        match fetch_with_timeout(&self.source, &symbols, self.fetch_timeout).await {
            Ok(quotes) => {
                self.latest.send_replace(Some(TickerSnapshot {
                    symbols,
                    quotes,
                    fetched_at: Utc::now(),
                }));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "ticker fetch failed, keeping last snapshot");
                false
            }
        }
    }

    pub fn start(self: &Arc<Self>, period: Duration) -> PeriodicTask {
        let ticker = Arc::clone(self);
        PeriodicTask::spawn("quote-ticker", period, move || {
            let ticker = Arc::clone(&ticker);
            async move {
                ticker.tick().await;
            }
        })
    }
}
