//! End-to-end tests of the engine through the library API.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickerwatch::config::{Config, SeedHolding};
use tickerwatch::error::QuoteError;
use tickerwatch::notify::{Notification, NotificationSink};
use tickerwatch::portfolio::AddOutcome;
use tickerwatch::quotes::QuoteSource;
use tickerwatch::store::{FileStore, KeyValueStore, MemoryStore};
use tickerwatch::valuation::QuoteStatus;
use tickerwatch::{App, CycleOutcome, Direction, Quote, QuoteMap};

/// Serves a fixed price table, or fails when `down` is set.
#[derive(Default)]
struct FixedQuotes {
    prices: Mutex<Vec<(&'static str, f64)>>,
    down: Mutex<bool>,
}

impl FixedQuotes {
    fn with(prices: &[(&'static str, f64)]) -> Self {
        Self {
            prices: Mutex::new(prices.to_vec()),
            down: Mutex::new(false),
        }
    }
}

impl QuoteSource for FixedQuotes {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, QuoteError> {
        if *self.down.lock().unwrap() {
            return Err(QuoteError::Unavailable("offline".into()));
        }
        let prices = self.prices.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| {
                prices
                    .iter()
                    .find(|(sym, _)| *sym == s.as_str())
                    .map(|(sym, price)| (s.clone(), Quote::new(*sym, *price)))
            })
            .collect())
    }
}

/// Answers after `delay`, counting calls.
struct SlowQuotes {
    delay: Duration,
    calls: AtomicUsize,
}

impl QuoteSource for SlowQuotes {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(symbols.iter().map(|s| (s.clone(), Quote::new(s.as_str(), 1.0))).collect())
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<Notification>>);

impl NotificationSink for Inbox {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn memory_app(prices: &[(&'static str, f64)]) -> (App<FixedQuotes>, Arc<Inbox>) {
    let inbox = Arc::new(Inbox::default());
    let app = App::with_parts(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        FixedQuotes::with(prices),
        inbox.clone(),
    )
    .unwrap();
    (app, inbox)
}

#[tokio::test]
async fn test_portfolio_valuation() {
    let (app, _) = memory_app(&[("AAPL", 120.0), ("MSFT", 180.0)]);
    app.add_holding("AAPL", 10.0, 100.0, date(2024, 1, 15)).unwrap();
    app.add_holding("MSFT", 5.0, 200.0, date(2024, 2, 1)).unwrap();

    let valuation = app.valuation().await.unwrap();
    assert_eq!(valuation.total_value, 2100.0);
    assert_eq!(valuation.total_cost, 2000.0);
    assert_eq!(valuation.total_gain_loss, 100.0);
    assert!((valuation.total_gain_loss_percent - 5.0).abs() < 1e-9);
    assert!(valuation.is_complete());
}

#[tokio::test]
async fn test_valuation_flags_missing_quotes() {
    let (app, _) = memory_app(&[("AAPL", 120.0)]);
    app.add_holding("AAPL", 10.0, 100.0, date(2024, 1, 15)).unwrap();
    app.add_holding("DELISTED", 3.0, 10.0, date(2024, 1, 15)).unwrap();

    let valuation = app.valuation().await.unwrap();
    assert_eq!(valuation.missing_symbols, vec!["DELISTED".to_string()]);
    let gone = valuation.holdings.iter().find(|h| h.symbol == "DELISTED").unwrap();
    assert_eq!(gone.quote_status, QuoteStatus::Missing);
    assert_eq!(gone.market_value, 0.0);
    assert_eq!(valuation.total_value, 1200.0);
}

#[tokio::test]
async fn test_valuation_propagates_fetch_failure() {
    let source = FixedQuotes::default();
    *source.down.lock().unwrap() = true;
    let app = App::with_parts(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        source,
        Arc::new(Inbox::default()),
    )
    .unwrap();

    // Nothing held, nothing fetched
    assert_eq!(app.valuation().await.unwrap().total_value, 0.0);

    app.add_holding("AAPL", 1.0, 100.0, date(2024, 1, 15)).unwrap();
    assert!(app.valuation().await.is_err());
}

#[tokio::test]
async fn test_check_alerts_notifies_crossed_alerts() {
    let (app, inbox) = memory_app(&[("AAPL", 160.0), ("TSLA", 250.0)]);
    app.add_alert("aapl", Direction::Above, 150.0).unwrap();
    app.add_alert("TSLA", Direction::Below, 200.0).unwrap();

    assert_eq!(app.check_alerts().await, CycleOutcome::Evaluated { triggered: 1 });
    // Level-triggered: still above target, fires again
    assert_eq!(app.check_alerts().await, CycleOutcome::Evaluated { triggered: 1 });

    let sent = inbox.0.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].title, "Price Alert: AAPL");
    assert_eq!(
        sent[0].message,
        "AAPL is now above your target of $150.00 (current: $160.00)"
    );
    assert_eq!(sent[0].duration_ms, Some(5000));
}

#[tokio::test]
async fn test_check_alerts_without_active_alerts() {
    let (app, inbox) = memory_app(&[("AAPL", 160.0)]);
    let alert = app.add_alert("AAPL", Direction::Above, 150.0).unwrap();
    app.alerts.toggle(&alert.id).unwrap();

    assert_eq!(app.check_alerts().await, CycleOutcome::NoActiveAlerts);
    assert!(inbox.0.lock().unwrap().is_empty());
}

#[test]
fn test_state_survives_reopening_the_data_dir() {
    let dir = std::env::temp_dir().join(format!(
        "tickerwatch-engine-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));

    let open = || {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&dir));
        App::with_parts(&Config::default(), store, FixedQuotes::default(), Arc::new(Inbox::default())).unwrap()
    };

    let first = open();
    let alert = first.add_alert("ETH-USD", Direction::Below, 1500.0).unwrap();
    first.add_holding("MSFT", 2.0, 300.0, date(2024, 3, 1)).unwrap();
    first.watchlist.add("nvda", Some("earnings".into())).unwrap();
    drop(first);

    let second = open();
    assert_eq!(second.alerts.list().unwrap(), vec![alert]);
    assert_eq!(second.ledger.symbols().unwrap(), vec!["MSFT".to_string()]);
    let items = second.watchlist.list().unwrap();
    assert_eq!(items[0].symbol, "NVDA");
    assert_eq!(items[0].notes.as_deref(), Some("earnings"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_seed_portfolio_until_first_write() {
    let mut config = Config::default();
    config.seed = vec![SeedHolding {
        symbol: "AAPL".into(),
        shares: 10.0,
        purchase_price: 150.0,
        purchase_date: date(2024, 1, 15),
    }];
    let app = App::with_parts(
        &config,
        Arc::new(MemoryStore::new()),
        FixedQuotes::default(),
        Arc::new(Inbox::default()),
    )
    .unwrap();

    assert_eq!(app.ledger.symbols().unwrap(), vec!["AAPL".to_string()]);

    let outcome = app.add_holding("AAPL", 10.0, 250.0, date(2024, 6, 1)).unwrap();
    assert!(matches!(outcome, AddOutcome::Merged(_)));
    let holding = outcome.holding();
    assert_eq!(holding.shares, 20.0);
    assert_eq!(holding.purchase_price, 200.0);
    assert_eq!(holding.purchase_date, date(2024, 1, 15));
}

#[tokio::test(start_paused = true)]
async fn test_monitoring_publishes_ticker_and_fires_alerts() {
    let (app, inbox) = memory_app(&[("AAPL", 160.0), ("BTC-USD", 60000.0)]);
    app.watchlist.add("BTC-USD", None).unwrap();
    app.add_holding("AAPL", 1.0, 100.0, date(2024, 1, 15)).unwrap();
    app.add_alert("AAPL", Direction::Above, 150.0).unwrap();

    let monitoring = app.start_monitoring();
    let mut updates = monitoring.ticker.subscribe();
    tokio::time::timeout(Duration::from_secs(1), updates.changed())
        .await
        .unwrap()
        .unwrap();
    let snapshot = updates.borrow_and_update().clone().unwrap();
    assert_eq!(snapshot.symbols, vec!["BTC-USD".to_string(), "AAPL".to_string()]);
    assert_eq!(snapshot.quotes["BTC-USD"].price, 60000.0);

    // First alert cycle runs at start, the next one a full interval later
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(inbox.0.lock().unwrap().len(), 1);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(inbox.0.lock().unwrap().len(), 2);

    monitoring.stop().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(inbox.0.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_check_skipped_while_scheduled_cycle_runs() {
    let app = App::with_parts(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        SlowQuotes {
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        },
        Arc::new(Inbox::default()),
    )
    .unwrap();
    app.add_alert("AAPL", Direction::Above, 150.0).unwrap();

    let monitoring = app.start_monitoring();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(app.check_alerts().await, CycleOutcome::Skipped);

    // Once the scheduled cycle has finished, manual checks run again
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(app.check_alerts().await, CycleOutcome::Evaluated { triggered: 0 });

    monitoring.stop().await;
}
