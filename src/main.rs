//! Tickerwatch - price alerts and portfolio valuation from the terminal.

use anyhow::{bail, Context, Result};
use chrono::Local;
use tickerwatch::cli::{AlertCommand, Args, Command, PortfolioCommand, WatchCommand};
use tickerwatch::config::{self, Config};
use tickerwatch::export::{export_valuation, ExportFormat};
use tickerwatch::portfolio::AddOutcome;
use tickerwatch::quotes::YahooFinanceClient;
use tickerwatch::{ui, App, CycleOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();
    init_tracing(args.verbose);

    if let Command::InitConfig { force } = args.command {
        return init_config(args.config.clone(), force);
    }

    // Load configuration
    let config = if let Some(ref path) = args.config {
        Config::load(path)?
    } else {
        Config::load_or_default()
    };

    let app = App::from_config(&config, &args.app_options())?;

    match args.command {
        Command::Alert(cmd) => run_alert(&app, cmd).await,
        Command::Portfolio(cmd) => run_portfolio(&app, cmd).await,
        Command::Watch(cmd) => run_watch(&app, cmd),
        Command::Monitor { iterations } => run_monitor(&app, iterations).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Logs go to stderr so tables on stdout stay pipeable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn init_config(path: Option<std::path::PathBuf>, force: bool) -> Result<()> {
    let path = path
        .or_else(Config::default_config_path)
        .context("Could not determine a config path; pass --config")?;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    std::fs::write(&path, config::sample_config())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_alert(app: &App<YahooFinanceClient>, cmd: AlertCommand) -> Result<()> {
    match cmd {
        AlertCommand::Add {
            symbol,
            direction,
            price,
        } => {
            let alert = app.add_alert(&symbol, direction.into(), price)?;
            println!(
                "Added alert {}: {} {} {}",
                alert.id,
                alert.symbol,
                alert.direction,
                ui::format_price(alert.target_price)
            );
        }
        AlertCommand::List => print!("{}", ui::render_alerts(&app.alerts.list()?)),
        AlertCommand::Toggle { id } => match app.alerts.toggle(&id)? {
            Some(alert) => println!(
                "Alert {} is now {}",
                alert.id,
                if alert.is_active { "active" } else { "paused" }
            ),
            None => bail!("No alert with id {}", id),
        },
        AlertCommand::Remove { id } => {
            if !app.alerts.remove(&id)? {
                bail!("No alert with id {}", id);
            }
            println!("Removed alert {}", id);
        }
        AlertCommand::Check => match app.check_alerts().await {
            CycleOutcome::Evaluated { triggered } => println!("{} alert(s) triggered", triggered),
            CycleOutcome::NoActiveAlerts => println!("No active alerts."),
            CycleOutcome::FetchFailed => bail!("Could not fetch quotes"),
            CycleOutcome::StoreUnavailable => bail!("Could not read alerts"),
            CycleOutcome::Skipped => {}
        },
    }
    Ok(())
}

async fn run_portfolio(app: &App<YahooFinanceClient>, cmd: PortfolioCommand) -> Result<()> {
    match cmd {
        PortfolioCommand::Add(add) => {
            let date = add.date.unwrap_or_else(|| Local::now().date_naive());
            match app.add_holding(&add.symbol, add.shares, add.price, date)? {
                AddOutcome::Inserted(h) => {
                    println!("Added {} {} at {}", h.shares, h.symbol, ui::format_price(h.purchase_price))
                }
                AddOutcome::Merged(h) => println!(
                    "Merged into {}: {} shares at average {}",
                    h.symbol,
                    h.shares,
                    ui::format_price(h.purchase_price)
                ),
            }
        }
        PortfolioCommand::Remove { symbol } => {
            if !app.ledger.remove(&symbol)? {
                bail!("No holding for {}", symbol);
            }
            println!("Removed {}", symbol.trim().to_uppercase());
        }
        PortfolioCommand::List => {
            let holdings = app.ledger.list()?;
            if holdings.is_empty() {
                println!("Portfolio is empty.");
            }
            for h in holdings {
                println!(
                    "{:<10} {:>10.4} @ {:>12}  bought {}",
                    h.symbol,
                    h.shares,
                    ui::format_price(h.purchase_price),
                    h.purchase_date
                );
            }
        }
        PortfolioCommand::Value { export } => {
            let valuation = app.valuation().await?;
            match export {
                Some(format) => print!("{}", export_valuation(&valuation, ExportFormat::from(format))),
                None => print!("{}", ui::render_valuation(&valuation)),
            }
        }
    }
    Ok(())
}

fn run_watch(app: &App<YahooFinanceClient>, cmd: WatchCommand) -> Result<()> {
    match cmd {
        WatchCommand::Add { symbol, notes } => {
            if app.watchlist.add(&symbol, notes)? {
                println!("Watching {}", symbol.trim().to_uppercase());
            } else {
                println!("{} is already on the watchlist", symbol.trim().to_uppercase());
            }
        }
        WatchCommand::Remove { symbol } => {
            if !app.watchlist.remove(&symbol)? {
                bail!("{} is not on the watchlist", symbol);
            }
            println!("Stopped watching {}", symbol.trim().to_uppercase());
        }
        WatchCommand::Note { symbol, notes } => {
            if app.watchlist.set_notes(&symbol, notes)?.is_none() {
                bail!("{} is not on the watchlist", symbol);
            }
        }
        WatchCommand::List => print!("{}", ui::render_watchlist(&app.watchlist.list()?)),
    }
    Ok(())
}

/// Run both loops until Ctrl-C, or until `iterations` ticker refreshes.
async fn run_monitor(app: &App<YahooFinanceClient>, iterations: u64) -> Result<()> {
    let active = app.alerts.active()?.len();
    println!("Monitoring {} active alert(s). Press Ctrl-C to stop.", active);

    if app.watchlist.symbols()?.is_empty() && app.ledger.symbols()?.is_empty() {
        // The ticker never publishes, so a refresh count could never be reached
        if iterations > 0 {
            bail!("Nothing to refresh: the watchlist and portfolio are empty");
        }
        println!("Watchlist and portfolio are empty; only alerts will be checked.");
    }

    let monitoring = app.start_monitoring();
    let mut updates = monitoring.ticker.subscribe();
    let mut shown = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    print!("{}", ui::render_ticker(&snapshot));
                    shown += 1;
                    if iterations > 0 && shown >= iterations {
                        break;
                    }
                }
            }
        }
    }

    monitoring.stop().await;
    Ok(())
}
