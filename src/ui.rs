//! Plain-text tables for the terminal.

use crate::models::{PriceAlert, WatchlistItem};
use crate::scheduler::TickerSnapshot;
use crate::valuation::{QuoteStatus, Valuation};
use chrono::Local;
use num_format::{Locale, ToFormattedString};

/// Format a price; sub-dollar prices get more precision.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format_money(price)
    } else {
        format!("${:.6}", price)
    }
}

/// `$1,234.56`, with a leading minus for negatives.
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Truncate string to max length.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

pub fn render_alerts(alerts: &[PriceAlert]) -> String {
    if alerts.is_empty() {
        return "No price alerts.\n".to_string();
    }

    let mut out = format!(
        "{:<18} {:<10} {:<6} {:>12} {:<8} {}\n",
        "ID", "SYMBOL", "DIR", "TARGET", "STATUS", "CREATED"
    );
    out.push_str(&"-".repeat(76));
    out.push('\n');
    for alert in alerts {
        out.push_str(&format!(
            "{:<18} {:<10} {:<6} {:>12} {:<8} {}\n",
            alert.id,
            truncate_string(&alert.symbol, 10),
            alert.direction,
            format_price(alert.target_price),
            if alert.is_active { "active" } else { "paused" },
            alert.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        ));
    }
    out
}

pub fn render_valuation(valuation: &Valuation) -> String {
    if valuation.holdings.is_empty() {
        return "Portfolio is empty.\n".to_string();
    }

    let mut out = format!(
        "{:<10} {:>10} {:>12} {:>12} {:>14} {:>14} {:>12} {:>9}\n",
        "SYMBOL", "SHARES", "COST", "PRICE", "VALUE", "BASIS", "P/L", "P/L%"
    );
    out.push_str(&"-".repeat(100));
    out.push('\n');

    for h in &valuation.holdings {
        let price = match h.quote_status {
            QuoteStatus::Live => format_price(h.current_price),
            QuoteStatus::Missing => "n/a".to_string(),
        };
        out.push_str(&format!(
            "{:<10} {:>10.4} {:>12} {:>12} {:>14} {:>14} {:>+12.2} {:>+8.2}%\n",
            truncate_string(&h.symbol, 10),
            h.shares,
            format_price(h.purchase_price),
            price,
            format_money(h.market_value),
            format_money(h.cost_value),
            h.gain_loss,
            h.gain_loss_percent,
        ));
    }

    out.push_str(&"-".repeat(100));
    out.push('\n');
    out.push_str(&format!(
        "{:<10} {:>10} {:>12} {:>12} {:>14} {:>14} {:>+12.2} {:>+8.2}%\n",
        "TOTAL",
        "",
        "",
        "",
        format_money(valuation.total_value),
        format_money(valuation.total_cost),
        valuation.total_gain_loss,
        valuation.total_gain_loss_percent,
    ));
    if !valuation.missing_symbols.is_empty() {
        out.push_str(&format!(
            "No quote for {}; valued at $0.00\n",
            valuation.missing_symbols.join(", ")
        ));
    }
    out
}

pub fn render_watchlist(items: &[WatchlistItem]) -> String {
    if items.is_empty() {
        return "Watchlist is empty.\n".to_string();
    }

    let mut out = format!("{:<10} {:<17} {}\n", "SYMBOL", "ADDED", "NOTES");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for item in items {
        out.push_str(&format!(
            "{:<10} {:<17} {}\n",
            truncate_string(&item.symbol, 10),
            item.added_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            item.notes.as_deref().unwrap_or(""),
        ));
    }
    out
}

/// One ticker refresh, like a batch-mode screen.
pub fn render_ticker(snapshot: &TickerSnapshot) -> String {
    let mut out = format!(
        "\n=== TICKERWATCH {} ===\n",
        snapshot.fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    out.push_str(&format!(
        "{:<10} {:<20} {:>12} {:>10} {:>9}\n",
        "SYMBOL", "NAME", "PRICE", "CHANGE", "CHG%"
    ));
    out.push_str(&"-".repeat(65));
    out.push('\n');

    for symbol in &snapshot.symbols {
        match snapshot.quotes.get(symbol) {
            Some(q) => out.push_str(&format!(
                "{:<10} {:<20} {:>12} {:>+10.2} {:>+8.2}%\n",
                truncate_string(symbol, 10),
                truncate_string(q.name.as_deref().unwrap_or(""), 20),
                format_price(q.price),
                q.change,
                q.change_percent,
            )),
            None => out.push_str(&format!("{:<10} {:<20} {:>12}\n", truncate_string(symbol, 10), "", "n/a")),
        }
    }
    out
}
