//! Price alerts: persisted CRUD plus the level-triggered evaluator.

use crate::error::Result;
use crate::models::{NewAlert, PriceAlert, QuoteMap};
use crate::notify::Notification;
use crate::store::{keys, Collection, KeyValueStore, Versioned};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

impl Versioned for Vec<PriceAlert> {
    /// Stored alerts must pass the same rules as new ones.
    fn check(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for alert in self {
            if !seen.insert(alert.id.as_str()) {
                return Err(format!("duplicate alert id {}", alert.id));
            }
            NewAlert::new(&alert.symbol, alert.target_price, alert.direction)
                .map_err(|e| format!("alert {}: {}", alert.id, e))?;
        }
        Ok(())
    }
}

/// Write-through store of price alerts, in creation order.
pub struct AlertStore {
    alerts: Collection<Vec<PriceAlert>>,
}

impl AlertStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            alerts: Collection::new(store, keys::ALERTS),
        }
    }

    /// Create an active alert with a fresh id.
    pub fn add(&self, draft: NewAlert) -> Result<PriceAlert> {
        let alert = self.alerts.update(Vec::new, |alerts| {
            let alert = PriceAlert {
                id: fresh_id(alerts),
                symbol: draft.symbol,
                target_price: draft.target_price,
                direction: draft.direction,
                is_active: true,
                created_at: Utc::now(),
            };
            alerts.push(alert.clone());
            alert
        })?;

        tracing::info!(
            id = %alert.id,
            symbol = %alert.symbol,
            direction = %alert.direction,
            target = alert.target_price,
            "alert created"
        );
        Ok(alert)
    }

    /// Delete an alert. Returns `false` if no alert had that id.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.alerts.update(Vec::new, |alerts| {
            let before = alerts.len();
            alerts.retain(|a| a.id != id);
            alerts.len() != before
        })?;
        if removed {
            tracing::info!(%id, "alert removed");
        }
        Ok(removed)
    }

    /// Flip `is_active`. Returns the updated alert, or `None` if absent.
    pub fn toggle(&self, id: &str) -> Result<Option<PriceAlert>> {
        let toggled = self.alerts.update(Vec::new, |alerts| {
            alerts.iter_mut().find(|a| a.id == id).map(|alert| {
                alert.is_active = !alert.is_active;
                alert.clone()
            })
        })?;
        if let Some(alert) = &toggled {
            tracing::info!(%id, active = alert.is_active, "alert toggled");
        }
        Ok(toggled)
    }

    /// All alerts, active and inactive.
    pub fn list(&self) -> Result<Vec<PriceAlert>> {
        Ok(self.alerts.load()?.unwrap_or_default())
    }

    pub fn active(&self) -> Result<Vec<PriceAlert>> {
        let mut alerts = self.list()?;
        alerts.retain(|a| a.is_active);
        Ok(alerts)
    }
}

fn fresh_id(existing: &[PriceAlert]) -> String {
    loop {
        let id = format!("{:016x}", rand::random::<u64>());
        if !existing.iter().any(|a| a.id == id) {
            return id;
        }
    }
}

/// An alert whose condition held against the observed price.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub alert: PriceAlert,
    pub price: f64,
}

impl TriggeredAlert {
    pub fn notification(&self) -> Notification {
        Notification::new(
            format!("Price Alert: {}", self.alert.symbol),
            format!(
                "{} is now {} your target of ${:.2} (current: ${:.2})",
                self.alert.symbol, self.alert.direction, self.alert.target_price, self.price
            ),
        )
    }
}

/// Alerts whose condition holds for the given quotes, in input order.
///
/// Inactive alerts and alerts without a quote are skipped. Evaluation is
/// level-triggered: the same alert fires again on every call while its
/// condition holds.
pub fn evaluate(alerts: &[PriceAlert], quotes: &QuoteMap) -> Vec<TriggeredAlert> {
    alerts
        .iter()
        .filter(|a| a.is_active)
        .filter_map(|a| {
            let quote = quotes.get(&a.symbol)?;
            a.direction
                .is_crossed(quote.price, a.target_price)
                .then(|| TriggeredAlert {
                    alert: a.clone(),
                    price: quote.price,
                })
        })
        .collect()
}
