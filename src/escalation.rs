//! Escalation of positions that cannot be closed
//!
//! Each failed close increments a per-position counter. Once the counter
//! reaches the threshold every further failure yields a critical alert,
//! which [`EscalationTracker::escalate`] sends as a fixed burst. Entries are
//! only discarded by a successful close or an operator abandon; there is no
//! time-based recovery.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts;
use crate::config::MonitorConfig;
use crate::dispatch::{DeliveryOutcome, NotificationSink};
use crate::render::{signed, signed_sol, sol};
use crate::snapshot::position_pnl;
use crate::types::{display_token, AlertEvent, StuckPosition};

/// A failed attempt to close a position, as reported by the execution layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseFailureReport {
    pub position_id: String,
    pub token_id: String,
    /// Token quantity still held
    pub size: Decimal,
    pub entry_price: Decimal,
    /// Sell attempts the execution layer made for this failure
    #[serde(default)]
    pub attempt_count: u32,
    pub failed_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
struct EscalationState {
    token_id: String,
    failures: u32,
    size: Decimal,
    first_failed_at: DateTime<Utc>,
    last_failed_at: DateTime<Utc>,
}

/// Tracks consecutive close failures per position id
#[derive(Clone)]
pub struct EscalationTracker {
    threshold: u32,
    burst: u32,
    role_id: Option<String>,
    states: Arc<RwLock<HashMap<String, EscalationState>>>,
}

impl EscalationTracker {
    pub fn new(threshold: u32, burst: u32, role_id: Option<String>) -> Self {
        Self {
            threshold: threshold.max(1),
            burst: burst.max(1),
            role_id,
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.escalation_threshold,
            config.escalation_burst,
            config.role_id.clone(),
        )
    }

    /// Count a failed close; returns the critical alert once at or past threshold
    ///
    /// `current_price` is SOL per token if a quote is available.
    pub async fn record_failure(
        &self,
        report: &CloseFailureReport,
        current_price: Option<Decimal>,
    ) -> Option<AlertEvent> {
        let failures = {
            let mut states = self.states.write().await;
            let entry = states
                .entry(report.position_id.clone())
                .or_insert(EscalationState {
                    token_id: report.token_id.clone(),
                    failures: 0,
                    size: report.size,
                    first_failed_at: report.failed_at,
                    last_failed_at: report.failed_at,
                });
            entry.failures += 1;
            entry.size = report.size;
            entry.last_failed_at = report.failed_at;
            entry.failures
        };

        warn!(
            position_id = %report.position_id,
            token = %report.token_id,
            failures,
            attempts = report.attempt_count,
            "Position close failed"
        );

        if failures < self.threshold {
            return None;
        }

        Some(self.stuck_alert(report, failures, current_price))
    }

    fn stuck_alert(&self, report: &CloseFailureReport, failures: u32, price: Option<Decimal>) -> AlertEvent {
        let token = display_token(&report.token_id);
        let price = price.filter(|p| *p > Decimal::ZERO);

        let description = match price {
            Some(_) => format!(
                "**Automated selling failed. Manual intervention required.**\nSell `{}` manually.",
                report.token_id
            ),
            None => format!(
                "**Automated selling failed. Manual intervention required.**\nPosition of {} tokens, {} failed close{}.",
                report.size.normalize(),
                failures,
                if failures == 1 { "" } else { "s" }
            ),
        };

        let mut event = alerts::critical(
            &format!("STUCK POSITION: {}", token),
            description,
            report.failed_at,
            self.role_id.as_deref(),
        )
        .with_field("Token", format!("`{}`", report.token_id), false)
        .with_field("Size", report.size.normalize().to_string(), true)
        .with_field("Failed Closes", failures.to_string(), true);

        if let Some(current) = price {
            event = event
                .with_field("Sell Attempts", report.attempt_count.to_string(), true)
                .with_field("Entry Price", format!("{} SOL", report.entry_price.normalize()), true)
                .with_field("Current Price", format!("{} SOL", current.normalize()), true)
                .with_field(
                    "Value",
                    report
                        .size
                        .checked_mul(current)
                        .map_or_else(|| "unavailable".to_string(), sol),
                    true,
                );

            if report.entry_price > Decimal::ZERO {
                let pnl = match position_pnl(report.entry_price, current, report.size) {
                    Some(pnl) => format!("{}% ({})", signed(pnl.percent, 1), signed_sol(pnl.amount_sol)),
                    None => "unavailable".to_string(),
                };
                event = event.with_field("P&L", pnl, true);
            }
        }

        if let Some(reason) = &report.reason {
            event = event.with_field("Last Error", reason.clone(), false);
        }

        event
    }

    /// Send a critical event `burst` times in a row
    ///
    /// Every send happens regardless of earlier outcomes.
    pub async fn escalate(&self, sink: &dyn NotificationSink, event: &AlertEvent) -> Vec<DeliveryOutcome> {
        let burst_id = Uuid::new_v4();
        let mut outcomes = Vec::with_capacity(self.burst as usize);

        for attempt in 1..=self.burst {
            let outcome = sink.send(event).await;
            match &outcome {
                DeliveryOutcome::Delivered => {
                    info!(%burst_id, attempt, burst = self.burst, "Critical alert sent");
                }
                DeliveryOutcome::Failed(reason) => {
                    error!(%burst_id, attempt, burst = self.burst, "Critical alert send failed: {}", reason);
                }
            }
            outcomes.push(outcome);
        }

        let delivered = outcomes.iter().filter(|o| o.is_delivered()).count();
        if delivered == 0 {
            error!(%burst_id, title = %event.title, "Critical alert not delivered by any send");
        }
        outcomes
    }

    /// Position closed successfully; returns whether it was being tracked
    pub async fn record_close(&self, position_id: &str) -> bool {
        let removed = self.states.write().await.remove(position_id);
        if let Some(state) = &removed {
            info!(
                position_id = %position_id,
                failures = state.failures,
                "Stuck position closed"
            );
        }
        removed.is_some()
    }

    /// Operator gave up on the position
    pub async fn abandon(&self, position_id: &str) -> bool {
        let removed = self.states.write().await.remove(position_id);
        if let Some(state) = &removed {
            warn!(
                position_id = %position_id,
                token = %state.token_id,
                failures = state.failures,
                "Stuck position abandoned"
            );
        }
        removed.is_some()
    }

    /// Drop entries for positions that are no longer open
    ///
    /// Returns the ids that were discarded.
    pub async fn retain_open(&self, open_ids: &[String]) -> Vec<String> {
        let mut states = self.states.write().await;
        let gone: Vec<String> = states
            .keys()
            .filter(|id| !open_ids.contains(id))
            .cloned()
            .collect();
        for id in &gone {
            states.remove(id);
            info!(position_id = %id, "Stuck position no longer open");
        }
        gone
    }

    pub async fn failure_count(&self, position_id: &str) -> u32 {
        self.states
            .read()
            .await
            .get(position_id)
            .map(|s| s.failures)
            .unwrap_or(0)
    }

    /// Currently stuck positions, oldest first
    pub async fn stuck_positions(&self) -> Vec<StuckPosition> {
        let states = self.states.read().await;
        let mut stuck: Vec<StuckPosition> = states
            .iter()
            .map(|(id, s)| StuckPosition {
                position_id: id.clone(),
                display_token: display_token(&s.token_id),
                failures: s.failures,
                size: s.size,
                first_failed_at: s.first_failed_at,
                last_failed_at: s.last_failed_at,
            })
            .collect();
        stuck.sort_by(|a, b| {
            a.first_failed_at
                .cmp(&b.first_failed_at)
                .then_with(|| a.position_id.cmp(&b.position_id))
        });
        stuck
    }
}
