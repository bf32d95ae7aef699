//! One-off alert events outside the dashboard cycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::MonitorConfig;
use crate::render::{signed, signed_sol, signed_usd, sol, usd};
use crate::types::{display_token, AlertEvent, Severity};

/// Critical styling: siren prefix, purple, role mention when configured
pub fn critical(
    title: &str,
    description: impl Into<String>,
    now: DateTime<Utc>,
    role_id: Option<&str>,
) -> AlertEvent {
    AlertEvent::new(
        format!("🚨🚨🚨 {}", title),
        description,
        Severity::Critical,
        now,
    )
    .mentioning(role_id)
}

/// Sent once when the monitor comes up
pub fn startup_notice(config: &MonitorConfig, now: DateTime<Utc>) -> AlertEvent {
    AlertEvent::new(
        "🤖 Session Monitor Online",
        format!(
            "Dashboard every {} · daily target {}",
            crate::render::duration_label(config.dashboard_interval()),
            usd(config.daily_target_usd)
        ),
        Severity::Info,
        now,
    )
    .with_field("SOL Rate", usd(config.sol_usd_rate), true)
    .with_field(
        "Escalation",
        format!(
            "after {} failed close(s), {}x burst",
            config.escalation_threshold, config.escalation_burst
        ),
        true,
    )
}

/// A closed trade as reported by the trader
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub token_id: String,
    /// e.g. "SELL", "STOP_LOSS"
    pub action: String,
    pub price_change_pct: Decimal,
    pub profit_sol: Decimal,
}

/// Trade-closed alert; large moves either way ping the role
pub fn trade_alert(trade: &ClosedTrade, config: &MonitorConfig, now: DateTime<Utc>) -> AlertEvent {
    let profitable = trade.profit_sol > Decimal::ZERO;
    let emoji = if profitable { "🟢" } else { "🔴" };
    let severity = if profitable { Severity::Profit } else { Severity::Loss };
    let token_prefix: String = trade.token_id.chars().take(8).collect();
    let profit_usd = trade
        .profit_sol
        .checked_mul(config.sol_usd_rate)
        .map_or_else(|| "USD unavailable".to_string(), signed_usd);

    let event = AlertEvent::new(
        format!("{} {}: {}...", emoji, trade.action, token_prefix),
        format!(
            "**{}** ({})",
            signed_sol(trade.profit_sol),
            profit_usd
        ),
        severity,
        now,
    )
    .with_field("Token", display_token(&trade.token_id), true)
    .with_field("Price Change", format!("{}%", signed(trade.price_change_pct, 1)), true)
    .with_field("Profit", sol(trade.profit_sol), true);

    if trade.profit_sol.abs() > config.big_trade_sol {
        event.mentioning(config.role_id.as_deref())
    } else {
        event
    }
}
