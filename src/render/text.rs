//! Text-only dashboard tiers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{
    duration_label, pct, progress_bar, sign_glyph, signed, signed_sol, signed_usd, sol, usd,
    RenderStrategy, RenderTier,
};
use crate::error::{RenderError, RenderResult};
use crate::types::{AlertEvent, PositionView, SessionBasics, Severity, Snapshot};

/// Positions listed before the rest are summarized as "+N more"
const MAX_LISTED_POSITIONS: usize = 10;

/// Marker for positions with no current price
pub const PRICE_UNAVAILABLE: &str = "price unavailable";

/// Structured text dashboard with sign glyphs and a progress bar
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredText;

impl RenderStrategy for StructuredText {
    fn tier(&self) -> RenderTier {
        RenderTier::StructuredText
    }

    fn render(&self, snapshot: &Snapshot) -> RenderResult<AlertEvent> {
        let description = format!(
            "{} **{}** ({}) session P&L",
            sign_glyph(snapshot.session_pnl_sol),
            signed_sol(snapshot.session_pnl_sol),
            signed_usd(snapshot.session_pnl_usd),
        );

        let mut event = AlertEvent::new(
            "📊 Trading Dashboard",
            description,
            Severity::for_pnl(snapshot.session_pnl_sol),
            snapshot.captured_at,
        )
        .with_field("💰 Balance", sol(snapshot.balance_sol), true)
        .with_field(
            "📈 Win Rate",
            format!(
                "{} ({}/{})",
                pct(snapshot.win_rate_pct),
                snapshot.win_count,
                snapshot.trade_count
            ),
            true,
        )
        .with_field("🎯 Daily Target", usd(snapshot.daily_target_usd), true)
        .with_field("🚀 Best Trade", signed_sol(snapshot.best_trade_sol), true)
        .with_field("📉 Worst Trade", signed_sol(snapshot.worst_trade_sol), true);

        if let Some(duration) = snapshot.session_duration() {
            event = event.with_field("⏰ Session Time", duration_label(duration), true);
        }

        event = event.with_field(
            "🎯 Target Progress",
            format!(
                "`{}` {}",
                progress_bar(snapshot.progress_pct),
                pct(snapshot.progress_pct)
            ),
            false,
        );

        if !snapshot.positions.is_empty() {
            let unpriced = snapshot.positions.iter().filter(|p| !p.pnl_available()).count();
            let mut unrealized = format!(
                "{} {}",
                sign_glyph(snapshot.unrealized_pnl_sol),
                signed_sol(snapshot.unrealized_pnl_sol)
            );
            if unpriced > 0 {
                unrealized.push_str(&format!(" ({} without price)", unpriced));
            }
            event = event
                .with_field("📊 Unrealized P&L", unrealized, true)
                .with_field(
                    format!("💼 Open Positions ({})", snapshot.positions.len()),
                    position_lines(&snapshot.positions),
                    false,
                );
        } else {
            event = event.with_field("💼 Open Positions (0)", "No active positions", false);
        }

        if !snapshot.stuck.is_empty() {
            let lines: Vec<String> = snapshot
                .stuck
                .iter()
                .map(|s| {
                    format!(
                        "⚠️ **{}** {} failed close{}",
                        s.display_token,
                        s.failures,
                        if s.failures == 1 { "" } else { "s" }
                    )
                })
                .collect();
            event = event.with_field("🚨 Stuck Positions", lines.join("\n"), false);
        }

        Ok(event)
    }
}

fn position_lines(positions: &[PositionView]) -> String {
    let mut lines: Vec<String> = positions
        .iter()
        .take(MAX_LISTED_POSITIONS)
        .map(position_line)
        .collect();

    if positions.len() > MAX_LISTED_POSITIONS {
        lines.push(format!("... +{} more", positions.len() - MAX_LISTED_POSITIONS));
    }
    lines.join("\n")
}

/// One position line; unpriced positions say so instead of showing 0%
pub fn position_line(position: &PositionView) -> String {
    let held = duration_label(chrono::Duration::minutes(position.hold_minutes));
    let strategy = if position.strategy.is_empty() {
        String::new()
    } else {
        format!(" {}", position.strategy)
    };

    match position.pnl {
        Some(pnl) => format!(
            "{} **{}**{} · {} · {}% ({})",
            sign_glyph(pnl.percent),
            position.display_token,
            strategy,
            held,
            signed(pnl.percent, 1),
            signed_sol(pnl.amount_sol),
        ),
        None => format!(
            "❔ **{}**{} · {} · {}",
            position.display_token, strategy, held, PRICE_UNAVAILABLE
        ),
    }
}

/// Balance and session P&L only
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimalText;

impl RenderStrategy for MinimalText {
    fn tier(&self) -> RenderTier {
        RenderTier::MinimalText
    }

    fn render(&self, snapshot: &Snapshot) -> RenderResult<AlertEvent> {
        let event = minimal_event(&snapshot.basics(), snapshot.captured_at);
        if event.is_empty() {
            return Err(RenderError::Empty);
        }
        Ok(event)
    }
}

pub fn minimal_event(basics: &SessionBasics, now: DateTime<Utc>) -> AlertEvent {
    AlertEvent::new(
        "📊 Session Status",
        format!(
            "**Balance:** {}\n**Session P&L:** {} {} ({})",
            sol(basics.balance_sol),
            sign_glyph(basics.session_pnl_sol),
            signed_sol(basics.session_pnl_sol),
            signed_usd(basics.session_pnl_usd),
        ),
        Severity::for_pnl(basics.session_pnl_sol),
        now,
    )
}

/// Minimal basics from whatever is still readable
///
/// None when the USD conversion does not fit in a decimal.
pub fn basics_from(balance_sol: Decimal, realized_pnl_sol: Decimal, sol_usd_rate: Decimal) -> Option<SessionBasics> {
    Some(SessionBasics {
        balance_sol,
        session_pnl_sol: realized_pnl_sol,
        session_pnl_usd: realized_pnl_sol.checked_mul(sol_usd_rate)?,
    })
}
