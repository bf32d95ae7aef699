//! Dashboard rendering with ordered fallback tiers
//!
//! Tiers run richest first. A tier that errors or produces an empty event is
//! logged and skipped; the chain always ends in a minimal text event, and
//! when not even the balance is readable, a static "bot is running" event.

pub mod chart;
pub mod text;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::error::RenderResult;
use crate::types::{AlertEvent, SessionBasics, Severity, Snapshot};

pub use chart::{CompactChart, RichChart};
pub use text::{MinimalText, StructuredText};

/// Identity of a rendering strategy, richest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderTier {
    RichChart,
    CompactChart,
    StructuredText,
    MinimalText,
    Static,
}

impl RenderTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderTier::RichChart => "rich_chart",
            RenderTier::CompactChart => "compact_chart",
            RenderTier::StructuredText => "structured_text",
            RenderTier::MinimalText => "minimal_text",
            RenderTier::Static => "static",
        }
    }
}

impl fmt::Display for RenderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of turning a snapshot into an event
pub trait RenderStrategy: Send + Sync {
    fn tier(&self) -> RenderTier;

    fn render(&self, snapshot: &Snapshot) -> RenderResult<AlertEvent>;
}

/// Event produced by the renderer and the tier that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub tier: RenderTier,
    pub event: AlertEvent,
}

/// Renders snapshots through the fallback chain
pub struct DashboardRenderer {
    tiers: Vec<Box<dyn RenderStrategy>>,
    footer: String,
}

impl DashboardRenderer {
    /// Standard chain: rich chart, compact chart, structured text, minimal text
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_tiers(
            vec![
                Box::new(RichChart::new(config.max_image_bytes)),
                Box::new(CompactChart::new(config.max_image_bytes)),
                Box::new(StructuredText),
                Box::new(MinimalText),
            ],
            config.footer.clone(),
        )
    }

    pub fn with_tiers(tiers: Vec<Box<dyn RenderStrategy>>, footer: impl Into<String>) -> Self {
        Self {
            tiers,
            footer: footer.into(),
        }
    }

    pub fn tiers(&self) -> Vec<RenderTier> {
        self.tiers.iter().map(|t| t.tier()).collect()
    }

    /// Render a full snapshot, falling back tier by tier
    pub fn render(&self, snapshot: &Snapshot) -> Rendered {
        for strategy in &self.tiers {
            let tier = strategy.tier();
            match strategy.render(snapshot) {
                Ok(event) if !event.is_empty() => {
                    debug!(%tier, "Dashboard rendered");
                    return self.finish(tier, event);
                }
                Ok(_) => {
                    warn!(%tier, "Render tier produced no output, falling back");
                }
                Err(e) => {
                    warn!(%tier, error = %e, "Render tier failed, falling back");
                }
            }
        }

        warn!("All configured render tiers failed, sending minimal dashboard");
        self.render_degraded(Some(&snapshot.basics()), snapshot.captured_at)
    }

    /// Render without a snapshot
    ///
    /// `basics` is whatever could still be read from the trader; None means
    /// not even the balance was available.
    pub fn render_degraded(&self, basics: Option<&SessionBasics>, now: DateTime<Utc>) -> Rendered {
        match basics {
            Some(basics) => self.finish(RenderTier::MinimalText, text::minimal_event(basics, now)),
            None => self.finish(RenderTier::Static, static_event(now)),
        }
    }

    fn finish(&self, tier: RenderTier, event: AlertEvent) -> Rendered {
        let event = if self.footer.is_empty() {
            event
        } else {
            event.with_footer(self.footer.clone())
        };
        Rendered { tier, event }
    }
}

/// Last-resort event when nothing about the session is readable
pub fn static_event(now: DateTime<Utc>) -> AlertEvent {
    AlertEvent::new(
        "🤖 Bot Status",
        format!(
            "**🟢 Bot is running**\nSession data unavailable at {}",
            now.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        Severity::Info,
        now,
    )
}

/// Sign indicator: 🟢 positive, 🔴 negative, ⚪ exactly zero
pub fn sign_glyph(value: Decimal) -> &'static str {
    if value > Decimal::ZERO {
        "🟢"
    } else if value < Decimal::ZERO {
        "🔴"
    } else {
        "⚪"
    }
}

/// Number of filled segments (out of 10) for a percentage
pub fn progress_segments(pct: Decimal) -> usize {
    let clamped = pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    (clamped / Decimal::TEN).floor().to_usize().unwrap_or(0).min(10)
}

/// Fixed-width ten segment bar (`██████░░░░`)
pub fn progress_bar(pct: Decimal) -> String {
    let filled = progress_segments(pct);
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

/// Fixed decimals, no sign prefix
pub(crate) fn plain(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp(dp);
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{:.*}", dp as usize, rounded)
}

/// Fixed decimals with an explicit `+` on non-negative values
pub(crate) fn signed(value: Decimal, dp: u32) -> String {
    let text = plain(value, dp);
    if text.starts_with('-') {
        text
    } else {
        format!("+{}", text)
    }
}

pub(crate) fn sol(value: Decimal) -> String {
    format!("{} SOL", plain(value, 4))
}

pub(crate) fn signed_sol(value: Decimal) -> String {
    format!("{} SOL", signed(value, 4))
}

pub(crate) fn usd(value: Decimal) -> String {
    if value < Decimal::ZERO && !value.round_dp(2).is_zero() {
        format!("-${}", plain(value.abs(), 2))
    } else {
        format!("${}", plain(value, 2))
    }
}

pub(crate) fn signed_usd(value: Decimal) -> String {
    if value < Decimal::ZERO && !value.round_dp(2).is_zero() {
        format!("-${}", plain(value.abs(), 2))
    } else {
        format!("+${}", plain(value, 2))
    }
}

pub(crate) fn pct(value: Decimal) -> String {
    format!("{}%", plain(value, 1))
}

/// `4h 23m` style duration
pub(crate) fn duration_label(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}
