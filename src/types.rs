//! Core types shared across the monitoring pipeline
//!
//! `Snapshot` and `PositionView` are the derived view of one emission cycle;
//! `AlertEvent` is the wire payload handed to the notification sink.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Profit,
    Loss,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Profit => "profit",
            Severity::Loss => "loss",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Embed colour for the sink
    pub fn color(&self) -> u32 {
        match self {
            Severity::Info => 0x0099ff,     // Blue
            Severity::Profit => 0x00ff00,   // Green
            Severity::Loss => 0xff0000,     // Red
            Severity::Warning => 0xff6b35,  // Orange
            Severity::Critical => 0xff00ff, // Purple
        }
    }

    /// Green for gains, red for losses, blue for flat
    pub fn for_pnl(pnl: Decimal) -> Self {
        if pnl > Decimal::ZERO {
            Severity::Profit
        } else if pnl < Decimal::ZERO {
            Severity::Loss
        } else {
            Severity::Info
        }
    }
}

/// Payload unit delivered to the notification sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub fields: Vec<EventField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EventImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EventFooter>,
    /// Plain message content, used for role mentions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventImage {
    /// `data:` URI carrying the rendered chart
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFooter {
    pub text: String,
}

impl AlertEvent {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color: severity.color(),
            timestamp,
            fields: Vec::new(),
            image: None,
            footer: None,
            content: None,
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(EventField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn with_image(mut self, data_uri: String) -> Self {
        self.image = Some(EventImage { url: data_uri });
        self
    }

    pub fn with_footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EventFooter { text: text.into() });
        self
    }

    /// Mention a role (`<@&id>`) in the message content
    pub fn mentioning(mut self, role_id: Option<&str>) -> Self {
        if let Some(role) = role_id {
            self.content = Some(format!("<@&{}>", role));
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&EventField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True when neither the text nor the image carries anything
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
            && self.description.trim().is_empty()
            && self.fields.is_empty()
            && self.image.is_none()
    }
}

/// Unrealized P&L of one open position at the current price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPnl {
    pub percent: Decimal,
    pub amount_sol: Decimal,
}

/// Display view of one open position
#[derive(Debug, Clone, PartialEq)]
pub struct PositionView {
    pub token_id: String,
    pub display_token: String,
    pub strategy: String,
    pub size: Decimal,
    pub entry_price: Decimal,
    /// None when no price source is available or it had no quote
    pub current_price: Option<Decimal>,
    /// None whenever `current_price` is None; never zero-filled
    pub pnl: Option<PositionPnl>,
    pub hold_minutes: i64,
}

impl PositionView {
    pub fn pnl_available(&self) -> bool {
        self.pnl.is_some()
    }
}

/// One point of the session P&L trend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub at: DateTime<Utc>,
    pub pnl_sol: Decimal,
    pub pnl_usd: Decimal,
}

/// A position whose close attempts keep failing
#[derive(Debug, Clone, PartialEq)]
pub struct StuckPosition {
    pub position_id: String,
    pub display_token: String,
    pub failures: u32,
    pub size: Decimal,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
}

/// Balance and session P&L; all the minimal tier needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionBasics {
    pub balance_sol: Decimal,
    pub session_pnl_sol: Decimal,
    pub session_pnl_usd: Decimal,
}

/// Immutable derived view of session state for one emission cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub balance_sol: Decimal,
    pub session_pnl_sol: Decimal,
    pub session_pnl_usd: Decimal,
    pub trade_count: u32,
    pub win_count: u32,
    /// Always in [0, 100]; 0 when no trades
    pub win_rate_pct: Decimal,
    pub best_trade_sol: Decimal,
    pub worst_trade_sol: Decimal,
    pub positions: Vec<PositionView>,
    /// Sum over positions with a known price only
    pub unrealized_pnl_sol: Decimal,
    pub daily_target_usd: Decimal,
    /// Always in [0, 100]; 0 unless session P&L is positive
    pub progress_pct: Decimal,
    pub trend: Vec<TrendPoint>,
    pub stuck: Vec<StuckPosition>,
}

impl Snapshot {
    pub fn basics(&self) -> SessionBasics {
        SessionBasics {
            balance_sol: self.balance_sol,
            session_pnl_sol: self.session_pnl_sol,
            session_pnl_usd: self.session_pnl_usd,
        }
    }

    pub fn session_duration(&self) -> Option<chrono::Duration> {
        self.session_started_at
            .map(|start| self.captured_at.signed_duration_since(start))
    }
}

/// Shorten a token id for display (`4k3Dz...vF7t`)
pub fn display_token(token_id: &str) -> String {
    let chars: Vec<char> = token_id.chars().collect();
    if chars.len() <= 12 {
        return token_id.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
