//! In-memory trader and capturing sink for pipeline tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use session_monitor::{
    AlertEvent, DeliveryOutcome, NotificationSink, OpenPosition, PriceSource, SessionError,
    SessionStats, TraderSession,
};

pub fn t0() -> DateTime<Utc> {
    "2024-06-30T12:00:00Z".parse().unwrap()
}

/// Fixed quotes per token
#[derive(Default)]
pub struct MockPrices {
    quotes: HashMap<String, Decimal>,
}

impl MockPrices {
    pub fn with_quote(mut self, token_id: &str, price: Decimal) -> Self {
        self.quotes.insert(token_id.to_string(), price);
        self
    }
}

#[async_trait]
impl PriceSource for MockPrices {
    async fn current_price(&self, token_id: &str) -> Option<Decimal> {
        self.quotes.get(token_id).copied()
    }
}

#[derive(Clone)]
struct TraderState {
    balance: Option<Decimal>,
    positions: Option<Vec<OpenPosition>>,
    stats: Option<SessionStats>,
}

/// Trader whose every read can be made to fail
pub struct MockTrader {
    state: Mutex<TraderState>,
    prices: Option<MockPrices>,
}

impl MockTrader {
    pub fn new(balance: Decimal, stats: SessionStats) -> Self {
        Self {
            state: Mutex::new(TraderState {
                balance: Some(balance),
                positions: Some(Vec::new()),
                stats: Some(stats),
            }),
            prices: None,
        }
    }

    /// 2.0 SOL balance, +0.05 SOL over 10 trades with 6 wins
    pub fn healthy() -> Self {
        Self::new(
            Decimal::TWO,
            SessionStats {
                trade_count: 10,
                win_count: 6,
                best_trade_sol: Decimal::new(3, 2),
                worst_trade_sol: Decimal::new(-1, 2),
                realized_pnl_sol: Decimal::new(5, 2),
                started_at: Some(t0() - chrono::Duration::hours(2)),
            },
        )
    }

    pub fn with_positions(self, positions: Vec<OpenPosition>) -> Self {
        self.update(|s| s.positions = Some(positions));
        self
    }

    pub fn with_prices(mut self, prices: MockPrices) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn fail_balance(&self) {
        self.update(|s| s.balance = None);
    }

    pub fn fail_positions(&self) {
        self.update(|s| s.positions = None);
    }

    pub fn fail_stats(&self) {
        self.update(|s| s.stats = None);
    }

    pub fn set_realized_pnl(&self, pnl: Decimal) {
        self.update(|s| {
            if let Some(stats) = s.stats.as_mut() {
                stats.realized_pnl_sol = pnl;
            }
        });
    }

    fn update(&self, f: impl FnOnce(&mut TraderState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn read(&self) -> TraderState {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait]
impl TraderSession for MockTrader {
    async fn balance(&self) -> Result<Decimal, SessionError> {
        self.read()
            .balance
            .ok_or_else(|| SessionError::Balance("rpc down".to_string()))
    }

    async fn open_positions(&self) -> Result<Vec<OpenPosition>, SessionError> {
        self.read()
            .positions
            .ok_or_else(|| SessionError::Positions("store locked".to_string()))
    }

    async fn session_stats(&self) -> Result<SessionStats, SessionError> {
        self.read()
            .stats
            .ok_or_else(|| SessionError::Stats("counters missing".to_string()))
    }

    fn price_source(&self) -> Option<&dyn PriceSource> {
        self.prices.as_ref().map(|p| p as &dyn PriceSource)
    }
}

pub fn position(id: &str, token_id: &str, entry_price: Decimal, size: Decimal) -> OpenPosition {
    OpenPosition {
        id: id.to_string(),
        token_id: token_id.to_string(),
        strategy: "MOMENTUM_EXPLOSION".to_string(),
        entry_price,
        size,
        entry_time: t0() - chrono::Duration::minutes(15),
    }
}

/// Records every event; optionally fails every send
#[derive(Clone, Default)]
pub struct CapturingSink {
    pub events: Arc<Mutex<Vec<AlertEvent>>>,
    failing: Arc<Mutex<bool>>,
}

impl CapturingSink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for CapturingSink {
    async fn send(&self, event: &AlertEvent) -> DeliveryOutcome {
        self.events.lock().unwrap().push(event.clone());
        if *self.failing.lock().unwrap() {
            DeliveryOutcome::Failed("sink unavailable".to_string())
        } else {
            DeliveryOutcome::Delivered
        }
    }
}
