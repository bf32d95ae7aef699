//! Snapshot construction from live trader state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::error::SnapshotError;
use crate::session::{OpenPosition, PriceSource, TraderSession};
use crate::types::{display_token, PositionPnl, PositionView, Snapshot, StuckPosition, TrendPoint};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Builds a normalized [`Snapshot`] from a trader session
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    sol_usd_rate: Decimal,
    daily_target_usd: Decimal,
}

impl SnapshotBuilder {
    pub fn new(sol_usd_rate: Decimal, daily_target_usd: Decimal) -> Self {
        Self {
            sol_usd_rate,
            daily_target_usd,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.sol_usd_rate, config.daily_target_usd)
    }

    pub fn sol_usd_rate(&self) -> Decimal {
        self.sol_usd_rate
    }

    /// Read the session and derive every reported number
    ///
    /// Fails only when the session itself cannot be read. Missing prices
    /// leave the affected position without P&L.
    pub async fn build(
        &self,
        trader: &dyn TraderSession,
        trend: Vec<TrendPoint>,
        stuck: Vec<StuckPosition>,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, SnapshotError> {
        if self.sol_usd_rate <= Decimal::ZERO {
            return Err(SnapshotError::Config(format!(
                "sol_usd_rate must be positive, got {}",
                self.sol_usd_rate
            )));
        }

        let state = trader.read_state().await?;
        let balance_sol = state.balance_sol;
        let open = state.positions;
        let stats = state.stats;

        let prices = trader.price_source();
        if prices.is_none() && !open.is_empty() {
            debug!("Trader has no price source; position P&L unavailable");
        }

        let mut positions = Vec::with_capacity(open.len());
        for pos in &open {
            let price = lookup_price(prices, pos).await;
            positions.push(position_view(pos, price, now));
        }

        let unrealized_pnl_sol = positions
            .iter()
            .filter_map(|p| p.pnl.map(|pnl| pnl.amount_sol))
            .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
            .ok_or(SnapshotError::Overflow("unrealized P&L"))?;

        let session_pnl_sol = stats.realized_pnl_sol;
        let session_pnl_usd = session_pnl_sol
            .checked_mul(self.sol_usd_rate)
            .ok_or(SnapshotError::Overflow("session P&L in USD"))?;

        Ok(Snapshot {
            captured_at: now,
            session_started_at: stats.started_at,
            balance_sol,
            session_pnl_sol,
            session_pnl_usd,
            trade_count: stats.trade_count,
            win_count: stats.win_count,
            win_rate_pct: win_rate(stats.trade_count, stats.win_count),
            best_trade_sol: stats.best_trade_sol,
            worst_trade_sol: stats.worst_trade_sol,
            positions,
            unrealized_pnl_sol,
            daily_target_usd: self.daily_target_usd,
            progress_pct: progress_pct(session_pnl_usd, self.daily_target_usd),
            trend,
            stuck,
        })
    }
}

async fn lookup_price(prices: Option<&dyn PriceSource>, pos: &OpenPosition) -> Option<Decimal> {
    let source = prices?;
    match source.current_price(&pos.token_id).await {
        Some(price) if price > Decimal::ZERO => Some(price),
        Some(price) => {
            warn!(token = %pos.token_id, %price, "Ignoring non-positive price");
            None
        }
        None => None,
    }
}

/// Win rate in percent; 0 when there are no trades
pub fn win_rate(trade_count: u32, win_count: u32) -> Decimal {
    if trade_count == 0 {
        return Decimal::ZERO;
    }
    let wins = Decimal::from(win_count.min(trade_count));
    (wins * HUNDRED / Decimal::from(trade_count)).clamp(Decimal::ZERO, HUNDRED)
}

/// Progress towards the daily target in percent, clamped to [0, 100]
///
/// A losing or flat session reports 0, never negative progress.
pub fn progress_pct(session_pnl_usd: Decimal, daily_target_usd: Decimal) -> Decimal {
    if session_pnl_usd <= Decimal::ZERO || daily_target_usd <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // Quotients too large to represent are far past the target anyway
    session_pnl_usd
        .checked_div(daily_target_usd)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .map_or(HUNDRED, |pct| pct.min(HUNDRED))
}

/// P&L of `size` tokens bought at `entry` and now quoted at `current`
///
/// None when the entry price is not positive or a value does not fit.
pub fn position_pnl(entry: Decimal, current: Decimal, size: Decimal) -> Option<PositionPnl> {
    if entry <= Decimal::ZERO {
        return None;
    }
    let delta = current.checked_sub(entry)?;
    Some(PositionPnl {
        percent: delta.checked_div(entry)?.checked_mul(HUNDRED)?,
        amount_sol: size.checked_mul(delta)?,
    })
}

/// Derive the display view of a position at an optional current price
pub fn position_view(pos: &OpenPosition, current_price: Option<Decimal>, now: DateTime<Utc>) -> PositionView {
    let pnl = current_price.and_then(|current| {
        let pnl = position_pnl(pos.entry_price, current, pos.size);
        if pnl.is_none() && pos.entry_price > Decimal::ZERO {
            warn!(token = %pos.token_id, %current, "Position P&L out of range");
        }
        pnl
    });

    PositionView {
        token_id: pos.token_id.clone(),
        display_token: display_token(&pos.token_id),
        strategy: pos.strategy.clone(),
        size: pos.size,
        entry_price: pos.entry_price,
        current_price,
        pnl,
        hold_minutes: now.signed_duration_since(pos.entry_time).num_minutes().max(0),
    }
}
