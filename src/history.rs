//! Session P&L trend kept for the rich chart

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;

use crate::types::TrendPoint;

/// Upper bound on stored points regardless of window
const MAX_POINTS: usize = 2000;

/// Rolling window of session P&L samples
#[derive(Debug, Clone)]
pub struct PnlHistory {
    window: chrono::Duration,
    points: VecDeque<TrendPoint>,
}

impl PnlHistory {
    pub fn new(window: chrono::Duration) -> Self {
        Self {
            window,
            points: VecDeque::new(),
        }
    }

    /// Append a sample and evict everything older than the window
    pub fn record(&mut self, at: DateTime<Utc>, pnl_sol: Decimal, pnl_usd: Decimal) {
        self.points.push_back(TrendPoint { at, pnl_sol, pnl_usd });

        let cutoff = at - self.window;
        while self.points.front().map(|p| p.at <= cutoff).unwrap_or(false) {
            self.points.pop_front();
        }
        while self.points.len() > MAX_POINTS {
            self.points.pop_front();
        }
    }

    pub fn points(&self) -> Vec<TrendPoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
