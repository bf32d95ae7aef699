//! Session monitor: ties the pipeline together
//!
//! A host calls [`SessionMonitor::tick`] on a fixed schedule. Close failures
//! and closed trades are pushed in directly and bypass the throttle.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::alerts::{self, ClosedTrade};
use crate::config::MonitorConfig;
use crate::dispatch::{DeliveryOutcome, NotificationSink};
use crate::escalation::{CloseFailureReport, EscalationTracker};
use crate::history::PnlHistory;
use crate::render::{text::basics_from, DashboardRenderer, RenderTier, Rendered};
use crate::session::{PriceSource, TraderSession};
use crate::snapshot::SnapshotBuilder;
use crate::throttle::{Clock, SystemClock, ThrottleClass, ThrottleGate};
use crate::types::{AlertEvent, SessionBasics};

/// Dashboard sent during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardEmission {
    pub tier: RenderTier,
    pub outcome: DeliveryOutcome,
}

/// What one tick emitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub startup: Option<DeliveryOutcome>,
    pub dashboard: Option<DashboardEmission>,
}

pub struct SessionMonitor {
    config: MonitorConfig,
    gate: ThrottleGate,
    builder: SnapshotBuilder,
    renderer: DashboardRenderer,
    sink: Arc<dyn NotificationSink>,
    history: Mutex<PnlHistory>,
    tracker: EscalationTracker,
    clock: Arc<dyn Clock>,
}

impl SessionMonitor {
    pub fn new(config: MonitorConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            gate: ThrottleGate::new(config.dashboard_interval()),
            builder: SnapshotBuilder::from_config(&config),
            renderer: DashboardRenderer::new(&config),
            history: Mutex::new(PnlHistory::new(config.trend_window())),
            tracker: EscalationTracker::from_config(&config),
            clock: Arc::new(SystemClock),
            sink,
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_renderer(mut self, renderer: DashboardRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &EscalationTracker {
        &self.tracker
    }

    pub fn gate(&self) -> &ThrottleGate {
        &self.gate
    }

    /// Scheduled tick: startup notice once, then the throttled dashboard
    pub async fn tick(&self, trader: &dyn TraderSession) -> TickOutcome {
        let now = self.clock.now();
        let mut outcome = TickOutcome::default();

        if self.config.startup_notice && self.gate.allow(ThrottleClass::Startup, now).await {
            let event = self.finish(alerts::startup_notice(&self.config, now));
            outcome.startup = Some(self.sink.send(&event).await);
            info!("Startup notice emitted");
        }

        if !self.gate.allow(ThrottleClass::Dashboard, now).await {
            return outcome;
        }

        let rendered = self.render_dashboard(trader, now).await;
        let delivery = self.sink.send(&rendered.event).await;
        info!(
            tier = %rendered.tier,
            delivered = delivery.is_delivered(),
            "Dashboard emitted"
        );

        outcome.dashboard = Some(DashboardEmission {
            tier: rendered.tier,
            outcome: delivery,
        });
        outcome
    }

    async fn render_dashboard(
        &self,
        trader: &dyn TraderSession,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Rendered {
        let stuck = self.tracker.stuck_positions().await;
        let trend = self.history.lock().await.points();

        match self.builder.build(trader, trend, stuck, now).await {
            Ok(mut snapshot) => {
                let mut history = self.history.lock().await;
                history.record(now, snapshot.session_pnl_sol, snapshot.session_pnl_usd);
                snapshot.trend = history.points();
                drop(history);

                debug!(
                    positions = snapshot.positions.len(),
                    stuck = snapshot.stuck.len(),
                    "Snapshot built"
                );
                self.renderer.render(&snapshot)
            }
            Err(e) => {
                warn!("Snapshot unavailable, sending degraded dashboard: {}", e);
                let basics = self.degraded_basics(trader).await;
                self.renderer.render_degraded(basics.as_ref(), now)
            }
        }
    }

    /// Whatever can still be read once the full snapshot failed
    async fn degraded_basics(&self, trader: &dyn TraderSession) -> Option<SessionBasics> {
        let balance = match trader.balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Balance unavailable: {}", e);
                return None;
            }
        };
        let realized = match trader.session_stats().await {
            Ok(stats) => stats.realized_pnl_sol,
            Err(e) => {
                warn!("Session stats unavailable, reporting zero P&L: {}", e);
                rust_decimal::Decimal::ZERO
            }
        };
        let basics = basics_from(balance, realized, self.builder.sol_usd_rate());
        if basics.is_none() {
            warn!("Session P&L out of range, sending static dashboard");
        }
        basics
    }

    /// Failed close reported by the execution layer; never throttled
    pub async fn on_close_failure(
        &self,
        report: &CloseFailureReport,
        prices: Option<&dyn PriceSource>,
    ) -> Vec<DeliveryOutcome> {
        let price = match prices {
            Some(source) => source.current_price(&report.token_id).await,
            None => None,
        };

        match self.tracker.record_failure(report, price).await {
            Some(event) => {
                let event = self.finish(event);
                self.tracker.escalate(self.sink.as_ref(), &event).await
            }
            None => Vec::new(),
        }
    }

    /// Closed trade notification; never throttled
    pub async fn on_trade_closed(&self, trade: &ClosedTrade) -> DeliveryOutcome {
        let now = self.clock.now();
        let event = self.finish(alerts::trade_alert(trade, &self.config, now));
        self.sink.send(&event).await
    }

    /// Position closed; clears any escalation state for it
    pub async fn on_position_closed(&self, position_id: &str) -> bool {
        self.tracker.record_close(position_id).await
    }

    /// Operator gave up on a stuck position
    pub async fn abandon_position(&self, position_id: &str) -> bool {
        self.tracker.abandon(position_id).await
    }

    /// Discard escalation state for positions that are no longer open
    pub async fn reconcile_open_positions(&self, open_ids: &[String]) -> Vec<String> {
        self.tracker.retain_open(open_ids).await
    }

    fn finish(&self, event: AlertEvent) -> AlertEvent {
        if self.config.footer.is_empty() {
            event
        } else {
            event.with_footer(self.config.footer.clone())
        }
    }
}
