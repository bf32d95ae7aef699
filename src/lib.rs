//! Session Monitor Library
//!
//! Operational monitor for an automated trading session: throttled
//! dashboards with tiered rendering fallback, webhook delivery and
//! escalation of positions that cannot be closed.

pub mod alerts;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod escalation;
pub mod history;
pub mod monitor;
pub mod price_feed;
pub mod render;
pub mod session;
pub mod snapshot;
pub mod throttle;
pub mod types;


// Re-export main types for convenience
pub use alerts::ClosedTrade;
pub use config::MonitorConfig;
pub use dispatch::{DeliveryOutcome, LogSink, NotificationSink, WebhookDispatcher};
pub use error::{ConfigError, RenderError, SessionError, SnapshotError};
pub use escalation::{CloseFailureReport, EscalationTracker};
pub use monitor::{DashboardEmission, SessionMonitor, TickOutcome};
pub use price_feed::HttpPriceFeed;
pub use render::{DashboardRenderer, RenderStrategy, RenderTier, Rendered};
pub use session::{
    DocumentView, FileSession, OpenPosition, PriceSource, SessionDocument, SessionState, SessionStats,
    TraderSession,
};
pub use snapshot::SnapshotBuilder;
pub use throttle::{Clock, ManualClock, SystemClock, ThrottleClass, ThrottleGate};
pub use types::{AlertEvent, PositionView, Severity, Snapshot};
