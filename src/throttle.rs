//! Emission throttling per update class

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

/// Source of "now" for the monitor
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic scheduling
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Update classes with independent rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleClass {
    /// Once per process lifetime
    Startup,
    /// At most once per interval
    Dashboard,
}

impl ThrottleClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleClass::Startup => "startup",
            ThrottleClass::Dashboard => "dashboard",
        }
    }
}

/// Last authorized emission per class
#[derive(Debug, Clone, Default)]
pub struct ThrottleState {
    startup: Option<DateTime<Utc>>,
    dashboard: Option<DateTime<Utc>>,
}

impl ThrottleState {
    fn last(&self, class: ThrottleClass) -> Option<DateTime<Utc>> {
        match class {
            ThrottleClass::Startup => self.startup,
            ThrottleClass::Dashboard => self.dashboard,
        }
    }

    fn record(&mut self, class: ThrottleClass, now: DateTime<Utc>) {
        match class {
            ThrottleClass::Startup => self.startup = Some(now),
            ThrottleClass::Dashboard => self.dashboard = Some(now),
        }
    }
}

/// Decides whether an update may be emitted now
///
/// The check and the record happen under one write lock, so two concurrent
/// ticks can never both be authorized for the same window. Authorizations are
/// never rolled back, even if the send that follows fails.
pub struct ThrottleGate {
    interval: chrono::Duration,
    state: RwLock<ThrottleState>,
}

impl ThrottleGate {
    pub fn new(interval: chrono::Duration) -> Self {
        Self {
            interval,
            state: RwLock::new(ThrottleState::default()),
        }
    }

    /// True (and `now` recorded) only when `class` may emit at `now`
    pub async fn allow(&self, class: ThrottleClass, now: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;

        let permitted = match (class, state.last(class)) {
            (_, None) => true,
            (ThrottleClass::Startup, Some(_)) => false,
            (ThrottleClass::Dashboard, Some(last)) => {
                now.signed_duration_since(last) >= self.interval
            }
        };

        if permitted {
            state.record(class, now);
        } else {
            debug!(class = class.as_str(), "Emission throttled");
        }

        permitted
    }

    pub async fn last_emitted(&self, class: ThrottleClass) -> Option<DateTime<Utc>> {
        self.state.read().await.last(class)
    }

    pub fn interval(&self) -> chrono::Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        "2024-06-30T00:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_startup_fires_once() {
        let gate = ThrottleGate::new(Duration::seconds(300));
        assert!(gate.allow(ThrottleClass::Startup, t0()).await);
        assert!(!gate.allow(ThrottleClass::Startup, t0()).await);
        assert!(!gate.allow(ThrottleClass::Startup, t0() + Duration::days(30)).await);
        assert_eq!(gate.last_emitted(ThrottleClass::Startup).await, Some(t0()));
    }

    #[tokio::test]
    async fn test_classes_are_independent() {
        let gate = ThrottleGate::new(Duration::seconds(300));
        assert!(gate.allow(ThrottleClass::Startup, t0()).await);
        assert!(gate.allow(ThrottleClass::Dashboard, t0()).await);
    }

    #[tokio::test]
    async fn test_dashboard_window_measured_from_authorized_time() {
        let gate = ThrottleGate::new(Duration::seconds(300));
        assert!(gate.allow(ThrottleClass::Dashboard, t0()).await);

        // Rejected ticks do not move the window
        assert!(!gate.allow(ThrottleClass::Dashboard, t0() + Duration::seconds(200)).await);
        assert!(!gate.allow(ThrottleClass::Dashboard, t0() + Duration::seconds(299)).await);
        assert!(gate.allow(ThrottleClass::Dashboard, t0() + Duration::seconds(300)).await);
        assert_eq!(
            gate.last_emitted(ThrottleClass::Dashboard).await,
            Some(t0() + Duration::seconds(300))
        );
    }

    #[tokio::test]
    async fn test_dashboard_at_most_once_per_window() {
        let gate = ThrottleGate::new(Duration::seconds(300));
        let mut now = t0();
        let mut authorized: Vec<DateTime<Utc>> = Vec::new();

        // Irregular tick spacing, including bursts and long gaps
        for i in 0..500u64 {
            let step = (i * 37 % 113) as i64 + if i % 50 == 0 { 900 } else { 0 };
            now += Duration::seconds(step);
            if gate.allow(ThrottleClass::Dashboard, now).await {
                authorized.push(now);
            }
        }

        assert!(authorized.len() > 1);
        for pair in authorized.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::seconds(300));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ticks_authorize_once() {
        let gate = std::sync::Arc::new(ThrottleGate::new(Duration::seconds(300)));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.allow(ThrottleClass::Dashboard, t0()).await })
            })
            .collect();

        let mut authorized = 0;
        for handle in handles {
            if handle.await.unwrap() {
                authorized += 1;
            }
        }
        assert_eq!(authorized, 1);
        assert_eq!(gate.last_emitted(ThrottleClass::Dashboard).await, Some(t0()));
    }

    #[tokio::test]
    async fn test_clock_going_backwards_is_throttled() {
        let gate = ThrottleGate::new(Duration::seconds(300));
        assert!(gate.allow(ThrottleClass::Dashboard, t0()).await);
        assert!(!gate.allow(ThrottleClass::Dashboard, t0() - Duration::seconds(600)).await);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), t0() + Duration::seconds(90));
        clock.set(t0());
        assert_eq!(clock.now(), t0());
    }
}
