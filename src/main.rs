//! Session Monitor - watches a running trading session
//!
//! 1. Reads the session state document written by the trading process
//! 2. Emits a throttled dashboard to the notification webhook
//! 3. Escalates positions whose close attempts keep failing

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use session_monitor::{
    FileSession, HttpPriceFeed, LogSink, MonitorConfig, NotificationSink, PriceSource,
    SessionDocument, SessionMonitor, WebhookDispatcher,
};

/// Session monitor entry point
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting Session Monitor...");

    let config_path = std::env::var("MONITOR_CONFIG_FILE").ok().map(PathBuf::from);
    let config = MonitorConfig::load(config_path.as_deref())?;

    let sink: Arc<dyn NotificationSink> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookDispatcher::from_config(&config, url)?),
        None => {
            warn!("No webhook configured, events will only be logged");
            Arc::new(LogSink)
        }
    };

    let state_path = config
        .resolved_state_path()
        .ok_or_else(|| anyhow::anyhow!("No state_path configured and no home directory found"))?;
    info!("State document: {}", state_path.display());

    let prices: Option<Arc<HttpPriceFeed>> = match &config.price_feed_url {
        Some(url) => Some(Arc::new(HttpPriceFeed::new(
            url,
            Duration::from_secs(config.request_timeout_secs),
        )?)),
        None => None,
    };

    let mut session = FileSession::new(state_path);
    if let Some(feed) = &prices {
        session = session.with_price_source(feed.clone());
    }

    let tick_secs = config.tick_secs;
    let monitor = SessionMonitor::new(config, sink);

    run(&monitor, &session, prices.as_deref(), tick_secs).await;
    Ok(())
}

async fn run(
    monitor: &SessionMonitor,
    session: &FileSession,
    prices: Option<&HttpPriceFeed>,
    tick_secs: u64,
) {
    let mut ticks = interval(Duration::from_secs(tick_secs));
    let mut forwarded: HashSet<(String, DateTime<Utc>)> = HashSet::new();

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                // One document read per tick feeds both escalation and the dashboard
                let outcome = match session.read().await {
                    Ok(doc) => {
                        forward_close_failures(monitor, &doc, prices, &mut forwarded).await;
                        monitor.tick(&session.view(&doc)).await
                    }
                    Err(e) => {
                        debug!("Skipping close failure check: {}", e);
                        monitor.tick(session).await
                    }
                };
                debug!(?outcome, "Tick complete");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down Session Monitor");
                break;
            }
        }
    }
}

/// Hand new close failures from the state document to the tracker
async fn forward_close_failures(
    monitor: &SessionMonitor,
    doc: &SessionDocument,
    prices: Option<&HttpPriceFeed>,
    forwarded: &mut HashSet<(String, DateTime<Utc>)>,
) {
    let open_ids: Vec<String> = doc.positions.iter().map(|p| p.id.clone()).collect();
    monitor.reconcile_open_positions(&open_ids).await;
    forwarded.retain(|(id, _)| open_ids.contains(id));

    for report in &doc.close_failures {
        if !open_ids.contains(&report.position_id) {
            continue;
        }
        if !forwarded.insert((report.position_id.clone(), report.failed_at)) {
            continue;
        }
        let source = prices.map(|p| p as &dyn PriceSource);
        let outcomes = monitor.on_close_failure(report, source).await;
        info!(
            position_id = %report.position_id,
            sends = outcomes.len(),
            delivered = outcomes.iter().filter(|o| o.is_delivered()).count(),
            "Close failure processed"
        );
    }
}
