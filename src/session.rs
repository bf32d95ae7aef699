//! Trader/session collaborator
//!
//! The monitor only reads session state. The trading process owns it and
//! exposes it either directly (anything implementing [`TraderSession`]) or
//! through the JSON state document read by [`FileSession`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::error::SessionError;
use crate::escalation::CloseFailureReport;

/// Optional capability: current price lookup (SOL per token)
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// None when the feed has no usable quote for this token
    async fn current_price(&self, token_id: &str) -> Option<Decimal>;
}

/// Read-only view of a running trading session
#[async_trait]
pub trait TraderSession: Send + Sync {
    /// Wallet balance in SOL
    async fn balance(&self) -> Result<Decimal, SessionError>;

    async fn open_positions(&self) -> Result<Vec<OpenPosition>, SessionError>;

    async fn session_stats(&self) -> Result<SessionStats, SessionError>;

    /// Balance, positions and counters taken from one point in time
    ///
    /// The default reads each part separately; sessions backed by a single
    /// document override this to read it once.
    async fn read_state(&self) -> Result<SessionState, SessionError> {
        Ok(SessionState {
            balance_sol: self.balance().await?,
            positions: self.open_positions().await?,
            stats: self.session_stats().await?,
        })
    }

    /// Price lookup, if this session has one
    fn price_source(&self) -> Option<&dyn PriceSource> {
        None
    }
}

/// An open position as reported by the trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub id: String,
    pub token_id: String,
    #[serde(default)]
    pub strategy: String,
    /// Entry price in SOL per token
    pub entry_price: Decimal,
    /// Token quantity
    pub size: Decimal,
    pub entry_time: DateTime<Utc>,
}

/// Session counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub trade_count: u32,
    pub win_count: u32,
    #[serde(default)]
    pub best_trade_sol: Decimal,
    #[serde(default)]
    pub worst_trade_sol: Decimal,
    /// Cumulative realized P&L in SOL
    pub realized_pnl_sol: Decimal,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// Consistent read of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub balance_sol: Decimal,
    pub positions: Vec<OpenPosition>,
    pub stats: SessionStats,
}

/// Session state document (`now.json`) written by the trading process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDocument {
    pub balance_sol: Decimal,
    #[serde(default)]
    pub positions: Vec<OpenPosition>,
    #[serde(default)]
    pub stats: SessionStats,
    /// Failed close attempts since the process started
    #[serde(default)]
    pub close_failures: Vec<CloseFailureReport>,
}

impl SessionDocument {
    pub fn state(&self) -> SessionState {
        SessionState {
            balance_sol: self.balance_sol,
            positions: self.positions.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Session backed by the trading process's state document
///
/// Nothing is cached between calls, so an unreadable document shows up as an
/// unreadable session rather than stale numbers. A tick that needs the
/// document more than once reads it once and works on a [`DocumentView`].
pub struct FileSession {
    path: PathBuf,
    prices: Option<Arc<dyn PriceSource>>,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prices: None,
        }
    }

    pub fn with_price_source(mut self, prices: Arc<dyn PriceSource>) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read and parse the whole document
    pub async fn read(&self) -> Result<SessionDocument, SessionError> {
        let raw = fs::read_to_string(&self.path).await.map_err(|e| {
            SessionError::StateFile(format!("{}: {}", self.path.display(), e))
        })?;
        let doc: SessionDocument = serde_json::from_str(&raw).map_err(|e| {
            SessionError::StateFile(format!("{}: {}", self.path.display(), e))
        })?;
        debug!("Read session state from {}", self.path.display());
        Ok(doc)
    }

    /// Session over an already-read document, with this session's prices
    pub fn view<'a>(&'a self, doc: &'a SessionDocument) -> DocumentView<'a> {
        DocumentView {
            doc,
            prices: self.prices.as_deref(),
        }
    }
}

#[async_trait]
impl TraderSession for FileSession {
    async fn balance(&self) -> Result<Decimal, SessionError> {
        self.read()
            .await
            .map(|doc| doc.balance_sol)
            .map_err(|e| SessionError::Balance(e.to_string()))
    }

    async fn open_positions(&self) -> Result<Vec<OpenPosition>, SessionError> {
        self.read()
            .await
            .map(|doc| doc.positions)
            .map_err(|e| SessionError::Positions(e.to_string()))
    }

    async fn session_stats(&self) -> Result<SessionStats, SessionError> {
        self.read()
            .await
            .map(|doc| doc.stats)
            .map_err(|e| SessionError::Stats(e.to_string()))
    }

    async fn read_state(&self) -> Result<SessionState, SessionError> {
        self.read().await.map(|doc| doc.state())
    }

    fn price_source(&self) -> Option<&dyn PriceSource> {
        self.prices.as_deref()
    }
}

/// One document read, served as a session
pub struct DocumentView<'a> {
    doc: &'a SessionDocument,
    prices: Option<&'a dyn PriceSource>,
}

impl<'a> DocumentView<'a> {
    pub fn document(&self) -> &SessionDocument {
        self.doc
    }
}

#[async_trait]
impl<'a> TraderSession for DocumentView<'a> {
    async fn balance(&self) -> Result<Decimal, SessionError> {
        Ok(self.doc.balance_sol)
    }

    async fn open_positions(&self) -> Result<Vec<OpenPosition>, SessionError> {
        Ok(self.doc.positions.clone())
    }

    async fn session_stats(&self) -> Result<SessionStats, SessionError> {
        Ok(self.doc.stats.clone())
    }

    async fn read_state(&self) -> Result<SessionState, SessionError> {
        Ok(self.doc.state())
    }

    fn price_source(&self) -> Option<&dyn PriceSource> {
        self.prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STATE: &str = r#"{
        "balance_sol": "2.0",
        "positions": [{
            "id": "pos-1",
            "token_id": "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R",
            "strategy": "MOMENTUM_EXPLOSION",
            "entry_price": "0.0001",
            "size": "1000",
            "entry_time": "2024-06-30T12:00:00Z"
        }],
        "stats": {
            "trade_count": 10,
            "win_count": 6,
            "realized_pnl_sol": "0.05"
        }
    }"#;

    #[tokio::test]
    async fn test_file_session_reads_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STATE.as_bytes()).unwrap();

        let session = FileSession::new(file.path());
        assert_eq!(session.balance().await.unwrap(), Decimal::from(2));

        let positions = session.open_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].strategy, "MOMENTUM_EXPLOSION");

        let stats = session.session_stats().await.unwrap();
        assert_eq!(stats.trade_count, 10);
        assert_eq!(stats.best_trade_sol, Decimal::ZERO);
        assert!(session.price_source().is_none());
    }

    /// Counts balance reads; positions are always unreadable
    struct PartsSession {
        reads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl TraderSession for PartsSession {
        async fn balance(&self) -> Result<Decimal, SessionError> {
            self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Decimal::ONE)
        }

        async fn open_positions(&self) -> Result<Vec<OpenPosition>, SessionError> {
            Err(SessionError::Positions("store locked".to_string()))
        }

        async fn session_stats(&self) -> Result<SessionStats, SessionError> {
            Ok(SessionStats::default())
        }
    }

    #[tokio::test]
    async fn test_read_state_parses_document_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STATE.as_bytes()).unwrap();
        let session = FileSession::new(file.path());

        let state = session.read_state().await.unwrap();

        // Rewriting the document afterwards does not leak into the taken state
        std::fs::write(file.path(), "{ half written").unwrap();
        assert_eq!(state.balance_sol, Decimal::from(2));
        assert_eq!(state.positions.len(), 1);
        assert_eq!(state.stats.win_count, 6);
        assert!(session.read_state().await.is_err());
    }

    #[tokio::test]
    async fn test_view_serves_one_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STATE.as_bytes()).unwrap();
        let session = FileSession::new(file.path());
        let doc = session.read().await.unwrap();

        std::fs::remove_file(file.path()).unwrap();

        let view = session.view(&doc);
        assert_eq!(view.balance().await.unwrap(), Decimal::from(2));
        assert_eq!(view.read_state().await.unwrap(), doc.state());
        assert_eq!(view.document().positions[0].id, "pos-1");
        assert!(view.price_source().is_none());
    }

    #[tokio::test]
    async fn test_default_read_state_propagates_part_failure() {
        let session = PartsSession {
            reads: std::sync::atomic::AtomicUsize::new(0),
        };
        assert!(matches!(
            session.read_state().await,
            Err(SessionError::Positions(_))
        ));
        assert_eq!(session.reads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let session = FileSession::new(dir.path().join("missing.json"));

        assert!(matches!(
            session.balance().await,
            Err(SessionError::Balance(_))
        ));
        assert!(matches!(
            session.open_positions().await,
            Err(SessionError::Positions(_))
        ));
    }
}
