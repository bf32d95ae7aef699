//! Snapshot derivation against an in-memory trader

mod support;

use rust_decimal::Decimal;
use session_monitor::{SessionStats, SnapshotBuilder, SnapshotError};
use support::{position, t0, MockPrices, MockTrader};

fn builder() -> SnapshotBuilder {
    SnapshotBuilder::new(Decimal::from(240), Decimal::from(200))
}

#[tokio::test]
async fn test_reference_session_numbers() {
    let trader = MockTrader::healthy();
    let snapshot = builder().build(&trader, vec![], vec![], t0()).await.unwrap();

    assert_eq!(snapshot.balance_sol, Decimal::TWO);
    assert_eq!(snapshot.session_pnl_sol, Decimal::new(5, 2));
    assert_eq!(snapshot.session_pnl_usd, Decimal::from(12));
    assert_eq!(snapshot.win_rate_pct, Decimal::from(60));
    assert_eq!(snapshot.progress_pct, Decimal::from(6));
    assert_eq!(snapshot.captured_at, t0());
}

#[tokio::test]
async fn test_zero_trades_has_zero_win_rate() {
    let trader = MockTrader::new(Decimal::ONE, SessionStats::default());
    let snapshot = builder().build(&trader, vec![], vec![], t0()).await.unwrap();

    assert_eq!(snapshot.trade_count, 0);
    assert_eq!(snapshot.win_rate_pct, Decimal::ZERO);
    assert_eq!(snapshot.progress_pct, Decimal::ZERO);
}

#[tokio::test]
async fn test_losing_session_has_zero_progress() {
    let trader = MockTrader::healthy();
    trader.set_realized_pnl(Decimal::new(-3, 1));
    let snapshot = builder().build(&trader, vec![], vec![], t0()).await.unwrap();

    assert_eq!(snapshot.session_pnl_usd, Decimal::from(-72));
    assert_eq!(snapshot.progress_pct, Decimal::ZERO);
}

#[tokio::test]
async fn test_unpriced_position_excluded_from_aggregate() {
    let trader = MockTrader::healthy()
        .with_positions(vec![
            position("p1", "NOPRICE", Decimal::ONE, Decimal::from(5)),
            position("p2", "PRICED", Decimal::ONE, Decimal::from(2)),
        ])
        .with_prices(MockPrices::default().with_quote("PRICED", Decimal::new(125, 2)));

    let snapshot = builder().build(&trader, vec![], vec![], t0()).await.unwrap();

    let unpriced = &snapshot.positions[0];
    assert!(unpriced.pnl.is_none());
    assert!(unpriced.current_price.is_none());
    assert_eq!(unpriced.hold_minutes, 15);

    let priced = snapshot.positions[1].pnl.unwrap();
    assert_eq!(priced.percent, Decimal::from(25));
    assert_eq!(priced.amount_sol, Decimal::new(5, 1));
    assert_eq!(snapshot.unrealized_pnl_sol, Decimal::new(5, 1));
}

#[tokio::test]
async fn test_no_price_capability_degrades_every_position() {
    let trader = MockTrader::healthy().with_positions(vec![position(
        "p1",
        "TOKEN",
        Decimal::ONE,
        Decimal::ONE,
    )]);

    let snapshot = builder().build(&trader, vec![], vec![], t0()).await.unwrap();
    assert!(!snapshot.positions[0].pnl_available());
    assert_eq!(snapshot.unrealized_pnl_sol, Decimal::ZERO);
}

#[tokio::test]
async fn test_non_positive_quote_treated_as_missing() {
    let trader = MockTrader::healthy()
        .with_positions(vec![position("p1", "TOKEN", Decimal::ONE, Decimal::ONE)])
        .with_prices(MockPrices::default().with_quote("TOKEN", Decimal::ZERO));

    let snapshot = builder().build(&trader, vec![], vec![], t0()).await.unwrap();
    assert!(snapshot.positions[0].current_price.is_none());
}

#[tokio::test]
async fn test_unreadable_trader_fails_build() {
    let trader = MockTrader::healthy();
    trader.fail_stats();

    let result = builder().build(&trader, vec![], vec![], t0()).await;
    assert!(matches!(result, Err(SnapshotError::Session(_))));
}

#[tokio::test]
async fn test_invalid_rate_rejected() {
    let trader = MockTrader::healthy();
    let result = SnapshotBuilder::new(Decimal::ZERO, Decimal::from(200))
        .build(&trader, vec![], vec![], t0())
        .await;
    assert!(matches!(result, Err(SnapshotError::Config(_))));
}
