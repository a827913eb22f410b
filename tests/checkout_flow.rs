//! Engine-level scenarios: contention, idempotency, quota, and expiry.

use chrono::Utc;
use flashsale::error::Error;
use flashsale::mocks::{MockAuditSink, MockItemStore, MockRateLimiter, MockReservationCache};
use flashsale::model::CheckoutCode;
use flashsale::providers::CheckoutService;
use flashsale::services::{CachingCheckout, CheckoutGeneric, LimitingCheckout};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

fn generic(
    store: &MockItemStore,
    hold: Duration,
) -> CheckoutGeneric<MockItemStore, MockAuditSink> {
    CheckoutGeneric::new(store.clone(), MockAuditSink::new(), hold)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn contended_item_has_exactly_one_winner() {
    let store = MockItemStore::new();
    store.insert_live_item(1, Utc::now());
    let engine = generic(&store, Duration::from_secs(180));

    let mut tasks = JoinSet::new();
    for user_id in 1..=1000_i64 {
        let engine = engine.clone();
        tasks.spawn(async move { engine.checkout(user_id, 1).await });
    }

    let mut won = 0;
    let mut conflicted = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => won += 1,
            Err(Error::ItemUnavailable) => conflicted += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(conflicted, 999);
}

#[tokio::test]
async fn checkout_is_idempotent_for_the_holder_within_the_hold() {
    let store = MockItemStore::new();
    store.insert_live_item(1, Utc::now());

    let (_tx, rx) = broadcast::channel(1);
    let engine = CachingCheckout::new(
        generic(&store, Duration::from_secs(180)),
        MockReservationCache::new(),
        Duration::from_secs(180),
        rx,
    );

    let token = engine.checkout(7, 1).await.unwrap();
    let again = engine.checkout(7, 1).await.unwrap();
    assert_eq!(token, again);

    let err = engine.checkout(8, 1).await.unwrap_err();
    assert!(matches!(err, Error::ItemUnavailable));
}

#[tokio::test]
async fn quota_rejects_the_next_checkout_after_limit_purchases() {
    let store = MockItemStore::new();
    let now = Utc::now();
    for item_id in 1..=3 {
        store.insert_live_item(item_id, now);
    }

    let limiter = MockRateLimiter::new(2);
    let engine = LimitingCheckout::new(generic(&store, Duration::from_secs(180)), limiter, false);

    for item_id in 1..=2 {
        let token = engine.checkout(7, item_id).await.unwrap();
        let code: CheckoutCode = token.parse().unwrap();
        engine.purchase(&code).await.unwrap();
    }

    // Two purchases done against a quota of two: the limiter rejects the
    // next checkout before it reaches the store.
    let calls_before = store.reserve_calls();
    let err = engine.checkout(7, 3).await.unwrap_err();
    assert!(matches!(err, Error::LimitExceeded));
    assert_eq!(store.reserve_calls(), calls_before);

    // A different user is unaffected.
    engine.checkout(8, 3).await.unwrap();
}

#[tokio::test]
async fn expired_hold_frees_the_item_and_stales_the_token() {
    let store = MockItemStore::new();
    store.insert_live_item(2, Utc::now());

    let hold = Duration::from_millis(60);
    let (_tx, rx) = broadcast::channel(1);
    let engine = CachingCheckout::new(
        generic(&store, hold),
        MockReservationCache::new(),
        hold,
        rx,
    );

    let stale = engine.checkout(7, 2).await.unwrap();
    tokio::time::sleep(Duration::from_millis(90)).await;

    // The hold lapsed: another user takes the item over.
    let fresh = engine.checkout(8, 2).await.unwrap();
    assert_ne!(stale, fresh);

    // The first user's token no longer purchases anything.
    let code: CheckoutCode = stale.parse().unwrap();
    let err = engine.purchase(&code).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));

    // The new holder's does.
    let code: CheckoutCode = fresh.parse().unwrap();
    engine.purchase(&code).await.unwrap();
}

#[tokio::test]
async fn sale_window_bounds_both_operations() {
    let store = MockItemStore::new();
    let now = Utc::now();

    // Sale already over: reservation fails.
    store.insert_item(1, now - chrono::Duration::hours(2), now - chrono::Duration::hours(1));
    let engine = generic(&store, Duration::from_secs(180));
    let err = engine.checkout(7, 1).await.unwrap_err();
    assert!(matches!(err, Error::ItemUnavailable));

    // Sale closing imminently: reservation succeeds now, but the purchase
    // after the window has passed finds no row.
    store.insert_item(2, now - chrono::Duration::minutes(59), now + chrono::Duration::milliseconds(80));
    let token = engine.checkout(7, 2).await.unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    let code: CheckoutCode = token.parse().unwrap();
    let err = engine.purchase(&code).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));
}
