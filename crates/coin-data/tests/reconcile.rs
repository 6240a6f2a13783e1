//! 추출 → reconcile 통합 테스트 (인메모리 저장소).

use std::sync::Arc;

use chrono::Utc;
use coin_core::InstrumentRef;
use coin_data::{ListingExtractor, MarketStore, MemoryMarketStore, StoreError};
use futures::future::join_all;

const LISTING: &str = include_str!("fixtures/listing.html");

#[tokio::test]
async fn known_instruments_receive_measurements() {
    let store = MemoryMarketStore::new();
    store.create_instrument("bitcoin", "BTC").await.unwrap();
    store.create_instrument("Ripple", "XRP").await.unwrap();

    let records = ListingExtractor::new().unwrap().extract(LISTING).unwrap();
    let captured_at = Utc::now();
    let report = store.reconcile(&records, captured_at).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped_names, ["Ethereum"]);

    for key in ["BTC", "XRP"] {
        let history = store.history(&InstrumentRef::parse(key)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].captured_at, captured_at);
    }
}

#[tokio::test]
async fn empty_store_skips_everything() {
    let store = MemoryMarketStore::new();
    let records = ListingExtractor::new().unwrap().extract(LISTING).unwrap();

    let report = store.reconcile(&records, Utc::now()).await.unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped, records.len());
    assert!(store.list_instruments().await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_runs_append_history() {
    let store = MemoryMarketStore::new();
    store.create_instrument("Bitcoin", "BTC").await.unwrap();
    let records = ListingExtractor::new().unwrap().extract(LISTING).unwrap();

    let first = Utc::now();
    let second = first + chrono::Duration::minutes(10);
    store.reconcile(&records, second).await.unwrap();
    store.reconcile(&records, first).await.unwrap();

    let history = store.history(&InstrumentRef::name("bitcoin")).await.unwrap();
    let times: Vec<_> = history.iter().map(|m| m.captured_at).collect();
    assert_eq!(times, [first, second]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_has_one_winner() {
    let store: Arc<dyn MarketStore> = Arc::new(MemoryMarketStore::new());

    // 각 요청은 별도 태스크(워커 스레드)에서 실행
    let handles = (0..8).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create_instrument("Ethereum", "ETH").await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(StoreError::AlreadyExists(_))))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(store.list_instruments().await.unwrap().len(), 1);
}
