//! 인메모리 저장소.
//!
//! `database.url`이 설정되지 않았을 때와 테스트에서 사용합니다.
//! 모든 변경은 하나의 쓰기 락 안에서 이루어지므로 reconcile은 원자적입니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coin_core::{Instrument, InstrumentRef, Measurement, MeasurementFields, RawRecord};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{validated_instrument, DeletedInstrument, MarketStore, ReconcileReport};
use crate::error::{Result, StoreError};

#[derive(Default)]
struct Inner {
    /// 정규화 이름 → 종목
    instruments: HashMap<String, Instrument>,
    /// 종목 ID → 스냅샷 (추가 순서)
    measurements: HashMap<Uuid, Vec<Measurement>>,
}

impl Inner {
    fn find(&self, key: &InstrumentRef) -> Option<&Instrument> {
        match key {
            InstrumentRef::Name(name) => self.instruments.get(name),
            InstrumentRef::Symbol(_) => self
                .instruments
                .values()
                .filter(|i| key.matches(i))
                .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
        }
    }

    fn resolve(&self, key: &InstrumentRef) -> Result<&Instrument> {
        self.find(key)
            .ok_or_else(|| StoreError::NotFound(format!("instrument {}", key)))
    }

    /// 수집 시각 오름차순, 같은 시각이면 추가 순서.
    fn sorted_history(&self, instrument_id: Uuid) -> Vec<Measurement> {
        let mut history = self
            .measurements
            .get(&instrument_id)
            .cloned()
            .unwrap_or_default();
        history.sort_by_key(|m| m.captured_at);
        history
    }
}

/// 프로세스 메모리 기반 [`MarketStore`].
#[derive(Default)]
pub struct MemoryMarketStore {
    inner: RwLock<Inner>,
}

impl MemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for MemoryMarketStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn create_instrument(&self, name: &str, symbol: &str) -> Result<Instrument> {
        let (name, symbol) = validated_instrument(name, symbol)?;
        let mut inner = self.inner.write().await;

        if inner.instruments.contains_key(&name) {
            return Err(StoreError::AlreadyExists(name));
        }

        let instrument = Instrument::new(&name, &symbol);
        inner.instruments.insert(name, instrument.clone());
        info!(name = %instrument.name, symbol = %instrument.symbol, "종목 등록");

        Ok(instrument)
    }

    async fn create_instrument_with_measurement(
        &self,
        name: &str,
        symbol: &str,
        fields: MeasurementFields,
        captured_at: DateTime<Utc>,
    ) -> Result<(Instrument, Measurement)> {
        let (name, symbol) = validated_instrument(name, symbol)?;
        let mut inner = self.inner.write().await;

        if inner.instruments.contains_key(&name) {
            return Err(StoreError::AlreadyExists(name));
        }

        let instrument = Instrument::new(&name, &symbol);
        let measurement = Measurement::new(instrument.id, fields, captured_at);
        inner.instruments.insert(name, instrument.clone());
        inner
            .measurements
            .insert(instrument.id, vec![measurement.clone()]);
        info!(name = %instrument.name, symbol = %instrument.symbol, "종목 등록 (첫 스냅샷 포함)");

        Ok((instrument, measurement))
    }

    async fn find_instrument(&self, key: &InstrumentRef) -> Result<Option<Instrument>> {
        Ok(self.inner.read().await.find(key).cloned())
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        let inner = self.inner.read().await;
        let mut instruments: Vec<Instrument> = inner.instruments.values().cloned().collect();
        instruments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(instruments)
    }

    async fn add_measurement(
        &self,
        key: &InstrumentRef,
        fields: MeasurementFields,
        captured_at: DateTime<Utc>,
    ) -> Result<Measurement> {
        let mut inner = self.inner.write().await;
        let instrument_id = inner.resolve(key)?.id;

        let measurement = Measurement::new(instrument_id, fields, captured_at);
        inner
            .measurements
            .entry(instrument_id)
            .or_default()
            .push(measurement.clone());

        Ok(measurement)
    }

    async fn delete_instrument(&self, name: &str) -> Result<DeletedInstrument> {
        let name = coin_core::normalize_name(name);
        let mut inner = self.inner.write().await;

        let instrument = inner
            .instruments
            .remove(&name)
            .ok_or_else(|| StoreError::NotFound(format!("instrument name={}", name)))?;
        let removed = inner
            .measurements
            .remove(&instrument.id)
            .map(|m| m.len() as u64)
            .unwrap_or(0);

        info!(name = %instrument.name, measurements = removed, "종목 삭제");

        Ok(DeletedInstrument {
            instrument,
            measurements_removed: removed,
        })
    }

    async fn history(&self, key: &InstrumentRef) -> Result<Vec<Measurement>> {
        let inner = self.inner.read().await;
        let instrument_id = inner.resolve(key)?.id;
        Ok(inner.sorted_history(instrument_id))
    }

    async fn latest(&self, key: &InstrumentRef) -> Result<Option<Measurement>> {
        let inner = self.inner.read().await;
        let instrument_id = inner.resolve(key)?.id;
        Ok(inner.sorted_history(instrument_id).pop())
    }

    async fn reconcile(
        &self,
        records: &[RawRecord],
        captured_at: DateTime<Utc>,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(captured_at);
        let mut inner = self.inner.write().await;

        for record in records {
            let key = InstrumentRef::Name(record.normalized_name());
            let Some(instrument_id) = inner.find(&key).map(|i| i.id) else {
                debug!(name = %record.name, "미등록 종목 건너뜀");
                report.record_skipped(&record.name);
                continue;
            };

            inner
                .measurements
                .entry(instrument_id)
                .or_default()
                .push(Measurement::new(instrument_id, record.fields.clone(), captured_at));
            report.record_inserted();
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "reconcile 완료"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn fields(price: &str) -> MeasurementFields {
        MeasurementFields {
            price: price.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let store = MemoryMarketStore::new();

        let created = store.create_instrument("Bitcoin", "btc").await.unwrap();
        assert_eq!(created.name, "bitcoin");
        assert_eq!(created.symbol, "BTC");

        let err = store.create_instrument("BITCOIN", "XBT").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref n) if n == "bitcoin"));
        assert_eq!(store.list_instruments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_input() {
        let store = MemoryMarketStore::new();
        assert!(matches!(
            store.create_instrument("  ", "BTC").await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create_instrument("Bitcoin", "").await,
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_overlong_input() {
        let store = MemoryMarketStore::new();
        let long_name = "x".repeat(crate::storage::MAX_NAME_LEN + 1);

        assert!(matches!(
            store.create_instrument(&long_name, "BTC").await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(store.list_instruments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_first_measurement() {
        let store = MemoryMarketStore::new();
        let at = Utc::now();

        let (instrument, measurement) = store
            .create_instrument_with_measurement("Ripple", "xrp", fields("$0.27"), at)
            .await
            .unwrap();
        assert_eq!(instrument.symbol, "XRP");
        assert_eq!(measurement.instrument_id, instrument.id);

        let history = store.history(&InstrumentRef::name("ripple")).await.unwrap();
        assert_eq!(history, vec![measurement]);

        // 기존 종목이면 스냅샷도 저장되지 않음
        let err = store
            .create_instrument_with_measurement("RIPPLE", "XRP", fields("$0.30"), at)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.history(&InstrumentRef::name("ripple")).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_single_winner() {
        let store = Arc::new(MemoryMarketStore::new());

        let handles: Vec<_> = ["Bitcoin", "bitcoin", "BITCOIN", " bitcoin "]
            .into_iter()
            .map(|name| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_instrument(name, "BTC").await })
            })
            .collect();

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(StoreError::AlreadyExists(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 3);
    }

    #[tokio::test]
    async fn test_find_by_name_and_symbol() {
        let store = MemoryMarketStore::new();
        store.create_instrument("Ethereum", "ETH").await.unwrap();

        let by_name = store.find_instrument(&InstrumentRef::parse("Ethereum")).await.unwrap();
        let by_symbol = store.find_instrument(&InstrumentRef::parse("ETH")).await.unwrap();
        assert_eq!(by_name, by_symbol);
        assert!(by_name.is_some());

        let missing = store.find_instrument(&InstrumentRef::parse("Dogecoin")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_history_sorted_by_capture_time() {
        let store = MemoryMarketStore::new();
        store.create_instrument("Bitcoin", "BTC").await.unwrap();
        let key = InstrumentRef::name("bitcoin");
        let t0 = Utc::now();

        store.add_measurement(&key, fields("$3"), t0 + Duration::minutes(20)).await.unwrap();
        store.add_measurement(&key, fields("$1"), t0).await.unwrap();
        store.add_measurement(&key, fields("$2"), t0 + Duration::minutes(10)).await.unwrap();

        let prices: Vec<String> = store
            .history(&key)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.fields.price)
            .collect();
        assert_eq!(prices, ["$1", "$2", "$3"]);

        let latest = store.latest(&key).await.unwrap().unwrap();
        assert_eq!(latest.fields.price, "$3");
    }

    #[tokio::test]
    async fn test_history_unknown_instrument() {
        let store = MemoryMarketStore::new();
        assert!(matches!(
            store.history(&InstrumentRef::name("nothing")).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.latest(&InstrumentRef::name("nothing")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_without_measurements() {
        let store = MemoryMarketStore::new();
        store.create_instrument("Bitcoin", "BTC").await.unwrap();
        assert!(store.latest(&InstrumentRef::name("bitcoin")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_measurements() {
        let store = MemoryMarketStore::new();
        store.create_instrument("Bitcoin", "BTC").await.unwrap();
        let key = InstrumentRef::name("bitcoin");
        store.add_measurement(&key, fields("$1"), Utc::now()).await.unwrap();
        store.add_measurement(&key, fields("$2"), Utc::now()).await.unwrap();

        let deleted = store.delete_instrument("Bitcoin").await.unwrap();
        assert_eq!(deleted.instrument.name, "bitcoin");
        assert_eq!(deleted.measurements_removed, 2);

        assert!(store.find_instrument(&key).await.unwrap().is_none());
        assert!(matches!(
            store.delete_instrument("bitcoin").await,
            Err(StoreError::NotFound(_))
        ));

        // 같은 이름으로 다시 등록하면 이력은 비어 있음
        store.create_instrument("Bitcoin", "BTC").await.unwrap();
        assert!(store.history(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_skips_unknown_names() {
        let store = MemoryMarketStore::new();
        store.create_instrument("bitcoin", "BTC").await.unwrap();
        let captured_at = Utc::now();

        let records = vec![
            RawRecord::new("Bitcoin", "BTC", "$1", "$2", "3", "$4", "1%", "2%", "3%"),
            RawRecord::new("Ethereum", "ETH", "$5", "$6", "7", "$8", "4%", "5%", "6%"),
        ];
        let report = store.reconcile(&records, captured_at).await.unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.skipped_names, ["Ethereum"]);
        assert!(store.find_instrument(&InstrumentRef::name("ethereum")).await.unwrap().is_none());

        let history = store.history(&InstrumentRef::name("bitcoin")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].captured_at, captured_at);
        assert_eq!(history[0].fields, records[0].fields);
    }
}
