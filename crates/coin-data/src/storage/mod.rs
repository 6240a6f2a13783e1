//! 종목/시세 저장소.
//!
//! [`MarketStore`] 트레이트 뒤에 두 가지 백엔드를 제공합니다:
//! - [`PgMarketStore`]: PostgreSQL (운영)
//! - [`MemoryMarketStore`]: 프로세스 메모리 (DB 없이 실행, 테스트)
//!
//! 두 백엔드는 같은 의미를 보장합니다:
//! - 종목은 정규화된 이름 기준으로 고유하며, 동시 생성 시 하나만 성공
//! - 시세 스냅샷은 추가만 가능하며 이력은 수집 시각 오름차순
//! - reconcile은 배치 전체가 반영되거나 전혀 반영되지 않음

pub mod memory;
pub mod postgres;

pub use memory::MemoryMarketStore;
pub use postgres::{Database, PgMarketStore};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coin_core::{DatabaseConfig, Instrument, InstrumentRef, Measurement, MeasurementFields, RawRecord};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StoreError};

/// reconcile 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// 배치 공통 수집 시각
    pub captured_at: DateTime<Utc>,
    /// 입력 레코드 수
    pub total: usize,
    /// 저장된 스냅샷 수
    pub inserted: usize,
    /// 미등록 종목이라 건너뛴 레코드 수
    pub skipped: usize,
    /// 건너뛴 레코드의 원래 이름
    pub skipped_names: Vec<String>,
}

impl ReconcileReport {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            total: 0,
            inserted: 0,
            skipped: 0,
            skipped_names: Vec::new(),
        }
    }

    pub(crate) fn record_inserted(&mut self) {
        self.total += 1;
        self.inserted += 1;
    }

    pub(crate) fn record_skipped(&mut self, name: &str) {
        self.total += 1;
        self.skipped += 1;
        self.skipped_names.push(name.to_string());
    }
}

/// 종목 삭제 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedInstrument {
    pub instrument: Instrument,
    /// 함께 삭제된 스냅샷 수
    pub measurements_removed: u64,
}

/// 종목/시세 저장소 트레이트.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// 백엔드 이름 ("postgres", "memory")
    fn backend(&self) -> &'static str;

    /// 저장소 상태 확인
    async fn health_check(&self) -> Result<()>;

    /// 종목 등록. 같은 정규화 이름이 있으면 `AlreadyExists`.
    async fn create_instrument(&self, name: &str, symbol: &str) -> Result<Instrument>;

    /// 종목과 첫 스냅샷을 함께 등록합니다.
    ///
    /// 하나의 원자적 단위로 처리되어, 실패하면 종목도 남지 않습니다.
    async fn create_instrument_with_measurement(
        &self,
        name: &str,
        symbol: &str,
        fields: MeasurementFields,
        captured_at: DateTime<Utc>,
    ) -> Result<(Instrument, Measurement)>;

    /// 이름 또는 심볼로 종목 조회
    async fn find_instrument(&self, key: &InstrumentRef) -> Result<Option<Instrument>>;

    /// 전체 종목 (이름순)
    async fn list_instruments(&self) -> Result<Vec<Instrument>>;

    /// 스냅샷 하나를 추가합니다. 종목이 없으면 `NotFound`.
    async fn add_measurement(
        &self,
        key: &InstrumentRef,
        fields: MeasurementFields,
        captured_at: DateTime<Utc>,
    ) -> Result<Measurement>;

    /// 종목과 그 스냅샷 전체를 삭제합니다.
    async fn delete_instrument(&self, name: &str) -> Result<DeletedInstrument>;

    /// 스냅샷 이력 (수집 시각 오름차순). 종목이 없으면 `NotFound`.
    async fn history(&self, key: &InstrumentRef) -> Result<Vec<Measurement>>;

    /// 가장 최근 스냅샷. 종목이 없으면 `NotFound`, 스냅샷이 없으면 `None`.
    async fn latest(&self, key: &InstrumentRef) -> Result<Option<Measurement>>;

    /// 수집된 배치를 등록된 종목에 연결해 저장합니다.
    ///
    /// 레코드 이름을 정규화해 종목을 찾고, 없으면 건너뜁니다 (종목을 새로 만들지 않음).
    /// 모든 스냅샷은 `captured_at`을 공유합니다.
    async fn reconcile(
        &self,
        records: &[RawRecord],
        captured_at: DateTime<Utc>,
    ) -> Result<ReconcileReport>;
}

/// 설정에 맞는 저장소를 엽니다.
///
/// `database.url`이 있으면 PostgreSQL에 연결하고 마이그레이션을 실행합니다.
/// 없으면 인메모리 저장소를 사용합니다.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn MarketStore>> {
    if config.url.is_none() {
        warn!("database.url 미설정, 인메모리 저장소 사용 (프로세스 종료 시 데이터 소멸)");
        return Ok(Arc::new(MemoryMarketStore::new()));
    }

    let db = Database::connect(config).await?;
    db.migrate().await?;
    Ok(Arc::new(PgMarketStore::new(db)))
}

/// 종목 이름 최대 길이 (문자 수, `currency.name VARCHAR(64)`).
pub const MAX_NAME_LEN: usize = 64;

/// 심볼 최대 길이 (문자 수, `currency.symbol VARCHAR(16)`).
pub const MAX_SYMBOL_LEN: usize = 16;

/// 종목 등록 입력을 정규화하고 검증합니다.
pub(crate) fn validated_instrument(name: &str, symbol: &str) -> Result<(String, String)> {
    let name = coin_core::normalize_name(name);
    let symbol = coin_core::normalize_symbol(symbol);

    if name.is_empty() {
        return Err(StoreError::InvalidInput("name must not be empty".to_string()));
    }
    if symbol.is_empty() {
        return Err(StoreError::InvalidInput("symbol must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(StoreError::InvalidInput(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(StoreError::InvalidInput(format!(
            "symbol must be at most {} characters",
            MAX_SYMBOL_LEN
        )));
    }

    Ok((name, symbol))
}
