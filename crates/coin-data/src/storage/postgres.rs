//! PostgreSQL 저장소 구현.
//!
//! `currency` (종목) 과 `currency_info` (시세 스냅샷) 두 테이블을 사용합니다.
//! 스키마는 `migrations/` 의 sqlx 마이그레이션으로 관리됩니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coin_core::{DatabaseConfig, Instrument, InstrumentRef, Measurement, MeasurementFields, RawRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument, warn};

use super::{validated_instrument, DeletedInstrument, MarketStore, ReconcileReport};
use crate::error::{Result, StoreError};

const INSTRUMENT_COLUMNS: &str = "id, name, symbol, created_at";

const MEASUREMENT_COLUMNS: &str = "id, currency_id AS instrument_id, market_cap, price, \
     circulating_supply, volume_24h, change_1h, change_24h, change_7d, captured_at";

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Connection("database.url is not set".to_string()))?;

        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 기존 연결 풀에서 Database 인스턴스를 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }

    /// 데이터베이스 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// PostgreSQL 기반 [`MarketStore`].
#[derive(Clone)]
pub struct PgMarketStore {
    db: Database,
}

impl PgMarketStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// 조회 키로 종목을 찾고, 없으면 `NotFound`.
    async fn resolve(&self, key: &InstrumentRef) -> Result<Instrument> {
        self.find_instrument(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("instrument {}", key)))
    }
}

#[async_trait]
impl MarketStore for PgMarketStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<()> {
        self.db.health_check().await
    }

    #[instrument(skip(self))]
    async fn create_instrument(&self, name: &str, symbol: &str) -> Result<Instrument> {
        let (name, symbol) = validated_instrument(name, symbol)?;

        // 동시 생성 시 고유 제약으로 한 건만 RETURNING
        let created: Option<Instrument> = sqlx::query_as(&format!(
            "INSERT INTO currency (name, symbol) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING RETURNING {}",
            INSTRUMENT_COLUMNS
        ))
        .bind(&name)
        .bind(&symbol)
        .fetch_optional(self.db.pool())
        .await?;

        match created {
            Some(instrument) => {
                info!(name = %instrument.name, symbol = %instrument.symbol, "종목 등록");
                Ok(instrument)
            }
            None => Err(StoreError::AlreadyExists(name)),
        }
    }

    #[instrument(skip(self, fields))]
    async fn create_instrument_with_measurement(
        &self,
        name: &str,
        symbol: &str,
        fields: MeasurementFields,
        captured_at: DateTime<Utc>,
    ) -> Result<(Instrument, Measurement)> {
        let (name, symbol) = validated_instrument(name, symbol)?;
        let mut tx = self.db.pool().begin().await?;

        let instrument: Instrument = sqlx::query_as(&format!(
            "INSERT INTO currency (name, symbol) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING RETURNING {}",
            INSTRUMENT_COLUMNS
        ))
        .bind(&name)
        .bind(&symbol)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::AlreadyExists(name.clone()))?;

        // 스냅샷 저장 실패 시 tx drop으로 종목 등록도 롤백
        let measurement: Measurement = sqlx::query_as(&format!(
            "INSERT INTO currency_info (currency_id, market_cap, price, circulating_supply, \
             volume_24h, change_1h, change_24h, change_7d, captured_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            MEASUREMENT_COLUMNS
        ))
        .bind(instrument.id)
        .bind(&fields.market_cap)
        .bind(&fields.price)
        .bind(&fields.circulating_supply)
        .bind(&fields.volume_24h)
        .bind(&fields.change_1h)
        .bind(&fields.change_24h)
        .bind(&fields.change_7d)
        .bind(captured_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(name = %instrument.name, symbol = %instrument.symbol, "종목 등록 (첫 스냅샷 포함)");

        Ok((instrument, measurement))
    }

    async fn find_instrument(&self, key: &InstrumentRef) -> Result<Option<Instrument>> {
        let query = match key {
            InstrumentRef::Name(_) => {
                format!("SELECT {} FROM currency WHERE name = $1", INSTRUMENT_COLUMNS)
            }
            // 같은 심볼이 여러 종목에 있으면 먼저 등록된 종목
            InstrumentRef::Symbol(_) => format!(
                "SELECT {} FROM currency WHERE symbol = $1 ORDER BY created_at, id LIMIT 1",
                INSTRUMENT_COLUMNS
            ),
        };
        let value = match key {
            InstrumentRef::Name(v) | InstrumentRef::Symbol(v) => v,
        };

        sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(self.db.pool())
            .await
            .map_err(Into::into)
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM currency ORDER BY name",
            INSTRUMENT_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, fields))]
    async fn add_measurement(
        &self,
        key: &InstrumentRef,
        fields: MeasurementFields,
        captured_at: DateTime<Utc>,
    ) -> Result<Measurement> {
        let instrument = self.resolve(key).await?;

        sqlx::query_as(&format!(
            "INSERT INTO currency_info (currency_id, market_cap, price, circulating_supply, \
             volume_24h, change_1h, change_24h, change_7d, captured_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            MEASUREMENT_COLUMNS
        ))
        .bind(instrument.id)
        .bind(&fields.market_cap)
        .bind(&fields.price)
        .bind(&fields.circulating_supply)
        .bind(&fields.volume_24h)
        .bind(&fields.change_1h)
        .bind(&fields.change_24h)
        .bind(&fields.change_7d)
        .bind(captured_at)
        .fetch_one(self.db.pool())
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn delete_instrument(&self, name: &str) -> Result<DeletedInstrument> {
        let name = coin_core::normalize_name(name);
        let mut tx = self.db.pool().begin().await?;

        let instrument: Instrument = sqlx::query_as(&format!(
            "SELECT {} FROM currency WHERE name = $1 FOR UPDATE",
            INSTRUMENT_COLUMNS
        ))
        .bind(&name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("instrument name={}", name)))?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM currency_info WHERE currency_id = $1")
                .bind(instrument.id)
                .fetch_one(&mut *tx)
                .await?;

        // currency_info는 ON DELETE CASCADE
        sqlx::query("DELETE FROM currency WHERE id = $1")
            .bind(instrument.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(name = %instrument.name, measurements = count, "종목 삭제");

        Ok(DeletedInstrument {
            instrument,
            measurements_removed: count.max(0) as u64,
        })
    }

    async fn history(&self, key: &InstrumentRef) -> Result<Vec<Measurement>> {
        let instrument = self.resolve(key).await?;

        sqlx::query_as(&format!(
            "SELECT {} FROM currency_info WHERE currency_id = $1 ORDER BY captured_at, seq",
            MEASUREMENT_COLUMNS
        ))
        .bind(instrument.id)
        .fetch_all(self.db.pool())
        .await
        .map_err(Into::into)
    }

    async fn latest(&self, key: &InstrumentRef) -> Result<Option<Measurement>> {
        let instrument = self.resolve(key).await?;

        sqlx::query_as(&format!(
            "SELECT {} FROM currency_info WHERE currency_id = $1 \
             ORDER BY captured_at DESC, seq DESC LIMIT 1",
            MEASUREMENT_COLUMNS
        ))
        .bind(instrument.id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    async fn reconcile(
        &self,
        records: &[RawRecord],
        captured_at: DateTime<Utc>,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(captured_at);
        if records.is_empty() {
            return Ok(report);
        }

        // 한 트랜잭션: 중간 실패 시 drop 되면서 롤백
        let mut tx = self.db.pool().begin().await?;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO currency_info (currency_id, market_cap, price, circulating_supply,
                                           volume_24h, change_1h, change_24h, change_7d, captured_at)
                SELECT id, $2, $3, $4, $5, $6, $7, $8, $9
                FROM currency
                WHERE name = $1
                "#,
            )
            .bind(record.normalized_name())
            .bind(&record.fields.market_cap)
            .bind(&record.fields.price)
            .bind(&record.fields.circulating_supply)
            .bind(&record.fields.volume_24h)
            .bind(&record.fields.change_1h)
            .bind(&record.fields.change_24h)
            .bind(&record.fields.change_7d)
            .bind(captured_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                warn!(name = %record.name, error = %e, "스냅샷 저장 실패, 배치 롤백");
                StoreError::from(e)
            })?;

            if result.rows_affected() == 0 {
                debug!(name = %record.name, "미등록 종목 건너뜀");
                report.record_skipped(&record.name);
            } else {
                report.record_inserted();
            }
        }

        tx.commit().await?;

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "reconcile 완료"
        );

        Ok(report)
    }
}
