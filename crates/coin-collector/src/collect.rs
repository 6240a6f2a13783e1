//! 수집 실행 단위.
//!
//! 파이프라인 실행 → 수집 시각 결정 → reconcile 을 한 번의 실행으로 묶습니다.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use coin_core::{RawRecord, ScraperConfig};
use coin_data::{MarketStore, PipelineRunner, ReconcileReport, StoreError};
use serde::Serialize;

use crate::{CollectionStats, Result};

/// 한 번의 수집 결과.
#[derive(Debug, Clone, Serialize)]
pub struct CollectOutcome {
    /// 추출된 레코드 (페이지 순서)
    pub records: Vec<RawRecord>,
    /// reconcile 결과
    pub report: ReconcileReport,
    pub stats: CollectionStats,
}

/// 파이프라인 + 저장소.
pub struct Collector {
    runner: PipelineRunner,
    store: Arc<dyn MarketStore>,
}

impl Collector {
    pub fn new(config: ScraperConfig, store: Arc<dyn MarketStore>) -> Result<Self> {
        Ok(Self {
            runner: PipelineRunner::new(config)?,
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    /// 수집 대상 URL
    pub fn source_url(&self) -> &str {
        self.runner.url()
    }

    /// 페이지를 한 번 수집하고 등록된 종목의 스냅샷을 저장합니다.
    pub async fn collect_once(&self) -> Result<CollectOutcome> {
        let start = Instant::now();
        tracing::info!(url = self.source_url(), "시세 수집 시작");

        let records = self.runner.run().await?;
        let captured_at = Utc::now();
        let report = self.store.reconcile(&records, captured_at).await?;

        let mut stats = CollectionStats::new();
        stats.scraped = records.len();
        stats.apply_report(&report);
        stats.elapsed = start.elapsed();

        Ok(CollectOutcome {
            records,
            report,
            stats,
        })
    }

    /// 페이지의 모든 종목을 등록한 뒤 첫 스냅샷을 저장합니다.
    ///
    /// 이미 등록된 종목은 그대로 두고, 이름/심볼이 비어 있거나 너무 긴 행은 건너뜁니다.
    pub async fn sync_instruments(&self) -> Result<CollectOutcome> {
        let start = Instant::now();
        tracing::info!(url = self.source_url(), "종목 동기화 시작");

        let records = self.runner.run().await?;

        let mut stats = CollectionStats::new();
        stats.scraped = records.len();

        for record in &records {
            match self.store.create_instrument(&record.name, &record.symbol).await {
                Ok(_) => stats.created += 1,
                Err(StoreError::AlreadyExists(_)) => {}
                Err(StoreError::InvalidInput(reason)) => {
                    stats.errors += 1;
                    tracing::warn!(name = %record.name, reason = %reason, "종목 등록 건너뜀");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(created = stats.created, "종목 등록 완료");

        let captured_at = Utc::now();
        let report = self.store.reconcile(&records, captured_at).await?;
        stats.apply_report(&report);
        stats.elapsed = start.elapsed();

        Ok(CollectOutcome {
            records,
            report,
            stats,
        })
    }
}
