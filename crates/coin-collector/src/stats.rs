//! 수집 통계 구조체.

use chrono::{DateTime, Utc};
use coin_data::ReconcileReport;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 번의 수집 실행 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 스냅샷 공통 수집 시각
    pub captured_at: Option<DateTime<Utc>>,
    /// 페이지에서 추출된 행 수
    pub scraped: usize,
    /// 저장된 스냅샷 수
    pub inserted: usize,
    /// 미등록 종목이라 건너뛴 수
    pub skipped: usize,
    /// 새로 등록된 종목 수 (sync-instruments)
    pub created: usize,
    /// 등록 실패 수 (sync-instruments)
    pub errors: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// reconcile 결과를 반영합니다.
    pub fn apply_report(&mut self, report: &ReconcileReport) {
        self.captured_at = Some(report.captured_at);
        self.inserted += report.inserted;
        self.skipped += report.skipped;
    }

    /// 저장 비율 계산 (%)
    pub fn match_rate(&self) -> f64 {
        if self.scraped == 0 {
            0.0
        } else {
            (self.inserted as f64 / self.scraped as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            scraped = self.scraped,
            inserted = self.inserted,
            skipped = self.skipped,
            created = self.created,
            errors = self.errors,
            match_rate = format!("{:.1}%", self.match_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
