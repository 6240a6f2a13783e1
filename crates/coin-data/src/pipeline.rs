//! 수집 파이프라인.
//!
//! 페이지 수집과 행 추출을 하나의 실행 단위로 묶습니다. HTTP 세션은 실행 시작 시
//! 열리고 성공/실패와 관계없이 실행이 끝나면 닫힙니다. 파이프라인은 저장하지 않습니다.

use std::time::Instant;

use coin_core::{RawRecord, ScraperConfig};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::provider::{CoinMarketCapClient, ExtractError, FetchError, ListingExtractor};

/// 파이프라인 에러
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("페이지 수집 실패: {0}")]
    Fetch(#[from] FetchError),

    #[error("페이지 추출 실패: {0}")]
    Extract(#[from] ExtractError),
}

/// 수집 + 추출 실행기.
#[derive(Debug)]
pub struct PipelineRunner {
    config: ScraperConfig,
    extractor: ListingExtractor,
}

impl PipelineRunner {
    pub fn new(config: ScraperConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            config,
            extractor: ListingExtractor::new()?,
        })
    }

    /// 수집 대상 URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// 한 번의 수집을 실행하고 추출된 전체 레코드를 반환합니다.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn run(&self) -> Result<Vec<RawRecord>, PipelineError> {
        let started = Instant::now();

        let body = {
            let session = CoinMarketCapClient::open(&self.config).map_err(|e| {
                error!(error = %e, "HTTP 세션 생성 실패");
                PipelineError::from(e)
            })?;
            session.fetch_listing().await.map_err(|e| {
                error!(error = %e, status = ?e.status(), timeout = e.is_timeout(), "페이지 수집 실패");
                PipelineError::from(e)
            })?
            // session은 이 블록을 벗어나면서 닫힘
        };

        let records = self.extractor.extract(&body).map_err(|e| {
            error!(error = %e, row = ?e.row_index(), bytes = body.len(), "페이지 추출 실패");
            PipelineError::from(e)
        })?;

        info!(
            rows = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "수집 파이프라인 완료"
        );

        Ok(records)
    }
}
