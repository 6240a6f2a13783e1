//! 에러 타입 정의.

use std::fmt;

use coin_data::{PipelineError, StoreError};

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 수집 파이프라인 에러 (HTTP, HTML 추출)
    Pipeline(PipelineError),
    /// 저장소 에러
    Store(StoreError),
    /// 설정 에러
    Config(String),
    /// 수집 태스크가 결과 없이 종료됨 (panic 등)
    Task(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            Self::Store(e) => write!(f, "Store error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Task(msg) => write!(f, "Collection task failed: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pipeline(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Config(_) | Self::Task(_) => None,
        }
    }
}

impl From<PipelineError> for CollectorError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

impl From<StoreError> for CollectorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
