//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/currencies` - 종목 관리 및 시세 이력
//! - `/api/v1/scrape` - 즉시 수집 및 수집 상태

pub mod currencies;
pub mod health;
pub mod scrape;

pub use currencies::{
    currencies_router, CreateCurrencyRequest, CreateCurrencyResponse, CurrencyDetailResponse,
    CurrencyListResponse, DeleteCurrencyResponse, LatestMeasurementResponse, MeasurementInput,
};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use scrape::{scrape_route_timeout, scrape_router, ScrapeResponse, ScrapeStatusResponse};

use axum::{http::StatusCode, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// 일반 요청 타임아웃 (408 반환).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 전체 API 라우터 생성.
///
/// 모든 서브 라우터를 조합하여 하나의 라우터로 반환합니다.
/// 즉시 수집 라우트만 `scrape_timeout`을 사용하고 나머지는 [`REQUEST_TIMEOUT`].
pub fn create_api_router(scrape_timeout: Duration) -> Router<Arc<AppState>> {
    Router::new()
        // 헬스 체크 엔드포인트
        .nest("/health", health_router())
        // API v1 엔드포인트
        .nest("/api/v1/currencies", currencies_router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .nest(
            "/api/v1/scrape",
            scrape_router().layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                scrape_timeout,
            )),
        )
}
