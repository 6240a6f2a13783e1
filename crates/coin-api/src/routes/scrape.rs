//! 즉시 수집 API.
//!
//! - `POST /api/v1/scrape` - 파이프라인 1회 실행 후 등록된 종목의 스냅샷 저장
//! - `GET /api/v1/scrape/status` - 수집 대상과 스케줄러 상태
//!
//! 즉시 수집은 스케줄러와 같은 실행 잠금을 사용하므로,
//! 주기 수집이 진행 중이면 끝난 뒤에 실행됩니다.
//! 라우트 타임아웃은 [`scrape_route_timeout`]으로 전역 타임아웃보다 길게 잡습니다.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use coin_collector::SchedulerStatus;
use coin_core::{RawRecord, ScraperConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{collector_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 즉시 수집 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScrapeResponse {
    /// 페이지에서 추출한 레코드 (미등록 종목 포함)
    pub records: Vec<RawRecord>,
    /// 배치 공통 수집 시각
    pub captured_at: DateTime<Utc>,
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
    /// 미등록이라 저장하지 않은 종목 이름
    pub skipped_names: Vec<String>,
    pub elapsed_ms: u64,
}

/// 수집 상태 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScrapeStatusResponse {
    pub source_url: String,
    /// 저장소 백엔드 ("postgres" | "memory")
    pub backend: String,
    #[schema(value_type = Object)]
    pub scheduler: SchedulerStatus,
}

/// POST /api/v1/scrape - 즉시 수집
#[utoipa::path(
    post,
    path = "/api/v1/scrape",
    responses(
        (status = 200, description = "수집 완료", body = ScrapeResponse),
        (status = 502, description = "페이지 요청 또는 추출 실패", body = ApiErrorResponse),
        (status = 500, description = "저장소 오류", body = ApiErrorResponse)
    ),
    tag = "scrape"
)]
pub async fn run_scrape(State(state): State<Arc<AppState>>) -> ApiResult<Json<ScrapeResponse>> {
    info!("즉시 수집 요청");

    let outcome = state.scheduler.run_now().await.map_err(collector_error)?;
    let report = outcome.report;

    Ok(Json(ScrapeResponse {
        records: outcome.records,
        captured_at: report.captured_at,
        total: report.total,
        inserted: report.inserted,
        skipped: report.skipped,
        skipped_names: report.skipped_names,
        elapsed_ms: outcome.stats.elapsed.as_millis() as u64,
    }))
}

/// GET /api/v1/scrape/status - 수집 상태
#[utoipa::path(
    get,
    path = "/api/v1/scrape/status",
    responses((status = 200, description = "수집 상태", body = ScrapeStatusResponse)),
    tag = "scrape"
)]
pub async fn scrape_status(State(state): State<Arc<AppState>>) -> Json<ScrapeStatusResponse> {
    Json(ScrapeStatusResponse {
        source_url: state.scheduler.collector().source_url().to_string(),
        backend: state.store.backend().to_string(),
        scheduler: state.scheduler.status().await,
    })
}

/// `POST /api/v1/scrape` 타임아웃.
///
/// 진행 중인 주기 수집 대기와 자신의 수집이 모두 HTTP 타임아웃까지 걸려도
/// 502 응답이 먼저 나가도록 여유를 둡니다.
pub fn scrape_route_timeout(scraper: &ScraperConfig) -> Duration {
    scraper.timeout() * 2 + Duration::from_secs(30)
}

/// Scrape 라우터 생성
pub fn scrape_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(run_scrape))
        .route("/status", get(scrape_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{create_test_state, create_test_state_with_source};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const LISTING: &str = include_str!("../../../coin-data/tests/fixtures/listing.html");

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .nest("/api/v1/scrape", scrape_router())
            .with_state(state)
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn serve_listing() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/listing", get(|| async { axum::response::Html(LISTING) }));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/listing", addr)
    }

    #[tokio::test]
    async fn test_scrape_unreachable_source_is_bad_gateway() {
        let state = Arc::new(create_test_state());

        let (status, body) = send(app(state.clone()), Method::POST, "/api/v1/scrape").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "SCRAPE_FAILED");
        assert_eq!(body["details"]["stage"], "fetch");

        let (_, body) = send(app(state), Method::GET, "/api/v1/scrape/status").await;
        assert_eq!(body["scheduler"]["failed_runs"], 1);
        assert_eq!(body["scheduler"]["last_run"]["trigger"], "manual");
        assert_eq!(body["scheduler"]["last_run"]["success"], false);
    }

    #[tokio::test]
    async fn test_scrape_stores_registered_only() {
        let url = serve_listing().await;
        let state = Arc::new(create_test_state_with_source(&url));
        state.store.create_instrument("Bitcoin", "BTC").await.unwrap();

        let (status, body) = send(app(state.clone()), Method::POST, "/api/v1/scrape").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"].as_array().unwrap().len(), 3);
        assert_eq!(body["total"], 3);
        assert_eq!(body["inserted"], 1);
        assert_eq!(body["skipped"], 2);
        assert_eq!(body["skipped_names"], serde_json::json!(["Ethereum", "Ripple"]));

        let latest = state
            .store
            .latest(&coin_core::InstrumentRef::symbol("BTC"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.fields.price, "$2713.92");
    }

    #[test]
    fn test_scrape_route_timeout_outlasts_fetch() {
        let scraper = ScraperConfig::default();
        let timeout = scrape_route_timeout(&scraper);

        assert!(timeout > scraper.timeout() * 2);
        assert!(timeout > crate::routes::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_scrape_status() {
        let state = Arc::new(create_test_state());

        let (status, body) = send(app(state), Method::GET, "/api/v1/scrape/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source_url"], "http://127.0.0.1:1/listing");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["scheduler"]["running"], false);
        assert_eq!(body["scheduler"]["interval_secs"], 600);
        assert!(body["scheduler"]["last_run"].is_null());
    }
}
