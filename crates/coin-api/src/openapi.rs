//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use coin_core::{Instrument, Measurement, MeasurementFields, RawRecord};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiErrorResponse;
use crate::routes::{
    ComponentHealth, ComponentStatus, CreateCurrencyRequest, CreateCurrencyResponse,
    CurrencyDetailResponse, CurrencyListResponse, DeleteCurrencyResponse, HealthResponse,
    LatestMeasurementResponse, MeasurementInput, ScrapeResponse, ScrapeStatusResponse,
};

// ==================== OpenAPI 문서 정의 ====================

/// CoinWatch API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CoinWatch API",
        description = r#"
# CoinWatch 시세 수집 REST API

CoinMarketCap 전체 목록 페이지를 주기적으로 수집해 등록된 종목의 시세 이력을 보관합니다.

## 주요 기능

- **종목 관리**: 종목 등록/삭제 (이름은 소문자, 심볼은 대문자로 정규화)
- **시세 이력**: 종목별 스냅샷 조회 및 수동 추가
- **즉시 수집**: 스케줄러와 별개로 한 번 수집
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "currencies", description = "종목 - 등록/삭제 및 시세 이력"),
        (name = "scrape", description = "수집 - 즉시 수집 및 스케줄러 상태")
    ),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Common =====
            ApiErrorResponse,

            // ===== Domain =====
            Instrument,
            Measurement,
            MeasurementFields,
            RawRecord,

            // ===== Currencies =====
            CurrencyListResponse,
            CurrencyDetailResponse,
            LatestMeasurementResponse,
            CreateCurrencyRequest,
            CreateCurrencyResponse,
            MeasurementInput,
            DeleteCurrencyResponse,

            // ===== Scrape =====
            ScrapeResponse,
            ScrapeStatusResponse,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Currencies =====
        crate::routes::currencies::list_currencies,
        crate::routes::currencies::create_currency,
        crate::routes::currencies::get_currency,
        crate::routes::currencies::get_latest,
        crate::routes::currencies::add_history,
        crate::routes::currencies::delete_currency,

        // ===== Scrape =====
        crate::routes::scrape::run_scrape,
        crate::routes::scrape::scrape_status,
    )
)]
pub struct ApiDoc;

// ==================== Swagger UI 라우터 ====================

/// Swagger UI 라우터 생성.
///
/// 다음 경로에 문서 UI를 마운트합니다:
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
