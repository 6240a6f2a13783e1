//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다.
//!
//! | 원인 | 상태 코드 | code |
//! |------|-----------|------|
//! | 같은 이름의 종목 존재 | 409 | `ALREADY_EXISTS` |
//! | 종목 없음 | 404 | `NOT_FOUND` |
//! | 입력 검증 실패 | 400 | `VALIDATION_ERROR` |
//! | 수집(HTTP/HTML) 실패 | 502 | `SCRAPE_FAILED` |
//! | 저장소 실패 | 500 | `DB_ERROR` |

use axum::http::StatusCode;
use axum::Json;
use coin_collector::CollectorError;
use coin_data::{PipelineError, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Not found: instrument name=dogecoin",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "DB_ERROR", "VALIDATION_ERROR", "NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 핸들러 에러 (상태 코드 + JSON 본문).
pub type ApiError = (StatusCode, Json<ApiErrorResponse>);

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

/// 저장소 에러를 응답으로 변환합니다.
pub fn store_error(err: StoreError) -> ApiError {
    let (status, code) = match &err {
        StoreError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        StoreError::Persistence(_) | StoreError::Connection(_) | StoreError::Migration(_) => {
            error!(error = %err, "저장소 오류");
            (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR")
        }
    };
    (status, Json(ApiErrorResponse::new(code, err.to_string())))
}

/// 수집 실행 에러를 응답으로 변환합니다.
pub fn collector_error(err: CollectorError) -> ApiError {
    match err {
        CollectorError::Pipeline(e) => {
            let stage = match &e {
                PipelineError::Fetch(_) => "fetch",
                PipelineError::Extract(_) => "extract",
            };
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiErrorResponse::with_details(
                    "SCRAPE_FAILED",
                    e.to_string(),
                    serde_json::json!({ "stage": stage }),
                )),
            )
        }
        CollectorError::Store(e) => store_error(e),
        CollectorError::Config(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse::new("CONFIG_ERROR", msg)),
        ),
        CollectorError::Task(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse::new("TASK_FAILED", msg)),
        ),
    }
}

/// 요청 검증 에러를 응답으로 변환합니다.
pub fn validation_error(errors: &ValidationErrors) -> ApiError {
    let message = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: 유효하지 않은 값", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ");

    // 중첩 구조체(info) 에러는 field_errors에 포함되지 않음
    if message.is_empty() {
        return bad_request(errors.to_string());
    }

    bad_request(message)
}

/// 400 VALIDATION_ERROR 응답.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::new("VALIDATION_ERROR", message)),
    )
}
