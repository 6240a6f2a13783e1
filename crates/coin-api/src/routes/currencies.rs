//! Currency API 라우트
//!
//! 종목 등록/삭제와 시세 이력 조회 API를 제공합니다.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/currencies` - 전체 종목 조회
//! - `POST /api/v1/currencies` - 종목 등록 (선택적으로 첫 스냅샷 포함)
//! - `GET /api/v1/currencies/{key}` - 종목 상세 + 전체 이력 (`key`: 이름 또는 심볼)
//! - `DELETE /api/v1/currencies/{name}` - 종목 및 이력 삭제
//! - `GET /api/v1/currencies/{key}/latest` - 최신 스냅샷
//! - `POST /api/v1/currencies/{key}/history` - 스냅샷 추가

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use coin_core::{Instrument, InstrumentRef, Measurement, MeasurementFields};
use coin_data::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::{bad_request, store_error, validation_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// `date_time` 입력 형식 (UTC).
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn validate_date_time(value: &str) -> Result<(), ValidationError> {
    if NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).is_err() {
        return Err(ValidationError::new("invalid_date_time_format")
            .with_message("date_time 형식은 YYYY-MM-DD HH:MM:SS여야 합니다".into()));
    }
    Ok(())
}

// ================================================================================================
// Request/Response Types
// ================================================================================================

/// 종목 목록 응답
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrencyListResponse {
    pub currencies: Vec<Instrument>,
    /// 총 개수
    pub total: usize,
}

/// 종목 상세 응답 (이력 포함)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrencyDetailResponse {
    #[serde(flatten)]
    pub currency: Instrument,
    /// 표시용 이름 (예: "Bitcoin")
    pub display_name: String,
    /// 수집 시각 오름차순 이력
    pub history: Vec<Measurement>,
    pub count: usize,
}

/// 최신 스냅샷 응답
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LatestMeasurementResponse {
    pub currency: Instrument,
    /// 스냅샷이 아직 없으면 null
    pub measurement: Option<Measurement>,
}

/// 스냅샷 입력
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MeasurementInput {
    #[validate(length(min = 1, max = 64, message = "market_cap은 1-64자여야 합니다"))]
    pub market_cap: String,
    #[validate(length(min = 1, max = 64, message = "price는 1-64자여야 합니다"))]
    pub price: String,
    #[validate(length(min = 1, max = 64, message = "circulating_supply는 1-64자여야 합니다"))]
    pub circulating_supply: String,
    #[validate(length(min = 1, max = 64, message = "volume_24h는 1-64자여야 합니다"))]
    pub volume_24h: String,
    #[validate(length(min = 1, max = 64, message = "change_1h는 1-64자여야 합니다"))]
    pub change_1h: String,
    #[validate(length(min = 1, max = 64, message = "change_24h는 1-64자여야 합니다"))]
    pub change_24h: String,
    #[validate(length(min = 1, max = 64, message = "change_7d는 1-64자여야 합니다"))]
    pub change_7d: String,
    /// 수집 시각 ("YYYY-MM-DD HH:MM:SS", UTC). 없으면 현재 시각
    #[validate(custom(function = "validate_date_time"))]
    #[serde(default)]
    pub date_time: Option<String>,
}

impl MeasurementInput {
    /// 시세 필드와 수집 시각으로 분리합니다.
    pub fn into_parts(self) -> ApiResult<(MeasurementFields, DateTime<Utc>)> {
        let captured_at = match self.date_time.as_deref() {
            Some(s) => NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
                .map_err(|e| bad_request(format!("date_time: {}", e)))?
                .and_utc(),
            None => Utc::now(),
        };

        let fields = MeasurementFields {
            market_cap: self.market_cap,
            price: self.price,
            circulating_supply: self.circulating_supply,
            volume_24h: self.volume_24h,
            change_1h: self.change_1h,
            change_24h: self.change_24h,
            change_7d: self.change_7d,
        };

        Ok((fields, captured_at))
    }
}

/// 종목 등록 요청
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCurrencyRequest {
    /// 종목 이름 (소문자로 정규화)
    #[validate(length(min = 1, max = 64, message = "name은 1-64자여야 합니다"))]
    pub name: String,
    /// 심볼 (대문자로 정규화)
    #[validate(length(min = 1, max = 16, message = "symbol은 1-16자여야 합니다"))]
    pub symbol: String,
    /// 함께 저장할 스냅샷 (선택)
    #[validate(nested)]
    #[serde(default)]
    pub info: Option<MeasurementInput>,
}

/// 종목 등록 응답
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCurrencyResponse {
    pub currency: Instrument,
    /// 새로 등록되었는지 (false면 기존 종목에 스냅샷만 추가)
    pub created: bool,
    pub measurement: Option<Measurement>,
}

/// 종목 삭제 응답
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteCurrencyResponse {
    pub name: String,
    /// 함께 삭제된 스냅샷 수
    pub measurements_removed: u64,
}

// ================================================================================================
// Handlers
// ================================================================================================

/// 조회 키로 종목을 찾고, 없으면 404.
async fn resolve(state: &AppState, key: &InstrumentRef) -> ApiResult<Instrument> {
    state
        .store
        .find_instrument(key)
        .await
        .map_err(store_error)?
        .ok_or_else(|| store_error(StoreError::NotFound(format!("instrument {}", key))))
}

/// GET /api/v1/currencies - 전체 종목 조회
#[utoipa::path(
    get,
    path = "/api/v1/currencies",
    responses(
        (status = 200, description = "종목 목록", body = CurrencyListResponse),
        (status = 500, description = "저장소 오류", body = ApiErrorResponse)
    ),
    tag = "currencies"
)]
pub async fn list_currencies(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CurrencyListResponse>> {
    debug!("종목 목록 조회");

    let currencies = state.store.list_instruments().await.map_err(store_error)?;
    let total = currencies.len();

    Ok(Json(CurrencyListResponse { currencies, total }))
}

/// POST /api/v1/currencies - 종목 등록
///
/// 새 종목이면 등록 후 (있으면) 스냅샷을 저장하고 201을 반환합니다.
/// 이미 있는 종목은 `info`가 있을 때만 스냅샷을 추가하고 200, 없으면 409.
#[utoipa::path(
    post,
    path = "/api/v1/currencies",
    request_body = CreateCurrencyRequest,
    responses(
        (status = 201, description = "등록 완료", body = CreateCurrencyResponse),
        (status = 200, description = "기존 종목에 스냅샷 추가", body = CreateCurrencyResponse),
        (status = 400, description = "입력 검증 실패", body = ApiErrorResponse),
        (status = 409, description = "이미 등록된 종목", body = ApiErrorResponse)
    ),
    tag = "currencies"
)]
pub async fn create_currency(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCurrencyRequest>,
) -> ApiResult<(StatusCode, Json<CreateCurrencyResponse>)> {
    request.validate().map_err(|e| validation_error(&e))?;

    let info = request.info.map(MeasurementInput::into_parts).transpose()?;

    // 새 종목의 첫 스냅샷은 종목 등록과 한 트랜잭션으로 저장
    let (currency, created, measurement) = match info {
        None => {
            let currency = state
                .store
                .create_instrument(&request.name, &request.symbol)
                .await
                .map_err(store_error)?;
            (currency, true, None)
        }
        Some((fields, captured_at)) => match state
            .store
            .create_instrument_with_measurement(
                &request.name,
                &request.symbol,
                fields.clone(),
                captured_at,
            )
            .await
        {
            Ok((currency, measurement)) => (currency, true, Some(measurement)),
            Err(StoreError::AlreadyExists(_)) => {
                let currency = resolve(&state, &InstrumentRef::name(&request.name)).await?;
                let measurement = state
                    .store
                    .add_measurement(&InstrumentRef::name(&currency.name), fields, captured_at)
                    .await
                    .map_err(store_error)?;
                (currency, false, Some(measurement))
            }
            Err(e) => return Err(store_error(e)),
        },
    };

    info!(
        name = %currency.name,
        created,
        with_measurement = measurement.is_some(),
        "종목 등록 요청 처리"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(CreateCurrencyResponse {
            currency,
            created,
            measurement,
        }),
    ))
}

/// GET /api/v1/currencies/{key} - 종목 상세 + 전체 이력
#[utoipa::path(
    get,
    path = "/api/v1/currencies/{key}",
    params(("key" = String, Path, description = "종목 이름(Bitcoin) 또는 심볼(BTC)")),
    responses(
        (status = 200, description = "종목 상세", body = CurrencyDetailResponse),
        (status = 404, description = "종목 없음", body = ApiErrorResponse)
    ),
    tag = "currencies"
)]
pub async fn get_currency(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<CurrencyDetailResponse>> {
    let key = InstrumentRef::parse(&key);
    debug!(%key, "종목 상세 조회");

    let currency = resolve(&state, &key).await?;
    let history = state
        .store
        .history(&InstrumentRef::name(&currency.name))
        .await
        .map_err(store_error)?;

    Ok(Json(CurrencyDetailResponse {
        display_name: currency.display_name(),
        count: history.len(),
        currency,
        history,
    }))
}

/// GET /api/v1/currencies/{key}/latest - 최신 스냅샷
#[utoipa::path(
    get,
    path = "/api/v1/currencies/{key}/latest",
    params(("key" = String, Path, description = "종목 이름 또는 심볼")),
    responses(
        (status = 200, description = "최신 스냅샷", body = LatestMeasurementResponse),
        (status = 404, description = "종목 없음", body = ApiErrorResponse)
    ),
    tag = "currencies"
)]
pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<LatestMeasurementResponse>> {
    let key = InstrumentRef::parse(&key);

    let currency = resolve(&state, &key).await?;
    let measurement = state
        .store
        .latest(&InstrumentRef::name(&currency.name))
        .await
        .map_err(store_error)?;

    Ok(Json(LatestMeasurementResponse {
        currency,
        measurement,
    }))
}

/// POST /api/v1/currencies/{key}/history - 스냅샷 추가
#[utoipa::path(
    post,
    path = "/api/v1/currencies/{key}/history",
    params(("key" = String, Path, description = "종목 이름 또는 심볼")),
    request_body = MeasurementInput,
    responses(
        (status = 201, description = "스냅샷 저장", body = Measurement),
        (status = 400, description = "입력 검증 실패", body = ApiErrorResponse),
        (status = 404, description = "종목 없음", body = ApiErrorResponse)
    ),
    tag = "currencies"
)]
pub async fn add_history(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(input): Json<MeasurementInput>,
) -> ApiResult<(StatusCode, Json<Measurement>)> {
    input.validate().map_err(|e| validation_error(&e))?;

    let key = InstrumentRef::parse(&key);
    let (fields, captured_at) = input.into_parts()?;

    let measurement = state
        .store
        .add_measurement(&key, fields, captured_at)
        .await
        .map_err(store_error)?;

    info!(%key, captured_at = %measurement.captured_at, "스냅샷 추가");

    Ok((StatusCode::CREATED, Json(measurement)))
}

/// DELETE /api/v1/currencies/{name} - 종목 및 이력 삭제
#[utoipa::path(
    delete,
    path = "/api/v1/currencies/{name}",
    params(("name" = String, Path, description = "종목 이름")),
    responses(
        (status = 200, description = "삭제 완료", body = DeleteCurrencyResponse),
        (status = 404, description = "종목 없음", body = ApiErrorResponse)
    ),
    tag = "currencies"
)]
pub async fn delete_currency(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<DeleteCurrencyResponse>> {
    let deleted = state
        .store
        .delete_instrument(&name)
        .await
        .map_err(store_error)?;

    Ok(Json(DeleteCurrencyResponse {
        name: deleted.instrument.name,
        measurements_removed: deleted.measurements_removed,
    }))
}

/// Currency 라우터 생성
pub fn currencies_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_currencies).post(create_currency))
        .route("/{key}", get(get_currency).delete(delete_currency))
        .route("/{key}/latest", get(get_latest))
        .route("/{key}/history", post(add_history))
}
