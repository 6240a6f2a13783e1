//! 시세 스냅샷(Measurement) 모델.
//!
//! 한 번의 파이프라인 실행에서 저장된 스냅샷은 모두 같은 `captured_at`을 공유합니다.
//! 값은 원본 페이지 형식 그대로의 텍스트로 보관합니다 (예: "$1,234.56", "-0.52%").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 시세 지표 7종 (종목 식별 필드 제외).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct MeasurementFields {
    /// 시가총액
    pub market_cap: String,
    /// 가격
    pub price: String,
    /// 유통 공급량
    pub circulating_supply: String,
    /// 24시간 거래량
    pub volume_24h: String,
    /// 1시간 변동률
    pub change_1h: String,
    /// 24시간 변동률
    pub change_24h: String,
    /// 7일 변동률
    pub change_7d: String,
}

/// 저장된 시세 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Measurement {
    pub id: Uuid,
    /// 소속 종목 ID
    pub instrument_id: Uuid,
    /// 시세 지표
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx-support", sqlx(flatten))]
    pub fields: MeasurementFields,
    /// 수집 시각
    pub captured_at: DateTime<Utc>,
}

impl Measurement {
    pub fn new(instrument_id: Uuid, fields: MeasurementFields, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument_id,
            fields,
            captured_at,
        }
    }
}
