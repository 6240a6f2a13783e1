//! 스크래핑 원시 레코드.

use serde::{Deserialize, Serialize};

use super::instrument::normalize_name;
use super::measurement::MeasurementFields;

/// 시세 목록 페이지의 한 행에서 추출한 9-필드 레코드.
///
/// 추출 직후부터 reconcile 전까지만 존재하며 그대로 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct RawRecord {
    /// 페이지에 표시된 종목 이름 (예: "Bitcoin")
    pub name: String,
    /// 페이지에 표시된 심볼 (예: "BTC")
    pub symbol: String,
    /// 나머지 7개 지표
    #[serde(flatten)]
    pub fields: MeasurementFields,
}

impl RawRecord {
    /// 위치 기반 9-튜플 순서 그대로 레코드를 생성합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        market_cap: impl Into<String>,
        price: impl Into<String>,
        circulating_supply: impl Into<String>,
        volume_24h: impl Into<String>,
        change_1h: impl Into<String>,
        change_24h: impl Into<String>,
        change_7d: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            fields: MeasurementFields {
                market_cap: market_cap.into(),
                price: price.into(),
                circulating_supply: circulating_supply.into(),
                volume_24h: volume_24h.into(),
                change_1h: change_1h.into(),
                change_24h: change_24h.into(),
                change_7d: change_7d.into(),
            },
        }
    }

    /// reconcile 조회에 사용하는 정규화된 이름.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// 9개 필드를 페이지 열 순서대로 반환합니다.
    pub fn as_tuple(&self) -> [&str; 9] {
        [
            self.name.as_str(),
            self.symbol.as_str(),
            self.fields.market_cap.as_str(),
            self.fields.price.as_str(),
            self.fields.circulating_supply.as_str(),
            self.fields.volume_24h.as_str(),
            self.fields.change_1h.as_str(),
            self.fields.change_24h.as_str(),
            self.fields.change_7d.as_str(),
        ]
    }
}
