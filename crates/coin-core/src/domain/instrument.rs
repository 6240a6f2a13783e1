//! 종목(Instrument) 차원 모델.
//!
//! 종목은 최초 등록 시 한 번 생성되며 이후 이름/심볼이 바뀌지 않습니다.
//! 고유성은 정규화된 이름(소문자) 기준입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 종목 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Instrument {
    /// 종목 ID
    pub id: Uuid,
    /// 정규화된 이름 (소문자, 예: "bitcoin")
    pub name: String,
    /// 정규화된 심볼 (대문자, 예: "BTC")
    pub symbol: String,
    /// 최초 등록 시각
    pub created_at: DateTime<Utc>,
}

impl Instrument {
    /// 새 종목을 생성합니다. 이름과 심볼은 정규화되어 저장됩니다.
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: normalize_name(name),
            symbol: normalize_symbol(symbol),
            created_at: Utc::now(),
        }
    }

    /// 화면 표시용 이름 (첫 글자 대문자, 예: "Bitcoin").
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// 종목 이름 정규화 (앞뒤 공백 제거 + 소문자).
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 종목 심볼 정규화 (앞뒤 공백 제거 + 대문자).
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// 이름 또는 심볼로 종목을 가리키는 조회 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrumentRef {
    /// 정규화된 이름으로 조회
    Name(String),
    /// 정규화된 심볼로 조회
    Symbol(String),
}

impl InstrumentRef {
    /// 이름 기준 조회 키.
    pub fn name(name: &str) -> Self {
        Self::Name(normalize_name(name))
    }

    /// 심볼 기준 조회 키.
    pub fn symbol(symbol: &str) -> Self {
        Self::Symbol(normalize_symbol(symbol))
    }

    /// 사용자 입력을 조회 키로 변환합니다.
    ///
    /// 대소문자 구분이 있는 문자가 모두 대문자이면 심볼("BTC"),
    /// 그 외에는 이름("Bitcoin" → "bitcoin")으로 해석합니다.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let has_upper = input.chars().any(char::is_uppercase);
        let has_lower = input.chars().any(char::is_lowercase);

        if has_upper && !has_lower {
            Self::Symbol(input.to_string())
        } else {
            Self::name(input)
        }
    }

    /// 이 키가 주어진 종목을 가리키는지 확인합니다.
    pub fn matches(&self, instrument: &Instrument) -> bool {
        match self {
            Self::Name(name) => instrument.name == *name,
            Self::Symbol(symbol) => instrument.symbol == *symbol,
        }
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name={}", name),
            Self::Symbol(symbol) => write!(f, "symbol={}", symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_normalizes_fields() {
        let instrument = Instrument::new("  Bitcoin ", "btc");
        assert_eq!(instrument.name, "bitcoin");
        assert_eq!(instrument.symbol, "BTC");
        assert_eq!(instrument.display_name(), "Bitcoin");
    }

    #[test]
    fn test_parse_ref() {
        assert_eq!(InstrumentRef::parse("BTC"), InstrumentRef::Symbol("BTC".into()));
        assert_eq!(InstrumentRef::parse("Bitcoin"), InstrumentRef::Name("bitcoin".into()));
        assert_eq!(InstrumentRef::parse("bitcoin"), InstrumentRef::Name("bitcoin".into()));
        // 대소문자 없는 입력은 이름으로 처리
        assert_eq!(InstrumentRef::parse("42"), InstrumentRef::Name("42".into()));
        assert_eq!(
            InstrumentRef::parse("BITCOIN CASH"),
            InstrumentRef::Symbol("BITCOIN CASH".into())
        );
    }

    #[test]
    fn test_ref_matches() {
        let instrument = Instrument::new("Ethereum", "ETH");
        assert!(InstrumentRef::parse("ETH").matches(&instrument));
        assert!(InstrumentRef::parse("Ethereum").matches(&instrument));
        assert!(!InstrumentRef::parse("eth").matches(&instrument));
    }

    proptest! {
        #[test]
        fn prop_normalize_name_is_idempotent(name in "\\PC{0,32}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once);
        }

        #[test]
        fn prop_case_variants_share_name(name in "[a-zA-Z][a-zA-Z ]{0,20}") {
            prop_assert_eq!(normalize_name(&name.to_uppercase()), normalize_name(&name.to_lowercase()));
        }

        #[test]
        fn prop_symbol_has_no_lowercase(symbol in "[a-zA-Z0-9]{1,8}") {
            let normalized = normalize_symbol(&symbol);
            prop_assert!(!normalized.chars().any(char::is_lowercase));
        }
    }
}
