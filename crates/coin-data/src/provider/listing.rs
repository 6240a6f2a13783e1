//! 시세 목록 HTML 추출기.
//!
//! `table#currencies-all` 테이블의 `tbody > tr` 행마다 9개 필드를
//! 요소 타입과 class/속성 매칭으로 추출합니다.
//!
//! # 필드 매핑
//!
//! | 필드 | 위치 |
//! |------|------|
//! | name | `td.currency-name > a` |
//! | symbol | `td[class="text-left"]` |
//! | market_cap | `td.market-cap` |
//! | price | `td > a.price` |
//! | circulating_supply | `td > a[target=_blank]` 또는 `td > span` |
//! | volume_24h | `td[class="no-wrap text-right "] > a` |
//! | change_1h/24h/7d | `td.percent-*` 또는 `td[class="text-right"]` (문서 순서) |
//!
//! 매칭이 없는 필드는 해당 행의 추출 실패이며 기본값으로 대체하지 않습니다.

use std::fmt;

use coin_core::RawRecord;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

/// 시세 테이블 식별 셀렉터.
pub const TABLE_MARKER: &str = "table#currencies-all";

const NAME: &str = r#"td[class="no-wrap currency-name"] > a"#;
const SYMBOL: &str = r#"td[class="text-left"]"#;
const MARKET_CAP: &str = r#"td[class="no-wrap market-cap text-right"]"#;
const PRICE: &str = r#"td[class="no-wrap text-right"] > a[class="price"]"#;
const CIRCULATING_SUPPLY: &str =
    r#"td[class="no-wrap text-right"] > a[target="_blank"], td[class="no-wrap text-right"] > span"#;
const VOLUME: &str = r#"td[class="no-wrap text-right "] > a"#;
const CHANGES: &str = r#"td[class^="no-wrap percent-"], td[class="text-right"]"#;

/// 변동률 값 개수 (1h, 24h, 7d).
const CHANGE_COUNT: usize = 3;

/// 행 단위로 추출하는 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    Name,
    Symbol,
    MarketCap,
    Price,
    CirculatingSupply,
    Volume,
    PercentChange,
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Symbol => "symbol",
            Self::MarketCap => "market_cap",
            Self::Price => "price",
            Self::CirculatingSupply => "circulating_supply",
            Self::Volume => "volume_24h",
            Self::PercentChange => "percent_change",
        };
        write!(f, "{}", s)
    }
}

/// HTML 추출 에러
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("셀렉터 파싱 실패: {0}")]
    Selector(String),

    #[error("시세 테이블을 찾을 수 없음: {marker}")]
    TableNotFound { marker: String },

    #[error("필드 추출 실패: {field} (row {row_index})")]
    MissingField { field: ListingField, row_index: usize },

    #[error("변동률 값 부족: {found}/3 (row {row_index})")]
    IncompleteChanges { row_index: usize, found: usize },
}

impl ExtractError {
    /// 실패한 행 번호 (0부터 시작)
    pub fn row_index(&self) -> Option<usize> {
        match self {
            Self::MissingField { row_index, .. } | Self::IncompleteChanges { row_index, .. } => {
                Some(*row_index)
            }
            _ => None,
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector(format!("{}: {:?}", css, e)))
}

/// 요소 자신의 텍스트 노드만 이어붙여 trim 합니다 (자식 요소 텍스트 제외).
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect::<String>()
        .trim()
        .to_string()
}

/// 셀렉터에 매칭되는 요소 중 텍스트가 있는 첫 번째 값.
fn first_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .map(own_text)
        .find(|text| !text.is_empty())
}

/// 테이블 직속 `tbody > tr` 행.
fn body_rows(table: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tbody")
        .flat_map(|tbody| {
            tbody
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "tr")
        })
}

/// 시세 목록 페이지 추출기.
///
/// 셀렉터는 생성 시 한 번만 컴파일합니다.
#[derive(Debug)]
pub struct ListingExtractor {
    table: Selector,
    name: Selector,
    symbol: Selector,
    market_cap: Selector,
    price: Selector,
    circulating_supply: Selector,
    volume: Selector,
    changes: Selector,
}

impl ListingExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            table: parse_selector(TABLE_MARKER)?,
            name: parse_selector(NAME)?,
            symbol: parse_selector(SYMBOL)?,
            market_cap: parse_selector(MARKET_CAP)?,
            price: parse_selector(PRICE)?,
            circulating_supply: parse_selector(CIRCULATING_SUPPLY)?,
            volume: parse_selector(VOLUME)?,
            changes: parse_selector(CHANGES)?,
        })
    }

    /// 페이지 본문에서 모든 행을 추출합니다.
    ///
    /// 행 순서는 테이블 순서를 그대로 따르며, 한 행이라도 실패하면 전체가 실패합니다.
    pub fn extract(&self, body: &str) -> Result<Vec<RawRecord>, ExtractError> {
        let document = Html::parse_document(body);

        let table = document.select(&self.table).next().ok_or_else(|| {
            warn!(marker = TABLE_MARKER, "시세 테이블 없음");
            ExtractError::TableNotFound {
                marker: TABLE_MARKER.to_string(),
            }
        })?;

        let records = body_rows(table)
            .enumerate()
            .map(|(row_index, row)| self.extract_row(row, row_index))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = records.len(), "시세 테이블 추출 완료");
        Ok(records)
    }

    fn extract_row(&self, row: ElementRef<'_>, row_index: usize) -> Result<RawRecord, ExtractError> {
        let require = |selector: &Selector, field: ListingField| {
            first_text(row, selector).ok_or(ExtractError::MissingField { field, row_index })
        };

        let name = require(&self.name, ListingField::Name)?;
        let symbol = require(&self.symbol, ListingField::Symbol)?;
        let market_cap = require(&self.market_cap, ListingField::MarketCap)?;
        let price = require(&self.price, ListingField::Price)?;
        let circulating_supply = require(&self.circulating_supply, ListingField::CirculatingSupply)?;
        let volume = require(&self.volume, ListingField::Volume)?;

        // 두 위치의 값을 문서 순서로 합친 뒤 앞에서부터 1h, 24h, 7d
        let changes: Vec<String> = row
            .select(&self.changes)
            .map(own_text)
            .filter(|text| !text.is_empty())
            .collect();
        let [change_1h, change_24h, change_7d, ..] = changes.as_slice() else {
            return Err(ExtractError::IncompleteChanges {
                row_index,
                found: changes.len(),
            });
        };
        if changes.len() > CHANGE_COUNT {
            debug!(row_index, found = changes.len(), "변동률 값 초과, 앞의 3개 사용");
        }

        Ok(RawRecord::new(
            name,
            symbol,
            market_cap,
            price,
            circulating_supply,
            volume,
            change_1h.as_str(),
            change_24h.as_str(),
            change_7d.as_str(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(name: &str, symbol: &str, changes: &str) -> String {
        format!(
            r#"<tr>
                <td class="text-center">1</td>
                <td class="no-wrap currency-name"><img src="x.png"><a href="/currencies/{slug}/">{name}</a></td>
                <td class="text-left">{symbol}</td>
                <td class="no-wrap market-cap text-right">
                    $1,000,000
                </td>
                <td class="no-wrap text-right"><a href="/markets/" class="price">$10.00</a></td>
                <td class="no-wrap text-right"><a href="/currencies/{slug}/" target="_blank">100,000</a></td>
                <td class="no-wrap text-right "><a href="/volume/" class="volume">$5,000</a></td>
                {changes}
            </tr>"#,
            slug = name.to_lowercase(),
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body><table id="currencies-all"><thead><tr><th>#</th></tr></thead><tbody>{}</tbody></table></body></html>"#,
            rows.concat()
        )
    }

    const CHANGES_OK: &str = r#"
        <td class="no-wrap percent-1h positive_change text-right">0.52%</td>
        <td class="no-wrap percent-24h negative_change text-right">-1.20%</td>
        <td class="no-wrap percent-7d positive_change text-right">4.07%</td>"#;

    #[test]
    fn test_extract_single_row() {
        let extractor = ListingExtractor::new().unwrap();
        let records = extractor.extract(&page(&[row("Bitcoin", "BTC", CHANGES_OK)])).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_tuple(),
            ["Bitcoin", "BTC", "$1,000,000", "$10.00", "100,000", "$5,000", "0.52%", "-1.20%", "4.07%"]
        );
    }

    #[test]
    fn test_changes_merge_plain_cells_in_order() {
        let changes = r#"
            <td class="no-wrap percent-1h positive_change text-right">0.10%</td>
            <td class="text-right">?</td>
            <td class="no-wrap percent-7d negative_change text-right">-3.00%</td>"#;
        let extractor = ListingExtractor::new().unwrap();
        let records = extractor.extract(&page(&[row("Tether", "USDT", changes)])).unwrap();

        assert_eq!(records[0].fields.change_1h, "0.10%");
        assert_eq!(records[0].fields.change_24h, "?");
        assert_eq!(records[0].fields.change_7d, "-3.00%");
    }

    #[test]
    fn test_supply_from_span() {
        let html = page(&[row("Bitcoin", "BTC", CHANGES_OK).replace(
            r#"<a href="/currencies/bitcoin/" target="_blank">100,000</a>"#,
            "<span> 21,000,000 * </span>",
        )]);
        let extractor = ListingExtractor::new().unwrap();
        let records = extractor.extract(&html).unwrap();
        assert_eq!(records[0].fields.circulating_supply, "21,000,000 *");
    }

    #[test]
    fn test_missing_table() {
        let extractor = ListingExtractor::new().unwrap();
        let err = extractor.extract("<html><body><table id=\"other\"></table></body></html>").unwrap_err();
        assert!(matches!(err, ExtractError::TableNotFound { .. }));
        assert_eq!(err.row_index(), None);
    }

    #[test]
    fn test_empty_table_yields_no_records() {
        let extractor = ListingExtractor::new().unwrap();
        assert!(extractor.extract(&page(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_missing_field_reports_row() {
        let broken = row("Ethereum", "ETH", CHANGES_OK).replace(r#"class="price""#, r#"class="quote""#);
        let extractor = ListingExtractor::new().unwrap();
        let err = extractor
            .extract(&page(&[row("Bitcoin", "BTC", CHANGES_OK), broken]))
            .unwrap_err();

        assert_eq!(
            err,
            ExtractError::MissingField {
                field: ListingField::Price,
                row_index: 1
            }
        );
    }

    #[test]
    fn test_incomplete_changes() {
        let changes = r#"
            <td class="no-wrap percent-1h positive_change text-right">0.10%</td>
            <td class="no-wrap percent-24h positive_change text-right">0.20%</td>"#;
        let extractor = ListingExtractor::new().unwrap();
        let err = extractor.extract(&page(&[row("Dogecoin", "DOGE", changes)])).unwrap_err();

        assert_eq!(err, ExtractError::IncompleteChanges { row_index: 0, found: 2 });
    }

    proptest! {
        #[test]
        fn prop_extract_keeps_row_count_and_order(
            rows in prop::collection::vec(("[A-Z][a-z]{1,8}", "[A-Z]{2,5}"), 0..20)
        ) {
            // 행 번호를 붙여 이름 중복 방지
            let expected: Vec<(String, String)> = rows
                .iter()
                .enumerate()
                .map(|(i, (name, symbol))| (format!("{}{}", name, i), symbol.clone()))
                .collect();
            let html = page(
                &expected
                    .iter()
                    .map(|(name, symbol)| row(name, symbol, CHANGES_OK))
                    .collect::<Vec<_>>(),
            );

            let records = ListingExtractor::new().unwrap().extract(&html).unwrap();

            prop_assert_eq!(records.len(), expected.len());
            for (record, (name, symbol)) in records.iter().zip(&expected) {
                prop_assert_eq!(&record.name, name);
                prop_assert_eq!(&record.symbol, symbol);
            }
        }
    }

    #[test]
    fn test_field_display() {
        assert_eq!(ListingField::Volume.to_string(), "volume_24h");
        assert_eq!(ListingField::PercentChange.to_string(), "percent_change");
    }
}
