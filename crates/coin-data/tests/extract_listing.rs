//! 시세 목록 페이지 추출 통합 테스트 (오프라인 fixture 사용).

use coin_data::{ExtractError, ListingExtractor, ListingField};

const LISTING: &str = include_str!("fixtures/listing.html");

#[test]
fn extracts_rows_in_table_order() {
    let extractor = ListingExtractor::new().unwrap();
    let records = extractor.extract(LISTING).unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Bitcoin", "Ethereum", "Ripple"]);

    assert_eq!(
        records[0].as_tuple(),
        [
            "Bitcoin",
            "BTC",
            "$44,795,567,456",
            "$2713.92",
            "16,505,700",
            "$1,141,760,000",
            "0.46%",
            "-1.49%",
            "11.37%",
        ]
    );
}

#[test]
fn merges_percent_cells_from_both_locations() {
    let records = ListingExtractor::new().unwrap().extract(LISTING).unwrap();
    let eth = &records[1];

    assert_eq!(eth.fields.change_1h, "-0.21%");
    assert_eq!(eth.fields.change_24h, "?");
    assert_eq!(eth.fields.change_7d, "31.02%");
}

#[test]
fn reads_supply_from_span_cells() {
    let records = ListingExtractor::new().unwrap().extract(LISTING).unwrap();
    assert_eq!(records[2].symbol, "XRP");
    assert_eq!(records[2].fields.circulating_supply, "38,264,715,246");
}

#[test]
fn missing_symbol_fails_whole_extract() {
    let broken = LISTING.replace(r#"<td class="text-left">XRP</td>"#, "<td>XRP</td>");
    let err = ListingExtractor::new().unwrap().extract(&broken).unwrap_err();

    assert_eq!(
        err,
        ExtractError::MissingField {
            field: ListingField::Symbol,
            row_index: 2,
        }
    );
}

#[test]
fn page_without_marker_is_rejected() {
    let page = LISTING.replace(r#"id="currencies-all""#, r#"id="currencies""#);
    let err = ListingExtractor::new().unwrap().extract(&page).unwrap_err();
    assert!(matches!(err, ExtractError::TableNotFound { .. }));
}
