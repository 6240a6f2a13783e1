//! 시세 목록 Provider 모듈.
//!
//! ## CoinMarketCap
//! - `CoinMarketCapClient`: 브라우저 헤더를 고정한 HTTP 세션, 단일 요청
//! - `ListingExtractor`: `table#currencies-all` 테이블의 행을 9-필드 레코드로 추출

pub mod coinmarketcap;
pub mod listing;

pub use coinmarketcap::{CoinMarketCapClient, FetchError};
pub use listing::{ExtractError, ListingExtractor, ListingField, TABLE_MARKER};
