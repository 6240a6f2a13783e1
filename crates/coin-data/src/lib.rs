//! 시세 목록 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 시세 목록 페이지 HTTP 수집 ([`provider::coinmarketcap`])
//! - HTML 구조 기반 레코드 추출 ([`provider::listing`])
//! - 수집 + 추출을 하나의 실행 단위로 묶는 파이프라인 ([`pipeline`])
//! - 종목/시세 저장소와 reconcile ([`storage`])

pub mod error;
pub mod pipeline;
pub mod provider;
pub mod storage;

pub use error::{Result, StoreError};
pub use pipeline::{PipelineError, PipelineRunner};
pub use provider::{CoinMarketCapClient, ExtractError, FetchError, ListingExtractor, ListingField};
pub use storage::{
    open_store, Database, DeletedInstrument, MarketStore, MemoryMarketStore, PgMarketStore,
    ReconcileReport,
};
